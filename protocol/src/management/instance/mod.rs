mod build;
mod installation;
mod status;
mod validation;

pub use build::*;
pub use installation::*;
pub use status::*;
pub use validation::*;
