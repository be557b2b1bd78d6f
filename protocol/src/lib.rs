pub mod management;
pub mod utils;
