mod place_holder;

pub use place_holder::*;
