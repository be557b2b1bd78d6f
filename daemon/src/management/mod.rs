pub mod artifact;
pub mod comm;
pub mod error;
pub mod http;
pub mod instance;
pub mod java;
pub mod provision;
#[cfg(test)]
pub(crate) mod test_utils;
pub mod version;

pub use error::{SupervisorError, SupervisorResult};
pub use instance::{ServerPlugin, UpdateOutcome, WaterfallServer};
