use std::path::{Path, PathBuf};
use thiserror::Error;

/// Every way a lifecycle operation can fail.
///
/// Each operation returns its own `Result`, there is no shared "last error".
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("required runtime not found: {0}")]
    DependencyMissing(String),

    #[error("fail to get remote version and build: {0}")]
    RemoteResolution(String),

    #[error("download failed for {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("io error at {path:?}: {source}")]
    FileSystem {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not start process: {0}")]
    ProcessStart(#[source] std::io::Error),

    #[error("could not deliver stop request: {0}")]
    ProcessControl(String),
}

pub type SupervisorResult<T> = Result<T, SupervisorError>;

impl SupervisorError {
    pub fn fs(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        SupervisorError::FileSystem {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn network(url: impl ToString, reason: impl ToString) -> Self {
        SupervisorError::Network {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
