use std::path::{Path, PathBuf};

use anyhow::bail;
use waterfall_protocol::management::instance::ServerInstallation;

use crate::management::error::{SupervisorError, SupervisorResult};
use crate::storage::file::{Config, FileIoWithBackup};

pub const INSTANCE_FILE_NAME: &str = "instance.json";
pub const SERVER_FILES_DIR: &str = "serverfiles";

struct InstanceFile;

impl FileIoWithBackup for InstanceFile {}

impl Config for InstanceFile {
    type ConfigType = ServerInstallation;
}

/// Layout of the servers directory:
///
/// ```text
/// <servers_root>/<id>/instance.json
/// <servers_root>/<id>/serverfiles/
/// ```
pub struct ServerPaths {
    root: PathBuf,
}

impl ServerPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn instance_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    pub fn server_files(&self, id: &str) -> PathBuf {
        self.instance_dir(id).join(SERVER_FILES_DIR)
    }

    pub fn instance_file(&self, id: &str) -> PathBuf {
        self.instance_dir(id).join(INSTANCE_FILE_NAME)
    }

    /// Loads `<id>/instance.json`, writing a default definition first if there is none.
    pub fn load_installation(&self, id: &str) -> anyhow::Result<ServerInstallation> {
        if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
            bail!("invalid instance id: '{}'", id);
        }
        InstanceFile::load_config_or_default(self.instance_file(id), || {
            ServerInstallation::new(id, self.server_files(id))
        })
    }
}

/// Deletes `path` if it is there. Returns whether a file was removed.
pub async fn remove_file_if_exists(path: &Path) -> SupervisorResult<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(SupervisorError::fs(path, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn load_installation_creates_default() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ServerPaths::new(dir.path());

        let inst = paths.load_installation("3").unwrap();

        assert_eq!(inst.id, "3");
        assert_eq!(inst.root, dir.path().join("3").join("serverfiles"));
        assert!(paths.instance_file("3").is_file());
        assert_eq!(paths.load_installation("3").unwrap(), inst);
    }

    #[test]
    fn load_installation_rejects_path_ids() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ServerPaths::new(dir.path());

        assert!(paths.load_installation("../etc").is_err());
        assert!(paths.load_installation("..").is_err());
        assert!(paths.load_installation("").is_err());
    }

    #[tokio::test]
    async fn remove_file_if_exists_reports_removal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("waterfall.jar");
        std::fs::write(&path, b"jar").unwrap();

        assert!(remove_file_if_exists(&path).await.unwrap());
        assert!(!path.exists());
        assert!(!remove_file_if_exists(&path).await.unwrap());
    }
}
