use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_ARTIFACT: &str = "waterfall.jar";

/// One managed server instance, as described by the host.
///
/// The supervisor only ever borrows this; persisting it is the host's job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerInstallation {
    pub id: String,

    /// Display name, rendered into the config template as the motd.
    #[serde(default)]
    pub name: String,

    /// Server-files directory; the artifact lives here and the process runs here.
    pub root: PathBuf,

    #[serde(default = "default_artifact")]
    pub artifact: String,
    #[serde(default = "default_ip")]
    pub ip: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_port")]
    pub query_port: u16,
    #[serde(default = "default_max_players")]
    pub max_players: u32,
    #[serde(default)]
    pub arguments: Vec<String>,
}

fn default_artifact() -> String {
    DEFAULT_ARTIFACT.to_owned()
}

fn default_ip() -> String {
    "0.0.0.0".to_owned()
}

fn default_port() -> u16 {
    25565
}

fn default_max_players() -> u32 {
    50
}

impl ServerInstallation {
    pub fn new(id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            root: root.into(),
            artifact: default_artifact(),
            ip: default_ip(),
            port: default_port(),
            query_port: default_port(),
            max_players: default_max_players(),
            arguments: vec![],
        }
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.root.join(&self.artifact)
    }

    /// Where the artifact would sit if `dir` were imported as this instance's root.
    pub fn artifact_path_in(&self, dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(&self.artifact)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn installation_defaults_test() {
        let inst: ServerInstallation =
            serde_json::from_str(r#"{ "id": "1", "root": "servers/1/serverfiles" }"#).unwrap();

        assert_eq!(inst.artifact, "waterfall.jar");
        assert_eq!(inst.port, 25565);
        assert_eq!(inst.query_port, 25565);
        assert_eq!(inst.max_players, 50);
        assert!(inst.arguments.is_empty());
        assert_eq!(inst, ServerInstallation::new("1", "servers/1/serverfiles"));
    }

    #[test]
    fn installation_paths_test() {
        let mut inst = ServerInstallation::new("7", "/srv/waterfall");
        inst.ip = "127.0.0.1".into();
        inst.port = 25577;

        assert_eq!(
            inst.artifact_path(),
            PathBuf::from("/srv/waterfall/waterfall.jar")
        );
        assert_eq!(
            inst.artifact_path_in("/tmp/import"),
            PathBuf::from("/tmp/import/waterfall.jar")
        );
        assert_eq!(inst.bind_address(), "127.0.0.1:25577");
    }
}
