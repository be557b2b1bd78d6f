use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::storage::file::{Config, FileIoWithBackup};

pub const DEFAULT_INDEX_URL: &str = "https://papermc.io/api/v1/waterfall";
pub const DEFAULT_CONFIG_TEMPLATE_URL: &str =
    "https://raw.githubusercontent.com/1stian/WindowsGSM-Configs/master/Minecraft%3A%20Waterfall/config.yml";
const APP_USER_AGENT: &str = concat!("waterfall-daemon/", env!("CARGO_PKG_VERSION"));

/// Where builds, artifacts and config templates come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemoteConfig {
    pub index_url: Url,
    pub artifact_base_url: Url,
    pub config_template_url: Url,
    pub user_agent: String,
    /// Applied to every request. None means requests may hang forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        let index = Url::parse(DEFAULT_INDEX_URL).expect("DEFAULT_INDEX_URL is a valid url");
        Self {
            artifact_base_url: index.clone(),
            index_url: index,
            config_template_url: Url::parse(DEFAULT_CONFIG_TEMPLATE_URL)
                .expect("DEFAULT_CONFIG_TEMPLATE_URL is a valid url"),
            user_agent: APP_USER_AGENT.to_owned(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// immutable through full lifetime of app, unless restart app.
#[serde(default)]
pub struct AppConfig {
    pub remote: RemoteConfig,
    pub servers_root: PathBuf,
    /// Explicit java executable, checked before JAVA_HOME and PATH.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            servers_root: PathBuf::from("servers"),
            java_path: None,
        }
    }
}

impl FileIoWithBackup for AppConfig {}

impl Config for AppConfig {
    type ConfigType = AppConfig;
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<AppConfig> {
        Self::load_config_or_default(path, Self::default)
    }
}
