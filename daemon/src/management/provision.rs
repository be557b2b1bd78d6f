use std::collections::HashMap;
use std::path::Path;

use log::{debug, warn};
use reqwest::Client;
use url::Url;
use waterfall_protocol::management::instance::ServerInstallation;
use waterfall_protocol::utils::PlaceHolderRender;

use crate::management::error::{SupervisorError, SupervisorResult};
use crate::management::http::download_file;
use crate::storage::files::remove_file_if_exists;

pub const CONFIG_FILE_NAME: &str = "config.yml";

/// Token values for the config template of `inst`.
pub fn substitutions(inst: &ServerInstallation) -> HashMap<String, String> {
    HashMap::from([
        ("motd".to_owned(), inst.name.clone()),
        ("maxplayers".to_owned(), inst.max_players.to_string()),
        ("queryport".to_owned(), inst.query_port.to_string()),
        ("ip_port".to_owned(), inst.bind_address()),
    ])
}

pub struct ConfigProvisioner {
    client: Client,
}

impl ConfigProvisioner {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Replaces `dest` with the rendered template at `template`.
    ///
    /// A failed download is only logged; the result says whether `dest` exists
    /// afterwards. Directory and file errors are returned.
    pub async fn provision(
        &self,
        template: &Url,
        dest: &Path,
        vars: &HashMap<String, String>,
    ) -> SupervisorResult<bool> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SupervisorError::fs(parent, e))?;
        }
        remove_file_if_exists(dest).await?;

        if let Err(err) = download_file(&self.client, template, dest).await {
            warn!("could not download config template: {}", err);
        }
        if !tokio::fs::try_exists(dest).await.unwrap_or(false) {
            return Ok(false);
        }

        let raw = tokio::fs::read(dest)
            .await
            .map_err(|e| SupervisorError::fs(dest, e))?;
        let text = String::from_utf8_lossy(&raw);
        tokio::fs::write(dest, text.render(vars))
            .await
            .map_err(|e| SupervisorError::fs(dest, e))?;
        debug!("config written to {}", dest.display());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::management::test_utils;
    use axum::routing::get;
    use axum::Router;
    use pretty_assertions::assert_eq;

    const TEMPLATE: &str = "motd: '{{motd}}'\nplayer_limit: {{maxplayers}}\nhost: {{ip_port}}\n";

    async fn template_url() -> Url {
        let base = test_utils::serve(Router::new().route("/t.yml", get(|| async { TEMPLATE }))).await;
        Url::parse(&format!("{}/t.yml", base)).unwrap()
    }

    #[tokio::test]
    async fn replaces_only_given_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("serverfiles").join("config.yml");
        let vars = HashMap::from([
            ("motd".to_owned(), "Test".to_owned()),
            ("maxplayers".to_owned(), "10".to_owned()),
        ]);

        let written = ConfigProvisioner::new(Client::new())
            .provision(&template_url().await, &dest, &vars)
            .await
            .unwrap();

        assert!(written);
        assert_eq!(
            std::fs::read_to_string(&dest).unwrap(),
            "motd: 'Test'\nplayer_limit: 10\nhost: {{ip_port}}\n"
        );
    }

    #[tokio::test]
    async fn failed_download_is_not_an_error() {
        let base = test_utils::serve(test_utils::broken_router()).await;
        let url = Url::parse(&format!("{}/config.yml", base)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("config.yml");
        std::fs::write(&dest, "stale").unwrap();

        let written = ConfigProvisioner::new(Client::new())
            .provision(&url, &dest, &HashMap::new())
            .await
            .unwrap();

        assert!(!written);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn invalid_utf8_template_is_still_rendered() {
        let base = test_utils::serve(Router::new().route(
            "/t.yml",
            get(|| async { b"motd: '{{motd}}' \xff\n".to_vec() }),
        ))
        .await;
        let url = Url::parse(&format!("{}/t.yml", base)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("config.yml");
        let vars = HashMap::from([("motd".to_owned(), "Test".to_owned())]);

        let written = ConfigProvisioner::new(Client::new())
            .provision(&url, &dest, &vars)
            .await
            .unwrap();

        assert!(written);
        assert_eq!(
            std::fs::read_to_string(&dest).unwrap(),
            "motd: 'Test' \u{fffd}\n"
        );
    }

    #[test]
    fn substitutions_cover_template_tokens() {
        let mut inst = ServerInstallation::new("1", "/srv/1");
        inst.name = "My Proxy".into();
        inst.max_players = 20;
        inst.query_port = 25578;
        inst.port = 25577;

        let vars = substitutions(&inst);

        assert_eq!(vars["motd"], "My Proxy");
        assert_eq!(vars["maxplayers"], "20");
        assert_eq!(vars["queryport"], "25578");
        assert_eq!(vars["ip_port"], "0.0.0.0:25577");
    }
}
