use std::path::Path;

use log::info;
use reqwest::Client;
use url::Url;
use waterfall_protocol::management::instance::BuildDescriptor;

use crate::management::error::{SupervisorError, SupervisorResult};
use crate::management::http::{download_file, join_segments};
use crate::storage::files::remove_file_if_exists;

/// Fetches server jars from `<base>/<version>/<build>/download`.
pub struct ArtifactInstaller {
    client: Client,
    base: Url,
}

impl ArtifactInstaller {
    pub fn new(client: Client, base: Url) -> Self {
        Self { client, base }
    }

    pub fn download_url(&self, build: &BuildDescriptor) -> SupervisorResult<Url> {
        join_segments(
            &self.base,
            &[build.version.as_str(), build.build.as_str(), "download"],
        )
        .ok_or_else(|| SupervisorError::network(&self.base, "artifact base url cannot have path segments"))
    }

    /// Downloads `build` to `dest`, overwriting any artifact already there.
    pub async fn install(&self, build: &BuildDescriptor, dest: &Path) -> SupervisorResult<()> {
        let url = self.download_url(build)?;
        info!("downloading {} from {}", build, url);
        download_file(&self.client, &url, dest).await
    }

    /// First half of an update: drop the old artifact.
    ///
    /// Returns whether one existed. A file that cannot be removed (in use,
    /// permission denied) is a `FileSystem` error.
    pub async fn remove_stale(&self, dest: &Path) -> SupervisorResult<bool> {
        let removed = remove_file_if_exists(dest).await?;
        if removed {
            info!("removed stale artifact {}", dest.display());
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::management::test_utils;

    async fn installer() -> ArtifactInstaller {
        let base = test_utils::serve(test_utils::paper_router()).await;
        ArtifactInstaller::new(
            Client::new(),
            Url::parse(&format!("{}/waterfall", base)).unwrap(),
        )
    }

    #[tokio::test]
    async fn download_url_uses_canonical_build() {
        let installer = ArtifactInstaller::new(
            Client::new(),
            Url::parse("https://papermc.io/api/v1/waterfall").unwrap(),
        );
        let url = installer
            .download_url(&BuildDescriptor::new("1.16.1", "133"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://papermc.io/api/v1/waterfall/1.16.1/133/download"
        );
    }

    #[tokio::test]
    async fn install_writes_downloaded_body() {
        let installer = installer().await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("waterfall.jar");

        installer
            .install(&BuildDescriptor::new("1.16.1", "133"), &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), test_utils::ARTIFACT_BODY);
    }

    #[tokio::test]
    async fn unknown_build_is_network_error() {
        let installer = installer().await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("waterfall.jar");

        let err = installer
            .install(&BuildDescriptor::new("1.16.1", "1"), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, SupervisorError::Network { .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn remove_stale_only_reports_real_files() {
        let installer = installer().await;
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("waterfall.jar");

        assert!(!installer.remove_stale(&dest).await.unwrap());
        std::fs::write(&dest, b"old").unwrap();
        assert!(installer.remove_stale(&dest).await.unwrap());
        assert!(!dest.exists());
    }
}
