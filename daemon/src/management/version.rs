use anyhow::{anyhow, Context};
use log::{debug, warn};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;
use waterfall_protocol::management::instance::BuildDescriptor;

use crate::management::error::{SupervisorError, SupervisorResult};
use crate::management::http::join_segments;

#[derive(Debug, Deserialize)]
struct VersionIndex {
    versions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct VersionBuilds {
    builds: Builds,
}

#[derive(Debug, Deserialize)]
struct Builds {
    latest: BuildNumber,
}

// some mirrors publish build numbers as json numbers
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BuildNumber {
    Text(String),
    Number(u64),
}

impl From<BuildNumber> for String {
    fn from(value: BuildNumber) -> Self {
        match value {
            BuildNumber::Text(text) => text,
            BuildNumber::Number(number) => number.to_string(),
        }
    }
}

/// Looks up the newest published build: first the current version from the index,
/// then the latest build of that version.
///
/// Nothing is cached, every call goes to the network.
pub struct VersionResolver {
    client: Client,
    index: Url,
}

impl VersionResolver {
    pub fn new(client: Client, index: Url) -> Self {
        Self { client, index }
    }

    pub async fn resolve(&self) -> SupervisorResult<BuildDescriptor> {
        match self.try_resolve().await {
            Ok(build) => {
                debug!("latest remote build: {}", build);
                Ok(build)
            }
            Err(err) => {
                warn!("could not resolve latest build from {}: {:#}", self.index, err);
                Err(SupervisorError::RemoteResolution(format!("{:#}", err)))
            }
        }
    }

    async fn try_resolve(&self) -> anyhow::Result<BuildDescriptor> {
        let index: VersionIndex = self
            .get_json(self.index.clone())
            .await
            .context("version index request failed")?;
        let version = index
            .versions
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("version index lists no versions"))?;

        let builds_url = join_segments(&self.index, &[version.as_str()])
            .ok_or_else(|| anyhow!("index url {} cannot have path segments", self.index))?;
        let builds: VersionBuilds = self
            .get_json(builds_url)
            .await
            .with_context(|| format!("build index request for version {} failed", version))?;

        Ok(BuildDescriptor::new(version, builds.builds.latest))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> anyhow::Result<T> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.json::<T>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::management::test_utils;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    async fn resolver_for(router: Router) -> VersionResolver {
        let base = test_utils::serve(router).await;
        VersionResolver::new(
            Client::new(),
            Url::parse(&format!("{}/waterfall", base)).unwrap(),
        )
    }

    #[tokio::test]
    async fn resolves_first_version_and_latest_build() {
        let resolver = resolver_for(test_utils::paper_router()).await;

        let build = resolver.resolve().await.unwrap();

        assert_eq!(build.version, "1.16.1");
        assert_eq!(build.build, "133");
        assert_eq!(build.to_string(), "1.16.1/133");
    }

    #[tokio::test]
    async fn numeric_build_is_accepted() {
        let router = Router::new()
            .route("/waterfall", get(|| async { Json(json!({ "versions": ["1.20"] })) }))
            .route(
                "/waterfall/1.20",
                get(|| async { Json(json!({ "builds": { "latest": 562 } })) }),
            );
        let resolver = resolver_for(router).await;

        assert_eq!(resolver.resolve().await.unwrap().to_string(), "1.20/562");
    }

    #[tokio::test]
    async fn http_error_is_remote_resolution_error() {
        let resolver = resolver_for(test_utils::broken_router()).await;

        let err = resolver.resolve().await.unwrap_err();

        assert!(matches!(err, SupervisorError::RemoteResolution(_)));
    }

    #[tokio::test]
    async fn missing_fields_are_remote_resolution_errors() {
        let empty_versions = Router::new()
            .route("/waterfall", get(|| async { Json(json!({ "versions": [] })) }));
        let err = resolver_for(empty_versions).await.resolve().await.unwrap_err();
        assert!(matches!(err, SupervisorError::RemoteResolution(_)));

        let no_latest = Router::new()
            .route("/waterfall", get(|| async { Json(json!({ "versions": ["1.16.1"] })) }))
            .route(
                "/waterfall/1.16.1",
                get(|| async { Json(json!({ "builds": { "all": ["1"] } })) }),
            );
        let err = resolver_for(no_latest).await.resolve().await.unwrap_err();
        assert!(matches!(err, SupervisorError::RemoteResolution(_)));

        let not_json = Router::new().route("/waterfall", get(|| async { "<html>" }));
        let err = resolver_for(not_json).await.resolve().await.unwrap_err();
        assert!(matches!(err, SupervisorError::RemoteResolution(_)));
    }
}
