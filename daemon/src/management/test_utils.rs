use std::path::PathBuf;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use url::Url;

use crate::config::RemoteConfig;
use crate::management::java::RuntimeLocator;

pub const ARTIFACT_BODY: &[u8] = b"PK\x03\x04 waterfall stub jar";
pub const CONFIG_TEMPLATE: &str = "player_limit: {{maxplayers}}\nlisteners:\n- query_port: {{queryport}}\n  motd: '{{motd}}'\n  host: {{ip_port}}\n";

/// Serves `router` on an ephemeral localhost port and returns its base url.
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A papermc-shaped api: one version, one build, one jar and a config template.
pub fn paper_router() -> Router {
    Router::new()
        .route(
            "/waterfall",
            get(|| async { Json(json!({ "project": "waterfall", "versions": ["1.16.1", "1.15"] })) }),
        )
        .route(
            "/waterfall/1.16.1",
            get(|| async { Json(json!({ "builds": { "latest": "133", "all": ["132", "133"] } })) }),
        )
        .route(
            "/waterfall/1.16.1/133/download",
            get(|| async { ARTIFACT_BODY }),
        )
        .route("/config.yml", get(|| async { CONFIG_TEMPLATE }))
}

/// Same paths as [`paper_router`], but everything answers 500.
pub fn broken_router() -> Router {
    Router::new().fallback(|| async { StatusCode::INTERNAL_SERVER_ERROR })
}

pub fn remote_config(base: &str) -> RemoteConfig {
    RemoteConfig {
        index_url: Url::parse(&format!("{}/waterfall", base)).unwrap(),
        artifact_base_url: Url::parse(&format!("{}/waterfall", base)).unwrap(),
        config_template_url: Url::parse(&format!("{}/config.yml", base)).unwrap(),
        ..RemoteConfig::default()
    }
}

pub struct StubRuntime(pub Option<PathBuf>);

impl RuntimeLocator for StubRuntime {
    fn locate(&self) -> Option<PathBuf> {
        self.0.clone()
    }
}
