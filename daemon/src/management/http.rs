use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::config::RemoteConfig;
use crate::management::error::{SupervisorError, SupervisorResult};

pub fn build_http_client(remote: &RemoteConfig) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    let mut builder = Client::builder()
        .user_agent(remote.user_agent.as_str())
        .default_headers(default_headers);
    // no timeout unless configured: a hung index blocks install/update
    if let Some(secs) = remote.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build()
}

/// Appends path segments to `base`, ignoring a trailing slash on it.
///
/// Returns `None` for urls that cannot carry a path (`mailto:`, `data:`, ...).
pub fn join_segments(base: &Url, segments: &[&str]) -> Option<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(segments);
    Some(url)
}

fn tmp_path(dest: &Path) -> PathBuf {
    let mut name = OsString::from(dest.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Streams `url` into `dest`, replacing whatever was there.
///
/// The body lands in `<dest>.tmp` first and is renamed into place once complete,
/// so `dest` never holds a partial download.
pub async fn download_file(client: &Client, url: &Url, dest: &Path) -> SupervisorResult<()> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| SupervisorError::fs(parent, e))?;
    }

    let tmp = tmp_path(dest);
    if let Err(err) = stream_to(client, url, &tmp).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(err);
    }

    tokio::fs::rename(&tmp, dest)
        .await
        .map_err(|e| SupervisorError::fs(dest, e))?;
    debug!("downloaded: {} -> {}", url, dest.display());
    Ok(())
}

async fn stream_to(client: &Client, url: &Url, path: &Path) -> SupervisorResult<()> {
    let response = client
        .get(url.clone())
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| SupervisorError::network(url, e))?;

    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| SupervisorError::fs(path, e))?;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| SupervisorError::network(url, e))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| SupervisorError::fs(path, e))?;
    }
    file.flush().await.map_err(|e| SupervisorError::fs(path, e))?;
    file.sync_all()
        .await
        .map_err(|e| SupervisorError::fs(path, e))?;
    Ok(())
}
