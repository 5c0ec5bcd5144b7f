//! qBittorrent WebUI API v2 client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder, Response};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::DownloaderConfig;

use super::types::non_empty;
use super::{
    split_list, AddTorrentRequest, DownloaderClient, TorrentClientError, TorrentRecord,
    TorrentState,
};

/// Fixed timeout for `.torrent` export requests.
const EXPORT_TIMEOUT: Duration = Duration::from_secs(20);

/// qBittorrent client implementation.
pub struct QBittorrentClient {
    client: Client,
    config: DownloaderConfig,
    /// Set once logged in; cleared when the session expires.
    session: Arc<RwLock<Option<String>>>,
}

impl QBittorrentClient {
    /// Create a new qBittorrent client.
    pub fn new(config: DownloaderConfig) -> Result<Self, TorrentClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .cookie_store(true)
            .build()
            .map_err(|e| TorrentClientError::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            session: Arc::new(RwLock::new(None)),
        })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url(), endpoint)
    }

    /// Login and store session cookie.
    async fn login(&self) -> Result<(), TorrentClientError> {
        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self
            .client
            .post(self.url("/api/v2/auth/login"))
            .form(&params)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if body.contains("Ok.") {
            debug!(client = %self.config.name, "qBittorrent login successful");
            *self.session.write().await = Some("authenticated".to_string());
            Ok(())
        } else if body.contains("Fails.") || status.as_u16() == 403 {
            Err(TorrentClientError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ))
        } else {
            Err(TorrentClientError::AuthenticationFailed(format!(
                "Unexpected response: {}",
                body.chars().take(100).collect::<String>()
            )))
        }
    }

    /// Ensure we have a valid session, logging in if needed.
    async fn ensure_authenticated(&self) -> Result<(), TorrentClientError> {
        if self.session.read().await.is_some() {
            return Ok(());
        }
        self.login().await
    }

    /// Send an authenticated request, logging in again once on HTTP 403.
    ///
    /// `build` is called again for the retry, so multipart bodies are
    /// rebuilt rather than reused.
    async fn send<F>(&self, build: F) -> Result<Response, TorrentClientError>
    where
        F: Fn(&Client) -> Result<RequestBuilder, TorrentClientError>,
    {
        self.ensure_authenticated().await?;

        let response = build(&self.client)?.send().await.map_err(map_send_error)?;

        let response = if response.status().as_u16() == 403 {
            warn!(client = %self.config.name, "qBittorrent session expired, re-authenticating");
            *self.session.write().await = None;
            self.login().await?;
            build(&self.client)?.send().await.map_err(map_send_error)?
        } else {
            response
        };

        let status = response.status();
        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }
        Ok(response)
    }

    async fn get_text(&self, endpoint: &str) -> Result<String, TorrentClientError> {
        let url = self.url(endpoint);
        self.send(|c| Ok(c.get(&url)))
            .await?
            .text()
            .await
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))
    }

    async fn post_form(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<String, TorrentClientError> {
        let url = self.url(endpoint);
        self.send(|c| Ok(c.post(&url).form(params)))
            .await?
            .text()
            .await
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))
    }
}

/// qBittorrent torrent info response.
#[derive(Debug, Deserialize)]
struct QBTorrentInfo {
    hash: String,
    name: String,
    state: String,
    #[serde(default)]
    size: i64,
    #[serde(default)]
    total_size: i64,
    #[serde(default)]
    save_path: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    tracker: String,
}

impl QBTorrentInfo {
    fn into_record(self) -> TorrentRecord {
        let size = if self.size > 0 { self.size } else { self.total_size };
        TorrentRecord {
            hash: self.hash.to_lowercase(),
            name: self.name,
            state: parse_qb_state(&self.state),
            tags: split_list(&self.tags),
            category: non_empty(self.category),
            save_path: non_empty(self.save_path),
            size_bytes: size.max(0) as u64,
            tracker: non_empty(self.tracker),
            trackers: Vec::new(),
        }
    }
}

/// qBittorrent tracker list entry.
#[derive(Debug, Deserialize)]
struct QBTracker {
    url: String,
}

/// Parse qBittorrent state string to TorrentState.
fn parse_qb_state(state: &str) -> TorrentState {
    match state {
        "pausedUP" | "stoppedUP" => TorrentState::PausedUploading,
        "pausedDL" | "stoppedDL" => TorrentState::PausedDownloading,
        "downloading" | "forcedDL" | "metaDL" | "forcedMetaDL" | "allocating" => {
            TorrentState::Downloading
        }
        "uploading" | "forcedUP" => TorrentState::Seeding,
        "stalledDL" | "stalledUP" => TorrentState::Stalled,
        "checkingDL" | "checkingUP" | "checkingResumeData" | "moving" => TorrentState::Checking,
        "queuedDL" | "queuedUP" => TorrentState::Queued,
        "error" | "missingFiles" => TorrentState::Error,
        _ => TorrentState::Unknown,
    }
}

fn map_send_error(e: reqwest::Error) -> TorrentClientError {
    if e.is_timeout() {
        TorrentClientError::Timeout
    } else if e.is_connect() {
        TorrentClientError::ConnectionFailed(e.to_string())
    } else {
        TorrentClientError::ApiError(e.to_string())
    }
}

/// Multipart form for `/api/v2/torrents/add`.
fn build_add_form(request: &AddTorrentRequest) -> Result<multipart::Form, TorrentClientError> {
    let file_part = multipart::Part::bytes(request.data.clone())
        .file_name(
            request
                .filename
                .clone()
                .unwrap_or_else(|| "torrent.torrent".to_string()),
        )
        .mime_str("application/x-bittorrent")
        .map_err(|e| TorrentClientError::InvalidTorrent(e.to_string()))?;

    let paused = if request.paused { "true" } else { "false" };
    let mut form = multipart::Form::new()
        .part("torrents", file_part)
        // qBittorrent 5 renamed `paused` to `stopped`; send both.
        .text("paused", paused)
        .text("stopped", paused);

    if let Some(path) = &request.save_path {
        form = form.text("savepath", path.clone());
    }
    if let Some(cat) = &request.category {
        form = form.text("category", cat.clone());
    }
    if !request.tags.is_empty() {
        form = form.text("tags", request.tags.join(","));
    }
    if request.skip_checking {
        form = form.text("skip_checking", "true");
    }
    Ok(form)
}

#[async_trait]
impl DownloaderClient for QBittorrentClient {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn is_connected(&self) -> bool {
        match self.get_text("/api/v2/app/version").await {
            Ok(version) => {
                debug!(client = %self.config.name, version = %version.trim(), "qBittorrent reachable");
                true
            }
            Err(e) => {
                warn!(client = %self.config.name, "qBittorrent not reachable: {}", e);
                false
            }
        }
    }

    async fn list_torrents(&self) -> Result<Vec<TorrentRecord>, TorrentClientError> {
        let response = self.get_text("/api/v2/torrents/info").await?;
        let torrents: Vec<QBTorrentInfo> = serde_json::from_str(&response).map_err(|e| {
            TorrentClientError::ApiError(format!("Failed to parse response: {}", e))
        })?;

        Ok(torrents.into_iter().map(QBTorrentInfo::into_record).collect())
    }

    async fn torrent_trackers(&self, hash: &str) -> Result<Vec<String>, TorrentClientError> {
        let endpoint = format!(
            "/api/v2/torrents/trackers?hash={}",
            urlencoding::encode(&hash.to_lowercase())
        );
        let response = self.get_text(&endpoint).await?;
        let trackers: Vec<QBTracker> = serde_json::from_str(&response).map_err(|e| {
            TorrentClientError::ApiError(format!("Failed to parse response: {}", e))
        })?;

        Ok(trackers.into_iter().map(|t| t.url).collect())
    }

    async fn export_torrent(&self, hash: &str) -> Result<Vec<u8>, TorrentClientError> {
        let url = self.url(&format!(
            "/api/v2/torrents/export?hash={}",
            urlencoding::encode(&hash.to_lowercase())
        ));

        let response = self
            .send(|c| Ok(c.get(&url).timeout(EXPORT_TIMEOUT)))
            .await
            .map_err(|e| match e {
                TorrentClientError::ApiError(msg) if msg.contains("404") => {
                    TorrentClientError::TorrentNotFound(hash.to_string())
                }
                other => other,
            })?;

        let bytes = response.bytes().await.map_err(map_send_error)?;
        if bytes.is_empty() {
            return Err(TorrentClientError::InvalidTorrent(format!(
                "empty export for {}",
                hash
            )));
        }
        Ok(bytes.to_vec())
    }

    async fn delete_torrent(
        &self,
        hash: &str,
        delete_files: bool,
    ) -> Result<(), TorrentClientError> {
        let hash_lower = hash.to_lowercase();
        let delete_str = if delete_files { "true" } else { "false" };

        self.post_form(
            "/api/v2/torrents/delete",
            &[("hashes", hash_lower.as_str()), ("deleteFiles", delete_str)],
        )
        .await?;

        Ok(())
    }

    async fn add_torrent(&self, request: AddTorrentRequest) -> Result<(), TorrentClientError> {
        let url = self.url("/api/v2/torrents/add");
        let body = self
            .send(|c| Ok(c.post(&url).multipart(build_add_form(&request)?)))
            .await?
            .text()
            .await
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))?;

        if body.contains("Fails.") {
            return Err(TorrentClientError::ApiError(
                "qBittorrent rejected the torrent".to_string(),
            ));
        }
        Ok(())
    }
}
