//! Types for downloader client operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during downloader client operations.
#[derive(Debug, Error)]
pub enum TorrentClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Torrent not found: {0}")]
    TorrentNotFound(String),

    #[error("Invalid torrent data: {0}")]
    InvalidTorrent(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Lifecycle state of a torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentState {
    /// Complete and paused (`pausedUP` / `stoppedUP`).
    PausedUploading,
    /// Incomplete and paused (`pausedDL` / `stoppedDL`).
    PausedDownloading,
    /// Downloading from peers.
    Downloading,
    /// Seeding to peers.
    Seeding,
    /// Running but without traffic.
    Stalled,
    /// Checking file integrity.
    Checking,
    /// Queued for download or upload.
    Queued,
    /// Error or missing files.
    Error,
    /// Unknown state.
    Unknown,
}

impl TorrentState {
    /// Returns the string representation for logs and API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            TorrentState::PausedUploading => "paused_uploading",
            TorrentState::PausedDownloading => "paused_downloading",
            TorrentState::Downloading => "downloading",
            TorrentState::Seeding => "seeding",
            TorrentState::Stalled => "stalled",
            TorrentState::Checking => "checking",
            TorrentState::Queued => "queued",
            TorrentState::Error => "error",
            TorrentState::Unknown => "unknown",
        }
    }

    /// True only for the two explicit paused states.
    pub fn is_paused(&self) -> bool {
        matches!(
            self,
            TorrentState::PausedUploading | TorrentState::PausedDownloading
        )
    }
}

/// Tracker list entries that are not real trackers.
const PSEUDO_TRACKER_MARKERS: &[&str] = &["[DHT]", "[PeX]", "[LSD]"];

/// A torrent as reported by the downloader client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentRecord {
    /// Info hash (lowercase hex).
    pub hash: String,
    /// Display name.
    pub name: String,
    /// Current state.
    pub state: TorrentState,
    /// Assigned tags, trimmed, without empty entries.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Assigned category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Save path on disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_path: Option<String>,
    /// Declared size in bytes.
    pub size_bytes: u64,
    /// Currently announcing tracker, if the client reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracker: Option<String>,
    /// Full tracker list, including pseudo entries such as `** [DHT] **`.
    #[serde(default)]
    pub trackers: Vec<String>,
}

impl TorrentRecord {
    /// Minimal record; remaining fields are set through the `with_*` builders.
    pub fn new(hash: impl Into<String>, name: impl Into<String>, state: TorrentState) -> Self {
        Self {
            hash: hash.into(),
            name: name.into(),
            state,
            tags: Vec::new(),
            category: None,
            save_path: None,
            size_bytes: 0,
            tracker: None,
            trackers: Vec::new(),
        }
    }

    /// Set tags from a comma-joined string.
    pub fn with_tags(mut self, tags: &str) -> Self {
        self.tags = split_list(tags);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = non_empty(category.into());
        self
    }

    pub fn with_save_path(mut self, path: impl Into<String>) -> Self {
        self.save_path = non_empty(path.into());
        self
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    pub fn with_tracker(mut self, tracker: impl Into<String>) -> Self {
        self.tracker = non_empty(tracker.into());
        self
    }

    pub fn with_trackers<I, S>(mut self, trackers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trackers = trackers.into_iter().map(Into::into).collect();
        self
    }

    /// The tracker URL used for site attribution.
    ///
    /// The single-tracker field wins; otherwise the first list entry that is
    /// not a DHT/PeX/LSD marker.
    pub fn effective_tracker(&self) -> Option<&str> {
        if let Some(tracker) = self.tracker.as_deref().filter(|t| !t.is_empty()) {
            return Some(tracker);
        }
        self.trackers
            .iter()
            .map(String::as_str)
            .find(|url| {
                !url.is_empty()
                    && !PSEUDO_TRACKER_MARKERS
                        .iter()
                        .any(|marker| url.contains(marker))
            })
    }
}

/// Request to add a torrent from `.torrent` file contents.
#[derive(Debug, Clone, PartialEq)]
pub struct AddTorrentRequest {
    /// Raw .torrent file bytes.
    pub data: Vec<u8>,
    /// File name sent with the upload.
    pub filename: Option<String>,
    /// Save path override.
    pub save_path: Option<String>,
    /// Category to assign.
    pub category: Option<String>,
    /// Tags to assign.
    pub tags: Vec<String>,
    /// Add in paused state.
    pub paused: bool,
    /// Skip hash verification of existing data.
    pub skip_checking: bool,
}

impl AddTorrentRequest {
    /// Create a request with default options.
    pub fn torrent_file(data: Vec<u8>) -> Self {
        Self {
            data,
            filename: None,
            save_path: None,
            category: None,
            tags: Vec::new(),
            paused: false,
            skip_checking: false,
        }
    }

    pub fn with_filename(mut self, name: impl Into<String>) -> Self {
        self.filename = Some(name.into());
        self
    }

    pub fn with_save_path(mut self, path: Option<String>) -> Self {
        self.save_path = path;
        self
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }

    pub fn with_skip_checking(mut self, skip: bool) -> Self {
        self.skip_checking = skip;
        self
    }
}

/// Trait for downloader client backends.
///
/// `name` is the configured instance name, which also keys statistics.
#[async_trait]
pub trait DownloaderClient: Send + Sync {
    /// Configured instance name.
    fn name(&self) -> &str;

    /// Whether the client is reachable and logged in.
    async fn is_connected(&self) -> bool;

    /// List every torrent known to the client.
    async fn list_torrents(&self) -> Result<Vec<TorrentRecord>, TorrentClientError>;

    /// Tracker URLs of one torrent, pseudo entries included.
    async fn torrent_trackers(&self, hash: &str) -> Result<Vec<String>, TorrentClientError>;

    /// Export the `.torrent` file of a torrent.
    async fn export_torrent(&self, hash: &str) -> Result<Vec<u8>, TorrentClientError>;

    /// Remove a torrent. If `delete_files` is true, also delete downloaded files.
    async fn delete_torrent(&self, hash: &str, delete_files: bool)
        -> Result<(), TorrentClientError>;

    /// Add a torrent from file contents.
    async fn add_torrent(&self, request: AddTorrentRequest) -> Result<(), TorrentClientError>;
}

/// Split a comma-joined list, trimming entries and dropping empty ones.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

pub(super) fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
