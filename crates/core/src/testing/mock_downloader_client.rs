//! Mock downloader client for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::torrent_client::{
    AddTorrentRequest, DownloaderClient, TorrentClientError, TorrentRecord, TorrentState,
};

/// Operations whose failure can be scripted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOperation {
    List,
    Trackers,
    Export,
    Delete,
    Add,
}

#[derive(Debug, Clone)]
struct ScriptedFailure {
    operation: MockOperation,
    /// `None` fails every hash.
    hash: Option<String>,
}

/// Mock implementation of the DownloaderClient trait.
///
/// Provides controllable behavior for testing:
/// - Pre-populated torrent list, kept in insertion order
/// - Recorded exports, deletes and adds for assertions
/// - Scripted failures per operation, optionally per hash
#[derive(Debug, Clone)]
pub struct MockDownloaderClient {
    name: String,
    connected: Arc<RwLock<bool>>,
    torrents: Arc<RwLock<Vec<TorrentRecord>>>,
    trackers: Arc<RwLock<Vec<(String, Vec<String>)>>>,
    failures: Arc<RwLock<Vec<ScriptedFailure>>>,
    exported: Arc<RwLock<Vec<String>>>,
    deleted: Arc<RwLock<Vec<(String, bool)>>>,
    added: Arc<RwLock<Vec<AddTorrentRequest>>>,
}

impl MockDownloaderClient {
    /// Create a connected mock client with no torrents.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connected: Arc::new(RwLock::new(true)),
            torrents: Arc::new(RwLock::new(Vec::new())),
            trackers: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(RwLock::new(Vec::new())),
            exported: Arc::new(RwLock::new(Vec::new())),
            deleted: Arc::new(RwLock::new(Vec::new())),
            added: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Pre-populate a torrent.
    pub async fn add_mock_torrent(&self, record: TorrentRecord) {
        self.torrents.write().await.push(record);
    }

    /// Tracker list returned by `torrent_trackers` for a hash.
    pub async fn set_trackers<I, S>(&self, hash: &str, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let urls: Vec<String> = urls.into_iter().map(Into::into).collect();
        self.trackers.write().await.push((hash.to_string(), urls));
    }

    pub async fn set_connected(&self, connected: bool) {
        *self.connected.write().await = connected;
    }

    /// Make every call of `operation` fail.
    pub async fn fail(&self, operation: MockOperation) {
        self.failures.write().await.push(ScriptedFailure {
            operation,
            hash: None,
        });
    }

    /// Make `operation` fail for one hash only.
    pub async fn fail_for(&self, operation: MockOperation, hash: &str) {
        self.failures.write().await.push(ScriptedFailure {
            operation,
            hash: Some(hash.to_string()),
        });
    }

    /// Clear all scripted failures.
    pub async fn clear_failures(&self) {
        self.failures.write().await.clear();
    }

    pub async fn exported_hashes(&self) -> Vec<String> {
        self.exported.read().await.clone()
    }

    pub async fn deleted(&self) -> Vec<(String, bool)> {
        self.deleted.read().await.clone()
    }

    pub async fn added_requests(&self) -> Vec<AddTorrentRequest> {
        self.added.read().await.clone()
    }

    pub async fn has_torrent(&self, hash: &str) -> bool {
        self.torrents.read().await.iter().any(|t| t.hash == hash)
    }

    pub async fn torrent(&self, hash: &str) -> Option<TorrentRecord> {
        self.torrents
            .read()
            .await
            .iter()
            .find(|t| t.hash == hash)
            .cloned()
    }

    pub async fn torrent_count(&self) -> usize {
        self.torrents.read().await.len()
    }

    async fn check(&self, operation: MockOperation, hash: Option<&str>) -> Result<(), TorrentClientError> {
        let failures = self.failures.read().await;
        let hit = failures.iter().any(|f| {
            f.operation == operation
                && match (&f.hash, hash) {
                    (None, _) => true,
                    (Some(expected), Some(actual)) => expected == actual,
                    (Some(_), None) => false,
                }
        });
        if hit {
            Err(TorrentClientError::ApiError(format!(
                "scripted {:?} failure",
                operation
            )))
        } else {
            Ok(())
        }
    }
}

/// Fake `.torrent` payload that remembers which hash it came from.
fn fake_torrent_bytes(hash: &str) -> Vec<u8> {
    format!("d4:hash{}:{}e", hash.len(), hash).into_bytes()
}

fn hash_from_fake_bytes(data: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(data).ok()?;
    let rest = text.strip_prefix("d4:hash")?.strip_suffix('e')?;
    let (_, hash) = rest.split_once(':')?;
    Some(hash.to_string())
}

#[async_trait]
impl DownloaderClient for MockDownloaderClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_connected(&self) -> bool {
        *self.connected.read().await
    }

    async fn list_torrents(&self) -> Result<Vec<TorrentRecord>, TorrentClientError> {
        self.check(MockOperation::List, None).await?;
        Ok(self.torrents.read().await.clone())
    }

    async fn torrent_trackers(&self, hash: &str) -> Result<Vec<String>, TorrentClientError> {
        self.check(MockOperation::Trackers, Some(hash)).await?;
        Ok(self
            .trackers
            .read()
            .await
            .iter()
            .find(|(h, _)| h == hash)
            .map(|(_, urls)| urls.clone())
            .unwrap_or_default())
    }

    async fn export_torrent(&self, hash: &str) -> Result<Vec<u8>, TorrentClientError> {
        self.check(MockOperation::Export, Some(hash)).await?;
        if !self.has_torrent(hash).await {
            return Err(TorrentClientError::TorrentNotFound(hash.to_string()));
        }
        self.exported.write().await.push(hash.to_string());
        Ok(fake_torrent_bytes(hash))
    }

    async fn delete_torrent(
        &self,
        hash: &str,
        delete_files: bool,
    ) -> Result<(), TorrentClientError> {
        self.check(MockOperation::Delete, Some(hash)).await?;
        let mut torrents = self.torrents.write().await;
        let before = torrents.len();
        torrents.retain(|t| t.hash != hash);
        if torrents.len() == before {
            return Err(TorrentClientError::TorrentNotFound(hash.to_string()));
        }
        self.deleted
            .write()
            .await
            .push((hash.to_string(), delete_files));
        Ok(())
    }

    async fn add_torrent(&self, request: AddTorrentRequest) -> Result<(), TorrentClientError> {
        let hash = hash_from_fake_bytes(&request.data)
            .ok_or_else(|| TorrentClientError::InvalidTorrent("unrecognized payload".to_string()))?;
        self.check(MockOperation::Add, Some(&hash)).await?;

        let state = if request.paused {
            TorrentState::PausedUploading
        } else {
            TorrentState::Seeding
        };
        let record = TorrentRecord {
            hash: hash.clone(),
            name: format!("Torrent {}", hash),
            state,
            tags: request.tags.clone(),
            category: request.category.clone(),
            save_path: request.save_path.clone(),
            size_bytes: 0,
            tracker: None,
            trackers: Vec::new(),
        };

        self.added.write().await.push(request);
        self.torrents.write().await.push(record);
        Ok(())
    }
}
