//! Per-torrent reseed: export, delete, re-add with skip-checking.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::config::JobConfig;
use crate::stats::SiteAttribution;
use crate::torrent_client::{AddTorrentRequest, DownloaderClient, TorrentRecord};
use crate::tracker::{classify, TrackerMapping, SITE_OTHER_SITE};

/// Options applied to every torrent of a run.
#[derive(Debug, Clone)]
pub struct ReseedOptions {
    /// Tag added on re-add; empty adds none.
    pub processed_tag: String,
    /// Category forced on re-add, takes priority over preservation.
    pub processed_category: Option<String>,
    pub preserve_category: bool,
    /// Start immediately instead of adding paused.
    pub auto_start: bool,
    /// Where exported `.torrent` files are kept.
    pub export_dir: PathBuf,
    /// Remove the exported file after a successful re-add.
    pub delete_exported: bool,
}

impl ReseedOptions {
    pub fn from_job(job: &JobConfig) -> Self {
        let processed_category = job.processed_category.trim();
        Self {
            processed_tag: job.processed_tag.trim().to_string(),
            processed_category: (!processed_category.is_empty())
                .then(|| processed_category.to_string()),
            preserve_category: job.preserve_category,
            auto_start: job.auto_start,
            export_dir: job.export_dir(),
            delete_exported: job.delete_exported,
        }
    }

    /// Category to assign on re-add.
    pub fn target_category(&self, original: Option<&str>) -> Option<String> {
        if let Some(category) = &self.processed_category {
            return Some(category.clone());
        }
        if self.preserve_category {
            return original
                .filter(|c| !c.is_empty())
                .map(|c| c.to_string());
        }
        None
    }
}

/// Step at which a reseed failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReseedFailure {
    /// Nothing was changed on the client.
    Export(String),
    /// Export succeeded but the torrent is still present.
    Delete(String),
    /// The torrent was deleted and could not be re-added.
    Readd(String),
}

impl ReseedFailure {
    /// Whether the torrent is now missing from the client.
    pub fn is_destructive(&self) -> bool {
        matches!(self, ReseedFailure::Readd(_))
    }
}

impl std::fmt::Display for ReseedFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReseedFailure::Export(e) => write!(f, "export failed: {}", e),
            ReseedFailure::Delete(e) => write!(f, "delete failed: {}", e),
            ReseedFailure::Readd(e) => write!(f, "re-add failed: {}", e),
        }
    }
}

/// Result of reseeding one torrent.
#[derive(Debug, Clone)]
pub struct ReseedOutcome {
    pub hash: String,
    pub success: bool,
    /// Site the torrent is attributed to.
    pub site: String,
    /// Torrent size in bytes.
    pub volume: u64,
    pub failure: Option<ReseedFailure>,
}

impl ReseedOutcome {
    /// Site attribution for statistics, captured whether or not the reseed succeeded.
    pub fn attribution(&self) -> SiteAttribution {
        SiteAttribution::single(self.site.clone(), self.volume)
    }
}

/// Executes the reseed sequence for single torrents.
pub struct ReseedExecutor {
    options: ReseedOptions,
    mapping: TrackerMapping,
}

impl ReseedExecutor {
    pub fn new(options: ReseedOptions, mapping: TrackerMapping) -> Self {
        Self { options, mapping }
    }

    pub fn options(&self) -> &ReseedOptions {
        &self.options
    }

    /// Reseed one torrent on `client`.
    ///
    /// Never returns an error: every failure is reported in the outcome.
    /// A failure after delete leaves the exported file on disk.
    pub async fn reseed(
        &self,
        torrent: &TorrentRecord,
        client: &dyn DownloaderClient,
    ) -> ReseedOutcome {
        let site = self.resolve_site(torrent, client).await;
        let mut outcome = ReseedOutcome {
            hash: torrent.hash.clone(),
            success: false,
            site,
            volume: torrent.size_bytes,
            failure: None,
        };

        let data = match client.export_torrent(&torrent.hash).await {
            Ok(data) => data,
            Err(e) => {
                warn!(hash = %torrent.hash, name = %torrent.name, error = %e, "Failed to export torrent");
                outcome.failure = Some(ReseedFailure::Export(e.to_string()));
                return outcome;
            }
        };

        let export_path = match self.write_export(&torrent.hash, &data).await {
            Ok(path) => path,
            Err(e) => {
                warn!(hash = %torrent.hash, error = %e, "Failed to write exported torrent file");
                outcome.failure = Some(ReseedFailure::Export(e.to_string()));
                return outcome;
            }
        };

        if let Err(e) = client.delete_torrent(&torrent.hash, false).await {
            warn!(hash = %torrent.hash, error = %e, "Failed to delete torrent");
            outcome.failure = Some(ReseedFailure::Delete(e.to_string()));
            return outcome;
        }

        let mut request = AddTorrentRequest::torrent_file(data)
            .with_filename(format!("{}.torrent", torrent.hash))
            .with_save_path(torrent.save_path.clone())
            .with_category(self.options.target_category(torrent.category.as_deref()))
            .with_paused(!self.options.auto_start)
            .with_skip_checking(true);
        if !self.options.processed_tag.is_empty() {
            request = request.with_tag(self.options.processed_tag.clone());
        }

        if let Err(e) = client.add_torrent(request).await {
            error!(
                hash = %torrent.hash,
                name = %torrent.name,
                client = client.name(),
                export_file = %export_path.display(),
                error = %e,
                "Torrent was deleted but re-adding failed; restore it from the exported file"
            );
            outcome.failure = Some(ReseedFailure::Readd(e.to_string()));
            return outcome;
        }

        if self.options.delete_exported {
            if let Err(e) = tokio::fs::remove_file(&export_path).await {
                debug!(path = %export_path.display(), error = %e, "Could not remove exported file");
            }
        }

        info!(
            hash = %torrent.hash,
            name = %torrent.name,
            site = %outcome.site,
            "Torrent reseeded"
        );
        outcome.success = true;
        outcome
    }

    async fn resolve_site(&self, torrent: &TorrentRecord, client: &dyn DownloaderClient) -> String {
        if let Some(tracker) = torrent.effective_tracker() {
            return classify(tracker, &self.mapping);
        }

        if torrent.trackers.is_empty() {
            match client.torrent_trackers(&torrent.hash).await {
                Ok(urls) => {
                    let fetched = torrent.clone().with_trackers(urls);
                    if let Some(tracker) = fetched.effective_tracker() {
                        return classify(tracker, &self.mapping);
                    }
                }
                Err(e) => {
                    debug!(hash = %torrent.hash, error = %e, "Could not fetch tracker list");
                }
            }
        }

        SITE_OTHER_SITE.to_string()
    }

    async fn write_export(&self, hash: &str, data: &[u8]) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.options.export_dir).await?;
        let path = export_path(&self.options.export_dir, hash);
        tokio::fs::write(&path, data).await?;
        Ok(path)
    }
}

fn export_path(dir: &Path, hash: &str) -> PathBuf {
    dir.join(format!("{}.torrent", hash))
}
