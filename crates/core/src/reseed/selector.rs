//! Candidate filtering.

use serde::{Deserialize, Serialize};

use crate::config::JobConfig;
use crate::torrent_client::TorrentRecord;

/// Which torrents qualify for a reseed jump. All configured rules must pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateFilter {
    /// Require an explicit paused state.
    pub paused_only: bool,
    /// When non-empty, the torrent must carry at least one of these tags.
    pub include_tags: Vec<String>,
    /// When non-empty, the torrent's category must be one of these.
    pub include_categories: Vec<String>,
}

impl CandidateFilter {
    pub fn from_job(job: &JobConfig) -> Self {
        Self {
            paused_only: job.paused_only,
            include_tags: job.include_tag_list(),
            include_categories: job.include_category_list(),
        }
    }

    pub fn is_candidate(&self, torrent: &TorrentRecord) -> bool {
        if self.paused_only && !torrent.state.is_paused() {
            return false;
        }

        if !self.include_tags.is_empty()
            && !torrent
                .tags
                .iter()
                .any(|tag| self.include_tags.contains(tag))
        {
            return false;
        }

        if !self.include_categories.is_empty() {
            match &torrent.category {
                Some(category) if self.include_categories.contains(category) => {}
                _ => return false,
            }
        }

        true
    }

    /// Candidates from a full torrent list, in list order.
    pub fn select<'a>(&self, torrents: &'a [TorrentRecord]) -> Vec<&'a TorrentRecord> {
        torrents.iter().filter(|t| self.is_candidate(t)).collect()
    }
}
