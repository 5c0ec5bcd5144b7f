//! Testing utilities and mock implementations.
//!
//! Mock collaborators for exercising the reseed pipeline without a real
//! qBittorrent instance or notification endpoint.
//!
//! # Example
//!
//! ```rust,ignore
//! use reseedjump_core::testing::{fixtures, MockDownloaderClient, MockOperation};
//!
//! let client = MockDownloaderClient::new("qb");
//! client.add_mock_torrent(fixtures::paused_torrent("abc", "seed")).await;
//! client.fail(MockOperation::Add).await;
//! ```

mod mock_downloader_client;
mod mock_notifier;

pub use mock_downloader_client::{MockDownloaderClient, MockOperation};
pub use mock_notifier::MockNotifier;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::torrent_client::{TorrentRecord, TorrentState};

    /// Paused, completed torrent with the given tags and a tracker.
    pub fn paused_torrent(hash: &str, tags: &str) -> TorrentRecord {
        TorrentRecord::new(hash, format!("Torrent {}", hash), TorrentState::PausedUploading)
            .with_tags(tags)
            .with_save_path("/downloads")
            .with_size(1024 * 1024 * 100)
            .with_tracker("https://tracker.example.org/announce")
    }

    /// Seeding torrent with the given tags and a tracker.
    pub fn seeding_torrent(hash: &str, tags: &str) -> TorrentRecord {
        TorrentRecord::new(hash, format!("Torrent {}", hash), TorrentState::Seeding)
            .with_tags(tags)
            .with_save_path("/downloads")
            .with_size(1024 * 1024 * 50)
            .with_tracker("https://tracker.example.org/announce")
    }
}
