//! Downloader client abstraction.
//!
//! This module provides a `DownloaderClient` trait for listing, exporting,
//! deleting and re-adding torrents, with a qBittorrent backend.

mod qbittorrent;
mod types;

pub use qbittorrent::QBittorrentClient;
pub use types::*;
