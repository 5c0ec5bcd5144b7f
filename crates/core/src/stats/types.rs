//! Statistics document types.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date key format of `daily` entries.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Counters for one downloader instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloaderStat {
    #[serde(default)]
    pub success: u64,
    #[serde(default)]
    pub failed: u64,
    /// Site name -> number of torrents.
    #[serde(default)]
    pub trackers: BTreeMap<String, u64>,
    /// Site name -> bytes.
    #[serde(default)]
    pub volumes: BTreeMap<String, u64>,
}

impl DownloaderStat {
    /// Torrents processed, successful or not.
    pub fn processed(&self) -> u64 {
        self.success + self.failed
    }

    pub fn total_volume(&self) -> u64 {
        self.volumes.values().sum()
    }
}

/// The persisted statistics document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsDocument {
    /// `YYYY-MM-DD` -> downloader name -> counters.
    #[serde(default)]
    pub daily: BTreeMap<String, BTreeMap<String, DownloaderStat>>,
    /// Downloader name -> cumulative counters.
    #[serde(default)]
    pub total: BTreeMap<String, DownloaderStat>,
}

impl StatsDocument {
    pub fn is_empty(&self) -> bool {
        self.daily.is_empty() && self.total.is_empty()
    }

    /// Today and cumulative totals across all downloaders.
    pub fn summary(&self, today: NaiveDate) -> StatsSummary {
        let today_key = today.format(DATE_FORMAT).to_string();
        let (today_count, today_volume) = self
            .daily
            .get(&today_key)
            .map(|clients| sum_stats(clients.values()))
            .unwrap_or((0, 0));
        let (total_count, total_volume) = sum_stats(self.total.values());

        StatsSummary {
            date: today_key,
            today_count,
            today_volume,
            total_count,
            total_volume,
        }
    }
}

fn sum_stats<'a>(stats: impl Iterator<Item = &'a DownloaderStat>) -> (u64, u64) {
    stats.fold((0, 0), |(count, volume), stat| {
        (count + stat.processed(), volume + stat.total_volume())
    })
}

/// Aggregated figures shown in notifications and the stats endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub date: String,
    pub today_count: u64,
    pub today_volume: u64,
    pub total_count: u64,
    pub total_volume: u64,
}

/// Per-site torrent counts and byte volumes from one or more reseeds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteAttribution {
    pub counts: BTreeMap<String, u64>,
    pub volumes: BTreeMap<String, u64>,
}

impl SiteAttribution {
    /// Attribution of a single torrent.
    pub fn single(site: impl Into<String>, volume: u64) -> Self {
        let site = site.into();
        let mut attribution = Self::default();
        attribution.counts.insert(site.clone(), 1);
        attribution.volumes.insert(site, volume);
        attribution
    }

    /// Add another attribution into this one.
    pub fn merge(&mut self, other: &SiteAttribution) {
        for (site, count) in &other.counts {
            *self.counts.entry(site.clone()).or_insert(0) += count;
        }
        for (site, volume) in &other.volumes {
            *self.volumes.entry(site.clone()).or_insert(0) += volume;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty() && self.volumes.is_empty()
    }
}

/// Human-readable volume: MB below 1 GiB, GB below 1 TiB, else TB.
pub fn format_volume(bytes: u64) -> String {
    const MB: f64 = 1024.0 * 1024.0;
    const GB: f64 = MB * 1024.0;
    const TB: f64 = GB * 1024.0;

    if bytes == 0 {
        return "0B".to_string();
    }
    let b = bytes as f64;
    if b < GB {
        format!("{:.1}MB", b / MB)
    } else if b < TB {
        format!("{:.1}GB", b / GB)
    } else {
        format!("{:.1}TB", b / TB)
    }
}
