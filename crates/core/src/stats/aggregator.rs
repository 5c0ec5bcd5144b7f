//! Append-only statistics aggregation over a [`KvStore`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Duration, Local, NaiveDate};
use tracing::{debug, info, warn};

use super::{
    DownloaderStat, KvStore, SiteAttribution, StatsDocument, StatsSummary, StoreError,
    DATE_FORMAT,
};
use crate::tracker::{classify, is_unrecorded, TrackerMapping, SITE_UNKNOWN};

/// Key of the statistics document in the key-value store.
pub const STATS_KEY: &str = "stats";

/// Key of the tracker mapping last applied to the stored statistics.
pub const MAPPING_KEY: &str = "tracker_mapping";

/// Days of `daily` history kept after each write.
pub const RETENTION_DAYS: i64 = 30;

/// Counts of entries rewritten by [`StatsAggregator::reclassify_all`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReclassifyReport {
    pub daily_entries: usize,
    pub total_entries: usize,
}

impl ReclassifyReport {
    pub fn changed(&self) -> bool {
        self.daily_entries > 0 || self.total_entries > 0
    }
}

/// Folds reseed results into the persisted statistics document.
///
/// Every operation is a whole-document read-modify-write. They are
/// serialized inside the process; other processes writing the same key
/// still race (last writer wins).
pub struct StatsAggregator {
    store: Arc<dyn KvStore>,
    write_lock: Mutex<()>,
}

impl StatsAggregator {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Database("stats lock poisoned".to_string()))
    }

    /// Current document.
    pub fn snapshot(&self) -> Result<StatsDocument, StoreError> {
        let _guard = self.lock()?;
        self.load()
    }

    /// Today and cumulative totals.
    pub fn summary(&self) -> Result<StatsSummary, StoreError> {
        Ok(self.snapshot()?.summary(Local::now().date_naive()))
    }

    /// Fold one downloader's run results into today's and the cumulative entry.
    pub fn record(
        &self,
        client_name: &str,
        success: u64,
        failed: u64,
        attribution: &SiteAttribution,
    ) -> Result<(), StoreError> {
        self.record_on(Local::now().date_naive(), client_name, success, failed, attribution)
    }

    /// [`record`](Self::record) with an explicit "today".
    pub fn record_on(
        &self,
        today: NaiveDate,
        client_name: &str,
        success: u64,
        failed: u64,
        attribution: &SiteAttribution,
    ) -> Result<(), StoreError> {
        let _guard = self.lock()?;
        let mut doc = self.load()?;
        let today_key = today.format(DATE_FORMAT).to_string();

        let daily = doc
            .daily
            .entry(today_key)
            .or_default()
            .entry(client_name.to_string())
            .or_default();
        apply(daily, success, failed, attribution);

        let total = doc.total.entry(client_name.to_string()).or_default();
        apply(total, success, failed, attribution);

        let pruned = prune_daily(&mut doc, today);
        if pruned > 0 {
            debug!(pruned, "pruned expired daily statistics");
        }

        self.save(&doc)?;
        info!(
            client = client_name,
            success, failed, "statistics updated"
        );
        Ok(())
    }

    /// Re-run classification over the stored site names.
    ///
    /// Original tracker URLs are not kept, so this classifies the labels
    /// themselves. Buckets that collide are summed; `其他` and `未知站点`
    /// are dropped. Success and failure counts are untouched.
    pub fn reclassify_all(&self, mapping: &TrackerMapping) -> Result<ReclassifyReport, StoreError> {
        let _guard = self.lock()?;
        self.reclassify(mapping)
    }

    /// Reclassify when `mapping` differs from the one last applied.
    ///
    /// A store that never had a mapping applied counts as an empty mapping.
    /// Returns `None` when nothing changed.
    pub fn sync_mapping(
        &self,
        mapping: &TrackerMapping,
    ) -> Result<Option<ReclassifyReport>, StoreError> {
        let _guard = self.lock()?;
        let previous: TrackerMapping = match self.store.load(MAPPING_KEY)? {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| StoreError::Serialization(e.to_string()))?,
            None => TrackerMapping::default(),
        };
        if previous == *mapping {
            debug!("tracker mapping unchanged");
            return Ok(None);
        }

        info!(
            previous = previous.len(),
            current = mapping.len(),
            "tracker mapping changed, reclassifying statistics"
        );
        self.reclassify(mapping).map(Some)
    }

    fn reclassify(&self, mapping: &TrackerMapping) -> Result<ReclassifyReport, StoreError> {
        let mut doc = self.load()?;
        let mut report = ReclassifyReport::default();

        for (date, clients) in doc.daily.iter_mut() {
            for (client, stat) in clients.iter_mut() {
                if reclassify_stat(stat, mapping) {
                    debug!(date = %date, client = %client, "reclassified daily entry");
                    report.daily_entries += 1;
                }
            }
        }
        for (client, stat) in doc.total.iter_mut() {
            if reclassify_stat(stat, mapping) {
                debug!(client = %client, "reclassified cumulative entry");
                report.total_entries += 1;
            }
        }

        if report.changed() {
            self.save(&doc)?;
            info!(
                daily = report.daily_entries,
                total = report.total_entries,
                "historical statistics reclassified"
            );
        } else {
            info!("no statistics needed reclassification");
        }

        let applied =
            serde_json::to_value(mapping).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.save(MAPPING_KEY, &applied)?;
        Ok(report)
    }

    /// Replace the whole document with empty mappings.
    pub fn reset_all(&self) -> Result<(), StoreError> {
        let _guard = self.lock()?;
        self.save(&StatsDocument::default())?;
        info!("all statistics cleared");
        Ok(())
    }

    /// Load the document, dropping legacy `未知站点` buckets.
    fn load(&self) -> Result<StatsDocument, StoreError> {
        let Some(value) = self.store.load(STATS_KEY)? else {
            return Ok(StatsDocument::default());
        };
        let mut doc: StatsDocument = serde_json::from_value(value)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let cleaned = strip_unknown_sites(&mut doc);
        if cleaned > 0 {
            info!(cleaned, "removed unknown-site buckets from statistics");
            if let Err(e) = self.save(&doc) {
                warn!("Failed to save cleaned statistics: {}", e);
            }
        }
        Ok(doc)
    }

    fn save(&self, doc: &StatsDocument) -> Result<(), StoreError> {
        let value =
            serde_json::to_value(doc).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.store.save(STATS_KEY, &value)
    }
}

fn apply(stat: &mut DownloaderStat, success: u64, failed: u64, attribution: &SiteAttribution) {
    stat.success += success;
    stat.failed += failed;
    for (site, count) in &attribution.counts {
        if !is_unrecorded(site) {
            *stat.trackers.entry(site.clone()).or_insert(0) += count;
        }
    }
    for (site, volume) in &attribution.volumes {
        if !is_unrecorded(site) {
            *stat.volumes.entry(site.clone()).or_insert(0) += volume;
        }
    }
}

/// Drop `daily` keys older than the retention window. Returns how many.
fn prune_daily(doc: &mut StatsDocument, today: NaiveDate) -> usize {
    let cutoff = (today - Duration::days(RETENTION_DAYS))
        .format(DATE_FORMAT)
        .to_string();
    let before = doc.daily.len();
    doc.daily.retain(|date, _| date.as_str() >= cutoff.as_str());
    before - doc.daily.len()
}

fn reclassify_stat(stat: &mut DownloaderStat, mapping: &TrackerMapping) -> bool {
    let trackers = reclassify_buckets(&stat.trackers, mapping);
    let volumes = reclassify_buckets(&stat.volumes, mapping);
    if trackers == stat.trackers && volumes == stat.volumes {
        return false;
    }
    stat.trackers = trackers;
    stat.volumes = volumes;
    true
}

fn reclassify_buckets(
    buckets: &BTreeMap<String, u64>,
    mapping: &TrackerMapping,
) -> BTreeMap<String, u64> {
    let mut out = BTreeMap::new();
    for (site, value) in buckets {
        let new_site = classify(site, mapping);
        *out.entry(new_site).or_insert(0) += value;
    }
    out.retain(|site, _| !is_unrecorded(site));
    out
}

fn strip_unknown_sites(doc: &mut StatsDocument) -> usize {
    let mut cleaned = 0;
    let stats = doc
        .daily
        .values_mut()
        .flat_map(|clients| clients.values_mut())
        .chain(doc.total.values_mut());
    for stat in stats {
        cleaned += stat.trackers.remove(SITE_UNKNOWN).is_some() as usize;
        cleaned += stat.volumes.remove(SITE_UNKNOWN).is_some() as usize;
    }
    cleaned
}
