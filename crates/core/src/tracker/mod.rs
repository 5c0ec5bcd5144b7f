//! Tracker URL to site name classification.
//!
//! Site names come from a user-editable mapping table first and a domain
//! heuristic second. A few placeholder names mark failed attribution.

mod classifier;
mod mapping;

pub use classifier::classify;
pub use mapping::TrackerMapping;

/// Returned when the tracker URL is empty.
pub const SITE_OTHER: &str = "其他";

/// Returned when neither the mapping nor the heuristic identify a site.
pub const SITE_OTHER_SITE: &str = "其他站点";

/// Legacy placeholder found in older statistics documents.
pub const SITE_UNKNOWN: &str = "未知站点";

/// Whether a site name is a placeholder rather than a real site.
pub fn is_sentinel(site: &str) -> bool {
    site.is_empty() || site == SITE_OTHER || site == SITE_OTHER_SITE || site == SITE_UNKNOWN
}

/// Whether a site name must be kept out of per-site statistics.
///
/// `其他站点` is a real bucket in stored statistics; only the empty name,
/// `其他` and `未知站点` are dropped.
pub fn is_unrecorded(site: &str) -> bool {
    site.is_empty() || site == SITE_OTHER || site == SITE_UNKNOWN
}
