//! Site name resolution for a tracker URL.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use tracing::debug;

use super::{TrackerMapping, SITE_OTHER, SITE_OTHER_SITE};

/// Host labels that never name a site on their own.
const HOST_STOPWORDS: &[&str] = &["tracker", "www", "tra1", "t", "relay01"];

/// Host token: everything after an optional scheme up to the first `/`.
/// A `:port` suffix stays in the token.
static HOST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:(?:https?|udp)://)?([^/]+)").expect("static regex"));

/// Resolve a tracker URL to a site name.
///
/// The mapping wins on any literal substring match. Otherwise the
/// second-to-last host label left after dropping stopwords is used.
pub fn classify(tracker_url: &str, mapping: &TrackerMapping) -> String {
    if tracker_url.is_empty() {
        return SITE_OTHER.to_string();
    }

    if let Some(site) = mapping.lookup(tracker_url) {
        debug!(tracker = tracker_url, site, "tracker matched mapping");
        return site.to_string();
    }

    match infer_site(tracker_url) {
        Some(site) => {
            debug!(tracker = tracker_url, site = %site, "tracker site inferred from host");
            site
        }
        None => {
            debug!(tracker = tracker_url, "tracker site could not be identified");
            SITE_OTHER_SITE.to_string()
        }
    }
}

fn infer_site(tracker_url: &str) -> Option<String> {
    let host = HOST_RE.captures(tracker_url)?.get(1)?.as_str();

    let labels: Vec<&str> = host
        .split('.')
        .filter(|label| !HOST_STOPWORDS.contains(label))
        .collect();

    if labels.len() >= 2 {
        Some(labels[labels.len() - 2].to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_url_is_other() {
        let mapping = TrackerMapping::from_pairs([("", "Never")]);
        assert_eq!(classify("", &mapping), SITE_OTHER);
        assert_eq!(classify("", &TrackerMapping::default()), SITE_OTHER);
    }

    #[test]
    fn test_mapping_substring_match() {
        let mapping = TrackerMapping::from_pairs([("abc.com", "X")]);
        assert_eq!(classify("http://sub.abc.com/announce", &mapping), "X");
    }

    #[test]
    fn test_mapping_is_not_host_aware() {
        let mapping = TrackerMapping::from_pairs([("passkey", "Keyed")]);
        assert_eq!(
            classify("https://t.site.org/announce?passkey=abc", &mapping),
            "Keyed"
        );
    }

    #[test]
    fn test_heuristic_strips_stopwords() {
        let mapping = TrackerMapping::default();
        assert_eq!(
            classify("http://tracker.example.org/announce", &mapping),
            "example"
        );
        assert_eq!(classify("https://www.site.net/a", &mapping), "site");
        assert_eq!(classify("udp://t.open.io:6969/announce", &mapping), "open");
        assert_eq!(classify("relay01.pt.cc/announce", &mapping), "pt");
    }

    #[test]
    fn test_heuristic_keeps_port_in_last_label() {
        let mapping = TrackerMapping::default();
        assert_eq!(classify("http://example.com:8080/announce", &mapping), "example");
        assert_eq!(classify("http://a.b.example.com:443/x", &mapping), "example");
    }

    #[test]
    fn test_unresolvable_host_is_other_site() {
        let mapping = TrackerMapping::default();
        assert_eq!(classify("http://localhost/announce", &mapping), SITE_OTHER_SITE);
        assert_eq!(classify("http://tracker.com/announce", &mapping), SITE_OTHER_SITE);
        assert_eq!(classify("其他站点", &mapping), SITE_OTHER_SITE);
        assert_eq!(classify("/announce", &mapping), SITE_OTHER_SITE);
    }

    #[test]
    fn test_existing_site_name_without_dots_is_other_site() {
        // Labels produced by an earlier classification have no host shape.
        assert_eq!(classify("example", &TrackerMapping::default()), SITE_OTHER_SITE);
    }

    #[test]
    fn test_deterministic() {
        let mapping = TrackerMapping::parse("abc:A\nxyz:Z");
        let url = "https://tracker.xyz.org/announce";
        let first = classify(url, &mapping);
        for _ in 0..5 {
            assert_eq!(classify(url, &mapping), first);
        }
    }
}
