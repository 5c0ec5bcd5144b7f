//! User-editable tracker mapping table.

use serde::{Deserialize, Serialize};

/// Ordered `(substring, site_name)` pairs parsed from `substring:site` lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerMapping {
    entries: Vec<(String, String)>,
}

impl TrackerMapping {
    /// Parse the multi-line configuration text.
    ///
    /// Lines without a colon are ignored. Only the first colon splits, so
    /// `tracker.example.org:8080:Example` maps `tracker.example.org` to
    /// `8080:Example`. A later line with the same substring replaces the
    /// earlier site name but keeps the earlier position.
    pub fn parse(text: &str) -> Self {
        let mut entries: Vec<(String, String)> = Vec::new();

        for line in text.trim().lines() {
            let line = line.trim();
            let Some((substring, site)) = line.split_once(':') else {
                continue;
            };
            let substring = substring.trim().to_string();
            let site = site.trim().to_string();

            match entries.iter_mut().find(|(existing, _)| *existing == substring) {
                Some(entry) => entry.1 = site,
                None => entries.push((substring, site)),
            }
        }

        Self { entries }
    }

    /// Build a mapping from explicit pairs, preserving order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Site name of the first entry whose substring occurs in `tracker_url`.
    pub fn lookup(&self, tracker_url: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(substring, _)| !substring.is_empty() && tracker_url.contains(substring.as_str()))
            .map(|(_, site)| site.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
