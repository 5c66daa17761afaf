//! Per-entry filtering of source feeds.
//!
//! Each entry passes through three stages, stopping at the first exclusion:
//! include substrings, exclude substrings, then the named network-backed
//! filters in the order the caller listed them. Entries are evaluated
//! concurrently and survivors keep their original order.

mod probe;

pub use probe::{MemoryProbeCache, ProbeCache, ProbeClient, ProbeError, ProbeKind};

use futures::future::join_all;
use std::sync::Arc;

use crate::feed::NormalizedEntry;
use crate::util::content_id;

/// A named filter from the `filter` query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterKind {
    Shorts,
    Country,
    /// Unknown names are kept so they can be reported; they never exclude
    Unrecognized(String),
}

impl From<&str> for FilterKind {
    fn from(name: &str) -> Self {
        match name {
            "shorts" => FilterKind::Shorts,
            "country" => FilterKind::Country,
            other => FilterKind::Unrecognized(other.to_string()),
        }
    }
}

/// Filter criteria for one request. Terms are expected lower-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub filters: Vec<FilterKind>,
}

impl FilterSpec {
    pub fn new(includes: Vec<String>, excludes: Vec<String>, filters: Vec<String>) -> Self {
        let filters: Vec<FilterKind> = filters.iter().map(|f| FilterKind::from(f.as_str())).collect();
        for filter in &filters {
            if let FilterKind::Unrecognized(name) = filter {
                tracing::warn!(filter = %name, "Ignoring unrecognized filter");
            }
        }
        Self {
            includes,
            excludes,
            filters,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.excludes.is_empty() && self.filters.is_empty()
    }

    /// Substring stages only. `haystack` must already be case-folded.
    ///
    /// Returns `true` when the entry is excluded.
    pub fn text_rejection(&self, haystack: &str) -> bool {
        if let Some(missing) = self.includes.iter().find(|term| !haystack.contains(term.as_str())) {
            tracing::trace!(term = %missing, "Entry lacks include term");
            return true;
        }
        self.excludes.iter().any(|term| haystack.contains(term.as_str()))
    }
}

/// Case-folded JSON serialization of an entry, the text the substring stages search.
pub fn entry_haystack(entry: &NormalizedEntry) -> String {
    serde_json::to_string(entry)
        .unwrap_or_default()
        .to_lowercase()
}

/// Applies a [`FilterSpec`] to feed entries, probing through a shared [`ProbeClient`].
pub struct EntryFilter {
    spec: FilterSpec,
    probes: Arc<ProbeClient>,
}

impl EntryFilter {
    pub fn new(spec: FilterSpec, probes: Arc<ProbeClient>) -> Self {
        Self { spec, probes }
    }

    /// Returns the entries that survive, in their original order.
    pub async fn apply(&self, feed_url: &str, entries: Vec<NormalizedEntry>) -> Vec<NormalizedEntry> {
        if self.spec.is_empty() {
            return entries;
        }

        let decisions = join_all(entries.iter().map(|entry| self.excludes(feed_url, entry))).await;

        let before = entries.len();
        let kept: Vec<NormalizedEntry> = entries
            .into_iter()
            .zip(decisions)
            .filter_map(|(entry, excluded)| (!excluded).then_some(entry))
            .collect();

        tracing::debug!(url = %feed_url, before, after = kept.len(), "Filtered feed entries");
        kept
    }

    async fn excludes(&self, feed_url: &str, entry: &NormalizedEntry) -> bool {
        if !self.spec.includes.is_empty() || !self.spec.excludes.is_empty() {
            let haystack = entry_haystack(entry);
            if self.spec.text_rejection(&haystack) {
                return true;
            }
        }

        for filter in &self.spec.filters {
            let excluded = match filter {
                FilterKind::Shorts => {
                    if entry.links.iter().any(|link| link.href.contains("/shorts/")) {
                        true
                    } else {
                        self.probe(feed_url, entry, ProbeKind::Shorts).await
                    }
                }
                FilterKind::Country => self.probe(feed_url, entry, ProbeKind::Country).await,
                FilterKind::Unrecognized(_) => false,
            };
            if excluded {
                return true;
            }
        }
        false
    }

    /// Runs one probe for the entry. Any failure keeps the entry.
    async fn probe(&self, feed_url: &str, entry: &NormalizedEntry, kind: ProbeKind) -> bool {
        let Some(id) = content_id(&entry.id) else {
            tracing::warn!(
                url = %feed_url,
                entry_id = %entry.id,
                kind = ?kind,
                "Entry id has no content identifier, skipping filter"
            );
            return false;
        };

        match self.probes.verdict(kind, id).await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(
                    url = %feed_url,
                    id = %id,
                    kind = ?kind,
                    error = %e,
                    "Probe failed, keeping entry"
                );
                false
            }
        }
    }
}
