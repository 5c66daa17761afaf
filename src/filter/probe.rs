use reqwest::redirect;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use thiserror::Error;

const UNAVAILABLE_MARKER: &str = "The uploader has not made this video available in your country";

/// The two independent network-backed verdicts kept per content identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    /// Identifier refers to a short-form video
    Shorts,
    /// Identifier is blocked in the probing host's region
    Country,
}

/// Errors from a single probe request. Callers treat these as "no verdict".
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Probe request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Probe request timed out")]
    Timeout,
}

/// Memoization of probe verdicts.
///
/// Entries are never evicted; concurrent writers racing on the same key store
/// the same verdict, so last-writer-wins is harmless.
pub trait ProbeCache: Send + Sync {
    fn get(&self, kind: ProbeKind, id: &str) -> Option<bool>;
    fn set(&self, kind: ProbeKind, id: &str, verdict: bool);
}

/// Process-wide in-memory [`ProbeCache`], one map per probe kind.
#[derive(Debug, Default)]
pub struct MemoryProbeCache {
    shorts: RwLock<HashMap<String, bool>>,
    country: RwLock<HashMap<String, bool>>,
}

impl MemoryProbeCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, kind: ProbeKind) -> &RwLock<HashMap<String, bool>> {
        match kind {
            ProbeKind::Shorts => &self.shorts,
            ProbeKind::Country => &self.country,
        }
    }
}

impl ProbeCache for MemoryProbeCache {
    fn get(&self, kind: ProbeKind, id: &str) -> Option<bool> {
        // A poisoned lock still holds valid verdicts
        let map = self.map(kind).read().unwrap_or_else(|e| e.into_inner());
        map.get(id).copied()
    }

    fn set(&self, kind: ProbeKind, id: &str, verdict: bool) {
        let mut map = self.map(kind).write().unwrap_or_else(|e| e.into_inner());
        map.insert(id.to_string(), verdict);
    }
}

/// Issues shorts/country probes against the video host, consulting the cache first.
pub struct ProbeClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    cache: Arc<dyn ProbeCache>,
}

impl ProbeClient {
    /// Builds a client with redirects disabled; both probes inspect the
    /// first response rather than wherever it points.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        cache: Arc<dyn ProbeCache>,
    ) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            cache,
        })
    }

    /// Returns the verdict for `id`, probing and caching it on a miss.
    ///
    /// Failed probes are not cached.
    pub async fn verdict(&self, kind: ProbeKind, id: &str) -> Result<bool, ProbeError> {
        if let Some(verdict) = self.cache.get(kind, id) {
            tracing::trace!(kind = ?kind, id = %id, verdict, "Probe cache hit");
            return Ok(verdict);
        }

        let verdict = match kind {
            ProbeKind::Shorts => self.probe_shorts(id).await?,
            ProbeKind::Country => self.probe_country(id).await?,
        };
        self.cache.set(kind, id, verdict);
        tracing::debug!(kind = ?kind, id = %id, verdict, "Probe verdict cached");
        Ok(verdict)
    }

    async fn probe_shorts(&self, id: &str) -> Result<bool, ProbeError> {
        let url = format!("{}/shorts/{}", self.base_url, id);
        let response = tokio::time::timeout(self.timeout, self.client.head(&url).send())
            .await
            .map_err(|_| ProbeError::Timeout)?
            .map_err(ProbeError::Network)?;

        // Non-shorts are redirected to the watch page
        Ok(!response.headers().contains_key(reqwest::header::LOCATION))
    }

    async fn probe_country(&self, id: &str) -> Result<bool, ProbeError> {
        let url = format!("{}/watch?v={}", self.base_url, id);
        let body = tokio::time::timeout(self.timeout, async {
            self.client.get(&url).send().await?.text().await
        })
        .await
        .map_err(|_| ProbeError::Timeout)?
        .map_err(ProbeError::Network)?;

        Ok(body.contains(UNAVAILABLE_MARKER))
    }
}
