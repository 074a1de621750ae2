//! Ticker -> CIK resolution.
//!
//! Lookup tiers, first hit wins:
//! 1. static table of high-traffic tickers (never touches the network)
//! 2. catalog freshness check, refreshing the bulk catalog when older than the TTL
//! 3. memo cache of previously resolved tickers
//! 4. bulk catalog snapshot
//!
//! A failed refresh keeps serving the previous catalog. Concurrent callers that
//! find the catalog stale share a single in-flight fetch.

pub mod clock;
pub mod search;

pub use clock::{Clock, ManualClock, SystemClock};
pub use search::{search_catalog, SearchResult};

use analysis_core::{AnalysisError, ProviderError, TickerCatalog, TickerCatalogSource};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Hand-curated CIKs for the tickers dominating traffic.
const STATIC_CIKS: &[(&str, &str)] = &[
    ("AAPL", "0000320193"),
    ("MSFT", "0000789019"),
    ("GOOGL", "0001652044"),
    ("GOOG", "0001652044"),
    ("AMZN", "0001018724"),
    ("TSLA", "0001318605"),
    ("META", "0001326801"),
    ("NVDA", "0001045810"),
    ("JPM", "0000019617"),
    ("V", "0001403161"),
    ("BAC", "0000070858"),
    ("WMT", "0000104169"),
    ("XOM", "0000034088"),
    ("UNH", "0000731766"),
    ("JNJ", "0000200406"),
];

pub fn static_cik(ticker: &str) -> Option<&'static str> {
    STATIC_CIKS
        .iter()
        .find(|(t, _)| *t == ticker)
        .map(|(_, cik)| *cik)
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub catalog_ttl: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            catalog_ttl: Duration::hours(24),
        }
    }
}

/// One successfully loaded catalog. Replaced wholesale, never mutated.
#[derive(Debug)]
pub struct CatalogSnapshot {
    pub entries: TickerCatalog,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
enum CatalogState {
    NoCatalog,
    Loaded(Arc<CatalogSnapshot>),
}

/// Outcome of the last refresh attempt, guarded by the refresh gate.
#[derive(Debug, Default)]
struct RefreshRecord {
    last_error: Option<ProviderError>,
}

pub struct CikResolver {
    source: Arc<dyn TickerCatalogSource>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    memo: DashMap<String, String>,
    catalog: RwLock<CatalogState>,
    refresh_gate: Mutex<RefreshRecord>,
    refresh_attempts: AtomicU64,
}

impl CikResolver {
    pub fn new(source: Arc<dyn TickerCatalogSource>, config: ResolverConfig) -> Self {
        Self::with_clock(source, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        source: Arc<dyn TickerCatalogSource>,
        config: ResolverConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            clock,
            ttl: config.catalog_ttl,
            memo: DashMap::new(),
            catalog: RwLock::new(CatalogState::NoCatalog),
            refresh_gate: Mutex::new(RefreshRecord::default()),
            refresh_attempts: AtomicU64::new(0),
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.source_name()
    }

    /// Resolve a ticker to its 10-digit CIK.
    ///
    /// Fails with `NotFound` when every tier misses, or with the catalog
    /// fetch error when no catalog has ever loaded and nothing else matched.
    pub async fn resolve(&self, ticker: &str) -> Result<String, AnalysisError> {
        let ticker = ticker.trim().to_uppercase();

        if let Some(cik) = static_cik(&ticker) {
            self.memo.entry(ticker).or_insert_with(|| cik.to_string());
            return Ok(cik.to_string());
        }

        let (snapshot, refresh_error) = match self.ensure_fresh().await {
            Ok(snapshot) => (snapshot, None),
            Err(e) => (None, Some(e)),
        };

        if let Some(cik) = self.memo.get(&ticker) {
            return Ok(cik.value().clone());
        }

        if let Some(entry) = snapshot.as_ref().and_then(|s| s.entries.get(&ticker)) {
            let cik = self
                .memo
                .entry(ticker)
                .or_insert_with(|| entry.cik.clone())
                .value()
                .clone();
            return Ok(cik);
        }

        match refresh_error {
            Some(e) => Err(AnalysisError::Provider(e)),
            None => Err(AnalysisError::NotFound {
                ticker,
                source_name: self.source.source_name().to_string(),
            }),
        }
    }

    /// Ranked ticker/company search over the current catalog snapshot.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, AnalysisError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        match self.ensure_fresh().await? {
            Some(snapshot) => Ok(search_catalog(&snapshot.entries, query, limit)),
            None => Ok(Vec::new()),
        }
    }

    /// Current snapshot, if any catalog has loaded. Never triggers a fetch.
    pub async fn snapshot(&self) -> Option<Arc<CatalogSnapshot>> {
        match &*self.catalog.read().await {
            CatalogState::NoCatalog => None,
            CatalogState::Loaded(snapshot) => Some(snapshot.clone()),
        }
    }

    /// Number of catalog fetches completed so far, successful or not.
    pub fn refresh_attempts(&self) -> u64 {
        self.refresh_attempts.load(Ordering::Acquire)
    }

    fn is_fresh(&self, snapshot: &Option<Arc<CatalogSnapshot>>) -> bool {
        match snapshot {
            Some(s) => self.clock.now() - s.loaded_at <= self.ttl,
            None => false,
        }
    }

    /// Returns a usable snapshot, refreshing it first when missing or stale.
    ///
    /// `Ok(Some)` may be stale if the refresh failed. `Err` only when no
    /// catalog has ever loaded.
    async fn ensure_fresh(&self) -> Result<Option<Arc<CatalogSnapshot>>, ProviderError> {
        let current = self.snapshot().await;
        if self.is_fresh(&current) {
            return Ok(current);
        }

        // Counts finished attempts only, so a change seen under the gate means
        // an attempt completed while this caller was waiting for it.
        let seen_attempts = self.refresh_attempts.load(Ordering::Acquire);
        let mut record = self.refresh_gate.lock().await;

        let current = self.snapshot().await;
        if self.is_fresh(&current) {
            return Ok(current);
        }
        if self.refresh_attempts.load(Ordering::Acquire) != seen_attempts {
            return match (current, record.last_error.clone()) {
                (Some(snapshot), _) => Ok(Some(snapshot)),
                (None, Some(e)) => Err(e),
                (None, None) => Ok(None),
            };
        }

        let outcome = self.refresh(current).await;
        record.last_error = outcome.as_ref().err().cloned();
        self.refresh_attempts.fetch_add(1, Ordering::AcqRel);
        outcome
    }

    /// Fetch and swap in a new catalog. Keeps `previous` on failure.
    async fn refresh(
        &self,
        previous: Option<Arc<CatalogSnapshot>>,
    ) -> Result<Option<Arc<CatalogSnapshot>>, ProviderError> {
        match self.source.get_ticker_catalog().await {
            Ok(entries) => {
                self.flag_static_disagreements(&entries);
                let snapshot = Arc::new(CatalogSnapshot {
                    entries,
                    loaded_at: self.clock.now(),
                });
                *self.catalog.write().await = CatalogState::Loaded(snapshot.clone());
                tracing::info!(
                    "Loaded {} ticker catalog: {} entries",
                    self.source.source_name(),
                    snapshot.entries.len()
                );
                Ok(Some(snapshot))
            }
            Err(e) => match previous {
                Some(stale) => {
                    let age = self.clock.now() - stale.loaded_at;
                    tracing::warn!(
                        "Ticker catalog refresh failed ({}), serving catalog loaded {}h ago",
                        e,
                        age.num_hours()
                    );
                    Ok(Some(stale))
                }
                None => {
                    tracing::warn!("Ticker catalog load failed with no cached catalog: {}", e);
                    Err(e)
                }
            },
        }
    }

    fn flag_static_disagreements(&self, entries: &TickerCatalog) {
        for (ticker, cik) in STATIC_CIKS {
            if let Some(entry) = entries.get(*ticker) {
                if entry.cik != *cik {
                    tracing::warn!(
                        "Static CIK for {} ({}) disagrees with {} catalog ({}); keeping static value",
                        ticker,
                        cik,
                        self.source.source_name(),
                        entry.cik
                    );
                }
            }
        }
    }
}
