//! Rate caching for currency exchange rates
//!
//! A snapshot is served from memory for 30 minutes after it was fetched;
//! after that the next lookup goes back to the providers. Every successful
//! fetch is also written to durable storage so the next session starts warm.
//!
//! Lookups never fail. When both providers are down the cache degrades to
//! the durable snapshot, or the in-memory one if it was fetched later, and
//! finally to the built-in default table. Stored rates that are zero,
//! negative or non-finite are dropped on load. Degraded snapshots keep their
//! fetch time, so `is_stale()` keeps reporting the age of the last real
//! fetch.

use crate::clock::Clock;
use crate::config::FxConfig;
use crate::error::{FxError, Result};
use crate::fetch::RateSourceClient;
use crate::storage::{KeyValueStore, RATES_KEY};
use crate::types::{Currency, ExchangeRateSnapshot};
use serde::Serialize;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Where the rates of a lookup came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    /// Served from a still-valid in-memory snapshot
    Cache,
    /// Fetched from a provider just now
    Fresh,
    /// Providers failed, loaded from durable storage
    Persisted,
    /// Providers failed and storage was unusable, kept the in-memory snapshot
    Memory,
    /// Nothing else available, built-in default table
    Defaults,
}

impl RateSource {
    /// Whether live data was unavailable for this lookup
    pub fn is_degraded(&self) -> bool {
        !matches!(self, RateSource::Cache | RateSource::Fresh)
    }
}

/// Rates plus their provenance
#[derive(Debug, Clone)]
pub struct RateOutcome {
    pub snapshot: Arc<ExchangeRateSnapshot>,
    pub source: RateSource,
}

#[derive(Default)]
struct CacheState {
    snapshot: Option<Arc<ExchangeRateSnapshot>>,
    /// Set by `invalidate()`; the snapshot is kept but not served
    invalidated: bool,
    /// Bumped after every resolution, so callers that queued behind an
    /// in-flight fetch can reuse its outcome
    generation: u64,
    last_outcome: Option<RateOutcome>,
}

/// Cache for exchange rates
pub struct RateCache {
    source: RateSourceClient,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl_ms: u64,
    stale_after_ms: u64,
    state: RwLock<CacheState>,
    in_flight: tokio::sync::Mutex<()>,
}

impl RateCache {
    /// Create an empty cache. Call [`RateCache::restore`] to pre-warm it from
    /// durable storage.
    pub fn new(
        source: RateSourceClient,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: &FxConfig,
    ) -> Self {
        Self {
            source,
            store,
            clock,
            ttl_ms: config.cache_ttl_ms(),
            stale_after_ms: config.stale_after_ms(),
            state: RwLock::new(CacheState::default()),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Load the snapshot a previous session persisted.
    /// Returns true if the cache was populated.
    pub fn restore(&self) -> bool {
        match self.load_persisted() {
            Ok(Some(snapshot)) if snapshot.fetched_at.is_some() => {
                log::debug!(
                    "Restored {} stored exchange rates (base {})",
                    snapshot.quoted_len(),
                    snapshot.base_currency
                );
                self.write().snapshot = Some(Arc::new(snapshot));
                true
            }
            Ok(_) => false,
            Err(e) => {
                log::error!("Failed to initialize exchange rate cache: {e}");
                false
            }
        }
    }

    /// True iff a snapshot for `base` exists and is younger than the cache TTL
    pub fn is_valid(&self, base: Currency) -> bool {
        self.valid_snapshot(base).is_some()
    }

    fn valid_snapshot(&self, base: Currency) -> Option<Arc<ExchangeRateSnapshot>> {
        let state = self.read();
        if state.invalidated {
            return None;
        }
        let snapshot = state.snapshot.as_ref()?;
        if snapshot.base_currency != base {
            return None;
        }
        let age = snapshot.age_ms(self.clock.now_ms())?;
        (age < self.ttl_ms).then(|| snapshot.clone())
    }

    /// True if there are no fetched rates or they are older than the
    /// staleness window
    pub fn is_stale(&self) -> bool {
        let now = self.clock.now_ms();
        match self.read().snapshot.as_ref().and_then(|s| s.age_ms(now)) {
            Some(age) => age > self.stale_after_ms,
            None => true,
        }
    }

    /// Current snapshot, whatever its age
    pub fn snapshot(&self) -> Option<Arc<ExchangeRateSnapshot>> {
        self.read().snapshot.clone()
    }

    /// Fetch time of the current snapshot
    pub fn last_updated(&self) -> Option<u64> {
        self.read().snapshot.as_ref().and_then(|s| s.fetched_at)
    }

    /// Mark the current snapshot invalid regardless of its age
    pub fn invalidate(&self) {
        self.write().invalidated = true;
    }

    /// Rates for `base`, from memory when valid, otherwise from the providers
    /// or the degradation chain. Never fails.
    pub async fn get(&self, base: Currency) -> RateOutcome {
        if let Some(snapshot) = self.valid_snapshot(base) {
            log::debug!("Serving cached exchange rates (base {base})");
            return RateOutcome {
                snapshot,
                source: RateSource::Cache,
            };
        }
        self.resolve(base, false).await
    }

    /// Like [`RateCache::get`] but always attempts a network fetch
    pub async fn refresh(&self, base: Currency) -> RateOutcome {
        self.invalidate();
        self.resolve(base, true).await
    }

    async fn resolve(&self, base: Currency, forced: bool) -> RateOutcome {
        let seen = self.read().generation;
        let _guard = self.in_flight.lock().await;

        // Another caller resolved while we were queued; share its result.
        {
            let state = self.read();
            if state.generation != seen {
                if let Some(outcome) = state
                    .last_outcome
                    .as_ref()
                    .filter(|o| o.snapshot.base_currency == base)
                {
                    return outcome.clone();
                }
            }
        }
        if !forced {
            if let Some(snapshot) = self.valid_snapshot(base) {
                return RateOutcome {
                    snapshot,
                    source: RateSource::Cache,
                };
            }
        }

        let outcome = match self.source.fetch(base).await {
            Ok(snapshot) => {
                self.persist(&snapshot);
                RateOutcome {
                    snapshot: Arc::new(snapshot),
                    source: RateSource::Fresh,
                }
            }
            Err(e) => {
                log::error!("Failed to fetch exchange rates: {e}");
                self.degrade(base)
            }
        };

        let mut state = self.write();
        state.snapshot = Some(outcome.snapshot.clone());
        state.invalidated = false;
        state.generation += 1;
        state.last_outcome = Some(outcome.clone());
        outcome
    }

    fn degrade(&self, base: Currency) -> RateOutcome {
        let stored = match self.load_persisted() {
            Ok(Some(stored)) => {
                let rebased = stored.rebased(base);
                if rebased.is_none() {
                    log::warn!("Stored exchange rates have no rate for {base}");
                }
                rebased
            }
            Ok(None) => None,
            Err(e) => {
                log::error!("Failed to load stored exchange rates: {e}");
                None
            }
        };

        let in_memory = self
            .read()
            .snapshot
            .as_ref()
            .filter(|s| s.fetched_at.is_some())
            .and_then(|s| s.rebased(base));

        // Storage can lag behind memory when a write failed; serve the newer.
        match (stored, in_memory) {
            (Some(stored), Some(memory)) if memory.fetched_at > stored.fetched_at => {
                log::warn!("Keeping in-memory exchange rates due to API failure");
                RateOutcome {
                    snapshot: Arc::new(memory),
                    source: RateSource::Memory,
                }
            }
            (Some(stored), _) => {
                log::warn!("Using stored exchange rates due to API failure");
                RateOutcome {
                    snapshot: Arc::new(stored),
                    source: RateSource::Persisted,
                }
            }
            (None, Some(memory)) => {
                log::warn!("Keeping in-memory exchange rates due to API failure");
                RateOutcome {
                    snapshot: Arc::new(memory),
                    source: RateSource::Memory,
                }
            }
            (None, None) => {
                log::warn!("Using default exchange rates due to API and cache failure");
                RateOutcome {
                    snapshot: Arc::new(ExchangeRateSnapshot::defaults(base)),
                    source: RateSource::Defaults,
                }
            }
        }
    }

    /// Stored snapshot with unusable rates dropped
    fn load_persisted(&self) -> Result<Option<ExchangeRateSnapshot>> {
        let Some(content) = self.store.get(RATES_KEY)? else {
            return Ok(None);
        };
        let stored: ExchangeRateSnapshot = serde_json::from_str(&content)
            .map_err(|e| FxError::StorageCorrupt(e.to_string()))?;
        stored
            .sanitized()
            .map(Some)
            .ok_or_else(|| FxError::StorageCorrupt("no usable rates".to_string()))
    }

    fn persist(&self, snapshot: &ExchangeRateSnapshot) {
        let result = serde_json::to_string(snapshot)
            .map_err(|e| FxError::StorageCorrupt(e.to_string()))
            .and_then(|content| self.store.set(RATES_KEY, &content));
        if let Err(e) = result {
            log::warn!("Failed to persist exchange rates: {e}");
        }
    }
}
