//! Application-level owner of the rate pipeline
//!
//! `CurrencyContext` wires the cache, conversion engine, formatter and the
//! user's currency preference together and is the only surface the rest of
//! an application is expected to call.

use crate::cache::{RateCache, RateOutcome};
use crate::clock::{Clock, SystemClock};
use crate::config::FxConfig;
use crate::convert::{ConversionEngine, PIVOT};
use crate::error::Result;
use crate::fetch::RateSourceClient;
use crate::format::{relative_age, CurrencyFormatter};
use crate::preference::CurrencyPreference;
use crate::storage::{FileStore, KeyValueStore};
use crate::types::{currency, lookup, Currency, CurrencyMetadata};
use serde::Serialize;
use std::sync::Arc;

/// Snapshot of the cache for status displays
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatesStatus {
    pub selected: Currency,
    pub base: Option<Currency>,
    pub last_updated: Option<u64>,
    pub label: String,
    pub valid: bool,
    pub stale: bool,
}

pub struct CurrencyContext {
    cache: Arc<RateCache>,
    engine: ConversionEngine,
    preference: CurrencyPreference,
    formatter: CurrencyFormatter,
    clock: Arc<dyn Clock>,
}

impl CurrencyContext {
    /// Build from configuration: HTTP providers, file storage, system clock
    pub fn from_config(config: &FxConfig) -> Result<Self> {
        config.validate()?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store: Arc<dyn KeyValueStore> = match &config.data_dir {
            Some(dir) => Arc::new(FileStore::new(dir)),
            None => Arc::new(FileStore::platform_default()?),
        };
        let source = RateSourceClient::from_config(config, clock.clone())?;
        Ok(Self::with_parts(source, store, clock, config))
    }

    /// Build from explicit parts. The cache is pre-warmed from `store`.
    pub fn with_parts(
        source: RateSourceClient,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: &FxConfig,
    ) -> Self {
        let cache = Arc::new(RateCache::new(source, store.clone(), clock.clone(), config));
        cache.restore();
        Self {
            engine: ConversionEngine::new(cache.clone()),
            cache,
            preference: CurrencyPreference::load(store),
            formatter: CurrencyFormatter::default(),
            clock,
        }
    }

    pub fn cache(&self) -> &Arc<RateCache> {
        &self.cache
    }

    pub fn engine(&self) -> &ConversionEngine {
        &self.engine
    }

    pub async fn get_exchange_rates(&self, base: Currency) -> RateOutcome {
        self.cache.get(base).await
    }

    pub async fn refresh_exchange_rates(&self, base: Currency) -> RateOutcome {
        self.cache.refresh(base).await
    }

    /// Convert between codes; returns `amount` unchanged when conversion fails
    pub async fn convert_currency(&self, amount: f64, from: &str, to: &str) -> f64 {
        self.engine.convert_codes(amount, from, to).await
    }

    /// Multiplier from `from` to `to`, 1 when unknown
    pub async fn exchange_rate(&self, from: &str, to: &str) -> f64 {
        if from == to {
            return 1.0;
        }
        match (Currency::parse(from), Currency::parse(to)) {
            (Some(from), Some(to)) => self.engine.rate(from, to).await,
            _ => {
                log::error!("Failed to get exchange rate: unsupported pair {from}/{to}");
                1.0
            }
        }
    }

    /// USD amount in the selected currency
    pub async fn convert_from_usd(&self, amount: f64) -> f64 {
        self.engine.convert(amount, PIVOT, self.selected_currency()).await
    }

    /// Selected-currency amount in USD
    pub async fn convert_to_usd(&self, amount: f64) -> f64 {
        self.engine.convert(amount, self.selected_currency(), PIVOT).await
    }

    pub fn currency_info(&self, code: &str) -> CurrencyMetadata {
        lookup(code)
    }

    pub fn currency_symbol(&self, code: &str) -> String {
        lookup(code).symbol.into_owned()
    }

    pub fn currency_name(&self, code: &str) -> String {
        lookup(code).display_name.into_owned()
    }

    pub fn currency_flag(&self, code: &str) -> String {
        lookup(code).flag.into_owned()
    }

    /// Whether `code` is one of the registry currencies
    pub fn is_supported_currency(&self, code: &str) -> bool {
        currency::is_supported(code)
    }

    pub fn search_currencies(&self, term: &str) -> Vec<CurrencyMetadata> {
        currency::search(term).into_iter().map(Into::into).collect()
    }

    pub fn selected_currency(&self) -> Currency {
        self.preference.current()
    }

    /// Change the display currency; unsupported codes are rejected and logged
    pub fn select_currency(&mut self, code: &str) -> Result<Currency> {
        self.preference.select(code)
    }

    /// Cached USD multiplier of the selected currency, without a network
    /// round trip. 1 when no rate is known.
    pub fn selected_currency_rate(&self) -> f64 {
        let selected = self.selected_currency();
        if selected == PIVOT {
            return 1.0;
        }
        self.cache
            .snapshot()
            .and_then(|s| s.rebased(PIVOT))
            .and_then(|s| s.rate(selected))
            .unwrap_or(1.0)
    }

    pub fn format_currency(&self, amount: Option<f64>, code: &str) -> String {
        self.formatter.format(amount, code)
    }

    /// Format in the selected currency
    pub fn format_selected(&self, amount: Option<f64>) -> String {
        self.formatter.format(amount, self.selected_currency().code())
    }

    /// Format a USD amount in the selected currency using cached rates
    pub fn format_from_usd(&self, usd_amount: Option<f64>) -> String {
        let converted = usd_amount.map(|a| a * self.selected_currency_rate());
        self.format_selected(converted)
    }

    /// Convert then format in the target currency
    pub async fn format_converted(&self, amount: Option<f64>, from: &str, to: &str) -> String {
        let Some(amount) = amount else {
            return self.formatter.format(None, to);
        };
        let converted = self.convert_currency(amount, from, to).await;
        self.formatter.format(Some(converted), to)
    }

    pub fn rates_stale(&self) -> bool {
        self.cache.is_stale()
    }

    pub fn last_updated(&self) -> Option<u64> {
        self.cache.last_updated()
    }

    pub fn last_updated_label(&self) -> String {
        relative_age(self.cache.last_updated(), self.clock.now_ms())
    }

    pub fn status(&self) -> RatesStatus {
        let base = self.cache.snapshot().map(|s| s.base_currency);
        RatesStatus {
            selected: self.selected_currency(),
            base,
            last_updated: self.last_updated(),
            label: self.last_updated_label(),
            valid: base.is_some_and(|b| self.cache.is_valid(b)),
            stale: self.rates_stale(),
        }
    }
}
