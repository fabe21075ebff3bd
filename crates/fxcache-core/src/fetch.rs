//! Exchange rate fetching
//!
//! Rates come from a primary provider with exactly one fallback. Each
//! attempt is capped by the configured timeout; a response only counts if it
//! carries at least one usable rate besides the base.

use crate::clock::Clock;
use crate::config::FxConfig;
use crate::error::{FxError, Result};
use crate::types::{Currency, ExchangeRateSnapshot};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Both providers answer with `{ "rates": { "EUR": 0.92, ... }, ... }`
#[derive(Deserialize)]
struct RatesResponse {
    #[serde(default)]
    rates: HashMap<String, f64>,
}

/// A single source of exchange rates
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &str;

    /// Fetch raw rates as "1 base = X units" keyed by currency code
    async fn fetch_raw(&self, base: Currency) -> Result<HashMap<String, f64>>;
}

/// How the base currency is passed to an HTTP provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlStyle {
    /// `{url}/{base}`
    Path,
    /// `{url}?base={base}`
    Query,
}

/// JSON-over-HTTP rate provider
pub struct HttpProvider {
    name: String,
    client: reqwest::Client,
    url: String,
    style: UrlStyle,
}

impl HttpProvider {
    pub fn new(
        name: impl Into<String>,
        client: reqwest::Client,
        url: impl Into<String>,
        style: UrlStyle,
    ) -> Self {
        Self {
            name: name.into(),
            client,
            url: url.into(),
            style,
        }
    }
}

#[async_trait]
impl RateProvider for HttpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_raw(&self, base: Currency) -> Result<HashMap<String, f64>> {
        let request = match self.style {
            UrlStyle::Path => {
                let url = format!("{}/{}", self.url.trim_end_matches('/'), base.code());
                self.client.get(url)
            }
            UrlStyle::Query => self.client.get(&self.url).query(&[("base", base.code())]),
        };

        let response = request
            .send()
            .await
            .map_err(|e| FxError::Provider(format!("{}: request failed: {e}", self.name)))?;

        if !response.status().is_success() {
            return Err(FxError::Provider(format!(
                "{}: returned status {}",
                self.name,
                response.status()
            )));
        }

        let data: RatesResponse = response
            .json()
            .await
            .map_err(|e| FxError::Provider(format!("{}: malformed body: {e}", self.name)))?;
        Ok(data.rates)
    }
}

/// Primary/fallback pair of providers
pub struct RateSourceClient {
    primary: Arc<dyn RateProvider>,
    fallback: Arc<dyn RateProvider>,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl RateSourceClient {
    pub fn new(
        primary: Arc<dyn RateProvider>,
        fallback: Arc<dyn RateProvider>,
        timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            primary,
            fallback,
            timeout,
            clock,
        }
    }

    /// HTTP providers from the configured URLs
    pub fn from_config(config: &FxConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| FxError::Config(format!("Failed to create HTTP client: {e}")))?;

        let primary = HttpProvider::new(
            "primary",
            client.clone(),
            config.primary_url.clone(),
            UrlStyle::Path,
        );
        let fallback = HttpProvider::new(
            "fallback",
            client,
            config.fallback_url.clone(),
            UrlStyle::Query,
        );

        Ok(Self::new(
            Arc::new(primary),
            Arc::new(fallback),
            config.timeout(),
            clock,
        ))
    }

    /// Fetch a snapshot for `base`, trying the fallback once if the primary
    /// fails. The snapshot is stamped with the time the response arrived.
    pub async fn fetch(&self, base: Currency) -> Result<ExchangeRateSnapshot> {
        let primary_err = match self.attempt(self.primary.as_ref(), base).await {
            Ok(snapshot) => return Ok(snapshot),
            Err(e) => e,
        };
        log::warn!("Primary exchange rate source failed, trying fallback: {primary_err}");

        match self.attempt(self.fallback.as_ref(), base).await {
            Ok(snapshot) => Ok(snapshot),
            Err(fallback_err) => {
                log::warn!("Fallback exchange rate source failed: {fallback_err}");
                Err(FxError::SourceUnavailable {
                    primary: primary_err.to_string(),
                    fallback: fallback_err.to_string(),
                })
            }
        }
    }

    async fn attempt(
        &self,
        provider: &dyn RateProvider,
        base: Currency,
    ) -> Result<ExchangeRateSnapshot> {
        let raw = tokio::time::timeout(self.timeout, provider.fetch_raw(base))
            .await
            .map_err(|_| {
                FxError::Provider(format!(
                    "{}: timed out after {} ms",
                    provider.name(),
                    self.timeout.as_millis()
                ))
            })??;

        let snapshot = ExchangeRateSnapshot::from_raw(base, &raw, Some(self.clock.now_ms()));
        if snapshot.quoted_len() == 0 {
            return Err(FxError::Provider(format!(
                "{}: response has no usable rates",
                provider.name()
            )));
        }

        log::info!(
            "Fetched {} exchange rates from {} (base {base})",
            snapshot.quoted_len(),
            provider.name()
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticProvider {
        rates: Option<HashMap<String, f64>>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl StaticProvider {
        fn ok(pairs: &[(&str, f64)]) -> Arc<Self> {
            Arc::new(Self {
                rates: Some(pairs.iter().map(|(c, r)| (c.to_string(), *r)).collect()),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                rates: None,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        fn slow() -> Arc<Self> {
            Arc::new(Self {
                rates: Some(HashMap::from([("EUR".to_string(), 0.9)])),
                delay: Duration::from_secs(5),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RateProvider for StaticProvider {
        fn name(&self) -> &str {
            "static"
        }

        async fn fetch_raw(&self, _base: Currency) -> Result<HashMap<String, f64>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.rates
                .clone()
                .ok_or_else(|| FxError::Provider("static: down".to_string()))
        }
    }

    fn client(primary: Arc<StaticProvider>, fallback: Arc<StaticProvider>) -> RateSourceClient {
        RateSourceClient::new(
            primary,
            fallback,
            Duration::from_millis(50),
            Arc::new(ManualClock::new(42)),
        )
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let primary = StaticProvider::ok(&[("EUR", 0.85)]);
        let fallback = StaticProvider::ok(&[("EUR", 0.99)]);
        let snapshot = client(primary.clone(), fallback.clone())
            .fetch(Currency::USD)
            .await
            .unwrap();

        assert_eq!(snapshot.rate(Currency::EUR), Some(0.85));
        assert_eq!(snapshot.fetched_at, Some(42));
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_falls_back_on_error() {
        let primary = StaticProvider::failing();
        let fallback = StaticProvider::ok(&[("EUR", 0.99)]);
        let snapshot = client(primary.clone(), fallback.clone())
            .fetch(Currency::USD)
            .await
            .unwrap();

        assert_eq!(snapshot.rate(Currency::EUR), Some(0.99));
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_rates_count_as_failure() {
        let primary = StaticProvider::ok(&[]);
        let fallback = StaticProvider::ok(&[("GBP", 0.73)]);
        let snapshot = client(primary, fallback).fetch(Currency::USD).await.unwrap();

        assert_eq!(snapshot.rate(Currency::GBP), Some(0.73));
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let primary = StaticProvider::slow();
        let fallback = StaticProvider::ok(&[("JPY", 110.0)]);
        let snapshot = client(primary, fallback).fetch(Currency::USD).await.unwrap();

        assert_eq!(snapshot.rate(Currency::JPY), Some(110.0));
    }

    #[tokio::test]
    async fn test_both_fail() {
        let result = client(StaticProvider::failing(), StaticProvider::ok(&[("XAU", 1.0)]))
            .fetch(Currency::USD)
            .await;

        match result {
            Err(FxError::SourceUnavailable { primary, fallback }) => {
                assert!(primary.contains("down"));
                assert!(fallback.contains("no usable rates"));
            }
            other => panic!("expected SourceUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_provider_unreachable() {
        let provider = HttpProvider::new(
            "local",
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            UrlStyle::Path,
        );
        let result = provider.fetch_raw(Currency::USD).await;
        assert!(matches!(result, Err(FxError::Provider(msg)) if msg.starts_with("local:")));
    }
}
