//! Currency conversion routed through USD
//!
//! Every conversion takes two hops, source → USD → target, so the cache
//! only ever needs a single row of USD-relative rates.

use crate::cache::{RateCache, RateSource};
use crate::error::{FxError, Result};
use crate::types::{is_usable_rate, Currency, ExchangeRateSnapshot};
use std::sync::Arc;

/// Currency all conversions pivot through
pub const PIVOT: Currency = Currency::USD;

/// A converted amount and the rates it was computed from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    pub amount: f64,
    /// `None` for identity conversions, which never touch the cache
    pub source: Option<RateSource>,
}

/// Convert with an explicit USD-based snapshot
pub fn convert_with(
    snapshot: &ExchangeRateSnapshot,
    amount: f64,
    from: Currency,
    to: Currency,
) -> Result<f64> {
    if from == to {
        return Ok(amount);
    }

    let usd_amount = if from == PIVOT {
        amount
    } else {
        amount / usable_rate(snapshot, from)?
    };

    if to == PIVOT {
        return Ok(usd_amount);
    }

    Ok(usd_amount * usable_rate(snapshot, to)?)
}

/// Zero, negative and non-finite rates count as missing
fn usable_rate(snapshot: &ExchangeRateSnapshot, currency: Currency) -> Result<f64> {
    snapshot
        .rate(currency)
        .filter(|rate| is_usable_rate(*rate))
        .ok_or_else(|| FxError::RateNotFound(currency.code().to_string()))
}

#[derive(Clone)]
pub struct ConversionEngine {
    cache: Arc<RateCache>,
}

impl ConversionEngine {
    pub fn new(cache: Arc<RateCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<RateCache> {
        &self.cache
    }

    /// Convert, reporting missing rates as errors
    pub async fn try_convert(
        &self,
        amount: f64,
        from: Currency,
        to: Currency,
    ) -> Result<Conversion> {
        if from == to {
            return Ok(Conversion {
                amount,
                source: None,
            });
        }

        let outcome = self.cache.get(PIVOT).await;
        let converted = convert_with(&outcome.snapshot, amount, from, to)?;
        Ok(Conversion {
            amount: converted,
            source: Some(outcome.source),
        })
    }

    /// Convert, returning `amount` unchanged if conversion fails
    pub async fn convert(&self, amount: f64, from: Currency, to: Currency) -> f64 {
        match self.try_convert(amount, from, to).await {
            Ok(conversion) => conversion.amount,
            Err(e) => {
                log::error!("Currency conversion failed: {e}");
                amount
            }
        }
    }

    /// Convert between currency codes. Identical codes are returned as is,
    /// even when they are not in the registry.
    pub async fn convert_codes(&self, amount: f64, from: &str, to: &str) -> f64 {
        if from == to {
            return amount;
        }
        match (Currency::parse(from), Currency::parse(to)) {
            (Some(from), Some(to)) => self.convert(amount, from, to).await,
            (None, _) => {
                let err = FxError::RateNotFound(from.to_string());
                log::error!("Currency conversion failed: {err}");
                amount
            }
            (_, None) => {
                let err = FxError::RateNotFound(to.to_string());
                log::error!("Currency conversion failed: {err}");
                amount
            }
        }
    }

    /// Effective multiplier from `from` to `to`; 1 on failure
    pub async fn rate(&self, from: Currency, to: Currency) -> f64 {
        match self.try_convert(1.0, from, to).await {
            Ok(conversion) => conversion.amount,
            Err(e) => {
                log::error!("Failed to get exchange rate: {e}");
                1.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::{BTreeMap, HashMap};

    fn snapshot(pairs: &[(Currency, f64)]) -> ExchangeRateSnapshot {
        let mut rates: BTreeMap<Currency, f64> = pairs.iter().copied().collect();
        rates.insert(Currency::USD, 1.0);
        ExchangeRateSnapshot {
            rates,
            fetched_at: Some(0),
            base_currency: Currency::USD,
        }
    }

    #[test]
    fn test_usd_to_eur() {
        let s = snapshot(&[(Currency::EUR, 0.85)]);
        assert_eq!(convert_with(&s, 100.0, Currency::USD, Currency::EUR).unwrap(), 85.0);
    }

    #[test]
    fn test_eur_to_usd() {
        let s = snapshot(&[(Currency::EUR, 0.85)]);
        let usd = convert_with(&s, 85.0, Currency::EUR, Currency::USD).unwrap();
        assert!((usd - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_cross_rate_via_usd() {
        let s = snapshot(&[(Currency::EUR, 0.8), (Currency::GBP, 0.5)]);
        let gbp = convert_with(&s, 80.0, Currency::EUR, Currency::GBP).unwrap();
        assert!((gbp - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_identity_is_exact() {
        let s = snapshot(&[]);
        for amount in [0.0, -12.5, 1e-9, 123_456.789, f64::MAX] {
            for currency in Currency::all() {
                assert_eq!(convert_with(&s, amount, currency, currency).unwrap(), amount);
            }
        }
    }

    #[test]
    fn test_round_trip() {
        let s = ExchangeRateSnapshot::defaults(Currency::USD);
        for from in Currency::all() {
            for to in Currency::all() {
                let there = convert_with(&s, 1234.56, from, to).unwrap();
                let back = convert_with(&s, there, to, from).unwrap();
                assert!(((back - 1234.56) / 1234.56).abs() < 1e-6, "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_missing_rates() {
        let s = snapshot(&[(Currency::EUR, 0.85)]);
        assert!(matches!(
            convert_with(&s, 1.0, Currency::JPY, Currency::EUR),
            Err(FxError::RateNotFound(code)) if code == "JPY"
        ));
        assert!(matches!(
            convert_with(&s, 1.0, Currency::EUR, Currency::KRW),
            Err(FxError::RateNotFound(code)) if code == "KRW"
        ));
    }

    #[test]
    fn test_unusable_rates_are_missing() {
        let s = snapshot(&[
            (Currency::EUR, 0.0),
            (Currency::GBP, -2.0),
            (Currency::JPY, f64::INFINITY),
            (Currency::CHF, f64::NAN),
        ]);
        for currency in [Currency::EUR, Currency::GBP, Currency::JPY, Currency::CHF] {
            assert!(matches!(
                convert_with(&s, 10.0, currency, Currency::USD),
                Err(FxError::RateNotFound(_))
            ));
            assert!(matches!(
                convert_with(&s, 10.0, Currency::USD, currency),
                Err(FxError::RateNotFound(_))
            ));
        }
    }

    #[test]
    fn test_from_raw_snapshot() {
        let raw = HashMap::from([("SEK".to_string(), 10.0)]);
        let s = ExchangeRateSnapshot::from_raw(Currency::USD, &raw, None);
        assert_eq!(convert_with(&s, 5.0, Currency::USD, Currency::SEK).unwrap(), 50.0);
    }
}
