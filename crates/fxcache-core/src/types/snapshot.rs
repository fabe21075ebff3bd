//! Exchange rate snapshots

use super::Currency;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Approximate rates (1 USD = X currency) used when no live or stored rates exist
const DEFAULT_USD_RATES: &[(Currency, f64)] = &[
    (Currency::USD, 1.0),
    (Currency::EUR, 0.85),
    (Currency::GBP, 0.73),
    (Currency::JPY, 110.0),
    (Currency::INR, 84.34),
    (Currency::CAD, 1.25),
    (Currency::AUD, 1.35),
    (Currency::CHF, 0.92),
    (Currency::CNY, 7.1),
    (Currency::SEK, 8.5),
    (Currency::NZD, 1.45),
    (Currency::MXN, 20.5),
    (Currency::SGD, 1.35),
    (Currency::HKD, 7.8),
    (Currency::NOK, 8.8),
    (Currency::TRY, 27.5),
    (Currency::RUB, 75.0),
    (Currency::BRL, 5.2),
    (Currency::ZAR, 15.5),
    (Currency::KRW, 1200.0),
    (Currency::THB, 33.0),
    (Currency::PLN, 4.1),
    (Currency::CZK, 22.0),
    (Currency::HUF, 350.0),
];

/// Rates must be finite and positive to be used as multipliers
pub(crate) fn is_usable_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

/// One set of rates relative to a base currency.
///
/// Serialized as `{ "rates": {...}, "lastUpdated": <epoch ms|null>, "baseCurrency": "USD" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRateSnapshot {
    pub rates: BTreeMap<Currency, f64>,
    /// Unix timestamp (ms) of the fetch; `None` for built-in defaults
    #[serde(rename = "lastUpdated")]
    pub fetched_at: Option<u64>,
    pub base_currency: Currency,
}

impl ExchangeRateSnapshot {
    /// Build a snapshot from raw provider rates.
    /// Unknown codes and non-positive or non-finite values are dropped, and
    /// the base is pinned to 1.
    pub fn from_raw(base: Currency, raw: &HashMap<String, f64>, fetched_at: Option<u64>) -> Self {
        let mut rates: BTreeMap<Currency, f64> = raw
            .iter()
            .filter(|(_, rate)| is_usable_rate(**rate))
            .filter_map(|(code, rate)| code.parse::<Currency>().ok().map(|c| (c, *rate)))
            .collect();
        rates.insert(base, 1.0);

        Self {
            rates,
            fetched_at,
            base_currency: base,
        }
    }

    /// Drop unusable rates and pin the base to 1, like [`Self::from_raw`].
    /// Returns `None` when no rate besides the base survives.
    pub fn sanitized(mut self) -> Option<Self> {
        self.rates.retain(|_, rate| is_usable_rate(*rate));
        self.rates.insert(self.base_currency, 1.0);
        (self.quoted_len() > 0).then_some(self)
    }

    /// Built-in default table expressed relative to `base`
    pub fn defaults(base: Currency) -> Self {
        let usd = Self {
            rates: DEFAULT_USD_RATES.iter().copied().collect(),
            fetched_at: None,
            base_currency: Currency::USD,
        };
        usd.rebased(base).unwrap_or(usd)
    }

    /// Multiplier for `currency` relative to the base
    pub fn rate(&self, currency: Currency) -> Option<f64> {
        self.rates.get(&currency).copied()
    }

    /// Number of currencies other than the base
    pub fn quoted_len(&self) -> usize {
        self.rates
            .keys()
            .filter(|c| **c != self.base_currency)
            .count()
    }

    /// Re-express every rate relative to `base`.
    /// Returns `None` when the snapshot has no rate for `base`.
    pub fn rebased(&self, base: Currency) -> Option<Self> {
        if base == self.base_currency {
            return Some(self.clone());
        }
        let pivot = self.rate(base)?;
        let mut rates: BTreeMap<Currency, f64> = self
            .rates
            .iter()
            .map(|(currency, rate)| (*currency, rate / pivot))
            .collect();
        rates.insert(base, 1.0);

        Some(Self {
            rates,
            fetched_at: self.fetched_at,
            base_currency: base,
        })
    }

    /// Age in milliseconds at `now_ms`, `None` if never fetched
    pub fn age_ms(&self, now_ms: u64) -> Option<u64> {
        self.fetched_at.map(|at| now_ms.saturating_sub(at))
    }
}
