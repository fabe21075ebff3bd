//! The user's display currency, persisted across sessions

use crate::error::{FxError, Result};
use crate::storage::{KeyValueStore, SELECTED_CURRENCY_KEY};
use crate::types::Currency;
use std::sync::Arc;

/// Currency used when nothing (or nothing valid) is stored
pub const DEFAULT_CURRENCY: Currency = Currency::USD;

pub struct CurrencyPreference {
    selected: Currency,
    store: Arc<dyn KeyValueStore>,
}

impl CurrencyPreference {
    /// Read the saved selection, defaulting to USD
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let selected = match store.get(SELECTED_CURRENCY_KEY) {
            Ok(Some(code)) => Currency::parse(&code).unwrap_or_else(|| {
                log::warn!("Ignoring unsupported saved currency {code:?}");
                DEFAULT_CURRENCY
            }),
            Ok(None) => DEFAULT_CURRENCY,
            Err(e) => {
                log::warn!("Failed to read saved currency: {e}");
                DEFAULT_CURRENCY
            }
        };
        Self { selected, store }
    }

    pub fn current(&self) -> Currency {
        self.selected
    }

    /// Change the selection. Unsupported codes leave it untouched.
    pub fn select(&mut self, code: &str) -> Result<Currency> {
        let Some(currency) = Currency::parse(code) else {
            let err = FxError::UnsupportedCurrency(code.to_string());
            log::error!("{err}");
            return Err(err);
        };

        self.selected = currency;
        if let Err(e) = self.store.set(SELECTED_CURRENCY_KEY, currency.code()) {
            log::warn!("Failed to save currency preference: {e}");
        }
        Ok(currency)
    }
}
