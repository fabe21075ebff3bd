//! fxcache-core: exchange-rate cache and currency conversion
//!
//! Rates are fetched from a primary provider with one fallback, cached in
//! memory for 30 minutes and persisted so the next session starts warm. When
//! no provider answers, lookups degrade to stored rates and finally to a
//! built-in table, so conversion and formatting never fail.
//!
//! # Example
//!
//! ```
//! use fxcache_core::{format_currency, Currency, ExchangeRateSnapshot};
//! use fxcache_core::convert::convert_with;
//!
//! let rates = ExchangeRateSnapshot::defaults(Currency::USD);
//! let eur = convert_with(&rates, 100.0, Currency::USD, Currency::EUR).unwrap();
//! assert_eq!(eur, 85.0);
//!
//! assert_eq!(format_currency(Some(1234.5), "USD"), "$1,234.50");
//! assert_eq!(format_currency(None, "EUR"), "€0.00");
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod context;
pub mod convert;
pub mod error;
pub mod fetch;
pub mod format;
pub mod preference;
pub mod storage;
pub mod types;

pub use cache::{RateCache, RateOutcome, RateSource};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::FxConfig;
pub use context::{CurrencyContext, RatesStatus};
pub use convert::{Conversion, ConversionEngine};
pub use error::{FxError, Result};
pub use fetch::{HttpProvider, RateProvider, RateSourceClient, UrlStyle};
pub use format::{format_currency, CurrencyFormatter, EnUsFormatter, LocaleFormatter};
pub use preference::CurrencyPreference;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use types::{lookup, Currency, CurrencyMetadata, ExchangeRateSnapshot, CURRENCIES};
