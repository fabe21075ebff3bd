//! Currency and rate types

pub mod currency;
mod snapshot;

pub use currency::{lookup, Currency, CurrencyDef, CurrencyMetadata, CURRENCIES};
pub(crate) use snapshot::is_usable_rate;
pub use snapshot::ExchangeRateSnapshot;
