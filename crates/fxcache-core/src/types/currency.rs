//! Currency definitions and the display registry
//!
//! To add a new currency, add an enum variant and an entry to the CURRENCIES
//! array. Parsing, lookup and search all read from the array.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

use crate::error::FxError;

/// Flag shown for codes that are not in the registry
pub const UNKNOWN_FLAG: &str = "🌍";

/// Currency metadata - single source of truth for each currency
pub struct CurrencyDef {
    /// The currency enum variant
    pub currency: Currency,
    /// ISO 4217 code (e.g., "USD", "EUR")
    pub code: &'static str,
    /// Human readable name (e.g., "US Dollar")
    pub name: &'static str,
    /// Display symbol (e.g., "$", "€")
    pub symbol: &'static str,
    /// Flag emoji shown next to the code
    pub flag: &'static str,
}

/// Complete registry of all supported currencies.
pub static CURRENCIES: &[CurrencyDef] = &[
    CurrencyDef {
        currency: Currency::USD,
        code: "USD",
        name: "US Dollar",
        symbol: "$",
        flag: "🇺🇸",
    },
    CurrencyDef {
        currency: Currency::EUR,
        code: "EUR",
        name: "Euro",
        symbol: "€",
        flag: "🇪🇺",
    },
    CurrencyDef {
        currency: Currency::GBP,
        code: "GBP",
        name: "British Pound",
        symbol: "£",
        flag: "🇬🇧",
    },
    CurrencyDef {
        currency: Currency::JPY,
        code: "JPY",
        name: "Japanese Yen",
        symbol: "¥",
        flag: "🇯🇵",
    },
    CurrencyDef {
        currency: Currency::INR,
        code: "INR",
        name: "Indian Rupee",
        symbol: "₹",
        flag: "🇮🇳",
    },
    CurrencyDef {
        currency: Currency::CAD,
        code: "CAD",
        name: "Canadian Dollar",
        symbol: "C$",
        flag: "🇨🇦",
    },
    CurrencyDef {
        currency: Currency::AUD,
        code: "AUD",
        name: "Australian Dollar",
        symbol: "A$",
        flag: "🇦🇺",
    },
    CurrencyDef {
        currency: Currency::CHF,
        code: "CHF",
        name: "Swiss Franc",
        symbol: "CHF",
        flag: "🇨🇭",
    },
    CurrencyDef {
        currency: Currency::CNY,
        code: "CNY",
        name: "Chinese Yuan",
        symbol: "¥",
        flag: "🇨🇳",
    },
    CurrencyDef {
        currency: Currency::SEK,
        code: "SEK",
        name: "Swedish Krona",
        symbol: "kr",
        flag: "🇸🇪",
    },
    CurrencyDef {
        currency: Currency::NZD,
        code: "NZD",
        name: "New Zealand Dollar",
        symbol: "NZ$",
        flag: "🇳🇿",
    },
    CurrencyDef {
        currency: Currency::MXN,
        code: "MXN",
        name: "Mexican Peso",
        symbol: "$",
        flag: "🇲🇽",
    },
    CurrencyDef {
        currency: Currency::SGD,
        code: "SGD",
        name: "Singapore Dollar",
        symbol: "S$",
        flag: "🇸🇬",
    },
    CurrencyDef {
        currency: Currency::HKD,
        code: "HKD",
        name: "Hong Kong Dollar",
        symbol: "HK$",
        flag: "🇭🇰",
    },
    CurrencyDef {
        currency: Currency::NOK,
        code: "NOK",
        name: "Norwegian Krone",
        symbol: "kr",
        flag: "🇳🇴",
    },
    CurrencyDef {
        currency: Currency::TRY,
        code: "TRY",
        name: "Turkish Lira",
        symbol: "₺",
        flag: "🇹🇷",
    },
    CurrencyDef {
        currency: Currency::RUB,
        code: "RUB",
        name: "Russian Ruble",
        symbol: "₽",
        flag: "🇷🇺",
    },
    CurrencyDef {
        currency: Currency::BRL,
        code: "BRL",
        name: "Brazilian Real",
        symbol: "R$",
        flag: "🇧🇷",
    },
    CurrencyDef {
        currency: Currency::ZAR,
        code: "ZAR",
        name: "South African Rand",
        symbol: "R",
        flag: "🇿🇦",
    },
    CurrencyDef {
        currency: Currency::KRW,
        code: "KRW",
        name: "South Korean Won",
        symbol: "₩",
        flag: "🇰🇷",
    },
    CurrencyDef {
        currency: Currency::THB,
        code: "THB",
        name: "Thai Baht",
        symbol: "฿",
        flag: "🇹🇭",
    },
    CurrencyDef {
        currency: Currency::PLN,
        code: "PLN",
        name: "Polish Zloty",
        symbol: "zł",
        flag: "🇵🇱",
    },
    CurrencyDef {
        currency: Currency::CZK,
        code: "CZK",
        name: "Czech Koruna",
        symbol: "Kč",
        flag: "🇨🇿",
    },
    CurrencyDef {
        currency: Currency::HUF,
        code: "HUF",
        name: "Hungarian Forint",
        symbol: "Ft",
        flag: "🇭🇺",
    },
];

/// Supported currencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Currency {
    USD,
    EUR,
    GBP,
    JPY,
    INR,
    CAD,
    AUD,
    CHF,
    CNY,
    SEK,
    NZD,
    MXN,
    SGD,
    HKD,
    NOK,
    TRY,
    RUB,
    BRL,
    ZAR,
    KRW,
    THB,
    PLN,
    CZK,
    HUF,
}

impl Currency {
    /// Get the currency definition
    pub fn def(&self) -> &'static CurrencyDef {
        CURRENCIES
            .iter()
            .find(|d| d.currency == *self)
            .expect("All currencies must have definitions")
    }

    /// Get the ISO 4217 code
    pub fn code(&self) -> &'static str {
        self.def().code
    }

    /// Get the display name
    pub fn name(&self) -> &'static str {
        self.def().name
    }

    /// Get the currency symbol
    pub fn symbol(&self) -> &'static str {
        self.def().symbol
    }

    /// Get the flag emoji
    pub fn flag(&self) -> &'static str {
        self.def().flag
    }

    /// Parse currency from its code, ignoring case and surrounding whitespace
    pub fn parse(s: &str) -> Option<Currency> {
        let code = s.trim();
        CURRENCIES
            .iter()
            .find(|d| d.code.eq_ignore_ascii_case(code))
            .map(|d| d.currency)
    }

    /// Iterator over all currencies, in registry order
    pub fn all() -> impl Iterator<Item = Currency> {
        CURRENCIES.iter().map(|d| d.currency)
    }

    /// Get all currency codes
    pub fn all_codes() -> impl Iterator<Item = &'static str> {
        CURRENCIES.iter().map(|d| d.code)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::parse(s).ok_or_else(|| FxError::UnsupportedCurrency(s.to_string()))
    }
}

/// Display metadata for a currency code.
///
/// Registry entries borrow their strings; unknown codes get a synthetic
/// record that owns the code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrencyMetadata {
    pub code: Cow<'static, str>,
    pub display_name: Cow<'static, str>,
    pub symbol: Cow<'static, str>,
    pub flag: Cow<'static, str>,
}

impl From<Currency> for CurrencyMetadata {
    fn from(currency: Currency) -> Self {
        let def = currency.def();
        Self {
            code: Cow::Borrowed(def.code),
            display_name: Cow::Borrowed(def.name),
            symbol: Cow::Borrowed(def.symbol),
            flag: Cow::Borrowed(def.flag),
        }
    }
}

/// Look up display metadata for any code. Never fails.
pub fn lookup(code: &str) -> CurrencyMetadata {
    match Currency::parse(code) {
        Some(currency) => currency.into(),
        None => CurrencyMetadata {
            code: Cow::Owned(code.to_string()),
            display_name: Cow::Owned(code.to_string()),
            symbol: Cow::Owned(code.to_string()),
            flag: Cow::Borrowed(UNKNOWN_FLAG),
        },
    }
}

/// Whether the code names a registry currency
pub fn is_supported(code: &str) -> bool {
    Currency::parse(code).is_some()
}

/// Case-insensitive substring search over codes and display names.
/// An empty term matches every currency.
pub fn search(term: &str) -> Vec<Currency> {
    let needle = term.trim().to_lowercase();
    CURRENCIES
        .iter()
        .filter(|d| {
            d.code.to_lowercase().contains(&needle) || d.name.to_lowercase().contains(&needle)
        })
        .map(|d| d.currency)
        .collect()
}
