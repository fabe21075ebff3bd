//! Display formatting for money amounts
//!
//! The primary path renders with en-US conventions: `,` grouping, `.`
//! decimal point, exactly two fraction digits, CLDR currency symbols. Any
//! well-formed three-letter code is accepted; codes without a dedicated
//! symbol are written as the code followed by a no-break space. When the
//! locale formatter rejects a code, the registry symbol is glued to the
//! amount fixed to two decimals.

use crate::error::{FxError, Result};
use crate::types::lookup;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

const NBSP: char = '\u{a0}';

/// en-US display symbols; codes not listed render as "CODE\u{a0}"
const EN_US_SYMBOLS: &[(&str, &str)] = &[
    ("USD", "$"),
    ("EUR", "€"),
    ("GBP", "£"),
    ("JPY", "¥"),
    ("INR", "₹"),
    ("CAD", "CA$"),
    ("AUD", "A$"),
    ("CNY", "CN¥"),
    ("NZD", "NZ$"),
    ("MXN", "MX$"),
    ("HKD", "HK$"),
    ("BRL", "R$"),
    ("KRW", "₩"),
    ("ILS", "₪"),
    ("VND", "₫"),
    ("TWD", "NT$"),
    ("PHP", "₱"),
];

/// Locale-aware currency rendering
pub trait LocaleFormatter: Send + Sync {
    /// Render `amount` in `code`, or reject the code
    fn format(&self, amount: f64, code: &str) -> Result<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EnUsFormatter;

impl LocaleFormatter for EnUsFormatter {
    fn format(&self, amount: f64, code: &str) -> Result<String> {
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(FxError::UnsupportedCurrency(code.to_string()));
        }
        let code = code.to_ascii_uppercase();
        let prefix = match EN_US_SYMBOLS.iter().find(|(c, _)| *c == code) {
            Some((_, symbol)) => symbol.to_string(),
            None => format!("{code}{NBSP}"),
        };

        if amount.is_nan() {
            return Ok(format!("{prefix}NaN"));
        }
        // Sign follows the input, so amounts that round to zero keep it.
        let sign = if amount.is_sign_negative() { "-" } else { "" };
        if amount.is_infinite() {
            return Ok(format!("{sign}{prefix}∞"));
        }

        let value = round_cents(amount)
            .ok_or_else(|| FxError::Config(format!("cannot format amount {amount}")))?;
        let digits = format!("{:.2}", value.abs());
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));
        Ok(format!("{sign}{prefix}{}.{frac_part}", group_thousands(int_part)))
    }
}

/// Round half away from zero to two decimals
fn round_cents(amount: f64) -> Option<Decimal> {
    Decimal::from_f64(amount)
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Amount fixed to two decimals, no grouping
fn fixed2(amount: f64) -> String {
    match round_cents(amount) {
        Some(value) => format!("{:.2}", value),
        None => format!("{amount:.2}"),
    }
}

/// Formats amounts, falling back to registry symbols when the locale
/// formatter rejects a code
pub struct CurrencyFormatter {
    locale: Box<dyn LocaleFormatter>,
}

impl CurrencyFormatter {
    pub fn new(locale: Box<dyn LocaleFormatter>) -> Self {
        Self { locale }
    }

    /// A missing amount renders as zero
    pub fn format(&self, amount: Option<f64>, code: &str) -> String {
        let amount = amount.unwrap_or(0.0);
        match self.locale.format(amount, code) {
            Ok(text) => text,
            Err(e) => {
                log::debug!("Locale formatter rejected {code}: {e}");
                format!("{}{}", lookup(code).symbol, fixed2(amount))
            }
        }
    }
}

impl Default for CurrencyFormatter {
    fn default() -> Self {
        Self::new(Box::new(EnUsFormatter))
    }
}

/// Format with the default en-US formatter
pub fn format_currency(amount: Option<f64>, code: &str) -> String {
    CurrencyFormatter::default().format(amount, code)
}

/// Short "last updated" label for a fetch timestamp
pub fn relative_age(fetched_at: Option<u64>, now_ms: u64) -> String {
    let Some(at) = fetched_at else {
        return "Never updated".to_string();
    };
    let minutes = now_ms.saturating_sub(at) / 60_000;
    if minutes < 1 {
        return "Just updated".to_string();
    }
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }
    format!("{}d ago", hours / 24)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Formatter that rejects everything
    struct Rejecting;

    impl LocaleFormatter for Rejecting {
        fn format(&self, _amount: f64, code: &str) -> Result<String> {
            Err(FxError::UnsupportedCurrency(code.to_string()))
        }
    }

    #[test]
    fn test_missing_amount_is_zero() {
        assert_eq!(format_currency(None, "USD"), "$0.00");
        assert_eq!(format_currency(None, "EUR"), "€0.00");
    }

    #[test]
    fn test_grouping_and_rounding() {
        assert_eq!(format_currency(Some(1234567.891), "USD"), "$1,234,567.89");
        assert_eq!(format_currency(Some(999.999), "USD"), "$1,000.00");
        assert_eq!(format_currency(Some(0.125), "USD"), "$0.13");
        assert_eq!(format_currency(Some(100.0), "USD"), "$100.00");
        assert_eq!(format_currency(Some(0.5), "GBP"), "£0.50");
    }

    #[test]
    fn test_negative() {
        assert_eq!(format_currency(Some(-1234.5), "USD"), "-$1,234.50");
        assert_eq!(format_currency(Some(-0.001), "USD"), "-$0.00");
        assert_eq!(format_currency(Some(-0.0), "EUR"), "-€0.00");
    }

    #[test]
    fn test_yen_keeps_two_digits() {
        assert_eq!(format_currency(Some(12.3), "JPY"), "¥12.30");
    }

    #[test]
    fn test_code_prefixed_currencies() {
        assert_eq!(format_currency(Some(12.3), "CHF"), "CHF\u{a0}12.30");
        assert_eq!(format_currency(Some(1500.0), "HUF"), "HUF\u{a0}1,500.00");
        assert_eq!(format_currency(Some(10.0), "cad"), "CA$10.00");
    }

    #[test]
    fn test_unknown_but_well_formed_code() {
        assert_eq!(format_currency(Some(5.0), "XYZ"), "XYZ\u{a0}5.00");
    }

    #[test]
    fn test_malformed_code_falls_back() {
        assert_eq!(format_currency(Some(5.0), "DOLLARS"), "DOLLARS5.00");
    }

    #[test]
    fn test_non_finite_amounts() {
        assert_eq!(format_currency(Some(f64::NAN), "USD"), "$NaN");
        assert_eq!(format_currency(Some(f64::INFINITY), "USD"), "$∞");
        assert_eq!(format_currency(Some(f64::NEG_INFINITY), "GBP"), "-£∞");
        assert_eq!(format_currency(Some(f64::INFINITY), "CHF"), "CHF\u{a0}∞");
    }

    #[test]
    fn test_fallback_uses_registry_symbol() {
        let formatter = CurrencyFormatter::new(Box::new(Rejecting));
        assert_eq!(formatter.format(Some(12.3), "JPY"), "¥12.30");
        assert_eq!(formatter.format(Some(1234.5), "PLN"), "zł1234.50");
        assert_eq!(formatter.format(None, "CAD"), "C$0.00");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands("0"), "0");
        assert_eq!(group_thousands("999"), "999");
        assert_eq!(group_thousands("1000"), "1,000");
        assert_eq!(group_thousands("123456"), "123,456");
    }

    #[test]
    fn test_relative_age() {
        let now = 10 * 86_400_000;
        assert_eq!(relative_age(None, now), "Never updated");
        assert_eq!(relative_age(Some(now - 30_000), now), "Just updated");
        assert_eq!(relative_age(Some(now - 5 * 60_000), now), "5m ago");
        assert_eq!(relative_age(Some(now - 3 * 3_600_000), now), "3h ago");
        assert_eq!(relative_age(Some(now - 2 * 86_400_000), now), "2d ago");
    }
}
