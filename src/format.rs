//! Currency and quantity formatting for rendered documents.
//!
//! Parsing is lenient: currency codes, symbols, thousands separators and
//! whitespace are ignored, and anything that does not yield a number is zero.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

/// Amounts at or below this value are treated as absent when deciding which
/// summary rows to show.
pub const VISIBILITY_THRESHOLD: Decimal = Decimal::from_parts(5, 0, 0, false, 4);

pub const MAX_DECIMAL_PLACES: u32 = 6;

pub fn is_present(value: Decimal) -> bool {
    value > VISIBILITY_THRESHOLD
}

/// Parse a decimal-like string, e.g. `"OMR 1,234.500"` or `"-0.10"`.
pub fn parse_amount(raw: &str) -> Decimal {
    let mut negative = false;
    let mut seen_digit = false;
    let mut int_digits = String::new();
    let mut frac_digits = String::new();
    let mut in_frac = false;

    for ch in raw.chars() {
        if ch == '-' && !seen_digit && !in_frac {
            negative = true;
            continue;
        }
        if ch == '.' && !in_frac {
            in_frac = true;
            continue;
        }
        if ch.is_ascii_digit() {
            seen_digit = true;
            if in_frac {
                frac_digits.push(ch);
            } else {
                int_digits.push(ch);
            }
        }
        // Everything else (codes, symbols, separators) is ignored.
    }

    if !seen_digit {
        return Decimal::ZERO;
    }
    let mut literal = String::with_capacity(int_digits.len() + frac_digits.len() + 2);
    if negative {
        literal.push('-');
    }
    if int_digits.is_empty() {
        literal.push('0');
    } else {
        literal.push_str(&int_digits);
    }
    if !frac_digits.is_empty() {
        literal.push('.');
        literal.push_str(&frac_digits);
    }
    Decimal::from_str(&literal).unwrap_or(Decimal::ZERO)
}

/// Fixed-precision currency display with a code prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyFormat {
    pub code: String,
    pub decimals: u32,
}

impl CurrencyFormat {
    pub fn new(code: impl Into<String>, decimals: u32) -> Self {
        Self {
            code: code.into(),
            decimals: decimals.min(MAX_DECIMAL_PLACES),
        }
    }

    /// Digits only, e.g. `1,234.500`.
    pub fn format_number(&self, value: Decimal) -> String {
        let rounded = round_to(value, self.decimals);
        let text = rounded.abs().to_string();
        let (int_part, frac_part) = match text.split_once('.') {
            Some((int_part, frac_part)) => (int_part, Some(frac_part)),
            None => (text.as_str(), None),
        };
        let mut out = String::with_capacity(text.len() + 4);
        if rounded.is_sign_negative() {
            out.push('-');
        }
        out.push_str(&group_thousands(int_part));
        if let Some(frac) = frac_part {
            out.push('.');
            out.push_str(frac);
        }
        out
    }

    pub fn format(&self, value: Decimal) -> String {
        let number = self.format_number(value);
        if self.code.trim().is_empty() {
            number
        } else {
            format!("{} {}", self.code.trim(), number)
        }
    }
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        Self::new("OMR", 3)
    }
}

/// Whole numbers render without a fractional part; other values keep only
/// their significant decimals.
pub fn format_quantity(value: Decimal) -> String {
    let mut normalized = value.normalize();
    if normalized.is_zero() {
        normalized.set_sign_positive(true);
    }
    normalized.to_string()
}

pub fn format_quantity_str(raw: &str) -> String {
    format_quantity(parse_amount(raw))
}

fn round_to(value: Decimal, decimals: u32) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(decimals);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    rounded
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (len - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Serde helper accepting numbers, numeric strings, empty strings and null.
pub fn lenient_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Float(f64),
        Text(String),
    }

    let raw: Option<Raw> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(Raw::Float(value)) => Decimal::from_f64(value).unwrap_or(Decimal::ZERO),
        Some(Raw::Text(text)) => parse_amount(&text),
        None => Decimal::ZERO,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(raw: &str) -> Decimal {
        Decimal::from_str(raw).expect("decimal literal")
    }

    #[test]
    fn parse_amount_strips_formatting() {
        assert_eq!(parse_amount("OMR 1,234.500"), dec("1234.500"));
        assert_eq!(parse_amount("$35.07"), dec("35.07"));
        assert_eq!(parse_amount("-0.10"), dec("-0.10"));
        assert_eq!(parse_amount(".5"), dec("0.5"));
        assert_eq!(parse_amount(""), Decimal::ZERO);
        assert_eq!(parse_amount("n/a"), Decimal::ZERO);
    }

    #[test]
    fn currency_uses_configured_precision() {
        let omr = CurrencyFormat::new("OMR", 3);
        assert_eq!(omr.format(dec("20")), "OMR 20.000");
        assert_eq!(omr.format(dec("1234567.8915")), "OMR 1,234,567.892");
        let usd = CurrencyFormat::new("USD", 2);
        assert_eq!(usd.format(dec("-20")), "USD -20.00");
        assert_eq!(usd.format(dec("-0.001")), "USD 0.00");
        assert_eq!(CurrencyFormat::new("", 2).format(dec("5")), "5.00");
    }

    #[test]
    fn currency_round_trips_within_precision() {
        let fmt = CurrencyFormat::new("OMR", 3);
        for raw in ["0", "0.0004", "12.3456", "99999.9995", "-42.125", "1000000"] {
            let value = dec(raw);
            let parsed = parse_amount(&fmt.format(value));
            assert!((parsed - value).abs() <= dec("0.0005"), "{raw} -> {parsed}");
        }
    }

    #[test]
    fn quantity_is_integer_aware() {
        assert_eq!(format_quantity(dec("3.0")), "3");
        assert_eq!(format_quantity(dec("3.5")), "3.5");
        assert_eq!(format_quantity(Decimal::ZERO), "0");
        assert_eq!(format_quantity(dec("-0.000")), "0");
        assert_eq!(format_quantity_str("abc"), "0");
        assert_eq!(format_quantity_str("2.250 pcs"), "2.25");
    }

    #[test]
    fn visibility_threshold_hides_rounding_noise() {
        assert!(!is_present(Decimal::ZERO));
        assert!(!is_present(dec("0.0005")));
        assert!(is_present(dec("0.0006")));
        assert!(!is_present(dec("-3")));
    }

    #[test]
    fn lenient_deserialization() {
        #[derive(Deserialize)]
        struct Row {
            #[serde(default, deserialize_with = "lenient_decimal")]
            amount: Decimal,
        }
        let parse = |json: &str| serde_json::from_str::<Row>(json).expect("row").amount;
        assert_eq!(parse(r#"{"amount": 12.5}"#), dec("12.5"));
        assert_eq!(parse(r#"{"amount": "OMR 7.250"}"#), dec("7.250"));
        assert_eq!(parse(r#"{"amount": ""}"#), Decimal::ZERO);
        assert_eq!(parse(r#"{"amount": null}"#), Decimal::ZERO);
        assert_eq!(parse(r#"{}"#), Decimal::ZERO);
    }
}
