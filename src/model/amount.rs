//! Amount type for handling monetary values read from, or written to, spreadsheet cells.
//!
//! Cells are untyped text. Depending on the cell format chosen by whoever edited the sheet, a
//! value may come back as `250`, `250.00`, `₹250.00` or `$1,250.00`. The `Amount` type wraps
//! `Decimal` and parses all of those, and always writes the plain decimal form.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::de::Visitor;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// Represents a monetary amount.
///
/// Serializes to a JSON number and deserializes from either a JSON number or a string, because
/// form submissions send amounts as strings.
///
/// ```
/// # use sheet_ledger::model::Amount;
/// # use std::str::FromStr;
/// let a = Amount::from_str("$1,250.50").unwrap();
/// let b = Amount::from_str("1250.5").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "1250.5");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Self(value.normalize())
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Returns true if the amount is strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }

    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    /// Decodes a cell. A blank cell is zero, and so is a cell that cannot be parsed; the latter is
    /// logged because it usually means someone typed text into a numeric column.
    pub fn from_cell(cell: &str) -> Self {
        match Amount::from_str(cell) {
            Ok(amount) => amount,
            Err(e) => {
                tracing::warn!("Treating unparseable amount '{cell}' as zero: {e}");
                Amount::ZERO
            }
        }
    }
}

/// An error that can occur when parsing strings into `Amount` values.
pub struct AmountError(rust_decimal::Error);

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl std::error::Error for AmountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Amount::ZERO);
        }

        // Pull the sign off so that "-$50" and "$-50" both work.
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        // Drop a leading currency symbol (anything that cannot start a number).
        let rest = rest.trim_start_matches(|c: char| !c.is_ascii_digit() && c != '.' && c != '-');
        let (negative, rest) = match rest.strip_prefix('-') {
            Some(inner) => (!negative, inner),
            None => (negative, rest),
        };

        // Remove thousands separators
        let digits = rest.replace(',', "");
        let value = Decimal::from_str(digits.trim()).map_err(AmountError)?;
        Ok(Amount::new(if negative { -value } else { value }))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0.normalize(), f)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let value = self.0.normalize();
        if value.fract().is_zero() {
            if let Some(i) = value.to_i64() {
                return serializer.serialize_i64(i);
            }
        }
        serializer.serialize_f64(value.to_f64().unwrap_or_default())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(AmountVisitor)
    }
}

struct AmountVisitor;

impl Visitor<'_> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("a number or a numeric string")
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Amount, E> {
        Ok(Amount::new(Decimal::from(v)))
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount::new(Decimal::from(v)))
    }

    fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Amount, E> {
        Decimal::from_f64(v)
            .map(Amount::new)
            .ok_or_else(|| E::custom(format!("{v} cannot be represented as an amount")))
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::from_str(v).map_err(E::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount::new(Decimal::from(value))
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_plain() {
        let amount = Amount::from_str("250").unwrap();
        assert_eq!(amount.value(), dec("250"));
    }

    #[test]
    fn test_parse_with_dollar_sign() {
        let amount = Amount::from_str("$50.00").unwrap();
        assert_eq!(amount.value(), dec("50"));
    }

    #[test]
    fn test_parse_with_rupee_sign() {
        let amount = Amount::from_str("₹1,250.75").unwrap();
        assert_eq!(amount.value(), dec("1250.75"));
    }

    #[test]
    fn test_parse_negative_with_symbol() {
        assert_eq!(Amount::from_str("-$50.00").unwrap().value(), dec("-50"));
        assert_eq!(Amount::from_str("$-50.00").unwrap().value(), dec("-50"));
    }

    #[test]
    fn test_parse_empty_string() {
        assert_eq!(Amount::from_str("").unwrap(), Amount::ZERO);
        assert_eq!(Amount::from_str("   ").unwrap(), Amount::ZERO);
    }

    #[test]
    fn test_parse_garbage_is_error() {
        assert!(Amount::from_str("lunch").is_err());
    }

    #[test]
    fn test_from_cell_garbage_is_zero() {
        assert_eq!(Amount::from_cell("lunch"), Amount::ZERO);
        assert_eq!(Amount::from_cell(""), Amount::ZERO);
        assert_eq!(Amount::from_cell("12.5").value(), dec("12.5"));
    }

    #[test]
    fn test_display_is_plain_decimal() {
        assert_eq!(Amount::from_str("$50,000.00").unwrap().to_string(), "50000");
        assert_eq!(Amount::from_str("12.50").unwrap().to_string(), "12.5");
        assert_eq!(Amount::ZERO.to_string(), "0");
    }

    #[test]
    fn test_sign_predicates() {
        let zero = Amount::ZERO;
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());
        assert!(Amount::from(5).is_positive());
        assert!(Amount::from(-5).is_negative());
    }

    #[test]
    fn test_serialize_as_number() {
        assert_eq!(serde_json::to_string(&Amount::from(50000)).unwrap(), "50000");
        let half = Amount::from_str("12.5").unwrap();
        assert_eq!(serde_json::to_string(&half).unwrap(), "12.5");
    }

    #[test]
    fn test_deserialize_number_or_string() {
        let a: Amount = serde_json::from_str("250").unwrap();
        let b: Amount = serde_json::from_str("\"250\"").unwrap();
        let c: Amount = serde_json::from_str("250.0").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        let d: Amount = serde_json::from_str("0.1").unwrap();
        assert_eq!(d.value(), dec("0.1"));
    }

    #[test]
    fn test_deserialize_rejects_bool() {
        assert!(serde_json::from_str::<Amount>("true").is_err());
    }
}
