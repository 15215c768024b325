use rust_decimal::Decimal;
use serde::de::Visitor;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The identifier of a record, held in its canonical string form.
///
/// Spreadsheet cells are untyped text and callers may send ids as JSON numbers, so the same id can
/// show up as `5`, `"5"`, `" 5 "` or `"5.0"`. All of those canonicalize to `"5"`, which lets the
/// rest of the crate compare ids with plain string equality. Anything that is not a plain decimal
/// number (e.g. a UUID) is only trimmed.
#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(canonicalize(s.as_ref()))
    }

    /// Creates a new random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn canonicalize(s: &str) -> String {
    let trimmed = s.trim();
    let looks_numeric = !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == '-');
    if looks_numeric {
        if let Ok(d) = Decimal::from_str(trimmed) {
            return d.normalize().to_string();
        }
    }
    trimmed.to_string()
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId::new(value)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        RecordId::new(value)
    }
}

impl FromStr for RecordId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(RecordId::new(s))
    }
}

impl Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(RecordIdVisitor)
    }
}

struct RecordIdVisitor;

impl Visitor<'_> for RecordIdVisitor {
    type Value = RecordId;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("a string or numeric identifier")
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<RecordId, E> {
        Ok(RecordId::new(v.to_string()))
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<RecordId, E> {
        Ok(RecordId::new(v.to_string()))
    }

    fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<RecordId, E> {
        Ok(RecordId::new(v.to_string()))
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<RecordId, E> {
        Ok(RecordId::new(v))
    }
}
