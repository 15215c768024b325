//! Types that represent the core data model: `Transaction`, `SavingsGoal` and the row codec that
//! maps them to and from spreadsheet rows.
mod amount;
mod codec;
mod record_id;
mod savings;
mod transaction;

use crate::error::{Error, ErrorType, Result};
use chrono::NaiveDate;

pub use amount::{Amount, AmountError};
pub use codec::RowCodec;
pub use record_id::RecordId;
pub use savings::{NewSavingsGoal, SavingsGoal, SavingsPatch};
pub use transaction::{Kind, NewTransaction, Transaction};

/// Validates that `s` is an ISO calendar date (`YYYY-MM-DD`) and returns it in canonical form.
pub(crate) fn parse_iso_date(s: &str) -> Result<String> {
    let trimmed = s.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|e| {
            Error::msg(
                ErrorType::Request,
                format!("Expected a date like 2024-01-31, got '{trimmed}': {e}"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(parse_iso_date(" 2024-01-05 ").unwrap(), "2024-01-05");
        assert!(parse_iso_date("2024-13-01").is_err());
        assert!(parse_iso_date("").is_err());
    }
}
