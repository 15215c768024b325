use crate::error::{Error, ErrorType, Result};
use crate::model::codec::{cell, optional_cell, optional_text};
use crate::model::{parse_iso_date, Amount, RecordId, RowCodec};
use serde::{Deserialize, Serialize};

/// Whether money went out or came in.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Kind {
    #[default]
    Expense,
    Income,
}

serde_plain::derive_display_from_serialize!(Kind);
serde_plain::derive_fromstr_from_deserialize!(Kind);

impl Kind {
    /// Decodes a cell, ignoring case. Hand-edited sheets sometimes contain other text; that is
    /// read as an `Expense`.
    fn from_cell(cell: &str) -> Kind {
        match cell.trim().to_lowercase().as_str() {
            "expense" => Kind::Expense,
            "income" => Kind::Income,
            other => {
                tracing::warn!("Unknown transaction type '{other}', treating it as an expense");
                Kind::Expense
            }
        }
    }
}

/// A single row of the transaction ledger.
///
/// The JSON field names are the ones the web client uses.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub(crate) id: RecordId,
    #[serde(rename = "timestamp", alias = "createdAt")]
    pub(crate) created_at: String,
    #[serde(rename = "type")]
    pub(crate) kind: Kind,
    pub(crate) category: String,
    pub(crate) description: Option<String>,
    pub(crate) amount: Amount,
    pub(crate) payment_mode: String,
    pub(crate) date: String,
    pub(crate) remarks: Option<String>,
}

impl Transaction {
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn payment_mode(&self) -> &str {
        &self.payment_mode
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn remarks(&self) -> Option<&str> {
        self.remarks.as_deref()
    }
}

pub(super) const TIMESTAMP_IDX: usize = 0;
pub(super) const TYPE_IDX: usize = 1;
pub(super) const CATEGORY_IDX: usize = 2;
pub(super) const DESCRIPTION_IDX: usize = 3;
pub(super) const AMOUNT_IDX: usize = 4;
pub(super) const PAYMENT_MODE_IDX: usize = 5;
pub(super) const DATE_IDX: usize = 6;
pub(super) const REMARKS_IDX: usize = 7;
pub(super) const ID_IDX: usize = 8;

impl RowCodec for Transaction {
    const HEADERS: &'static [&'static str] = &[
        "Timestamp",
        "Type",
        "Category",
        "Description",
        "Amount",
        "Payment Mode",
        "Date",
        "Remarks",
        "ID",
    ];

    // The id lives in the last column because rows written before ids existed have only eight
    // columns.
    const ID_COLUMN: usize = ID_IDX;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn encode(&self) -> Vec<String> {
        vec![
            self.created_at.clone(),
            self.kind.to_string(),
            self.category.clone(),
            optional_text(&self.description),
            self.amount.to_string(),
            self.payment_mode.clone(),
            self.date.clone(),
            optional_text(&self.remarks),
            self.id.to_string(),
        ]
    }

    fn decode(cells: &[String]) -> Self {
        Self {
            id: RecordId::new(cell(cells, ID_IDX)),
            created_at: cell(cells, TIMESTAMP_IDX).to_string(),
            kind: Kind::from_cell(cell(cells, TYPE_IDX)),
            category: cell(cells, CATEGORY_IDX).to_string(),
            description: optional_cell(cells, DESCRIPTION_IDX),
            amount: Amount::from_cell(cell(cells, AMOUNT_IDX)),
            payment_mode: cell(cells, PAYMENT_MODE_IDX).to_string(),
            date: cell(cells, DATE_IDX).to_string(),
            remarks: optional_cell(cells, REMARKS_IDX),
        }
    }
}

/// A transaction as submitted by a caller, before the store assigns its id and timestamp.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    #[serde(rename = "type")]
    pub kind: Kind,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    pub amount: Amount,
    #[serde(default)]
    pub payment_mode: String,
    pub date: String,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl NewTransaction {
    /// Validates the submission and turns it into a `Transaction` with the given identity.
    pub(crate) fn into_transaction(self, id: RecordId, created_at: String) -> Result<Transaction> {
        let category = self.category.trim().to_string();
        if category.is_empty() {
            return Err(Error::msg(ErrorType::Request, "A category is required"));
        }
        let description = non_blank(self.description);
        if self.kind == Kind::Expense && description.is_none() {
            return Err(Error::msg(
                ErrorType::Request,
                "A description is required for an expense",
            ));
        }
        if !self.amount.is_positive() {
            return Err(Error::msg(
                ErrorType::Request,
                format!("The amount must be greater than zero, got {}", self.amount),
            ));
        }
        let date = parse_iso_date(&self.date)?;
        Ok(Transaction {
            id,
            created_at,
            kind: self.kind,
            category,
            description,
            amount: self.amount,
            payment_mode: self.payment_mode.trim().to_string(),
            date,
            remarks: non_blank(self.remarks),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn lunch() -> NewTransaction {
        NewTransaction {
            kind: Kind::Expense,
            category: "Food".to_string(),
            description: Some("Lunch".to_string()),
            amount: Amount::from(250),
            payment_mode: "UPI".to_string(),
            date: "2024-01-01".to_string(),
            remarks: None,
        }
    }

    #[test]
    fn test_decode_legacy_row() {
        let cells = row(&[
            "2024-01-01 10:00",
            "Expense",
            "Food",
            "Lunch",
            "250",
            "UPI",
            "2024-01-01",
            "",
            "",
        ]);
        let t = Transaction::decode(&cells);
        assert!(t.id().is_empty());
        assert_eq!(t.created_at(), "2024-01-01 10:00");
        assert_eq!(t.kind(), Kind::Expense);
        assert_eq!(t.category(), "Food");
        assert_eq!(t.description(), Some("Lunch"));
        assert_eq!(t.amount(), Amount::from(250));
        assert_eq!(t.payment_mode(), "UPI");
        assert_eq!(t.date(), "2024-01-01");
        assert_eq!(t.remarks(), None);
    }

    #[test]
    fn test_decode_short_row() {
        let t = Transaction::decode(&row(&["2024-01-01 10:00", "income", "Salary"]));
        assert_eq!(t.kind(), Kind::Income);
        assert_eq!(t.description(), None);
        assert_eq!(t.amount(), Amount::ZERO);
        assert_eq!(t.date(), "");
    }

    #[test]
    fn test_encode_width_and_id_position() {
        let t = lunch()
            .into_transaction(RecordId::new("abc"), "2024-01-01 10:00:00".to_string())
            .unwrap();
        let cells = t.encode();
        assert_eq!(cells.len(), Transaction::width());
        assert_eq!(cells[Transaction::ID_COLUMN], "abc");
        assert_eq!(cells[AMOUNT_IDX], "250");
        assert_eq!(cells[REMARKS_IDX], "");
        assert_eq!(Transaction::decode(&cells), t);
    }

    #[test]
    fn test_header() {
        assert_eq!(Transaction::id_header(), "ID");
        assert_eq!(Transaction::header_row().len(), 9);
    }

    #[test]
    fn test_description_required_for_expense() {
        let mut submission = lunch();
        submission.description = Some("  ".to_string());
        let err = submission
            .into_transaction(RecordId::generate(), String::new())
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Request);
    }

    #[test]
    fn test_description_optional_for_income() {
        let mut submission = lunch();
        submission.kind = Kind::Income;
        submission.category = "Salary".to_string();
        submission.description = None;
        let t = submission
            .into_transaction(RecordId::generate(), String::new())
            .unwrap();
        assert_eq!(t.description(), None);
    }

    #[test]
    fn test_amount_must_be_positive() {
        let mut submission = lunch();
        submission.amount = Amount::from_str("-3").unwrap();
        assert!(submission
            .into_transaction(RecordId::generate(), String::new())
            .is_err());
    }

    #[test]
    fn test_date_must_be_iso() {
        let mut submission = lunch();
        submission.date = "01/01/2024".to_string();
        let err = submission
            .into_transaction(RecordId::generate(), String::new())
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Request);
    }

    #[test]
    fn test_deserialize_form_submission() {
        let json = r#"{
            "type": "Expense",
            "category": "Food",
            "description": "Lunch",
            "amount": "250",
            "paymentMode": "UPI",
            "date": "2024-01-01",
            "remarks": ""
        }"#;
        let submission: NewTransaction = serde_json::from_str(json).unwrap();
        assert_eq!(submission.amount, Amount::from(250));
        let t = submission
            .into_transaction(RecordId::new("x"), "now".to_string())
            .unwrap();
        assert_eq!(t.remarks(), None);
    }

    #[test]
    fn test_serialize_wire_names() {
        let t = lunch()
            .into_transaction(RecordId::new("x"), "now".to_string())
            .unwrap();
        let value = serde_json::to_value(&t).unwrap();
        assert_eq!(value["type"], "Expense");
        assert_eq!(value["timestamp"], "now");
        assert_eq!(value["paymentMode"], "UPI");
        assert_eq!(value["amount"], 250);
        assert!(value["remarks"].is_null());
    }
}
