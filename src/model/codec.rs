//! The mapping between typed records and fixed-width rows of cell text.

use crate::model::RecordId;

/// A record that can be written to, and read from, one row of a spreadsheet tab.
///
/// Implementations are pure. `decode` never fails: legacy rows may be short or have blank cells,
/// and those decode to zero amounts and `None` optional fields.
pub trait RowCodec: Sized {
    /// The canonical header row. Its length is the width of every encoded row.
    const HEADERS: &'static [&'static str];

    /// The zero-based column holding the record's identifier.
    const ID_COLUMN: usize;

    /// The header cell label for the identifier column.
    fn id_header() -> &'static str {
        Self::HEADERS[Self::ID_COLUMN]
    }

    /// The number of columns in a row.
    fn width() -> usize {
        Self::HEADERS.len()
    }

    fn id(&self) -> &RecordId;

    fn encode(&self) -> Vec<String>;

    fn decode(cells: &[String]) -> Self;

    /// The canonical header row as owned strings.
    fn header_row() -> Vec<String> {
        Self::HEADERS.iter().map(|s| s.to_string()).collect()
    }
}

/// Returns the cell at `ix`, or an empty string when the row is short.
pub(crate) fn cell(cells: &[String], ix: usize) -> &str {
    cells.get(ix).map(|s| s.as_str()).unwrap_or_default()
}

/// Returns the trimmed cell at `ix`, or `None` when it is missing or blank.
pub(crate) fn optional_cell(cells: &[String], ix: usize) -> Option<String> {
    let value = cell(cells, ix).trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Encodes an optional field as an empty cell when absent.
pub(crate) fn optional_text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_out_of_range() {
        let row = vec!["a".to_string()];
        assert_eq!(cell(&row, 0), "a");
        assert_eq!(cell(&row, 5), "");
    }

    #[test]
    fn test_optional_cell() {
        let row = vec!["".to_string(), "  ".to_string(), " x ".to_string()];
        assert_eq!(optional_cell(&row, 0), None);
        assert_eq!(optional_cell(&row, 1), None);
        assert_eq!(optional_cell(&row, 2), Some("x".to_string()));
        assert_eq!(optional_cell(&row, 3), None);
    }
}
