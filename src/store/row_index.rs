//! Resolves record ids to physical rows.
//!
//! The spreadsheet has no key index, so each operation that needs one scans the id column and
//! builds it afresh. Nothing is cached between operations: the sheet may be edited by hand at any
//! time, and a stale index would point at the wrong row.

use crate::model::RecordId;
use std::collections::HashMap;

/// A map from id to one-based row number for a single read of a tab.
#[derive(Debug, Default, Clone)]
pub(crate) struct RowIndex {
    rows: HashMap<RecordId, usize>,
}

impl RowIndex {
    /// Indexes column `col` of `rows`, where `rows[0]` is the header (row 1). Blank cells are
    /// skipped. When an id appears more than once, the topmost row wins.
    pub(crate) fn build(rows: &[Vec<String>], col: usize) -> Self {
        let mut index = HashMap::new();
        for (ix, row) in rows.iter().enumerate().skip(1) {
            let Some(cell) = row.get(col) else {
                continue;
            };
            let id = RecordId::new(cell);
            if id.is_empty() {
                continue;
            }
            index.entry(id).or_insert(ix + 1);
        }
        Self { rows: index }
    }

    /// The one-based row number holding `id`.
    pub(crate) fn find(&self, id: &RecordId) -> Option<usize> {
        self.rows.get(id).copied()
    }

    pub(crate) fn contains(&self, id: &RecordId) -> bool {
        self.rows.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(ids: &[&str]) -> Vec<Vec<String>> {
        ids.iter()
            .map(|id| if id.is_empty() { Vec::new() } else { vec![id.to_string()] })
            .collect()
    }

    #[test]
    fn test_find() {
        let index = RowIndex::build(&rows(&["ID", "a", "", "b", "a"]), 0);
        assert_eq!(index.find(&RecordId::new("a")), Some(2));
        assert_eq!(index.find(&RecordId::new("b")), Some(4));
        assert_eq!(index.find(&RecordId::new("c")), None);
        // The header label is not an id.
        assert_eq!(index.find(&RecordId::new("ID")), None);
    }

    #[test]
    fn test_numeric_ids_match_loosely() {
        let index = RowIndex::build(&rows(&["ID", "1717171717171", " 42 "]), 0);
        assert!(index.contains(&RecordId::new("1717171717171.0")));
        assert_eq!(index.find(&RecordId::new("42")), Some(3));
    }

    #[test]
    fn test_other_column() {
        let table = vec![
            vec!["Timestamp".to_string(), "ID".to_string()],
            vec!["t".to_string()],
            vec!["t".to_string(), "x".to_string()],
        ];
        let index = RowIndex::build(&table, 1);
        assert_eq!(index.find(&RecordId::new("x")), Some(3));
    }
}
