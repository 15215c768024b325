//! A1 notation for addressing ranges of a tab, e.g. `Sheet1!A:I`, `'My Goals'!A3:F3` or
//! `Sheet1!I7`.
//!
//! Columns are zero-based indexes in code and letters on the wire. Rows are one-based on the wire,
//! as they are in the spreadsheet UI, and are optional: a range without rows spans whole columns.

use std::fmt;

/// One corner of a range: a zero-based column and an optional one-based row.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub(crate) struct Corner {
    pub(crate) col: usize,
    pub(crate) row: Option<usize>,
}

/// A rectangular range of a named tab.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct A1 {
    tab: String,
    start: Corner,
    end: Corner,
}

impl A1 {
    /// Whole columns `first..=last`, e.g. `Sheet1!A:I`.
    pub fn columns(tab: impl Into<String>, first: usize, last: usize) -> Self {
        Self {
            tab: tab.into(),
            start: Corner {
                col: first,
                row: None,
            },
            end: Corner {
                col: last,
                row: None,
            },
        }
    }

    /// Columns `first..=last` of a single one-based `row`, e.g. `Sheet1!A3:I3`.
    pub fn row(tab: impl Into<String>, row: usize, first: usize, last: usize) -> Self {
        Self {
            tab: tab.into(),
            start: Corner {
                col: first,
                row: Some(row),
            },
            end: Corner {
                col: last,
                row: Some(row),
            },
        }
    }

    /// A single cell, e.g. `Sheet1!I7`.
    pub fn cell(tab: impl Into<String>, row: usize, col: usize) -> Self {
        Self::row(tab, row, col, col)
    }

    pub fn tab(&self) -> &str {
        &self.tab
    }

    pub(crate) fn start(&self) -> Corner {
        self.start
    }

    pub(crate) fn end(&self) -> Corner {
        self.end
    }
}

/// Converts a zero-based column index to letters: 0 -> `A`, 25 -> `Z`, 26 -> `AA`.
fn column_letters(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

fn needs_quotes(tab: &str) -> bool {
    !tab.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", column_letters(self.col))?;
        if let Some(row) = self.row {
            write!(f, "{row}")?;
        }
        Ok(())
    }
}

impl fmt::Display for A1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if needs_quotes(&self.tab) {
            write!(f, "'{}'!", self.tab.replace('\'', "''"))?;
        } else {
            write!(f, "{}!", self.tab)?;
        }
        if self.start == self.end && self.start.row.is_some() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(8), "I");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(701), "ZZ");
        assert_eq!(column_letters(702), "AAA");
    }

    #[test]
    fn test_display() {
        assert_eq!(A1::columns("Sheet1", 0, 8).to_string(), "Sheet1!A:I");
        assert_eq!(A1::columns("Sheet1", 8, 8).to_string(), "Sheet1!I:I");
        assert_eq!(A1::row("Sheet2", 3, 0, 5).to_string(), "Sheet2!A3:F3");
        assert_eq!(A1::cell("Sheet1", 7, 8).to_string(), "Sheet1!I7");
        assert_eq!(A1::columns("My Goals", 0, 5).to_string(), "'My Goals'!A:F");
        assert_eq!(A1::cell("Sam's", 1, 0).to_string(), "'Sam''s'!A1");
    }
}
