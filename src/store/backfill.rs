//! Lazy identifier backfill.
//!
//! Sheets that predate record ids, or rows typed in by hand, have a blank id cell. Every read
//! repairs them: the header gets its id label, each data row with a blank id gets a freshly
//! generated one, and the store writes all of those cells back in one batch. Running this over
//! rows that are already fully identified changes nothing and produces no writes.

use crate::api::{SheetRange, A1};
use crate::model::{RecordId, RowCodec};

/// The outcome of backfilling the rows of one tab.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct Backfill {
    /// The rows with every missing id filled in. Row 0 is the header.
    pub(crate) rows: Vec<Vec<String>>,
    /// Single-cell writes for every id (and the header label) that was filled in.
    pub(crate) pending: Vec<SheetRange>,
}

/// Fills in missing ids for the rows of `tab` read from row 1 onward. `new_id` is called once per
/// row that needs an id. A tab with no rows at all has nothing to repair.
pub(crate) fn backfill<R: RowCodec>(
    tab: &str,
    mut rows: Vec<Vec<String>>,
    mut new_id: impl FnMut() -> RecordId,
) -> Backfill {
    let col = R::ID_COLUMN;
    let mut pending = Vec::new();

    for (ix, row) in rows.iter_mut().enumerate() {
        let blank = row.get(col).map(|c| c.trim().is_empty()).unwrap_or(true);
        if !blank {
            continue;
        }
        let value = if ix == 0 {
            R::id_header().to_string()
        } else {
            new_id().to_string()
        };
        if row.len() <= col {
            row.resize(col + 1, String::new());
        }
        row[col] = value.clone();
        pending.push(SheetRange::cell(A1::cell(tab, ix + 1, col), value));
    }

    Backfill { rows, pending }
}
