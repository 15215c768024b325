//! Implements the `Sheet` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without using Google Sheets.
//!
//! State lives in a process-wide map keyed by spreadsheet id. Every `TestSheet` created for the
//! same id sees the same tabs, the way every client of a real spreadsheet does. Tests use distinct
//! ids to stay isolated from each other.

use crate::api::{Sheet, SheetRange, TabProperties, A1};
use crate::error::Res;
use anyhow::{bail, Context};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{LazyLock, Mutex, MutexGuard};
use tracing::trace;

static SPREADSHEETS: LazyLock<Mutex<HashMap<String, TestSheetState>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// One tab of an in-memory spreadsheet.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TestTab {
    pub sheet_id: i64,
    pub title: String,
    pub rows: Vec<Vec<String>>,
}

impl TestTab {
    /// Creates a tab. Its `sheet_id` is assigned by `TestSheetState::new`.
    pub fn new(title: &str, rows: Vec<Vec<String>>) -> Self {
        Self {
            sheet_id: 0,
            title: title.to_string(),
            rows,
        }
    }
}

/// One request received by an in-memory spreadsheet, as recorded in `TestSheetState::calls`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Call {
    Tabs,
    AddTab(String),
    Get(String),
    /// The ranges of one `write_ranges` request.
    WriteRanges(Vec<String>),
    Append(String),
    DeleteRows(i64, usize, usize),
}

/// The full contents of an in-memory spreadsheet.
///
/// Equality compares contents and failure switches only. The call log is left out so that a
/// read-only operation leaves the state equal to what it was.
#[derive(Debug, Clone)]
pub struct TestSheetState {
    pub tabs: Vec<TestTab>,
    next_sheet_id: i64,
    /// When set, every request fails. Used to exercise backend error paths.
    pub fail_requests: bool,
    /// When set, appends fail and every other request succeeds.
    pub fail_appends: bool,
    /// Every request received, oldest first, including ones that failed.
    pub calls: Vec<Call>,
}

impl PartialEq for TestSheetState {
    fn eq(&self, other: &Self) -> bool {
        self.tabs == other.tabs
            && self.next_sheet_id == other.next_sheet_id
            && self.fail_requests == other.fail_requests
            && self.fail_appends == other.fail_appends
    }
}

impl Eq for TestSheetState {}

impl TestSheetState {
    /// Creates a state holding `tabs`, numbering their sheet ids in order.
    pub fn new(tabs: Vec<TestTab>) -> Self {
        let tabs: Vec<TestTab> = tabs
            .into_iter()
            .enumerate()
            .map(|(ix, mut tab)| {
                tab.sheet_id = ix as i64;
                tab
            })
            .collect();
        let next_sheet_id = tabs.len() as i64;
        Self {
            tabs,
            next_sheet_id,
            fail_requests: false,
            fail_appends: false,
            calls: Vec::new(),
        }
    }

    /// Counts the recorded calls matching `f`.
    pub fn count_calls(&self, f: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| f(c)).count()
    }

    /// Returns the rows of the tab titled `title`.
    pub fn rows(&self, title: &str) -> Option<&Vec<Vec<String>>> {
        self.tabs.iter().find(|t| t.title == title).map(|t| &t.rows)
    }

    fn tab_mut(&mut self, title: &str) -> Res<&mut TestTab> {
        self.tabs
            .iter_mut()
            .find(|t| t.title == title)
            .with_context(|| format!("Unable to parse range: no tab named '{title}'"))
    }
}

impl Default for TestSheetState {
    /// The seed data from this module: a ledger tab with a few transactions, one of which predates
    /// record ids, and a savings tab with a single goal.
    fn default() -> Self {
        // The seed data is a compile-time constant and parses.
        let transactions = load_csv(TRANSACTION_DATA).unwrap_or_default();
        let savings = load_csv(SAVINGS_DATA).unwrap_or_default();
        Self::new(vec![
            TestTab::new("Sheet1", transactions),
            TestTab::new("Sheet2", savings),
        ])
    }
}

/// An implementation of the `Sheet` trait that does not use Google sheets.
pub struct TestSheet {
    spreadsheet_id: String,
}

impl TestSheet {
    /// Creates a client for the in-memory spreadsheet `spreadsheet_id`, seeding it with default
    /// data if it does not exist yet.
    pub fn new(spreadsheet_id: &str) -> Self {
        lock().entry(spreadsheet_id.to_string()).or_default();
        Self {
            spreadsheet_id: spreadsheet_id.to_string(),
        }
    }

    /// Returns a copy of the state of the spreadsheet `spreadsheet_id`.
    pub fn get_state(spreadsheet_id: &str) -> Option<TestSheetState> {
        lock().get(spreadsheet_id).cloned()
    }

    /// Replaces the state of the spreadsheet `spreadsheet_id`.
    pub fn set_state(spreadsheet_id: &str, state: TestSheetState) {
        lock().insert(spreadsheet_id.to_string(), state);
    }

    fn with_state<T>(
        &self,
        call: Call,
        f: impl FnOnce(&mut TestSheetState) -> Res<T>,
    ) -> Res<T> {
        let mut map = lock();
        let state = map.entry(self.spreadsheet_id.clone()).or_default();
        let is_append = matches!(call, Call::Append(_));
        state.calls.push(call);
        if state.fail_requests || (is_append && state.fail_appends) {
            bail!("Simulated backend failure for '{}'", self.spreadsheet_id);
        }
        f(state)
    }
}

fn lock() -> MutexGuard<'static, HashMap<String, TestSheetState>> {
    // A panicking test can poison the lock; the map itself is still usable.
    SPREADSHEETS
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait::async_trait]
impl Sheet for TestSheet {
    async fn tabs(&mut self) -> Res<Vec<TabProperties>> {
        trace!("tabs for {}", self.spreadsheet_id);
        self.with_state(Call::Tabs, |state| {
            Ok(state
                .tabs
                .iter()
                .enumerate()
                .map(|(index, tab)| TabProperties {
                    sheet_id: tab.sheet_id,
                    title: tab.title.clone(),
                    index,
                })
                .collect())
        })
    }

    async fn add_tab(&mut self, title: &str) -> Res<TabProperties> {
        trace!("add_tab {title}");
        self.with_state(Call::AddTab(title.to_string()), |state| {
            if state.tabs.iter().any(|t| t.title == title) {
                bail!("A sheet with the name \"{title}\" already exists");
            }
            let mut tab = TestTab::new(title, Vec::new());
            tab.sheet_id = state.next_sheet_id;
            state.next_sheet_id += 1;
            let properties = TabProperties {
                sheet_id: tab.sheet_id,
                title: tab.title.clone(),
                index: state.tabs.len(),
            };
            state.tabs.push(tab);
            Ok(properties)
        })
    }

    async fn get(&mut self, range: &A1) -> Res<Vec<Vec<String>>> {
        trace!("get {range}");
        self.with_state(Call::Get(range.to_string()), |state| {
            let tab = state.tab_mut(range.tab())?;
            let first_row = range.start().row.map(|r| r - 1).unwrap_or(0);
            let last_row = range.end().row.unwrap_or(tab.rows.len());
            let first_col = range.start().col;
            let last_col = range.end().col;
            let mut values: Vec<Vec<String>> = tab
                .rows
                .iter()
                .enumerate()
                .filter(|(ix, _)| *ix >= first_row && *ix < last_row)
                .map(|(_, row)| {
                    let mut cells: Vec<String> = row
                        .iter()
                        .enumerate()
                        .filter(|(ix, _)| *ix >= first_col && *ix <= last_col)
                        .map(|(_, c)| c.clone())
                        .collect();
                    while cells.last().is_some_and(|c| c.is_empty()) {
                        cells.pop();
                    }
                    cells
                })
                .collect();
            while values.last().is_some_and(|r| r.is_empty()) {
                values.pop();
            }
            Ok(values)
        })
    }

    async fn write_ranges(&mut self, data: &[SheetRange]) -> Res<()> {
        trace!("write_ranges with {} ranges", data.len());
        let ranges = data.iter().map(|d| d.range.to_string()).collect();
        self.with_state(Call::WriteRanges(ranges), |state| {
            for sheet_range in data {
                let range = &sheet_range.range;
                let first_row = match range.start().row {
                    Some(row) => row - 1,
                    None => bail!("Writes must address specific rows, got {range}"),
                };
                let width = range.end().col - range.start().col + 1;
                let height = range.end().row.map(|r| r - first_row).unwrap_or(usize::MAX);
                if sheet_range.values.len() > height
                    || sheet_range.values.iter().any(|r| r.len() > width)
                {
                    bail!("Requested writing within range [{range}], but tried writing beyond it");
                }
                let tab = state.tab_mut(range.tab())?;
                for (i, values) in sheet_range.values.iter().enumerate() {
                    let row_ix = first_row + i;
                    if tab.rows.len() <= row_ix {
                        tab.rows.resize(row_ix + 1, Vec::new());
                    }
                    let row = &mut tab.rows[row_ix];
                    for (j, value) in values.iter().enumerate() {
                        let col_ix = range.start().col + j;
                        if row.len() <= col_ix {
                            row.resize(col_ix + 1, String::new());
                        }
                        row[col_ix] = value.clone();
                    }
                }
            }
            Ok(())
        })
    }

    async fn append(&mut self, range: &A1, rows: &[Vec<String>]) -> Res<()> {
        trace!("append {} rows to {range}", rows.len());
        self.with_state(Call::Append(range.to_string()), |state| {
            let first_col = range.start().col;
            let last_col = range.end().col;
            let tab = state.tab_mut(range.tab())?;
            let end = tab
                .rows
                .iter()
                .rposition(|row| {
                    row.iter()
                        .enumerate()
                        .any(|(ix, c)| ix >= first_col && ix <= last_col && !c.is_empty())
                })
                .map(|ix| ix + 1)
                .unwrap_or(0);
            tab.rows.truncate(end);
            for values in rows {
                let mut row = vec![String::new(); first_col];
                row.extend(values.iter().cloned());
                tab.rows.push(row);
            }
            Ok(())
        })
    }

    async fn delete_rows(&mut self, sheet_id: i64, start: usize, end: usize) -> Res<()> {
        trace!("delete_rows {start}..{end} from sheet {sheet_id}");
        self.with_state(Call::DeleteRows(sheet_id, start, end), |state| {
            if start >= end {
                bail!("Invalid row range {start}..{end}");
            }
            let tab = state
                .tabs
                .iter_mut()
                .find(|t| t.sheet_id == sheet_id)
                .with_context(|| format!("No grid with id: {sheet_id}"))?;
            let len = tab.rows.len();
            if start < len {
                tab.rows.drain(start..end.min(len));
            }
            Ok(())
        })
    }
}

/// Loads data from a CSV-formatted string. Rows may have different lengths.
fn load_csv(csv_data: &str) -> Res<Vec<Vec<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false) // Ensure headers are treated as part of the data
        .flexible(true)
        .from_reader(Cursor::new(csv_data.as_bytes()));

    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(|field| field.to_string()).collect());
    }
    Ok(rows)
}

/// Seed transaction data. The last row was written before record ids existed.
const TRANSACTION_DATA: &str = r##"Timestamp,Type,Category,Description,Amount,Payment Mode,Date,Remarks,ID
2024-01-03 09:15:00,Expense,Groceries,Weekly shop,1250.5,UPI,2024-01-03,,tx-0001
2024-01-05 18:30:00,Income,Salary,,85000,Bank Transfer,2024-01-05,January,tx-0002
2024-01-06 12:05:00,Expense,Dining,Lunch with team,420,Card,2024-01-06,Split later
"##;

/// Seed savings data.
const SAVINGS_DATA: &str = r##"ID,Name,Target,Current,Last Updated,Target Date
1704067200000,Emergency Fund,100000,25000,2024-01-01 10:00:00,2024-12-31
"##;

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_seed_data() {
        let state = TestSheetState::default();
        let ledger = state.rows("Sheet1").unwrap();
        assert_eq!(ledger.len(), 4);
        assert_eq!(ledger[0][8], "ID");
        assert_eq!(ledger[3].len(), 8);
        assert_eq!(state.rows("Sheet2").unwrap().len(), 2);
        assert_eq!(state.tabs[1].sheet_id, 1);
    }

    #[tokio::test]
    async fn test_get_trims_trailing_blanks() {
        let id = "test_client_get_trims";
        TestSheet::set_state(
            id,
            TestSheetState::new(vec![TestTab::new(
                "Sheet1",
                vec![
                    strings(&["a", "b", "", ""]),
                    strings(&[]),
                    strings(&["", "c"]),
                    strings(&["", ""]),
                ],
            )]),
        );
        let mut sheet = TestSheet::new(id);
        let values = sheet.get(&A1::columns("Sheet1", 0, 8)).await.unwrap();
        assert_eq!(
            values,
            vec![strings(&["a", "b"]), strings(&[]), strings(&["", "c"])]
        );

        let column = sheet.get(&A1::columns("Sheet1", 1, 1)).await.unwrap();
        assert_eq!(column, vec![strings(&["b"]), strings(&[]), strings(&["c"])]);
    }

    #[tokio::test]
    async fn test_get_missing_tab() {
        let id = "test_client_missing_tab";
        TestSheet::set_state(id, TestSheetState::new(Vec::new()));
        let mut sheet = TestSheet::new(id);
        assert!(sheet.get(&A1::columns("Sheet2", 0, 5)).await.is_err());
    }

    #[tokio::test]
    async fn test_write_append_delete() {
        let id = "test_client_write_append_delete";
        TestSheet::set_state(
            id,
            TestSheetState::new(vec![TestTab::new("Sheet2", vec![strings(&["ID", "Name"])])]),
        );
        let mut sheet = TestSheet::new(id);
        sheet
            .append(
                &A1::columns("Sheet2", 0, 1),
                &[strings(&["1", "one"]), strings(&["2", "two"])],
            )
            .await
            .unwrap();
        sheet
            .write_ranges(&[SheetRange::cell(A1::cell("Sheet2", 3, 1), "TWO")])
            .await
            .unwrap();
        sheet.delete_rows(0, 1, 2).await.unwrap();

        let rows = TestSheet::get_state(id).unwrap().rows("Sheet2").unwrap().clone();
        assert_eq!(rows, vec![strings(&["ID", "Name"]), strings(&["2", "TWO"])]);
    }

    #[tokio::test]
    async fn test_write_beyond_range() {
        let id = "test_client_write_beyond";
        TestSheet::set_state(id, TestSheetState::new(vec![TestTab::new("Sheet1", Vec::new())]));
        let mut sheet = TestSheet::new(id);
        let res = sheet
            .write_ranges(&[SheetRange::new(
                A1::cell("Sheet1", 1, 0),
                vec![strings(&["a", "b"])],
            )])
            .await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn test_add_tab() {
        let id = "test_client_add_tab";
        TestSheet::set_state(id, TestSheetState::default());
        let mut sheet = TestSheet::new(id);
        let added = sheet.add_tab("Goals").await.unwrap();
        assert_eq!(added.sheet_id, 2);
        assert_eq!(added.index, 2);
        assert!(sheet.add_tab("Goals").await.is_err());
    }

    #[tokio::test]
    async fn test_fail_requests() {
        let id = "test_client_fail_requests";
        let mut state = TestSheetState::default();
        state.fail_requests = true;
        TestSheet::set_state(id, state);
        let mut sheet = TestSheet::new(id);
        assert!(sheet.tabs().await.is_err());
    }

    #[tokio::test]
    async fn test_fail_appends_and_call_log() {
        let id = "test_client_fail_appends";
        let mut state = TestSheetState::default();
        state.fail_appends = true;
        TestSheet::set_state(id, state);
        let mut sheet = TestSheet::new(id);
        let range = A1::columns("Sheet2", 0, 5);
        assert!(sheet.get(&range).await.is_ok());
        assert!(sheet.append(&range, &[strings(&["g9", "Bike"])]).await.is_err());

        let state = TestSheet::get_state(id).unwrap();
        assert_eq!(state.rows("Sheet2").unwrap().len(), 2);
        assert_eq!(
            state.calls,
            vec![
                Call::Get("Sheet2!A:F".to_string()),
                Call::Append("Sheet2!A:F".to_string())
            ]
        );
        // The log does not take part in equality.
        let mut expected = TestSheetState::default();
        expected.fail_appends = true;
        assert_eq!(state, expected);
    }
}
