//! The spreadsheet backend. The `Sheet` trait is the seam between the record store and the remote
//! spreadsheet service: each of its methods is exactly one round-trip.
//!
//! There are two implementations: `GoogleSheet`, which talks to the Google Sheets API, and
//! `TestSheet`, which holds everything in memory.

mod a1;
mod credentials;
mod locator;
mod sheet;
mod sheet_test_client;

use crate::error::Res;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use a1::A1;
pub use credentials::{AuthHandle, CredentialSource};
pub(crate) use locator::{ensure_exists, locate};
pub use locator::{SheetRef, TabBinding};
pub use sheet_test_client::{Call, TestSheet, TestSheetState, TestTab};

/// OAuth scope required for reading and writing spreadsheet values and tabs.
const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// An environment variable which, when set to a non-empty value, makes the program use an
/// in-memory spreadsheet instead of Google Sheets.
pub const TEST_MODE_ENV: &str = "SHEET_LEDGER_IN_TEST_MODE";

/// The properties of one tab of the spreadsheet.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TabProperties {
    /// The numeric id used by structural requests such as row deletion.
    pub sheet_id: i64,
    pub title: String,
    /// The position of the tab, starting at 0.
    pub index: usize,
}

/// Values to be written to a range.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SheetRange {
    pub range: A1,
    pub values: Vec<Vec<String>>,
}

impl SheetRange {
    pub fn new(range: A1, values: Vec<Vec<String>>) -> Self {
        Self { range, values }
    }

    /// A write of a single cell.
    pub fn cell(range: A1, value: impl Into<String>) -> Self {
        Self::new(range, vec![vec![value.into()]])
    }
}

/// The round-trips the record store makes against a spreadsheet. Every method is one request and
/// response; there is no caching at this level.
#[async_trait::async_trait]
pub trait Sheet {
    /// Fetches the spreadsheet metadata and returns its tabs in display order.
    async fn tabs(&mut self) -> Res<Vec<TabProperties>>;

    /// Adds a new, empty tab named `title`.
    async fn add_tab(&mut self, title: &str) -> Res<TabProperties>;

    /// Reads the values in `range`. Trailing blank cells of each row, and trailing blank rows, are
    /// not returned.
    async fn get(&mut self, range: &A1) -> Res<Vec<Vec<String>>>;

    /// Writes all of `data` in one batched request.
    async fn write_ranges(&mut self, data: &[SheetRange]) -> Res<()>;

    /// Appends `rows` after the last row that has data in `range`.
    async fn append(&mut self, range: &A1, rows: &[Vec<String>]) -> Res<()>;

    /// Removes the rows with zero-based indexes `start..end` from the tab, shifting the rows below
    /// them up.
    async fn delete_rows(&mut self, sheet_id: i64, start: usize, end: usize) -> Res<()>;
}

/// Whether we are talking to Google Sheets or to an in-memory sheet.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Google,
    Test,
}

serde_plain::derive_display_from_serialize!(Mode);
serde_plain::derive_fromstr_from_deserialize!(Mode);

impl Mode {
    /// Returns `Mode::Test` when `SHEET_LEDGER_IN_TEST_MODE` is set and non-empty.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Google,
        }
    }
}

/// Hands out `Sheet` clients for one spreadsheet. Credentials are resolved once, when the backend
/// is built; each client then asks the shared `AuthHandle` for a current token.
#[derive(Clone)]
pub enum Backend {
    Google {
        spreadsheet_id: String,
        auth: Arc<AuthHandle>,
    },
    Test {
        spreadsheet_id: String,
    },
}

impl Backend {
    /// Builds the backend for `mode`. In `Mode::Google` this resolves credentials, and a failure
    /// to do so is a `Credential` error.
    pub async fn new(
        mode: Mode,
        spreadsheet_id: &str,
        source: Option<CredentialSource>,
    ) -> Result<Self> {
        match mode {
            Mode::Test => Ok(Backend::Test {
                spreadsheet_id: spreadsheet_id.to_string(),
            }),
            Mode::Google => {
                let source = match source {
                    Some(source) => source,
                    None => {
                        return Err(crate::Error::msg(
                            crate::ErrorType::Credential,
                            "No service-account credentials were configured",
                        ))
                    }
                };
                let auth = AuthHandle::resolve(source).await?;
                Ok(Backend::Google {
                    spreadsheet_id: spreadsheet_id.to_string(),
                    auth: Arc::new(auth),
                })
            }
        }
    }

    pub fn spreadsheet_id(&self) -> &str {
        match self {
            Backend::Google { spreadsheet_id, .. } => spreadsheet_id,
            Backend::Test { spreadsheet_id } => spreadsheet_id,
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            Backend::Google { .. } => Mode::Google,
            Backend::Test { .. } => Mode::Test,
        }
    }

    /// Creates a `Sheet` client. This does not make any requests.
    pub fn sheet(&self) -> Box<dyn Sheet + Send> {
        match self {
            Backend::Google {
                spreadsheet_id,
                auth,
            } => Box::new(sheet::GoogleSheet::new(spreadsheet_id.clone(), auth.clone())),
            Backend::Test { spreadsheet_id } => Box::new(TestSheet::new(spreadsheet_id)),
        }
    }
}
