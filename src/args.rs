//! These structs provide the CLI interface for the sheet-ledger CLI.

use crate::config::Overrides;
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// sheet-ledger: expense and savings-goal records kept in a Google Sheet.
///
/// Transactions live in the first tab of the spreadsheet and savings goals in a tab named
/// "Sheet2". The `serve` subcommand exposes both as a small JSON API; the other subcommands work
/// on the sheet directly.
///
/// You will need a Google service account with access to the sheet. Provide its email and private
/// key through GOOGLE_CLIENT_EMAIL and GOOGLE_PRIVATE_KEY, or its downloaded JSON key file (see
/// `init` and GOOGLE_CREDENTIALS_PATH).
#[derive(Debug, Parser, Clone)]
#[command(version)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and initialize the configuration files.
    ///
    /// - Decide what directory you want to store configuration in and pass this as
    ///   --sheet-ledger-home. By default, it will be $HOME/sheet-ledger.
    ///
    /// - Get the URL of your Google Sheet and pass it as --sheet-url.
    ///
    /// - Optionally pass the service-account JSON key you downloaded from the Google Cloud
    ///   console as --credentials. It will be moved into the data directory.
    Init(InitArgs),
    /// Serve the JSON API over HTTP until Ctrl-C is pressed.
    Serve(ServeArgs),
    /// Print the records of a collection.
    List(ListArgs),
    /// Delete one record from a collection.
    Delete(DeleteArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where configuration and secrets are held. Defaults to ~/sheet-ledger
    #[arg(long, env = "SHEET_LEDGER_HOME", default_value_t = default_home())]
    sheet_ledger_home: DisplayPath,

    /// The id of the spreadsheet. Takes precedence over the sheet_url in config.json.
    #[arg(long, env = "SPREADSHEET_ID")]
    spreadsheet_id: Option<String>,

    /// The email address of the service account.
    #[arg(long, env = "GOOGLE_CLIENT_EMAIL")]
    client_email: Option<String>,

    /// The PEM private key of the service account. Literal "\n" sequences are treated as newlines.
    #[arg(long, env = "GOOGLE_PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// The path to a service-account JSON key. Defaults to
    /// $SHEET_LEDGER_HOME/.secrets/credentials.json
    #[arg(long, env = "GOOGLE_CREDENTIALS_PATH")]
    credentials_path: Option<PathBuf>,
}

impl Common {
    pub fn new(log_level: LevelFilter, sheet_ledger_home: PathBuf) -> Self {
        Self {
            log_level,
            sheet_ledger_home: sheet_ledger_home.into(),
            spreadsheet_id: None,
            client_email: None,
            private_key: None,
            credentials_path: None,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn sheet_ledger_home(&self) -> &DisplayPath {
        &self.sheet_ledger_home
    }

    /// The settings from flags and environment variables that take precedence over `config.json`.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            spreadsheet_id: self.spreadsheet_id.clone(),
            client_email: self.client_email.clone(),
            private_key: self.private_key.clone(),
            credentials_path: self.credentials_path.clone(),
            port: None,
        }
    }
}

/// The record collections kept in the spreadsheet.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CollectionName {
    /// Transactions, in the first tab.
    Expenses,
    /// Savings goals, in the tab named Sheet2.
    Savings,
}

serde_plain::derive_display_from_serialize!(CollectionName);
serde_plain::derive_fromstr_from_deserialize!(CollectionName);

/// (Not shown): Args for the `sheet-ledger init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The URL to your Google sheet. It looks like this:
    /// https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
    #[arg(long)]
    sheet_url: String,

    /// The path to your downloaded service-account key. This file will be moved to the default
    /// secrets location in the main data directory.
    #[arg(long)]
    credentials: Option<PathBuf>,
}

impl InitArgs {
    pub fn new(sheet_url: impl Into<String>, credentials: Option<PathBuf>) -> Self {
        Self {
            sheet_url: sheet_url.into(),
            credentials,
        }
    }

    pub fn sheet_url(&self) -> &str {
        &self.sheet_url
    }

    pub fn credentials(&self) -> Option<&Path> {
        self.credentials.as_deref()
    }
}

/// (Not shown): Args for the `sheet-ledger serve` command.
#[derive(Debug, Parser, Clone)]
pub struct ServeArgs {
    /// The port to listen on. Defaults to the port in config.json, or 5000.
    #[arg(long, env = "PORT")]
    port: Option<u16>,
}

impl ServeArgs {
    pub fn new(port: Option<u16>) -> Self {
        Self { port }
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }
}

/// (Not shown): Args for the `sheet-ledger list` command.
#[derive(Debug, Parser, Clone)]
pub struct ListArgs {
    /// Which records to list.
    collection: CollectionName,
}

impl ListArgs {
    pub fn new(collection: CollectionName) -> Self {
        Self { collection }
    }

    pub fn collection(&self) -> CollectionName {
        self.collection
    }
}

/// (Not shown): Args for the `sheet-ledger delete` command.
#[derive(Debug, Parser, Clone)]
pub struct DeleteArgs {
    /// Which collection the record belongs to.
    collection: CollectionName,

    /// The id of the record to delete.
    id: String,
}

impl DeleteArgs {
    pub fn new(collection: CollectionName, id: impl Into<String>) -> Self {
        Self {
            collection,
            id: id.into(),
        }
    }

    pub fn collection(&self) -> CollectionName {
        self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("sheet-ledger"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --sheet-ledger-home or SHEET_LEDGER_HOME instead of relying on \
                the default home directory. If you continue using the program right now, you may \
                have problems!",
            );
            PathBuf::from("sheet-ledger")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}
