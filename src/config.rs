//! Configuration handling.
//!
//! Settings are layered. The optional file `$SHEET_LEDGER_HOME/config.json` comes first, then
//! environment variables (including those from a `.env` file), then command line flags. The later
//! layers are handed to `Config::load` as `Overrides`; `clap` has already merged flags and
//! environment variables into them.

use crate::api::{Backend, CredentialSource, Mode};
use crate::error::{ErrorType, IntoResult, Res};
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_NAME: &str = "sheet-ledger";
const CONFIG_VERSION: u8 = 1;
const SECRETS: &str = ".secrets";
const CREDENTIALS_JSON: &str = "credentials.json";
const CONFIG_JSON: &str = "config.json";

/// The port the HTTP facade listens on when none is configured.
pub const DEFAULT_PORT: u16 = 5000;

/// Settings that take precedence over `config.json`. Each comes from a command line flag or its
/// environment variable.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Overrides {
    pub spreadsheet_id: Option<String>,
    pub client_email: Option<String>,
    pub private_key: Option<String>,
    pub credentials_path: Option<PathBuf>,
    pub port: Option<u16>,
}

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$SHEET_LEDGER_HOME` and any overrides. It provides the spreadsheet id, the
/// credential settings and the listen port.
#[derive(Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    spreadsheet_id: String,
    client_email: Option<String>,
    private_key: Option<String>,
    credentials_path: PathBuf,
    port: u16,
}

impl Config {
    /// Creates the home directory and its secrets directory, then:
    /// - Moves `credentials`, a service-account key file, into `.secrets/credentials.json` and
    ///   makes it private to the current user.
    /// - Writes an initial `config.json` holding `sheet_url`.
    ///
    /// # Arguments
    /// - `dir` - The directory that will hold configuration, e.g. `$HOME/sheet-ledger`
    /// - `credentials` - A downloaded service-account JSON key, if you want it kept here
    /// - `sheet_url` - The URL of the Google Sheet, e.g.
    ///   https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
    pub async fn create(
        dir: impl Into<PathBuf>,
        credentials: Option<&Path>,
        sheet_url: &str,
    ) -> Result<Self> {
        Self::create_inner(dir.into(), credentials, sheet_url)
            .await
            .pub_result(ErrorType::Config)
    }

    async fn create_inner(
        maybe_relative: PathBuf,
        credentials: Option<&Path>,
        sheet_url: &str,
    ) -> Res<Self> {
        // Validate the URL before touching the filesystem.
        let spreadsheet_id = extract_spreadsheet_id(sheet_url)?;

        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;
        let secrets = root.join(SECRETS);
        utils::make_dir(&secrets).await?;

        if let Some(credentials) = credentials {
            let destination = secrets.join(CREDENTIALS_JSON);
            utils::rename(credentials, &destination).await?;
            utils::restrict_permissions(&destination)?;
        }

        let config_path = root.join(CONFIG_JSON);
        let config_file = ConfigFile {
            sheet_url: sheet_url.to_string(),
            ..ConfigFile::default()
        };
        config_file.save(&config_path).await?;

        Ok(Self {
            credentials_path: root.join(config_file.credentials_path()),
            root,
            config_path,
            config_file,
            spreadsheet_id,
            client_email: None,
            private_key: None,
            port: DEFAULT_PORT,
        })
    }

    /// Loads `config.json` from `home` if it exists and applies `overrides` on top of it.
    ///
    /// # Errors
    /// - `ErrorType::Config` if `config.json` exists but is invalid, or if no spreadsheet id is
    ///   configured anywhere.
    pub async fn load(home: impl Into<PathBuf>, overrides: Overrides) -> Result<Self> {
        Self::load_inner(home.into(), overrides)
            .await
            .pub_result(ErrorType::Config)
    }

    async fn load_inner(root: PathBuf, overrides: Overrides) -> Res<Self> {
        let config_path = root.join(CONFIG_JSON);
        let config_file = if config_path.is_file() {
            ConfigFile::load(&config_path).await?
        } else {
            debug!(
                "No config file at '{}', using environment and flags only",
                config_path.display()
            );
            ConfigFile::default()
        };

        let spreadsheet_id = match non_blank(overrides.spreadsheet_id) {
            Some(id) => id,
            None if !config_file.sheet_url.is_empty() => {
                extract_spreadsheet_id(&config_file.sheet_url)?
            }
            None => bail!(
                "No spreadsheet is configured. Set SPREADSHEET_ID, pass --spreadsheet-id, or run \
                'sheet-ledger init'"
            ),
        };

        let credentials_path = overrides
            .credentials_path
            .unwrap_or_else(|| config_file.credentials_path());
        let credentials_path = if credentials_path.is_absolute() {
            credentials_path
        } else {
            root.join(credentials_path)
        };

        let port = overrides.port.or(config_file.port).unwrap_or(DEFAULT_PORT);

        Ok(Self {
            root,
            config_path,
            config_file,
            spreadsheet_id,
            client_email: non_blank(overrides.client_email),
            private_key: non_blank(overrides.private_key),
            credentials_path,
            port,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn sheet_url(&self) -> &str {
        &self.config_file.sheet_url
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// The service-account key file used when no email and private key are configured.
    pub fn credentials_path(&self) -> &Path {
        &self.credentials_path
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Picks where service-account credentials come from.
    pub fn credential_source(&self) -> Result<CredentialSource> {
        CredentialSource::select(
            self.client_email.as_deref(),
            self.private_key.as_deref(),
            &self.credentials_path,
        )
    }

    /// Builds the spreadsheet backend for `mode`. Credentials are only needed for `Mode::Google`.
    pub async fn backend(&self, mode: Mode) -> Result<Backend> {
        let source = match mode {
            Mode::Google => Some(self.credential_source()?),
            Mode::Test => None,
        };
        Backend::new(mode, &self.spreadsheet_id, source).await
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("root", &self.root)
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("client_email", &self.client_email)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("credentials_path", &self.credentials_path)
            .field("port", &self.port)
            .finish()
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "sheet-ledger",
///   "config_version": 1,
///   "sheet_url": "https://docs.google.com/spreadsheets/d/7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL",
///   "credentials_path": ".secrets/credentials.json",
///   "port": 5000
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "sheet-ledger"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// URL to the Google Sheet
    #[serde(default)]
    sheet_url: String,

    /// Path to the service-account key (optional, relative to config.json or absolute)
    /// Defaults to $SHEET_LEDGER_HOME/.secrets/credentials.json if not specified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    credentials_path: Option<PathBuf>,

    /// The port for `serve`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            sheet_url: String::new(),
            credentials_path: None,
            port: None,
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile from the specified path.
    async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        let content = utils::read(path).await?;

        let config: ConfigFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }

    /// The key file path, relative to the home directory unless absolute.
    fn credentials_path(&self) -> PathBuf {
        self.credentials_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(CREDENTIALS_JSON))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts the spreadsheet id from a Google Sheets URL such as
/// `https://docs.google.com/spreadsheets/d/SPREADSHEET_ID/edit#gid=0`.
pub fn extract_spreadsheet_id(sheet_url: &str) -> Res<String> {
    let parsed = url::Url::parse(sheet_url)
        .with_context(|| format!("Invalid Google Sheets URL '{sheet_url}'"))?;
    let mut segments = parsed
        .path_segments()
        .with_context(|| format!("Invalid Google Sheets URL '{sheet_url}'"))?;
    while let Some(segment) = segments.next() {
        if segment == "d" {
            if let Some(id) = segments.next().filter(|id| !id.is_empty()) {
                return Ok(id.to_string());
            }
        }
    }
    bail!(
        "Invalid Google Sheets URL format. Expected: \
        https://docs.google.com/spreadsheets/d/SPREADSHEET_ID"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const URL: &str =
        "https://docs.google.com/spreadsheets/d/7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL/edit";

    #[test]
    fn test_extract_spreadsheet_id() {
        assert_eq!(
            extract_spreadsheet_id(URL).unwrap(),
            "7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL"
        );
        assert_eq!(
            extract_spreadsheet_id("https://example.com/spreadsheets/d/MySheetIDX?foo=bar#gid=0")
                .unwrap(),
            "MySheetIDX"
        );
        assert!(extract_spreadsheet_id("https://example.com/nothing/here").is_err());
        assert!(extract_spreadsheet_id("not a url").is_err());
    }

    #[tokio::test]
    async fn test_config_create() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("ledger_home");
        let key = dir.path().join("downloaded.json");
        utils::write(&key, "{}").await.unwrap();

        let config = Config::create(&home, Some(&key), URL).await.unwrap();
        assert_eq!(config.sheet_url(), URL);
        assert_eq!(
            config.spreadsheet_id(),
            "7KpXm2RfZwNJgs84QhVYno5DU6iM9Wlr3bCzAv1txRpL"
        );
        assert!(!key.exists());
        assert_eq!(utils::read(config.credentials_path()).await.unwrap(), "{}");
        assert!(config.config_path().is_file());
        assert_eq!(config.port(), DEFAULT_PORT);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_url_without_side_effects() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("ledger_home");
        let err = Config::create(&home, None, "https://example.com/")
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
        assert!(!home.exists());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let created = Config::create(dir.path(), None, URL).await.unwrap();
        let loaded = Config::load(created.root(), Overrides::default()).await.unwrap();
        assert_eq!(loaded.spreadsheet_id(), created.spreadsheet_id());
        assert_eq!(loaded.credentials_path(), created.credentials_path());
        assert_eq!(loaded.port(), DEFAULT_PORT);
    }

    #[tokio::test]
    async fn test_overrides_win() {
        let dir = TempDir::new().unwrap();
        let created = Config::create(dir.path(), None, URL).await.unwrap();
        let overrides = Overrides {
            spreadsheet_id: Some("from-env".to_string()),
            credentials_path: Some(PathBuf::from("/etc/keys/sa.json")),
            port: Some(8080),
            ..Overrides::default()
        };
        let loaded = Config::load(created.root(), overrides).await.unwrap();
        assert_eq!(loaded.spreadsheet_id(), "from-env");
        assert_eq!(loaded.credentials_path(), Path::new("/etc/keys/sa.json"));
        assert_eq!(loaded.port(), 8080);
    }

    #[tokio::test]
    async fn test_load_without_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(dir.path(), Overrides::default())
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);

        let overrides = Overrides {
            spreadsheet_id: Some("abc".to_string()),
            client_email: Some("a@b.c".to_string()),
            private_key: Some("k\\nk".to_string()),
            ..Overrides::default()
        };
        let config = Config::load(dir.path(), overrides).await.unwrap();
        assert_eq!(
            config.credentials_path(),
            dir.path().join(SECRETS).join(CREDENTIALS_JSON)
        );
        match config.credential_source().unwrap() {
            CredentialSource::ServiceAccount { private_key, .. } => assert_eq!(private_key, "k\nk"),
            other => panic!("expected a service account, got {other:?}"),
        }
        assert!(!format!("{config:?}").contains("k\\nk"));
    }

    #[tokio::test]
    async fn test_bad_app_name() {
        let dir = TempDir::new().unwrap();
        utils::write(
            dir.path().join(CONFIG_JSON),
            r#"{"app_name": "budget-tool", "config_version": 1, "sheet_url": ""}"#,
        )
        .await
        .unwrap();
        let err = Config::load(dir.path(), Overrides::default())
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
    }

    #[tokio::test]
    async fn test_test_mode_backend_needs_no_credentials() {
        let dir = TempDir::new().unwrap();
        let overrides = Overrides {
            spreadsheet_id: Some("config_test_mode".to_string()),
            ..Overrides::default()
        };
        let config = Config::load(dir.path(), overrides).await.unwrap();
        let backend = config.backend(Mode::Test).await.unwrap();
        assert_eq!(backend.mode(), Mode::Test);

        let err = config.backend(Mode::Google).await.err().unwrap();
        assert_eq!(err.error_type(), ErrorType::Credential);
    }
}
