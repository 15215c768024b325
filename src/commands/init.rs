use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory, its secrets directory and:
/// - Creates an initial `config.json` file using `sheet_url`
/// - Moves `credentials`, if given, into its default location in the data dir
///
/// # Arguments
/// - `home` - The directory that will be the root of data directory, e.g. `$HOME/sheet-ledger`
/// - `credentials` - A downloaded service-account JSON key.
/// - `sheet_url` - The URL of the Google Sheet where the records are stored.
///   e.g. https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
///
/// # Errors
/// - Returns an error if the URL is not a Google Sheets URL or if any file operations fail.
pub async fn init(home: &Path, credentials: Option<&Path>, sheet_url: &str) -> Result<Out<()>> {
    let config = Config::create(home, credentials, sheet_url).await?;
    let message = match credentials {
        Some(_) => format!(
            "Created {} with the service-account key at {}",
            config.config_path().display(),
            config.credentials_path().display()
        ),
        None => format!(
            "Created {}. Provide credentials through GOOGLE_CLIENT_EMAIL and GOOGLE_PRIVATE_KEY \
            or place a service-account key at {}",
            config.config_path().display(),
            config.credentials_path().display()
        ),
    };
    // Fail early if the freshly written file cannot be read back.
    Config::load(config.root(), Default::default())
        .await
        .context("Unable to load the newly created configuration")
        .pub_result(ErrorType::Config)?;
    Ok(message.into())
}
