use crate::api::Mode;
use crate::commands::Out;
use crate::server::{self, AppState};
use crate::{Config, Result};

/// Serves the JSON API for `config`'s spreadsheet until Ctrl-C is pressed. `port` takes
/// precedence over the configured port.
pub async fn serve(config: Config, mode: Mode, port: Option<u16>) -> Result<Out<()>> {
    let port = port.unwrap_or_else(|| config.port());
    let backend = config.backend(mode).await?;
    server::serve(AppState::new(backend), port).await?;
    Ok("Server stopped".into())
}
