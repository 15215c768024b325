use clap::Parser;
use sheet_ledger::args::{Args, Command};
use sheet_ledger::{commands, Config, Mode, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is not an error.
    let dotenv = dotenvy::dotenv();
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());
    if let Ok(path) = dotenv {
        debug!("Loaded environment from {}", path.display());
    }

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().sheet_ledger_home().path();

    // This allows for testing the program without hitting the Google APIs. When
    // SHEET_LEDGER_IN_TEST_MODE is set and non-zero in length, then the mode will be Mode::Test,
    // otherwise it will be Mode::Google.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => {
            commands::init(home, init_args.credentials(), init_args.sheet_url())
                .await?
                .print()
        }

        Command::Serve(serve_args) => {
            let config = Config::load(home, args.common().overrides()).await?;
            commands::serve(config, mode, serve_args.port())
                .await?
                .print()
        }

        Command::List(list_args) => {
            let config = Config::load(home, args.common().overrides()).await?;
            commands::list(config, mode, list_args.collection())
                .await?
                .print()
        }

        Command::Delete(delete_args) => {
            let config = Config::load(home, args.common().overrides()).await?;
            commands::delete(config, mode, delete_args.collection(), delete_args.id())
                .await?
                .print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only. The binary and
            // the library share the crate name.
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
