//! sheet-ledger keeps a personal finance ledger (transactions and savings goals) in a Google
//! Sheet and serves it as a small JSON API.

pub mod api;
pub mod args;
pub mod commands;
mod config;
mod error;
pub mod model;
pub mod server;
pub mod store;
mod utils;


pub use api::{Backend, Mode};
pub use config::{Config, Overrides, DEFAULT_PORT};
pub use error::{Error, ErrorType, Result};
pub use model::{Amount, RecordId};
