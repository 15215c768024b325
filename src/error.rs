//! Error types for the public API of this crate.
//!
//! Internally we use `anyhow` everywhere (see `Res`). At the public boundary, errors are wrapped in
//! `Error`, which carries an `ErrorType` so that callers (the HTTP facade, the CLI) can decide how
//! to render the failure without inspecting message strings.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// The internal result type.
pub(crate) type Res<T> = std::result::Result<T, anyhow::Error>;

/// The public result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies an `Error`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// No usable service-account credentials could be found. Fatal, never retried.
    Credential,
    /// The spreadsheet backend failed during a read or write.
    Store,
    /// An identifier did not resolve to a row.
    NotFound,
    /// A caller-assigned identifier is already in use.
    Conflict,
    /// A caller-supplied record failed validation.
    Request,
    /// The configuration is missing or invalid.
    Config,
    /// The service itself (listener, runtime) failed.
    Service,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// The public error type: an `anyhow::Error` with an `ErrorType` attached.
pub struct Error {
    error_type: ErrorType,
    inner: anyhow::Error,
}

impl Error {
    pub(crate) fn new(error_type: ErrorType, inner: impl Into<anyhow::Error>) -> Self {
        Self {
            error_type,
            inner: inner.into(),
        }
    }

    /// Create an error from a message.
    pub(crate) fn msg<S>(error_type: ErrorType, message: S) -> Self
    where
        S: Display + Debug + Send + Sync + 'static,
    {
        Self::new(error_type, anyhow::Error::msg(message))
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    pub fn is_not_found(&self) -> bool {
        self.error_type == ErrorType::NotFound
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.inner)
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:?}", self.error_type, self.inner)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

/// Converts an internal result into a public `Result` with the given `ErrorType`.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| Error::new(error_type, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_pub_result_keeps_context() {
        let res: Res<()> = Err(anyhow::anyhow!("socket closed")).context("Failed to fetch tabs");
        let err = res.pub_result(ErrorType::Store).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Store);
        assert_eq!(err.to_string(), "Failed to fetch tabs: socket closed");
    }

    #[test]
    fn test_error_type_display() {
        assert_eq!(ErrorType::NotFound.to_string(), "not_found");
        assert_eq!(
            "credential".parse::<ErrorType>().unwrap(),
            ErrorType::Credential
        );
    }

    #[test]
    fn test_is_not_found() {
        let err = Error::msg(ErrorType::NotFound, "Goal not found");
        assert!(err.is_not_found());
        assert!(!Error::msg(ErrorType::Store, "boom").is_not_found());
    }
}
