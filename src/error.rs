//! Error types returned by the public functions of this library.
//!
//! Internally, functions use `anyhow` (aliased as `Res`) and attach context as errors travel up
//! the stack. At the public boundary, the `anyhow::Error` is wrapped in an `Error` that carries an
//! `ErrorType` so that callers can tell a bad input apart from a broken configuration or a storage
//! fault.

use serde::Serialize;
use std::fmt::{Debug, Display, Formatter};

/// The internal result type.
pub(crate) type Res<T> = anyhow::Result<T>;

/// The public result type.
pub type Result<T> = std::result::Result<T, Error>;

/// The kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The caller supplied bad input, e.g. a non-positive amount or a malformed date. Nothing was
    /// written. The caller must correct the input.
    Validation,
    /// The vocabulary or the configuration file is missing, unreadable or malformed.
    Config,
    /// A storage operation failed. Any in-flight transaction was rolled back.
    Storage,
    /// A storage operation did not complete within the configured timeout.
    Timeout,
    /// The MCP service failed to start or stopped unexpectedly.
    Service,
}

serde_plain::derive_display_from_serialize!(ErrorType);

/// The public error type.
pub struct Error {
    error_type: ErrorType,
    inner: anyhow::Error,
}

impl Error {
    pub(crate) fn new(error_type: ErrorType, inner: anyhow::Error) -> Self {
        Self { error_type, inner }
    }

    /// Creates a `Validation` error from a message.
    pub(crate) fn validation(message: impl Display) -> Self {
        Self::new(ErrorType::Validation, anyhow::anyhow!("{message}"))
    }

    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:?}", self.error_type, self.inner)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:#}", self.error_type, self.inner)
    }
}

impl std::error::Error for Error {}

/// Converts an internal result into a public `Result` with the given `ErrorType`.
pub(crate) trait IntoResult<T> {
    fn pub_result(self, error_type: ErrorType) -> Result<T>;
}

impl<T, E> IntoResult<T> for std::result::Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn pub_result(self, error_type: ErrorType) -> Result<T> {
        self.map_err(|e| Error::new(error_type, e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pub_result_keeps_context() {
        use anyhow::Context;
        let res: Res<()> = Err(anyhow::anyhow!("disk on fire")).context("Unable to insert");
        let err = res.pub_result(ErrorType::Storage).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Storage);
        let message = err.to_string();
        assert!(message.starts_with("storage error"), "{message}");
        assert!(message.contains("disk on fire"), "{message}");
        assert!(message.contains("Unable to insert"), "{message}");
    }

    #[test]
    fn test_validation_error() {
        let err = Error::validation("amount must be positive");
        assert_eq!(err.error_type(), ErrorType::Validation);
        assert_eq!(err.to_string(), "validation error: amount must be positive");
    }
}
