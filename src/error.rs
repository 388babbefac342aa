//! Error types returned from the public interface of the library.
//!
//! Internally the crate works with `anyhow::Error` and attaches context as errors bubble up. At
//! the boundary of a public function the error is tagged with an `ErrorType` so that callers (the
//! CLI and the HTTP server) can decide how to present it, e.g. which status code to use.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// The broad category of an error.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// A referenced ledger entry does not exist.
    NotFound,
    /// The request was missing required fields or had malformed values.
    Validation,
    /// The datastore failed.
    Database,
    /// The configuration or home directory is missing or invalid.
    Config,
    /// A filesystem operation failed.
    Io,
    /// Anything else.
    Internal,
}

serde_plain::derive_display_from_serialize!(ErrorType);
serde_plain::derive_fromstr_from_deserialize!(ErrorType);

/// The public error type.
pub struct Error {
    kind: ErrorType,
    source: anyhow::Error,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new(kind: ErrorType, source: impl Into<anyhow::Error>) -> Self {
        Self {
            kind,
            source: source.into(),
        }
    }

    pub fn not_found(message: impl Display) -> Self {
        Self::new(ErrorType::NotFound, anyhow::anyhow!("{message}"))
    }

    pub fn validation(message: impl Display) -> Self {
        Self::new(ErrorType::Validation, anyhow::anyhow!("{message}"))
    }

    pub fn kind(&self) -> ErrorType {
        self.kind
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {:?}", self.kind, self.source)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // The alternate form prints the whole context chain on one line.
        write!(f, "{:#}", self.source)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.source()
    }
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Self::new(ErrorType::Internal, value)
    }
}

/// Converts an internal `anyhow` result into a public `Result` tagged with an `ErrorType`.
///
/// Errors that are already tagged keep their original type, so a `NotFound` raised deep in the
/// call stack is not turned into a `Database` error on the way out.
pub trait IntoResult<T> {
    fn pub_result(self, kind: ErrorType) -> Result<T>;
}

impl<T> IntoResult<T> for std::result::Result<T, anyhow::Error> {
    fn pub_result(self, kind: ErrorType) -> Result<T> {
        self.map_err(|e| match e.downcast::<Error>() {
            Ok(tagged) => tagged,
            Err(e) => Error::new(kind, e),
        })
    }
}
