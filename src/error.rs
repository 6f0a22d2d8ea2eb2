//! Unified error type.

use thiserror::Error;

use crate::api::ApiError;

/// Result alias used across quill.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The error type returned by quill's fallible operations.
///
/// Variants map onto the ways a request can go wrong:
///
/// | Variant | Raised by | Surfaced as |
/// |---|---|---|
/// | `Declaration` | malformed entity or handler declarations | startup failure |
/// | `BadRequest` | the binder, on malformed or missing parameters | `400` with a text reason |
/// | `Value` | invalid argument shapes (e.g. a bad `limit`) | `400` |
/// | `Api` | handler business rules | `200` with `{error, data, message}` |
/// | `Transaction` | a failed non-autocommit `execute` (already rolled back) | `500` |
/// | everything else | infrastructure | `500` |
///
/// Row-count mismatches on writes are *not* errors; they are logged.
#[derive(Debug, Error)]
pub enum Error {
    #[error("declaration error: {0}")]
    Declaration(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("invalid value: {0}")]
    Value(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("transaction rolled back: {0}")]
    Transaction(#[source] sqlx::Error),

    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("config: {0}")]
    Config(String),

    #[error("template `{name}`: {reason}")]
    Template { name: String, reason: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest(reason.into())
    }

    pub(crate) fn declaration(reason: impl Into<String>) -> Self {
        Self::Declaration(reason.into())
    }

    /// Attributes an engine failure to template `name`. Errors the engine
    /// already attributed are kept as they are.
    pub(crate) fn template(name: &str, source: Error) -> Self {
        match source {
            Self::Template { .. } => source,
            other => Self::Template { name: name.to_owned(), reason: other.to_string() },
        }
    }
}
