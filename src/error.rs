//! Error types and result handling for the CouchDB client.
//!
//! Two error families coexist by design:
//!
//! - **Transport/server errors** ([`CouchError::Unreachable`],
//!   [`CouchError::Status`]) produced while talking to the store.
//! - **Validation errors** (database-name syntax, reserved document keys,
//!   missing id/rev, revision-limit range) raised synchronously before any
//!   network call is made.
//!
//! Query cardinality has its own variants ([`CouchError::NoResults`],
//! [`CouchError::TooManyResults`]) so callers can tell "the query matched
//! nothing" apart from "the server was unreachable".
//!
//! Soft-fail accessors (`doc_get`, `find_one`, `call_view`, the database
//! existence probes) never surface these errors at all: they collapse every
//! failure into `None`/`false`. The throwing variants propagate them.

use thiserror::Error;

/// Result type alias for CouchDB client operations.
pub type Result<T> = std::result::Result<T, CouchError>;

/// Errors that can occur while talking to, or preparing requests for, a
/// CouchDB server.
#[derive(Debug, Error)]
pub enum CouchError {
    /// The server could not be reached at all (no HTTP status was produced).
    #[error("connection to the server could not be established. Please check that the server is running and your config is correct: {0}")]
    Unreachable(String),

    /// The server rejected our credentials.
    #[error("unauthorized, please check credentials")]
    Unauthorized,

    /// The server answered with a non-success HTTP status.
    #[error("server returned status {status}: {body}")]
    Status {
        /// HTTP status code returned by the server.
        status: u16,
        /// Raw response body, useful for CouchDB's `{"error", "reason"}` payloads.
        body: String,
    },

    /// A response body could not be decoded as the expected JSON shape.
    #[error("malformed response from server: {0}")]
    Json(#[from] serde_json::Error),

    /// The connection configuration did not assemble into a valid URL.
    #[error("invalid server URL: {0}")]
    Url(#[from] url::ParseError),

    /// A database name failed the `^[a-z][a-z0-9_$()+/-]*$` syntax check.
    #[error("invalid database name: {0:?}")]
    InvalidDatabaseName(String),

    /// A document payload contained a top-level key starting with `_`.
    /// Underscore-prefixed keys are reserved for the store's own metadata.
    #[error("key {0:?} is reserved: keys starting with an underscore are system keys")]
    ReservedKey(String),

    /// An operation that needs a document id was called on a handle without one.
    #[error("document has no id")]
    MissingId,

    /// A document payload was not a JSON object.
    #[error("document payload must be a JSON object")]
    NotAnObject,

    /// A delete was attempted without a revision to scope it to.
    #[error("to delete you need both _id and _rev")]
    MissingRev,

    /// `_revs_limit` accepts values between 1 and 10000.
    #[error("revision limit must be between 1 and 10000, got {0}")]
    RevsLimitOutOfRange(u64),

    /// A query that requires at least one match returned none.
    #[error("query returned no results")]
    NoResults,

    /// A query that requires exactly one match returned more.
    #[error("query expected exactly one result, got {0}")]
    TooManyResults(usize),
}

impl CouchError {
    /// HTTP status carried by this error, if the server produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            CouchError::Status { status, .. } => Some(*status),
            CouchError::Unauthorized => Some(401),
            _ => None,
        }
    }

    /// Whether this error is the server saying the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Whether this error is the store's optimistic-concurrency rejection
    /// of a write carrying a stale `_rev`.
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_extraction() {
        let err = CouchError::Status {
            status: 404,
            body: "{\"error\":\"not_found\"}".into(),
        };
        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_validation_errors_have_no_status() {
        assert_eq!(CouchError::MissingId.status(), None);
        assert_eq!(CouchError::NoResults.status(), None);
    }

    #[test]
    fn test_conflict_detection() {
        let err = CouchError::Status {
            status: 409,
            body: "{\"error\":\"conflict\"}".into(),
        };
        assert!(err.is_conflict());
    }
}
