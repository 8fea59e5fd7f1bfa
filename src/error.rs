//! Error taxonomy of the ledger and its HTTP mapping.
//!
//! Every variant renders as `{"status": "<message>"}`; the messages double as
//! usage hints for clients.

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::store::StoreError;

/// Expected shape of an ingest body, quoted back on malformed input.
pub const INGEST_EXAMPLE: &str = r#"{"links": ["key1", "key2", "key3"]}"#;
/// Expected shape of a range query, quoted back on missing or bad bounds.
pub const QUERY_EXAMPLE: &str = "/visited_links?from=1545221231&to=1545217638";

pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

/// Store operation that failed, used to word the storage error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Save,
    Read,
    Flush,
}

impl fmt::Display for StoreOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoreOp::Save => "save",
            StoreOp::Read => "read",
            StoreOp::Flush => "flush",
        })
    }
}

#[derive(Error, Debug)]
pub enum LedgerError {
    /// Body is not `{"links": [string, ...]}` with at least one link.
    #[error("invalid data struct, expected: {}", INGEST_EXAMPLE)]
    MalformedInput,
    /// Raw items that failed normalization; the whole batch was discarded.
    #[error("following data is not a links: {0:?}")]
    UnrecognizedLink(Vec<String>),
    #[error("{op} data error")]
    StorageUnavailable {
        op: StoreOp,
        #[source]
        source: StoreError,
    },
    #[error("required get-parameters: {}", QUERY_EXAMPLE)]
    MissingRange,
    #[error("required get-parameters must be numbers: {}", QUERY_EXAMPLE)]
    NonNumericRange,
}

impl LedgerError {
    pub fn storage(op: StoreOp, source: StoreError) -> Self {
        LedgerError::StorageUnavailable { op, source }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            LedgerError::StorageUnavailable { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            LedgerError::MalformedInput
            | LedgerError::UnrecognizedLink(_)
            | LedgerError::MissingRange
            | LedgerError::NonNumericRange => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(serde::Serialize)]
struct StatusBody {
    status: String,
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let LedgerError::StorageUnavailable { op, source } = &self {
            tracing::error!(%op, error = %source, "visit store failure");
        }
        (
            status,
            Json(StatusBody {
                status: self.to_string(),
            }),
        )
            .into_response()
    }
}
