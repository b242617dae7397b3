//! Error taxonomy shared by the resolvers, the console, and the record server.

use std::time::Duration;

/// All errors that can occur in scour.
#[derive(thiserror::Error, Debug)]
pub enum ScourError {
    #[error("invalid hostname: {0:?}")]
    InvalidHostname(String),

    #[error("unsupported scheme {0:?}: expected http or https")]
    UnsupportedScheme(String),

    #[error("invalid port: {0:?}")]
    InvalidPort(String),

    #[error("unsupported address family in {0:?}: bracketed IPv6 literals are not supported")]
    UnsupportedAddressFamily(String),

    #[error("malformed socket locator {0:?}: expected \"<socket-path> <resource>\"")]
    MalformedLocator(String),

    #[error("path {0:?} is not a unix socket or does not exist")]
    NotASocket(String),

    #[error("resource {0:?} is not a valid socket resource")]
    InvalidResource(String),

    #[error("unsupported method {0:?}: expected GET, PUT, POST, DELETE or PATCH")]
    UnsupportedMethod(String),

    #[error("malformed header {0:?}: expected \"name: value\"")]
    MalformedHeader(String),

    #[error("send failed: {0}")]
    SendFailure(String),

    #[error("receive failed: {0}")]
    ReceiveFailure(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("retry limit of {0} attempts exceeded")]
    RetryLimitExceeded(u32),

    #[error("invalid record request: {0}")]
    InvalidRecordRequest(String),

    #[error("record index {0} out of range")]
    RecordIndexOutOfRange(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ScourResult<T> = Result<T, ScourError>;
