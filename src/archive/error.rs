use std::io;

use thiserror::Error;

use crate::record::AuditStatus;

/// Failures while resolving or fetching an item's remote file listing.
///
/// Every variant maps onto a status string so that nothing raised by the
/// remote archive escapes the per-item boundary.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Timed out connecting to archive: {0}")]
    Timeout(String),

    #[error("Connection refused by archive: {0}")]
    Refused(String),

    #[error("Malformed download link")]
    MalformedUrl,

    #[error("Archive request failed: {0}")]
    Transport(String),
}

impl FetchError {
    /// Only timeouts are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Timeout(_))
    }

    pub fn status(&self) -> AuditStatus {
        match self {
            FetchError::Timeout(_) => AuditStatus::TimedOut,
            FetchError::Refused(_) => AuditStatus::CouldNotConnect,
            FetchError::MalformedUrl => AuditStatus::MalformedUrl,
            FetchError::Transport(_) => AuditStatus::CouldNotConnect,
        }
    }
}

fn io_error_kind(err: &(dyn std::error::Error + 'static)) -> Option<io::ErrorKind> {
    let mut source = err.source();
    while let Some(e) = source {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        source = e.source();
    }
    None
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return FetchError::Timeout(err.to_string());
        }
        match io_error_kind(&err) {
            Some(io::ErrorKind::TimedOut) => FetchError::Timeout(err.to_string()),
            Some(io::ErrorKind::ConnectionRefused) => FetchError::Refused(err.to_string()),
            _ => FetchError::Transport(err.to_string()),
        }
    }
}
