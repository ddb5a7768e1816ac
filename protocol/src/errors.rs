//! Typed failures for the completion pipeline.
//!
//! The completion client never lets a transport error escape as a panic or an
//! untyped value: callers always receive one of these variants plus a fully
//! populated trace entry. An empty candidate list is not an error; it is a
//! valid `Ok(CandidateSet::empty())` result.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompletionError {
    /// Listing the backend's models failed or produced nothing usable. Kept
    /// separate from completion-call failures so discovery problems are
    /// diagnosable on their own.
    #[error("model discovery failed: {message}")]
    ModelDiscoveryFailed { message: String },

    /// Transport-level failure (connection refused, DNS, timeout). No HTTP
    /// status is available.
    #[error("endpoint unavailable: {message}")]
    EndpointUnavailable { message: String },

    /// The endpoint answered, but with an error status or a payload that
    /// could not be decoded.
    #[error("bad response from endpoint: {message}")]
    BadResponse {
        status: Option<u16>,
        message: String,
    },
}

impl CompletionError {
    /// HTTP-equivalent status for the failure, when one was observed.
    pub fn status(&self) -> Option<u16> {
        match self {
            CompletionError::BadResponse { status, .. } => *status,
            CompletionError::ModelDiscoveryFailed { .. }
            | CompletionError::EndpointUnavailable { .. } => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum LogError {
    /// Writing a day partition failed (storage denied, disk full). Carries
    /// the partition key and the entry count that was being written so the
    /// failure can be surfaced to the user verbatim.
    #[error("failed to write completion partition {key} ({attempted} entries): {message}")]
    WriteFailed {
        key: String,
        attempted: usize,
        message: String,
    },

    /// Removing a day partition failed. Partial clears are not allowed; when
    /// this is returned the partition is untouched.
    #[error("failed to clear completion partition {key}: {message}")]
    ClearFailed { key: String, message: String },
}
