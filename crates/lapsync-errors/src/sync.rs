//! Remote sync errors.

use crate::common::ErrorSeverity;

/// Errors raised while pushing records to the remote service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The request never produced a response
    #[error("transport failure: {0}")]
    Transport(String),

    /// The remote service answered with a non-success status
    #[error("remote rejected {operation} with status {status}")]
    Rejected {
        /// Operation that was attempted
        operation: &'static str,
        /// Status code returned
        status: u16,
    },

    /// A success response carried no remote identifier
    #[error("{0} succeeded without returning a remote id")]
    MissingRemoteId(&'static str),

    /// Create was rejected and the existing remote session could not be resolved
    #[error("could not recover session {session_uid}: {matches} remote matches")]
    RecoveryFailed {
        /// Local session UID
        session_uid: u64,
        /// Number of remote sessions matching the UID
        matches: usize,
    },

    /// The sync worker is gone
    #[error("sync worker channel closed")]
    WorkerClosed,
}

impl SyncError {
    /// Get the severity for logging.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SyncError::WorkerClosed => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }
}
