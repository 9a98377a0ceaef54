//! Common error types and utilities used across all LapSync crates.
//!
//! This module provides the top-level error enum that can wrap all sub-errors,
//! along with error classification and severity levels.

use core::fmt;

use crate::{ConfigError, DecodeError, SyncError};

/// Top-level error type that can wrap all LapSync sub-errors.
#[derive(Debug, thiserror::Error)]
pub enum LapSyncError {
    /// Datagram decoding errors
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Remote sync errors
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[source] std::io::Error),
}

impl LapSyncError {
    /// Get the error category for classification.
    pub fn category(&self) -> ErrorCategory {
        match self {
            LapSyncError::Decode(_) => ErrorCategory::Decode,
            LapSyncError::Sync(_) => ErrorCategory::Sync,
            LapSyncError::Config(_) => ErrorCategory::Config,
            LapSyncError::Io(_) => ErrorCategory::IO,
        }
    }

    /// Get the error severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LapSyncError::Decode(e) => e.severity(),
            LapSyncError::Sync(e) => e.severity(),
            LapSyncError::Config(_) => ErrorSeverity::Critical,
            LapSyncError::Io(_) => ErrorSeverity::Error,
        }
    }

    /// Check if the receive loop can keep running after this error.
    pub fn is_recoverable(&self) -> bool {
        self.severity() < ErrorSeverity::Critical
    }
}

impl From<std::io::Error> for LapSyncError {
    fn from(e: std::io::Error) -> Self {
        LapSyncError::Io(e)
    }
}

/// Error category for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCategory {
    /// Datagram decoding errors
    Decode = 0,
    /// Remote sync errors
    Sync = 1,
    /// Configuration errors
    Config = 2,
    /// I/O errors
    IO = 3,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Decode => write!(f, "Decode"),
            ErrorCategory::Sync => write!(f, "Sync"),
            ErrorCategory::Config => write!(f, "Config"),
            ErrorCategory::IO => write!(f, "IO"),
        }
    }
}

/// Error severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ErrorSeverity {
    /// Informational, no action required
    Info = 0,
    /// Warning, may require attention
    Warning = 1,
    /// Error, operation failed
    Error = 2,
    /// Critical, the process cannot continue
    Critical = 3,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
