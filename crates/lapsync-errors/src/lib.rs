//! Centralized error types for LapSync
//!
//! This crate provides the error taxonomy shared by the packet codec, the
//! session pipeline, the sync layer and the service binary.
//!
//! # Architecture
//!
//! - [`common`]: Top-level error type, classification and severity levels
//! - [`decode`]: Datagram decoding failures (short buffers, bad indices, unknown formats)
//! - [`sync`]: Remote sync failures
//! - [`config`]: Configuration loading and validation failures
//!
//! Library crates return the specific error; the service lifts them into
//! [`LapSyncError`] at its edges to log category and severity.
//!
//! Decode errors are expected in normal operation (the feed is lossy and the
//! game sends packets we don't consume), so they classify as
//! [`ErrorSeverity::Info`] or [`ErrorSeverity::Warning`] and callers log them
//! at low severity and keep going.
//!
//! # Example
//!
//! ```
//! use lapsync_errors::{DecodeError, Result};
//!
//! fn check_len(raw: &[u8]) -> Result<()> {
//!     if raw.len() < 24 {
//!         return Err(DecodeError::too_short("header", raw.len(), 24).into());
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_len(&[0u8; 4]).is_err());
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod common;
pub mod config;
pub mod decode;
pub mod sync;

pub use common::{ErrorCategory, ErrorSeverity, LapSyncError};
pub use config::ConfigError;
pub use decode::DecodeError;
pub use sync::SyncError;

/// A specialized `Result` type for LapSync operations.
pub type Result<T> = std::result::Result<T, LapSyncError>;

/// A specialized `Result` type for datagram decoding.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;
