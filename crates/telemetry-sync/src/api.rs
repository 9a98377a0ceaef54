//! The remote service as seen by the sync client.

use async_trait::async_trait;
use lapsync_errors::SyncError;
use serde::{Deserialize, Serialize};

use crate::records::{LapRecord, PenaltyRecord, SessionRecord};

/// HTTP status returned when a session with the same UID already exists.
pub const STATUS_ALREADY_EXISTS: u16 = 400;

/// Response to a create or update call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: u16,
    pub remote_id: Option<String>,
}

impl ApiResponse {
    pub fn created(remote_id: impl Into<String>) -> Self {
        Self {
            status: 201,
            remote_id: Some(remote_id.into()),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            remote_id: None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A session as listed by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSession {
    pub remote_id: String,
    pub session_uid: u64,
}

/// Remote endpoints used by [`SyncClient`](crate::client::SyncClient).
///
/// Transport failures surface as [`SyncError::Transport`]; a response with a
/// non-success status is `Ok` and carries the status.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn create_session(&self, record: &SessionRecord) -> Result<ApiResponse, SyncError>;

    async fn update_session(
        &self,
        remote_id: &str,
        record: &SessionRecord,
    ) -> Result<ApiResponse, SyncError>;

    /// Remote sessions whose UID equals `session_uid`.
    async fn list_sessions(&self, session_uid: u64) -> Result<Vec<RemoteSession>, SyncError>;

    async fn create_lap(&self, record: &LapRecord) -> Result<ApiResponse, SyncError>;

    async fn create_penalty(&self, record: &PenaltyRecord) -> Result<ApiResponse, SyncError>;
}
