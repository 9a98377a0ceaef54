//! A [`RemoteApi`] that logs instead of sending.

use async_trait::async_trait;
use lapsync_errors::SyncError;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::api::{ApiResponse, RemoteApi, RemoteSession};
use crate::records::{LapRecord, PenaltyRecord, SessionRecord};

/// Logs every record as JSON and answers with fresh UUIDs.
///
/// Sessions it created are remembered so `list_sessions` behaves like the
/// real service during recovery.
#[derive(Debug, Default)]
pub struct DryRunApi {
    sessions: Mutex<Vec<RemoteSession>>,
}

impl DryRunApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn log<T: Serialize>(operation: &str, record: &T) -> Result<(), SyncError> {
        let json = serde_json::to_string(record).map_err(|e| SyncError::Transport(e.to_string()))?;
        info!(operation, bytes = json.len(), payload = %json, "dry run");
        Ok(())
    }
}

#[async_trait]
impl RemoteApi for DryRunApi {
    async fn create_session(&self, record: &SessionRecord) -> Result<ApiResponse, SyncError> {
        Self::log("create_session", record)?;
        let remote_id = Uuid::new_v4().to_string();
        self.sessions.lock().push(RemoteSession {
            remote_id: remote_id.clone(),
            session_uid: record.session_uid,
        });
        Ok(ApiResponse::created(remote_id))
    }

    async fn update_session(
        &self,
        remote_id: &str,
        record: &SessionRecord,
    ) -> Result<ApiResponse, SyncError> {
        Self::log("update_session", record)?;
        Ok(ApiResponse {
            status: 200,
            remote_id: Some(remote_id.to_string()),
        })
    }

    async fn list_sessions(&self, session_uid: u64) -> Result<Vec<RemoteSession>, SyncError> {
        Ok(self
            .sessions
            .lock()
            .iter()
            .filter(|s| s.session_uid == session_uid)
            .cloned()
            .collect())
    }

    async fn create_lap(&self, record: &LapRecord) -> Result<ApiResponse, SyncError> {
        Self::log("create_lap", record)?;
        Ok(ApiResponse::created(Uuid::new_v4().to_string()))
    }

    async fn create_penalty(&self, record: &PenaltyRecord) -> Result<ApiResponse, SyncError> {
        Self::log("create_penalty", record)?;
        Ok(ApiResponse::created(Uuid::new_v4().to_string()))
    }
}
