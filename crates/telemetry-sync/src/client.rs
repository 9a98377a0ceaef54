//! Create-or-update sync against a [`RemoteApi`], with "already exists"
//! recovery for sessions.

use lapsync_errors::SyncError;
use tracing::{debug, info, warn};

use crate::api::{ApiResponse, RemoteApi, STATUS_ALREADY_EXISTS};
use crate::gateway::SyncOutcome;
use crate::records::{LapRecord, PenaltyRecord, SessionRecord};

/// Pushes records through a [`RemoteApi`].
///
/// Failures are logged and reported as unsuccessful outcomes; nothing is
/// retried.
#[derive(Debug)]
pub struct SyncClient<A> {
    api: A,
}

impl<A: RemoteApi> SyncClient<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Create the session remotely, or update it when `record.remote_id` is
    /// already known.
    pub async fn sync_session(&self, record: &SessionRecord) -> SyncOutcome {
        match self.push_session(record).await {
            Ok(remote_id) => {
                debug!(
                    session_uid = record.session_uid,
                    remote_id = %remote_id,
                    completed = record.completed,
                    "session synced"
                );
                SyncOutcome::ok(Some(remote_id))
            }
            Err(e) => {
                warn!(session_uid = record.session_uid, error = %e, "session sync failed");
                SyncOutcome::failed()
            }
        }
    }

    pub async fn sync_lap(&self, record: &LapRecord) -> SyncOutcome {
        if record.session_remote_id.is_none() && !record.is_time_trial() {
            warn!(
                session_uid = record.session_uid,
                lap = record.lap_number,
                error = %SyncError::MissingRemoteId("session"),
                "lap sync skipped"
            );
            return SyncOutcome::failed();
        }
        match self.api.create_lap(record).await {
            Ok(response) if response.is_success() => {
                info!(
                    session_uid = record.session_uid,
                    lap = record.lap_number,
                    lap_time_ms = record.lap_time_ms(),
                    "lap synced"
                );
                SyncOutcome::ok(response.remote_id)
            }
            Ok(response) => {
                warn!(
                    session_uid = record.session_uid,
                    lap = record.lap_number,
                    error = %rejected("create_lap", &response),
                    "lap sync failed"
                );
                SyncOutcome::failed()
            }
            Err(e) => {
                warn!(
                    session_uid = record.session_uid,
                    lap = record.lap_number,
                    error = %e,
                    "lap sync failed"
                );
                SyncOutcome::failed()
            }
        }
    }

    pub async fn sync_penalty(&self, record: &PenaltyRecord) -> SyncOutcome {
        match self.api.create_penalty(record).await {
            Ok(response) if response.is_success() => {
                debug!(session_uid = record.session_uid, "penalty synced");
                SyncOutcome::ok(response.remote_id)
            }
            Ok(response) => {
                warn!(
                    session_uid = record.session_uid,
                    error = %rejected("create_penalty", &response),
                    "penalty sync failed"
                );
                SyncOutcome::failed()
            }
            Err(e) => {
                warn!(session_uid = record.session_uid, error = %e, "penalty sync failed");
                SyncOutcome::failed()
            }
        }
    }

    async fn push_session(&self, record: &SessionRecord) -> Result<String, SyncError> {
        if let Some(remote_id) = record.remote_id.as_deref() {
            return self.update_session(remote_id, record).await;
        }

        let response = self.api.create_session(record).await?;
        if response.is_success() {
            return response
                .remote_id
                .ok_or(SyncError::MissingRemoteId("create_session"));
        }
        if response.status != STATUS_ALREADY_EXISTS {
            return Err(rejected("create_session", &response));
        }

        info!(
            session_uid = record.session_uid,
            "session already exists remotely, recovering"
        );
        let remote_id = self.recover_remote_id(record.session_uid).await?;
        self.update_session(&remote_id, record).await
    }

    /// Resolve the remote id of an existing session. Exactly one match is
    /// required.
    async fn recover_remote_id(&self, session_uid: u64) -> Result<String, SyncError> {
        let matches: Vec<_> = self
            .api
            .list_sessions(session_uid)
            .await?
            .into_iter()
            .filter(|s| s.session_uid == session_uid)
            .collect();
        if let [only] = matches.as_slice() {
            return Ok(only.remote_id.clone());
        }
        Err(SyncError::RecoveryFailed {
            session_uid,
            matches: matches.len(),
        })
    }

    async fn update_session(
        &self,
        remote_id: &str,
        record: &SessionRecord,
    ) -> Result<String, SyncError> {
        let response = self.api.update_session(remote_id, record).await?;
        if response.is_success() {
            Ok(response.remote_id.unwrap_or_else(|| remote_id.to_string()))
        } else {
            Err(rejected("update_session", &response))
        }
    }
}

fn rejected(operation: &'static str, response: &ApiResponse) -> SyncError {
    SyncError::Rejected {
        operation,
        status: response.status,
    }
}
