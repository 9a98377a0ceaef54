//! The synchronous seam between the pipeline and whatever pushes records.

use parking_lot::Mutex;
use tracing::debug;

use crate::records::{LapRecord, PenaltyRecord, SessionRecord};

/// Result of handing a record to a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncOutcome {
    /// The remote side accepted the record.
    pub success: bool,
    /// The record was handed off and its result will arrive later as a
    /// [`SyncConfirmation`]. Never set together with `success`.
    pub queued: bool,
    /// Remote identifier, when the gateway learned one synchronously.
    pub remote_id: Option<String>,
}

impl SyncOutcome {
    pub fn ok(remote_id: Option<String>) -> Self {
        Self {
            success: true,
            queued: false,
            remote_id,
        }
    }

    pub fn queued() -> Self {
        Self {
            success: false,
            queued: true,
            remote_id: None,
        }
    }

    pub fn failed() -> Self {
        Self::default()
    }
}

/// Late result for a record that was queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncConfirmation {
    Session {
        session_uid: u64,
        remote_id: Option<String>,
        success: bool,
    },
    Lap {
        session_uid: u64,
        lap_number: u8,
        success: bool,
    },
}

/// Accepts finalized records from the pipeline.
///
/// Called from the receive loop between datagrams, so implementations must
/// not block for long. Network work belongs behind [`QueuedGateway`].
///
/// [`QueuedGateway`]: crate::worker::QueuedGateway
pub trait SyncGateway: Send + Sync {
    fn sync_session(&self, record: &SessionRecord) -> SyncOutcome;
    fn sync_lap(&self, record: &LapRecord) -> SyncOutcome;
    fn sync_penalty(&self, record: &PenaltyRecord) -> SyncOutcome;

    /// Results of queued records that arrived since the last call.
    fn drain_confirmations(&self) -> Vec<SyncConfirmation> {
        Vec::new()
    }
}

/// Gateway used when syncing is disabled. Every call fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledGateway;

impl SyncGateway for DisabledGateway {
    fn sync_session(&self, record: &SessionRecord) -> SyncOutcome {
        debug!(session_uid = record.session_uid, "sync disabled, session not pushed");
        SyncOutcome::failed()
    }

    fn sync_lap(&self, record: &LapRecord) -> SyncOutcome {
        debug!(
            session_uid = record.session_uid,
            lap = record.lap_number,
            "sync disabled, lap not pushed"
        );
        SyncOutcome::failed()
    }

    fn sync_penalty(&self, record: &PenaltyRecord) -> SyncOutcome {
        debug!(session_uid = record.session_uid, "sync disabled, penalty not pushed");
        SyncOutcome::failed()
    }
}

/// A record captured by [`RecordingGateway`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedSync {
    Session(SessionRecord),
    Lap(LapRecord),
    Penalty(PenaltyRecord),
}

/// In-memory gateway that keeps every record it is given.
///
/// Session creates are answered with sequential remote ids (`session-1`,
/// `session-2`, ...) so callers can exercise the update path.
#[derive(Debug, Default)]
pub struct RecordingGateway {
    records: Mutex<Vec<RecordedSync>>,
    fail: bool,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway that records every call but reports failure.
    pub fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn records(&self) -> Vec<RecordedSync> {
        self.records.lock().clone()
    }

    pub fn laps(&self) -> Vec<LapRecord> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                RecordedSync::Lap(lap) => Some(lap.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn sessions(&self) -> Vec<SessionRecord> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                RecordedSync::Session(session) => Some(session.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn penalties(&self) -> Vec<PenaltyRecord> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| match r {
                RecordedSync::Penalty(penalty) => Some(penalty.clone()),
                _ => None,
            })
            .collect()
    }

    fn outcome(&self, remote_id: Option<String>) -> SyncOutcome {
        if self.fail {
            SyncOutcome::failed()
        } else {
            SyncOutcome::ok(remote_id)
        }
    }
}

impl SyncGateway for RecordingGateway {
    fn sync_session(&self, record: &SessionRecord) -> SyncOutcome {
        let mut records = self.records.lock();
        records.push(RecordedSync::Session(record.clone()));
        let created = records
            .iter()
            .filter(|r| matches!(r, RecordedSync::Session(_)))
            .count();
        drop(records);
        let remote_id = record
            .remote_id
            .clone()
            .unwrap_or_else(|| format!("session-{created}"));
        self.outcome(Some(remote_id))
    }

    fn sync_lap(&self, record: &LapRecord) -> SyncOutcome {
        self.records.lock().push(RecordedSync::Lap(record.clone()));
        self.outcome(None)
    }

    fn sync_penalty(&self, record: &PenaltyRecord) -> SyncOutcome {
        self.records
            .lock()
            .push(RecordedSync::Penalty(record.clone()));
        self.outcome(None)
    }
}
