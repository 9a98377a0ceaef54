//! Offloads remote sync from the receive loop.
//!
//! [`QueuedGateway`] copies each record into an unbounded channel and returns
//! at once; a single [`SyncWorker`] drains the channel in order. Because there
//! is one consumer, records for a session and its laps reach the remote
//! service in the order they were emitted.
//!
//! Each session and lap result is reported back as a [`SyncConfirmation`]
//! which the pipeline collects through [`SyncGateway::drain_confirmations`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use lapsync_errors::SyncError;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::RemoteApi;
use crate::client::SyncClient;
use crate::gateway::{SyncConfirmation, SyncGateway, SyncOutcome};
use crate::records::{LapRecord, PenaltyRecord, SessionRecord};

/// One unit of work for the worker.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncJob {
    Session(Box<SessionRecord>),
    Lap(Box<LapRecord>),
    Penalty(PenaltyRecord),
}

/// Counters reported by the worker when it stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub sessions_synced: u64,
    pub laps_synced: u64,
    pub penalties_synced: u64,
    pub failures: u64,
    pub duplicate_laps_dropped: u64,
}

/// [`SyncGateway`] that enqueues records for a [`SyncWorker`].
///
/// The outcome only says whether the record was queued. The remote result
/// comes back later through [`SyncGateway::drain_confirmations`].
#[derive(Debug, Clone)]
pub struct QueuedGateway {
    tx: mpsc::UnboundedSender<SyncJob>,
    confirmations: Arc<Mutex<Vec<SyncConfirmation>>>,
}

impl QueuedGateway {
    fn enqueue(&self, job: SyncJob) -> SyncOutcome {
        match self.tx.send(job) {
            Ok(()) => SyncOutcome::queued(),
            Err(_closed) => {
                warn!(error = %SyncError::WorkerClosed, "record dropped");
                SyncOutcome::failed()
            }
        }
    }
}

impl SyncGateway for QueuedGateway {
    fn sync_session(&self, record: &SessionRecord) -> SyncOutcome {
        self.enqueue(SyncJob::Session(Box::new(record.clone())))
    }

    fn sync_lap(&self, record: &LapRecord) -> SyncOutcome {
        self.enqueue(SyncJob::Lap(Box::new(record.clone())))
    }

    fn sync_penalty(&self, record: &PenaltyRecord) -> SyncOutcome {
        self.enqueue(SyncJob::Penalty(record.clone()))
    }

    fn drain_confirmations(&self) -> Vec<SyncConfirmation> {
        std::mem::take(&mut *self.confirmations.lock())
    }
}

/// Drains queued records through a [`SyncClient`].
#[derive(Debug)]
pub struct SyncWorker<A> {
    client: SyncClient<A>,
    rx: mpsc::UnboundedReceiver<SyncJob>,
    confirmations: Arc<Mutex<Vec<SyncConfirmation>>>,
    session_ids: HashMap<u64, String>,
    sent_laps: HashSet<(u64, u8)>,
    stats: WorkerStats,
}

impl<A: RemoteApi> SyncWorker<A> {
    /// Create a worker and the gateway that feeds it.
    pub fn new(api: A) -> (QueuedGateway, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let confirmations = Arc::new(Mutex::new(Vec::new()));
        let worker = Self {
            client: SyncClient::new(api),
            rx,
            confirmations: Arc::clone(&confirmations),
            session_ids: HashMap::new(),
            sent_laps: HashSet::new(),
            stats: WorkerStats::default(),
        };
        (QueuedGateway { tx, confirmations }, worker)
    }

    /// Process jobs until every gateway clone has been dropped.
    pub async fn run(mut self) -> WorkerStats {
        info!("sync worker started");
        while let Some(job) = self.rx.recv().await {
            self.handle(job).await;
        }
        info!(
            sessions = self.stats.sessions_synced,
            laps = self.stats.laps_synced,
            penalties = self.stats.penalties_synced,
            failures = self.stats.failures,
            "sync worker stopped"
        );
        self.stats
    }

    /// Remote id learned for a session, if any.
    pub fn session_remote_id(&self, session_uid: u64) -> Option<&str> {
        self.session_ids.get(&session_uid).map(String::as_str)
    }

    pub async fn handle(&mut self, job: SyncJob) {
        match job {
            SyncJob::Session(mut record) => {
                if record.remote_id.is_none() {
                    record.remote_id = self.session_ids.get(&record.session_uid).cloned();
                }
                let outcome = self.client.sync_session(&record).await;
                let success = outcome.success && outcome.remote_id.is_some();
                if let (true, Some(remote_id)) = (success, outcome.remote_id.as_ref()) {
                    self.session_ids.insert(record.session_uid, remote_id.clone());
                    self.stats.sessions_synced = self.stats.sessions_synced.saturating_add(1);
                } else {
                    self.stats.failures = self.stats.failures.saturating_add(1);
                }
                self.confirm(SyncConfirmation::Session {
                    session_uid: record.session_uid,
                    remote_id: outcome.remote_id,
                    success,
                });
            }
            SyncJob::Lap(mut record) => {
                let key = (record.session_uid, record.lap_number);
                if !self.sent_laps.insert(key) {
                    debug!(
                        session_uid = record.session_uid,
                        lap = record.lap_number,
                        "duplicate lap job dropped"
                    );
                    self.stats.duplicate_laps_dropped =
                        self.stats.duplicate_laps_dropped.saturating_add(1);
                    return;
                }
                if record.session_remote_id.is_none() {
                    record.session_remote_id =
                        self.session_ids.get(&record.session_uid).cloned();
                }
                let success = self.client.sync_lap(&record).await.success;
                if success {
                    self.stats.laps_synced = self.stats.laps_synced.saturating_add(1);
                } else {
                    self.stats.failures = self.stats.failures.saturating_add(1);
                }
                self.confirm(SyncConfirmation::Lap {
                    session_uid: record.session_uid,
                    lap_number: record.lap_number,
                    success,
                });
            }
            SyncJob::Penalty(mut record) => {
                if record.session_remote_id.is_none() {
                    record.session_remote_id =
                        self.session_ids.get(&record.session_uid).cloned();
                }
                if self.client.sync_penalty(&record).await.success {
                    self.stats.penalties_synced = self.stats.penalties_synced.saturating_add(1);
                } else {
                    self.stats.failures = self.stats.failures.saturating_add(1);
                }
            }
        }
    }

    fn confirm(&self, confirmation: SyncConfirmation) {
        self.confirmations.lock().push(confirmation);
    }
}
