//! Integration tests for the queued gateway and sync worker.

use std::sync::Arc;

use async_trait::async_trait;
use lapsync_errors::SyncError;
use lapsync_telemetry_sync::{
    ApiResponse, DryRunApi, LapRecord, PenaltyRecord, RemoteApi, RemoteSession, SessionRecord,
    SyncConfirmation, SyncGateway, SyncWorker, TelemetrySeries, WeatherToken,
};
use parking_lot::Mutex;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    CreateSession(u64),
    UpdateSession(String),
    List(u64),
    Lap(u8, Option<String>),
    Penalty(Option<String>),
}

#[derive(Debug, Default)]
struct FakeApi {
    calls: Arc<Mutex<Vec<Call>>>,
    session_exists: bool,
    reject_laps: bool,
}

#[async_trait]
impl RemoteApi for FakeApi {
    async fn create_session(&self, record: &SessionRecord) -> Result<ApiResponse, SyncError> {
        self.calls.lock().push(Call::CreateSession(record.session_uid));
        if self.session_exists {
            Ok(ApiResponse::status(400))
        } else {
            Ok(ApiResponse::created(format!("remote-{}", record.session_uid)))
        }
    }

    async fn update_session(
        &self,
        remote_id: &str,
        _record: &SessionRecord,
    ) -> Result<ApiResponse, SyncError> {
        self.calls
            .lock()
            .push(Call::UpdateSession(remote_id.to_string()));
        Ok(ApiResponse::status(200))
    }

    async fn list_sessions(&self, session_uid: u64) -> Result<Vec<RemoteSession>, SyncError> {
        self.calls.lock().push(Call::List(session_uid));
        Ok(vec![RemoteSession {
            remote_id: "found".to_string(),
            session_uid,
        }])
    }

    async fn create_lap(&self, record: &LapRecord) -> Result<ApiResponse, SyncError> {
        self.calls.lock().push(Call::Lap(
            record.lap_number,
            record.session_remote_id.clone(),
        ));
        if self.reject_laps {
            Ok(ApiResponse::status(422))
        } else {
            Ok(ApiResponse::created("lap"))
        }
    }

    async fn create_penalty(&self, record: &PenaltyRecord) -> Result<ApiResponse, SyncError> {
        self.calls
            .lock()
            .push(Call::Penalty(record.session_remote_id.clone()));
        Ok(ApiResponse::created("penalty"))
    }
}

fn session(uid: u64, completed: bool) -> SessionRecord {
    SessionRecord {
        session_uid: uid,
        remote_id: None,
        track_id: 11,
        team_id: Some(0),
        weather: WeatherToken::Mixed,
        session_type: "race".to_string(),
        game_mode: "solo".to_string(),
        is_online: false,
        ai_difficulty: Some(80),
        laps: Vec::new(),
        penalties: None,
        classification: None,
        player_result: None,
        completed,
    }
}

fn lap(uid: u64, lap_number: u8) -> LapRecord {
    LapRecord {
        session_uid: uid,
        session_remote_id: None,
        track_id: 11,
        team_id: Some(0),
        weather: WeatherToken::Dry,
        session_type: "race".to_string(),
        game_mode: "solo".to_string(),
        lap_number,
        sector1_time_ms: 30_000,
        sector2_time_ms: 30_000,
        sector3_time_ms: 30_000,
        pit_status: 0,
        is_valid: true,
        car_position: Some(4),
        tyre_compound: Some(17),
        car_setup: None,
        tyre_wear: None,
        telemetry: TelemetrySeries::default(),
    }
}

fn penalty(uid: u64) -> PenaltyRecord {
    PenaltyRecord {
        session_uid: uid,
        session_remote_id: None,
        active_lap: Some(1),
        penalty_type: 4,
        infringement_type: 7,
        vehicle_index: 0,
        other_vehicle_index: 255,
        time: 5,
        lap_number: 1,
        places_gained: 0,
    }
}

#[tokio::test]
async fn worker_preserves_order_and_fills_remote_ids() -> TestResult {
    let api = FakeApi::default();
    let calls = Arc::clone(&api.calls);
    let (gateway, worker) = SyncWorker::new(api);
    let handle = tokio::spawn(worker.run());

    assert!(gateway.sync_session(&session(5, false)).queued);
    assert!(gateway.sync_lap(&lap(5, 1)).queued);
    assert!(gateway.sync_penalty(&penalty(5)).queued);
    assert!(!gateway.sync_session(&session(5, true)).success);
    drop(gateway);

    let stats = handle.await?;
    assert_eq!(stats.sessions_synced, 2);
    assert_eq!(stats.laps_synced, 1);
    assert_eq!(stats.penalties_synced, 1);
    assert_eq!(stats.failures, 0);

    let remote = Some("remote-5".to_string());
    assert_eq!(
        *calls.lock(),
        vec![
            Call::CreateSession(5),
            Call::Lap(1, remote.clone()),
            Call::Penalty(remote),
            Call::UpdateSession("remote-5".to_string()),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn duplicate_lap_jobs_are_dropped() -> TestResult {
    let api = FakeApi::default();
    let calls = Arc::clone(&api.calls);
    let (gateway, worker) = SyncWorker::new(api);
    let handle = tokio::spawn(worker.run());

    gateway.sync_session(&session(8, false));
    gateway.sync_lap(&lap(8, 2));
    gateway.sync_lap(&lap(8, 2));
    gateway.sync_lap(&lap(8, 3));
    drop(gateway);

    let stats = handle.await?;
    assert_eq!(stats.laps_synced, 2);
    assert_eq!(stats.duplicate_laps_dropped, 1);
    let laps = calls
        .lock()
        .iter()
        .filter(|c| matches!(c, Call::Lap(..)))
        .count();
    assert_eq!(laps, 2);
    Ok(())
}

#[tokio::test]
async fn existing_session_is_recovered() -> TestResult {
    let api = FakeApi {
        session_exists: true,
        ..FakeApi::default()
    };
    let calls = Arc::clone(&api.calls);
    let (gateway, worker) = SyncWorker::new(api);
    let handle = tokio::spawn(worker.run());

    gateway.sync_session(&session(9, false));
    gateway.sync_lap(&lap(9, 1));
    drop(gateway);

    let stats = handle.await?;
    assert_eq!(stats.sessions_synced, 1);
    assert_eq!(
        *calls.lock(),
        vec![
            Call::CreateSession(9),
            Call::List(9),
            Call::UpdateSession("found".to_string()),
            Call::Lap(1, Some("found".to_string())),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn gateway_reports_failure_once_worker_is_gone() {
    let (gateway, worker) = SyncWorker::new(FakeApi::default());
    drop(worker);
    let outcome = gateway.sync_lap(&lap(1, 1));
    assert!(!outcome.success);
    assert!(!outcome.queued);
}

#[tokio::test]
async fn remote_results_come_back_as_confirmations() -> TestResult {
    let api = FakeApi {
        reject_laps: true,
        ..FakeApi::default()
    };
    let (gateway, worker) = SyncWorker::new(api);
    let handle = tokio::spawn(worker.run());

    assert!(gateway.drain_confirmations().is_empty());
    gateway.sync_session(&session(3, false));
    gateway.sync_lap(&lap(3, 1));

    let mut confirmations = Vec::new();
    for _ in 0..200 {
        confirmations.extend(gateway.drain_confirmations());
        if confirmations.len() >= 2 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert_eq!(
        confirmations,
        vec![
            SyncConfirmation::Session {
                session_uid: 3,
                remote_id: Some("remote-3".to_string()),
                success: true,
            },
            SyncConfirmation::Lap {
                session_uid: 3,
                lap_number: 1,
                success: false,
            },
        ]
    );
    assert!(gateway.drain_confirmations().is_empty());
    drop(gateway);

    let stats = handle.await?;
    assert_eq!(stats.failures, 1);
    Ok(())
}

#[tokio::test]
async fn dry_run_api_recovers_its_own_sessions() -> TestResult {
    let api = DryRunApi::new();
    let created = api.create_session(&session(21, false)).await?;
    assert!(created.is_success());
    let listed = api.list_sessions(21).await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(Some(listed[0].remote_id.clone()), created.remote_id);
    assert!(api.list_sessions(22).await?.is_empty());
    Ok(())
}
