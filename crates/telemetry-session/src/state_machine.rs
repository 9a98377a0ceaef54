//! Applies decoded packets to the one live session and pushes finished work
//! through the sync gateway.

use std::sync::Arc;

use lapsync_errors::{DecodeError, DecodeResult};
use lapsync_telemetry_packets::{
    CarSetupEntry, EventDetail, EventPacket, FinalClassificationPacket, Packet, PacketHeader,
    ProtocolEpoch, SessionHistoryPacket, SessionPacket,
};
use lapsync_telemetry_sync::{CarSetupSnapshot, SyncConfirmation, SyncGateway};
use tracing::{debug, info, trace, warn};

use crate::frame::TelemetryFrame;
use crate::heuristics::LapHeuristics;
use crate::penalty::record_penalty;
use crate::session::Session;

#[derive(Debug, Default)]
pub enum SessionState {
    #[default]
    NoSession,
    Active(Box<Session>),
}

pub struct SessionStateMachine {
    epoch: ProtocolEpoch,
    state: SessionState,
    gateway: Arc<dyn SyncGateway>,
    heuristics: LapHeuristics,
}

impl std::fmt::Debug for SessionStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStateMachine")
            .field("epoch", &self.epoch)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

fn player_entry<T>(entries: &[T], index: usize) -> DecodeResult<&T> {
    entries
        .get(index)
        .ok_or(DecodeError::CarIndexOutOfRange {
            index,
            max: entries.len().saturating_sub(1),
        })
}

fn setup_snapshot(entry: &CarSetupEntry) -> CarSetupSnapshot {
    CarSetupSnapshot {
        front_wing: entry.front_wing,
        rear_wing: entry.rear_wing,
        on_throttle: entry.on_throttle,
        off_throttle: entry.off_throttle,
        front_camber: entry.front_camber,
        rear_camber: entry.rear_camber,
        front_toe: entry.front_toe,
        rear_toe: entry.rear_toe,
        front_suspension: entry.front_suspension,
        rear_suspension: entry.rear_suspension,
        front_anti_roll_bar: entry.front_anti_roll_bar,
        rear_anti_roll_bar: entry.rear_anti_roll_bar,
        front_suspension_height: entry.front_suspension_height,
        rear_suspension_height: entry.rear_suspension_height,
        brake_pressure: entry.brake_pressure,
        brake_bias: entry.brake_bias,
        rear_left_tyre_pressure: entry.rear_left_tyre_pressure,
        rear_right_tyre_pressure: entry.rear_right_tyre_pressure,
        front_left_tyre_pressure: entry.front_left_tyre_pressure,
        front_right_tyre_pressure: entry.front_right_tyre_pressure,
        ballast: entry.ballast,
        fuel_load: entry.fuel_load,
    }
}

/// Create the session remotely the first time it is needed.
fn ensure_remote_session(gateway: &dyn SyncGateway, session: &mut Session) {
    if session.session_sync_attempted {
        return;
    }
    session.session_sync_attempted = true;
    let outcome = gateway.sync_session(&session.session_record());
    if let Some(remote_id) = outcome.remote_id {
        session.remote_id = Some(remote_id);
    }
    if outcome.queued {
        debug!(session_uid = session.uid, "session create queued");
    } else if !outcome.success {
        warn!(session_uid = session.uid, "session create was not accepted");
    }
}

/// Apply late results for records the gateway queued earlier.
///
/// A lap only becomes synced here or on an immediate success; a rejected
/// lap stays unsynced and is not retried.
fn apply_confirmations(gateway: &dyn SyncGateway, session: &mut Session) {
    for confirmation in gateway.drain_confirmations() {
        match confirmation {
            SyncConfirmation::Session {
                session_uid,
                remote_id,
                success,
            } if session_uid == session.uid => {
                if success {
                    if let Some(remote_id) = remote_id {
                        session.remote_id = Some(remote_id);
                    }
                } else {
                    warn!(session_uid, "session sync was not accepted");
                }
            }
            SyncConfirmation::Lap {
                session_uid,
                lap_number,
                success,
            } if session_uid == session.uid => {
                let Some(lap) = session.laps.get_mut(lap_number) else {
                    continue;
                };
                if success {
                    lap.mark_synced();
                    debug!(session_uid, lap = lap_number, "lap sync confirmed");
                } else {
                    warn!(session_uid, lap = lap_number, "lap sync failed");
                }
            }
            other => trace!(?other, "confirmation for another session"),
        }
    }
}

/// Push every syncable lap. Each lap gets exactly one attempt.
fn sync_pending_laps(gateway: &dyn SyncGateway, session: &mut Session) -> usize {
    let pending = session.laps.syncable_laps();
    if pending.is_empty() {
        return 0;
    }
    if !session.is_time_trial() {
        if !session.is_valid_for_sync() {
            debug!(
                session_uid = session.uid,
                pending = pending.len(),
                "session type or team unknown, laps held back"
            );
            return 0;
        }
        ensure_remote_session(gateway, session);
    }

    let mut synced = 0;
    for lap_number in pending {
        let Some(record) = session.lap_record(lap_number) else {
            continue;
        };
        let outcome = gateway.sync_lap(&record);
        let Some(lap) = session.laps.get_mut(lap_number) else {
            continue;
        };
        lap.mark_sync_attempted();
        if outcome.success {
            lap.mark_synced();
            synced += 1;
        } else if outcome.queued {
            trace!(session_uid = session.uid, lap = lap_number, "lap sync queued");
        } else {
            warn!(session_uid = session.uid, lap = lap_number, "lap sync failed");
        }
    }
    synced
}

impl SessionStateMachine {
    pub fn new(
        epoch: ProtocolEpoch,
        gateway: Arc<dyn SyncGateway>,
        heuristics: LapHeuristics,
    ) -> Self {
        Self {
            epoch,
            state: SessionState::NoSession,
            gateway,
            heuristics,
        }
    }

    pub fn epoch(&self) -> ProtocolEpoch {
        self.epoch
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            SessionState::Active(session) => Some(session),
            SessionState::NoSession => None,
        }
    }

    /// Apply one decoded packet.
    ///
    /// Packets other than Session are ignored until a session exists, and
    /// when their UID does not match it. An out-of-range player index leaves
    /// state untouched and is reported as an error.
    pub fn apply(&mut self, header: &PacketHeader, packet: &Packet) -> DecodeResult<()> {
        if let Packet::Session(p) = packet {
            self.on_session(header, p);
            return Ok(());
        }

        let SessionState::Active(session) = &mut self.state else {
            trace!(kind = packet.kind().name(), "no session, packet ignored");
            return Ok(());
        };
        if session.uid != header.session_uid {
            trace!(
                kind = packet.kind().name(),
                packet_uid = header.session_uid,
                session_uid = session.uid,
                "packet for another session ignored"
            );
            return Ok(());
        }
        let gateway = self.gateway.as_ref();
        apply_confirmations(gateway, session);
        let player = header.player_index();
        let frame_id = header.frame_identifier;

        match packet {
            Packet::Session(_) => {}
            Packet::Participants(p) => {
                player_entry(&p.entries, player)?;
                session.set_participants(p.entries.clone(), player);
            }
            Packet::LapData(p) => {
                let entry = player_entry(&p.entries, player)?;
                let category = session.category();
                let update = session.laps.apply_lap_data(entry, frame_id, category);
                if update.finished_lap.is_some() {
                    sync_pending_laps(gateway, session);
                }
            }
            Packet::CarTelemetry(p) => {
                let e = player_entry(&p.entries, player)?;
                let frame = TelemetryFrame::from_car_telemetry(
                    e.speed_kmh,
                    e.throttle,
                    e.brake,
                    e.steer,
                    e.gear,
                    e.drs,
                );
                session.laps.record_car_telemetry(frame_id, &frame);
            }
            Packet::CarSetups(p) => {
                let entry = player_entry(&p.entries, player)?;
                if let Some(lap) = session.laps.current_lap_mut() {
                    lap.car_setup = Some(setup_snapshot(entry));
                }
            }
            Packet::CarStatus(p) => {
                let entry = player_entry(&p.entries, player)?;
                if let Some(lap) = session.laps.current_lap_mut() {
                    lap.tyre_compound = Some(entry.visual_tyre_compound);
                }
            }
            Packet::CarDamage(p) => {
                let entry = player_entry(&p.entries, player)?;
                if let Some(lap) = session.laps.current_lap_mut() {
                    lap.tyre_wear = Some(entry.tyres_wear);
                }
            }
            Packet::SessionHistory(p) => on_history(gateway, session, p, player),
            Packet::Event(p) => on_event(gateway, session, p, header.player_car_index),
            Packet::FinalClassification(p) => {
                on_final_classification(gateway, session, p, player)
            }
        }
        Ok(())
    }

    fn on_session(&mut self, header: &PacketHeader, packet: &SessionPacket) {
        if packet.is_spectating {
            trace!(session_uid = header.session_uid, "spectating, session packet ignored");
            return;
        }
        if let SessionState::Active(session) = &mut self.state {
            if session.uid == header.session_uid {
                session.absorb(packet);
                return;
            }
            info!(
                old_uid = session.uid,
                new_uid = header.session_uid,
                "session replaced"
            );
        }
        let session = Session::from_packet(header.session_uid, packet, self.heuristics);
        info!(
            session_uid = session.uid,
            epoch = %self.epoch,
            track_id = session.track_id,
            session_type = session.session_type_token(),
            online = session.is_online,
            "session started"
        );
        self.state = SessionState::Active(Box::new(session));
    }
}

fn on_history(
    gateway: &dyn SyncGateway,
    session: &mut Session,
    packet: &SessionHistoryPacket,
    player: usize,
) {
    if usize::from(packet.car_idx) != player {
        return;
    }
    let category = session.category();
    let limit = usize::from(packet.num_laps).min(packet.laps.len());
    let history = packet.laps.get(..limit).unwrap_or_default();
    if session.laps.apply_history(history, category) > 0 {
        sync_pending_laps(gateway, session);
    }
}

fn on_event(
    gateway: &dyn SyncGateway,
    session: &mut Session,
    packet: &EventPacket,
    player_car_index: u8,
) {
    match &packet.detail {
        EventDetail::Penalty(event) => {
            let Some(record) = record_penalty(session, player_car_index, event) else {
                trace!(vehicle = event.vehicle_idx, "penalty for another car");
                return;
            };
            info!(
                session_uid = session.uid,
                penalty_type = event.penalty_type,
                infringement_type = event.infringement_type,
                lap = event.lap_num,
                "penalty recorded"
            );
            let outcome = gateway.sync_penalty(&record);
            if !outcome.success && !outcome.queued {
                warn!(session_uid = session.uid, "penalty sync failed");
            }
            session.penalties.push(record);
        }
        EventDetail::Flashback {
            frame_identifier, ..
        } => {
            let removed = session.laps.flashback(*frame_identifier);
            debug!(
                frame = frame_identifier,
                removed, "flashback, telemetry rolled back"
            );
        }
        _ => trace!(code = %packet.code_str(), "event"),
    }
}

fn on_final_classification(
    gateway: &dyn SyncGateway,
    session: &mut Session,
    packet: &FinalClassificationPacket,
    player: usize,
) {
    if session.completed {
        debug!(session_uid = session.uid, "session already complete, classification ignored");
        return;
    }
    if !session.apply_final_classification(packet, player) {
        warn!(
            session_uid = session.uid,
            player, "player missing from final classification"
        );
    }
    session.laps.finalize_current();
    sync_pending_laps(gateway, session);
    session.completed = true;

    if session.is_time_trial() {
        info!(session_uid = session.uid, "time trial complete");
        return;
    }
    if !session.is_valid_for_sync() {
        warn!(session_uid = session.uid, "session complete but not valid for sync");
        return;
    }
    session.session_sync_attempted = true;
    let outcome = gateway.sync_session(&session.session_record());
    if let Some(remote_id) = outcome.remote_id {
        session.remote_id = Some(remote_id);
    }
    info!(
        session_uid = session.uid,
        success = outcome.success,
        queued = outcome.queued,
        position = session.player_result.map(|r| r.finish_position),
        "session complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapsync_telemetry_packets::{
        FinalClassificationEntry, LapDataEntry, LapDataPacket, ParticipantEntry,
        ParticipantsPacket, PenaltyEvent, SessionType,
    };
    use lapsync_telemetry_sync::{RecordedSync, RecordingGateway};

    const UID: u64 = 0xABCD;

    fn header(packet_id: u8, uid: u64, frame: u32) -> PacketHeader {
        PacketHeader::new(2021, packet_id, uid, frame).with_player(1)
    }

    fn session_packet(session_type: SessionType, weather: u8) -> Packet {
        Packet::Session(SessionPacket {
            weather,
            track_id: 10,
            session_type: Some(session_type),
            ..SessionPacket::default()
        })
    }

    fn participants(team_id: u8) -> Packet {
        Packet::Participants(ParticipantsPacket {
            num_active_cars: 2,
            entries: vec![
                ParticipantEntry::default(),
                ParticipantEntry {
                    team_id,
                    name: "PLAYER".to_string(),
                    ..ParticipantEntry::default()
                },
            ],
        })
    }

    fn lap_data(lap: u8, distance: f32, s1: u16, s2: u16, time_ms: u32, last_ms: u32) -> Packet {
        let player = LapDataEntry {
            current_lap_num: lap,
            lap_distance: distance,
            sector1_time_ms: s1,
            sector2_time_ms: s2,
            current_lap_time_ms: time_ms,
            last_lap_time_ms: last_ms,
            car_position: 3,
            ..LapDataEntry::default()
        };
        Packet::LapData(LapDataPacket {
            entries: vec![LapDataEntry::default(), player],
            ..LapDataPacket::default()
        })
    }

    fn machine() -> (Arc<RecordingGateway>, SessionStateMachine) {
        let gateway = Arc::new(RecordingGateway::new());
        let sm = SessionStateMachine::new(
            ProtocolEpoch::F2021,
            gateway.clone(),
            LapHeuristics::default(),
        );
        (gateway, sm)
    }

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn drive_one_lap(sm: &mut SessionStateMachine, uid: u64) -> TestResult {
        sm.apply(&header(2, uid, 10), &lap_data(1, 100.0, 0, 0, 2_000, 0))?;
        sm.apply(&header(2, uid, 20), &lap_data(1, 4000.0, 10_002, 20_002, 50_000, 0))?;
        sm.apply(&header(2, uid, 30), &lap_data(2, 10.0, 0, 0, 100, 60_006))?;
        Ok(())
    }

    #[test]
    fn spectating_never_creates_a_session() -> TestResult {
        let (_, mut sm) = machine();
        let packet = Packet::Session(SessionPacket {
            is_spectating: true,
            session_type: Some(SessionType::Race),
            ..SessionPacket::default()
        });
        sm.apply(&header(1, UID, 1), &packet)?;
        assert!(matches!(sm.state(), SessionState::NoSession));
        Ok(())
    }

    #[test]
    fn new_uid_replaces_session() -> TestResult {
        let (_, mut sm) = machine();
        sm.apply(&header(1, UID, 1), &session_packet(SessionType::Race, 0))?;
        sm.apply(&header(1, UID, 2), &session_packet(SessionType::Race, 3))?;
        assert_eq!(sm.session().map(|s| s.weather_ids.len()), Some(2));

        sm.apply(&header(1, UID + 1, 3), &session_packet(SessionType::Practice1, 5))?;
        let session = sm.session();
        assert_eq!(session.map(|s| s.uid), Some(UID + 1));
        assert_eq!(session.map(|s| s.weather_ids.len()), Some(1));
        Ok(())
    }

    #[test]
    fn packets_without_matching_session_are_ignored() -> TestResult {
        let (_, mut sm) = machine();
        sm.apply(&header(4, UID, 1), &participants(2))?;
        assert!(sm.session().is_none());

        sm.apply(&header(1, UID, 2), &session_packet(SessionType::Race, 0))?;
        sm.apply(&header(4, UID + 7, 3), &participants(2))?;
        assert_eq!(sm.session().and_then(|s| s.team_id), None);
        Ok(())
    }

    #[test]
    fn out_of_range_player_is_an_error() -> TestResult {
        let (_, mut sm) = machine();
        sm.apply(&header(1, UID, 1), &session_packet(SessionType::Race, 0))?;
        let short = Packet::LapData(LapDataPacket::default());
        let result = sm.apply(&header(2, UID, 2), &short);
        assert!(matches!(
            result,
            Err(DecodeError::CarIndexOutOfRange { index: 1, .. })
        ));
        assert_eq!(sm.session().map(|s| s.laps.len()), Some(0));
        Ok(())
    }

    #[test]
    fn finished_lap_creates_session_then_syncs_lap() -> TestResult {
        let (gateway, mut sm) = machine();
        sm.apply(&header(1, UID, 1), &session_packet(SessionType::Race, 0))?;
        sm.apply(&header(4, UID, 2), &participants(0))?;
        drive_one_lap(&mut sm, UID)?;

        let records = gateway.records();
        assert_eq!(records.len(), 2);
        assert!(matches!(records.first(), Some(RecordedSync::Session(_))));
        let laps = gateway.laps();
        let lap = laps.first().ok_or("no lap synced")?;
        assert_eq!(lap.sector3_time_ms, 30_002);
        assert_eq!(lap.session_remote_id.as_deref(), Some("session-1"));
        assert_eq!(lap.team_id, Some(0));
        assert_eq!(lap.game_mode, "solo");

        let session = sm.session().ok_or("no session")?;
        assert_eq!(session.remote_id.as_deref(), Some("session-1"));
        assert!(session.laps.get(1).is_some_and(|l| l.is_synced()));
        Ok(())
    }

    #[test]
    fn laps_wait_for_team() -> TestResult {
        let (gateway, mut sm) = machine();
        sm.apply(&header(1, UID, 1), &session_packet(SessionType::Race, 0))?;
        drive_one_lap(&mut sm, UID)?;
        assert!(gateway.records().is_empty());
        Ok(())
    }

    #[test]
    fn time_trial_syncs_laps_only() -> TestResult {
        let (gateway, mut sm) = machine();
        sm.apply(&header(1, UID, 1), &session_packet(SessionType::TimeTrial, 0))?;
        drive_one_lap(&mut sm, UID)?;
        assert!(gateway.sessions().is_empty());
        let laps = gateway.laps();
        assert_eq!(laps.len(), 1);
        assert_eq!(laps.first().map(|l| l.session_type.as_str()), Some("time_trial"));
        Ok(())
    }

    #[test]
    fn failed_lap_sync_is_not_retried() -> TestResult {
        let gateway = Arc::new(RecordingGateway::failing());
        let mut sm = SessionStateMachine::new(
            ProtocolEpoch::F2021,
            gateway.clone(),
            LapHeuristics::default(),
        );
        sm.apply(&header(1, UID, 1), &session_packet(SessionType::TimeTrial, 0))?;
        drive_one_lap(&mut sm, UID)?;
        sm.apply(&header(2, UID, 40), &lap_data(3, 10.0, 0, 0, 100, 0))?;
        assert_eq!(gateway.laps().len(), 1);
        let lap = sm.session().and_then(|s| s.laps.get(1)).ok_or("lap 1 missing")?;
        assert!(!lap.is_synced());
        assert!(lap.sync_attempted());
        Ok(())
    }

    #[test]
    fn player_penalty_is_forwarded_and_kept() -> TestResult {
        let (gateway, mut sm) = machine();
        sm.apply(&header(1, UID, 1), &session_packet(SessionType::Race, 0))?;
        let penalty = |vehicle_idx| {
            Packet::Event(EventPacket {
                code: EventPacket::PENALTY,
                detail: EventDetail::Penalty(PenaltyEvent {
                    penalty_type: 4,
                    infringement_type: 7,
                    vehicle_idx,
                    other_vehicle_idx: 255,
                    time: 5,
                    lap_num: 1,
                    places_gained: 0,
                }),
            })
        };
        sm.apply(&header(3, UID, 2), &penalty(0))?;
        sm.apply(&header(3, UID, 3), &penalty(1))?;
        assert_eq!(gateway.penalties().len(), 1);
        assert_eq!(sm.session().map(|s| s.penalties.len()), Some(1));
        Ok(())
    }

    #[test]
    fn final_classification_syncs_once() -> TestResult {
        let (gateway, mut sm) = machine();
        sm.apply(&header(1, UID, 1), &session_packet(SessionType::Race, 4))?;
        sm.apply(&header(4, UID, 2), &participants(5))?;
        drive_one_lap(&mut sm, UID)?;
        sm.apply(&header(2, UID, 40), &lap_data(2, 4000.0, 10_000, 20_000, 59_000, 60_006))?;

        let classification = Packet::FinalClassification(FinalClassificationPacket {
            num_cars: 2,
            entries: vec![
                FinalClassificationEntry::default(),
                FinalClassificationEntry {
                    position: 1,
                    points: 25,
                    result_status: 3,
                    ..FinalClassificationEntry::default()
                },
            ],
        });
        sm.apply(&header(8, UID, 50), &classification)?;
        sm.apply(&header(8, UID, 51), &classification)?;

        let sessions = gateway.sessions();
        assert_eq!(sessions.len(), 2);
        let terminal = sessions.last().ok_or("no terminal sync")?;
        assert!(terminal.completed);
        assert_eq!(terminal.remote_id.as_deref(), Some("session-1"));
        assert_eq!(terminal.player_result.map(|r| r.points), Some(25));
        assert_eq!(terminal.classification.as_ref().map(Vec::len), Some(2));
        assert_eq!(gateway.laps().len(), 2);
        Ok(())
    }
}
