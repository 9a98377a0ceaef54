//! End-to-end: encoded datagrams through the router into a recording gateway.

use std::sync::Arc;

use lapsync_telemetry_packets::{
    CarStatusEntry, CarStatusPacket, CarTelemetryEntry, CarTelemetryPacket, EventDetail,
    EventPacket, FinalClassificationEntry, FinalClassificationPacket, LapDataEntry, LapDataPacket,
    LapHistoryEntry, Packet, PacketHeader, PacketKind, ParticipantEntry, ParticipantsPacket,
    ProtocolEpoch, SessionHistoryPacket, SessionPacket, SessionType,
};
use lapsync_telemetry_session::{GameVersionRouter, LapHeuristics, RouteOutcome};
use lapsync_telemetry_sync::{RecordingGateway, WeatherToken};

type TestResult = Result<(), Box<dyn std::error::Error>>;

struct Feed {
    epoch: ProtocolEpoch,
    uid: u64,
    router: GameVersionRouter,
    gateway: Arc<RecordingGateway>,
}

impl Feed {
    fn new(epoch: ProtocolEpoch, uid: u64) -> Self {
        let gateway = Arc::new(RecordingGateway::new());
        let router = GameVersionRouter::new(gateway.clone(), LapHeuristics::default());
        Self {
            epoch,
            uid,
            router,
            gateway,
        }
    }

    fn send(&mut self, frame: u32, packet: Packet) -> Result<RouteOutcome, String> {
        let header = PacketHeader::new(
            self.epoch.packet_format(),
            packet.kind().id(),
            self.uid,
            frame,
        );
        let raw = self
            .epoch
            .encode(&header, &packet)
            .ok_or_else(|| format!("{} cannot encode {}", self.epoch, packet.kind().name()))?;
        Ok(self.router.route(&raw))
    }

    fn session(&mut self, session_type: SessionType, code: u8, weather: u8) -> TestResult {
        let packet = Packet::Session(SessionPacket {
            weather,
            track_id: 5,
            session_type_code: code,
            session_type: Some(session_type),
            ..SessionPacket::default()
        });
        assert_eq!(self.send(0, packet)?, RouteOutcome::Applied(PacketKind::Session));
        Ok(())
    }

    fn participants(&mut self, team_id: u8) -> TestResult {
        let packet = Packet::Participants(ParticipantsPacket {
            num_active_cars: 1,
            entries: vec![ParticipantEntry {
                team_id,
                name: "Player".to_string(),
                ..ParticipantEntry::default()
            }],
        });
        self.send(0, packet)?;
        Ok(())
    }

    fn lap(&mut self, frame: u32, entry: LapDataEntry) -> TestResult {
        let packet = Packet::LapData(LapDataPacket {
            entries: vec![entry],
            ..LapDataPacket::default()
        });
        assert_eq!(self.send(frame, packet)?, RouteOutcome::Applied(PacketKind::LapData));
        Ok(())
    }

    fn telemetry(&mut self, frame: u32, speed_kmh: u16) -> TestResult {
        let packet = Packet::CarTelemetry(CarTelemetryPacket {
            entries: vec![CarTelemetryEntry {
                speed_kmh,
                throttle: 1.0,
                gear: 7,
                ..CarTelemetryEntry::default()
            }],
            suggested_gear: 0,
        });
        self.send(frame, packet)?;
        Ok(())
    }
}

fn entry(lap: u8, distance: f32, s1: u16, s2: u16, current_ms: u32, last_ms: u32) -> LapDataEntry {
    LapDataEntry {
        current_lap_num: lap,
        lap_distance: distance,
        sector1_time_ms: s1,
        sector2_time_ms: s2,
        current_lap_time_ms: current_ms,
        last_lap_time_ms: last_ms,
        car_position: 2,
        ..LapDataEntry::default()
    }
}

#[test]
fn race_lap_is_synced_with_derived_sector3() -> TestResult {
    for epoch in ProtocolEpoch::ALL {
        let mut feed = Feed::new(epoch, 0x5151);
        feed.session(SessionType::Race, 10, 0)?;
        feed.participants(0)?;

        feed.lap(1, entry(1, 10.0, 0, 0, 500, 0))?;
        feed.telemetry(1, 120)?;
        feed.lap(2, entry(1, 2500.0, 10_002, 0, 30_000, 0))?;
        feed.telemetry(2, 280)?;
        feed.lap(3, entry(1, 4800.0, 10_002, 20_002, 55_000, 0))?;
        feed.lap(4, entry(2, 3.0, 0, 0, 40, 60_006))?;

        let laps = feed.gateway.laps();
        assert_eq!(laps.len(), 1, "{epoch}");
        let lap = laps.first().ok_or("lap record")?;
        assert_eq!(lap.sector1_time_ms, 10_002);
        assert_eq!(lap.sector2_time_ms, 20_002);
        assert_eq!(lap.sector3_time_ms, 30_002, "{epoch}");
        assert_eq!(lap.lap_time_ms(), 60_006);
        assert_eq!(lap.car_position, Some(2));
        assert_eq!(lap.weather, WeatherToken::Dry);
        assert_eq!(lap.telemetry.frames, vec![1, 2, 3]);
        assert_eq!(lap.telemetry.speed.first().copied().flatten(), Some(120.0));
        assert_eq!(feed.gateway.sessions().len(), 1);
    }
    Ok(())
}

#[test]
fn flashback_event_rolls_back_and_accepts_replay() -> TestResult {
    let mut feed = Feed::new(ProtocolEpoch::F2022, 7);
    feed.session(SessionType::Practice1, 1, 3)?;
    feed.participants(4)?;

    for (frame, distance) in [(10u32, 100.0f32), (11, 300.0), (12, 600.0), (13, 900.0)] {
        feed.lap(frame, entry(1, distance, 0, 0, frame * 100, 0))?;
    }
    let flashback = Packet::Event(EventPacket {
        code: EventPacket::FLASHBACK,
        detail: EventDetail::Flashback {
            frame_identifier: 12,
            session_time: 1.5,
        },
    });
    assert_eq!(feed.send(14, flashback)?, RouteOutcome::Applied(PacketKind::Event));

    let lap = feed
        .router
        .session()
        .and_then(|s| s.laps.get(1))
        .ok_or("lap 1")?;
    assert_eq!(lap.telemetry.len(), 2);
    assert_eq!(lap.telemetry.last_distance(), None);

    feed.lap(12, entry(1, 50.0, 0, 0, 1_200, 0))?;
    let lap = feed
        .router
        .session()
        .and_then(|s| s.laps.get(1))
        .ok_or("lap 1")?;
    assert_eq!(lap.telemetry.frame_ids().collect::<Vec<_>>(), vec![10, 11, 12]);
    Ok(())
}

#[test]
fn session_history_backfills_and_completes_laps() -> TestResult {
    let mut feed = Feed::new(ProtocolEpoch::F2021, 99);
    feed.session(SessionType::Race, 10, 0)?;
    feed.participants(1)?;

    // lap 1 finishes without sector data ever reaching us
    feed.lap(1, entry(1, 50.0, 0, 0, 100, 0))?;
    feed.lap(2, entry(2, 10.0, 0, 0, 100, 90_000))?;
    assert!(feed.gateway.laps().is_empty());

    let mut laps = vec![LapHistoryEntry::default(); 100];
    if let Some(first) = laps.first_mut() {
        *first = LapHistoryEntry {
            lap_time_ms: 90_000,
            sector1_time_ms: 30_000,
            sector2_time_ms: 31_000,
            sector3_time_ms: 29_000,
            valid_flags: 0b1111,
        };
    }
    let history = Packet::SessionHistory(SessionHistoryPacket {
        car_idx: 0,
        num_laps: 2,
        num_tyre_stints: 1,
        best_lap_time_lap_num: 1,
        laps,
    });
    feed.send(3, history)?;

    let synced = feed.gateway.laps();
    assert_eq!(synced.len(), 1);
    assert_eq!(synced.first().map(|l| l.lap_time_ms()), Some(90_000));
    Ok(())
}

#[test]
fn final_classification_sends_completed_session() -> TestResult {
    let mut feed = Feed::new(ProtocolEpoch::F2021, 1234);
    feed.session(SessionType::Race, 10, 0)?;
    feed.session(SessionType::Race, 10, 4)?;
    feed.participants(2)?;
    let status = Packet::CarStatus(CarStatusPacket {
        entries: vec![CarStatusEntry {
            visual_tyre_compound: 17,
            ..CarStatusEntry::default()
        }],
    });

    feed.lap(1, entry(1, 10.0, 0, 0, 100, 0))?;
    feed.send(1, status)?;
    feed.lap(2, entry(1, 4900.0, 30_000, 30_000, 89_000, 0))?;

    let classification = Packet::FinalClassification(FinalClassificationPacket {
        num_cars: 1,
        entries: vec![FinalClassificationEntry {
            position: 4,
            num_laps: 1,
            grid_position: 6,
            points: 12,
            result_status: 3,
            best_lap_time_ms: 90_000,
            ..FinalClassificationEntry::default()
        }],
    });
    feed.send(3, classification.clone())?;
    feed.send(4, classification)?;

    let laps = feed.gateway.laps();
    assert_eq!(laps.len(), 1);
    assert_eq!(laps.first().and_then(|l| l.tyre_compound), Some(17));

    let sessions = feed.gateway.sessions();
    assert_eq!(sessions.len(), 2);
    let terminal = sessions.last().ok_or("terminal session")?;
    assert!(terminal.completed);
    assert_eq!(terminal.weather, WeatherToken::Mixed);
    assert_eq!(terminal.player_result.map(|r| r.finish_position), Some(4));
    assert_eq!(terminal.laps.len(), 1);
    assert!(terminal.laps.iter().all(|l| l.synced));
    Ok(())
}

#[test]
fn spectated_sessions_produce_nothing() -> TestResult {
    let mut feed = Feed::new(ProtocolEpoch::F2021, 3);
    let packet = Packet::Session(SessionPacket {
        is_spectating: true,
        session_type_code: 10,
        session_type: Some(SessionType::Race),
        ..SessionPacket::default()
    });
    feed.send(0, packet)?;
    feed.lap(1, entry(1, 10.0, 0, 0, 100, 0))?;
    assert!(feed.router.session().is_none());
    assert!(feed.gateway.records().is_empty());
    Ok(())
}
