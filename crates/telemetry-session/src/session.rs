//! The live session aggregate and the records built from it.

use std::collections::BTreeSet;

use lapsync_telemetry_packets::{
    FinalClassificationPacket, ParticipantEntry, SessionCategory, SessionPacket, SessionType,
};
use lapsync_telemetry_sync::{
    ClassificationRecord, LapRecord, PenaltyRecord, PlayerResult, SessionRecord,
    TIME_TRIAL_TOKEN, WeatherToken,
};

use crate::heuristics::LapHeuristics;
use crate::lap_machine::LapStateMachine;

/// Game-mode token for sessions played over the network.
pub const MULTIPLAYER_TOKEN: &str = "multiplayer";
/// Game-mode token for offline sessions other than time trial.
pub const SOLO_TOKEN: &str = "solo";
/// Session-type token when the game never reported one.
pub const UNKNOWN_SESSION_TOKEN: &str = "unknown";

/// One game session, identified by its UID.
#[derive(Debug, Clone)]
pub struct Session {
    pub uid: u64,
    pub track_id: i8,
    pub session_type: Option<SessionType>,
    /// Every weather id reported during the session.
    pub weather_ids: BTreeSet<u8>,
    /// The player's team. Set once; 0 is a real team.
    pub team_id: Option<u8>,
    pub participants: Vec<ParticipantEntry>,
    pub is_online: bool,
    pub ai_difficulty: Option<u8>,
    pub classification: Option<Vec<ClassificationRecord>>,
    pub player_result: Option<PlayerResult>,
    /// Assigned by the gateway on the first successful create.
    pub remote_id: Option<String>,
    pub penalties: Vec<PenaltyRecord>,
    pub completed: bool,
    pub laps: LapStateMachine,
    pub(crate) session_sync_attempted: bool,
}

impl Session {
    pub fn from_packet(uid: u64, packet: &SessionPacket, heuristics: LapHeuristics) -> Self {
        Self {
            uid,
            track_id: packet.track_id,
            session_type: packet.session_type,
            weather_ids: BTreeSet::from([packet.weather]),
            team_id: None,
            participants: Vec::new(),
            is_online: packet.network_game,
            ai_difficulty: packet.ai_difficulty,
            classification: None,
            player_result: None,
            remote_id: None,
            penalties: Vec::new(),
            completed: false,
            laps: LapStateMachine::new(heuristics),
            session_sync_attempted: false,
        }
    }

    /// Fold a repeated session packet for the same UID into this session.
    pub fn absorb(&mut self, packet: &SessionPacket) {
        self.weather_ids.insert(packet.weather);
        if self.session_type.is_none() {
            self.session_type = packet.session_type;
        }
    }

    pub fn category(&self) -> Option<SessionCategory> {
        self.session_type.map(SessionType::category)
    }

    pub fn is_time_trial(&self) -> bool {
        self.session_type.is_some_and(SessionType::is_time_trial)
    }

    /// Session type and team are both known.
    pub fn is_valid_for_sync(&self) -> bool {
        self.session_type.is_some() && self.team_id.is_some()
    }

    pub fn weather(&self) -> WeatherToken {
        WeatherToken::from_weather_ids(self.weather_ids.iter().copied())
    }

    pub fn session_type_token(&self) -> &'static str {
        self.session_type
            .map_or(UNKNOWN_SESSION_TOKEN, SessionType::token)
    }

    pub fn game_mode_token(&self) -> &'static str {
        if self.is_time_trial() {
            TIME_TRIAL_TOKEN
        } else if self.is_online {
            MULTIPLAYER_TOKEN
        } else {
            SOLO_TOKEN
        }
    }

    /// Replace the participant list. The player's team is taken from the
    /// first list that has an entry at `player_index`.
    pub fn set_participants(&mut self, entries: Vec<ParticipantEntry>, player_index: usize) {
        if self.team_id.is_none() {
            self.team_id = entries.get(player_index).map(|p| p.team_id);
        }
        self.participants = entries;
    }

    /// Record the final standings. Returns `false` when the player index
    /// does not address a classification entry.
    pub fn apply_final_classification(
        &mut self,
        packet: &FinalClassificationPacket,
        player_index: usize,
    ) -> bool {
        let classified = usize::from(packet.num_cars).min(packet.entries.len());
        let records = packet
            .entries
            .iter()
            .take(classified)
            .zip(0u8..)
            .map(|(entry, index)| {
                let participant = self.participants.get(usize::from(index));
                ClassificationRecord {
                    driver_index: index,
                    driver_id: participant.map_or(0, |p| p.driver_id),
                    team_id: participant.map_or(0, |p| p.team_id),
                    race_number: participant.map_or(0, |p| p.race_number),
                    nationality: participant.map_or(0, |p| p.nationality),
                    name: participant.map(|p| p.name.clone()).unwrap_or_default(),
                    is_ai: participant.is_some_and(|p| p.ai_controlled),
                    position: entry.position,
                    grid_position: entry.grid_position,
                    num_laps: entry.num_laps,
                    points: entry.points,
                    result_status: entry.result_status,
                    best_lap_time_ms: entry.best_lap_time_ms,
                }
            })
            .collect();
        self.classification = Some(records);

        let Some(player) = packet.entries.get(player_index) else {
            return false;
        };
        self.player_result = Some(PlayerResult {
            finish_position: player.position,
            result_status: player.result_status,
            points: player.points,
        });
        true
    }

    /// Outbound record for a fully timed lap.
    pub fn lap_record(&self, lap_number: u8) -> Option<LapRecord> {
        let lap = self.laps.get(lap_number)?;
        Some(LapRecord {
            session_uid: self.uid,
            session_remote_id: self.remote_id.clone(),
            track_id: self.track_id,
            team_id: self.team_id,
            weather: self.weather(),
            session_type: self.session_type_token().to_string(),
            game_mode: self.game_mode_token().to_string(),
            lap_number,
            sector1_time_ms: lap.sector1_time_ms?,
            sector2_time_ms: lap.sector2_time_ms?,
            sector3_time_ms: lap.sector3_time_ms?,
            pit_status: lap.pit_status,
            is_valid: lap.is_valid,
            car_position: lap.car_position,
            tyre_compound: lap.tyre_compound,
            car_setup: lap.car_setup.clone(),
            tyre_wear: lap.tyre_wear,
            telemetry: lap.telemetry.to_series(),
        })
    }

    pub fn session_record(&self) -> SessionRecord {
        SessionRecord {
            session_uid: self.uid,
            remote_id: self.remote_id.clone(),
            track_id: self.track_id,
            team_id: self.team_id,
            weather: self.weather(),
            session_type: self.session_type_token().to_string(),
            game_mode: self.game_mode_token().to_string(),
            is_online: self.is_online,
            ai_difficulty: self.ai_difficulty,
            laps: self.laps.laps().map(|lap| lap.summary()).collect(),
            penalties: (!self.penalties.is_empty()).then(|| self.penalties.clone()),
            classification: self.classification.clone(),
            player_result: self.player_result,
            completed: self.completed,
        }
    }
}
