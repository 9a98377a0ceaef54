//! Outbound records.
//!
//! Records are plain owned values copied out of live session state before they
//! cross into the sync worker, so nothing here borrows from the pipeline.

use serde::{Deserialize, Serialize};

/// Session-type token used for time trial sessions.
pub const TIME_TRIAL_TOKEN: &str = "time_trial";

/// Weather summary derived from every weather id seen during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherToken {
    Dry,
    Wet,
    Mixed,
}

impl WeatherToken {
    /// Bucket weather ids 0–2 as dry and 3–5 as wet. Unknown ids are ignored.
    ///
    /// An empty set reads as dry.
    pub fn from_weather_ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = u8>,
    {
        let mut dry = false;
        let mut wet = false;
        for id in ids {
            match id {
                0..=2 => dry = true,
                3..=5 => wet = true,
                _ => {}
            }
        }
        match (dry, wet) {
            (true, true) => WeatherToken::Mixed,
            (false, true) => WeatherToken::Wet,
            _ => WeatherToken::Dry,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WeatherToken::Dry => "dry",
            WeatherToken::Wet => "wet",
            WeatherToken::Mixed => "mixed",
        }
    }
}

/// Columnar telemetry for one lap, ordered by frame id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySeries {
    pub frames: Vec<u32>,
    pub lap_distance: Vec<Option<f64>>,
    pub lap_time: Vec<Option<f64>>,
    pub speed: Vec<Option<f64>>,
    pub brake: Vec<Option<f64>>,
    pub throttle: Vec<Option<f64>>,
    pub gear: Vec<Option<f64>>,
    pub steer: Vec<Option<f64>>,
    pub drs: Vec<Option<f64>>,
}

impl TelemetrySeries {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Player car setup at the time the lap was driven.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarSetupSnapshot {
    pub front_wing: u8,
    pub rear_wing: u8,
    pub on_throttle: u8,
    pub off_throttle: u8,
    pub front_camber: f32,
    pub rear_camber: f32,
    pub front_toe: f32,
    pub rear_toe: f32,
    pub front_suspension: u8,
    pub rear_suspension: u8,
    pub front_anti_roll_bar: u8,
    pub rear_anti_roll_bar: u8,
    pub front_suspension_height: u8,
    pub rear_suspension_height: u8,
    pub brake_pressure: u8,
    pub brake_bias: u8,
    pub rear_left_tyre_pressure: f32,
    pub rear_right_tyre_pressure: f32,
    pub front_left_tyre_pressure: f32,
    pub front_right_tyre_pressure: f32,
    pub ballast: u8,
    pub fuel_load: f32,
}

/// A finished lap ready to be pushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapRecord {
    pub session_uid: u64,
    /// Filled in by the sync worker when the session is already known remotely.
    pub session_remote_id: Option<String>,
    pub track_id: i8,
    pub team_id: Option<u8>,
    pub weather: WeatherToken,
    pub session_type: String,
    pub game_mode: String,
    pub lap_number: u8,
    pub sector1_time_ms: u32,
    pub sector2_time_ms: u32,
    pub sector3_time_ms: u32,
    pub pit_status: u8,
    pub is_valid: bool,
    pub car_position: Option<u8>,
    pub tyre_compound: Option<u8>,
    pub car_setup: Option<CarSetupSnapshot>,
    /// Percent, `[RL, RR, FL, FR]`.
    pub tyre_wear: Option<[f32; 4]>,
    pub telemetry: TelemetrySeries,
}

impl LapRecord {
    pub fn lap_time_ms(&self) -> u32 {
        self.sector1_time_ms
            .saturating_add(self.sector2_time_ms)
            .saturating_add(self.sector3_time_ms)
    }

    pub fn is_time_trial(&self) -> bool {
        self.session_type == TIME_TRIAL_TOKEN
    }
}

/// Summary of one lap inside a session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LapSummary {
    pub lap_number: u8,
    pub sector1_time_ms: Option<u32>,
    pub sector2_time_ms: Option<u32>,
    pub sector3_time_ms: Option<u32>,
    pub pit_status: u8,
    pub is_valid: bool,
    pub synced: bool,
}

/// One participant's final classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    /// Car slot in the packet's per-car arrays, shared with the participants
    /// list of the same session. Not a driver identity; use `driver_id`.
    pub driver_index: u8,
    pub driver_id: u8,
    pub team_id: u8,
    pub race_number: u8,
    pub nationality: u8,
    pub name: String,
    pub is_ai: bool,
    pub position: u8,
    pub grid_position: u8,
    pub num_laps: u8,
    pub points: u8,
    pub result_status: u8,
    pub best_lap_time_ms: u32,
}

/// The local player's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerResult {
    pub finish_position: u8,
    pub result_status: u8,
    pub points: u8,
}

/// A session create or update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_uid: u64,
    pub remote_id: Option<String>,
    pub track_id: i8,
    pub team_id: Option<u8>,
    pub weather: WeatherToken,
    pub session_type: String,
    pub game_mode: String,
    pub is_online: bool,
    pub ai_difficulty: Option<u8>,
    pub laps: Vec<LapSummary>,
    pub penalties: Option<Vec<PenaltyRecord>>,
    pub classification: Option<Vec<ClassificationRecord>>,
    pub player_result: Option<PlayerResult>,
    /// Set on the terminal sync sent after final classification.
    pub completed: bool,
}

/// A penalty applied to the local player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyRecord {
    pub session_uid: u64,
    pub session_remote_id: Option<String>,
    /// Lap the player was on when the penalty arrived.
    pub active_lap: Option<u8>,
    pub penalty_type: u8,
    pub infringement_type: u8,
    pub vehicle_index: u8,
    pub other_vehicle_index: u8,
    /// Seconds; 255 when not applicable.
    pub time: u8,
    pub lap_number: u8,
    pub places_gained: u8,
}
