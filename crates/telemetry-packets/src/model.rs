//! Epoch-neutral packet records.
//!
//! Each protocol epoch decodes its own byte layout into these plain structs.
//! Only the fields the pipeline consumes are kept, and units are normalized
//! (lap and sector times in milliseconds regardless of how the epoch sends
//! them).

/// Number of entries in every per-car array.
pub const NUM_CARS: usize = 22;

/// Packet kinds consumed by at least one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Session,
    LapData,
    Event,
    Participants,
    CarSetups,
    CarTelemetry,
    CarStatus,
    FinalClassification,
    CarDamage,
    SessionHistory,
}

impl PacketKind {
    /// Map a header packet id to a kind. Ids 0 (motion) and 9 (lobby info)
    /// are not consumed.
    pub fn from_id(packet_id: u8) -> Option<Self> {
        match packet_id {
            1 => Some(PacketKind::Session),
            2 => Some(PacketKind::LapData),
            3 => Some(PacketKind::Event),
            4 => Some(PacketKind::Participants),
            5 => Some(PacketKind::CarSetups),
            6 => Some(PacketKind::CarTelemetry),
            7 => Some(PacketKind::CarStatus),
            8 => Some(PacketKind::FinalClassification),
            10 => Some(PacketKind::CarDamage),
            11 => Some(PacketKind::SessionHistory),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        match self {
            PacketKind::Session => 1,
            PacketKind::LapData => 2,
            PacketKind::Event => 3,
            PacketKind::Participants => 4,
            PacketKind::CarSetups => 5,
            PacketKind::CarTelemetry => 6,
            PacketKind::CarStatus => 7,
            PacketKind::FinalClassification => 8,
            PacketKind::CarDamage => 10,
            PacketKind::SessionHistory => 11,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PacketKind::Session => "session",
            PacketKind::LapData => "lap data",
            PacketKind::Event => "event",
            PacketKind::Participants => "participants",
            PacketKind::CarSetups => "car setups",
            PacketKind::CarTelemetry => "car telemetry",
            PacketKind::CarStatus => "car status",
            PacketKind::FinalClassification => "final classification",
            PacketKind::CarDamage => "car damage",
            PacketKind::SessionHistory => "session history",
        }
    }
}

/// Session type, decoded from the epoch-specific session type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionType {
    Practice1,
    Practice2,
    Practice3,
    PracticeShort,
    Qualifying1,
    Qualifying2,
    Qualifying3,
    QualifyingShort,
    OneShotQualifying,
    Race,
    Race2,
    Race3,
    TimeTrial,
}

/// Session categories that drive in/out-lap handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionCategory {
    Practice,
    /// Multi-segment qualifying (Q1/Q2/Q3 and short qualifying).
    Qualifying,
    OneShotQualifying,
    Race,
    TimeTrial,
}

impl SessionType {
    pub fn category(self) -> SessionCategory {
        match self {
            SessionType::Practice1
            | SessionType::Practice2
            | SessionType::Practice3
            | SessionType::PracticeShort => SessionCategory::Practice,
            SessionType::Qualifying1
            | SessionType::Qualifying2
            | SessionType::Qualifying3
            | SessionType::QualifyingShort => SessionCategory::Qualifying,
            SessionType::OneShotQualifying => SessionCategory::OneShotQualifying,
            SessionType::Race | SessionType::Race2 | SessionType::Race3 => SessionCategory::Race,
            SessionType::TimeTrial => SessionCategory::TimeTrial,
        }
    }

    /// Token used in outbound records.
    pub fn token(self) -> &'static str {
        match self {
            SessionType::Practice1 => "practice_1",
            SessionType::Practice2 => "practice_2",
            SessionType::Practice3 => "practice_3",
            SessionType::PracticeShort => "practice_short",
            SessionType::Qualifying1 => "qualifying_1",
            SessionType::Qualifying2 => "qualifying_2",
            SessionType::Qualifying3 => "qualifying_3",
            SessionType::QualifyingShort => "qualifying_short",
            SessionType::OneShotQualifying => "qualifying_one_shot",
            SessionType::Race => "race",
            SessionType::Race2 => "race_2",
            SessionType::Race3 => "race_3",
            SessionType::TimeTrial => "time_trial",
        }
    }

    pub fn is_time_trial(self) -> bool {
        self == SessionType::TimeTrial
    }
}

/// Session packet (id 1).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionPacket {
    /// 0 clear, 1 light cloud, 2 overcast, 3 light rain, 4 heavy rain, 5 storm.
    pub weather: u8,
    pub track_temperature: i8,
    pub air_temperature: i8,
    pub total_laps: u8,
    pub track_length: u16,
    /// Raw session type code as sent by the game.
    pub session_type_code: u8,
    /// `None` for code 0 (unknown) or codes the epoch does not define.
    pub session_type: Option<SessionType>,
    pub track_id: i8,
    pub is_spectating: bool,
    pub spectator_car_index: u8,
    pub network_game: bool,
    /// Not sent by the 2020 format.
    pub ai_difficulty: Option<u8>,
    /// Not sent by the 2020 format.
    pub session_link_identifier: Option<u32>,
    /// Only sent by the 2022 format.
    pub game_mode: Option<u8>,
}

/// One car's entry of a lap data packet (id 2).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LapDataEntry {
    pub last_lap_time_ms: u32,
    pub current_lap_time_ms: u32,
    pub sector1_time_ms: u16,
    pub sector2_time_ms: u16,
    /// Metres from the start line; negative before crossing it.
    pub lap_distance: f32,
    pub total_distance: f32,
    pub car_position: u8,
    pub current_lap_num: u8,
    /// 0 none, 1 pitting, 2 in pit area.
    pub pit_status: u8,
    /// 0-based sector index.
    pub sector: u8,
    pub current_lap_invalid: bool,
    pub penalties: u8,
    pub grid_position: u8,
    pub driver_status: u8,
    pub result_status: u8,
}

/// Lap data packet (id 2).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LapDataPacket {
    pub entries: Vec<LapDataEntry>,
    /// Only sent by the 2022 format.
    pub time_trial_pb_car_idx: Option<u8>,
    /// Only sent by the 2022 format.
    pub time_trial_rival_car_idx: Option<u8>,
}

/// One entry of a participants packet (id 4).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParticipantEntry {
    pub ai_controlled: bool,
    pub driver_id: u8,
    /// Always 0 in the 2020 format.
    pub network_id: u8,
    pub team_id: u8,
    /// Always false in the 2020 format.
    pub my_team: bool,
    pub race_number: u8,
    pub nationality: u8,
    pub name: String,
    pub your_telemetry: u8,
}

/// Participants packet (id 4).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParticipantsPacket {
    pub num_active_cars: u8,
    pub entries: Vec<ParticipantEntry>,
}

/// One car's setup (id 5). Identical layout in every epoch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CarSetupEntry {
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

/// Car setups packet (id 5).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CarSetupsPacket {
    pub entries: Vec<CarSetupEntry>,
}

/// One car's telemetry (id 6).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CarTelemetryEntry {
    pub speed_kmh: u16,
    /// 0.0–1.0
    pub throttle: f32,
    /// -1.0 (full left) – 1.0 (full right)
    pub steer: f32,
    /// 0.0–1.0
    pub brake: f32,
    pub clutch: u8,
    /// -1 reverse, 0 neutral, 1–8 forward.
    pub gear: i8,
    pub engine_rpm: u16,
    pub drs: u8,
}

/// Car telemetry packet (id 6).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CarTelemetryPacket {
    pub entries: Vec<CarTelemetryEntry>,
    pub suggested_gear: i8,
}

/// One car's status (id 7).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CarStatusEntry {
    pub traction_control: u8,
    pub anti_lock_brakes: u8,
    pub fuel_mix: u8,
    pub front_brake_bias: u8,
    pub pit_limiter_status: u8,
    pub fuel_in_tank: f32,
    pub actual_tyre_compound: u8,
    pub visual_tyre_compound: u8,
    pub tyres_age_laps: u8,
    pub ers_deploy_mode: u8,
}

/// Car status packet (id 7).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CarStatusPacket {
    pub entries: Vec<CarStatusEntry>,
}

/// One car's final classification (id 8).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FinalClassificationEntry {
    pub position: u8,
    pub num_laps: u8,
    pub grid_position: u8,
    pub points: u8,
    pub num_pit_stops: u8,
    pub result_status: u8,
    pub best_lap_time_ms: u32,
    /// Seconds, without penalties.
    pub total_race_time: f64,
    pub penalties_time: u8,
    pub num_penalties: u8,
}

/// Final classification packet (id 8).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FinalClassificationPacket {
    pub num_cars: u8,
    pub entries: Vec<FinalClassificationEntry>,
}

/// Penalty event details (`PENA`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PenaltyEvent {
    pub penalty_type: u8,
    pub infringement_type: u8,
    pub vehicle_idx: u8,
    pub other_vehicle_idx: u8,
    /// Seconds added; 255 when not applicable.
    pub time: u8,
    pub lap_num: u8,
    pub places_gained: u8,
}

/// Decoded event details.
#[derive(Debug, Clone, PartialEq)]
pub enum EventDetail {
    SessionStarted,
    SessionEnded,
    FastestLap { vehicle_idx: u8, lap_time_s: f32 },
    Retirement { vehicle_idx: u8 },
    Penalty(PenaltyEvent),
    /// Player rewound the game to `frame_identifier`.
    Flashback {
        frame_identifier: u32,
        session_time: f32,
    },
    /// Any event code the pipeline does not act on.
    Other,
}

/// Event packet (id 3).
#[derive(Debug, Clone, PartialEq)]
pub struct EventPacket {
    pub code: [u8; 4],
    pub detail: EventDetail,
}

impl EventPacket {
    pub const SESSION_STARTED: [u8; 4] = *b"SSTA";
    pub const SESSION_ENDED: [u8; 4] = *b"SEND";
    pub const FASTEST_LAP: [u8; 4] = *b"FTLP";
    pub const RETIREMENT: [u8; 4] = *b"RTMT";
    pub const PENALTY: [u8; 4] = *b"PENA";
    pub const FLASHBACK: [u8; 4] = *b"FLBK";

    pub fn code_str(&self) -> String {
        String::from_utf8_lossy(&self.code).into_owned()
    }
}

/// One completed (or in-progress) lap in a session history packet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LapHistoryEntry {
    pub lap_time_ms: u32,
    pub sector1_time_ms: u16,
    pub sector2_time_ms: u16,
    pub sector3_time_ms: u16,
    /// Bit 0 lap valid, bits 1–3 sector 1–3 valid.
    pub valid_flags: u8,
}

impl LapHistoryEntry {
    pub fn is_lap_valid(&self) -> bool {
        self.valid_flags & 0x01 != 0
    }
}

/// Session history packet (id 11).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionHistoryPacket {
    pub car_idx: u8,
    pub num_laps: u8,
    pub num_tyre_stints: u8,
    pub best_lap_time_lap_num: u8,
    /// `laps[i]` holds lap number `i + 1`.
    pub laps: Vec<LapHistoryEntry>,
}

/// One car's damage (id 10).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CarDamageEntry {
    /// Percent, `[RL, RR, FL, FR]`.
    pub tyres_wear: [f32; 4],
    pub front_left_wing_damage: u8,
    pub front_right_wing_damage: u8,
    pub rear_wing_damage: u8,
    pub gearbox_damage: u8,
    pub engine_damage: u8,
}

/// Car damage packet (id 10).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CarDamagePacket {
    pub entries: Vec<CarDamageEntry>,
}

/// A decoded packet body.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Session(SessionPacket),
    LapData(LapDataPacket),
    Event(EventPacket),
    Participants(ParticipantsPacket),
    CarSetups(CarSetupsPacket),
    CarTelemetry(CarTelemetryPacket),
    CarStatus(CarStatusPacket),
    FinalClassification(FinalClassificationPacket),
    CarDamage(CarDamagePacket),
    SessionHistory(SessionHistoryPacket),
}

impl Packet {
    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::Session(_) => PacketKind::Session,
            Packet::LapData(_) => PacketKind::LapData,
            Packet::Event(_) => PacketKind::Event,
            Packet::Participants(_) => PacketKind::Participants,
            Packet::CarSetups(_) => PacketKind::CarSetups,
            Packet::CarTelemetry(_) => PacketKind::CarTelemetry,
            Packet::CarStatus(_) => PacketKind::CarStatus,
            Packet::FinalClassification(_) => PacketKind::FinalClassification,
            Packet::CarDamage(_) => PacketKind::CarDamage,
            Packet::SessionHistory(_) => PacketKind::SessionHistory,
        }
    }
}

/// Human-readable name for a visual tyre compound code.
pub fn visual_compound_name(compound: u8) -> &'static str {
    match compound {
        16 => "Soft",
        17 => "Medium",
        18 => "Hard",
        7 => "Inter",
        8 => "Wet",
        19 => "F2 Super Soft",
        20 => "F2 Soft",
        21 => "F2 Medium",
        22 => "F2 Hard",
        15 => "Classic Wet",
        _ => "Unknown",
    }
}
