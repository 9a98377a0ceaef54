//! Byte layouts shared by more than one epoch.
//!
//! Offsets in this module are relative to the start of the record they
//! describe, not to the start of the packet.

use lapsync_errors::{DecodeError, DecodeResult};

use crate::header::{HEADER_SIZE, PacketHeader, write_header};
use crate::model::{
    CarSetupEntry, CarStatusEntry, CarTelemetryEntry, EventDetail, EventPacket,
    FinalClassificationEntry, LapHistoryEntry, NUM_CARS, ParticipantEntry, PenaltyEvent,
    SessionHistoryPacket, SessionPacket, SessionType,
};
use crate::reader::{ByteReader, ByteWriter};

/// Reject packets shorter than the fixed record size for their kind.
pub(crate) fn ensure_len(raw: &[u8], what: &'static str, expected: usize) -> DecodeResult<()> {
    if raw.len() < expected {
        return Err(DecodeError::too_short(what, raw.len(), expected));
    }
    Ok(())
}

/// Decode `NUM_CARS` fixed-size records starting at `base`.
pub(crate) fn read_cars<T>(
    raw: &[u8],
    base: usize,
    stride: usize,
    mut read: impl FnMut(&mut ByteReader<'_>) -> DecodeResult<T>,
) -> DecodeResult<Vec<T>> {
    let mut out = Vec::with_capacity(NUM_CARS);
    for i in 0..NUM_CARS {
        let mut r = ByteReader::at(raw, base + i * stride);
        out.push(read(&mut r)?);
    }
    Ok(out)
}

/// Encode up to `NUM_CARS` records starting at `base`.
pub(crate) fn write_cars<T>(
    w: &mut ByteWriter,
    base: usize,
    stride: usize,
    entries: &[T],
    mut write: impl FnMut(&mut ByteWriter, &T),
) {
    for (i, entry) in entries.iter().take(NUM_CARS).enumerate() {
        w.seek(base + i * stride);
        write(w, entry);
    }
}

/// Allocate a zeroed packet of `size` bytes and write the header.
pub(crate) fn begin(header: &PacketHeader, packet_id: u8, size: usize) -> ByteWriter {
    let mut w = ByteWriter::zeroed(size);
    let mut header = *header;
    header.packet_id = packet_id;
    write_header(&mut w, &header);
    w.seek(HEADER_SIZE);
    w
}

/// Lap times sent as float seconds, converted to whole milliseconds.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "rounded, non-negative and clamped to u32::MAX before the cast"
)]
pub(crate) fn seconds_to_ms(seconds: f32) -> u32 {
    if seconds <= 0.0 {
        return 0;
    }
    let ms = (f64::from(seconds) * 1000.0).round();
    if ms >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        ms as u32
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "lap times in seconds fit f32 to well under a millisecond"
)]
pub(crate) fn ms_to_seconds(ms: u32) -> f32 {
    (f64::from(ms) / 1000.0) as f32
}

// ---------------------------------------------------------------------------
// Session prefix (identical up to the network game flag in every epoch)
// ---------------------------------------------------------------------------

pub(crate) const SESSION_IS_SPECTATING: usize = HEADER_SIZE + 15;
pub(crate) const SESSION_NETWORK_GAME: usize = HEADER_SIZE + 125;

pub(crate) fn read_session_prefix(
    raw: &[u8],
    session_type: fn(u8) -> Option<SessionType>,
) -> DecodeResult<SessionPacket> {
    let mut r = ByteReader::at(raw, HEADER_SIZE);
    let weather = r.u8()?;
    let track_temperature = r.i8()?;
    let air_temperature = r.i8()?;
    let total_laps = r.u8()?;
    let track_length = r.u16_le()?;
    let session_type_code = r.u8()?;
    let track_id = r.i8()?;

    let mut r = ByteReader::at(raw, SESSION_IS_SPECTATING);
    let is_spectating = r.bool()?;
    let spectator_car_index = r.u8()?;
    let network_game = ByteReader::at(raw, SESSION_NETWORK_GAME).bool()?;

    Ok(SessionPacket {
        weather,
        track_temperature,
        air_temperature,
        total_laps,
        track_length,
        session_type_code,
        session_type: session_type(session_type_code),
        track_id,
        is_spectating,
        spectator_car_index,
        network_game,
        ai_difficulty: None,
        session_link_identifier: None,
        game_mode: None,
    })
}

pub(crate) fn write_session_prefix(w: &mut ByteWriter, s: &SessionPacket) {
    w.seek(HEADER_SIZE)
        .u8(s.weather)
        .i8(s.track_temperature)
        .i8(s.air_temperature)
        .u8(s.total_laps)
        .u16_le(s.track_length)
        .u8(s.session_type_code)
        .i8(s.track_id);
    w.seek(SESSION_IS_SPECTATING)
        .bool(s.is_spectating)
        .u8(s.spectator_car_index);
    w.seek(SESSION_NETWORK_GAME).bool(s.network_game);
}

/// Session type codes shared by every epoch; code 12 differs.
pub(crate) fn common_session_type(code: u8) -> Option<SessionType> {
    match code {
        1 => Some(SessionType::Practice1),
        2 => Some(SessionType::Practice2),
        3 => Some(SessionType::Practice3),
        4 => Some(SessionType::PracticeShort),
        5 => Some(SessionType::Qualifying1),
        6 => Some(SessionType::Qualifying2),
        7 => Some(SessionType::Qualifying3),
        8 => Some(SessionType::QualifyingShort),
        9 => Some(SessionType::OneShotQualifying),
        10 => Some(SessionType::Race),
        11 => Some(SessionType::Race2),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Final classification (37 bytes in 2020/2021, 45 in 2022)
// ---------------------------------------------------------------------------

pub(crate) const FINAL_CLASSIFICATION_ENTRIES: usize = HEADER_SIZE + 1;

/// How the best lap time is encoded in a classification record.
#[derive(Debug, Clone, Copy)]
pub(crate) enum BestLapUnit {
    Seconds,
    Milliseconds,
}

pub(crate) fn read_classification(
    r: &mut ByteReader<'_>,
    unit: BestLapUnit,
) -> DecodeResult<FinalClassificationEntry> {
    let position = r.u8()?;
    let num_laps = r.u8()?;
    let grid_position = r.u8()?;
    let points = r.u8()?;
    let num_pit_stops = r.u8()?;
    let result_status = r.u8()?;
    let best_lap_time_ms = match unit {
        BestLapUnit::Seconds => seconds_to_ms(r.f32_le()?),
        BestLapUnit::Milliseconds => r.u32_le()?,
    };
    Ok(FinalClassificationEntry {
        position,
        num_laps,
        grid_position,
        points,
        num_pit_stops,
        result_status,
        best_lap_time_ms,
        total_race_time: r.f64_le()?,
        penalties_time: r.u8()?,
        num_penalties: r.u8()?,
    })
}

pub(crate) fn write_classification(
    w: &mut ByteWriter,
    c: &FinalClassificationEntry,
    unit: BestLapUnit,
) {
    w.u8(c.position)
        .u8(c.num_laps)
        .u8(c.grid_position)
        .u8(c.points)
        .u8(c.num_pit_stops)
        .u8(c.result_status);
    match unit {
        BestLapUnit::Seconds => w.f32_le(ms_to_seconds(c.best_lap_time_ms)),
        BestLapUnit::Milliseconds => w.u32_le(c.best_lap_time_ms),
    };
    w.f64_le(c.total_race_time)
        .u8(c.penalties_time)
        .u8(c.num_penalties);
}

// ---------------------------------------------------------------------------
// Car setups (49 bytes, every epoch)
// ---------------------------------------------------------------------------

pub(crate) const CAR_SETUP_STRIDE: usize = 49;

pub(crate) fn read_car_setup(r: &mut ByteReader<'_>) -> DecodeResult<CarSetupEntry> {
    Ok(CarSetupEntry {
        front_wing: r.u8()?,
        rear_wing: r.u8()?,
        on_throttle: r.u8()?,
        off_throttle: r.u8()?,
        front_camber: r.f32_le()?,
        rear_camber: r.f32_le()?,
        front_toe: r.f32_le()?,
        rear_toe: r.f32_le()?,
        front_suspension: r.u8()?,
        rear_suspension: r.u8()?,
        front_anti_roll_bar: r.u8()?,
        rear_anti_roll_bar: r.u8()?,
        front_suspension_height: r.u8()?,
        rear_suspension_height: r.u8()?,
        brake_pressure: r.u8()?,
        brake_bias: r.u8()?,
        rear_left_tyre_pressure: r.f32_le()?,
        rear_right_tyre_pressure: r.f32_le()?,
        front_left_tyre_pressure: r.f32_le()?,
        front_right_tyre_pressure: r.f32_le()?,
        ballast: r.u8()?,
        fuel_load: r.f32_le()?,
    })
}

pub(crate) fn write_car_setup(w: &mut ByteWriter, s: &CarSetupEntry) {
    w.u8(s.front_wing)
        .u8(s.rear_wing)
        .u8(s.on_throttle)
        .u8(s.off_throttle)
        .f32_le(s.front_camber)
        .f32_le(s.rear_camber)
        .f32_le(s.front_toe)
        .f32_le(s.rear_toe)
        .u8(s.front_suspension)
        .u8(s.rear_suspension)
        .u8(s.front_anti_roll_bar)
        .u8(s.rear_anti_roll_bar)
        .u8(s.front_suspension_height)
        .u8(s.rear_suspension_height)
        .u8(s.brake_pressure)
        .u8(s.brake_bias)
        .f32_le(s.rear_left_tyre_pressure)
        .f32_le(s.rear_right_tyre_pressure)
        .f32_le(s.front_left_tyre_pressure)
        .f32_le(s.front_right_tyre_pressure)
        .u8(s.ballast)
        .f32_le(s.fuel_load);
}

// ---------------------------------------------------------------------------
// Participants (56 bytes, 2021 and 2022)
// ---------------------------------------------------------------------------

pub(crate) const PARTICIPANT_STRIDE: usize = 56;

pub(crate) fn read_participant(r: &mut ByteReader<'_>) -> DecodeResult<ParticipantEntry> {
    Ok(ParticipantEntry {
        ai_controlled: r.bool()?,
        driver_id: r.u8()?,
        network_id: r.u8()?,
        team_id: r.u8()?,
        my_team: r.bool()?,
        race_number: r.u8()?,
        nationality: r.u8()?,
        name: r.name::<48>()?,
        your_telemetry: r.u8()?,
    })
}

pub(crate) fn write_participant(w: &mut ByteWriter, p: &ParticipantEntry) {
    w.bool(p.ai_controlled)
        .u8(p.driver_id)
        .u8(p.network_id)
        .u8(p.team_id)
        .bool(p.my_team)
        .u8(p.race_number)
        .u8(p.nationality)
        .name::<48>(&p.name)
        .u8(p.your_telemetry);
}

// ---------------------------------------------------------------------------
// Car telemetry (58 bytes in 2020, 60 after; the consumed prefix is shared)
// ---------------------------------------------------------------------------

pub(crate) fn read_car_telemetry(r: &mut ByteReader<'_>) -> DecodeResult<CarTelemetryEntry> {
    Ok(CarTelemetryEntry {
        speed_kmh: r.u16_le()?,
        throttle: r.f32_le()?,
        steer: r.f32_le()?,
        brake: r.f32_le()?,
        clutch: r.u8()?,
        gear: r.i8()?,
        engine_rpm: r.u16_le()?,
        drs: r.u8()?,
    })
}

pub(crate) fn write_car_telemetry(w: &mut ByteWriter, t: &CarTelemetryEntry) {
    w.u16_le(t.speed_kmh)
        .f32_le(t.throttle)
        .f32_le(t.steer)
        .f32_le(t.brake)
        .u8(t.clutch)
        .i8(t.gear)
        .u16_le(t.engine_rpm)
        .u8(t.drs);
}

// ---------------------------------------------------------------------------
// Car status (47 bytes, 2021 and 2022)
// ---------------------------------------------------------------------------

pub(crate) const CAR_STATUS_STRIDE: usize = 47;

pub(crate) fn read_car_status(r: &mut ByteReader<'_>) -> DecodeResult<CarStatusEntry> {
    let traction_control = r.u8()?;
    let anti_lock_brakes = r.u8()?;
    let fuel_mix = r.u8()?;
    let front_brake_bias = r.u8()?;
    let pit_limiter_status = r.u8()?;
    let fuel_in_tank = r.f32_le()?;
    r.skip(16)?; // capacity, remaining laps, rpm, gears, drs
    let actual_tyre_compound = r.u8()?; // 25
    let visual_tyre_compound = r.u8()?;
    let tyres_age_laps = r.u8()?;
    r.skip(5)?; // fia flags, ers store
    let ers_deploy_mode = r.u8()?; // 33
    Ok(CarStatusEntry {
        traction_control,
        anti_lock_brakes,
        fuel_mix,
        front_brake_bias,
        pit_limiter_status,
        fuel_in_tank,
        actual_tyre_compound,
        visual_tyre_compound,
        tyres_age_laps,
        ers_deploy_mode,
    })
}

pub(crate) fn write_car_status(w: &mut ByteWriter, s: &CarStatusEntry) {
    w.u8(s.traction_control)
        .u8(s.anti_lock_brakes)
        .u8(s.fuel_mix)
        .u8(s.front_brake_bias)
        .u8(s.pit_limiter_status)
        .f32_le(s.fuel_in_tank)
        .skip(16)
        .u8(s.actual_tyre_compound)
        .u8(s.visual_tyre_compound)
        .u8(s.tyres_age_laps)
        .skip(5)
        .u8(s.ers_deploy_mode);
}

// ---------------------------------------------------------------------------
// Events (2021 and 2022)
// ---------------------------------------------------------------------------

const EVENT_CODE_OFFSET: usize = HEADER_SIZE;
const EVENT_DETAIL_OFFSET: usize = HEADER_SIZE + 4;

pub(crate) fn read_event(raw: &[u8]) -> DecodeResult<EventPacket> {
    let mut r = ByteReader::at(raw, EVENT_CODE_OFFSET);
    let code = r.u8_array::<4>()?;
    let mut d = ByteReader::at(raw, EVENT_DETAIL_OFFSET);
    let detail = match code {
        EventPacket::SESSION_STARTED => EventDetail::SessionStarted,
        EventPacket::SESSION_ENDED => EventDetail::SessionEnded,
        EventPacket::FASTEST_LAP => EventDetail::FastestLap {
            vehicle_idx: d.u8()?,
            lap_time_s: d.f32_le()?,
        },
        EventPacket::RETIREMENT => EventDetail::Retirement {
            vehicle_idx: d.u8()?,
        },
        EventPacket::PENALTY => EventDetail::Penalty(PenaltyEvent {
            penalty_type: d.u8()?,
            infringement_type: d.u8()?,
            vehicle_idx: d.u8()?,
            other_vehicle_idx: d.u8()?,
            time: d.u8()?,
            lap_num: d.u8()?,
            places_gained: d.u8()?,
        }),
        EventPacket::FLASHBACK => EventDetail::Flashback {
            frame_identifier: d.u32_le()?,
            session_time: d.f32_le()?,
        },
        _ => EventDetail::Other,
    };
    Ok(EventPacket { code, detail })
}

pub(crate) fn write_event(w: &mut ByteWriter, event: &EventPacket) {
    w.seek(EVENT_CODE_OFFSET).bytes(&event.code);
    w.seek(EVENT_DETAIL_OFFSET);
    match &event.detail {
        EventDetail::FastestLap {
            vehicle_idx,
            lap_time_s,
        } => {
            w.u8(*vehicle_idx).f32_le(*lap_time_s);
        }
        EventDetail::Retirement { vehicle_idx } => {
            w.u8(*vehicle_idx);
        }
        EventDetail::Penalty(p) => {
            w.u8(p.penalty_type)
                .u8(p.infringement_type)
                .u8(p.vehicle_idx)
                .u8(p.other_vehicle_idx)
                .u8(p.time)
                .u8(p.lap_num)
                .u8(p.places_gained);
        }
        EventDetail::Flashback {
            frame_identifier,
            session_time,
        } => {
            w.u32_le(*frame_identifier).f32_le(*session_time);
        }
        EventDetail::SessionStarted | EventDetail::SessionEnded | EventDetail::Other => {}
    }
}

// ---------------------------------------------------------------------------
// Session history (2021 and 2022)
// ---------------------------------------------------------------------------

const LAP_HISTORY_OFFSET: usize = HEADER_SIZE + 7;
const LAP_HISTORY_STRIDE: usize = 11;
const MAX_LAP_HISTORY: usize = 100;

pub(crate) fn read_session_history(raw: &[u8]) -> DecodeResult<SessionHistoryPacket> {
    let mut r = ByteReader::at(raw, HEADER_SIZE);
    let car_idx = r.u8()?;
    let num_laps = r.u8()?;
    let num_tyre_stints = r.u8()?;
    let best_lap_time_lap_num = r.u8()?;

    let count = usize::from(num_laps).min(MAX_LAP_HISTORY);
    let mut laps = Vec::with_capacity(count);
    for i in 0..count {
        let mut e = ByteReader::at(raw, LAP_HISTORY_OFFSET + i * LAP_HISTORY_STRIDE);
        laps.push(LapHistoryEntry {
            lap_time_ms: e.u32_le()?,
            sector1_time_ms: e.u16_le()?,
            sector2_time_ms: e.u16_le()?,
            sector3_time_ms: e.u16_le()?,
            valid_flags: e.u8()?,
        });
    }

    Ok(SessionHistoryPacket {
        car_idx,
        num_laps,
        num_tyre_stints,
        best_lap_time_lap_num,
        laps,
    })
}

pub(crate) fn write_session_history(w: &mut ByteWriter, h: &SessionHistoryPacket) {
    w.seek(HEADER_SIZE)
        .u8(h.car_idx)
        .u8(h.num_laps)
        .u8(h.num_tyre_stints)
        .u8(h.best_lap_time_lap_num);
    for (i, lap) in h.laps.iter().take(MAX_LAP_HISTORY).enumerate() {
        w.seek(LAP_HISTORY_OFFSET + i * LAP_HISTORY_STRIDE)
            .u32_le(lap.lap_time_ms)
            .u16_le(lap.sector1_time_ms)
            .u16_le(lap.sector2_time_ms)
            .u16_le(lap.sector3_time_ms)
            .u8(lap.valid_flags);
    }
}
