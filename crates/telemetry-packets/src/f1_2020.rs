//! F1 2020 packet format (`packetFormat = 2020`).
//!
//! | Id | Packet               | Size (bytes) |
//! |----|----------------------|--------------|
//! | 1  | Session              | 251          |
//! | 2  | Lap data             | 1190         |
//! | 4  | Participants         | 1213         |
//! | 5  | Car setups           | 1102         |
//! | 6  | Car telemetry        | 1307         |
//! | 7  | Car status           | 1344         |
//! | 8  | Final classification | 839          |
//!
//! Lap and sector totals are sent as float seconds and converted to
//! milliseconds on decode. Events, damage and session history are not
//! consumed for this format.

use lapsync_errors::{DecodeError, DecodeResult};

use crate::header::{HEADER_SIZE, PacketHeader, parse_header};
use crate::layout::{
    BestLapUnit, CAR_SETUP_STRIDE, FINAL_CLASSIFICATION_ENTRIES, begin, common_session_type,
    ensure_len, ms_to_seconds, read_car_setup, read_car_telemetry, read_cars, read_classification,
    read_session_prefix, seconds_to_ms, write_car_setup, write_car_telemetry, write_cars,
    write_classification, write_session_prefix,
};
use crate::model::{
    CarSetupsPacket, CarStatusEntry, CarStatusPacket, CarTelemetryPacket,
    FinalClassificationPacket, LapDataEntry, LapDataPacket, Packet, PacketKind, ParticipantEntry,
    ParticipantsPacket, SessionType,
};
use crate::reader::{ByteReader, ByteWriter};

pub const PACKET_FORMAT: u16 = 2020;

pub const SESSION_SIZE: usize = 251;
pub const LAP_DATA_SIZE: usize = 1190;
pub const PARTICIPANTS_SIZE: usize = 1213;
pub const CAR_SETUPS_SIZE: usize = 1102;
pub const CAR_TELEMETRY_SIZE: usize = 1307;
pub const CAR_STATUS_SIZE: usize = 1344;
pub const FINAL_CLASSIFICATION_SIZE: usize = 839;

const LAP_DATA_STRIDE: usize = 53;
const PARTICIPANT_STRIDE: usize = 54;
const CAR_TELEMETRY_STRIDE: usize = 58;
const CAR_STATUS_STRIDE: usize = 60;
const FINAL_CLASSIFICATION_STRIDE: usize = 37;
const SUGGESTED_GEAR_OFFSET: usize = 1306;

/// Packet kinds consumed for this format.
pub fn packet_kind(packet_id: u8) -> Option<PacketKind> {
    PacketKind::from_id(packet_id).filter(|kind| expected_size(*kind).is_some())
}

/// Fixed record size for `kind`, or `None` when the format does not carry it.
pub fn expected_size(kind: PacketKind) -> Option<usize> {
    match kind {
        PacketKind::Session => Some(SESSION_SIZE),
        PacketKind::LapData => Some(LAP_DATA_SIZE),
        PacketKind::Participants => Some(PARTICIPANTS_SIZE),
        PacketKind::CarSetups => Some(CAR_SETUPS_SIZE),
        PacketKind::CarTelemetry => Some(CAR_TELEMETRY_SIZE),
        PacketKind::CarStatus => Some(CAR_STATUS_SIZE),
        PacketKind::FinalClassification => Some(FINAL_CLASSIFICATION_SIZE),
        PacketKind::Event | PacketKind::CarDamage | PacketKind::SessionHistory => None,
    }
}

/// 2020 numbers time trial as 12; there is no third race.
pub fn session_type(code: u8) -> Option<SessionType> {
    match code {
        12 => Some(SessionType::TimeTrial),
        other => common_session_type(other),
    }
}

/// Decode one datagram. Unconsumed packet ids decode to `Ok(None)`.
pub fn decode(raw: &[u8]) -> DecodeResult<Option<(PacketHeader, Packet)>> {
    let header = parse_header(raw)?;
    if header.packet_format != PACKET_FORMAT {
        return Err(DecodeError::UnknownFormat(header.packet_format));
    }
    let Some(kind) = packet_kind(header.packet_id) else {
        return Ok(None);
    };
    let Some(size) = expected_size(kind) else {
        return Ok(None);
    };
    ensure_len(raw, kind.name(), size)?;

    let packet = match kind {
        PacketKind::Session => Packet::Session(read_session_prefix(raw, session_type)?),
        PacketKind::LapData => Packet::LapData(LapDataPacket {
            entries: read_cars(raw, HEADER_SIZE, LAP_DATA_STRIDE, read_lap_entry)?,
            time_trial_pb_car_idx: None,
            time_trial_rival_car_idx: None,
        }),
        PacketKind::Participants => Packet::Participants(ParticipantsPacket {
            num_active_cars: ByteReader::at(raw, HEADER_SIZE).u8()?,
            entries: read_cars(raw, HEADER_SIZE + 1, PARTICIPANT_STRIDE, read_participant)?,
        }),
        PacketKind::CarSetups => Packet::CarSetups(CarSetupsPacket {
            entries: read_cars(raw, HEADER_SIZE, CAR_SETUP_STRIDE, read_car_setup)?,
        }),
        PacketKind::CarTelemetry => Packet::CarTelemetry(CarTelemetryPacket {
            entries: read_cars(raw, HEADER_SIZE, CAR_TELEMETRY_STRIDE, read_car_telemetry)?,
            suggested_gear: ByteReader::at(raw, SUGGESTED_GEAR_OFFSET).i8()?,
        }),
        PacketKind::CarStatus => Packet::CarStatus(CarStatusPacket {
            entries: read_cars(raw, HEADER_SIZE, CAR_STATUS_STRIDE, read_car_status)?,
        }),
        PacketKind::FinalClassification => {
            Packet::FinalClassification(FinalClassificationPacket {
                num_cars: ByteReader::at(raw, HEADER_SIZE).u8()?,
                entries: read_cars(
                    raw,
                    FINAL_CLASSIFICATION_ENTRIES,
                    FINAL_CLASSIFICATION_STRIDE,
                    |r| read_classification(r, BestLapUnit::Seconds),
                )?,
            })
        }
        PacketKind::Event | PacketKind::CarDamage | PacketKind::SessionHistory => {
            return Ok(None);
        }
    };
    Ok(Some((header, packet)))
}

/// Encode `packet` in this format. Returns `None` for kinds the format does
/// not carry.
pub fn encode(header: &PacketHeader, packet: &Packet) -> Option<Vec<u8>> {
    let kind = packet.kind();
    let size = expected_size(kind)?;
    let mut header = *header;
    header.packet_format = PACKET_FORMAT;
    let mut w = begin(&header, kind.id(), size);

    match packet {
        Packet::Session(s) => write_session_prefix(&mut w, s),
        Packet::LapData(p) => {
            write_cars(&mut w, HEADER_SIZE, LAP_DATA_STRIDE, &p.entries, write_lap_entry);
        }
        Packet::Participants(p) => {
            w.seek(HEADER_SIZE).u8(p.num_active_cars);
            write_cars(
                &mut w,
                HEADER_SIZE + 1,
                PARTICIPANT_STRIDE,
                &p.entries,
                write_participant,
            );
        }
        Packet::CarSetups(p) => {
            write_cars(&mut w, HEADER_SIZE, CAR_SETUP_STRIDE, &p.entries, write_car_setup);
        }
        Packet::CarTelemetry(p) => {
            write_cars(
                &mut w,
                HEADER_SIZE,
                CAR_TELEMETRY_STRIDE,
                &p.entries,
                write_car_telemetry,
            );
            w.seek(SUGGESTED_GEAR_OFFSET).i8(p.suggested_gear);
        }
        Packet::CarStatus(p) => {
            write_cars(&mut w, HEADER_SIZE, CAR_STATUS_STRIDE, &p.entries, write_car_status);
        }
        Packet::FinalClassification(p) => {
            w.seek(HEADER_SIZE).u8(p.num_cars);
            write_cars(
                &mut w,
                FINAL_CLASSIFICATION_ENTRIES,
                FINAL_CLASSIFICATION_STRIDE,
                &p.entries,
                |w, c| write_classification(w, c, BestLapUnit::Seconds),
            );
        }
        Packet::Event(_) | Packet::CarDamage(_) | Packet::SessionHistory(_) => return None,
    }
    Some(w.into_inner())
}

fn read_lap_entry(r: &mut ByteReader<'_>) -> DecodeResult<LapDataEntry> {
    let last_lap_time_ms = seconds_to_ms(r.f32_le()?);
    let current_lap_time_ms = seconds_to_ms(r.f32_le()?);
    let sector1_time_ms = r.u16_le()?;
    let sector2_time_ms = r.u16_le()?;
    r.skip(20)?; // best lap and best sector bookkeeping
    let lap_distance = r.f32_le()?; // 32
    let total_distance = r.f32_le()?;
    r.skip(4)?; // safety car delta
    Ok(LapDataEntry {
        last_lap_time_ms,
        current_lap_time_ms,
        sector1_time_ms,
        sector2_time_ms,
        lap_distance,
        total_distance,
        car_position: r.u8()?, // 44
        current_lap_num: r.u8()?,
        pit_status: r.u8()?,
        sector: r.u8()?,
        current_lap_invalid: r.bool()?,
        penalties: r.u8()?,
        grid_position: r.u8()?,
        driver_status: r.u8()?,
        result_status: r.u8()?,
    })
}

fn write_lap_entry(w: &mut ByteWriter, e: &LapDataEntry) {
    w.f32_le(ms_to_seconds(e.last_lap_time_ms))
        .f32_le(ms_to_seconds(e.current_lap_time_ms))
        .u16_le(e.sector1_time_ms)
        .u16_le(e.sector2_time_ms)
        .skip(20)
        .f32_le(e.lap_distance)
        .f32_le(e.total_distance)
        .skip(4)
        .u8(e.car_position)
        .u8(e.current_lap_num)
        .u8(e.pit_status)
        .u8(e.sector)
        .bool(e.current_lap_invalid)
        .u8(e.penalties)
        .u8(e.grid_position)
        .u8(e.driver_status)
        .u8(e.result_status);
}

fn read_participant(r: &mut ByteReader<'_>) -> DecodeResult<ParticipantEntry> {
    Ok(ParticipantEntry {
        ai_controlled: r.bool()?,
        driver_id: r.u8()?,
        network_id: 0,
        team_id: r.u8()?,
        my_team: false,
        race_number: r.u8()?,
        nationality: r.u8()?,
        name: r.name::<48>()?,
        your_telemetry: r.u8()?,
    })
}

fn write_participant(w: &mut ByteWriter, p: &ParticipantEntry) {
    w.bool(p.ai_controlled)
        .u8(p.driver_id)
        .u8(p.team_id)
        .u8(p.race_number)
        .u8(p.nationality)
        .name::<48>(&p.name)
        .u8(p.your_telemetry);
}

fn read_car_status(r: &mut ByteReader<'_>) -> DecodeResult<CarStatusEntry> {
    let traction_control = r.u8()?;
    let anti_lock_brakes = r.u8()?;
    let fuel_mix = r.u8()?;
    let front_brake_bias = r.u8()?;
    let pit_limiter_status = r.u8()?;
    let fuel_in_tank = r.f32_le()?;
    r.skip(20)?; // capacity through tyre wear
    let actual_tyre_compound = r.u8()?; // 29
    let visual_tyre_compound = r.u8()?;
    let tyres_age_laps = r.u8()?;
    r.skip(15)?; // tyre damage, wing damage, fault flags, ers store
    let ers_deploy_mode = r.u8()?; // 47
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

fn write_car_status(w: &mut ByteWriter, s: &CarStatusEntry) {
    w.u8(s.traction_control)
        .u8(s.anti_lock_brakes)
        .u8(s.fuel_mix)
        .u8(s.front_brake_bias)
        .u8(s.pit_limiter_status)
        .f32_le(s.fuel_in_tank)
        .skip(20)
        .u8(s.actual_tyre_compound)
        .u8(s.visual_tyre_compound)
        .u8(s.tyres_age_laps)
        .skip(15)
        .u8(s.ers_deploy_mode);
}
