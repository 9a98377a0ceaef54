//! F1 2021 packet format (`packetFormat = 2021`).
//!
//! | Id | Packet               | Size (bytes) |
//! |----|----------------------|--------------|
//! | 1  | Session              | 625          |
//! | 2  | Lap data             | 970          |
//! | 3  | Event                | 36           |
//! | 4  | Participants         | 1257         |
//! | 5  | Car setups           | 1102         |
//! | 6  | Car telemetry        | 1347         |
//! | 7  | Car status           | 1058         |
//! | 8  | Final classification | 839          |
//! | 10 | Car damage           | 882          |
//! | 11 | Session history      | 1155         |
//!
//! The first format to send lap times as integer milliseconds.

use lapsync_errors::{DecodeError, DecodeResult};

use crate::header::{HEADER_SIZE, PacketHeader, parse_header};
use crate::layout::{
    BestLapUnit, CAR_SETUP_STRIDE, CAR_STATUS_STRIDE, FINAL_CLASSIFICATION_ENTRIES,
    PARTICIPANT_STRIDE, begin, common_session_type, ensure_len,
    read_car_setup, read_car_status, read_car_telemetry, read_cars, read_classification,
    read_event, read_participant, read_session_history, read_session_prefix, write_car_setup,
    write_car_status, write_car_telemetry, write_cars, write_classification, write_event,
    write_participant, write_session_history, write_session_prefix,
};
use crate::model::{
    CarDamageEntry, CarDamagePacket, CarSetupsPacket, CarStatusPacket, CarTelemetryPacket,
    FinalClassificationPacket, LapDataEntry, LapDataPacket, Packet, PacketKind,
    ParticipantsPacket, SessionPacket, SessionType,
};
use crate::reader::{ByteReader, ByteWriter};

pub const PACKET_FORMAT: u16 = 2021;

pub const SESSION_SIZE: usize = 625;
pub const LAP_DATA_SIZE: usize = 970;
pub const EVENT_SIZE: usize = 36;
pub const PARTICIPANTS_SIZE: usize = 1257;
pub const CAR_SETUPS_SIZE: usize = 1102;
pub const CAR_TELEMETRY_SIZE: usize = 1347;
pub const CAR_STATUS_SIZE: usize = 1058;
pub const FINAL_CLASSIFICATION_SIZE: usize = 839;
pub const CAR_DAMAGE_SIZE: usize = 882;
pub const SESSION_HISTORY_SIZE: usize = 1155;

pub(crate) const LAP_DATA_STRIDE: usize = 43;
pub(crate) const CAR_TELEMETRY_STRIDE: usize = 60;
pub(crate) const SESSION_AI_DIFFICULTY: usize = HEADER_SIZE + 576;
pub(crate) const SESSION_LINK_IDENTIFIER: usize = HEADER_SIZE + 585;
const FINAL_CLASSIFICATION_STRIDE: usize = 37;
const CAR_DAMAGE_STRIDE: usize = 39;
const SUGGESTED_GEAR_OFFSET: usize = 1346;

pub fn packet_kind(packet_id: u8) -> Option<PacketKind> {
    PacketKind::from_id(packet_id)
}

pub fn expected_size(kind: PacketKind) -> Option<usize> {
    Some(match kind {
        PacketKind::Session => SESSION_SIZE,
        PacketKind::LapData => LAP_DATA_SIZE,
        PacketKind::Event => EVENT_SIZE,
        PacketKind::Participants => PARTICIPANTS_SIZE,
        PacketKind::CarSetups => CAR_SETUPS_SIZE,
        PacketKind::CarTelemetry => CAR_TELEMETRY_SIZE,
        PacketKind::CarStatus => CAR_STATUS_SIZE,
        PacketKind::FinalClassification => FINAL_CLASSIFICATION_SIZE,
        PacketKind::CarDamage => CAR_DAMAGE_SIZE,
        PacketKind::SessionHistory => SESSION_HISTORY_SIZE,
    })
}

/// 2021 added a third race at 12 and moved time trial to 13.
pub fn session_type(code: u8) -> Option<SessionType> {
    match code {
        12 => Some(SessionType::Race3),
        13 => Some(SessionType::TimeTrial),
        other => common_session_type(other),
    }
}

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
        PacketKind::Session => Packet::Session(read_session(raw, session_type)?),
        PacketKind::LapData => Packet::LapData(LapDataPacket {
            entries: read_cars(raw, HEADER_SIZE, LAP_DATA_STRIDE, read_lap_entry)?,
            time_trial_pb_car_idx: None,
            time_trial_rival_car_idx: None,
        }),
        PacketKind::Event => Packet::Event(read_event(raw)?),
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
                    |r| read_classification(r, BestLapUnit::Milliseconds),
                )?,
            })
        }
        PacketKind::CarDamage => Packet::CarDamage(CarDamagePacket {
            entries: read_cars(raw, HEADER_SIZE, CAR_DAMAGE_STRIDE, |r| {
                read_car_damage(r, DamageLayout::Format2021)
            })?,
        }),
        PacketKind::SessionHistory => Packet::SessionHistory(read_session_history(raw)?),
    };
    Ok(Some((header, packet)))
}

pub fn encode(header: &PacketHeader, packet: &Packet) -> Option<Vec<u8>> {
    let kind = packet.kind();
    let size = expected_size(kind)?;
    let mut header = *header;
    header.packet_format = PACKET_FORMAT;
    let mut w = begin(&header, kind.id(), size);

    match packet {
        Packet::Session(s) => write_session(&mut w, s),
        Packet::LapData(p) => {
            write_cars(&mut w, HEADER_SIZE, LAP_DATA_STRIDE, &p.entries, write_lap_entry);
        }
        Packet::Event(e) => write_event(&mut w, e),
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
                |w, c| write_classification(w, c, BestLapUnit::Milliseconds),
            );
        }
        Packet::CarDamage(p) => {
            write_cars(&mut w, HEADER_SIZE, CAR_DAMAGE_STRIDE, &p.entries, |w, d| {
                write_car_damage(w, d, DamageLayout::Format2021);
            });
        }
        Packet::SessionHistory(h) => write_session_history(&mut w, h),
    }
    Some(w.into_inner())
}

/// Session packet fields shared by 2021 and 2022.
pub(crate) fn read_session(
    raw: &[u8],
    session_type: fn(u8) -> Option<SessionType>,
) -> DecodeResult<SessionPacket> {
    let mut session = read_session_prefix(raw, session_type)?;
    session.ai_difficulty = Some(ByteReader::at(raw, SESSION_AI_DIFFICULTY).u8()?);
    session.session_link_identifier =
        Some(ByteReader::at(raw, SESSION_LINK_IDENTIFIER).u32_le()?);
    Ok(session)
}

pub(crate) fn write_session(w: &mut ByteWriter, s: &SessionPacket) {
    write_session_prefix(w, s);
    w.seek(SESSION_AI_DIFFICULTY)
        .u8(s.ai_difficulty.unwrap_or_default());
    w.seek(SESSION_LINK_IDENTIFIER)
        .u32_le(s.session_link_identifier.unwrap_or_default());
}

pub(crate) fn read_lap_entry(r: &mut ByteReader<'_>) -> DecodeResult<LapDataEntry> {
    let last_lap_time_ms = r.u32_le()?;
    let current_lap_time_ms = r.u32_le()?;
    let sector1_time_ms = r.u16_le()?;
    let sector2_time_ms = r.u16_le()?;
    let lap_distance = r.f32_le()?; // 12
    let total_distance = r.f32_le()?;
    r.skip(4)?; // safety car delta
    let car_position = r.u8()?; // 24
    let current_lap_num = r.u8()?;
    let pit_status = r.u8()?;
    r.skip(1)?; // pit stop count
    let sector = r.u8()?; // 28
    let current_lap_invalid = r.bool()?;
    let penalties = r.u8()?;
    r.skip(3)?; // warnings and unserved penalties
    Ok(LapDataEntry {
        last_lap_time_ms,
        current_lap_time_ms,
        sector1_time_ms,
        sector2_time_ms,
        lap_distance,
        total_distance,
        car_position,
        current_lap_num,
        pit_status,
        sector,
        current_lap_invalid,
        penalties,
        grid_position: r.u8()?, // 34
        driver_status: r.u8()?,
        result_status: r.u8()?,
    })
}

pub(crate) fn write_lap_entry(w: &mut ByteWriter, e: &LapDataEntry) {
    w.u32_le(e.last_lap_time_ms)
        .u32_le(e.current_lap_time_ms)
        .u16_le(e.sector1_time_ms)
        .u16_le(e.sector2_time_ms)
        .f32_le(e.lap_distance)
        .f32_le(e.total_distance)
        .skip(4)
        .u8(e.car_position)
        .u8(e.current_lap_num)
        .u8(e.pit_status)
        .skip(1)
        .u8(e.sector)
        .bool(e.current_lap_invalid)
        .u8(e.penalties)
        .skip(3)
        .u8(e.grid_position)
        .u8(e.driver_status)
        .u8(e.result_status);
}

/// Car damage layouts. 2022 inserted an ERS fault flag before the gearbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DamageLayout {
    Format2021,
    Format2022,
}

pub(crate) fn read_car_damage(
    r: &mut ByteReader<'_>,
    layout: DamageLayout,
) -> DecodeResult<CarDamageEntry> {
    let tyres_wear = r.f32_le_array::<4>()?;
    r.skip(8)?; // tyre and brake damage
    let front_left_wing_damage = r.u8()?; // 24
    let front_right_wing_damage = r.u8()?;
    let rear_wing_damage = r.u8()?;
    r.skip(4)?; // floor, diffuser, sidepod, drs fault
    if layout == DamageLayout::Format2022 {
        r.skip(1)?;
    }
    Ok(CarDamageEntry {
        tyres_wear,
        front_left_wing_damage,
        front_right_wing_damage,
        rear_wing_damage,
        gearbox_damage: r.u8()?,
        engine_damage: r.u8()?,
    })
}

pub(crate) fn write_car_damage(w: &mut ByteWriter, d: &CarDamageEntry, layout: DamageLayout) {
    for wear in d.tyres_wear {
        w.f32_le(wear);
    }
    w.skip(8)
        .u8(d.front_left_wing_damage)
        .u8(d.front_right_wing_damage)
        .u8(d.rear_wing_damage)
        .skip(4);
    if layout == DamageLayout::Format2022 {
        w.skip(1);
    }
    w.u8(d.gearbox_damage).u8(d.engine_damage);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventDetail, EventPacket, LapHistoryEntry, SessionHistoryPacket};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn lap_entry_is_43_bytes() -> TestResult {
        let mut w = ByteWriter::zeroed(LAP_DATA_STRIDE);
        write_lap_entry(
            &mut w,
            &LapDataEntry {
                result_status: 3,
                grid_position: 5,
                ..LapDataEntry::default()
            },
        );
        let buf = w.into_inner();
        assert_eq!(buf[34], 5);
        assert_eq!(buf[36], 3);
        let mut r = ByteReader::new(&buf);
        let entry = read_lap_entry(&mut r)?;
        assert_eq!(r.position(), 37);
        assert_eq!(entry.result_status, 3);
        Ok(())
    }

    #[test]
    fn session_codes_shift_time_trial() {
        assert_eq!(session_type(12), Some(SessionType::Race3));
        assert_eq!(session_type(13), Some(SessionType::TimeTrial));
        assert_eq!(session_type(14), None);
    }

    #[test]
    fn flashback_event_decodes_frame() -> TestResult {
        let header = PacketHeader::new(PACKET_FORMAT, 3, 9, 500);
        let event = Packet::Event(EventPacket {
            code: EventPacket::FLASHBACK,
            detail: EventDetail::Flashback {
                frame_identifier: 420,
                session_time: 61.5,
            },
        });
        let raw = encode(&header, &event).ok_or("encode failed")?;
        assert_eq!(raw.len(), EVENT_SIZE);
        let Some((_, decoded)) = decode(&raw)? else {
            return Err("expected event".into());
        };
        assert_eq!(decoded, event);
        Ok(())
    }

    #[test]
    fn session_history_reads_laps() -> TestResult {
        let header = PacketHeader::new(PACKET_FORMAT, 11, 9, 500);
        let history = SessionHistoryPacket {
            car_idx: 0,
            num_laps: 2,
            num_tyre_stints: 1,
            best_lap_time_lap_num: 1,
            laps: vec![
                LapHistoryEntry {
                    lap_time_ms: 90_000,
                    sector1_time_ms: 30_000,
                    sector2_time_ms: 30_000,
                    sector3_time_ms: 30_000,
                    valid_flags: 0x0F,
                },
                LapHistoryEntry::default(),
            ],
        };
        let raw = encode(&header, &Packet::SessionHistory(history.clone()))
            .ok_or("encode failed")?;
        let Some((_, Packet::SessionHistory(decoded))) = decode(&raw)? else {
            return Err("expected session history".into());
        };
        assert_eq!(decoded, history);
        Ok(())
    }

    #[test]
    fn wrong_format_is_rejected() {
        let mut raw = vec![0u8; LAP_DATA_SIZE];
        raw[..2].copy_from_slice(&2022u16.to_le_bytes());
        raw[5] = 2;
        assert_eq!(decode(&raw), Err(DecodeError::UnknownFormat(2022)));
    }
}
