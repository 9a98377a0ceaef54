//! F1 2022 packet format (`packetFormat = 2022`).
//!
//! | Id | Packet               | Size (bytes) |
//! |----|----------------------|--------------|
//! | 1  | Session              | 632          |
//! | 2  | Lap data             | 972          |
//! | 3  | Event                | 40           |
//! | 4  | Participants         | 1257         |
//! | 5  | Car setups           | 1102         |
//! | 6  | Car telemetry        | 1347         |
//! | 7  | Car status           | 1058         |
//! | 8  | Final classification | 1015         |
//! | 10 | Car damage           | 948          |
//! | 11 | Session history      | 1155         |
//!
//! Most per-car layouts are unchanged from 2021; only the differences live
//! here.

use lapsync_errors::{DecodeError, DecodeResult};

use crate::f1_2021::{
    self, CAR_TELEMETRY_STRIDE, DamageLayout, LAP_DATA_STRIDE, read_car_damage, read_lap_entry,
    read_session, write_car_damage, write_lap_entry, write_session,
};
use crate::header::{HEADER_SIZE, PacketHeader, parse_header};
use crate::layout::{
    BestLapUnit, CAR_SETUP_STRIDE, CAR_STATUS_STRIDE, FINAL_CLASSIFICATION_ENTRIES,
    PARTICIPANT_STRIDE, begin, ensure_len, read_car_setup, read_car_status, read_car_telemetry,
    read_cars, read_classification, read_event, read_participant, read_session_history,
    write_car_setup, write_car_status, write_car_telemetry, write_cars, write_classification,
    write_event, write_participant, write_session_history,
};
use crate::model::{
    CarDamagePacket, CarSetupsPacket, CarStatusPacket, CarTelemetryPacket,
    FinalClassificationPacket, LapDataPacket, Packet, PacketKind, ParticipantsPacket,
    SessionType,
};
use crate::reader::ByteReader;

pub const PACKET_FORMAT: u16 = 2022;

pub const SESSION_SIZE: usize = 632;
pub const LAP_DATA_SIZE: usize = 972;
pub const EVENT_SIZE: usize = 40;
pub const PARTICIPANTS_SIZE: usize = f1_2021::PARTICIPANTS_SIZE;
pub const CAR_SETUPS_SIZE: usize = f1_2021::CAR_SETUPS_SIZE;
pub const CAR_TELEMETRY_SIZE: usize = f1_2021::CAR_TELEMETRY_SIZE;
pub const CAR_STATUS_SIZE: usize = f1_2021::CAR_STATUS_SIZE;
pub const FINAL_CLASSIFICATION_SIZE: usize = 1015;
pub const CAR_DAMAGE_SIZE: usize = 948;
pub const SESSION_HISTORY_SIZE: usize = f1_2021::SESSION_HISTORY_SIZE;

const SESSION_GAME_MODE: usize = HEADER_SIZE + 601;
const TIME_TRIAL_PB_CAR_IDX: usize = 970;
const TIME_TRIAL_RIVAL_CAR_IDX: usize = 971;
const FINAL_CLASSIFICATION_STRIDE: usize = 45;
const CAR_DAMAGE_STRIDE: usize = 42;
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

/// Same numbering as 2021.
pub fn session_type(code: u8) -> Option<SessionType> {
    f1_2021::session_type(code)
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
        PacketKind::Session => {
            let mut session = read_session(raw, session_type)?;
            session.game_mode = Some(ByteReader::at(raw, SESSION_GAME_MODE).u8()?);
            Packet::Session(session)
        }
        PacketKind::LapData => Packet::LapData(LapDataPacket {
            entries: read_cars(raw, HEADER_SIZE, LAP_DATA_STRIDE, read_lap_entry)?,
            time_trial_pb_car_idx: Some(ByteReader::at(raw, TIME_TRIAL_PB_CAR_IDX).u8()?),
            time_trial_rival_car_idx: Some(ByteReader::at(raw, TIME_TRIAL_RIVAL_CAR_IDX).u8()?),
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
                read_car_damage(r, DamageLayout::Format2022)
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
        Packet::Session(s) => {
            write_session(&mut w, s);
            w.seek(SESSION_GAME_MODE).u8(s.game_mode.unwrap_or_default());
        }
        Packet::LapData(p) => {
            write_cars(&mut w, HEADER_SIZE, LAP_DATA_STRIDE, &p.entries, write_lap_entry);
            w.seek(TIME_TRIAL_PB_CAR_IDX)
                .u8(p.time_trial_pb_car_idx.unwrap_or(255))
                .u8(p.time_trial_rival_car_idx.unwrap_or(255));
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
                write_car_damage(w, d, DamageLayout::Format2022);
            });
        }
        Packet::SessionHistory(h) => write_session_history(&mut w, h),
    }
    Some(w.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CarDamageEntry, SessionPacket};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn lap_data_carries_time_trial_indices() -> TestResult {
        let header = PacketHeader::new(PACKET_FORMAT, 2, 1, 1);
        let packet = Packet::LapData(LapDataPacket {
            entries: vec![Default::default(); 22],
            time_trial_pb_car_idx: Some(1),
            time_trial_rival_car_idx: Some(255),
        });
        let raw = encode(&header, &packet).ok_or("encode failed")?;
        assert_eq!(raw.len(), LAP_DATA_SIZE);
        assert_eq!(raw[TIME_TRIAL_PB_CAR_IDX], 1);
        let Some((_, decoded)) = decode(&raw)? else {
            return Err("expected lap data".into());
        };
        assert_eq!(decoded, packet);
        Ok(())
    }

    #[test]
    fn session_reads_game_mode() -> TestResult {
        let header = PacketHeader::new(PACKET_FORMAT, 1, 1, 1);
        let session = SessionPacket {
            session_type_code: 13,
            session_type: Some(SessionType::TimeTrial),
            ai_difficulty: Some(90),
            session_link_identifier: Some(77),
            game_mode: Some(3),
            weather: 2,
            ..SessionPacket::default()
        };
        let raw = encode(&header, &Packet::Session(session.clone())).ok_or("encode failed")?;
        assert_eq!(raw.len(), SESSION_SIZE);
        let Some((_, Packet::Session(decoded))) = decode(&raw)? else {
            return Err("expected session".into());
        };
        assert_eq!(decoded, session);
        Ok(())
    }

    #[test]
    fn damage_skips_ers_fault_flag() -> TestResult {
        let header = PacketHeader::new(PACKET_FORMAT, 10, 1, 1);
        let mut entries = vec![CarDamageEntry::default(); 22];
        entries[0].gearbox_damage = 12;
        entries[0].engine_damage = 34;
        let raw = encode(&header, &Packet::CarDamage(CarDamagePacket { entries }))
            .ok_or("encode failed")?;
        assert_eq!(raw[HEADER_SIZE + 32], 12);
        assert_eq!(raw[HEADER_SIZE + 33], 34);
        let Some((_, Packet::CarDamage(decoded))) = decode(&raw)? else {
            return Err("expected damage".into());
        };
        assert_eq!(decoded.entries[0].gearbox_damage, 12);
        assert_eq!(decoded.entries[0].engine_damage, 34);
        Ok(())
    }

    #[test]
    fn short_final_classification_is_rejected() {
        let mut raw = vec![0u8; 839];
        raw[..2].copy_from_slice(&PACKET_FORMAT.to_le_bytes());
        raw[5] = 8;
        assert_eq!(
            decode(&raw),
            Err(DecodeError::too_short(
                "final classification",
                839,
                FINAL_CLASSIFICATION_SIZE
            ))
        );
    }
}
