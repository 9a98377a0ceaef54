//! The 24-byte header shared by every packet of the 2020–2022 formats.

use lapsync_errors::{DecodeError, DecodeResult};

use crate::reader::{ByteReader, ByteWriter};

/// Size of the packed header in bytes.
pub const HEADER_SIZE: usize = 24;

/// Parsed fields from the packet header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacketHeader {
    /// Protocol format year (2020, 2021, 2022).
    pub packet_format: u16,
    pub game_major_version: u8,
    pub game_minor_version: u8,
    pub packet_version: u8,
    pub packet_id: u8,
    /// Opaque identifier of the session this packet belongs to.
    pub session_uid: u64,
    /// Seconds since the session started.
    pub session_time: f32,
    /// Frame the data was sampled on. Goes backwards after a flashback.
    pub frame_identifier: u32,
    pub player_car_index: u8,
    /// 255 when there is no second player.
    pub secondary_player_car_index: u8,
}

impl PacketHeader {
    /// Header for a synthetic packet; used by encoders and tests.
    pub fn new(packet_format: u16, packet_id: u8, session_uid: u64, frame_identifier: u32) -> Self {
        Self {
            packet_format,
            game_major_version: 1,
            game_minor_version: 0,
            packet_version: 1,
            packet_id,
            session_uid,
            session_time: 0.0,
            frame_identifier,
            player_car_index: 0,
            secondary_player_car_index: 255,
        }
    }

    pub fn with_player(mut self, player_car_index: u8) -> Self {
        self.player_car_index = player_car_index;
        self
    }

    pub fn player_index(&self) -> usize {
        usize::from(self.player_car_index)
    }
}

/// Read only the format identifier from the first two bytes.
pub fn peek_format(raw: &[u8]) -> DecodeResult<u16> {
    if raw.len() < 2 {
        return Err(DecodeError::too_short("header", raw.len(), HEADER_SIZE));
    }
    ByteReader::new(raw).u16_le()
}

/// Parse the 24-byte packet header.
pub fn parse_header(raw: &[u8]) -> DecodeResult<PacketHeader> {
    if raw.len() < HEADER_SIZE {
        return Err(DecodeError::too_short("header", raw.len(), HEADER_SIZE));
    }
    let mut r = ByteReader::new(raw);
    Ok(PacketHeader {
        packet_format: r.u16_le()?,            // 0-1
        game_major_version: r.u8()?,           // 2
        game_minor_version: r.u8()?,           // 3
        packet_version: r.u8()?,               // 4
        packet_id: r.u8()?,                    // 5
        session_uid: r.u64_le()?,              // 6-13
        session_time: r.f32_le()?,             // 14-17
        frame_identifier: r.u32_le()?,         // 18-21
        player_car_index: r.u8()?,             // 22
        secondary_player_car_index: r.u8()?,   // 23
    })
}

/// Write `header` at offset 0 of `w`.
pub fn write_header(w: &mut ByteWriter, header: &PacketHeader) {
    w.seek(0)
        .u16_le(header.packet_format)
        .u8(header.game_major_version)
        .u8(header.game_minor_version)
        .u8(header.packet_version)
        .u8(header.packet_id)
        .u64_le(header.session_uid)
        .f32_le(header.session_time)
        .u32_le(header.frame_identifier)
        .u8(header.player_car_index)
        .u8(header.secondary_player_car_index);
}
