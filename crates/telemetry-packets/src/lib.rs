//! Decoders for the F1 2020, 2021 and 2022 UDP telemetry formats.
//!
//! Every datagram starts with a 24-byte little-endian header whose first two
//! bytes name the format year. The year selects a [`ProtocolEpoch`], and the
//! header's packet id selects the body layout. Bodies are decoded into the
//! epoch-neutral records in [`model`]; lap and sector times are always
//! milliseconds there.
//!
//! All reads are bounds-checked. A body shorter than its fixed record size is
//! rejected with [`DecodeError::TooShort`](lapsync_errors::DecodeError::TooShort);
//! packet ids that the pipeline does not consume decode to `Ok(None)`.
//!
//! Encoders are provided for every consumed kind so tests and replay tools
//! can build datagrams. They write only the fields the decoders read.

#![deny(static_mut_refs)]

pub mod epoch;
pub mod f1_2020;
pub mod f1_2021;
pub mod f1_2022;
pub mod header;
mod layout;
pub mod model;
pub mod reader;

pub use epoch::{ProtocolEpoch, decode_packet, detect_epoch};
pub use header::{HEADER_SIZE, PacketHeader, parse_header, peek_format};
pub use model::*;
