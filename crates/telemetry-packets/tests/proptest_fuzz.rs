//! Property-based fuzz tests for packet decoding.
//!
//! The decoders must never panic, whatever the input.

use lapsync_telemetry_packets::{ProtocolEpoch, decode_packet};
use proptest::prelude::*;

const MAX_DATAGRAM: usize = 2048;

fn with_header(mut data: Vec<u8>, format: u16, packet_id: u8) -> Vec<u8> {
    if data.len() >= 6 {
        data[..2].copy_from_slice(&format.to_le_bytes());
        data[5] = packet_id;
    }
    data
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Arbitrary bytes of any length.
    #[test]
    fn prop_random_bytes_no_panic(
        data in proptest::collection::vec(any::<u8>(), 0..MAX_DATAGRAM)
    ) {
        let _decoded = decode_packet(&data);
    }

    /// A valid format and packet id with random body length and content.
    #[test]
    fn prop_known_header_random_body_no_panic(
        data in proptest::collection::vec(any::<u8>(), 0..MAX_DATAGRAM),
        epoch_idx in 0usize..3,
        packet_id in 0u8..14,
    ) {
        let epoch = ProtocolEpoch::ALL[epoch_idx];
        let raw = with_header(data, epoch.packet_format(), packet_id);
        let _decoded = decode_packet(&raw);
    }

    /// Exactly-sized bodies with random content always decode.
    #[test]
    fn prop_exact_size_random_content_decodes(
        seed in proptest::collection::vec(any::<u8>(), 1400..=1400),
        epoch_idx in 0usize..3,
        packet_id in 1u8..12,
    ) {
        let epoch = ProtocolEpoch::ALL[epoch_idx];
        let Some(kind) = epoch.packet_kind(packet_id) else {
            return Ok(());
        };
        let Some(size) = epoch.expected_size(kind) else {
            return Ok(());
        };
        let mut data = seed;
        data.truncate(size);
        let raw = with_header(data, epoch.packet_format(), packet_id);
        let decoded = decode_packet(&raw);
        prop_assert!(matches!(decoded, Ok(Some(_))), "{epoch} {kind:?}: {decoded:?}");
    }
}
