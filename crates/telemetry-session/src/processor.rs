//! One packet processor per protocol epoch.

use std::sync::Arc;

use lapsync_errors::DecodeResult;
use lapsync_telemetry_packets::{PacketKind, ProtocolEpoch, f1_2020, f1_2021, f1_2022};
use lapsync_telemetry_sync::SyncGateway;

use crate::heuristics::LapHeuristics;
use crate::session::Session;
use crate::state_machine::SessionStateMachine;

/// Decodes datagrams of one epoch and applies them to that epoch's session
/// state.
pub trait Processor: Send {
    fn epoch(&self) -> ProtocolEpoch;

    /// Decode and apply one datagram. `Ok(None)` means the packet id is not
    /// consumed by this epoch.
    fn process(&mut self, raw: &[u8]) -> DecodeResult<Option<PacketKind>>;

    fn session(&self) -> Option<&Session>;
}

/// F1 2020: no event, damage or history packets; lap times on the wire are
/// float seconds.
#[derive(Debug)]
pub struct F2020Processor {
    state: SessionStateMachine,
}

impl F2020Processor {
    pub fn new(gateway: Arc<dyn SyncGateway>, heuristics: LapHeuristics) -> Self {
        Self {
            state: SessionStateMachine::new(ProtocolEpoch::F2020, gateway, heuristics),
        }
    }
}

impl Processor for F2020Processor {
    fn epoch(&self) -> ProtocolEpoch {
        ProtocolEpoch::F2020
    }

    fn process(&mut self, raw: &[u8]) -> DecodeResult<Option<PacketKind>> {
        let Some((header, packet)) = f1_2020::decode(raw)? else {
            return Ok(None);
        };
        self.state.apply(&header, &packet)?;
        Ok(Some(packet.kind()))
    }

    fn session(&self) -> Option<&Session> {
        self.state.session()
    }
}

/// F1 2021: adds events (penalties, flashbacks), car damage and session
/// history.
#[derive(Debug)]
pub struct F2021Processor {
    state: SessionStateMachine,
}

impl F2021Processor {
    pub fn new(gateway: Arc<dyn SyncGateway>, heuristics: LapHeuristics) -> Self {
        Self {
            state: SessionStateMachine::new(ProtocolEpoch::F2021, gateway, heuristics),
        }
    }
}

impl Processor for F2021Processor {
    fn epoch(&self) -> ProtocolEpoch {
        ProtocolEpoch::F2021
    }

    fn process(&mut self, raw: &[u8]) -> DecodeResult<Option<PacketKind>> {
        let Some((header, packet)) = f1_2021::decode(raw)? else {
            return Ok(None);
        };
        self.state.apply(&header, &packet)?;
        Ok(Some(packet.kind()))
    }

    fn session(&self) -> Option<&Session> {
        self.state.session()
    }
}

/// F1 2022: same packet set as 2021 with wider session, lap data, event,
/// damage and classification layouts.
#[derive(Debug)]
pub struct F2022Processor {
    state: SessionStateMachine,
}

impl F2022Processor {
    pub fn new(gateway: Arc<dyn SyncGateway>, heuristics: LapHeuristics) -> Self {
        Self {
            state: SessionStateMachine::new(ProtocolEpoch::F2022, gateway, heuristics),
        }
    }
}

impl Processor for F2022Processor {
    fn epoch(&self) -> ProtocolEpoch {
        ProtocolEpoch::F2022
    }

    fn process(&mut self, raw: &[u8]) -> DecodeResult<Option<PacketKind>> {
        let Some((header, packet)) = f1_2022::decode(raw)? else {
            return Ok(None);
        };
        self.state.apply(&header, &packet)?;
        Ok(Some(packet.kind()))
    }

    fn session(&self) -> Option<&Session> {
        self.state.session()
    }
}

/// Build a fresh processor, with no session, for `epoch`.
pub fn processor_for(
    epoch: ProtocolEpoch,
    gateway: Arc<dyn SyncGateway>,
    heuristics: LapHeuristics,
) -> Box<dyn Processor> {
    match epoch {
        ProtocolEpoch::F2020 => Box::new(F2020Processor::new(gateway, heuristics)),
        ProtocolEpoch::F2021 => Box::new(F2021Processor::new(gateway, heuristics)),
        ProtocolEpoch::F2022 => Box::new(F2022Processor::new(gateway, heuristics)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapsync_telemetry_packets::{Packet, PacketHeader, SessionPacket, SessionType};
    use lapsync_telemetry_sync::DisabledGateway;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn factory_matches_epoch() {
        for epoch in ProtocolEpoch::ALL {
            let processor = processor_for(epoch, Arc::new(DisabledGateway), LapHeuristics::default());
            assert_eq!(processor.epoch(), epoch);
            assert!(processor.session().is_none());
        }
    }

    #[test]
    fn processes_session_packet() -> TestResult {
        let mut processor = F2022Processor::new(Arc::new(DisabledGateway), LapHeuristics::default());
        let header = PacketHeader::new(2022, 1, 5, 1);
        let packet = Packet::Session(SessionPacket {
            session_type_code: 13,
            session_type: Some(SessionType::TimeTrial),
            ..SessionPacket::default()
        });
        let raw = ProtocolEpoch::F2022
            .encode(&header, &packet)
            .ok_or("2022 encodes session packets")?;
        assert_eq!(processor.process(&raw)?, Some(PacketKind::Session));
        assert_eq!(
            processor.session().and_then(|s| s.session_type),
            Some(SessionType::TimeTrial)
        );
        Ok(())
    }

    #[test]
    fn motion_packet_is_not_consumed() -> TestResult {
        let mut processor = F2021Processor::new(Arc::new(DisabledGateway), LapHeuristics::default());
        let mut raw = 2021u16.to_le_bytes().to_vec();
        raw.resize(1464, 0);
        assert_eq!(processor.process(&raw)?, None);
        Ok(())
    }
}
