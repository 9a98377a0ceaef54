//! A single lap of the local player.

use lapsync_telemetry_sync::{CarSetupSnapshot, LapSummary};

use crate::heuristics::LapHeuristics;
use crate::telemetry_store::TelemetryFrameStore;

#[derive(Debug, Clone)]
pub struct Lap {
    pub lap_number: u8,
    pub sector1_time_ms: Option<u32>,
    pub sector2_time_ms: Option<u32>,
    pub sector3_time_ms: Option<u32>,
    /// Worst pit status seen this lap.
    pub pit_status: u8,
    pub car_position: Option<u8>,
    pub is_valid: bool,
    /// Visual tyre compound code.
    pub tyre_compound: Option<u8>,
    pub car_setup: Option<CarSetupSnapshot>,
    pub tyre_wear: Option<[f32; 4]>,
    /// The lap counter has moved past this lap.
    pub finished: bool,
    synced: bool,
    sync_attempted: bool,
    in_out_lap: bool,
    pub telemetry: TelemetryFrameStore,
}

impl Lap {
    pub fn new(lap_number: u8, heuristics: LapHeuristics) -> Self {
        Self {
            lap_number,
            sector1_time_ms: None,
            sector2_time_ms: None,
            sector3_time_ms: None,
            pit_status: 0,
            car_position: None,
            is_valid: true,
            tyre_compound: None,
            car_setup: None,
            tyre_wear: None,
            finished: false,
            synced: false,
            sync_attempted: false,
            in_out_lap: false,
            telemetry: TelemetryFrameStore::new(heuristics),
        }
    }

    pub fn has_all_sectors(&self) -> bool {
        self.sector1_time_ms.is_some()
            && self.sector2_time_ms.is_some()
            && self.sector3_time_ms.is_some()
    }

    pub fn lap_time_ms(&self) -> Option<u32> {
        Some(
            self.sector1_time_ms?
                .saturating_add(self.sector2_time_ms?)
                .saturating_add(self.sector3_time_ms?),
        )
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub fn sync_attempted(&self) -> bool {
        self.sync_attempted
    }

    /// Seen as a pit in-lap or out-lap at some point.
    pub fn is_in_out_lap(&self) -> bool {
        self.in_out_lap
    }

    pub(crate) fn mark_in_out_lap(&mut self) {
        self.in_out_lap = true;
    }

    /// Finished, fully timed and never pushed before.
    pub fn is_syncable(&self) -> bool {
        self.finished && self.has_all_sectors() && !self.synced && !self.sync_attempted
    }

    /// Sync outcomes are terminal for a lap: a failure is not retried.
    pub(crate) fn mark_sync_attempted(&mut self) {
        self.sync_attempted = true;
    }

    /// Once set, the flag is never cleared.
    pub(crate) fn mark_synced(&mut self) {
        self.synced = true;
    }

    /// Sector 1 and 2 with zero meaning "not measured".
    pub(crate) fn write_sectors(&mut self, sector1_ms: u32, sector2_ms: u32) {
        self.sector1_time_ms = (sector1_ms > 0).then_some(sector1_ms);
        self.sector2_time_ms = (sector2_ms > 0).then_some(sector2_ms);
    }

    /// `total_ms - s1 - s2` when positive, `None` otherwise or when s1/s2
    /// are unknown.
    pub(crate) fn derive_sector3(&self, total_ms: u32) -> Option<u32> {
        let s1 = i64::from(self.sector1_time_ms?);
        let s2 = i64::from(self.sector2_time_ms?);
        let s3 = i64::from(total_ms) - s1 - s2;
        u32::try_from(s3).ok().filter(|v| *v > 0)
    }

    pub fn summary(&self) -> LapSummary {
        LapSummary {
            lap_number: self.lap_number,
            sector1_time_ms: self.sector1_time_ms,
            sector2_time_ms: self.sector2_time_ms,
            sector3_time_ms: self.sector3_time_ms,
            pit_status: self.pit_status,
            is_valid: self.is_valid,
            synced: self.synced,
        }
    }
}
