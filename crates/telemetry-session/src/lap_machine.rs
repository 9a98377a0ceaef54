//! Lap bookkeeping for the local player within one session.
//!
//! Lap-data packets arrive many times per second. The machine turns them into
//! one [`Lap`] per lap number, derives sector 3 (the game never sends it), and
//! keeps in-laps and out-laps from polluting timed laps.

use std::collections::BTreeMap;

use lapsync_telemetry_packets::{LapDataEntry, LapHistoryEntry, SessionCategory};
use tracing::{debug, trace};

use crate::frame::TelemetryFrame;
use crate::heuristics::LapHeuristics;
use crate::lap::Lap;
use crate::telemetry_store::FrameOutcome;

/// Effect of one lap-data entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LapDataUpdate {
    /// A lap number not seen before started.
    pub new_lap: bool,
    /// Lap finalized by this entry.
    pub finished_lap: Option<u8>,
    /// The current lap is an in-lap or out-lap; nothing was written.
    pub suppressed: bool,
    /// Outcome of recording the lap-data frame, when one was recorded.
    pub frame: Option<FrameOutcome>,
}

#[derive(Debug, Clone, Default)]
pub struct LapStateMachine {
    laps: BTreeMap<u8, Lap>,
    current_lap: Option<u8>,
    suppressed: bool,
    heuristics: LapHeuristics,
}

fn is_time_trial(category: Option<SessionCategory>) -> bool {
    category == Some(SessionCategory::TimeTrial)
}

impl LapStateMachine {
    pub fn new(heuristics: LapHeuristics) -> Self {
        Self {
            heuristics,
            ..Self::default()
        }
    }

    pub fn laps(&self) -> impl Iterator<Item = &Lap> {
        self.laps.values()
    }

    pub fn len(&self) -> usize {
        self.laps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.laps.is_empty()
    }

    pub fn get(&self, lap_number: u8) -> Option<&Lap> {
        self.laps.get(&lap_number)
    }

    pub(crate) fn get_mut(&mut self, lap_number: u8) -> Option<&mut Lap> {
        self.laps.get_mut(&lap_number)
    }

    pub fn current_lap_number(&self) -> Option<u8> {
        self.current_lap
    }

    pub fn current_lap(&self) -> Option<&Lap> {
        self.current_lap.and_then(|n| self.laps.get(&n))
    }

    pub fn current_lap_mut(&mut self) -> Option<&mut Lap> {
        self.current_lap.and_then(|n| self.laps.get_mut(&n))
    }

    /// Whether the current lap is being treated as an in-lap or out-lap.
    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Lap numbers ready to be pushed, in ascending order.
    pub fn syncable_laps(&self) -> Vec<u8> {
        self.laps
            .values()
            .filter(|lap| lap.is_syncable())
            .map(|lap| lap.lap_number)
            .collect()
    }

    /// Apply the player's lap-data entry observed at `frame_id`.
    pub fn apply_lap_data(
        &mut self,
        entry: &LapDataEntry,
        frame_id: u32,
        category: Option<SessionCategory>,
    ) -> LapDataUpdate {
        let time_trial = is_time_trial(category);
        let lap_number = entry.current_lap_num;
        let mut update = LapDataUpdate::default();

        if !self.laps.contains_key(&lap_number) {
            update.finished_lap = self.finalize_previous(entry.last_lap_time_ms, time_trial);
            self.laps
                .insert(lap_number, Lap::new(lap_number, self.heuristics));
            update.new_lap = true;
            debug!(lap = lap_number, "lap started");
        }
        self.current_lap = Some(lap_number);

        let inlap_threshold = self.heuristics.inlap_threshold_m;
        let Some(lap) = self.laps.get_mut(&lap_number) else {
            return update;
        };

        lap.pit_status = lap.pit_status.max(entry.pit_status);

        let suppressed = match category {
            Some(SessionCategory::Race | SessionCategory::OneShotQualifying) => {
                f64::from(entry.lap_distance) < inlap_threshold && lap.has_all_sectors()
            }
            Some(SessionCategory::Qualifying) => lap.pit_status > 0,
            _ => false,
        };
        if suppressed != self.suppressed {
            trace!(lap = lap_number, suppressed, "in/out-lap state changed");
        }
        self.suppressed = suppressed;
        update.suppressed = suppressed;
        if suppressed {
            if !lap.has_all_sectors() {
                lap.mark_in_out_lap();
            }
            return update;
        }

        if !lap.has_all_sectors() || time_trial {
            lap.write_sectors(
                u32::from(entry.sector1_time_ms),
                u32::from(entry.sector2_time_ms),
            );
        }
        if !lap.is_synced() || time_trial {
            // An invalidated lap stays invalid; a time trial restart clears it.
            if time_trial && lap.sector1_time_ms.is_none() {
                lap.is_valid = !entry.current_lap_invalid;
            } else {
                lap.is_valid &= !entry.current_lap_invalid;
            }
            lap.car_position = Some(entry.car_position);
        }

        if !lap.finished && lap.sector1_time_ms.is_some() && lap.sector2_time_ms.is_some() {
            lap.sector3_time_ms = lap.derive_sector3(entry.current_lap_time_ms);
        }

        let frame = TelemetryFrame::from_lap_data(entry.lap_distance, entry.current_lap_time_ms);
        update.frame = Some(lap.telemetry.record(frame_id, &frame));
        update
    }

    /// Close out the lap that was current before a new lap number appeared.
    fn finalize_previous(&mut self, last_lap_time_ms: u32, time_trial: bool) -> Option<u8> {
        let previous = self.current_lap?;
        let lap = self.laps.get_mut(&previous)?;
        if !lap.is_synced() || time_trial {
            if let Some(s3) = lap.derive_sector3(last_lap_time_ms) {
                lap.sector3_time_ms = Some(s3);
            }
        }
        lap.finished = true;
        debug!(
            lap = previous,
            last_lap_time_ms,
            sector3_ms = ?lap.sector3_time_ms,
            "lap finished"
        );
        Some(previous)
    }

    /// Close the current lap at session end when it is fully timed.
    pub fn finalize_current(&mut self) -> Option<u8> {
        let lap = self.current_lap_mut()?;
        if lap.finished || !lap.has_all_sectors() {
            return None;
        }
        lap.finished = true;
        Some(lap.lap_number)
    }

    /// Record car-telemetry fields for `frame_id` on the current lap.
    pub fn record_car_telemetry(
        &mut self,
        frame_id: u32,
        frame: &TelemetryFrame,
    ) -> Option<FrameOutcome> {
        if self.suppressed {
            return None;
        }
        let lap = self.current_lap_mut()?;
        Some(lap.telemetry.record(frame_id, frame))
    }

    /// Backfill sector times and validity from the game's own lap history.
    ///
    /// `history[i]` describes lap `i + 1`. Only laps already tracked, not
    /// yet synced and never seen as an in-lap or out-lap are touched;
    /// returns how many were written.
    pub fn apply_history(
        &mut self,
        history: &[LapHistoryEntry],
        category: Option<SessionCategory>,
    ) -> usize {
        let time_trial = is_time_trial(category);
        let mut written = 0;
        for (entry, lap_number) in history.iter().zip(1u8..) {
            if entry.lap_time_ms == 0 {
                continue;
            }
            let Some(lap) = self.laps.get_mut(&lap_number) else {
                continue;
            };
            if lap.is_synced() || lap.is_in_out_lap() || (lap.has_all_sectors() && !time_trial) {
                continue;
            }
            let nonzero = |ms: u16| (ms > 0).then_some(u32::from(ms));
            lap.sector1_time_ms = nonzero(entry.sector1_time_ms);
            lap.sector2_time_ms = nonzero(entry.sector2_time_ms);
            lap.sector3_time_ms = nonzero(entry.sector3_time_ms);
            lap.is_valid = entry.is_lap_valid();
            written += 1;
        }
        if written > 0 {
            debug!(written, "laps backfilled from session history");
        }
        written
    }

    /// Roll every lap's telemetry back to `frame_id`. Returns frames deleted.
    pub fn flashback(&mut self, frame_id: u32) -> usize {
        self.laps
            .values_mut()
            .map(|lap| lap.telemetry.flashback(frame_id))
            .sum()
    }
}
