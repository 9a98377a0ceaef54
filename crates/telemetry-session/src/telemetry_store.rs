//! Per-lap telemetry keyed by frame id, with rewind and restart cleanup.
//!
//! Lap distance is expected to grow within a lap. When it goes backwards the
//! store decides whether the player rewound (drop the now-future frames),
//! started a fresh lap without a lap counter change (keep only the newest
//! frame), or is still on an out-lap (drop the incoming frame).

use std::collections::{BTreeMap, BTreeSet};

use lapsync_telemetry_sync::TelemetrySeries;
use tracing::{debug, trace};

use crate::frame::TelemetryFrame;
use crate::heuristics::LapHeuristics;

/// Why a frame was not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The frame id was removed earlier and may not come back.
    Removed,
    /// Negative lap distance, before the start line.
    BeforeStartLine,
    /// Near-zero distance while the stored data is itself an out-lap.
    OutLapContinuation,
}

/// What happened to a frame passed to [`TelemetryFrameStore::record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Stored; distance not known yet so no cleanup ran.
    Deferred,
    /// Stored and accepted.
    Accepted,
    /// Stored after deleting frames at or beyond the new distance.
    Rewound { removed: usize },
    /// Stored after discarding every other frame.
    Restarted { removed: usize },
    /// Not stored.
    Dropped(DropReason),
}

#[derive(Debug, Clone, Default)]
pub struct TelemetryFrameStore {
    frames: BTreeMap<u32, TelemetryFrame>,
    removed: BTreeSet<u32>,
    last_distance: Option<f64>,
    heuristics: LapHeuristics,
}

impl TelemetryFrameStore {
    pub fn new(heuristics: LapHeuristics) -> Self {
        Self {
            heuristics,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, frame_id: u32) -> Option<&TelemetryFrame> {
        self.frames.get(&frame_id)
    }

    pub fn frame_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.frames.keys().copied()
    }

    pub fn last_distance(&self) -> Option<f64> {
        self.last_distance
    }

    pub fn is_removed(&self, frame_id: u32) -> bool {
        self.removed.contains(&frame_id)
    }

    /// Merge `sample` into frame `frame_id`, then run cleanup for it.
    pub fn record(&mut self, frame_id: u32, sample: &TelemetryFrame) -> FrameOutcome {
        if self.removed.contains(&frame_id) {
            return FrameOutcome::Dropped(DropReason::Removed);
        }
        let existing = self.frames.get(&frame_id).copied().unwrap_or_default();
        self.frames
            .insert(frame_id, TelemetryFrame::merge(&existing, sample));
        self.cleanup(frame_id)
    }

    fn cleanup(&mut self, frame_id: u32) -> FrameOutcome {
        let Some(distance) = self.frames.get(&frame_id).and_then(|f| f.lap_distance) else {
            return FrameOutcome::Deferred;
        };

        if distance < 0.0 {
            self.remove(frame_id);
            return FrameOutcome::Dropped(DropReason::BeforeStartLine);
        }

        let Some(last) = self.last_distance else {
            self.last_distance = Some(distance);
            return FrameOutcome::Accepted;
        };
        if distance >= last {
            self.last_distance = Some(distance);
            return FrameOutcome::Accepted;
        }

        let regression = last - distance;
        if regression < self.heuristics.flashback_threshold_m {
            let doomed: Vec<u32> = self
                .frames
                .iter()
                .filter(|(id, f)| **id != frame_id && f.lap_distance.is_some_and(|d| d >= distance))
                .map(|(id, _)| *id)
                .collect();
            for id in &doomed {
                self.remove(*id);
            }
            debug!(
                frame_id,
                distance,
                regression,
                removed = doomed.len(),
                "distance went backwards, treating as rewind"
            );
            self.last_distance = Some(distance);
            return FrameOutcome::Rewound {
                removed: doomed.len(),
            };
        }

        if distance < self.heuristics.new_lap_threshold_m {
            let earliest = self
                .frames
                .iter()
                .filter(|(id, _)| **id != frame_id)
                .find_map(|(_, f)| f.lap_distance);
            if earliest.is_some_and(|d| d < self.heuristics.new_lap_threshold_m) {
                trace!(frame_id, distance, "out-lap continuation, frame dropped");
                self.remove(frame_id);
                return FrameOutcome::Dropped(DropReason::OutLapContinuation);
            }

            let doomed: Vec<u32> = self
                .frames
                .keys()
                .copied()
                .filter(|id| *id != frame_id)
                .collect();
            for id in &doomed {
                self.remove(*id);
            }
            debug!(
                frame_id,
                distance,
                removed = doomed.len(),
                "lap restarted without a lap change"
            );
            self.last_distance = Some(distance);
            return FrameOutcome::Restarted {
                removed: doomed.len(),
            };
        }

        self.last_distance = Some(distance);
        FrameOutcome::Accepted
    }

    fn remove(&mut self, frame_id: u32) {
        self.frames.remove(&frame_id);
        self.removed.insert(frame_id);
    }

    /// Roll back to `frame_id` after a flashback event.
    ///
    /// Deletes every frame at or after `frame_id`, forgets the last distance
    /// and lifts removal markers at or after `frame_id` so replayed frames can
    /// be recorded again. Returns the number of frames deleted.
    pub fn flashback(&mut self, frame_id: u32) -> usize {
        let dropped = self.frames.split_off(&frame_id);
        self.removed.retain(|id| *id < frame_id);
        self.last_distance = None;
        dropped.len()
    }

    /// Columnar copy ordered by frame id.
    pub fn to_series(&self) -> TelemetrySeries {
        let mut series = TelemetrySeries::default();
        for (id, f) in &self.frames {
            series.frames.push(*id);
            series.lap_distance.push(f.lap_distance);
            series.lap_time.push(f.lap_time);
            series.speed.push(f.speed);
            series.brake.push(f.brake);
            series.throttle.push(f.throttle);
            series.gear.push(f.gear);
            series.steer.push(f.steer);
            series.drs.push(f.drs);
        }
        series
    }
}
