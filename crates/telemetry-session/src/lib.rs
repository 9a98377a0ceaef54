//! Session, lap and telemetry reconstruction for the F1 UDP feed.
//!
//! The feed is lossy and the game is inconsistent: lap counters do not
//! always advance, players rewind with flashbacks, and packets for the same
//! frame arrive separately. This crate rebuilds a clean picture from it.
//!
//! - [`router::GameVersionRouter`] picks the protocol epoch per datagram
//!   and owns one [`processor::Processor`] at a time.
//! - [`state_machine::SessionStateMachine`] applies decoded packets to the
//!   single live [`session::Session`] and hands finished laps, sessions and
//!   penalties to a [`SyncGateway`](lapsync_telemetry_sync::SyncGateway).
//! - [`lap_machine::LapStateMachine`] tracks laps, derives sector 3 and
//!   suppresses in-laps and out-laps.
//! - [`telemetry_store::TelemetryFrameStore`] keeps per-frame telemetry for
//!   one lap and cleans it up after rewinds and restarts.
//!
//! Everything here runs on the receive loop. Nothing blocks, and nothing is
//! shared across threads except the gateway.

#![deny(static_mut_refs)]

pub mod frame;
pub mod heuristics;
pub mod lap;
pub mod lap_machine;
pub mod metrics;
pub mod penalty;
pub mod processor;
pub mod router;
pub mod session;
pub mod state_machine;
pub mod telemetry_store;

pub use frame::TelemetryFrame;
pub use heuristics::{
    DEFAULT_FLASHBACK_THRESHOLD_M, DEFAULT_INLAP_THRESHOLD_M, DEFAULT_NEW_LAP_THRESHOLD_M,
    LapHeuristics,
};
pub use lap::Lap;
pub use lap_machine::{LapDataUpdate, LapStateMachine};
pub use metrics::PipelineMetrics;
pub use penalty::record_penalty;
pub use processor::{F2020Processor, F2021Processor, F2022Processor, Processor, processor_for};
pub use router::{GameVersionRouter, RouteOutcome};
pub use session::Session;
pub use state_machine::{SessionState, SessionStateMachine};
pub use telemetry_store::{DropReason, FrameOutcome, TelemetryFrameStore};
