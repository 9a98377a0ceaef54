//! Outbound side of the pipeline.
//!
//! The session state machine hands finalized [`records`] to a
//! [`SyncGateway`]. In the service the gateway is a [`QueuedGateway`] whose
//! [`SyncWorker`] pushes records through a [`RemoteApi`] using
//! [`SyncClient`]'s create-or-update logic.

#![deny(static_mut_refs)]

pub mod api;
pub mod client;
pub mod dry_run;
pub mod gateway;
pub mod records;
pub mod worker;

pub use api::{ApiResponse, RemoteApi, RemoteSession, STATUS_ALREADY_EXISTS};
pub use client::SyncClient;
pub use dry_run::DryRunApi;
pub use gateway::{
    DisabledGateway, RecordedSync, RecordingGateway, SyncConfirmation, SyncGateway, SyncOutcome,
};
pub use records::{
    CarSetupSnapshot, ClassificationRecord, LapRecord, LapSummary, PenaltyRecord, PlayerResult,
    SessionRecord, TIME_TRIAL_TOKEN, TelemetrySeries, WeatherToken,
};
pub use worker::{QueuedGateway, SyncJob, SyncWorker, WorkerStats};
