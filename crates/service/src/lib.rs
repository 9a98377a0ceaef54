//! Receive daemon for F1 2020–2022 UDP telemetry.
//!
//! [`receiver::UdpReceiver`] reads datagrams and hands them to a
//! [`GameVersionRouter`](lapsync_telemetry_session::GameVersionRouter);
//! finished records leave through whichever gateway the binary wires up.

#![deny(static_mut_refs)]

pub mod config;
pub mod receiver;

pub use config::{ServiceConfig, SyncSettings, largest_consumed_packet};
pub use receiver::{ReceiverReport, UdpReceiver};
