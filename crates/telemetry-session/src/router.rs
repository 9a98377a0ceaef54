//! Per-datagram protocol detection and processor lifecycle.

use std::sync::Arc;

use lapsync_errors::{DecodeError, ErrorSeverity};
use lapsync_telemetry_packets::{PacketKind, ProtocolEpoch, detect_epoch};
use lapsync_telemetry_sync::SyncGateway;
use tracing::{debug, info, warn};

use crate::heuristics::LapHeuristics;
use crate::metrics::PipelineMetrics;
use crate::processor::{Processor, processor_for};
use crate::session::Session;

/// What happened to one datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Decoded and applied to session state.
    Applied(PacketKind),
    /// Packet id not consumed by the active epoch.
    Ignored,
    /// Dropped without touching state.
    Dropped(DecodeError),
}

/// Routes every datagram to the processor for its protocol epoch.
///
/// The epoch is read from each datagram, so a game switch mid-stream is
/// picked up immediately. Switching epochs discards the previous processor
/// and its session.
pub struct GameVersionRouter {
    gateway: Arc<dyn SyncGateway>,
    heuristics: LapHeuristics,
    processor: Option<Box<dyn Processor>>,
    metrics: PipelineMetrics,
}

impl std::fmt::Debug for GameVersionRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameVersionRouter")
            .field("active_epoch", &self.active_epoch())
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl GameVersionRouter {
    pub fn new(gateway: Arc<dyn SyncGateway>, heuristics: LapHeuristics) -> Self {
        Self {
            gateway,
            heuristics,
            processor: None,
            metrics: PipelineMetrics::new(),
        }
    }

    pub fn active_epoch(&self) -> Option<ProtocolEpoch> {
        self.processor.as_ref().map(|p| p.epoch())
    }

    pub fn session(&self) -> Option<&Session> {
        self.processor.as_ref().and_then(|p| p.session())
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    pub fn route(&mut self, raw: &[u8]) -> RouteOutcome {
        self.metrics.record_datagram();

        let epoch = match detect_epoch(raw) {
            Ok(epoch) => epoch,
            Err(e) => {
                if matches!(e, DecodeError::UnknownFormat(_)) {
                    self.metrics.record_unknown_format();
                } else {
                    self.metrics.record_decode_failure();
                }
                log_drop(&e, raw.len());
                return RouteOutcome::Dropped(e);
            }
        };

        let previous = self.active_epoch();
        if previous != Some(epoch) {
            match previous {
                Some(from) => info!(%from, to = %epoch, "game version changed, session state reset"),
                None => info!(%epoch, "game version detected"),
            }
            self.metrics.record_epoch_switch();
        }
        let processor = match self.processor.take() {
            Some(p) if p.epoch() == epoch => self.processor.insert(p),
            _ => self.processor.insert(processor_for(
                epoch,
                self.gateway.clone(),
                self.heuristics,
            )),
        };

        match processor.process(raw) {
            Ok(Some(kind)) => {
                self.metrics.record_applied();
                RouteOutcome::Applied(kind)
            }
            Ok(None) => {
                self.metrics.record_ignored();
                RouteOutcome::Ignored
            }
            Err(e) => {
                self.metrics.record_decode_failure();
                log_drop(&e, raw.len());
                RouteOutcome::Dropped(e)
            }
        }
    }
}

fn log_drop(error: &DecodeError, len: usize) {
    match error.severity() {
        ErrorSeverity::Info => debug!(error = %error, len, "datagram dropped"),
        _ => warn!(error = %error, len, "datagram dropped"),
    }
}
