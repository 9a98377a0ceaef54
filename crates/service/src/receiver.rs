//! UDP receive loop.

use std::net::SocketAddr;
use std::time::Duration;

use lapsync_errors::LapSyncError;
use lapsync_telemetry_session::{GameVersionRouter, PipelineMetrics, RouteOutcome};
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, info, trace, warn};

use crate::config::ServiceConfig;

/// Summary of one receive run, logged at shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverReport {
    pub datagrams: u64,
    pub bytes: u64,
    pub receive_errors: u64,
    pub idle_timeouts: u64,
    pub metrics: PipelineMetrics,
}

/// Owns the bound socket and feeds every datagram to a router.
#[derive(Debug)]
pub struct UdpReceiver {
    socket: UdpSocket,
    recv_timeout: Duration,
    buf: Vec<u8>,
}

impl UdpReceiver {
    pub async fn bind(config: &ServiceConfig) -> lapsync_errors::Result<Self> {
        let socket = UdpSocket::bind(config.socket_addr()).await?;
        info!(addr = %socket.local_addr()?, "telemetry socket bound");
        Ok(Self {
            socket,
            recv_timeout: config.recv_timeout(),
            buf: vec![0u8; config.max_datagram_size],
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receive until `shutdown` fires or its sender is dropped.
    ///
    /// The shutdown signal is checked between datagrams and after every
    /// receive timeout, so the loop exits within one timeout of the signal.
    pub async fn run(
        &mut self,
        router: &mut GameVersionRouter,
        mut shutdown: broadcast::Receiver<()>,
    ) -> ReceiverReport {
        let mut report = ReceiverReport::default();

        loop {
            match shutdown.try_recv() {
                Err(TryRecvError::Empty) => {}
                Ok(()) | Err(TryRecvError::Closed) | Err(TryRecvError::Lagged(_)) => {
                    info!("shutdown requested, receive loop stopping");
                    break;
                }
            }

            let recv_result =
                tokio::time::timeout(self.recv_timeout, self.socket.recv(&mut self.buf)).await;
            let len = match recv_result {
                Ok(Ok(n)) => n,
                Ok(Err(err)) => {
                    let err = LapSyncError::from(err);
                    warn!(
                        error = %err,
                        category = %err.category(),
                        recoverable = err.is_recoverable(),
                        "UDP receive error"
                    );
                    report.receive_errors = report.receive_errors.saturating_add(1);
                    continue;
                }
                Err(_elapsed) => {
                    trace!("UDP receive timeout");
                    report.idle_timeouts = report.idle_timeouts.saturating_add(1);
                    continue;
                }
            };

            report.datagrams = report.datagrams.saturating_add(1);
            report.bytes = report.bytes.saturating_add(len as u64);

            let Some(datagram) = self.buf.get(..len) else {
                continue;
            };
            if let RouteOutcome::Applied(kind) = router.route(datagram) {
                debug!(packet = kind.name(), len, "packet applied");
            }
        }

        report.metrics = *router.metrics();
        report
    }
}
