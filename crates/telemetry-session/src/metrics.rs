//! Pipeline counters.

/// Counters kept by the router. All counters are monotonically increasing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineMetrics {
    /// Datagrams handed to the router
    pub datagrams_received: u64,

    /// Packets decoded and applied to session state
    pub packets_applied: u64,

    /// Packets with an id the active epoch does not consume
    pub packets_ignored: u64,

    /// Datagrams that failed to decode
    pub decode_failures: u64,

    /// Datagrams whose format names no known epoch
    pub unknown_formats: u64,

    /// Number of times a new processor was built
    pub epoch_switches: u64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_datagram(&mut self) {
        self.datagrams_received = self.datagrams_received.saturating_add(1);
    }

    #[inline]
    pub fn record_applied(&mut self) {
        self.packets_applied = self.packets_applied.saturating_add(1);
    }

    #[inline]
    pub fn record_ignored(&mut self) {
        self.packets_ignored = self.packets_ignored.saturating_add(1);
    }

    #[inline]
    pub fn record_decode_failure(&mut self) {
        self.decode_failures = self.decode_failures.saturating_add(1);
    }

    #[inline]
    pub fn record_unknown_format(&mut self) {
        self.unknown_formats = self.unknown_formats.saturating_add(1);
    }

    #[inline]
    pub fn record_epoch_switch(&mut self) {
        self.epoch_switches = self.epoch_switches.saturating_add(1);
    }

    /// Datagrams that were dropped without touching state.
    pub fn dropped(&self) -> u64 {
        self.decode_failures.saturating_add(self.unknown_formats)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
