//! Hub configuration.

use std::time::Duration;

/// Tunables for the [`Hub`](crate::Hub).
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Rooms with no interaction for longer than this are swept.
    pub idle_timeout: Duration,
    /// How often the sweeper runs.
    pub sweep_interval: Duration,
    /// Frames a connection may have queued before it is evicted.
    pub outbound_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(60 * 60),
            outbound_buffer: 256,
        }
    }
}
