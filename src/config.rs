use crate::assets::{
    DEFAULT_ENDPOINT, LATENCY_DEGRADED_MS, MAX_QUEUE_CHUNKS, OVERFLOW_KEEP_CHUNKS,
    RENDER_BLOCK_FRAMES, RETRY_DELAY_MS, SAMPLE_RATE,
};
use std::time::Duration;

/// Runtime configuration for a stream session.
///
/// One instance is built from the command line and handed to the session,
/// so no component reads settings from global state.
#[derive(Debug, Clone)]
pub struct Config {
    /// WebSocket endpoint of the PCM stream source
    pub endpoint: String,
    /// Output sample rate in Hz (must match the sender convention)
    pub sample_rate: u32,
    /// Frames requested per render callback
    pub render_block: u32,
    /// Maximum queued chunks before the overflow policy kicks in
    pub max_queue_chunks: usize,
    /// Chunks retained by the overflow truncation (newest first)
    pub overflow_keep: usize,
    /// Fixed delay before a reconnection attempt
    pub retry_delay: Duration,
    /// Latency at or above this is reported as degraded
    pub latency_degraded_ms: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            sample_rate: SAMPLE_RATE,
            render_block: RENDER_BLOCK_FRAMES,
            max_queue_chunks: MAX_QUEUE_CHUNKS,
            overflow_keep: OVERFLOW_KEEP_CHUNKS,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
            latency_degraded_ms: LATENCY_DEGRADED_MS,
        }
    }
}

/// Returns a version as specified in Cargo.toml
pub fn app_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

pub fn app_name() -> &'static str {
    env!("CARGO_PKG_NAME")
}
