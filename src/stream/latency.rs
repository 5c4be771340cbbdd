//! End-to-end latency measurement
//!
//! Sampled on every chunk arrival in the network domain, never in the
//! render callback. The value is only a display aid; nothing in the
//! pipeline acts on it.

use crate::utils::unix_now_secs;
use log::info;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Bit pattern marking "no measurement yet" (a quiet NaN, never produced
/// by a real measurement)
const IDLE_BITS: u64 = u64::MAX;

/// Tracks the delay between a chunk's origin timestamp and local
/// observation time.
///
/// Clones share the same cells, so the receiver writes and any consumer
/// reads without further coordination.
#[derive(Clone)]
pub struct LatencyMonitor {
    latency_bits: Arc<AtomicU64>,
    degraded: Arc<AtomicBool>,
    degraded_threshold_ms: f64,
}

impl LatencyMonitor {
    pub fn new(degraded_threshold_ms: f64) -> Self {
        Self {
            latency_bits: Arc::new(AtomicU64::new(IDLE_BITS)),
            degraded: Arc::new(AtomicBool::new(false)),
            degraded_threshold_ms,
        }
    }

    /// Record the latency of a chunk stamped `timestamp` (seconds on the
    /// sender clock) against the local wall clock.
    pub fn observe(&self, timestamp: f64) {
        self.observe_at(timestamp, unix_now_secs());
    }

    /// Same as [`observe`](Self::observe) with an explicit local time.
    pub fn observe_at(&self, timestamp: f64, local_now_secs: f64) {
        let latency_ms = (local_now_secs - timestamp) * 1000.0;
        self.latency_bits
            .store(latency_ms.to_bits(), Ordering::Relaxed);

        // two-state indicator: log only the transitions
        let degraded = latency_ms >= self.degraded_threshold_ms;
        if self.degraded.swap(degraded, Ordering::Relaxed) != degraded {
            if degraded {
                info!("latency degraded: {:.1} ms", latency_ms);
            } else {
                info!("latency nominal: {:.1} ms", latency_ms);
            }
        }
    }

    /// Last computed latency in milliseconds, `None` while idle.
    pub fn latency_ms(&self) -> Option<f64> {
        let bits = self.latency_bits.load(Ordering::Relaxed);
        if bits == IDLE_BITS {
            None
        } else {
            Some(f64::from_bits(bits))
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    /// Forget the last measurement (session stopped or restarted).
    pub fn clear(&self) {
        self.latency_bits.store(IDLE_BITS, Ordering::Relaxed);
        self.degraded.store(false, Ordering::Relaxed);
    }

    /// Display form: milliseconds with one decimal, or a placeholder
    /// while idle.
    pub fn display(&self) -> String {
        match self.latency_ms() {
            Some(ms) => format!("{:.1} ms", ms),
            None => "--".to_string(),
        }
    }
}
