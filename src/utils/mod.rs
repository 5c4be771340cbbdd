pub mod sos;

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as seconds since the Unix epoch.
///
/// The sender stamps frames with the same epoch, so the difference is the
/// end-to-end latency (assuming reasonably synchronized clocks).
pub fn unix_now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
