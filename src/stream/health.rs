//! Health counters for the stream pipeline

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Health metrics for a stream session
///
/// Tracks delivery and playback counters to monitor the pipeline.
/// All fields use atomic operations for thread-safe access; the render
/// callback only ever performs relaxed stores and increments here.
pub struct StreamHealth {
    /// Frames successfully decoded and forwarded to the jitter buffer
    pub frames_received: AtomicU64,

    /// Total payload bytes received
    pub bytes_received: AtomicU64,

    /// Frames of 8 bytes or less, dropped without a chunk
    pub malformed_frames: AtomicU64,

    /// Chunks rejected because their timestamp was below the watermark
    pub stale_chunks: AtomicU64,

    /// Chunks discarded by the overflow policy
    pub overflow_drops: AtomicU64,

    /// Render blocks that were partly or fully silence
    pub underrun_blocks: AtomicU64,

    /// Timestamp (Unix microseconds) of the last accepted frame
    pub last_frame_time: AtomicU64,
}

impl StreamHealth {
    pub fn new() -> Self {
        Self {
            frames_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            malformed_frames: AtomicU64::new(0),
            stale_chunks: AtomicU64::new(0),
            overflow_drops: AtomicU64::new(0),
            underrun_blocks: AtomicU64::new(0),
            last_frame_time: AtomicU64::new(0),
        }
    }

    /// Record a successfully admitted frame
    pub fn record_frame(&self, bytes: usize) {
        let now_micros = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros() as u64;
        self.last_frame_time.store(now_micros, Ordering::Relaxed);
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.malformed_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stale(&self) {
        self.stale_chunks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overflow(&self, dropped: usize) {
        self.overflow_drops
            .fetch_add(dropped as u64, Ordering::Relaxed);
    }

    pub fn record_underrun(&self) {
        self.underrun_blocks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    pub fn bytes_received(&self) -> u64 {
        self.bytes_received.load(Ordering::Relaxed)
    }

    pub fn malformed_frames(&self) -> u64 {
        self.malformed_frames.load(Ordering::Relaxed)
    }

    pub fn stale_chunks(&self) -> u64 {
        self.stale_chunks.load(Ordering::Relaxed)
    }

    pub fn overflow_drops(&self) -> u64 {
        self.overflow_drops.load(Ordering::Relaxed)
    }

    pub fn underrun_blocks(&self) -> u64 {
        self.underrun_blocks.load(Ordering::Relaxed)
    }

    /// Check if the stream has stalled (no frames for the given duration)
    pub fn is_stalled(&self, threshold: Duration) -> bool {
        let last = self.last_frame_time.load(Ordering::Relaxed);
        if last == 0 {
            return false;
        }
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros() as u64;
        now.saturating_sub(last) > threshold.as_micros() as u64
    }

    pub fn summary(&self) -> HealthSummary {
        HealthSummary {
            frames_received: self.frames_received(),
            bytes_received: self.bytes_received(),
            malformed_frames: self.malformed_frames(),
            stale_chunks: self.stale_chunks(),
            overflow_drops: self.overflow_drops(),
            underrun_blocks: self.underrun_blocks(),
        }
    }
}

impl Default for StreamHealth {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of health metrics
#[derive(Debug, Clone)]
pub struct HealthSummary {
    pub frames_received: u64,
    pub bytes_received: u64,
    pub malformed_frames: u64,
    pub stale_chunks: u64,
    pub overflow_drops: u64,
    pub underrun_blocks: u64,
}

impl std::fmt::Display for HealthSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Health: {} frames ({} bytes), {} malformed, {} stale, {} overflow drops, {} underrun blocks",
            self.frames_received,
            self.bytes_received,
            self.malformed_frames,
            self.stale_chunks,
            self.overflow_drops,
            self.underrun_blocks
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let health = StreamHealth::new();

        health.record_frame(1024);
        health.record_frame(512);
        health.record_malformed();
        health.record_stale();
        health.record_overflow(8);
        health.record_underrun();

        assert_eq!(health.frames_received(), 2);
        assert_eq!(health.bytes_received(), 1536);
        assert_eq!(health.malformed_frames(), 1);
        assert_eq!(health.stale_chunks(), 1);
        assert_eq!(health.overflow_drops(), 8);
        assert_eq!(health.underrun_blocks(), 1);
    }

    #[test]
    fn test_stall_detection() {
        let health = StreamHealth::new();

        // no frames yet: not considered stalled
        assert!(!health.is_stalled(Duration::from_millis(1)));

        health.record_frame(100);
        assert!(!health.is_stalled(Duration::from_secs(60)));

        std::thread::sleep(Duration::from_millis(5));
        assert!(health.is_stalled(Duration::from_millis(1)));
    }

    #[test]
    fn test_summary_format() {
        let health = StreamHealth::new();
        health.record_frame(64);

        let text = health.summary().to_string();
        assert!(text.contains("1 frames"));
        assert!(text.contains("64 bytes"));
    }
}
