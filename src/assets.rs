// stream format
pub const SAMPLE_RATE: u32 = 44_100;
pub const RENDER_BLOCK_FRAMES: u32 = 128;

// wire protocol: 8 byte LE f64 timestamp header, then LE i16 samples
pub const FRAME_HEADER_BYTES: usize = 8;

// jitter buffer
pub const MAX_QUEUE_CHUNKS: usize = 10;
pub const OVERFLOW_KEEP_CHUNKS: usize = 2;

// connection
pub const RETRY_DELAY_MS: u64 = 2_000;
pub const DEFAULT_ENDPOINT: &str = "ws://127.0.0.1:8765/audio";

// latency display
pub const LATENCY_DEGRADED_MS: f64 = 700.0;

// diagnostics
pub const HEALTH_LOG_INTERVAL_SECS: u64 = 30;
pub const STALL_WARN_SECS: u64 = 5;
