//! Live PCM stream pipeline
//!
//! Bridges the asynchronous network receiver and the real-time audio
//! render callback: frame decoding, jitter buffering, playback, latency
//! measurement and supervised reconnection.

pub mod chunk;
pub mod health;
pub mod jitter;
pub mod latency;
pub mod meter;
pub mod receiver;
pub mod render;
pub mod session;
pub mod state;
