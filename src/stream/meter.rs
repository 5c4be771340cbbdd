//! Post-buffer output level tap
//!
//! Written by the render callback after draining, read by any consumer at
//! its own rate (a waveform display, the status log). Values are not
//! synchronized to callback boundaries and do not need to be.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// RMS and peak level of the most recent output block.
#[derive(Clone, Default)]
pub struct OutputMeter {
    rms_bits: Arc<AtomicU32>,
    peak_bits: Arc<AtomicU32>,
}

impl OutputMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update from one rendered block. Called on the audio thread: two
    /// relaxed stores, no allocation, no locks.
    pub fn update(&self, block: &[f32]) {
        if block.is_empty() {
            return;
        }

        let mut sum_sq = 0.0f32;
        let mut peak = 0.0f32;
        for &s in block {
            sum_sq += s * s;
            peak = peak.max(s.abs());
        }
        let rms = (sum_sq / block.len() as f32).sqrt();

        self.rms_bits.store(rms.to_bits(), Ordering::Relaxed);
        self.peak_bits.store(peak.to_bits(), Ordering::Relaxed);
    }

    pub fn rms(&self) -> f32 {
        f32::from_bits(self.rms_bits.load(Ordering::Relaxed))
    }

    pub fn peak(&self) -> f32 {
        f32::from_bits(self.peak_bits.load(Ordering::Relaxed))
    }

    pub fn reset(&self) {
        self.rms_bits.store(0, Ordering::Relaxed);
        self.peak_bits.store(0, Ordering::Relaxed);
    }
}
