//! Timestamped sample chunks and the binary wire frame

use crate::assets::FRAME_HEADER_BYTES;
use bytes::Buf;

const I16_TO_F32: f32 = 1.0 / 32768.0;

/// A block of decoded audio samples tagged with its origin timestamp.
///
/// The timestamp is in seconds on the producer clock and is assumed to be
/// monotonically non-decreasing at the source. Samples are normalized to
/// [-1.0, 1.0]. A chunk is immutable once created; ownership moves from
/// the receiver into the jitter buffer and from there into the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleChunk {
    /// Origin timestamp, seconds since an epoch shared with the sender
    pub timestamp: f64,
    /// Normalized mono samples
    pub samples: Vec<f32>,
}

impl SampleChunk {
    pub fn new(timestamp: f64, samples: Vec<f32>) -> Self {
        Self { timestamp, samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Decode one wire frame into a chunk.
    ///
    /// Layout: bytes [0, 8) are a little-endian IEEE-754 double holding the
    /// origin timestamp, the rest is a run of little-endian signed 16-bit
    /// mono PCM samples. Frames of 8 bytes or less carry no samples and are
    /// malformed; they yield `None` and the caller drops them silently.
    pub fn from_frame(mut frame: &[u8]) -> Option<SampleChunk> {
        if frame.len() <= FRAME_HEADER_BYTES {
            return None;
        }

        let timestamp = frame.get_f64_le();

        let mut samples = Vec::with_capacity(frame.remaining() / 2);
        while frame.remaining() >= 2 {
            samples.push(frame.get_i16_le() as f32 * I16_TO_F32);
        }

        Some(SampleChunk { timestamp, samples })
    }
}
