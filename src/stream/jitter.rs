//! Jitter buffer between the network receiver and the render callback
//!
//! A bounded, ordered holding area for sample chunks with a single writer
//! (the transport receiver) and a single reader (the audio callback).
//! Admission enforces a non-decreasing timestamp watermark; overflow trades
//! completeness for recency by discarding the oldest queued chunks. The
//! reader side never waits: the shared wrapper only ever try-locks from the
//! render thread and substitutes silence when it loses the race.

use crate::stream::chunk::SampleChunk;
use log::debug;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Jitter buffer configuration
#[derive(Debug, Clone)]
pub struct JitterConfig {
    /// Maximum queued chunks before truncation
    pub max_chunks: usize,
    /// Chunks retained while truncating, newest first (minimum 2 to avoid
    /// flapping right at the bound)
    pub keep_on_overflow: usize,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            max_chunks: crate::assets::MAX_QUEUE_CHUNKS,
            keep_on_overflow: crate::assets::OVERFLOW_KEEP_CHUNKS,
        }
    }
}

/// What `admit` did with a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Appended to the queue
    Accepted,
    /// Appended, and the overflow policy then discarded this many older chunks
    AcceptedDropped(usize),
    /// Timestamp below the watermark, no state was changed
    Stale,
    /// The buffer was reset after this chunk was received, no state was changed
    Expired,
}

/// Bounded ordered queue of sample chunks plus the partially-consumed
/// remainder of the chunk currently being drained.
///
/// Not thread-safe by itself; see [`SharedJitterBuffer`].
pub struct JitterBuffer {
    queue: VecDeque<SampleChunk>,
    /// Samples of the chunk currently being consumed
    remainder: Vec<f32>,
    /// Next unread index into `remainder`
    cursor: usize,
    /// Highest timestamp accepted so far; chunks strictly below it are stale
    last_timestamp: f64,
    /// Generation counter, bumped on every reset
    epoch: u64,
    /// Latched when an admission exceeds the bound; cleared by the reader
    overflowed: bool,
    config: JitterConfig,
}

impl JitterBuffer {
    pub fn new(mut config: JitterConfig) -> Self {
        // a bound below the retained tail would make truncation meaningless
        config.max_chunks = config.max_chunks.max(2);
        config.keep_on_overflow = config.keep_on_overflow.clamp(1, config.max_chunks);

        Self {
            queue: VecDeque::with_capacity(config.max_chunks + 1),
            remainder: Vec::new(),
            cursor: 0,
            last_timestamp: 0.0,
            epoch: 0,
            overflowed: false,
            config,
        }
    }

    /// Admit a chunk received under the given epoch.
    ///
    /// Chunks from a previous session (epoch mismatch) and chunks whose
    /// timestamp is strictly below the watermark are rejected without any
    /// state change. A timestamp equal to the watermark is accepted; it
    /// does not violate ordering. On acceptance the watermark advances and
    /// the overflow policy truncates the queue to the newest entries if the
    /// bound was exceeded. Overflow latches: while the reader is not
    /// draining, every further admission keeps truncating, so a stalled
    /// reader comes back to the freshest audio instead of a full queue of
    /// old chunks. The latch clears on the next drain.
    pub fn admit(&mut self, chunk: SampleChunk, epoch: u64) -> Admission {
        if epoch != self.epoch {
            return Admission::Expired;
        }
        if chunk.timestamp < self.last_timestamp {
            return Admission::Stale;
        }

        self.last_timestamp = chunk.timestamp;
        self.queue.push_back(chunk);

        if self.queue.len() > self.config.max_chunks {
            self.overflowed = true;
        }
        if self.overflowed && self.queue.len() > self.config.keep_on_overflow {
            let drop_count = self.queue.len() - self.config.keep_on_overflow;
            self.queue.drain(..drop_count);
            debug!(
                "jitter overflow: dropped {} chunks, watermark {:.3}",
                drop_count, self.last_timestamp
            );
            return Admission::AcceptedDropped(drop_count);
        }

        Admission::Accepted
    }

    /// Fill `out` completely, consuming the remainder first and then
    /// successive queue entries.
    ///
    /// A partially used chunk becomes the new remainder. When queue and
    /// remainder run dry the rest of `out` is zero-filled, which is how an
    /// underrun reaches the caller; no error is raised. Returns the number
    /// of real (non-silence) samples written.
    pub fn drain(&mut self, out: &mut [f32]) -> usize {
        // the reader is consuming again, let the queue refill to the bound
        self.overflowed = false;

        let mut offset = 0;

        while offset < out.len() {
            if self.cursor >= self.remainder.len() {
                match self.queue.pop_front() {
                    Some(chunk) => {
                        self.remainder = chunk.samples;
                        self.cursor = 0;
                    }
                    None => break,
                }
                continue;
            }

            let need = out.len() - offset;
            let avail = self.remainder.len() - self.cursor;
            let n = need.min(avail);
            out[offset..offset + n]
                .copy_from_slice(&self.remainder[self.cursor..self.cursor + n]);
            self.cursor += n;
            offset += n;
        }

        out[offset..].fill(0.0);
        offset
    }

    /// Clear queue, remainder and watermark and bump the epoch.
    ///
    /// Any admission still in flight from before the reset carries the old
    /// epoch and becomes a no-op. The watermark drops back to zero so a new
    /// session with a fresh producer clock is not rejected as stale.
    pub fn reset(&mut self) -> u64 {
        self.queue.clear();
        self.remainder.clear();
        self.cursor = 0;
        self.last_timestamp = 0.0;
        self.overflowed = false;
        self.epoch = self.epoch.wrapping_add(1);
        self.epoch
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Number of whole chunks waiting in the queue (excludes the remainder)
    pub fn queued_chunks(&self) -> usize {
        self.queue.len()
    }

    /// Total samples pending: unread remainder plus all queued chunks
    pub fn pending_samples(&self) -> usize {
        let remainder = self.remainder.len() - self.cursor;
        remainder + self.queue.iter().map(|c| c.len()).sum::<usize>()
    }

    pub fn watermark(&self) -> f64 {
        self.last_timestamp
    }
}

/// Thread-safe handle to a [`JitterBuffer`], cloned into both domains.
///
/// The network domain locks; the render domain only try-locks so the audio
/// deadline can never be missed waiting on the writer.
#[derive(Clone)]
pub struct SharedJitterBuffer {
    inner: Arc<Mutex<JitterBuffer>>,
}

impl SharedJitterBuffer {
    pub fn new(config: JitterConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(JitterBuffer::new(config))),
        }
    }

    /// Admit from the network domain. Poisoned locks are treated as a
    /// dropped chunk; the render side never panics while holding the lock.
    pub fn admit(&self, chunk: SampleChunk, epoch: u64) -> Admission {
        match self.inner.lock() {
            Ok(mut buf) => buf.admit(chunk, epoch),
            Err(_) => Admission::Expired,
        }
    }

    /// Drain from the render domain without ever blocking.
    ///
    /// On lock contention the block is filled with silence and counted as
    /// zero real samples, which costs one block of audio instead of a
    /// missed deadline.
    pub fn try_drain(&self, out: &mut [f32]) -> usize {
        match self.inner.try_lock() {
            Ok(mut buf) => buf.drain(out),
            Err(_) => {
                out.fill(0.0);
                0
            }
        }
    }

    /// Reset the buffer and return the new epoch for subsequent admissions.
    pub fn reset(&self) -> u64 {
        match self.inner.lock() {
            Ok(mut buf) => buf.reset(),
            Err(poisoned) => poisoned.into_inner().reset(),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.inner.lock().map(|buf| buf.epoch()).unwrap_or(0)
    }

    pub fn queued_chunks(&self) -> usize {
        self.inner.lock().map(|buf| buf.queued_chunks()).unwrap_or(0)
    }

    pub fn pending_samples(&self) -> usize {
        self.inner
            .lock()
            .map(|buf| buf.pending_samples())
            .unwrap_or(0)
    }
}
