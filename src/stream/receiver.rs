//! Transport receiver: one WebSocket connection attempt
//!
//! Parses inbound binary frames into sample chunks and feeds the jitter
//! buffer and the latency monitor. The receiver never retries on its own;
//! it reports how the connection ended and the session supervisor decides
//! what happens next. The protocol is fire-and-forget: nothing is ever
//! sent back, all congestion handling is local to the jitter buffer.

use crate::stream::chunk::SampleChunk;
use crate::stream::health::StreamHealth;
use crate::stream::jitter::{Admission, SharedJitterBuffer};
use crate::stream::latency::LatencyMonitor;
use crate::stream::state::{ConnectionState, StateCell};
use crate::utils::sos::SignalOfStop;
use async_tungstenite::tokio::connect_async;
use async_tungstenite::tungstenite::Message;
use futures_util::StreamExt;
use log::{debug, info, warn};
use std::sync::Arc;

/// How a connection attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disconnect {
    /// The transport closed normally
    Closed,
    /// Connect or read failed
    Errored,
    /// The session was stopped while the attempt was in flight
    Cancelled,
}

pub struct TransportReceiver {
    endpoint: String,
    buffer: SharedJitterBuffer,
    /// Buffer epoch this receiver admits under; a reset invalidates it
    epoch: u64,
    health: Arc<StreamHealth>,
    latency: LatencyMonitor,
    state: StateCell,
    sos: SignalOfStop,
}

impl TransportReceiver {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        endpoint: String,
        buffer: SharedJitterBuffer,
        epoch: u64,
        health: Arc<StreamHealth>,
        latency: LatencyMonitor,
        state: StateCell,
        sos: SignalOfStop,
    ) -> Self {
        Self {
            endpoint,
            buffer,
            epoch,
            health,
            latency,
            state,
            sos,
        }
    }

    /// Connect and consume messages until close, error or cancellation.
    pub async fn run(&mut self) -> Disconnect {
        let mut ws = match self.sos.select(connect_async(self.endpoint.as_str())).await {
            None => return Disconnect::Cancelled,
            Some(Ok((ws, _response))) => ws,
            Some(Err(e)) => {
                warn!("connect to {} failed: {}", self.endpoint, e);
                return Disconnect::Errored;
            }
        };

        self.state.set(ConnectionState::Connected);
        info!("connected to {}", self.endpoint);

        loop {
            let msg = match self.sos.select(ws.next()).await {
                None => return Disconnect::Cancelled,
                Some(None) => {
                    info!("stream ended");
                    return Disconnect::Closed;
                }
                Some(Some(Ok(msg))) => msg,
                Some(Some(Err(e))) => {
                    warn!("transport error: {}", e);
                    return Disconnect::Errored;
                }
            };

            match msg {
                Message::Binary(payload) => self.handle_frame(&payload),
                Message::Close(_) => {
                    info!("close frame received");
                    return Disconnect::Closed;
                }
                // text and ping/pong frames carry no audio
                _ => {}
            }
        }
    }

    /// Decode one binary frame and push it through the pipeline.
    ///
    /// Malformed frames are dropped without a response; stale chunks are
    /// rejected by the buffer; nothing here is an error the sender could
    /// act on.
    fn handle_frame(&self, frame: &[u8]) {
        let Some(chunk) = SampleChunk::from_frame(frame) else {
            self.health.record_malformed();
            return;
        };

        self.latency.observe(chunk.timestamp);

        match self.buffer.admit(chunk, self.epoch) {
            Admission::Accepted => self.health.record_frame(frame.len()),
            Admission::AcceptedDropped(n) => {
                self.health.record_frame(frame.len());
                self.health.record_overflow(n);
            }
            Admission::Stale => {
                debug!("dropped out-of-order chunk");
                self.health.record_stale();
            }
            Admission::Expired => {
                // buffer was reset while this frame was in flight
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::jitter::JitterConfig;

    fn make_receiver(buffer: SharedJitterBuffer, health: Arc<StreamHealth>) -> TransportReceiver {
        let epoch = buffer.epoch();
        TransportReceiver::new(
            "ws://127.0.0.1:1/audio".to_string(),
            buffer,
            epoch,
            health,
            LatencyMonitor::new(700.0),
            StateCell::new(),
            SignalOfStop::new(),
        )
    }

    fn frame(timestamp: f64, samples: &[i16]) -> Vec<u8> {
        let mut out = timestamp.to_le_bytes().to_vec();
        for s in samples {
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    #[test]
    fn test_malformed_frame_is_counted_and_dropped() {
        let buffer = SharedJitterBuffer::new(JitterConfig::default());
        let health = Arc::new(StreamHealth::new());
        let rx = make_receiver(buffer.clone(), health.clone());

        rx.handle_frame(&[0u8; 8]);
        rx.handle_frame(&[]);

        assert_eq!(health.malformed_frames(), 2);
        assert_eq!(health.frames_received(), 0);
        assert_eq!(buffer.queued_chunks(), 0);
    }

    #[test]
    fn test_frames_reach_the_buffer_in_order() {
        let buffer = SharedJitterBuffer::new(JitterConfig::default());
        let health = Arc::new(StreamHealth::new());
        let rx = make_receiver(buffer.clone(), health.clone());

        rx.handle_frame(&frame(1.0, &[100, 200]));
        rx.handle_frame(&frame(1.1, &[300]));

        assert_eq!(health.frames_received(), 2);
        assert_eq!(buffer.queued_chunks(), 2);
        assert_eq!(buffer.pending_samples(), 3);
    }

    #[test]
    fn test_stale_frame_is_rejected() {
        let buffer = SharedJitterBuffer::new(JitterConfig::default());
        let health = Arc::new(StreamHealth::new());
        let rx = make_receiver(buffer.clone(), health.clone());

        rx.handle_frame(&frame(5.0, &[1]));
        rx.handle_frame(&frame(4.0, &[2]));

        assert_eq!(health.frames_received(), 1);
        assert_eq!(health.stale_chunks(), 1);
        assert_eq!(buffer.queued_chunks(), 1);
    }

    #[test]
    fn test_expired_epoch_frame_is_ignored() {
        let buffer = SharedJitterBuffer::new(JitterConfig::default());
        let health = Arc::new(StreamHealth::new());
        let rx = make_receiver(buffer.clone(), health.clone());

        buffer.reset();
        rx.handle_frame(&frame(1.0, &[1]));

        assert_eq!(health.frames_received(), 0);
        assert_eq!(buffer.queued_chunks(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_reports_error() {
        let buffer = SharedJitterBuffer::new(JitterConfig::default());
        let health = Arc::new(StreamHealth::new());
        let mut rx = make_receiver(buffer, health);

        assert_eq!(rx.run().await, Disconnect::Errored);
    }

    #[tokio::test]
    async fn test_cancelled_before_connect() {
        let buffer = SharedJitterBuffer::new(JitterConfig::default());
        let health = Arc::new(StreamHealth::new());
        let mut rx = make_receiver(buffer, health);
        rx.sos.cancel();

        assert_eq!(rx.run().await, Disconnect::Cancelled);
    }
}
