//! Stream session: lifecycle owner and reconnection supervisor
//!
//! One `StreamSession` owns everything a playing stream needs (buffer,
//! renderer, receiver task, counters) behind an explicit start/stop
//! lifecycle, replacing any notion of module-level connection globals.

use crate::assets::{HEALTH_LOG_INTERVAL_SECS, STALL_WARN_SECS};
use crate::config::Config;
use crate::stream::health::StreamHealth;
use crate::stream::jitter::{JitterConfig, SharedJitterBuffer};
use crate::stream::latency::LatencyMonitor;
use crate::stream::meter::OutputMeter;
use crate::stream::receiver::{Disconnect, TransportReceiver};
use crate::stream::render::AudioRenderer;
use crate::stream::state::{ConnectionState, StateCell};
use crate::utils::sos::SignalOfStop;
use anyhow::Result;
use log::{info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub struct StreamSession {
    config: Config,
    buffer: SharedJitterBuffer,
    health: Arc<StreamHealth>,
    latency: LatencyMonitor,
    meter: OutputMeter,
    state: StateCell,
    /// Set by an explicit stop; suppresses automatic reconnection until
    /// the next explicit start
    manually_stopped: Arc<AtomicBool>,
    sos: SignalOfStop,
    renderer: Option<AudioRenderer>,
    supervisor: Option<tokio::task::JoinHandle<()>>,
}

impl StreamSession {
    pub fn new(config: Config) -> Self {
        let jitter = JitterConfig {
            max_chunks: config.max_queue_chunks,
            keep_on_overflow: config.overflow_keep,
        };
        let latency = LatencyMonitor::new(config.latency_degraded_ms);

        Self {
            config,
            buffer: SharedJitterBuffer::new(jitter),
            health: Arc::new(StreamHealth::new()),
            latency,
            meter: OutputMeter::new(),
            state: StateCell::new(),
            manually_stopped: Arc::new(AtomicBool::new(false)),
            sos: SignalOfStop::new(),
            renderer: None,
            supervisor: None,
        }
    }

    /// Start playback and supervised reception.
    ///
    /// Opening the audio output is the one hard failure here: without a
    /// renderer there is no session, so the error is returned to the
    /// caller. Network failures never surface through this path; the
    /// supervisor retries them forever until an explicit stop.
    pub fn start(&mut self) -> Result<()> {
        if self.state.get().is_active() {
            return Ok(());
        }

        self.manually_stopped.store(false, Ordering::Relaxed);
        self.sos = SignalOfStop::new();
        self.latency.clear();
        self.meter.reset();

        self.renderer = Some(AudioRenderer::start(
            &self.config,
            self.buffer.clone(),
            self.health.clone(),
            self.meter.clone(),
        )?);

        self.supervisor = Some(tokio::spawn(run_supervisor(
            self.config.clone(),
            self.buffer.clone(),
            self.health.clone(),
            self.latency.clone(),
            self.state.clone(),
            self.sos.clone(),
            self.manually_stopped.clone(),
        )));

        // periodic diagnostics while the session lives
        let health = self.health.clone();
        let latency = self.latency.clone();
        let buffer = self.buffer.clone();
        let meter = self.meter.clone();
        let state = self.state.clone();
        self.sos.spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(HEALTH_LOG_INTERVAL_SECS));
            interval.tick().await;
            loop {
                interval.tick().await;
                info!(
                    "{}, latency: {}, queue: {} chunks, level: {:.3} rms",
                    health.summary(),
                    latency.display(),
                    buffer.queued_chunks(),
                    meter.rms()
                );
                if state.get().is_connected()
                    && health.is_stalled(Duration::from_secs(STALL_WARN_SECS))
                {
                    warn!("stream stalled: no frames for over {}s", STALL_WARN_SECS);
                }
            }
        });

        Ok(())
    }

    /// Stop playback and suppress further reconnection attempts.
    ///
    /// Safe to call at any time. Network callbacks that land after this
    /// carry a stale buffer epoch and are no-ops.
    pub fn stop(&mut self) {
        self.manually_stopped.store(true, Ordering::Relaxed);
        self.sos.cancel();

        // tears down the audio stream
        self.renderer = None;
        self.supervisor = None;

        self.buffer.reset();
        self.latency.clear();
        self.meter.reset();
        self.state.set(ConnectionState::Idle);
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    pub fn is_playing(&self) -> bool {
        self.state.get().is_active()
    }

    /// Last computed latency in milliseconds, `None` while idle
    pub fn latency_ms(&self) -> Option<f64> {
        self.latency.latency_ms()
    }

    pub fn latency_display(&self) -> String {
        self.latency.display()
    }

    pub fn health(&self) -> &Arc<StreamHealth> {
        &self.health
    }

    pub fn meter(&self) -> &OutputMeter {
        &self.meter
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.sos.cancel();
    }
}

/// Connection supervision loop.
///
/// `Idle → Connecting → Connected → (Closed | Errored) → Idle`, retrying
/// with a fixed delay until cancelled or manually stopped. Every entry
/// into `Connecting` resets the jitter buffer before any admission;
/// without that, the watermark of the previous session would reject the
/// new stream's chunks as out-of-order.
#[allow(clippy::too_many_arguments)]
async fn run_supervisor(
    config: Config,
    buffer: SharedJitterBuffer,
    health: Arc<StreamHealth>,
    latency: LatencyMonitor,
    state: StateCell,
    sos: SignalOfStop,
    manually_stopped: Arc<AtomicBool>,
) {
    loop {
        if sos.cancelled() || manually_stopped.load(Ordering::Relaxed) {
            break;
        }

        state.set(ConnectionState::Connecting);
        let epoch = buffer.reset();
        latency.clear();

        let mut receiver = TransportReceiver::new(
            config.endpoint.clone(),
            buffer.clone(),
            epoch,
            health.clone(),
            latency.clone(),
            state.clone(),
            sos.clone(),
        );

        let outcome = receiver.run().await;

        // an explicit stop owns the state cell from here on
        if sos.cancelled() || manually_stopped.load(Ordering::Relaxed) {
            break;
        }

        match outcome {
            Disconnect::Cancelled => break,
            Disconnect::Closed => {
                state.set(ConnectionState::Closed);
            }
            Disconnect::Errored => {
                state.set(ConnectionState::Errored);
            }
        }

        info!("reconnecting in {:?}", config.retry_delay);
        if sos.select(tokio::time::sleep(config.retry_delay)).await.is_none() {
            break;
        }
    }

    state.set(ConnectionState::Idle);
    info!("stream session supervisor ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            // nothing listens on a discard port
            endpoint: "ws://127.0.0.1:9/audio".to_string(),
            retry_delay: Duration::from_millis(10),
            ..Config::default()
        }
    }

    #[test]
    fn test_new_session_is_idle() {
        let session = StreamSession::new(Config::default());
        assert_eq!(session.state(), ConnectionState::Idle);
        assert!(!session.is_playing());
        assert_eq!(session.latency_ms(), None);
        assert_eq!(session.latency_display(), "--");
    }

    #[test]
    fn test_stop_before_start_is_a_noop() {
        let mut session = StreamSession::new(Config::default());
        session.stop();
        assert_eq!(session.state(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_supervisor_retries_until_cancelled() {
        let config = test_config();
        let buffer = SharedJitterBuffer::new(JitterConfig::default());
        let health = Arc::new(StreamHealth::new());
        let latency = LatencyMonitor::new(700.0);
        let state = StateCell::new();
        let sos = SignalOfStop::new();
        let stopped = Arc::new(AtomicBool::new(false));

        let epoch_before = buffer.epoch();

        let handle = tokio::spawn(run_supervisor(
            config,
            buffer.clone(),
            health,
            latency,
            state.clone(),
            sos.clone(),
            stopped,
        ));

        // let a few failed attempts happen
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(buffer.epoch() > epoch_before + 1, "expected repeated resets");

        sos.cancel();
        handle.await.unwrap();
        assert_eq!(state.get(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn test_supervisor_respects_manual_stop() {
        let config = test_config();
        let buffer = SharedJitterBuffer::new(JitterConfig::default());
        let state = StateCell::new();
        let sos = SignalOfStop::new();
        let stopped = Arc::new(AtomicBool::new(true));

        let handle = tokio::spawn(run_supervisor(
            config,
            buffer,
            Arc::new(StreamHealth::new()),
            LatencyMonitor::new(700.0),
            state.clone(),
            sos,
            stopped,
        ));

        handle.await.unwrap();
        assert_eq!(state.get(), ConnectionState::Idle);
    }
}
