//! Audio renderer: the real-time consumer of the jitter buffer

use crate::config::Config;
use crate::stream::health::StreamHealth;
use crate::stream::jitter::SharedJitterBuffer;
use crate::stream::meter::OutputMeter;
use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{error, warn};
use std::sync::Arc;

/// Owns the cpal output stream for one session.
///
/// The device invokes the callback on its own real-time thread; each
/// invocation drains one block from the jitter buffer and writes it
/// straight to the output. The buffer handle is the only channel back to
/// the network domain: the callback never blocks (try-lock with silence
/// fallback inside `try_drain`), never allocates, and keeps running no
/// matter what the connection is doing. Dropping the renderer stops
/// playback.
pub struct AudioRenderer {
    _stream: cpal::Stream, // kept alive
}

unsafe impl Send for AudioRenderer {}

impl AudioRenderer {
    /// Open the default output device and start rendering.
    ///
    /// Failure here (no device, unusable configuration) is fatal to
    /// starting the stream and is reported to the caller instead of
    /// panicking.
    pub fn start(
        config: &Config,
        buffer: SharedJitterBuffer,
        health: Arc<StreamHealth>,
        meter: OutputMeter,
    ) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("No output audio device"))?;

        let fixed = cpal::StreamConfig {
            channels: 1,
            sample_rate: config.sample_rate,
            buffer_size: cpal::BufferSize::Fixed(config.render_block),
        };

        // not every backend honors a fixed block size
        let stream = match build_stream(&device, &fixed, buffer.clone(), health.clone(), meter.clone()) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(
                    "fixed block of {} frames not supported ({}), using device default",
                    config.render_block, e
                );
                let fallback = cpal::StreamConfig {
                    buffer_size: cpal::BufferSize::Default,
                    ..fixed
                };
                build_stream(&device, &fallback, buffer, health, meter)?
            }
        };
        stream.play()?;

        Ok(Self { _stream: stream })
    }
}

fn build_stream(
    device: &cpal::Device,
    stream_config: &cpal::StreamConfig,
    buffer: SharedJitterBuffer,
    health: Arc<StreamHealth>,
    meter: OutputMeter,
) -> Result<cpal::Stream, cpal::BuildStreamError> {
    device.build_output_stream(
        stream_config,
        move |output: &mut [f32], _| {
            let real = buffer.try_drain(output);
            if real < output.len() {
                health.record_underrun();
            }
            meter.update(output);
        },
        |err| error!("Audio output error: {}", err),
        None,
    )
}
