//! Audio output
//!
//! The cpal output stream is not `Send`, so it lives on a dedicated
//! playback thread. Play requests reach that thread over a channel: the
//! caller only looks the clip up and enqueues it, never touching the device.
//! The playback thread adds every requested clip to a mixer, so clips
//! overlap and each one runs to completion independently.
//!
//! The device stream is opened with a fixed buffer sized from the configured
//! latency target. Devices that refuse that size fall back to their default.

use super::catalog::{Clip, SoundCatalog};
use super::Player;
use crate::config::OutputConfig;
use crate::error::PlaybackError;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rodio::dynamic_mixer::{self, DynamicMixerController};
use rodio::Source;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Device name meaning "the system default output"
pub const DEFAULT_DEVICE: &str = "default";

/// Independent playback cursor over a shared clip
struct ClipSource {
    clip: Arc<Clip>,
    position: usize,
}

impl ClipSource {
    fn new(clip: Arc<Clip>) -> Self {
        Self { clip, position: 0 }
    }
}

impl Iterator for ClipSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let sample = self.clip.samples().get(self.position).copied()?;
        self.position += 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.clip.samples().len() - self.position;
        (remaining, Some(remaining))
    }
}

impl Source for ClipSource {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.clip.samples().len() - self.position)
    }

    fn channels(&self) -> u16 {
        self.clip.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.clip.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(self.clip.duration())
    }
}

/// Non-blocking handle for requesting playback of catalog sounds
#[derive(Clone)]
pub struct PlaybackQueue {
    catalog: Arc<SoundCatalog>,
    tx: mpsc::UnboundedSender<Arc<Clip>>,
}

impl PlaybackQueue {
    /// Create a queue and the receiving end a playback thread drains
    pub fn new(catalog: Arc<SoundCatalog>) -> (Self, mpsc::UnboundedReceiver<Arc<Clip>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { catalog, tx }, rx)
    }

    pub fn catalog(&self) -> &SoundCatalog {
        &self.catalog
    }
}

impl Player for PlaybackQueue {
    fn play(&self, name: &str) -> Result<(), PlaybackError> {
        let clip = self
            .catalog
            .get(name)
            .ok_or_else(|| PlaybackError::UnknownSound(name.to_string()))?;

        self.tx.send(clip).map_err(|_| PlaybackError::QueueClosed)
    }
}

/// Audio output device with its playback thread
///
/// The thread exits once every `PlaybackQueue` handed out has been dropped.
pub struct AudioOutput {
    queue: PlaybackQueue,
}

impl AudioOutput {
    /// Open the configured output device and start the playback thread
    pub fn open(config: &OutputConfig, catalog: Arc<SoundCatalog>) -> Result<Self, PlaybackError> {
        let (queue, rx) = PlaybackQueue::new(catalog);
        let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel(1);
        let config = config.clone();

        std::thread::Builder::new()
            .name("keyclack-playback".to_string())
            .spawn(move || {
                let output = match open_stream(&config) {
                    Ok(output) => {
                        let _ = ready_tx.send(Ok(()));
                        output
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                playback_loop(&output.mixer, rx);
            })
            .map_err(|e| PlaybackError::Output(format!("Failed to spawn playback thread: {}", e)))?;

        ready_rx.recv().map_err(|_| PlaybackError::QueueClosed)??;

        Ok(Self { queue })
    }

    /// A handle for enqueueing sounds
    pub fn queue(&self) -> PlaybackQueue {
        self.queue.clone()
    }

    /// Play one sound and block until it has finished
    pub fn play_and_wait(&self, name: &str) -> Result<(), PlaybackError> {
        let duration = self
            .queue
            .catalog()
            .get(name)
            .map(|clip| clip.duration())
            .ok_or_else(|| PlaybackError::UnknownSound(name.to_string()))?;

        self.queue.play(name)?;
        // Allow for the device buffer on top of the clip itself
        std::thread::sleep(duration + Duration::from_millis(200));
        Ok(())
    }
}

/// A running output stream and the mixer feeding it
struct MixedOutput {
    stream: cpal::Stream,
    mixer: Arc<DynamicMixerController<f32>>,
}

/// Drain play requests until every sender is gone
///
/// Each clip is added to the mixer as its own source, so it starts at once
/// and plays to its end alongside any clips already running.
fn playback_loop(
    mixer: &DynamicMixerController<f32>,
    mut rx: mpsc::UnboundedReceiver<Arc<Clip>>,
) {
    while let Some(clip) = rx.blocking_recv() {
        mixer.add(ClipSource::new(clip));
    }

    tracing::debug!("Playback queue closed, stopping playback thread");
}

/// Find an output device by name, or the default one
fn find_device(name: &str) -> Result<cpal::Device, PlaybackError> {
    let host = cpal::default_host();

    if name == DEFAULT_DEVICE {
        return host
            .default_output_device()
            .ok_or_else(|| PlaybackError::DeviceNotFound(name.to_string()));
    }

    host.output_devices()
        .map_err(|e| PlaybackError::Output(e.to_string()))?
        .find(|device| device.name().map(|n| n == name).unwrap_or(false))
        .ok_or_else(|| PlaybackError::DeviceNotFound(name.to_string()))
}

/// Pick a stream configuration running at the requested sample rate,
/// preferring f32 stereo
fn stream_config_for(
    device: &cpal::Device,
    sample_rate: u32,
) -> Option<cpal::SupportedStreamConfig> {
    let rate = cpal::SampleRate(sample_rate);

    let mut ranges: Vec<_> = device
        .supported_output_configs()
        .ok()?
        .filter(|range| range.min_sample_rate() <= rate && rate <= range.max_sample_rate())
        .collect();

    ranges.sort_by_key(|range| {
        (
            range.sample_format() != cpal::SampleFormat::F32,
            range.channels() != 2,
        )
    });

    ranges.into_iter().next().map(|range| range.with_sample_rate(rate))
}

/// Frames of device buffering for a latency target
pub fn buffer_frames(sample_rate: u32, latency_ms: u32) -> u32 {
    let frames = u64::from(sample_rate) * u64::from(latency_ms) / 1000;
    frames.clamp(1, u64::from(u32::MAX)) as u32
}

/// Bring a requested buffer size inside what the device reports it supports
fn fit_buffer(frames: u32, supported: &cpal::SupportedBufferSize) -> u32 {
    match *supported {
        cpal::SupportedBufferSize::Range { min, max } => frames.max(min).min(max),
        cpal::SupportedBufferSize::Unknown => frames,
    }
}

/// Build an output stream of sample type `T` pulling from a fresh mixer
fn build_mixed<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
) -> Result<MixedOutput, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let (mixer, mut source) = dynamic_mixer::mixer::<f32>(config.channels, config.sample_rate.0);

    let stream = device.build_output_stream::<T, _, _>(
        config,
        move |data: &mut [T], _| {
            for sample in data.iter_mut() {
                // The mixer yields nothing while no clip is playing
                *sample = source.next().map(T::from_sample).unwrap_or(T::EQUILIBRIUM);
            }
        },
        |err| tracing::error!("Audio output stream error: {}", err),
        None,
    )?;

    Ok(MixedOutput {
        stream,
        mixer,
    })
}

fn build_for_format(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    format: cpal::SampleFormat,
) -> Result<MixedOutput, cpal::BuildStreamError> {
    match format {
        cpal::SampleFormat::F32 => build_mixed::<f32>(device, config),
        cpal::SampleFormat::F64 => build_mixed::<f64>(device, config),
        cpal::SampleFormat::I16 => build_mixed::<i16>(device, config),
        cpal::SampleFormat::I32 => build_mixed::<i32>(device, config),
        cpal::SampleFormat::U16 => build_mixed::<u16>(device, config),
        cpal::SampleFormat::U8 => build_mixed::<u8>(device, config),
        _ => Err(cpal::BuildStreamError::StreamConfigNotSupported),
    }
}

fn open_stream(config: &OutputConfig) -> Result<MixedOutput, PlaybackError> {
    let device = find_device(&config.device)?;
    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

    let supported = match stream_config_for(&device, config.sample_rate) {
        Some(supported) => supported,
        None => {
            tracing::warn!(
                "{} does not support {} Hz, using its default configuration",
                device_name,
                config.sample_rate
            );
            device
                .default_output_config()
                .map_err(|e| PlaybackError::Output(e.to_string()))?
        }
    };

    let sample_rate = supported.sample_rate().0;
    let frames = fit_buffer(
        buffer_frames(sample_rate, config.latency_ms),
        supported.buffer_size(),
    );
    let mut stream_config = supported.config();
    stream_config.buffer_size = cpal::BufferSize::Fixed(frames);

    let output = match build_for_format(&device, &stream_config, supported.sample_format()) {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!(
                "{} rejected a {} frame buffer ({}), using its default buffer size",
                device_name,
                frames,
                e
            );
            stream_config.buffer_size = cpal::BufferSize::Default;
            build_for_format(&device, &stream_config, supported.sample_format())
                .map_err(|e| PlaybackError::Output(e.to_string()))?
        }
    };

    output
        .stream
        .play()
        .map_err(|e| PlaybackError::Output(e.to_string()))?;

    tracing::info!(
        "Audio output: {} ({} Hz, {} channel(s), {:?} buffer)",
        device_name,
        sample_rate,
        stream_config.channels,
        stream_config.buffer_size
    );

    Ok(output)
}

/// Names of every output device, with the default one first
pub fn list_devices() -> Result<Vec<String>, PlaybackError> {
    let host = cpal::default_host();
    let default = host.default_output_device().and_then(|d| d.name().ok());

    let mut names: Vec<String> = host
        .output_devices()
        .map_err(|e| PlaybackError::Output(e.to_string()))?
        .filter_map(|device| device.name().ok())
        .collect();

    if let Some(default) = default {
        names.retain(|name| *name != default);
        names.insert(0, default);
    }

    Ok(names)
}
