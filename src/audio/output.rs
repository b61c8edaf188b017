use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, Stream, StreamConfig};
use log::{debug, error};

use crate::audio::{resample, AudioOutput};
use crate::error::AudioError;
use crate::models::AudioBuffer;

/// Device-backed output stage.
///
/// One cpal stream is built at construction and runs for the lifetime of the
/// player, rendering silence when no run is installed. The hardware clock is
/// the number of frames the device callback has consumed, which advances in
/// real time whether or not anything audible is playing.
pub struct CpalOutput {
    _stream: Stream,
    shared: Arc<OutputShared>,
    sample_rate: u32,
    channels: u16,
    device_name: Option<String>,
}

struct OutputShared {
    clock_frames: AtomicU64,
    gain_bits: AtomicU32, // f32 stored as bits for atomic access
    run: Mutex<Option<RenderRun>>,
}

/// Transient state for one playback run; replaced wholesale on every
/// stop/pause/seek/switch.
struct RenderRun {
    samples: Vec<f32>,
    cursor: usize,
}

impl CpalOutput {
    /// Create the output stage on the preferred device, falling back to the
    /// host default when no preference is given.
    pub fn new(preferred_device: Option<&str>) -> Result<Self, AudioError> {
        let host = cpal::default_host();

        let device = match preferred_device {
            Some(name) => host
                .output_devices()
                .map_err(|e| AudioError::InitializationFailed(format!("device query: {}", e)))?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| AudioError::DeviceNotFound {
                    device: name.to_string(),
                })?,
            None => host
                .default_output_device()
                .ok_or_else(|| {
                    AudioError::InitializationFailed("no output device available".to_string())
                })?,
        };

        let default_config = device.default_output_config().map_err(|e| {
            AudioError::InitializationFailed(format!("failed to get default config: {}", e))
        })?;

        let sample_rate = default_config.sample_rate().0;
        let channels = default_config.channels();
        let sample_format = default_config.sample_format();

        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let shared = Arc::new(OutputShared {
            clock_frames: AtomicU64::new(0),
            gain_bits: AtomicU32::new(1.0f32.to_bits()),
            run: Mutex::new(None),
        });

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(&device, &config, &shared)?,
            SampleFormat::I16 => Self::build_stream::<i16>(&device, &config, &shared)?,
            SampleFormat::U16 => Self::build_stream::<u16>(&device, &config, &shared)?,
            other => {
                return Err(AudioError::UnsupportedFormat {
                    format: format!("{:?}", other),
                })
            }
        };

        stream
            .play()
            .map_err(|e| AudioError::StreamError(format!("failed to start stream: {}", e)))?;

        let device_name = device.name().ok();
        debug!(
            "output stream on {:?}: {} Hz, {} channel(s)",
            device_name, sample_rate, channels
        );

        Ok(Self {
            _stream: stream,
            shared,
            sample_rate,
            channels,
            device_name,
        })
    }

    /// Name of the device the stream was built on, when the backend reports one
    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &StreamConfig,
        shared: &Arc<OutputShared>,
    ) -> Result<Stream, AudioError>
    where
        T: cpal::Sample + cpal::SizedSample + Send + 'static,
        T: cpal::FromSample<f32>,
    {
        let shared = Arc::clone(shared);
        let channels = config.channels as usize;

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    // The clock counts every frame the device consumes,
                    // including silence, so position math keeps advancing in
                    // real time.
                    let frames = data.len() / channels;
                    shared.clock_frames.fetch_add(frames as u64, Ordering::Relaxed);

                    let gain = f32::from_bits(shared.gain_bits.load(Ordering::Relaxed));
                    let mut run_guard = shared.run.lock().unwrap();

                    match run_guard.as_mut() {
                        Some(run) => {
                            for sample in data.iter_mut() {
                                let s = run.samples.get(run.cursor).copied().unwrap_or(0.0);
                                if run.cursor < run.samples.len() {
                                    run.cursor += 1;
                                }
                                *sample = cpal::Sample::from_sample(s * gain);
                            }
                            if run.cursor >= run.samples.len() {
                                // Drained; the playlist discovers this through
                                // clock arithmetic, not through a callback.
                                *run_guard = None;
                            }
                        }
                        None => {
                            for sample in data.iter_mut() {
                                *sample = cpal::Sample::from_sample(0.0f32);
                            }
                        }
                    }
                },
                move |err| {
                    error!("audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| AudioError::StreamError(format!("failed to build output stream: {}", e)))?;

        Ok(stream)
    }
}

impl AudioOutput for CpalOutput {
    fn now(&self) -> f64 {
        self.shared.clock_frames.load(Ordering::Relaxed) as f64 / self.sample_rate as f64
    }

    fn start(&mut self, buffer: Arc<AudioBuffer>, offset: f64) -> Result<(), AudioError> {
        let samples = resample::convert_for_device(&buffer, self.sample_rate, self.channels);
        let start_frame = (offset.max(0.0) * self.sample_rate as f64) as usize;
        let cursor = (start_frame * self.channels as usize).min(samples.len());

        *self.shared.run.lock().unwrap() = Some(RenderRun { samples, cursor });
        Ok(())
    }

    fn stop(&mut self) {
        *self.shared.run.lock().unwrap() = None;
    }

    fn set_gain(&mut self, gain: f32) {
        self.shared.gain_bits.store(gain.to_bits(), Ordering::Relaxed);
    }

    fn gain(&self) -> f32 {
        f32::from_bits(self.shared.gain_bits.load(Ordering::Relaxed))
    }
}
