//! cpal-based audio capture
//!
//! Uses the cpal crate for cross-platform audio input. The input stream is
//! opened once and owned by a dedicated worker thread (cpal streams are not
//! Send); recording sessions arm and disarm it. The stream callback checks
//! the armed flag before every append, so a chunk that races a stop is
//! simply dropped instead of requiring a lock around the whole session.

use super::CaptureController;
use crate::config::AudioConfig;
use crate::error::AudioError;
use crate::session::AudioBuffer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;

/// How long `stop` waits for the worker to hand the buffer over
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Commands sent to the capture worker thread
enum WorkerCommand {
    /// Clear the buffer and start appending
    Arm,
    /// Stop appending and hand the collected samples over
    Drain(oneshot::Sender<AudioBuffer>),
    /// Stop and close the stream, then exit
    Shutdown(oneshot::Sender<()>),
}

/// State shared between the controller, the worker thread, and the stream
/// callback
struct Shared {
    armed: AtomicBool,
    samples: Mutex<AudioBuffer>,
}

impl Shared {
    fn take_samples(&self) -> AudioBuffer {
        let mut guard = self.samples.lock().unwrap_or_else(|p| p.into_inner());
        std::mem::take(&mut *guard)
    }
}

/// cpal-based audio capture worker
pub struct CpalCapture {
    shared: Arc<Shared>,
    cmd_tx: std::sync::mpsc::Sender<WorkerCommand>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl CpalCapture {
    /// Open the configured input device and start the worker thread.
    ///
    /// Blocks until the worker reports whether the stream could be opened.
    pub fn new(config: &AudioConfig) -> Result<Self, AudioError> {
        let shared = Arc::new(Shared {
            armed: AtomicBool::new(false),
            samples: Mutex::new(Vec::new()),
        });

        let (cmd_tx, cmd_rx) = std::sync::mpsc::channel::<WorkerCommand>();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), AudioError>>();

        let worker_shared = shared.clone();
        let worker_config = config.clone();
        let thread_handle = thread::spawn(move || {
            worker_loop(worker_config, worker_shared, cmd_rx, ready_tx);
        });

        match ready_rx.recv_timeout(Duration::from_secs(10)) {
            Ok(Ok(())) => Ok(Self {
                shared,
                cmd_tx,
                thread_handle: Some(thread_handle),
            }),
            Ok(Err(e)) => {
                let _ = thread_handle.join();
                Err(e)
            }
            Err(_) => Err(AudioError::Connection(
                "Timed out waiting for the audio device to open".to_string(),
            )),
        }
    }
}

#[async_trait::async_trait]
impl CaptureController for CpalCapture {
    async fn start(&mut self) -> Result<(), AudioError> {
        self.cmd_tx
            .send(WorkerCommand::Arm)
            .map_err(|_| AudioError::WorkerGone)
    }

    async fn stop(&mut self) -> Result<AudioBuffer, AudioError> {
        // Disarm immediately; late callback chunks are dropped from here on
        self.shared.armed.store(false, Ordering::SeqCst);

        let (response_tx, response_rx) = oneshot::channel();
        if self.cmd_tx.send(WorkerCommand::Drain(response_tx)).is_err() {
            tracing::warn!("Capture worker is gone, draining buffer directly");
            return Ok(self.shared.take_samples());
        }

        match tokio::time::timeout(DRAIN_TIMEOUT, response_rx).await {
            Ok(Ok(samples)) => Ok(samples),
            _ => {
                // Tolerated: take whatever made it into the shared buffer
                tracing::warn!(
                    "Capture worker did not hand off within {:?}, draining buffer directly",
                    DRAIN_TIMEOUT
                );
                Ok(self.shared.take_samples())
            }
        }
    }

    async fn shutdown(&mut self) {
        self.shared.armed.store(false, Ordering::SeqCst);

        let (ack_tx, ack_rx) = oneshot::channel();
        if self.cmd_tx.send(WorkerCommand::Shutdown(ack_tx)).is_ok() {
            if tokio::time::timeout(DRAIN_TIMEOUT, ack_rx).await.is_err() {
                tracing::warn!("Capture worker did not acknowledge shutdown");
            }
        }

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
        tracing::debug!("Audio capture worker shut down");
    }
}

/// Worker thread: owns the cpal stream and services commands until shutdown
fn worker_loop(
    config: AudioConfig,
    shared: Arc<Shared>,
    cmd_rx: std::sync::mpsc::Receiver<WorkerCommand>,
    ready_tx: std::sync::mpsc::Sender<Result<(), AudioError>>,
) {
    use cpal::traits::StreamTrait;

    let stream = match open_stream(&config, shared.clone()) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(AudioError::StreamError(e.to_string())));
        return;
    }

    let _ = ready_tx.send(Ok(()));
    tracing::debug!("Audio capture worker started");

    while let Ok(command) = cmd_rx.recv() {
        match command {
            WorkerCommand::Arm => {
                shared.take_samples();
                shared.armed.store(true, Ordering::SeqCst);
            }
            WorkerCommand::Drain(response_tx) => {
                shared.armed.store(false, Ordering::SeqCst);
                let samples = shared.take_samples();
                tracing::debug!("Capture drained: {} samples", samples.len());
                let _ = response_tx.send(samples);
            }
            WorkerCommand::Shutdown(ack_tx) => {
                drop(stream);
                let _ = ack_tx.send(());
                tracing::debug!("Audio capture worker stopped");
                return;
            }
        }
    }
}

/// Open the input device and build a capture stream feeding the shared buffer
fn open_stream(config: &AudioConfig, shared: Arc<Shared>) -> Result<cpal::Stream, AudioError> {
    use cpal::traits::{DeviceTrait, HostTrait};

    let host = cpal::default_host();

    let device = if config.device == "default" {
        host.default_input_device()
            .ok_or_else(|| AudioError::DeviceNotFound("default".to_string()))?
    } else {
        find_audio_device(&host, &config.device)?
    };

    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
    tracing::info!("Using audio device: {}", device_name);

    let supported_config = device
        .default_input_config()
        .map_err(|e| AudioError::Connection(e.to_string()))?;

    let source_rate = supported_config.sample_rate().0;
    let source_channels = supported_config.channels() as usize;
    let sample_format = supported_config.sample_format();
    let target_rate = config.sample_rate;

    tracing::debug!(
        "Device config: {} Hz, {} channel(s), format: {:?}",
        source_rate,
        source_channels,
        sample_format
    );

    let stream_config = cpal::StreamConfig {
        channels: supported_config.channels(),
        sample_rate: supported_config.sample_rate(),
        buffer_size: cpal::BufferSize::Default,
    };

    // A single failed read is recoverable: log it and let the stream carry on
    let err_fn = |err| tracing::error!("Audio stream read error: {}", err);

    match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(
            &device,
            &stream_config,
            shared,
            source_rate,
            target_rate,
            source_channels,
            err_fn,
        ),
        cpal::SampleFormat::I16 => build_stream::<i16>(
            &device,
            &stream_config,
            shared,
            source_rate,
            target_rate,
            source_channels,
            err_fn,
        ),
        cpal::SampleFormat::U16 => build_stream::<u16>(
            &device,
            &stream_config,
            shared,
            source_rate,
            target_rate,
            source_channels,
            err_fn,
        ),
        format => Err(AudioError::Connection(format!(
            "Unsupported sample format: {:?}",
            format
        ))),
    }
}

/// Find an audio input device by name with flexible matching: exact first,
/// then case-insensitive, then substring.
fn find_audio_device(host: &cpal::Host, device_name: &str) -> Result<cpal::Device, AudioError> {
    use cpal::traits::{DeviceTrait, HostTrait};

    let devices: Vec<cpal::Device> = host
        .input_devices()
        .map_err(|e| AudioError::Connection(e.to_string()))?
        .collect();

    let search_lower = device_name.to_lowercase();

    let matched = devices
        .iter()
        .position(|d| d.name().map(|n| n == device_name).unwrap_or(false))
        .or_else(|| {
            devices
                .iter()
                .position(|d| d.name().map(|n| n.to_lowercase() == search_lower).unwrap_or(false))
        })
        .or_else(|| {
            devices.iter().position(|d| {
                d.name()
                    .map(|n| n.to_lowercase().contains(&search_lower))
                    .unwrap_or(false)
            })
        });

    match matched {
        Some(index) => {
            let device = devices.into_iter().nth(index);
            device.ok_or_else(|| AudioError::DeviceNotFound(device_name.to_string()))
        }
        None => Err(AudioError::DeviceNotFound(device_name.to_string())),
    }
}

/// Build an input stream for a specific sample type
fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    shared: Arc<Shared>,
    source_rate: u32,
    target_rate: u32,
    source_channels: usize,
    err_fn: impl Fn(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream, AudioError>
where
    T: cpal::Sample + cpal::SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    use cpal::traits::DeviceTrait;

    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                // Convert to f32 and mix to mono
                let mono: Vec<f32> = data
                    .chunks(source_channels)
                    .map(|frame| {
                        let sum: f32 = frame
                            .iter()
                            .map(|&s| <f32 as cpal::FromSample<T>>::from_sample_(s))
                            .sum();
                        sum / source_channels as f32
                    })
                    .collect();

                let resampled = if source_rate != target_rate {
                    resample(&mono, source_rate, target_rate)
                } else {
                    mono
                };

                append_chunk(&shared, &quantize(&resampled));
            },
            err_fn,
            None,
        )
        .map_err(|e| AudioError::StreamError(e.to_string()))?;

    Ok(stream)
}

/// Append a chunk to the session buffer, but only while armed.
/// Called from the audio backend's callback thread.
fn append_chunk(shared: &Shared, chunk: &[i16]) {
    if !shared.armed.load(Ordering::SeqCst) {
        return;
    }
    let mut guard = shared.samples.lock().unwrap_or_else(|p| p.into_inner());
    guard.extend_from_slice(chunk);
}

/// Linear interpolation resampling
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let new_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(new_len);

    for i in 0..new_len {
        let src_idx = i as f64 / ratio;
        let idx = src_idx.floor() as usize;
        let frac = (src_idx - idx as f64) as f32;

        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
        } else {
            samples.get(idx).copied().unwrap_or(0.0)
        };

        output.push(sample);
    }

    output
}

/// Convert f32 samples in [-1.0, 1.0] to 16-bit PCM
fn quantize(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_shared() -> Shared {
        Shared {
            armed: AtomicBool::new(false),
            samples: Mutex::new(Vec::new()),
        }
    }

    #[test]
    fn test_append_requires_armed() {
        let shared = test_shared();

        append_chunk(&shared, &[1, 2, 3]);
        assert!(shared.take_samples().is_empty());

        shared.armed.store(true, Ordering::SeqCst);
        append_chunk(&shared, &[1, 2, 3]);
        append_chunk(&shared, &[4, 5]);
        assert_eq!(shared.take_samples(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_append_after_disarm_is_dropped() {
        let shared = test_shared();
        shared.armed.store(true, Ordering::SeqCst);
        append_chunk(&shared, &[1, 2]);

        // A chunk racing the stop is dropped, not appended
        shared.armed.store(false, Ordering::SeqCst);
        append_chunk(&shared, &[3, 4]);
        assert_eq!(shared.take_samples(), vec![1, 2]);
    }

    #[test]
    fn test_resample_same_rate() {
        let samples = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(resample(&samples, 16000, 16000), samples);
    }

    #[test]
    fn test_resample_downsample() {
        let samples = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let result = resample(&samples, 48000, 16000);
        // 3:1 ratio, so 8 samples -> ~3 samples
        assert!(result.len() >= 2 && result.len() <= 4);
    }

    #[test]
    fn test_resample_upsample() {
        let samples = vec![1.0, 2.0];
        assert_eq!(resample(&samples, 8000, 16000).len(), 4);
    }

    #[test]
    fn test_resample_empty() {
        assert!(resample(&[], 48000, 16000).is_empty());
    }

    #[test]
    fn test_quantize_clamps() {
        let out = quantize(&[0.0, 1.0, -1.0, 2.0, -2.0]);
        assert_eq!(out[0], 0);
        assert_eq!(out[1], i16::MAX);
        assert_eq!(out[3], i16::MAX);
        assert_eq!(out[4], -i16::MAX);
    }
}
