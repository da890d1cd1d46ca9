//! Audio capture module
//!
//! Provides microphone recording via cpal, which works with PipeWire,
//! PulseAudio, and ALSA backends. The device is opened once at startup;
//! each recording session arms and disarms the same worker.

pub mod capture;
pub mod feedback;

use crate::config::AudioConfig;
use crate::error::AudioError;
use crate::session::AudioBuffer;

/// Trait for the audio capture worker.
///
/// `start` clears the buffer and arms the worker; `stop` disarms it and
/// hands the collected samples back (moved, not shared). `shutdown` stops
/// and closes the underlying stream; the worker is unusable afterwards.
#[async_trait::async_trait]
pub trait CaptureController: Send + Sync {
    async fn start(&mut self) -> Result<(), AudioError>;

    async fn stop(&mut self) -> Result<AudioBuffer, AudioError>;

    async fn shutdown(&mut self);
}

/// Open the audio device and spawn the capture worker.
///
/// Failure here is reported once at startup; the daemon keeps running and
/// rejects recording attempts instead of crashing.
pub fn create_capture(config: &AudioConfig) -> Result<Box<dyn CaptureController>, AudioError> {
    Ok(Box::new(capture::CpalCapture::new(config)?))
}
