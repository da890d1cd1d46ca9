//! Feedback sounds
//!
//! Provides short audio cues for recording start/stop and the shutdown
//! chime. Tones are generated programmatically to avoid shipping binary
//! assets. Playback is best-effort: failures are logged and ignored.

use crate::config::FeedbackConfig;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use std::time::Duration;

/// Sound event types
#[derive(Debug, Clone, Copy)]
pub enum SoundEvent {
    /// Recording started
    RecordingStart,
    /// Recording stopped
    RecordingStop,
    /// Daemon shutting down
    Done,
    /// Error occurred
    Error,
}

/// Feedback sound player
pub struct AudioFeedback {
    _stream: OutputStream,
    stream_handle: OutputStreamHandle,
    volume: f32,
    sounds: SoundSet,
}

struct SoundSet {
    start: Vec<u8>,
    stop: Vec<u8>,
    done: Vec<u8>,
    error: Vec<u8>,
}

impl AudioFeedback {
    pub fn new(config: &FeedbackConfig) -> Result<Self, String> {
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| format!("Failed to open audio output: {}", e))?;

        Ok(Self {
            _stream: stream,
            stream_handle,
            volume: config.volume.clamp(0.0, 1.0),
            sounds: SoundSet::generate(),
        })
    }

    /// Play a sound for the given event without waiting for it to finish
    pub fn play(&self, event: SoundEvent) {
        if let Err(e) = self.spawn_sink(event).map(Sink::detach) {
            tracing::warn!("Failed to play feedback sound: {}", e);
        }
    }

    /// Play a sound and wait for it to finish. Used for the shutdown chime,
    /// which would otherwise be cut off by process exit.
    pub fn play_blocking(&self, event: SoundEvent) {
        match self.spawn_sink(event) {
            Ok(sink) => sink.sleep_until_end(),
            Err(e) => tracing::warn!("Failed to play feedback sound: {}", e),
        }
    }

    fn spawn_sink(&self, event: SoundEvent) -> Result<Sink, String> {
        let data = match event {
            SoundEvent::RecordingStart => &self.sounds.start,
            SoundEvent::RecordingStop => &self.sounds.stop,
            SoundEvent::Done => &self.sounds.done,
            SoundEvent::Error => &self.sounds.error,
        };

        let cursor = Cursor::new(data.clone());
        let source = Decoder::new(cursor).map_err(|e| format!("Failed to decode tone: {}", e))?;

        let sink = Sink::try_new(&self.stream_handle)
            .map_err(|e| format!("Failed to create audio sink: {}", e))?;
        sink.append(source.amplify(self.volume));
        Ok(sink)
    }
}

impl SoundSet {
    fn generate() -> Self {
        Self {
            start: tone_wav(&[(880.0, 80)]),
            stop: tone_wav(&[(660.0, 80)]),
            // Two descending notes as the completion chime
            done: tone_wav(&[(660.0, 120), (440.0, 160)]),
            error: tone_wav(&[(220.0, 180)]),
        }
    }
}

/// Render a sequence of (frequency, duration-ms) notes as an in-memory WAV
fn tone_wav(notes: &[(f32, u32)]) -> Vec<u8> {
    const SAMPLE_RATE: u32 = 44100;
    const FADE: Duration = Duration::from_millis(10);

    let fade_samples = (SAMPLE_RATE as u64 * FADE.as_millis() as u64 / 1000) as usize;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        // Writing to an in-memory cursor cannot fail
        let mut writer = match hound::WavWriter::new(&mut cursor, spec) {
            Ok(writer) => writer,
            Err(_) => return Vec::new(),
        };

        for &(frequency, duration_ms) in notes {
            let num_samples = (SAMPLE_RATE * duration_ms / 1000) as usize;
            for i in 0..num_samples {
                let t = i as f32 / SAMPLE_RATE as f32;
                let mut amplitude = (2.0 * std::f32::consts::PI * frequency * t).sin();

                // Fade in/out envelope to avoid clicks
                if i < fade_samples {
                    amplitude *= i as f32 / fade_samples as f32;
                } else if i >= num_samples.saturating_sub(fade_samples) {
                    amplitude *= (num_samples - i) as f32 / fade_samples as f32;
                }

                if writer.write_sample((amplitude * 16000.0) as i16).is_err() {
                    return Vec::new();
                }
            }
        }

        if writer.finalize().is_err() {
            return Vec::new();
        }
    }

    cursor.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_wav_is_valid() {
        let data = tone_wav(&[(440.0, 100)]);
        let reader = hound::WavReader::new(Cursor::new(data)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(reader.len(), 4410);
    }

    #[test]
    fn test_chime_has_two_notes() {
        let one = tone_wav(&[(660.0, 120)]);
        let two = tone_wav(&[(660.0, 120), (440.0, 160)]);
        assert!(two.len() > one.len());
    }
}
