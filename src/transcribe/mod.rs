//! Speech-to-text transcription module
//!
//! The recognition engine is an external collaborator: it receives a WAV
//! file and a language hint and returns ordered text segments. Everything
//! about models, inference, and decoding lives behind the engine binary.

pub mod subprocess;

use crate::config::EngineConfig;
use crate::error::TranscribeError;
use std::path::Path;

/// One recognized segment, in engine order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
}

/// Trait for speech-to-text implementations
pub trait Transcriber: Send + Sync {
    /// Transcribe a WAV file to text segments.
    /// `language` is a hint; None means auto-detect.
    fn transcribe(
        &self,
        wav_path: &Path,
        language: Option<&str>,
    ) -> Result<Vec<Segment>, TranscribeError>;
}

/// Factory function to create the configured transcriber
pub fn create_transcriber(config: &EngineConfig) -> Result<Box<dyn Transcriber>, TranscribeError> {
    Ok(Box::new(subprocess::SubprocessTranscriber::new(config)?))
}

/// Concatenate segments in engine order, without any whitespace
/// normalization between them.
pub fn join_segments(segments: &[Segment]) -> String {
    segments.iter().map(|s| s.text.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_segments_preserves_engine_spacing() {
        let segments = vec![
            Segment {
                text: "Hello".to_string(),
            },
            Segment {
                text: " world".to_string(),
            },
        ];
        assert_eq!(join_segments(&segments), "Hello world");
    }

    #[test]
    fn test_join_segments_empty() {
        assert_eq!(join_segments(&[]), "");
    }
}
