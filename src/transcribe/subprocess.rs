//! Subprocess-based speech-to-text transcription
//!
//! Invokes whisper-cli (from whisper.cpp) as an external process on a WAV
//! file and parses its JSON output. Model size, compute device, and
//! numeric precision are forwarded to the engine unchanged; holdtype never
//! loads a model itself.

use super::{Segment, Transcriber};
use crate::config::EngineConfig;
use crate::error::TranscribeError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Model sizes the engine understands
const MODEL_SIZES: &[&str] = &["tiny", "base", "small", "medium", "large"];
const COMPUTE_DEVICES: &[&str] = &["cpu", "cuda"];
const COMPUTE_TYPES: &[&str] = &["int8", "float16", "float32"];

/// Subprocess transcriber driving an external engine binary
pub struct SubprocessTranscriber {
    /// Path to the engine binary
    command: PathBuf,
    model: String,
    device: String,
    compute_type: String,
    threads: usize,
}

/// JSON output structure from the engine
#[derive(Debug, Deserialize)]
struct EngineOutput {
    transcription: Vec<EngineSegment>,
}

#[derive(Debug, Deserialize)]
struct EngineSegment {
    text: String,
}

impl SubprocessTranscriber {
    pub fn new(config: &EngineConfig) -> Result<Self, TranscribeError> {
        validate_choice("engine.model", &config.model, MODEL_SIZES)?;
        validate_choice("engine.device", &config.device, COMPUTE_DEVICES)?;
        validate_choice("engine.compute_type", &config.compute_type, COMPUTE_TYPES)?;

        let command = resolve_engine_path(config.command.as_deref())?;

        // threads = 0 or None means auto-detect, use a sensible default
        let threads = match config.threads {
            Some(0) | None => num_cpus::get().min(4),
            Some(n) => n,
        };

        tracing::info!(
            "Using recognition engine {:?} (model {}, {} {})",
            command,
            config.model,
            config.device,
            config.compute_type
        );

        Ok(Self {
            command,
            model: config.model.clone(),
            device: config.device.clone(),
            compute_type: config.compute_type.clone(),
            threads,
        })
    }
}

impl Transcriber for SubprocessTranscriber {
    fn transcribe(
        &self,
        wav_path: &Path,
        language: Option<&str>,
    ) -> Result<Vec<Segment>, TranscribeError> {
        let start = std::time::Instant::now();

        // Temp base path for the engine's JSON output (engine appends .json)
        let temp_json = tempfile::Builder::new()
            .prefix("holdtype_out_")
            .tempfile()
            .map_err(|e| {
                TranscribeError::InvocationFailed(format!("Failed to create temp file: {}", e))
            })?;

        let output_base = temp_json
            .path()
            .to_str()
            .ok_or_else(|| TranscribeError::InvocationFailed("Invalid temp path".to_string()))?;

        let mut cmd = Command::new(&self.command);
        cmd.arg("--model")
            .arg(&self.model)
            .arg("--device")
            .arg(&self.device)
            .arg("--compute-type")
            .arg(&self.compute_type)
            .arg("--threads")
            .arg(self.threads.to_string())
            .arg("--file")
            .arg(wav_path)
            .arg("--output-json")
            .arg("--output-file")
            .arg(output_base)
            .arg("--no-prints");

        // Omit the language hint for auto-detection
        if let Some(language) = language {
            cmd.arg("--language").arg(language);
        }

        tracing::debug!("Running engine: {:?}", cmd);

        let output = cmd
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                TranscribeError::InvocationFailed(format!("Failed to run engine: {}", e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscribeError::InvocationFailed(format!(
                "Engine exited with error: {}",
                stderr.trim()
            )));
        }

        let json_path = format!("{}.json", output_base);
        let json_content = std::fs::read_to_string(&json_path).map_err(|e| {
            TranscribeError::BadOutput(format!("Failed to read engine output: {}", e))
        })?;
        let _ = std::fs::remove_file(&json_path);

        let result: EngineOutput = serde_json::from_str(&json_content)
            .map_err(|e| TranscribeError::BadOutput(format!("Failed to parse JSON: {}", e)))?;

        let segments: Vec<Segment> = result
            .transcription
            .into_iter()
            .map(|s| Segment { text: s.text })
            .collect();

        tracing::info!(
            "Transcription completed in {:.2}s ({} segments)",
            start.elapsed().as_secs_f32(),
            segments.len()
        );

        Ok(segments)
    }
}

fn validate_choice(option: &str, value: &str, choices: &[&str]) -> Result<(), TranscribeError> {
    if choices.contains(&value) {
        Ok(())
    } else {
        Err(TranscribeError::ConfigError(format!(
            "Invalid {} '{}'. Choices: {}",
            option,
            value,
            choices.join(", ")
        )))
    }
}

/// Resolve the engine binary path
fn resolve_engine_path(configured: Option<&str>) -> Result<PathBuf, TranscribeError> {
    // If explicitly configured, use that
    if let Some(path) = configured {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
        return Err(TranscribeError::EngineNotFound(format!(
            "Configured engine path not found: {}",
            path
        )));
    }

    // Check PATH, then common locations
    let candidates = [
        which::which("whisper-cli").ok(),
        which::which("faster-whisper").ok(),
        which::which("whisper").ok(),
        Some(PathBuf::from("/usr/local/bin/whisper-cli")),
        Some(PathBuf::from("/usr/bin/whisper-cli")),
        directories::BaseDirs::new().map(|d| d.home_dir().join(".local/bin/whisper-cli")),
    ];

    for candidate in candidates.into_iter().flatten() {
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(TranscribeError::EngineNotFound(
        "No engine binary found in PATH".to_string(),
    ))
}
