//! Configuration loading and types for holdtype
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/holdtype/config.toml)
//! 3. Environment variables (HOLDTYPE_*)
//! 4. CLI arguments (highest priority)

use crate::error::HoldtypeError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# Holdtype Configuration
#
# Location: ~/.config/holdtype/config.toml
# All settings can be overridden via CLI flags

[control]
# Keys that trigger recording while held (logical OR: any one of them works,
# first key held wins until it is released).
# Choices: alt, alt_l, alt_r, alt_gr, ctrl, ctrl_r, shift_l, shift_r, f12
keys = ["ctrl_r", "shift_r"]

# Releasing this key shuts the daemon down (same cleanup path as Ctrl+C)
quit_key = "esc"

[audio]
# Audio input device ("default" uses system default)
# List devices with: pactl list sources short
device = "default"

# Sample rate in Hz (speech engines expect 16000)
sample_rate = 16000

[engine]
# Recognition engine model size: tiny, base, small, medium, large
model = "base"

# Language hint for the engine ("auto" for auto-detection)
language = "de"

# Compute device: cpu or cuda
device = "cpu"

# Numeric precision: int8, float16, float32
compute_type = "int8"

# Path to the engine binary (omit to search PATH for whisper-cli)
# command = "/usr/local/bin/whisper-cli"

[inject]
# Window names that get an automatic confirm keystroke (Enter) after
# injection. Matched as substrings of the start window's title.
# Press space between recordings to skip the confirm once.
confirm_apps = ["Cursor"]

# After restoring the start window for injection, switch focus back to the
# window that was active when transcription finished
return_focus = true

[feedback]
# Play short tones on recording start/stop and a chime on shutdown
enabled = true

# Volume level (0.0 to 1.0)
volume = 0.7
"#;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub inject: InjectConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
}

/// Recording trigger configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlConfig {
    /// Keys that trigger recording while held (any one of them; first held wins)
    #[serde(default = "default_control_keys")]
    pub keys: Vec<String>,

    /// Releasing this key shuts the daemon down
    #[serde(default = "default_quit_key")]
    pub quit_key: String,
}

/// Audio capture configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioConfig {
    /// Input device name, or "default"
    #[serde(default = "default_device")]
    pub device: String,

    /// Sample rate in Hz (speech engines expect 16000)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

/// Recognition engine configuration
///
/// The engine is an external command; model size, compute device, and
/// precision are forwarded to it unchanged.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Model size: tiny, base, small, medium, large
    #[serde(default = "default_model")]
    pub model: String,

    /// Language hint ("auto" for auto-detection)
    #[serde(default = "default_language")]
    pub language: String,

    /// Compute device: cpu or cuda
    #[serde(default = "default_compute_device")]
    pub device: String,

    /// Numeric precision: int8, float16, float32
    #[serde(default = "default_compute_type")]
    pub compute_type: String,

    /// Path to the engine binary (None = search PATH)
    #[serde(default)]
    pub command: Option<String>,

    /// Number of engine threads (None = auto-detect)
    #[serde(default)]
    pub threads: Option<usize>,
}

/// Text injection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InjectConfig {
    /// Window-name substrings that enable the auto-confirm keystroke
    #[serde(default = "default_confirm_apps")]
    pub confirm_apps: Vec<String>,

    /// Return focus to the interim window after injecting into a restored one
    #[serde(default = "default_true")]
    pub return_focus: bool,
}

/// Feedback sound configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedbackConfig {
    /// Enable feedback tones
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Volume level (0.0 to 1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,
}

fn default_control_keys() -> Vec<String> {
    vec!["ctrl_r".to_string(), "shift_r".to_string()]
}

fn default_quit_key() -> String {
    "esc".to_string()
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_model() -> String {
    "base".to_string()
}

fn default_language() -> String {
    "de".to_string()
}

fn default_compute_device() -> String {
    "cpu".to_string()
}

fn default_compute_type() -> String {
    "int8".to_string()
}

fn default_confirm_apps() -> Vec<String> {
    vec!["Cursor".to_string()]
}

fn default_volume() -> f32 {
    0.7
}

fn default_true() -> bool {
    true
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            keys: default_control_keys(),
            quit_key: default_quit_key(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            language: default_language(),
            device: default_compute_device(),
            compute_type: default_compute_type(),
            command: None,
            threads: None,
        }
    }
}

impl Default for InjectConfig {
    fn default() -> Self {
        Self {
            confirm_apps: default_confirm_apps(),
            return_focus: true,
        }
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: default_volume(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            control: ControlConfig::default(),
            audio: AudioConfig::default(),
            engine: EngineConfig::default(),
            inject: InjectConfig::default(),
            feedback: FeedbackConfig::default(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "holdtype")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(path: Option<&Path>) -> Result<Config, HoldtypeError> {
    let mut config = Config::default();

    let config_path = path.map(PathBuf::from).or_else(Config::default_path);

    if let Some(ref path) = config_path {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            let contents = std::fs::read_to_string(path)
                .map_err(|e| HoldtypeError::Config(format!("Failed to read config: {}", e)))?;

            config = toml::from_str(&contents)
                .map_err(|e| HoldtypeError::Config(format!("Invalid config: {}", e)))?;
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
        }
    }

    // Override from environment variables
    if let Ok(keys) = std::env::var("HOLDTYPE_KEYS") {
        config.control.keys = keys.split(',').map(|k| k.trim().to_string()).collect();
    }
    if let Ok(model) = std::env::var("HOLDTYPE_MODEL") {
        config.engine.model = model;
    }
    if let Ok(language) = std::env::var("HOLDTYPE_LANGUAGE") {
        config.engine.language = language;
    }

    Ok(config)
}
