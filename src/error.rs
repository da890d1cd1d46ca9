//! Error types for holdtype
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide users toward fixing common issues.

use thiserror::Error;

/// Top-level error type for the holdtype application
#[derive(Error, Debug)]
pub enum HoldtypeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Hotkey error: {0}")]
    Hotkey(#[from] HotkeyError),

    #[error("Audio capture error: {0}")]
    Audio(#[from] AudioError),

    #[error("Transcription error: {0}")]
    Transcribe(#[from] TranscribeError),

    #[error("Text injection error: {0}")]
    Inject(#[from] InjectError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to hotkey detection
#[derive(Error, Debug)]
pub enum HotkeyError {
    #[error("Cannot open input device '{0}'. Is the user in the 'input' group?\n  Run: sudo usermod -aG input $USER\n  Then log out and back in.")]
    DeviceAccess(String),

    #[error("Unknown key name: '{0}'")]
    UnknownKey(String),

    #[error("No keyboard device found in /dev/input/")]
    NoKeyboard,

    #[error("Built-in hotkey detection is not supported on this platform")]
    NotSupported,

    #[error("evdev error: {0}")]
    Evdev(String),
}

/// Errors related to audio capture
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Audio connection failed: {0}")]
    Connection(String),

    #[error("Audio device not found: '{0}'. List devices with: pactl list sources short")]
    DeviceNotFound(String),

    #[error("Audio stream error: {0}")]
    StreamError(String),

    #[error("Capture worker is gone")]
    WorkerGone,
}

/// Errors related to speech-to-text transcription
#[derive(Error, Debug)]
pub enum TranscribeError {
    #[error("Recognition engine not found: {0}\n  Install whisper-cli (whisper.cpp) or set engine.command in the config.")]
    EngineNotFound(String),

    #[error("Engine invocation failed: {0}")]
    InvocationFailed(String),

    #[error("Engine produced unreadable output: {0}")]
    BadOutput(String),

    #[error("Audio container error: {0}")]
    AudioFormat(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Errors related to text injection
#[derive(Error, Debug)]
pub enum InjectError {
    #[error("xdotool not found in PATH. Install via your package manager.")]
    XdotoolNotFound,

    #[error("wtype not found in PATH. Install via your package manager.")]
    WtypeNotFound,

    #[error("Text injection failed: {0}")]
    InjectionFailed(String),

    #[error("Confirm keystroke failed: {0}")]
    KeyTapFailed(String),

    #[error("All injection methods failed. Ensure xdotool or wtype is available.")]
    AllMethodsFailed,
}

/// Result type alias using HoldtypeError
pub type Result<T> = std::result::Result<T, HoldtypeError>;

#[cfg(target_os = "linux")]
impl From<evdev::Error> for HotkeyError {
    fn from(e: evdev::Error) -> Self {
        HotkeyError::Evdev(e.to_string())
    }
}
