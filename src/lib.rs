//! Holdtype: push-to-talk dictation for the desktop
//!
//! This library provides the core functionality for:
//! - Detecting trigger-key presses via evdev (kernel-level, works on X11
//!   and all Wayland compositors)
//! - Capturing microphone audio via cpal (PipeWire, PulseAudio, ALSA)
//! - Transcribing speech through an external recognition engine
//! - Restoring the window that was focused when recording started
//! - Injecting the recognized text via xdotool/wtype/osascript
//!
//! # Architecture
//!
//! ```text
//!          ┌──────────────┐   key events    ┌───────────────────┐
//!          │  Hotkey hook │ ──────────────▶ │   State machine   │
//!          │   (evdev)    │                 │ Idle ⇄ Recording  │
//!          └──────────────┘                 └───────────────────┘
//!                                              │            │
//!                                   arm/disarm │            │ buffer + focus snapshot
//!                                              ▼            ▼
//!                                    ┌──────────────┐  ┌──────────────────┐
//!                                    │   Capture    │  │   Coordinator    │
//!                                    │ worker (cpal)│  │ WAV → engine →   │
//!                                    └──────────────┘  │ focus → inject   │
//!                                                      └──────────────────┘
//! ```
//!
//! The recording lifecycle is push-to-talk: recording runs only while a
//! configured trigger key is physically held. On release the buffered audio
//! is transcribed and the text is typed into the window that was focused
//! when recording began.

pub mod audio;
pub mod config;
pub mod coordinator;
pub mod daemon;
pub mod error;
pub mod focus;
pub mod hotkey;
pub mod lifecycle;
pub mod machine;
pub mod output;
pub mod session;
pub mod transcribe;

pub use config::Config;
pub use daemon::Daemon;
pub use error::{HoldtypeError, Result};
