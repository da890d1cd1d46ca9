//! Hotkey detection module
//!
//! On Linux, provides kernel-level key event detection using evdev, which
//! works on X11 and all Wayland compositors because it operates at the
//! input subsystem level. Requires the user to be in the 'input' group.
//!
//! The listener forwards press/release events for the configured trigger
//! keys and the quit key over a channel; the space key is handled on the
//! hook thread itself (it only toggles a lifecycle flag and must be
//! observed even while a transcription is in flight).

#[cfg(target_os = "linux")]
pub mod evdev_listener;

use crate::config::ControlConfig;
use crate::error::HotkeyError;
use crate::lifecycle::Lifecycle;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A key configured as a recording trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKey {
    LeftAlt,
    RightAlt,
    LeftCtrl,
    RightCtrl,
    LeftShift,
    RightShift,
    F12,
}

impl TriggerKey {
    /// Parse a config/CLI key name
    pub fn parse(name: &str) -> Result<Self, HotkeyError> {
        match name.to_ascii_lowercase().as_str() {
            "alt" | "alt_l" => Ok(TriggerKey::LeftAlt),
            "alt_r" | "alt_gr" => Ok(TriggerKey::RightAlt),
            "ctrl" | "ctrl_l" => Ok(TriggerKey::LeftCtrl),
            "ctrl_r" => Ok(TriggerKey::RightCtrl),
            "shift" | "shift_l" => Ok(TriggerKey::LeftShift),
            "shift_r" => Ok(TriggerKey::RightShift),
            "f12" => Ok(TriggerKey::F12),
            other => Err(HotkeyError::UnknownKey(other.to_string())),
        }
    }
}

impl std::fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TriggerKey::LeftAlt => "left alt",
            TriggerKey::RightAlt => "right alt",
            TriggerKey::LeftCtrl => "left ctrl",
            TriggerKey::RightCtrl => "right ctrl",
            TriggerKey::LeftShift => "left shift",
            TriggerKey::RightShift => "right shift",
            TriggerKey::F12 => "F12",
        };
        write!(f, "{}", name)
    }
}

/// Events emitted by the hotkey listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// A configured trigger key was pressed
    Pressed(TriggerKey),
    /// A configured trigger key was released
    Released(TriggerKey),
    /// The quit key was released
    QuitReleased,
}

/// Trait for hotkey detection implementations
#[async_trait::async_trait]
pub trait HotkeyListener: Send + Sync {
    /// Start listening for hotkey events.
    /// Returns a channel receiver for events.
    async fn start(&mut self) -> Result<mpsc::Receiver<HotkeyEvent>, HotkeyError>;

    /// Stop listening and clean up
    async fn stop(&mut self) -> Result<(), HotkeyError>;
}

/// Parse the configured trigger keys. The set must be non-empty.
pub fn parse_trigger_keys(config: &ControlConfig) -> Result<Vec<TriggerKey>, HotkeyError> {
    let keys = config
        .keys
        .iter()
        .map(|k| TriggerKey::parse(k))
        .collect::<Result<Vec<_>, _>>()?;

    if keys.is_empty() {
        return Err(HotkeyError::UnknownKey(
            "control.keys must not be empty".to_string(),
        ));
    }

    Ok(keys)
}

/// Factory function to create the platform hotkey listener.
///
/// The lifecycle handle lets the hook thread record space presses while the
/// main task is busy transcribing.
#[cfg(target_os = "linux")]
pub fn create_listener(
    config: &ControlConfig,
    lifecycle: Arc<Lifecycle>,
) -> Result<Box<dyn HotkeyListener>, HotkeyError> {
    Ok(Box::new(evdev_listener::EvdevListener::new(
        config, lifecycle,
    )?))
}

#[cfg(not(target_os = "linux"))]
pub fn create_listener(
    _config: &ControlConfig,
    _lifecycle: Arc<Lifecycle>,
) -> Result<Box<dyn HotkeyListener>, HotkeyError> {
    Err(HotkeyError::NotSupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trigger_key() {
        assert_eq!(TriggerKey::parse("ctrl_r").unwrap(), TriggerKey::RightCtrl);
        assert_eq!(TriggerKey::parse("CTRL_R").unwrap(), TriggerKey::RightCtrl);
        assert_eq!(TriggerKey::parse("shift_r").unwrap(), TriggerKey::RightShift);
        assert_eq!(TriggerKey::parse("alt").unwrap(), TriggerKey::LeftAlt);
        assert_eq!(TriggerKey::parse("alt_gr").unwrap(), TriggerKey::RightAlt);
        assert_eq!(TriggerKey::parse("f12").unwrap(), TriggerKey::F12);
    }

    #[test]
    fn test_parse_trigger_key_error() {
        assert!(TriggerKey::parse("hyper").is_err());
    }

    #[test]
    fn test_parse_trigger_keys_default() {
        let config = ControlConfig::default();
        let keys = parse_trigger_keys(&config).unwrap();
        assert_eq!(keys, vec![TriggerKey::RightCtrl, TriggerKey::RightShift]);
    }

    #[test]
    fn test_parse_trigger_keys_rejects_empty() {
        let config = ControlConfig {
            keys: vec![],
            quit_key: "esc".to_string(),
        };
        assert!(parse_trigger_keys(&config).is_err());
    }
}
