//! evdev-based hotkey listener
//!
//! Uses the Linux evdev interface to detect key presses at the kernel level.
//! This works on X11 and all Wayland compositors because it bypasses the
//! display server.
//!
//! The user must be in the 'input' group to access /dev/input/* devices.

use super::{HotkeyEvent, HotkeyListener, TriggerKey};
use crate::config::ControlConfig;
use crate::error::HotkeyError;
use crate::lifecycle::Lifecycle;
use evdev::{Device, InputEventKind, Key};
use std::collections::{HashMap, HashSet};
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// evdev-based hotkey listener
pub struct EvdevListener {
    /// Trigger keys to watch, keyed by their evdev code
    trigger_keys: HashMap<Key, TriggerKey>,
    /// The key whose release shuts the daemon down
    quit_key: Key,
    /// Shared flags; space presses are recorded here from the hook thread
    lifecycle: Arc<Lifecycle>,
    /// Paths to keyboard devices
    device_paths: Vec<PathBuf>,
    /// Signal to stop the listener task
    stop_signal: Option<oneshot::Sender<()>>,
}

impl EvdevListener {
    pub fn new(config: &ControlConfig, lifecycle: Arc<Lifecycle>) -> Result<Self, HotkeyError> {
        let mut trigger_keys = HashMap::new();
        for name in &config.keys {
            let trigger = TriggerKey::parse(name)?;
            trigger_keys.insert(trigger_code(trigger), trigger);
        }

        let quit_key = parse_quit_key(&config.quit_key)?;
        if trigger_keys.contains_key(&quit_key) {
            return Err(HotkeyError::UnknownKey(format!(
                "quit key '{}' is also a trigger key",
                config.quit_key
            )));
        }

        let device_paths = find_keyboard_devices()?;
        if device_paths.is_empty() {
            return Err(HotkeyError::NoKeyboard);
        }

        tracing::debug!(
            "Found {} keyboard device(s): {:?}",
            device_paths.len(),
            device_paths
        );

        Ok(Self {
            trigger_keys,
            quit_key,
            lifecycle,
            device_paths,
            stop_signal: None,
        })
    }
}

#[async_trait::async_trait]
impl HotkeyListener for EvdevListener {
    async fn start(&mut self) -> Result<mpsc::Receiver<HotkeyEvent>, HotkeyError> {
        let (tx, rx) = mpsc::channel(32);
        let (stop_tx, stop_rx) = oneshot::channel();
        self.stop_signal = Some(stop_tx);

        let trigger_keys = self.trigger_keys.clone();
        let quit_key = self.quit_key;
        let lifecycle = self.lifecycle.clone();
        let device_paths = self.device_paths.clone();

        tokio::task::spawn_blocking(move || {
            listener_loop(device_paths, trigger_keys, quit_key, lifecycle, tx, stop_rx);
        });

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), HotkeyError> {
        if let Some(stop) = self.stop_signal.take() {
            let _ = stop.send(());
        }
        Ok(())
    }
}

/// Main listener loop running in a blocking task.
///
/// Per-device read errors are logged and skipped; a bad event must never
/// tear the hook down.
fn listener_loop(
    device_paths: Vec<PathBuf>,
    trigger_keys: HashMap<Key, TriggerKey>,
    quit_key: Key,
    lifecycle: Arc<Lifecycle>,
    tx: mpsc::Sender<HotkeyEvent>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    // Open all keyboard devices in non-blocking mode
    let mut devices: Vec<Device> = device_paths
        .iter()
        .filter_map(|path| match Device::open(path) {
            Ok(device) => {
                let fd = device.as_raw_fd();
                unsafe {
                    let flags = libc::fcntl(fd, libc::F_GETFL);
                    if flags != -1 {
                        libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
                    }
                }
                tracing::debug!("Opened device (non-blocking): {:?}", path);
                Some(device)
            }
            Err(e) => {
                tracing::warn!("Failed to open {:?}: {}", path, e);
                None
            }
        })
        .collect();

    if devices.is_empty() {
        tracing::error!("No keyboard devices could be opened");
        return;
    }

    // Track currently held watched keys to filter autorepeat
    let mut held: HashSet<Key> = HashSet::new();

    tracing::info!(
        "Listening for {:?} (quit: {:?})",
        trigger_keys.values().collect::<Vec<_>>(),
        quit_key
    );

    loop {
        // Check for stop signal (non-blocking)
        match stop_rx.try_recv() {
            Ok(_) | Err(oneshot::error::TryRecvError::Closed) => {
                tracing::debug!("Hotkey listener stopping");
                return;
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
        }

        // Poll each device (all set to non-blocking mode)
        for device in &mut devices {
            let events = match device.fetch_events() {
                Ok(events) => events,
                // WouldBlock is the idle case; anything else is logged and skipped
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
                Err(e) => {
                    tracing::debug!("Device read failed: {}", e);
                    continue;
                }
            };

            for event in events {
                let InputEventKind::Key(key) = event.kind() else {
                    continue;
                };

                // value: 1 = press, 0 = release, 2 = autorepeat
                let value = event.value();

                if key == Key::KEY_SPACE {
                    if value == 1 {
                        lifecycle.note_space();
                    }
                    continue;
                }

                if key == quit_key {
                    if value == 0 && tx.blocking_send(HotkeyEvent::QuitReleased).is_err() {
                        return; // Channel closed
                    }
                    continue;
                }

                if let Some(&trigger) = trigger_keys.get(&key) {
                    let event = match value {
                        1 if held.insert(key) => HotkeyEvent::Pressed(trigger),
                        0 if held.remove(&key) => HotkeyEvent::Released(trigger),
                        _ => continue, // autorepeat or duplicate
                    };
                    if tx.blocking_send(event).is_err() {
                        return; // Channel closed
                    }
                }
            }
        }

        // Small sleep to avoid busy-waiting
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
}

/// Find all keyboard input devices
fn find_keyboard_devices() -> Result<Vec<PathBuf>, HotkeyError> {
    let mut keyboards = Vec::new();

    let input_dir = std::fs::read_dir("/dev/input")
        .map_err(|e| HotkeyError::DeviceAccess(format!("/dev/input: {}", e)))?;

    for entry in input_dir {
        let entry = entry.map_err(|e| HotkeyError::DeviceAccess(e.to_string()))?;
        let path = entry.path();

        let is_event_device = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false);

        if !is_event_device {
            continue;
        }

        match Device::open(&path) {
            Ok(device) => {
                // A keyboard should have at least some letter keys
                let has_keys = device
                    .supported_keys()
                    .map(|keys| {
                        keys.contains(Key::KEY_A)
                            && keys.contains(Key::KEY_Z)
                            && keys.contains(Key::KEY_ENTER)
                    })
                    .unwrap_or(false);

                if has_keys {
                    tracing::debug!(
                        "Found keyboard: {:?} ({:?})",
                        path,
                        device.name().unwrap_or("unknown")
                    );
                    keyboards.push(path);
                }
            }
            Err(e) => {
                // Permission denied is common for non-input-group users
                if e.kind() == std::io::ErrorKind::PermissionDenied {
                    return Err(HotkeyError::DeviceAccess(path.display().to_string()));
                }
                // Other errors (device busy, etc.) - just skip
                tracing::trace!("Skipping {:?}: {}", path, e);
            }
        }
    }

    Ok(keyboards)
}

/// Map a trigger key to its evdev code
fn trigger_code(trigger: TriggerKey) -> Key {
    match trigger {
        TriggerKey::LeftAlt => Key::KEY_LEFTALT,
        TriggerKey::RightAlt => Key::KEY_RIGHTALT,
        TriggerKey::LeftCtrl => Key::KEY_LEFTCTRL,
        TriggerKey::RightCtrl => Key::KEY_RIGHTCTRL,
        TriggerKey::LeftShift => Key::KEY_LEFTSHIFT,
        TriggerKey::RightShift => Key::KEY_RIGHTSHIFT,
        TriggerKey::F12 => Key::KEY_F12,
    }
}

/// Parse the configured quit key name
fn parse_quit_key(name: &str) -> Result<Key, HotkeyError> {
    let key = match name.to_ascii_lowercase().as_str() {
        "esc" | "escape" => Key::KEY_ESC,
        "pause" => Key::KEY_PAUSE,
        "scrolllock" => Key::KEY_SCROLLLOCK,
        "insert" => Key::KEY_INSERT,
        "f10" => Key::KEY_F10,
        "f11" => Key::KEY_F11,
        _ => return Err(HotkeyError::UnknownKey(name.to_string())),
    };
    Ok(key)
}
