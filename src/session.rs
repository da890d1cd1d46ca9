//! Session state for the push-to-talk workflow
//!
//! A session runs Idle → Recording → (transcribe + inject) → Idle. The
//! Recording state carries the identity of the held trigger key and the
//! focus snapshot taken when recording began.

use crate::focus::{FocusAdapter, WindowId};
use crate::hotkey::TriggerKey;
use std::time::Instant;

/// Audio samples collected during recording (i16 PCM, mono)
pub type AudioBuffer = Vec<i16>;

/// Window identity captured at the moment recording starts.
///
/// The id is the authoritative restore target; the name is only used for
/// the auto-confirm application heuristic. Both are best-effort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FocusSnapshot {
    pub id: Option<WindowId>,
    pub name: Option<String>,
}

impl FocusSnapshot {
    /// Capture the currently focused window through the adapter
    pub async fn capture(adapter: &dyn FocusAdapter) -> Self {
        let id = adapter.active_window_id().await;
        let name = adapter.active_window_name().await;

        match (&id, &name) {
            (Some(id), Some(name)) => {
                tracing::info!("Start window saved: {} ({})", id, name)
            }
            (Some(id), None) => tracing::info!("Start window saved: {}", id),
            _ => tracing::warn!("Could not determine the active window"),
        }

        Self { id, name }
    }
}

/// Orchestrator state
#[derive(Debug, Clone)]
pub enum State {
    /// Waiting for a trigger key press
    Idle,

    /// Trigger key held, capture worker armed
    Recording {
        /// The trigger key that started this session; only its release stops it
        held_key: TriggerKey,
        /// Focus captured when recording began
        snapshot: FocusSnapshot,
        /// When recording started
        started_at: Instant,
    },
}

impl State {
    pub fn is_idle(&self) -> bool {
        matches!(self, State::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, State::Recording { .. })
    }

    /// The trigger key held by the active session, if any
    pub fn held_key(&self) -> Option<TriggerKey> {
        match self {
            State::Recording { held_key, .. } => Some(*held_key),
            State::Idle => None,
        }
    }

    pub fn recording_duration(&self) -> Option<std::time::Duration> {
        match self {
            State::Recording { started_at, .. } => Some(started_at.elapsed()),
            State::Idle => None,
        }
    }
}

impl Default for State {
    fn default() -> Self {
        State::Idle
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Idle => write!(f, "Idle"),
            State::Recording {
                held_key,
                started_at,
                ..
            } => write!(
                f,
                "Recording ({}, {:.1}s)",
                held_key,
                started_at.elapsed().as_secs_f32()
            ),
        }
    }
}
