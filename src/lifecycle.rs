//! Process lifecycle flags
//!
//! All process-wide mutable state lives on one `Lifecycle` object,
//! constructed once per run and shared by handle with every component that
//! needs to observe or set it. The quit key, Ctrl+C, and SIGTERM all funnel
//! through `request_stop`; the cleanup routine is guarded so it runs at most
//! once no matter how many shutdown paths fire.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct Lifecycle {
    /// Cleared exactly once when shutdown is requested
    stopping: AtomicBool,
    /// Set while a recording session is active; read by the hook thread
    recording: AtomicBool,
    /// Space was pressed outside a recording; skips the next auto-confirm
    suppress_confirm: AtomicBool,
    /// Cleanup has run
    cleaned: AtomicBool,
    /// Completion chime has been played this run
    chime_played: AtomicBool,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        !self.stopping.load(Ordering::SeqCst)
    }

    /// Request shutdown. Returns true for the first caller only.
    pub fn request_stop(&self) -> bool {
        !self.stopping.swap(true, Ordering::SeqCst)
    }

    /// Mark a session active and reset the confirm suppression
    pub fn begin_session(&self) {
        self.suppress_confirm.store(false, Ordering::SeqCst);
        self.recording.store(true, Ordering::SeqCst);
    }

    pub fn end_session(&self) {
        self.recording.store(false, Ordering::SeqCst);
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    /// Called from the hook thread on a space press. Only counts while no
    /// recording is active, so a space spoken into the microphone never
    /// cancels its own session's confirm.
    pub fn note_space(&self) {
        if !self.is_recording() {
            self.suppress_confirm.store(true, Ordering::SeqCst);
            tracing::debug!("Space pressed, auto-confirm suppressed for this session");
        }
    }

    pub fn suppress_requested(&self) -> bool {
        self.suppress_confirm.load(Ordering::SeqCst)
    }

    /// Claim the cleanup routine. Returns true for the first caller only.
    pub fn begin_cleanup(&self) -> bool {
        !self.cleaned.swap(true, Ordering::SeqCst)
    }

    /// Claim the completion chime. Returns true for the first caller only.
    pub fn claim_chime(&self) -> bool {
        !self.chime_played.swap(true, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_is_claimed_once() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.is_running());
        assert!(lifecycle.request_stop());
        assert!(!lifecycle.request_stop());
        assert!(!lifecycle.is_running());
    }

    #[test]
    fn test_cleanup_guard_is_claimed_once() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.begin_cleanup());
        assert!(!lifecycle.begin_cleanup());
        assert!(lifecycle.claim_chime());
        assert!(!lifecycle.claim_chime());
    }

    #[test]
    fn test_space_outside_recording_suppresses_confirm() {
        let lifecycle = Lifecycle::new();
        lifecycle.note_space();
        assert!(lifecycle.suppress_requested());

        // Starting a session resets the flag
        lifecycle.begin_session();
        assert!(!lifecycle.suppress_requested());
    }

    #[test]
    fn test_space_during_recording_is_ignored() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin_session();
        lifecycle.note_space();
        assert!(!lifecycle.suppress_requested());

        // After the session ends (transcription in flight), space counts again
        lifecycle.end_session();
        lifecycle.note_space();
        assert!(lifecycle.suppress_requested());
    }
}
