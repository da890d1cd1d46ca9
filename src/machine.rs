//! Hotkey state machine
//!
//! Owns the recording lifecycle: which trigger key is held, the focus
//! snapshot taken at activation, and the armed/disarmed state of the
//! capture worker. Events arrive from the hotkey listener; every handler
//! catches and logs its own failures so a single bad event can never tear
//! the machine down.
//!
//! Sessions are strictly sequential: the release handler runs the whole
//! transcribe-and-inject pipeline to completion before the state returns
//! to Idle, so a new recording cannot start while delivery is in flight.

use crate::audio::feedback::{AudioFeedback, SoundEvent};
use crate::audio::CaptureController;
use crate::coordinator::Coordinator;
use crate::focus::FocusAdapter;
use crate::hotkey::{HotkeyEvent, TriggerKey};
use crate::lifecycle::Lifecycle;
use crate::output::TextInjector;
use crate::session::{FocusSnapshot, State};
use std::sync::Arc;
use std::time::Instant;

pub struct Machine {
    state: State,
    control_keys: Vec<TriggerKey>,
    coordinator: Coordinator,
    /// None when the device could not be opened at startup; activations
    /// then fail fast with a logged error instead of crashing.
    capture: Option<Box<dyn CaptureController>>,
    focus: Box<dyn FocusAdapter>,
    injectors: Vec<Box<dyn TextInjector>>,
    feedback: Option<AudioFeedback>,
    lifecycle: Arc<Lifecycle>,
}

impl Machine {
    pub fn new(
        control_keys: Vec<TriggerKey>,
        coordinator: Coordinator,
        capture: Option<Box<dyn CaptureController>>,
        focus: Box<dyn FocusAdapter>,
        injectors: Vec<Box<dyn TextInjector>>,
        feedback: Option<AudioFeedback>,
        lifecycle: Arc<Lifecycle>,
    ) -> Self {
        Self {
            state: State::Idle,
            control_keys,
            coordinator,
            capture,
            focus,
            injectors,
            feedback,
            lifecycle,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub async fn handle_event(&mut self, event: HotkeyEvent) {
        match event {
            HotkeyEvent::Pressed(key) => self.on_press(key).await,
            HotkeyEvent::Released(key) => self.on_release(key).await,
            HotkeyEvent::QuitReleased => {
                tracing::info!("Quit key released, shutting down");
                self.lifecycle.request_stop();
            }
        }
    }

    async fn on_press(&mut self, key: TriggerKey) {
        if !self.lifecycle.is_running() {
            return;
        }

        if !self.control_keys.contains(&key) {
            tracing::trace!("Ignoring press of unconfigured key {}", key);
            return;
        }

        // First held key wins; re-entrant activation is ignored
        if !self.state.is_idle() {
            tracing::debug!("Ignoring {} press, a session is already active", key);
            return;
        }

        if self.capture.is_none() {
            tracing::error!("Audio device unavailable, cannot start recording");
            return;
        }

        // Save the start window before anything else; injection targets it
        // even if the user clicks elsewhere while speaking
        let snapshot = FocusSnapshot::capture(self.focus.as_ref()).await;

        self.lifecycle.begin_session();

        let capture = match self.capture.as_mut() {
            Some(capture) => capture,
            None => return,
        };

        match capture.start().await {
            Ok(()) => {
                self.state = State::Recording {
                    held_key: key,
                    snapshot,
                    started_at: Instant::now(),
                };
                self.play(SoundEvent::RecordingStart);
                tracing::info!("Recording started (speak while holding {})", key);
            }
            Err(e) => {
                self.lifecycle.end_session();
                tracing::error!("Failed to start audio capture: {}", e);
                self.play(SoundEvent::Error);
            }
        }
    }

    async fn on_release(&mut self, key: TriggerKey) {
        match self.state.held_key() {
            Some(held) if held == key => {}
            Some(_) => {
                tracing::trace!("Ignoring release of {}, recording continues", key);
                return;
            }
            None => return,
        }

        let State::Recording {
            snapshot,
            started_at,
            ..
        } = std::mem::take(&mut self.state)
        else {
            return;
        };

        tracing::info!(
            "{} released, recording stopped ({:.1}s)",
            key,
            started_at.elapsed().as_secs_f32()
        );
        self.play(SoundEvent::RecordingStop);

        // Clear the recording flag before transcription so a space pressed
        // while the engine runs still suppresses this session's confirm
        self.lifecycle.end_session();

        let buffer = match self.capture.as_mut() {
            Some(capture) => match capture.stop().await {
                Ok(buffer) => buffer,
                Err(e) => {
                    tracing::warn!("Recording error: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        self.coordinator
            .deliver(
                buffer,
                &snapshot,
                self.focus.as_ref(),
                &self.injectors,
                self.lifecycle.as_ref(),
            )
            .await;
    }

    /// Release the audio device and play the completion chime.
    /// Safe to call from multiple shutdown paths; runs at most once.
    pub async fn shutdown(&mut self) {
        if !self.lifecycle.begin_cleanup() {
            tracing::debug!("Cleanup already performed");
            return;
        }

        tracing::info!("Cleaning up");

        // Chime first so it is not cut short by the device teardown.
        // Each step is independently fault-tolerant.
        if self.lifecycle.claim_chime() {
            if let Some(feedback) = &self.feedback {
                feedback.play_blocking(SoundEvent::Done);
            }
        }

        if let Some(mut capture) = self.capture.take() {
            capture.shutdown().await;
        }
    }

    fn play(&self, event: SoundEvent) {
        if let Some(feedback) = &self.feedback {
            feedback.play(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AudioError;
    use crate::focus::NoopAdapter;
    use crate::session::AudioBuffer;
    use crate::transcribe::{Segment, Transcriber};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CaptureCounters {
        starts: AtomicUsize,
        stops: AtomicUsize,
        shutdowns: AtomicUsize,
    }

    struct StubCapture {
        counters: Arc<CaptureCounters>,
    }

    #[async_trait::async_trait]
    impl CaptureController for StubCapture {
        async fn start(&mut self) -> Result<(), AudioError> {
            self.counters.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&mut self) -> Result<AudioBuffer, AudioError> {
            self.counters.stops.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }

        async fn shutdown(&mut self) {
            self.counters.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct SilentTranscriber;

    impl Transcriber for SilentTranscriber {
        fn transcribe(
            &self,
            _wav_path: &std::path::Path,
            _language: Option<&str>,
        ) -> Result<Vec<Segment>, crate::error::TranscribeError> {
            Ok(Vec::new())
        }
    }

    fn test_machine(with_capture: bool) -> (Machine, Arc<CaptureCounters>, Arc<Lifecycle>) {
        let counters = Arc::new(CaptureCounters::default());
        let lifecycle = Arc::new(Lifecycle::new());
        let capture: Option<Box<dyn CaptureController>> = if with_capture {
            Some(Box::new(StubCapture {
                counters: counters.clone(),
            }))
        } else {
            None
        };

        let machine = Machine::new(
            vec![TriggerKey::RightCtrl, TriggerKey::RightShift],
            Coordinator::new(Arc::new(SilentTranscriber), 16000, "en", vec![], false),
            capture,
            Box::new(NoopAdapter),
            Vec::new(),
            None,
            lifecycle.clone(),
        );

        (machine, counters, lifecycle)
    }

    #[tokio::test]
    async fn test_press_release_cycle() {
        let (mut machine, counters, _) = test_machine(true);

        machine
            .handle_event(HotkeyEvent::Pressed(TriggerKey::RightCtrl))
            .await;
        assert!(machine.state().is_recording());
        assert_eq!(machine.state().held_key(), Some(TriggerKey::RightCtrl));

        machine
            .handle_event(HotkeyEvent::Released(TriggerKey::RightCtrl))
            .await;
        assert!(machine.state().is_idle());
        assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
        assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sessions_alternate_strictly() {
        let (mut machine, counters, _) = test_machine(true);

        for _ in 0..3 {
            machine
                .handle_event(HotkeyEvent::Pressed(TriggerKey::RightShift))
                .await;
            assert!(machine.state().is_recording());
            machine
                .handle_event(HotkeyEvent::Released(TriggerKey::RightShift))
                .await;
            assert!(machine.state().is_idle());
        }

        assert_eq!(counters.starts.load(Ordering::SeqCst), 3);
        assert_eq!(counters.stops.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_second_trigger_ignored_while_recording() {
        let (mut machine, counters, _) = test_machine(true);

        machine
            .handle_event(HotkeyEvent::Pressed(TriggerKey::RightCtrl))
            .await;
        machine
            .handle_event(HotkeyEvent::Pressed(TriggerKey::RightShift))
            .await;

        // First held key wins
        assert_eq!(machine.state().held_key(), Some(TriggerKey::RightCtrl));
        assert_eq!(counters.starts.load(Ordering::SeqCst), 1);

        // Releasing the other trigger does not stop the session
        machine
            .handle_event(HotkeyEvent::Released(TriggerKey::RightShift))
            .await;
        assert!(machine.state().is_recording());
        assert_eq!(counters.stops.load(Ordering::SeqCst), 0);

        machine
            .handle_event(HotkeyEvent::Released(TriggerKey::RightCtrl))
            .await;
        assert!(machine.state().is_idle());
    }

    #[tokio::test]
    async fn test_unconfigured_key_is_ignored() {
        let (mut machine, counters, _) = test_machine(true);

        machine
            .handle_event(HotkeyEvent::Pressed(TriggerKey::F12))
            .await;
        assert!(machine.state().is_idle());
        assert_eq!(counters.starts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_release_without_press_is_ignored() {
        let (mut machine, counters, _) = test_machine(true);

        machine
            .handle_event(HotkeyEvent::Released(TriggerKey::RightCtrl))
            .await;
        assert!(machine.state().is_idle());
        assert_eq!(counters.stops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_device_fails_fast() {
        let (mut machine, counters, _) = test_machine(false);

        machine
            .handle_event(HotkeyEvent::Pressed(TriggerKey::RightCtrl))
            .await;
        assert!(machine.state().is_idle());
        assert_eq!(counters.starts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_quit_release_requests_stop() {
        let (mut machine, _, lifecycle) = test_machine(true);

        assert!(lifecycle.is_running());
        machine.handle_event(HotkeyEvent::QuitReleased).await;
        assert!(!lifecycle.is_running());

        // Further activations are ignored once stopping
        machine
            .handle_event(HotkeyEvent::Pressed(TriggerKey::RightCtrl))
            .await;
        assert!(machine.state().is_idle());
    }

    #[tokio::test]
    async fn test_shutdown_runs_once() {
        let (mut machine, counters, _) = test_machine(true);

        machine.shutdown().await;
        machine.shutdown().await;
        assert_eq!(counters.shutdowns.load(Ordering::SeqCst), 1);
    }
}
