//! Transcription coordinator
//!
//! Runs after a recording session stops: serializes the captured buffer
//! into a temporary WAV container, hands it to the recognition engine,
//! restores the start window if focus moved during recording, injects the
//! recognized text, and taps the confirm key for recognized target
//! applications. Engine and focus failures are logged and end the session
//! without side effects; they never propagate into the event loop.

use crate::error::TranscribeError;
use crate::focus::FocusAdapter;
use crate::lifecycle::Lifecycle;
use crate::output::{self, TextInjector};
use crate::session::{AudioBuffer, FocusSnapshot};
use crate::transcribe::{join_segments, Transcriber};
use std::sync::Arc;
use std::time::Duration;

/// Pause after a successful focus restore before typing
const FOCUS_SETTLE: Duration = Duration::from_millis(300);
/// Pause before the confirm keystroke
const CONFIRM_DELAY: Duration = Duration::from_millis(100);
/// Pause before returning focus to the interim window
const RETURN_DELAY: Duration = Duration::from_millis(100);

pub struct Coordinator {
    transcriber: Arc<dyn Transcriber>,
    /// Capture sample rate, written into the WAV header
    sample_rate: u32,
    /// Engine language hint; None = auto-detect
    language: Option<String>,
    /// Window-name substrings that enable the confirm keystroke
    confirm_apps: Vec<String>,
    /// Return focus to the interim window after injection
    return_focus: bool,
}

impl Coordinator {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        sample_rate: u32,
        language: &str,
        confirm_apps: Vec<String>,
        return_focus: bool,
    ) -> Self {
        let language = match language {
            "auto" => None,
            other => Some(other.to_string()),
        };

        Self {
            transcriber,
            sample_rate,
            language,
            confirm_apps,
            return_focus,
        }
    }

    /// Transcribe a finished session and deliver the text.
    ///
    /// Takes the buffer by value: the capture worker has handed it off and
    /// the next session starts from an empty one.
    pub async fn deliver(
        &self,
        buffer: AudioBuffer,
        snapshot: &FocusSnapshot,
        focus: &dyn FocusAdapter,
        injectors: &[Box<dyn TextInjector>],
        lifecycle: &Lifecycle,
    ) {
        if buffer.is_empty() {
            tracing::debug!("No audio captured, nothing to transcribe");
            return;
        }

        tracing::info!(
            "Transcribing {:.1}s of audio...",
            buffer.len() as f32 / self.sample_rate as f32
        );

        let wav = match write_wav(&buffer, self.sample_rate) {
            Ok(wav) => wav,
            Err(e) => {
                tracing::error!("Failed to write audio container: {}", e);
                return;
            }
        };

        let transcriber = self.transcriber.clone();
        let language = self.language.clone();
        let wav_path = wav.path().to_path_buf();
        let result = tokio::task::spawn_blocking(move || {
            transcriber.transcribe(&wav_path, language.as_deref())
        })
        .await;

        // The container is per-session; deletion failure is logged, not fatal
        if let Err(e) = wav.close() {
            tracing::warn!("Failed to delete temp audio file: {}", e);
        }

        let segments = match result {
            Ok(Ok(segments)) => segments,
            Ok(Err(e)) => {
                tracing::error!("Transcription failed: {}", e);
                return;
            }
            Err(e) => {
                tracing::error!("Transcription task failed: {}", e);
                return;
            }
        };

        let text = join_segments(&segments);
        let text = text.trim();
        if text.is_empty() {
            tracing::info!("Transcription was empty");
            return;
        }
        tracing::info!("Recognized text: {:?}", text);

        // Restore the start window if focus moved during recording.
        // Best-effort: on failure the text still goes to whatever window
        // has focus now.
        let current = focus.active_window_id().await;
        let mut restored = false;
        if let Some(start_id) = &snapshot.id {
            if current.as_ref() != Some(start_id) {
                tracing::info!("Focus changed during recording, restoring start window");
                if focus.focus_window(start_id).await {
                    tokio::time::sleep(FOCUS_SETTLE).await;
                    restored = true;
                } else {
                    tracing::warn!(
                        "Could not restore the start window; injecting into the focused window"
                    );
                }
            }
        }

        if let Err(e) = output::type_with_fallback(injectors, &format!("{} ", text)).await {
            tracing::error!("Text injection failed: {}", e);
            return;
        }

        if self.is_confirm_target(snapshot.name.as_deref()) && !lifecycle.suppress_requested() {
            tracing::info!("Confirm target detected, tapping Return");
            tokio::time::sleep(CONFIRM_DELAY).await;
            if let Err(e) = output::tap_return_with_fallback(injectors).await {
                tracing::warn!("Confirm keystroke failed: {}", e);
            }
        }

        if restored && self.return_focus {
            if let Some(current) = current {
                tokio::time::sleep(RETURN_DELAY).await;
                if !focus.focus_window(&current).await {
                    tracing::debug!("Could not return focus to the interim window");
                }
            }
        }
    }

    fn is_confirm_target(&self, window_name: Option<&str>) -> bool {
        match window_name {
            Some(name) => self.confirm_apps.iter().any(|app| name.contains(app)),
            None => false,
        }
    }
}

/// Serialize the buffer into a self-describing WAV container (mono, 16-bit,
/// capture sample rate) at a temporary path.
fn write_wav(
    buffer: &[i16],
    sample_rate: u32,
) -> Result<tempfile::NamedTempFile, TranscribeError> {
    let temp_file = tempfile::Builder::new()
        .prefix("holdtype_")
        .suffix(".wav")
        .tempfile()
        .map_err(|e| TranscribeError::AudioFormat(format!("Failed to create temp file: {}", e)))?;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(temp_file.path(), spec)
        .map_err(|e| TranscribeError::AudioFormat(format!("Failed to create WAV writer: {}", e)))?;

    for &sample in buffer {
        writer
            .write_sample(sample)
            .map_err(|e| TranscribeError::AudioFormat(format!("Failed to write sample: {}", e)))?;
    }

    writer
        .finalize()
        .map_err(|e| TranscribeError::AudioFormat(format!("Failed to finalize WAV: {}", e)))?;

    Ok(temp_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InjectError;
    use crate::focus::WindowId;
    use crate::transcribe::Segment;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubTranscriber {
        segments: std::result::Result<Vec<Segment>, String>,
        calls: AtomicUsize,
    }

    impl StubTranscriber {
        fn with_segments(texts: &[&str]) -> Self {
            Self {
                segments: Ok(texts
                    .iter()
                    .map(|t| Segment {
                        text: t.to_string(),
                    })
                    .collect()),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                segments: Err("engine exploded".to_string()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Transcriber for StubTranscriber {
        fn transcribe(
            &self,
            _wav_path: &Path,
            _language: Option<&str>,
        ) -> std::result::Result<Vec<Segment>, TranscribeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.segments
                .clone()
                .map_err(TranscribeError::InvocationFailed)
        }
    }

    #[derive(Default)]
    struct StubFocus {
        current_id: Option<String>,
        accept_focus: bool,
        focused: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl FocusAdapter for StubFocus {
        async fn active_window_id(&self) -> Option<WindowId> {
            self.current_id.clone().map(WindowId)
        }

        async fn active_window_name(&self) -> Option<String> {
            None
        }

        async fn focus_window(&self, id: &WindowId) -> bool {
            self.focused.lock().unwrap().push(id.0.clone());
            self.accept_focus
        }
    }

    #[derive(Default)]
    struct StubInjector {
        typed: Mutex<Vec<String>>,
        taps: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl TextInjector for StubInjector {
        async fn type_text(&self, text: &str) -> std::result::Result<(), InjectError> {
            self.typed.lock().unwrap().push(text.to_string());
            Ok(())
        }

        async fn tap_return(&self) -> std::result::Result<(), InjectError> {
            self.taps.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    fn coordinator(transcriber: StubTranscriber) -> Coordinator {
        Coordinator::new(
            Arc::new(transcriber),
            16000,
            "en",
            vec!["Cursor".to_string()],
            true,
        )
    }

    #[tokio::test]
    async fn test_empty_buffer_short_circuits() {
        let transcriber = Arc::new(StubTranscriber::with_segments(&["never"]));
        let coordinator = Coordinator::new(
            transcriber.clone(),
            16000,
            "en",
            vec!["Cursor".to_string()],
            true,
        );
        let injector = Arc::new(StubInjector::default());
        let injectors: Vec<Box<dyn TextInjector>> = vec![Box::new(SharedInjector(injector.clone()))];
        let focus = StubFocus::default();
        let lifecycle = Lifecycle::new();

        coordinator
            .deliver(
                Vec::new(),
                &FocusSnapshot::default(),
                &focus,
                &injectors,
                &lifecycle,
            )
            .await;

        // No engine call, no injection, no confirm
        assert_eq!(transcriber.calls.load(Ordering::SeqCst), 0);
        assert!(injector.typed.lock().unwrap().is_empty());
        assert_eq!(injector.taps.load(Ordering::SeqCst), 0);
    }

    /// Wrapper so tests can keep a handle to the stub inside the boxed chain
    struct SharedInjector(Arc<StubInjector>);

    #[async_trait::async_trait]
    impl TextInjector for SharedInjector {
        async fn type_text(&self, text: &str) -> std::result::Result<(), InjectError> {
            self.0.type_text(text).await
        }

        async fn tap_return(&self) -> std::result::Result<(), InjectError> {
            self.0.tap_return().await
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn name(&self) -> &'static str {
            "stub"
        }
    }

    #[tokio::test]
    async fn test_segments_concatenated_with_trailing_space() {
        let coordinator = coordinator(StubTranscriber::with_segments(&["Hello", " world"]));
        let injector = Arc::new(StubInjector::default());
        let injectors: Vec<Box<dyn TextInjector>> = vec![Box::new(SharedInjector(injector.clone()))];
        let focus = StubFocus::default();
        let lifecycle = Lifecycle::new();

        coordinator
            .deliver(
                vec![0i16; 1600],
                &FocusSnapshot::default(),
                &focus,
                &injectors,
                &lifecycle,
            )
            .await;

        assert_eq!(*injector.typed.lock().unwrap(), vec!["Hello world "]);
        // Snapshot has no window name, so no confirm tap
        assert_eq!(injector.taps.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_whitespace_only_result_injects_nothing() {
        let coordinator = coordinator(StubTranscriber::with_segments(&["  ", " "]));
        let injector = Arc::new(StubInjector::default());
        let injectors: Vec<Box<dyn TextInjector>> = vec![Box::new(SharedInjector(injector.clone()))];
        let focus = StubFocus::default();
        let lifecycle = Lifecycle::new();

        coordinator
            .deliver(
                vec![0i16; 1600],
                &FocusSnapshot::default(),
                &focus,
                &injectors,
                &lifecycle,
            )
            .await;

        assert!(injector.typed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_engine_failure_is_a_noop() {
        let coordinator = coordinator(StubTranscriber::failing());
        let injector = Arc::new(StubInjector::default());
        let injectors: Vec<Box<dyn TextInjector>> = vec![Box::new(SharedInjector(injector.clone()))];
        let focus = StubFocus::default();
        let lifecycle = Lifecycle::new();

        coordinator
            .deliver(
                vec![0i16; 1600],
                &FocusSnapshot::default(),
                &focus,
                &injectors,
                &lifecycle,
            )
            .await;

        assert!(injector.typed.lock().unwrap().is_empty());
        assert_eq!(injector.taps.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_restore_still_injects() {
        let coordinator = coordinator(StubTranscriber::with_segments(&["text"]));
        let injector = Arc::new(StubInjector::default());
        let injectors: Vec<Box<dyn TextInjector>> = vec![Box::new(SharedInjector(injector.clone()))];
        let focus = StubFocus {
            current_id: Some("222".to_string()),
            accept_focus: false,
            ..Default::default()
        };
        let lifecycle = Lifecycle::new();
        let snapshot = FocusSnapshot {
            id: Some(WindowId("111".to_string())),
            name: None,
        };

        coordinator
            .deliver(vec![0i16; 1600], &snapshot, &focus, &injectors, &lifecycle)
            .await;

        // Restore was attempted exactly once and failed; injection happened anyway
        assert_eq!(*focus.focused.lock().unwrap(), vec!["111"]);
        assert_eq!(*injector.typed.lock().unwrap(), vec!["text "]);
    }

    #[tokio::test]
    async fn test_restore_and_return_focus() {
        let coordinator = coordinator(StubTranscriber::with_segments(&["text"]));
        let injector = Arc::new(StubInjector::default());
        let injectors: Vec<Box<dyn TextInjector>> = vec![Box::new(SharedInjector(injector.clone()))];
        let focus = StubFocus {
            current_id: Some("222".to_string()),
            accept_focus: true,
            ..Default::default()
        };
        let lifecycle = Lifecycle::new();
        let snapshot = FocusSnapshot {
            id: Some(WindowId("111".to_string())),
            name: None,
        };

        coordinator
            .deliver(vec![0i16; 1600], &snapshot, &focus, &injectors, &lifecycle)
            .await;

        // Start window restored for injection, then focus handed back
        assert_eq!(*focus.focused.lock().unwrap(), vec!["111", "222"]);
    }

    #[tokio::test]
    async fn test_unchanged_focus_skips_restore() {
        let coordinator = coordinator(StubTranscriber::with_segments(&["text"]));
        let injector = Arc::new(StubInjector::default());
        let injectors: Vec<Box<dyn TextInjector>> = vec![Box::new(SharedInjector(injector.clone()))];
        let focus = StubFocus {
            current_id: Some("111".to_string()),
            accept_focus: true,
            ..Default::default()
        };
        let lifecycle = Lifecycle::new();
        let snapshot = FocusSnapshot {
            id: Some(WindowId("111".to_string())),
            name: None,
        };

        coordinator
            .deliver(vec![0i16; 1600], &snapshot, &focus, &injectors, &lifecycle)
            .await;

        assert!(focus.focused.lock().unwrap().is_empty());
        assert_eq!(*injector.typed.lock().unwrap(), vec!["text "]);
    }

    #[tokio::test]
    async fn test_confirm_fires_for_target_app() {
        let coordinator = coordinator(StubTranscriber::with_segments(&["text"]));
        let injector = Arc::new(StubInjector::default());
        let injectors: Vec<Box<dyn TextInjector>> = vec![Box::new(SharedInjector(injector.clone()))];
        let focus = StubFocus::default();
        let lifecycle = Lifecycle::new();
        let snapshot = FocusSnapshot {
            id: None,
            name: Some("main.rs - Cursor".to_string()),
        };

        coordinator
            .deliver(vec![0i16; 1600], &snapshot, &focus, &injectors, &lifecycle)
            .await;

        assert_eq!(injector.taps.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_confirm_suppressed_by_space() {
        let coordinator = coordinator(StubTranscriber::with_segments(&["text"]));
        let injector = Arc::new(StubInjector::default());
        let injectors: Vec<Box<dyn TextInjector>> = vec![Box::new(SharedInjector(injector.clone()))];
        let focus = StubFocus::default();
        let lifecycle = Lifecycle::new();
        lifecycle.note_space();
        let snapshot = FocusSnapshot {
            id: None,
            name: Some("main.rs - Cursor".to_string()),
        };

        coordinator
            .deliver(vec![0i16; 1600], &snapshot, &focus, &injectors, &lifecycle)
            .await;

        assert_eq!(*injector.typed.lock().unwrap(), vec!["text "]);
        assert_eq!(injector.taps.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_confirm_skipped_for_other_apps() {
        let coordinator = coordinator(StubTranscriber::with_segments(&["text"]));
        let injector = Arc::new(StubInjector::default());
        let injectors: Vec<Box<dyn TextInjector>> = vec![Box::new(SharedInjector(injector.clone()))];
        let focus = StubFocus::default();
        let lifecycle = Lifecycle::new();
        let snapshot = FocusSnapshot {
            id: None,
            name: Some("Firefox".to_string()),
        };

        coordinator
            .deliver(vec![0i16; 1600], &snapshot, &focus, &injectors, &lifecycle)
            .await;

        assert_eq!(injector.taps.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_write_wav_header() {
        let buffer = vec![0i16; 16000];
        let wav = write_wav(&buffer, 16000).unwrap();
        let reader = hound::WavReader::open(wav.path()).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16000);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.len(), 16000);
    }

    #[test]
    fn test_language_auto_maps_to_none() {
        let coordinator = Coordinator::new(
            Arc::new(StubTranscriber::with_segments(&[])),
            16000,
            "auto",
            vec![],
            false,
        );
        assert!(coordinator.language.is_none());
    }
}
