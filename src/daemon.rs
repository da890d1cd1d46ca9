//! Daemon module - component wiring and main event loop
//!
//! Builds the collaborators once at startup (platform focus adapter,
//! injection chain, recognition engine, capture worker), then drives the
//! hotkey state machine from key events and Unix signals. Signal handlers
//! only set the lifecycle flag; the loop unwinds through normal scoped
//! cleanup so the device release order stays deterministic.

use crate::audio::{self, feedback::AudioFeedback};
use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::error::{HoldtypeError, Result};
use crate::focus;
use crate::hotkey;
use crate::lifecycle::Lifecycle;
use crate::machine::Machine;
use crate::output;
use crate::transcribe::{self, Transcriber};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};

/// Main daemon that orchestrates all components
pub struct Daemon {
    config: Config,
}

impl Daemon {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the daemon main loop until the quit key or a signal stops it
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("Starting holdtype daemon");

        let lifecycle = Arc::new(Lifecycle::new());

        let control_keys = hotkey::parse_trigger_keys(&self.config.control)?;

        let transcriber: Arc<dyn Transcriber> =
            Arc::from(transcribe::create_transcriber(&self.config.engine)?);

        // Device-open failure is fatal only at the boundary: the daemon
        // stays up and rejects recording attempts with a logged error.
        let capture = match audio::create_capture(&self.config.audio) {
            Ok(capture) => Some(capture),
            Err(e) => {
                tracing::error!("Failed to open audio device: {}. Recording is disabled.", e);
                None
            }
        };

        let focus = focus::create_adapter();

        let injectors = output::create_injector_chain();
        if injectors.is_empty() {
            tracing::warn!("No text injection tool for this platform");
        } else {
            tracing::debug!(
                "Injection chain: {}",
                injectors
                    .iter()
                    .map(|i| i.name())
                    .collect::<Vec<_>>()
                    .join(" -> ")
            );
        }

        let feedback = if self.config.feedback.enabled {
            match AudioFeedback::new(&self.config.feedback) {
                Ok(feedback) => Some(feedback),
                Err(e) => {
                    tracing::warn!("Failed to initialize feedback sounds: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let coordinator = Coordinator::new(
            transcriber,
            self.config.audio.sample_rate,
            &self.config.engine.language,
            self.config.inject.confirm_apps.clone(),
            self.config.inject.return_focus,
        );

        let mut listener = hotkey::create_listener(&self.config.control, lifecycle.clone())?;
        let mut events = listener.start().await?;

        let mut machine = Machine::new(
            control_keys.clone(),
            coordinator,
            capture,
            focus,
            injectors,
            feedback,
            lifecycle.clone(),
        );

        let keys_desc = control_keys
            .iter()
            .map(|k| k.to_string())
            .collect::<Vec<_>>()
            .join(" or ");
        tracing::info!(
            "Ready: hold {} and speak, release to inject. Release {} (or Ctrl+C) to quit.",
            keys_desc,
            self.config.control.quit_key
        );

        let mut sigterm = signal(SignalKind::terminate()).map_err(|e| {
            HoldtypeError::Config(format!("Failed to set up SIGTERM handler: {}", e))
        })?;

        while lifecycle.is_running() {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => machine.handle_event(event).await,
                        None => {
                            tracing::warn!("Hotkey listener channel closed");
                            lifecycle.request_stop();
                        }
                    }
                }

                // Graceful shutdown (SIGINT from Ctrl+C)
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT, shutting down...");
                    lifecycle.request_stop();
                }

                // Graceful shutdown (SIGTERM from systemctl stop)
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, shutting down...");
                    lifecycle.request_stop();
                }
            }
        }

        // Cleanup: detach the hook, then release the audio device.
        // The lifecycle guard makes this safe against racing quit paths.
        if let Err(e) = listener.stop().await {
            tracing::warn!("Failed to stop hotkey listener: {}", e);
        }
        machine.shutdown().await;

        tracing::info!("Daemon stopped");

        Ok(())
    }
}
