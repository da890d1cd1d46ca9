//! Text injection module
//!
//! Types transcribed text into the focused window via keyboard simulation,
//! and synthesizes the optional confirm keystroke. Injection goes through a
//! fallback chain so a missing tool degrades instead of failing the session:
//!
//! Linux: xdotool (X11, pairs with the xdotool focus adapter) -> wtype (Wayland)
//! macOS: osascript keystroke

#[cfg(target_os = "macos")]
pub mod osascript;
#[cfg(target_os = "linux")]
pub mod wtype;
#[cfg(target_os = "linux")]
pub mod xdotool;

use crate::error::InjectError;

/// Trait for text injection implementations
#[async_trait::async_trait]
pub trait TextInjector: Send + Sync {
    /// Type text into the focused window
    async fn type_text(&self, text: &str) -> Result<(), InjectError>;

    /// Tap the Return key (auto-confirm)
    async fn tap_return(&self) -> Result<(), InjectError>;

    /// Check if this injection method is available
    async fn is_available(&self) -> bool;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Factory function that returns the platform fallback chain
#[cfg(target_os = "linux")]
pub fn create_injector_chain() -> Vec<Box<dyn TextInjector>> {
    vec![
        Box::new(xdotool::XdotoolInjector::new()),
        Box::new(wtype::WtypeInjector::new()),
    ]
}

#[cfg(target_os = "macos")]
pub fn create_injector_chain() -> Vec<Box<dyn TextInjector>> {
    vec![Box::new(osascript::OsascriptInjector::new())]
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn create_injector_chain() -> Vec<Box<dyn TextInjector>> {
    Vec::new()
}

/// Try each injector in the chain until one succeeds
pub async fn type_with_fallback(
    chain: &[Box<dyn TextInjector>],
    text: &str,
) -> Result<(), InjectError> {
    for injector in chain {
        if !injector.is_available().await {
            tracing::debug!("{} not available, trying next", injector.name());
            continue;
        }

        match injector.type_text(text).await {
            Ok(()) => {
                tracing::debug!("Text injected via {}", injector.name());
                return Ok(());
            }
            Err(e) => {
                tracing::warn!("{} failed: {}, trying next", injector.name(), e);
            }
        }
    }

    Err(InjectError::AllMethodsFailed)
}

/// Tap Return via the first available injector
pub async fn tap_return_with_fallback(chain: &[Box<dyn TextInjector>]) -> Result<(), InjectError> {
    for injector in chain {
        if !injector.is_available().await {
            continue;
        }

        match injector.tap_return().await {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::warn!("{} confirm tap failed: {}, trying next", injector.name(), e);
            }
        }
    }

    Err(InjectError::AllMethodsFailed)
}

/// Check whether a command exists in PATH
pub(crate) async fn command_in_path(command: &str) -> bool {
    tokio::process::Command::new("which")
        .arg(command)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}
