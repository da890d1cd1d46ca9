//! Window-focus adapter
//!
//! Identifies the focused window and refocuses it later so transcribed text
//! lands where recording started, even if the user clicked elsewhere in the
//! meantime. Every operation is best-effort: the platform tool may be
//! missing or the compositor may refuse, so lookups return `None` and
//! refocusing returns `false` instead of erroring. Callers must never block
//! a recording session on an adapter failure.

#[cfg(target_os = "macos")]
pub mod applescript;
#[cfg(target_os = "linux")]
pub mod xdotool;

/// Opaque platform window identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowId(pub String);

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capability interface for window identification and focus
#[async_trait::async_trait]
pub trait FocusAdapter: Send + Sync {
    /// Identity of the currently focused window, if it can be determined
    async fn active_window_id(&self) -> Option<WindowId>;

    /// Name/title of the currently focused window, if it can be determined
    async fn active_window_name(&self) -> Option<String>;

    /// Try to focus the given window. Returns whether the platform tool
    /// accepted the request.
    async fn focus_window(&self, id: &WindowId) -> bool;
}

/// Adapter for platforms without a focus tool; everything is absent
pub struct NoopAdapter;

#[async_trait::async_trait]
impl FocusAdapter for NoopAdapter {
    async fn active_window_id(&self) -> Option<WindowId> {
        None
    }

    async fn active_window_name(&self) -> Option<String> {
        None
    }

    async fn focus_window(&self, _id: &WindowId) -> bool {
        false
    }
}

/// Select the platform adapter once at startup
#[cfg(target_os = "linux")]
pub fn create_adapter() -> Box<dyn FocusAdapter> {
    Box::new(xdotool::XdotoolAdapter::new())
}

#[cfg(target_os = "macos")]
pub fn create_adapter() -> Box<dyn FocusAdapter> {
    Box::new(applescript::AppleScriptAdapter::new())
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn create_adapter() -> Box<dyn FocusAdapter> {
    tracing::warn!("No window-focus tool for this platform; focus restore disabled");
    Box::new(NoopAdapter)
}
