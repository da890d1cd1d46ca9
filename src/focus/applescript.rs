//! AppleScript-based window focus (macOS)
//!
//! Uses osascript with System Events to read and set the frontmost
//! application process. Requires Accessibility permissions for the
//! terminal/app running holdtype.

use super::{FocusAdapter, WindowId};
use std::process::Stdio;
use tokio::process::Command;

pub struct AppleScriptAdapter;

impl AppleScriptAdapter {
    pub fn new() -> Self {
        Self
    }

    async fn run_script(&self, script: &str) -> Option<String> {
        let output = Command::new("osascript")
            .args(["-e", script])
            .stdin(Stdio::null())
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if stdout.is_empty() {
                    None
                } else {
                    Some(stdout)
                }
            }
            Ok(output) => {
                tracing::debug!(
                    "osascript failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                None
            }
            Err(e) => {
                tracing::debug!("osascript not available: {}", e);
                None
            }
        }
    }
}

impl Default for AppleScriptAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl FocusAdapter for AppleScriptAdapter {
    async fn active_window_id(&self) -> Option<WindowId> {
        self.run_script(
            r#"tell application "System Events" to get id of first application process whose frontmost is true"#,
        )
        .await
        .map(WindowId)
    }

    async fn active_window_name(&self) -> Option<String> {
        self.run_script(
            r#"tell application "System Events" to get name of first application process whose frontmost is true"#,
        )
        .await
    }

    async fn focus_window(&self, id: &WindowId) -> bool {
        let script = format!(
            r#"tell application "System Events" to set frontmost of first application process whose id is {} to true"#,
            id.0
        );
        let status = Command::new("osascript")
            .args(["-e", &script])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) => status.success(),
            Err(e) => {
                tracing::debug!("osascript not available: {}", e);
                false
            }
        }
    }
}
