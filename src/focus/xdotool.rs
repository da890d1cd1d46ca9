//! xdotool-based window focus (Linux/X11)
//!
//! Shells out to xdotool for the three focus operations. xdotool only works
//! under X11 (or XWayland); when it is missing or fails, every operation
//! degrades to an absent result.

use super::{FocusAdapter, WindowId};
use std::process::Stdio;
use tokio::process::Command;

pub struct XdotoolAdapter;

impl XdotoolAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Run xdotool and return trimmed stdout on success
    async fn run(&self, args: &[&str]) -> Option<String> {
        let output = Command::new("xdotool")
            .args(args)
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
                    "xdotool {:?} failed: {}",
                    args,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                None
            }
            Err(e) => {
                tracing::debug!("xdotool not available: {}", e);
                None
            }
        }
    }
}

impl Default for XdotoolAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl FocusAdapter for XdotoolAdapter {
    async fn active_window_id(&self) -> Option<WindowId> {
        self.run(&["getactivewindow"]).await.map(WindowId)
    }

    async fn active_window_name(&self) -> Option<String> {
        self.run(&["getactivewindow", "getwindowname"]).await
    }

    async fn focus_window(&self, id: &WindowId) -> bool {
        let status = Command::new("xdotool")
            .args(["windowactivate", "--sync", &id.0])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) => status.success(),
            Err(e) => {
                tracing::debug!("xdotool windowactivate failed: {}", e);
                false
            }
        }
    }
}
