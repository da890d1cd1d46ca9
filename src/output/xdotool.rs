//! xdotool-based text injection (Linux/X11)
//!
//! Preferred on X11 because it pairs with the xdotool focus adapter: the
//! same tool that restored the start window does the typing.
//! --clearmodifiers prevents a still-held trigger key from garbling the
//! injected text.

use super::TextInjector;
use crate::error::InjectError;
use std::process::Stdio;
use tokio::process::Command;

pub struct XdotoolInjector;

impl XdotoolInjector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for XdotoolInjector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TextInjector for XdotoolInjector {
    async fn type_text(&self, text: &str) -> Result<(), InjectError> {
        if text.is_empty() {
            return Ok(());
        }

        let output = Command::new("xdotool")
            .args(["type", "--clearmodifiers", "--"])
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    InjectError::XdotoolNotFound
                } else {
                    InjectError::InjectionFailed(e.to_string())
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InjectError::InjectionFailed(format!(
                "xdotool type failed: {}",
                stderr.trim()
            )));
        }

        tracing::info!("Text typed via xdotool ({} chars)", text.chars().count());
        Ok(())
    }

    async fn tap_return(&self) -> Result<(), InjectError> {
        let output = Command::new("xdotool")
            .args(["key", "--clearmodifiers", "Return"])
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| InjectError::KeyTapFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InjectError::KeyTapFailed(format!(
                "xdotool key failed: {}",
                stderr.trim()
            )));
        }

        Ok(())
    }

    async fn is_available(&self) -> bool {
        super::command_in_path("xdotool").await
    }

    fn name(&self) -> &'static str {
        "xdotool"
    }
}
