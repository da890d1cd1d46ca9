//! wtype-based text injection (Linux/Wayland)
//!
//! Fallback for Wayland sessions where xdotool cannot type. No daemon
//! required, good Unicode support. Focus restore is typically unavailable
//! on Wayland, so text lands in whatever window has focus.

use super::TextInjector;
use crate::error::InjectError;
use std::process::Stdio;
use tokio::process::Command;

pub struct WtypeInjector;

impl WtypeInjector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WtypeInjector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TextInjector for WtypeInjector {
    async fn type_text(&self, text: &str) -> Result<(), InjectError> {
        if text.is_empty() {
            return Ok(());
        }

        let output = Command::new("wtype")
            .arg("--")
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    InjectError::WtypeNotFound
                } else {
                    InjectError::InjectionFailed(e.to_string())
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InjectError::InjectionFailed(format!(
                "wtype failed: {}",
                stderr.trim()
            )));
        }

        tracing::info!("Text typed via wtype ({} chars)", text.chars().count());
        Ok(())
    }

    async fn tap_return(&self) -> Result<(), InjectError> {
        let output = Command::new("wtype")
            .args(["-k", "Return"])
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| InjectError::KeyTapFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InjectError::KeyTapFailed(format!(
                "wtype -k Return failed: {}",
                stderr.trim()
            )));
        }

        Ok(())
    }

    async fn is_available(&self) -> bool {
        super::command_in_path("wtype").await
    }

    fn name(&self) -> &'static str {
        "wtype"
    }
}
