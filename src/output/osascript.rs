//! osascript-based text injection (macOS)
//!
//! Uses System Events `keystroke` to type text. Requires Accessibility
//! permissions for the terminal/app running holdtype.

use super::TextInjector;
use crate::error::InjectError;
use std::process::Stdio;
use tokio::process::Command;

pub struct OsascriptInjector;

impl OsascriptInjector {
    pub fn new() -> Self {
        Self
    }

    /// Escape text for an AppleScript string literal
    fn escape(text: &str) -> String {
        text.replace('\\', "\\\\").replace('"', "\\\"")
    }

    async fn run_script(&self, script: &str) -> Result<(), InjectError> {
        let output = Command::new("osascript")
            .args(["-e", script])
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| InjectError::InjectionFailed(format!("osascript: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InjectError::InjectionFailed(format!(
                "osascript failed: {}",
                stderr.trim()
            )));
        }

        Ok(())
    }
}

impl Default for OsascriptInjector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TextInjector for OsascriptInjector {
    async fn type_text(&self, text: &str) -> Result<(), InjectError> {
        if text.is_empty() {
            return Ok(());
        }

        let script = format!(
            r#"tell application "System Events" to keystroke "{}""#,
            Self::escape(text)
        );
        self.run_script(&script).await?;

        tracing::info!("Text typed via osascript ({} chars)", text.chars().count());
        Ok(())
    }

    async fn tap_return(&self) -> Result<(), InjectError> {
        // key code 36 is Return
        self.run_script(r#"tell application "System Events" to key code 36"#)
            .await
            .map_err(|e| InjectError::KeyTapFailed(e.to_string()))
    }

    async fn is_available(&self) -> bool {
        super::command_in_path("osascript").await
    }

    fn name(&self) -> &'static str {
        "osascript"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            OsascriptInjector::escape(r#"say "hi" \ bye"#),
            r#"say \"hi\" \\ bye"#
        );
    }
}
