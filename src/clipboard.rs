use crate::logging::{log_debug, log_info};
use anyhow::{Context, Result};
use arboard::Clipboard;

/// Destination for copied answers
pub trait ClipboardSink {
    fn set_text(&mut self, text: &str) -> Result<()>;
}

/// System clipboard through the platform API. Text is handed over as-is and
/// never passes through a shell.
pub struct ClipboardManager {
    clipboard: Option<Clipboard>,
}

impl ClipboardManager {
    /// The platform clipboard is opened on first use so that a missing
    /// clipboard only matters once the user asks to copy.
    pub fn new() -> Self {
        Self { clipboard: None }
    }

    fn clipboard(&mut self) -> Result<&mut Clipboard> {
        if self.clipboard.is_none() {
            log_debug("Initializing clipboard manager");
            self.clipboard = Some(Clipboard::new().context("Failed to initialize clipboard")?);
        }
        self.clipboard
            .as_mut()
            .context("Clipboard is not available")
    }
}

impl Default for ClipboardManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardSink for ClipboardManager {
    fn set_text(&mut self, text: &str) -> Result<()> {
        log_debug(&format!("Writing {} characters to clipboard", text.len()));

        self.clipboard()?
            .set_text(text)
            .context("Failed to write text to clipboard")?;

        log_info("Successfully wrote text to clipboard");
        Ok(())
    }
}
