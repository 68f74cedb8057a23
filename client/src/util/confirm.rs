//! `window.confirm` as the engine's [`Confirm`] prompt.

#[cfg(test)]
#[path = "confirm_test.rs"]
mod confirm_test;

use overlay::config::Labels;
use overlay::draft::{Confirm, Prompt};

/// Question shown for `prompt`.
pub fn prompt_text(labels: &Labels, prompt: Prompt) -> &str {
    match prompt {
        Prompt::DiscardChanges => &labels.discard_changes,
        Prompt::RefetchAfterConflict => &labels.conflict_refetch,
    }
}

/// Blocking browser confirm dialog. Declines when no window is available.
pub struct WindowConfirm<'a> {
    labels: &'a Labels,
}

impl<'a> WindowConfirm<'a> {
    pub fn new(labels: &'a Labels) -> Self {
        Self { labels }
    }
}

impl Confirm for WindowConfirm<'_> {
    fn confirm(&mut self, prompt: Prompt) -> bool {
        let text = prompt_text(self.labels, prompt);
        #[cfg(feature = "csr")]
        {
            web_sys::window()
                .and_then(|w| w.confirm_with_message(text).ok())
                .unwrap_or(false)
        }
        #[cfg(not(feature = "csr"))]
        {
            log::debug!("confirm: no browser for {text:?}; declining");
            false
        }
    }
}
