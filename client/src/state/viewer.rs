//! Panel state for the viewer shell.
//!
//! DESIGN
//! ======
//! The overlay engine decides what the sidebar, general comment, mobile
//! overlay, login prompt and notices should show; this state holds the latest
//! answer so Leptos components can render it. Actions that need timers,
//! fetches or navigation pass through untouched for the runtime.

#[cfg(test)]
#[path = "viewer_test.rs"]
mod viewer_test;

use overlay::doc::PageId;
use overlay::engine::{Action, EditorView};

/// Title plus formatted body, as shown in the sidebar or mobile overlay.
#[derive(Clone, Debug, PartialEq)]
pub struct PanelItem {
    pub title: String,
    pub html: String,
}

/// Login modal request. `message` explains why it opened.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoginPrompt {
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub message: String,
    /// Offer a retry button that submits again.
    pub retryable: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewerState {
    /// Page whose data is on screen or loading.
    pub page: Option<PageId>,
    /// Source of the page image.
    pub image_src: Option<String>,
    pub sidebar: Option<PanelItem>,
    pub general_html: String,
    pub mobile: Option<PanelItem>,
    pub login: Option<LoginPrompt>,
    pub login_busy: bool,
    pub notice: Option<Notice>,
    /// Editor form snapshot; `None` in viewer mode.
    pub editor: Option<EditorView>,
    /// Bumped to scroll the general comment into view.
    pub scroll_general_seq: u64,
}

impl ViewerState {
    /// Absorb a panel action. Anything else is handed back for the runtime.
    pub fn apply(&mut self, action: Action) -> Option<Action> {
        match action {
            Action::UpdateSidebar { title, html } => self.sidebar = Some(PanelItem { title, html }),
            Action::SetGeneralComment { html } => self.general_html = html,
            Action::ShowMobileOverlay { title, html } => self.mobile = Some(PanelItem { title, html }),
            Action::CloseMobileOverlay => self.mobile = None,
            Action::ScrollToGeneral => self.scroll_general_seq += 1,
            Action::ShowLogin { message } => {
                self.login = Some(LoginPrompt { message });
                self.login_busy = false;
            }
            Action::Notice { message, retryable } => self.notice = Some(Notice { message, retryable }),
            other => return Some(other),
        }
        None
    }

    /// A different page started loading.
    pub fn page_changed(&mut self, page: PageId) {
        if self.page != Some(page) {
            self.sidebar = None;
            self.mobile = None;
            self.notice = None;
        }
        self.page = Some(page);
        self.image_src = Some(page.image_path());
    }

    pub fn close_login(&mut self) {
        self.login = None;
        self.login_busy = false;
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }
}
