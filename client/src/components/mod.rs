//! Reusable UI component modules.
//!
//! SYSTEM CONTEXT
//! ==============
//! `overlay_host` mounts the engine over the page image; the other components
//! render the panels it drives from the shared `ViewerState` context.

pub mod comment_sidebar;
pub mod editor_panel;
pub mod general_comment;
pub mod login_modal;
pub mod mobile_overlay;
pub mod notice_bar;
pub mod overlay_host;
pub mod pager;
