//! Viewer configuration.
//!
//! SYSTEM CONTEXT
//! ==============
//! The host page may set `window.REDPEN_CONFIG` (JSON), the legacy globals
//! `REDPEN_EDITOR` / `REDPEN_MOCKS` / `REDPEN_API_BASE`, and an `editor` flag
//! in the query string or hash. The client collects those raw inputs and this
//! module folds them, in that order, over the defaults.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::{Deserialize, Serialize};

use crate::consts;
use crate::draft::FieldError;
use crate::marker::AnchorPolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid viewer config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// User-visible strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Labels {
    pub comment_title: String,
    pub no_general: String,
    pub show_general: String,
    pub close: String,
    pub discard_changes: String,
    pub conflict_refetch: String,
    pub session_expired: String,
    pub submit_failed: String,
    pub submitted: String,
    pub staged: String,
    pub login_failed: String,
    pub invalid_type: String,
    pub content_required: String,
    pub coords_forbidden: String,
    pub coords_required: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            comment_title: "Comment".into(),
            no_general: "No general comment.".into(),
            show_general: "Show general comment".into(),
            close: "Close".into(),
            discard_changes: "Discard unsaved changes?".into(),
            conflict_refetch: "Someone changed this page. Reload the data?".into(),
            session_expired: "Session expired, please sign in again".into(),
            submit_failed: "Could not save the annotation. Try again.".into(),
            submitted: "Saved".into(),
            staged: "Preview updated".into(),
            login_failed: "Sign-in failed".into(),
            invalid_type: "Invalid annotation type".into(),
            content_required: "Text is required".into(),
            coords_forbidden: "Coordinates are not used for general".into(),
            coords_required: "Click the image to set coordinates".into(),
        }
    }
}

impl Labels {
    /// Title shown over popups, the sidebar item and the mobile overlay.
    #[must_use]
    pub fn title(&self, number: usize) -> String {
        format!("{} {number}", self.comment_title)
    }

    #[must_use]
    pub fn field_error(&self, error: FieldError) -> &str {
        match error {
            FieldError::InvalidType => &self.invalid_type,
            FieldError::ContentRequired => &self.content_required,
            FieldError::CoordsForbidden => &self.coords_forbidden,
            FieldError::CoordsRequired => &self.coords_required,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
    /// Mount editing affordances.
    pub editor: bool,
    /// Use the in-process mock backend instead of HTTP.
    pub mock: bool,
    /// Render comment text as markdown; `false` selects the plain fallback.
    pub markdown: bool,
    /// Prefix for `/api/...` requests. Empty means same origin.
    pub api_base: String,
    pub start_page: u32,
    /// Last page number, when the deployment knows it.
    pub page_count: Option<u32>,
    pub anchor_policy: AnchorPolicy,
    pub region_scale: f64,
    pub mobile_breakpoint_px: f64,
    pub swipe_threshold_px: f64,
    pub resize_debounce_ms: u32,
    pub image_wait_timeout_ms: u32,
    pub hover_grace_ms: u32,
    pub wide_text_threshold: usize,
    pub wide_popup_ratio: f64,
    pub spacer_padding_px: f64,
    pub log_level: String,
    pub labels: Labels,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            editor: false,
            mock: false,
            markdown: true,
            api_base: String::new(),
            start_page: 1,
            page_count: None,
            anchor_policy: AnchorPolicy::default(),
            region_scale: consts::REGION_SCALE,
            mobile_breakpoint_px: consts::MOBILE_BREAKPOINT_PX,
            swipe_threshold_px: consts::SWIPE_THRESHOLD_PX,
            resize_debounce_ms: consts::RESIZE_DEBOUNCE_MS,
            image_wait_timeout_ms: consts::IMAGE_WAIT_TIMEOUT_MS,
            hover_grace_ms: consts::HOVER_GRACE_MS,
            wide_text_threshold: consts::WIDE_TEXT_THRESHOLD,
            wide_popup_ratio: consts::WIDE_POPUP_RATIO,
            spacer_padding_px: consts::SPACER_PADDING_PX,
            log_level: "info".into(),
            labels: Labels::default(),
        }
    }
}

/// Raw host inputs, collected by the client before the engine exists.
#[derive(Debug, Clone, Default)]
pub struct HostInputs {
    /// `window.REDPEN_CONFIG`, serialized.
    pub config_json: Option<String>,
    /// `window.REDPEN_EDITOR === true`.
    pub editor_global: bool,
    /// `window.REDPEN_MOCKS === true`.
    pub mocks_global: bool,
    /// `window.REDPEN_API_BASE`.
    pub api_base_global: Option<String>,
    /// `location.search`, including the leading `?`.
    pub search: String,
    /// `location.hash`, including the leading `#`.
    pub hash: String,
}

impl ViewerConfig {
    /// Parse a JSON override; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON or mistyped fields.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Fold host inputs over the defaults. A bad JSON blob is logged and
    /// ignored so the viewer still starts.
    #[must_use]
    pub fn resolve(inputs: &HostInputs) -> Self {
        let mut config = match inputs.config_json.as_deref().map(Self::from_json) {
            Some(Ok(config)) => config,
            Some(Err(e)) => {
                log::warn!("config: {e}; using defaults");
                Self::default()
            }
            None => Self::default(),
        };
        config.editor |= inputs.editor_global;
        config.mock |= inputs.mocks_global;
        if let Some(base) = inputs.api_base_global.as_deref() {
            config.api_base = base.to_string();
        }
        config.editor |= editor_flag(&inputs.search, &inputs.hash);
        config.api_base = config.api_base.trim_end_matches('/').to_string();
        config
    }

    /// Configured log level, falling back to `Info`.
    #[must_use]
    pub fn log_level(&self) -> log::Level {
        self.log_level.parse().unwrap_or(log::Level::Info)
    }

    /// Absolute API url for a path beginning with `/api/`.
    #[must_use]
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }
}

/// `editor=1` or `editor=true` in either the query string or the hash.
#[must_use]
pub fn editor_flag(search: &str, hash: &str) -> bool {
    [search.trim_start_matches('?'), hash.trim_start_matches('#')]
        .into_iter()
        .any(|part| param(part, "editor").is_some_and(|v| v == "1" || v == "true"))
}

fn param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        (k == key).then_some(v)
    })
}
