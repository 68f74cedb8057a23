//! Popup placement engine.
//!
//! DESIGN
//! ======
//! Each marker owns one popup. The board keeps per-popup state (visibility,
//! image wait, placement, spacer) and answers host callbacks with [`Action`]s.
//! The host renders popups hidden, measures them and reports back; popups with
//! embedded images are measured again once every image has loaded or failed,
//! or when the wait times out.
//!
//! Every rebuild bumps the board generation. Callbacks carry the generation
//! they were issued under and are dropped when it no longer matches, so a slow
//! image from a previous layout can never move a popup of the current one.
//!
//! Visibility is two flags. Hover shows and hides with the pointer, with a
//! grace delay on leave so the pointer can travel onto the popup. Click pins
//! the popup; only another marker's click, an outside click or hide-all clears
//! it.

#[cfg(test)]
#[path = "popup_test.rs"]
mod popup_test;

use crate::config::ViewerConfig;
use crate::consts::POPUP_GAP_PX;
use crate::engine::Action;
use crate::format;
use crate::input::Surface;
use crate::mapper::Point;

/// Tunables the board reads on every decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopupSettings {
    pub gap: f64,
    pub wide_text_threshold: usize,
    pub wide_popup_ratio: f64,
    pub image_wait_timeout_ms: u32,
    pub hover_grace_ms: u32,
    pub spacer_padding_px: f64,
}

impl Default for PopupSettings {
    fn default() -> Self {
        Self::from_config(&ViewerConfig::default())
    }
}

impl PopupSettings {
    #[must_use]
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            gap: POPUP_GAP_PX,
            wide_text_threshold: config.wide_text_threshold,
            wide_popup_ratio: config.wide_popup_ratio,
            image_wait_timeout_ms: config.image_wait_timeout_ms,
            hover_grace_ms: config.hover_grace_ms,
            spacer_padding_px: config.spacer_padding_px,
        }
    }
}

/// A popup ready to render, in displayed-image pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupView {
    pub popup_id: String,
    pub marker_dom_id: String,
    pub title: String,
    pub html: String,
    /// Center of the owning marker.
    pub anchor: Point,
    pub diameter: f64,
    /// Explicit width for widened popups; `None` keeps the stylesheet width.
    pub width: Option<f64>,
    pub has_image: bool,
    /// Hold the final placement until embedded images settle.
    pub wait_for_images: bool,
}

impl PopupView {
    /// Initial position: centered under the marker.
    #[must_use]
    pub fn default_placement(&self, gap: f64) -> Placement {
        Placement {
            side: Side::Below,
            left: self.anchor.x,
            top: self.anchor.y + self.diameter / 2.0 + gap,
        }
    }

    #[must_use]
    pub fn spacer_id(&self) -> String {
        spacer_id(&self.popup_id)
    }
}

#[must_use]
pub fn spacer_id(popup_id: &str) -> String {
    format!("popup-spacer-{popup_id}")
}

/// Desktop popups holding an image or long text span part of the image width.
#[must_use]
pub fn popup_width(text: &str, surface: Surface, display_width: f64, settings: &PopupSettings) -> Option<f64> {
    if surface.is_mobile() {
        return None;
    }
    let wide = format::has_embedded_image(text) || text.chars().count() > settings.wide_text_threshold;
    wide.then(|| display_width * settings.wide_popup_ratio)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Below,
    Above,
}

/// Final popup position relative to the overlay. `left` is the horizontal
/// center; the element is shifted back by half its width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub side: Side,
    pub left: f64,
    pub top: f64,
}

impl Placement {
    #[must_use]
    pub fn is_above(&self) -> bool {
        self.side == Side::Above
    }
}

/// Inputs to the above/below decision.
#[derive(Debug, Clone, Copy)]
pub struct PlacementInput {
    /// Marker center, overlay-relative.
    pub anchor: Point,
    /// Marker center y in viewport coordinates.
    pub viewport_y: f64,
    pub diameter: f64,
    /// Measured popup height.
    pub height: f64,
    pub viewport_height: f64,
    pub has_image: bool,
    pub gap: f64,
}

/// Pick the side that keeps the popup on screen.
///
/// Below wins when going above would clip the top of the viewport. Text-only
/// popups also go below when they fit there, or when the marker sits in the
/// top half of the viewport and below has at least as much room.
#[must_use]
pub fn place(input: &PlacementInput) -> Placement {
    let half = input.diameter / 2.0;
    let y = input.viewport_y;
    let space_below = input.viewport_height - (y + half + input.gap);
    let space_above = y - half - input.gap;
    let clips_top = y - half - input.height - 2.0 * input.gap < 0.0;

    let below = clips_top
        || (!input.has_image && input.height <= space_below)
        || (!input.has_image && y < input.viewport_height / 2.0 && space_below >= space_above);

    if below {
        Placement {
            side: Side::Below,
            left: input.anchor.x,
            top: input.anchor.y + half + input.gap,
        }
    } else {
        Placement {
            side: Side::Above,
            left: input.anchor.x,
            top: input.anchor.y - half - input.height - 2.0 * input.gap,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Visibility {
    pub hover: bool,
    pub click: bool,
}

impl Visibility {
    #[must_use]
    pub fn is_visible(self) -> bool {
        self.hover || self.click
    }
}

/// Where the overlay sits in the viewport at measurement time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub height: f64,
    /// Top of the overlay in viewport coordinates.
    pub overlay_top: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageWait {
    Idle,
    Waiting(usize),
    Settled,
}

#[derive(Debug, Clone)]
struct Entry {
    view: PopupView,
    visibility: Visibility,
    wait: ImageWait,
    placement: Option<Placement>,
    spacer: Option<f64>,
    hide_token: Option<u64>,
}

pub struct PopupBoard {
    entries: Vec<Entry>,
    generation: u64,
    tokens: u64,
    settings: PopupSettings,
}

impl Default for PopupBoard {
    fn default() -> Self {
        Self::new(PopupSettings::default())
    }
}

impl PopupBoard {
    #[must_use]
    pub fn new(settings: PopupSettings) -> Self {
        Self { entries: Vec::new(), generation: 0, tokens: 0, settings }
    }

    #[must_use]
    pub fn settings(&self) -> &PopupSettings {
        &self.settings
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn visibility(&self, popup_id: &str) -> Option<Visibility> {
        self.entry(popup_id).map(|e| e.visibility)
    }

    /// Last computed placement, or the default one before measurement.
    #[must_use]
    pub fn placement(&self, popup_id: &str) -> Option<Placement> {
        self.entry(popup_id)
            .map(|e| e.placement.unwrap_or_else(|| e.view.default_placement(self.settings.gap)))
    }

    #[must_use]
    pub fn spacer_height(&self, popup_id: &str) -> Option<f64> {
        self.entry(popup_id).and_then(|e| e.spacer)
    }

    /// Ids of every popup currently shown.
    #[must_use]
    pub fn visible(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.visibility.is_visible())
            .map(|e| e.view.popup_id.as_str())
            .collect()
    }

    fn entry(&self, popup_id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.view.popup_id == popup_id)
    }

    fn entry_mut(&mut self, popup_id: &str) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.view.popup_id == popup_id)
    }

    fn current_mut(&mut self, generation: u64, popup_id: &str) -> Option<&mut Entry> {
        if generation != self.generation {
            log::debug!("popup: dropping stale callback for {popup_id} (gen {generation})");
            return None;
        }
        self.entry_mut(popup_id)
    }

    fn next_token(&mut self) -> u64 {
        self.tokens = self.tokens.wrapping_add(1);
        self.tokens
    }

    // --- Lifecycle ---

    /// Replace every popup. Spacers from the previous layout are removed and
    /// all visibility resets.
    pub fn rebuild(&mut self, views: Vec<PopupView>) -> Vec<Action> {
        let actions = self
            .entries
            .iter()
            .filter(|e| e.spacer.is_some())
            .map(|e| Action::RemoveSpacer { spacer_id: e.view.spacer_id() })
            .collect();
        self.generation = self.generation.wrapping_add(1);
        self.entries = views
            .into_iter()
            .map(|view| Entry {
                view,
                visibility: Visibility::default(),
                wait: ImageWait::Idle,
                placement: None,
                spacer: None,
                hide_token: None,
            })
            .collect();
        actions
    }

    // --- Measurement ---

    /// The host measured a popup's height. `pending_images` counts embedded
    /// images that have neither loaded nor failed yet.
    pub fn measured(
        &mut self,
        generation: u64,
        popup_id: &str,
        height: f64,
        pending_images: usize,
        viewport: Viewport,
    ) -> Vec<Action> {
        let timeout_ms = self.settings.image_wait_timeout_ms;
        let gap = self.settings.gap;
        let Some(entry) = self.current_mut(generation, popup_id) else {
            return Vec::new();
        };
        let must_wait = entry.view.wait_for_images && pending_images > 0 && entry.wait != ImageWait::Settled;
        if must_wait {
            entry.wait = ImageWait::Waiting(pending_images);
            return vec![Action::AwaitImages { popup_id: popup_id.to_string(), generation, timeout_ms }];
        }
        entry.wait = ImageWait::Settled;
        let placement = place(&PlacementInput {
            anchor: entry.view.anchor,
            viewport_y: viewport.overlay_top + entry.view.anchor.y,
            diameter: entry.view.diameter,
            height,
            viewport_height: viewport.height,
            has_image: entry.view.has_image,
            gap,
        });
        log::debug!("popup: {popup_id} placed {:?} at top {:.1}", placement.side, placement.top);
        entry.placement = Some(placement);
        let mut actions = vec![Action::PlacePopup { popup_id: popup_id.to_string(), placement }];
        // A popup already on screen may now reach past the viewport.
        if entry.visibility.is_visible() {
            actions.push(Action::ShowPopup { popup_id: popup_id.to_string(), generation });
        }
        actions
    }

    /// One embedded image loaded or failed.
    pub fn image_settled(&mut self, generation: u64, popup_id: &str) -> Vec<Action> {
        let Some(entry) = self.current_mut(generation, popup_id) else {
            return Vec::new();
        };
        let ImageWait::Waiting(remaining) = entry.wait else {
            return Vec::new();
        };
        if remaining > 1 {
            entry.wait = ImageWait::Waiting(remaining - 1);
            return Vec::new();
        }
        entry.wait = ImageWait::Settled;
        vec![Action::MeasurePopup { popup_id: popup_id.to_string(), generation }]
    }

    /// The image wait ceiling passed; proceed with whatever height is available.
    pub fn wait_timed_out(&mut self, generation: u64, popup_id: &str) -> Vec<Action> {
        let Some(entry) = self.current_mut(generation, popup_id) else {
            return Vec::new();
        };
        if !matches!(entry.wait, ImageWait::Waiting(_)) {
            return Vec::new();
        }
        log::debug!("popup: image wait timed out for {popup_id}");
        entry.wait = ImageWait::Settled;
        vec![Action::MeasurePopup { popup_id: popup_id.to_string(), generation }]
    }

    // --- Visibility ---

    fn show_actions(&self, popup_id: &str) -> Vec<Action> {
        vec![Action::ShowPopup { popup_id: popup_id.to_string(), generation: self.generation }]
    }

    fn hide_actions(entry: &mut Entry) -> Vec<Action> {
        let mut actions = vec![Action::HidePopup { popup_id: entry.view.popup_id.clone() }];
        if entry.spacer.take().is_some() {
            actions.push(Action::RemoveSpacer { spacer_id: entry.view.spacer_id() });
        }
        actions
    }

    /// Pointer entered a marker.
    pub fn hover_enter(&mut self, popup_id: &str) -> Vec<Action> {
        let Some(entry) = self.entry_mut(popup_id) else {
            return Vec::new();
        };
        entry.hide_token = None;
        if entry.visibility.is_visible() {
            entry.visibility.hover = true;
            return Vec::new();
        }
        entry.visibility.hover = true;
        self.show_actions(popup_id)
    }

    /// Pointer entered the popup itself; keeps a hover popup open.
    pub fn hold(&mut self, popup_id: &str) {
        if let Some(entry) = self.entry_mut(popup_id) {
            entry.hide_token = None;
        }
    }

    /// Pointer left the marker or the popup. Hover-only popups hide after the
    /// grace delay unless re-entered.
    pub fn hover_leave(&mut self, popup_id: &str) -> Vec<Action> {
        let delay_ms = self.settings.hover_grace_ms;
        let token = self.next_token();
        let Some(entry) = self.entry_mut(popup_id) else {
            return Vec::new();
        };
        if entry.visibility.click || !entry.visibility.hover {
            return Vec::new();
        }
        entry.hide_token = Some(token);
        vec![Action::ScheduleHoverHide { popup_id: popup_id.to_string(), token, delay_ms }]
    }

    /// Grace timer fired.
    pub fn hover_grace_elapsed(&mut self, popup_id: &str, token: u64) -> Vec<Action> {
        let Some(entry) = self.entry_mut(popup_id) else {
            return Vec::new();
        };
        if entry.hide_token != Some(token) {
            return Vec::new();
        }
        entry.hide_token = None;
        entry.visibility.hover = false;
        if entry.visibility.click {
            return Vec::new();
        }
        Self::hide_actions(entry)
    }

    /// Pin `popup_id` and hide every other popup.
    pub fn click_show(&mut self, popup_id: &str) -> Vec<Action> {
        if self.entry(popup_id).is_none() {
            return Vec::new();
        }
        let mut actions = Vec::new();
        for entry in self.entries.iter_mut().filter(|e| e.view.popup_id != popup_id) {
            let was_visible = entry.visibility.is_visible();
            entry.visibility = Visibility::default();
            entry.hide_token = None;
            if was_visible {
                actions.extend(Self::hide_actions(entry));
            }
        }
        let mut show = false;
        if let Some(entry) = self.entry_mut(popup_id) {
            show = !entry.visibility.is_visible();
            entry.visibility.click = true;
            entry.hide_token = None;
        }
        if show {
            actions.extend(self.show_actions(popup_id));
        }
        actions
    }

    /// Reset every popup to hidden.
    pub fn hide_all(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        for entry in &mut self.entries {
            let was_visible = entry.visibility.is_visible();
            entry.visibility = Visibility::default();
            entry.hide_token = None;
            if was_visible {
                actions.extend(Self::hide_actions(entry));
            }
        }
        actions
    }

    // --- Overflow ---

    /// The host measured a shown popup's bottom edge in viewport coordinates.
    /// Grows (never shrinks) the popup's spacer while it overflows.
    pub fn overflow(&mut self, generation: u64, popup_id: &str, bottom: f64, viewport_height: f64) -> Vec<Action> {
        let padding = self.settings.spacer_padding_px;
        let Some(entry) = self.current_mut(generation, popup_id) else {
            return Vec::new();
        };
        if !entry.visibility.is_visible() {
            return Vec::new();
        }
        let overflow = bottom - viewport_height;
        if overflow <= 0.0 {
            return Vec::new();
        }
        let needed = overflow + padding;
        if entry.spacer.is_some_and(|h| h >= needed) {
            return Vec::new();
        }
        entry.spacer = Some(needed);
        vec![Action::SetSpacer { spacer_id: entry.view.spacer_id(), height: needed }]
    }
}
