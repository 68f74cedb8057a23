//! Overlay engine: page lifecycle, interaction routing and the editor.
//!
//! DESIGN
//! ======
//! `EngineCore` owns every piece of overlay state and never touches the DOM.
//! Each host event maps to one method that returns the [`Action`]s the host
//! must carry out. `Engine` wraps the core together with the overlay element
//! and applies the DOM actions itself through [`crate::render`], handing the
//! rest (timers, fetches, Leptos-owned panels) back to the host.
//!
//! Async work never runs inside the core. Fetches are tagged with a
//! [`PageTicket`] and saves with a [`SaveRequest`]; both carry the navigation
//! generation and are dropped on arrival when the user has moved on.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::collections::VecDeque;

use web_sys::HtmlElement;

use crate::config::ViewerConfig;
use crate::doc::{AnnType, Coords, PageDoc, PageId, PagePayload, RawRegion, RegionMap, Regions};
use crate::draft::{Confirm, Draft, DraftMachine, EditingMode, Prompt, Transition};
use crate::format::{self, CommentFormatter};
use crate::hit::{Hit, hit_test};
use crate::input::{Debouncer, FlexDirection, PageStep, Surface, SwipeTracker, layout_direction};
use crate::mapper::{ImageScale, Point, Size};
use crate::marker::{self, LayoutContext, MarkerView};
use crate::popup::{self, Placement, PopupBoard, PopupSettings, PopupView, Viewport};
use crate::render;
use crate::sync::{
    self, BackendError, SaveAck, SavePayload, SaveRequest, SessionUser, Staged, SubmitBlocked, is_placeholder,
};

/// Work the host carries out after an engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // --- Overlay DOM ---
    /// Size the overlay to the displayed image.
    LayoutOverlay { width: f64, height: f64 },
    /// Replace every marker and popup element.
    RenderMarkers { generation: u64, markers: Vec<MarkerView>, popups: Vec<PopupView> },
    RemoveMarker { dom_id: String },
    /// Move the `is-selected` highlight; `None` clears it.
    SelectMarker { dom_id: Option<String> },
    SetLayoutDirection(FlexDirection),

    // --- Popups ---
    MeasurePopup { popup_id: String, generation: u64 },
    /// Listen for embedded images, then call back with `image_settled` or
    /// `wait_timed_out`.
    AwaitImages { popup_id: String, generation: u64, timeout_ms: u32 },
    PlacePopup { popup_id: String, placement: Placement },
    ShowPopup { popup_id: String, generation: u64 },
    HidePopup { popup_id: String },
    ScheduleHoverHide { popup_id: String, token: u64, delay_ms: u32 },
    SetSpacer { spacer_id: String, height: f64 },
    RemoveSpacer { spacer_id: String },

    // --- Panels ---
    UpdateSidebar { title: String, html: String },
    SetGeneralComment { html: String },
    ShowMobileOverlay { title: String, html: String },
    CloseMobileOverlay,
    ScrollToGeneral,

    // --- Host ---
    Navigate(PageId),
    /// Fetch the page again under a new navigation generation.
    RefetchPage(PageId),
    /// Call `resize_settled` with `token` after the delay.
    ScheduleReposition { token: u64, delay_ms: u32 },
    /// Editor form state changed; re-read `editor_view`.
    DraftChanged,
    ShowLogin { message: Option<String> },
    Notice { message: String, retryable: bool },
}

/// Identifies one page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTicket {
    pub page: PageId,
    pub generation: u64,
}

/// Editor capability. Present only when editor mode is on.
#[derive(Debug, Clone, Default)]
pub struct EditorState {
    pub machine: DraftMachine,
    pub user: Option<SessionUser>,
    pub submitting: bool,
    /// General text last copied into the draft on page load.
    autofilled: Option<String>,
}

/// Snapshot of the editor form for the host to render.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorView {
    pub mode: EditingMode,
    pub ann_type: AnnType,
    pub content: String,
    /// Coordinates as `[x, y]`; empty when unset.
    pub coords_text: String,
    /// The coordinate field is hidden for general drafts.
    pub show_coords: bool,
    pub dirty: bool,
    pub can_stage: bool,
    pub can_submit: bool,
    pub type_error: Option<String>,
    pub content_error: Option<String>,
    pub coords_error: Option<String>,
    pub username: Option<String>,
    pub submitting: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct ImageMetrics {
    natural: Option<Size>,
    display: Size,
}

/// Core engine state. Testable without a browser.
pub struct EngineCore {
    config: ViewerConfig,
    formatter: Box<dyn CommentFormatter>,
    page: Option<PageDoc>,
    current: PageId,
    nav_generation: u64,
    image: ImageMetrics,
    window_width: f64,
    surface: Surface,
    markers: Vec<MarkerView>,
    popups: PopupBoard,
    swipe: SwipeTracker,
    resize: Debouncer,
    /// Popup id shown in the mobile overlay.
    mobile_open: Option<String>,
    editor: Option<EditorState>,
}

impl EngineCore {
    /// Build with the formatter selected by `config.markdown`.
    #[must_use]
    pub fn new(config: ViewerConfig) -> Self {
        let formatter = format::formatter(config.markdown);
        Self::with_formatter(config, formatter)
    }

    #[must_use]
    pub fn with_formatter(config: ViewerConfig, formatter: Box<dyn CommentFormatter>) -> Self {
        let editor = config.editor.then(EditorState::default);
        Self {
            current: PageId::new(config.start_page),
            popups: PopupBoard::new(PopupSettings::from_config(&config)),
            config,
            formatter,
            page: None,
            nav_generation: 0,
            image: ImageMetrics::default(),
            window_width: 0.0,
            surface: Surface::Desktop,
            markers: Vec::new(),
            swipe: SwipeTracker::default(),
            resize: Debouncer::default(),
            mobile_open: None,
            editor,
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    #[must_use]
    pub fn page(&self) -> Option<&PageDoc> {
        self.page.as_ref()
    }

    #[must_use]
    pub fn current_page(&self) -> PageId {
        self.current
    }

    #[must_use]
    pub fn markers(&self) -> &[MarkerView] {
        &self.markers
    }

    #[must_use]
    pub fn popups(&self) -> &PopupBoard {
        &self.popups
    }

    #[must_use]
    pub fn surface(&self) -> Surface {
        self.surface
    }

    #[must_use]
    pub fn editor(&self) -> Option<&EditorState> {
        self.editor.as_ref()
    }

    #[must_use]
    pub fn is_editor(&self) -> bool {
        self.editor.is_some()
    }

    /// Display-per-original mapping for the current image. Prefers the natural
    /// size reported by the page provider over the decoded image.
    #[must_use]
    pub fn scale(&self) -> ImageScale {
        let natural = self
            .page
            .as_ref()
            .and_then(|p| p.natural)
            .or(self.image.natural)
            .unwrap_or(self.image.display);
        ImageScale::new(natural, self.image.display)
    }

    /// Markers can be mapped once the image has a displayed size and the
    /// natural size is known from the payload or the decoded image.
    fn can_map(&self) -> bool {
        let display = self.image.display;
        let natural = self.page.as_ref().and_then(|p| p.natural).or(self.image.natural);
        display.width > 0.0 && display.height > 0.0 && natural.is_some()
    }

    // --- Page lifecycle ---

    /// Start loading `page`. Responses for earlier tickets are ignored.
    pub fn request_page(&mut self, page: PageId) -> PageTicket {
        if page != self.current {
            if let Some(editor) = &mut self.editor {
                editor.machine.reset();
            }
            self.mobile_open = None;
            self.image = ImageMetrics::default();
        }
        self.current = page;
        self.nav_generation = self.nav_generation.wrapping_add(1);
        self.page = Some(PageDoc::new(page));
        self.markers.clear();
        PageTicket { page, generation: self.nav_generation }
    }

    fn is_current(&self, ticket: PageTicket) -> bool {
        ticket.page == self.current && ticket.generation == self.nav_generation
    }

    /// Page data arrived.
    pub fn apply_page(&mut self, ticket: PageTicket, result: Result<PagePayload, BackendError>) -> Vec<Action> {
        if !self.is_current(ticket) {
            log::warn!("engine: dropping stale page response for {}", ticket.page);
            return Vec::new();
        }
        let regions = self.page.take().map(|p| p.regions).unwrap_or_default();
        let mut actions = Vec::new();
        let mut doc = match result {
            Ok(payload) => PageDoc::from_payload(ticket.page, payload),
            Err(BackendError::Unauthenticated) => {
                log::info!("engine: {} requires sign-in", ticket.page);
                actions.push(Action::ShowLogin { message: None });
                PageDoc::new(ticket.page)
            }
            Err(e) => {
                log::warn!("engine: loading {} failed: {e}", ticket.page);
                PageDoc::new(ticket.page)
            }
        };
        doc.regions = regions;
        log::info!("engine: loaded {} with {} annotations", doc.page_id, doc.len());
        self.page = Some(doc);
        if self.autofill_general() {
            actions.push(Action::DraftChanged);
        }
        actions.extend(self.reposition());
        actions
    }

    /// Content regions arrived. A failure falls back to stored coordinates.
    pub fn apply_regions(&mut self, ticket: PageTicket, result: Result<Vec<RawRegion>, BackendError>) -> Vec<Action> {
        if !self.is_current(ticket) {
            log::warn!("engine: dropping stale regions for {}", ticket.page);
            return Vec::new();
        }
        let scale = self.config.region_scale;
        let Some(page) = &mut self.page else {
            return Vec::new();
        };
        page.regions = match result {
            Ok(raw) => Regions::Loaded(RegionMap::from_raw(&raw, scale)),
            Err(e) => {
                log::warn!("engine: regions for {} unavailable ({e}); using coords only", ticket.page);
                Regions::Failed
            }
        };
        self.reposition()
    }

    /// Copy the page's general note into an untouched general draft.
    fn autofill_general(&mut self) -> bool {
        let general = self.page.as_ref().and_then(PageDoc::general).cloned();
        let Some(editor) = &mut self.editor else {
            return false;
        };
        let draft = editor.machine.draft();
        if draft.ann_type != AnnType::General {
            return false;
        }
        let untouched = draft.content.is_empty() || editor.autofilled.as_deref() == Some(draft.content.as_str());
        if !untouched {
            return false;
        }
        match general {
            Some(general) => {
                editor.autofilled = Some(general.text.clone());
                editor.machine.begin_existing(Draft::from_annotation(&general));
            }
            None => {
                editor.autofilled = None;
                editor.machine.begin_new(Draft::empty(AnnType::General));
            }
        }
        true
    }

    /// The page image decoded (or was resized) at `display` CSS pixels.
    pub fn image_loaded(&mut self, natural: Size, display: Size) -> Vec<Action> {
        self.image.natural = (natural.width > 0.0 && natural.height > 0.0).then_some(natural);
        self.image.display = display;
        self.reposition()
    }

    /// Window resized. The surface follows at once; markers follow after the
    /// debounce delay.
    pub fn resize(&mut self, window_width: f64) -> Vec<Action> {
        self.window_width = window_width;
        let surface = Surface::for_width(window_width, self.config.mobile_breakpoint_px);
        let mut actions = Vec::new();
        if surface != self.surface {
            log::debug!("engine: surface {:?} -> {surface:?}", self.surface);
            self.surface = surface;
            self.swipe.cancel();
            if !surface.is_mobile() && self.mobile_open.take().is_some() {
                actions.push(Action::CloseMobileOverlay);
            }
        }
        let token = self.resize.bump();
        actions.push(Action::ScheduleReposition { token, delay_ms: self.config.resize_debounce_ms });
        actions
    }

    /// Debounce timer fired. Only the latest token rebuilds.
    pub fn resize_settled(&mut self, token: u64, display: Size) -> Vec<Action> {
        if !self.resize.is_current(token) {
            return Vec::new();
        }
        self.image.display = display;
        self.reposition()
    }

    /// Rebuild every marker and popup from the page state.
    pub fn reposition(&mut self) -> Vec<Action> {
        let Some(page) = &self.page else {
            return Vec::new();
        };
        let display = self.image.display;
        let ctx = LayoutContext {
            page: page.page_id,
            regions: page.region_map(),
            scale: self.scale(),
            policy: self.config.anchor_policy,
        };
        let markers = if self.can_map() {
            marker::layout(page.annotations(), &ctx)
        } else {
            log::debug!("engine: {} waiting for image size; markers deferred", page.page_id);
            Vec::new()
        };
        let views: Vec<PopupView> = markers.iter().map(|m| self.popup_view(page, m)).collect();
        let general_html = self.general_html(page, &markers);
        let image_width = (display.width > 0.0).then_some(display.width);

        let mut actions = self.popups.rebuild(views.clone());
        let generation = self.popups.generation();
        log::debug!("engine: reposition gen {generation}: {} markers", markers.len());
        actions.push(Action::LayoutOverlay { width: display.width, height: display.height });
        actions.push(Action::RenderMarkers { generation, markers: markers.clone(), popups: views });
        actions.extend(
            markers
                .iter()
                .map(|m| Action::MeasurePopup { popup_id: m.popup_id.clone(), generation }),
        );
        actions.push(Action::SetGeneralComment { html: general_html });
        self.markers = markers;
        actions.push(Action::SelectMarker { dom_id: self.selected_dom_id() });
        actions.push(Action::SetLayoutDirection(layout_direction(self.window_width, image_width)));
        actions
    }

    fn popup_view(&self, page: &PageDoc, marker: &MarkerView) -> PopupView {
        let text = page.annotations().get(marker.index).map_or("", |a| a.text.as_str());
        let settings = self.popups.settings();
        let has_image = format::has_embedded_image(text);
        PopupView {
            popup_id: marker.popup_id.clone(),
            marker_dom_id: marker.dom_id.clone(),
            title: self.config.labels.title(marker.number),
            html: self.formatter.to_html(text),
            anchor: marker.anchor,
            diameter: marker.diameter,
            width: popup::popup_width(text, self.surface, self.image.display.width, settings),
            has_image,
            wait_for_images: has_image && page.regions != Regions::Failed,
        }
    }

    /// Page-level block: general notes first, then every main finding.
    fn general_html(&self, page: &PageDoc, markers: &[MarkerView]) -> String {
        let mut html = String::new();
        for ann in page.annotations().iter().filter(|a| a.ann_type == AnnType::General) {
            html.push_str("<div class=\"general-note\">");
            html.push_str(&self.formatter.to_html(&ann.text));
            html.push_str("</div>");
        }
        for (index, ann) in page.annotations().iter().enumerate() {
            if ann.ann_type != AnnType::Main {
                continue;
            }
            html.push_str("<div class=\"general-main\">");
            if let Some(m) = markers.iter().find(|m| m.index == index) {
                html.push_str(&format!("<strong>{}.</strong> ", m.number));
            }
            html.push_str(&self.formatter.to_html(&ann.text));
            html.push_str("</div>");
        }
        if html.is_empty() {
            html = format!("<p class=\"no-general\">{}</p>", self.config.labels.no_general);
        }
        html
    }

    fn selected_dom_id(&self) -> Option<String> {
        let id = self.editor.as_ref()?.machine.draft().id.as_deref()?;
        self.markers
            .iter()
            .find(|m| m.annotation_id.as_deref() == Some(id))
            .map(|m| m.dom_id.clone())
    }

    fn marker(&self, popup_id: &str) -> Option<&MarkerView> {
        self.markers.iter().find(|m| m.popup_id == popup_id)
    }

    // --- Popup callbacks ---

    pub fn popup_measured(
        &mut self,
        generation: u64,
        popup_id: &str,
        height: f64,
        pending_images: usize,
        viewport: Viewport,
    ) -> Vec<Action> {
        self.popups.measured(generation, popup_id, height, pending_images, viewport)
    }

    pub fn popup_image_settled(&mut self, generation: u64, popup_id: &str) -> Vec<Action> {
        self.popups.image_settled(generation, popup_id)
    }

    pub fn popup_wait_timed_out(&mut self, generation: u64, popup_id: &str) -> Vec<Action> {
        self.popups.wait_timed_out(generation, popup_id)
    }

    pub fn popup_overflow(&mut self, generation: u64, popup_id: &str, bottom: f64, viewport_height: f64) -> Vec<Action> {
        self.popups.overflow(generation, popup_id, bottom, viewport_height)
    }

    // --- Pointer ---

    pub fn marker_enter(&mut self, popup_id: &str) -> Vec<Action> {
        if self.surface.is_mobile() {
            return Vec::new();
        }
        self.popups.hover_enter(popup_id)
    }

    pub fn marker_leave(&mut self, popup_id: &str) -> Vec<Action> {
        self.popups.hover_leave(popup_id)
    }

    pub fn popup_enter(&mut self, popup_id: &str) {
        self.popups.hold(popup_id);
    }

    pub fn popup_leave(&mut self, popup_id: &str) -> Vec<Action> {
        self.popups.hover_leave(popup_id)
    }

    pub fn hover_grace_elapsed(&mut self, popup_id: &str, token: u64) -> Vec<Action> {
        self.popups.hover_grace_elapsed(popup_id, token)
    }

    /// A marker was clicked. Editor mode loads it into the draft; the viewer
    /// pins its popup (desktop) or opens the overlay (mobile).
    pub fn click_marker(&mut self, popup_id: &str, confirm: &mut dyn Confirm) -> Vec<Action> {
        let Some(marker) = self.marker(popup_id).cloned() else {
            return Vec::new();
        };
        let Some(ann) = self.page.as_ref().and_then(|p| p.annotations().get(marker.index)).cloned() else {
            return Vec::new();
        };
        if self.editor.is_some() {
            let mut ann = ann;
            if ann.coords.is_none() {
                ann.coords = Some(Coords::from(self.scale().to_original_rounded(marker.anchor)));
            }
            let Some(editor) = &mut self.editor else {
                return Vec::new();
            };
            return match editor.machine.load_existing(&ann, confirm) {
                Transition::Applied => {
                    vec![Action::DraftChanged, Action::SelectMarker { dom_id: Some(marker.dom_id) }]
                }
                Transition::Declined | Transition::Ignored => Vec::new(),
            };
        }
        let title = self.config.labels.title(marker.number);
        let html = self.formatter.to_html(&ann.text);
        if self.surface.is_mobile() {
            self.mobile_open = Some(popup_id.to_string());
            return vec![Action::ShowMobileOverlay { title, html }];
        }
        let mut actions = self.popups.click_show(popup_id);
        actions.push(Action::UpdateSidebar { title, html: format!("<strong>{}.</strong> {html}", marker.number) });
        actions
    }

    /// A click on the image container at `point` (displayed-image pixels).
    pub fn click_image(&mut self, point: Point, confirm: &mut dyn Confirm) -> Vec<Action> {
        match hit_test(point, &self.markers, self.image.display) {
            Hit::Marker(popup_id) => self.click_marker(&popup_id, confirm),
            Hit::Image(at) => self.place_draft(at, confirm),
            Hit::Outside => self.click_outside(),
        }
    }

    fn place_draft(&mut self, at: Point, confirm: &mut dyn Confirm) -> Vec<Action> {
        let coords = Coords::from(self.scale().to_original_rounded(at));
        let Some(editor) = &mut self.editor else {
            return self.click_outside();
        };
        if !editor.machine.draft().ann_type.is_spatial() {
            return Vec::new();
        }
        match editor.machine.place(coords, confirm) {
            Transition::Applied => vec![Action::DraftChanged, Action::SelectMarker { dom_id: self.selected_dom_id() }],
            Transition::Declined | Transition::Ignored => Vec::new(),
        }
    }

    /// A document click outside every popup and marker.
    pub fn click_outside(&mut self) -> Vec<Action> {
        let mut actions = self.popups.hide_all();
        if self.mobile_open.take().is_some() {
            actions.push(Action::CloseMobileOverlay);
        }
        actions
    }

    pub fn close_mobile_overlay(&mut self) -> Vec<Action> {
        self.mobile_open = None;
        vec![Action::CloseMobileOverlay]
    }

    /// The overlay's "show general comment" button.
    pub fn show_general_from_overlay(&mut self) -> Vec<Action> {
        self.mobile_open = None;
        vec![Action::CloseMobileOverlay, Action::ScrollToGeneral]
    }

    pub fn touch_start(&mut self, at: Point) {
        if self.surface.is_mobile() {
            self.swipe.start(at);
        }
    }

    pub fn touch_end(&mut self, at: Point) -> Vec<Action> {
        match self.swipe.finish(at, self.config.swipe_threshold_px) {
            Some(step) => self.step(step),
            None => Vec::new(),
        }
    }

    pub fn next_page(&mut self) -> Vec<Action> {
        self.step(PageStep::Next)
    }

    pub fn prev_page(&mut self) -> Vec<Action> {
        self.step(PageStep::Prev)
    }

    fn step(&self, step: PageStep) -> Vec<Action> {
        let target = match step {
            PageStep::Next => self.current.next(self.config.page_count),
            PageStep::Prev => self.current.prev(),
        };
        target.map(Action::Navigate).into_iter().collect()
    }

    // --- Editor ---

    #[must_use]
    pub fn editor_view(&self) -> Option<EditorView> {
        let editor = self.editor.as_ref()?;
        let machine = &editor.machine;
        let draft = machine.draft();
        let errors = machine.validation().err().unwrap_or_default();
        let labels = &self.config.labels;
        let message = |e: Option<_>| e.map(|e| labels.field_error(e).to_string());
        Some(EditorView {
            mode: machine.mode(),
            ann_type: draft.ann_type.clone(),
            content: draft.content.clone(),
            coords_text: draft.coords.map(|c| c.to_string()).unwrap_or_default(),
            show_coords: draft.ann_type.is_spatial(),
            dirty: machine.is_dirty(),
            can_stage: machine.can_stage(),
            can_submit: machine.can_submit() && !editor.submitting,
            type_error: message(errors.ann_type),
            content_error: message(errors.content),
            coords_error: message(errors.coords),
            username: editor.user.as_ref().map(|u| u.username.clone()),
            submitting: editor.submitting,
        })
    }

    pub fn editor_select_type(&mut self, ann_type: AnnType, confirm: &mut dyn Confirm) -> Vec<Action> {
        let general = self.page.as_ref().and_then(PageDoc::general).cloned();
        let Some(editor) = &mut self.editor else {
            return Vec::new();
        };
        match editor.machine.select_type(ann_type, general.as_ref(), confirm) {
            Transition::Applied => vec![Action::DraftChanged, Action::SelectMarker { dom_id: self.selected_dom_id() }],
            Transition::Declined => vec![Action::DraftChanged],
            Transition::Ignored => Vec::new(),
        }
    }

    pub fn editor_set_content(&mut self, content: String) -> Vec<Action> {
        let Some(editor) = &mut self.editor else {
            return Vec::new();
        };
        editor.machine.set_content(content);
        vec![Action::DraftChanged]
    }

    /// Typed coordinates. Unparseable text clears them.
    pub fn editor_set_coords_text(&mut self, text: &str) -> Vec<Action> {
        let Some(editor) = &mut self.editor else {
            return Vec::new();
        };
        editor.machine.set_coords(Coords::parse(text));
        vec![Action::DraftChanged]
    }

    /// Revert the form to the baseline.
    pub fn editor_cancel(&mut self) -> Vec<Action> {
        let Some(editor) = &mut self.editor else {
            return Vec::new();
        };
        let anonymous = editor
            .machine
            .cancel()
            .is_none_or(|base| base.ann_type == AnnType::General || base.id.is_none());
        let dom_id = if anonymous { None } else { self.selected_dom_id() };
        vec![Action::DraftChanged, Action::SelectMarker { dom_id }]
    }

    /// Apply the draft to the page as a local preview.
    pub fn editor_stage(&mut self) -> Vec<Action> {
        let (Some(editor), Some(page)) = (&mut self.editor, &mut self.page) else {
            return Vec::new();
        };
        match sync::stage(&mut editor.machine, page) {
            Ok(Some(outcome)) => {
                if let Staged::Recovered(id) = &outcome {
                    log::warn!("engine: staged {id} was missing locally");
                }
                let mut actions = self.reposition();
                actions.push(Action::DraftChanged);
                actions.push(Action::Notice { message: self.config.labels.staged.clone(), retryable: false });
                actions
            }
            Ok(None) => Vec::new(),
            Err(_) => vec![Action::DraftChanged],
        }
    }

    /// Snapshot the draft for saving and mark a save in flight.
    ///
    /// # Errors
    ///
    /// Returns why the submit cannot start; see [`Self::blocked_actions`].
    pub fn begin_submit(&mut self) -> Result<SaveRequest, SubmitBlocked> {
        let Some(editor) = &mut self.editor else {
            return Err(SubmitBlocked::ReadOnly);
        };
        if editor.submitting {
            return Err(SubmitBlocked::InFlight);
        }
        editor.machine.validation().map_err(SubmitBlocked::Invalid)?;
        if editor.user.is_none() {
            return Err(SubmitBlocked::LoginRequired);
        }
        let Some(page) = &self.page else {
            return Err(SubmitBlocked::NoPage);
        };
        let draft = editor.machine.draft().clone();
        let request = SaveRequest {
            page: page.page_id,
            generation: self.nav_generation,
            server_id: draft.id.clone().filter(|id| !is_placeholder(id)),
            local_id: draft.id.clone(),
            payload: SavePayload::from_draft(&draft, page.version_token.clone()),
            moved: sync::moved(&editor.machine),
            draft,
        };
        editor.submitting = true;
        log::info!("engine: submitting {:?} on {}", request.server_id, request.page);
        Ok(request)
    }

    /// Host reaction to a blocked submit.
    #[must_use]
    pub fn blocked_actions(&self, blocked: &SubmitBlocked) -> Vec<Action> {
        match blocked {
            SubmitBlocked::LoginRequired => vec![Action::ShowLogin { message: None }],
            SubmitBlocked::Invalid(_) => vec![Action::DraftChanged],
            SubmitBlocked::NoPage | SubmitBlocked::InFlight | SubmitBlocked::ReadOnly => Vec::new(),
        }
    }

    /// Apply the outcome of [`sync::perform_submit`].
    pub fn finish_submit(
        &mut self,
        request: &SaveRequest,
        result: Result<SaveAck, BackendError>,
        confirm: &mut dyn Confirm,
    ) -> Vec<Action> {
        if let Some(editor) = &mut self.editor {
            editor.submitting = false;
        }
        let stale = request.page != self.current || request.generation != self.nav_generation;
        let (Some(editor), Some(page), false) = (&mut self.editor, &mut self.page, stale) else {
            log::warn!("engine: dropping save result for {}", request.page);
            return Vec::new();
        };
        match result {
            Ok(ack) => {
                let replaced = sync::reconcile(page, request, &ack);
                if editor.machine.draft().id == request.local_id {
                    if *editor.machine.draft() == request.draft {
                        let mut saved = request.draft.clone();
                        saved.id = Some(ack.id.clone());
                        editor.machine.begin_existing(saved);
                    } else {
                        editor.machine.rename(&ack.id);
                    }
                }
                log::info!("engine: saved {} on {}", ack.id, request.page);
                let mut actions: Vec<Action> = replaced
                    .map(|old| Action::RemoveMarker { dom_id: marker::marker_dom_id(&old) })
                    .into_iter()
                    .collect();
                actions.extend(self.reposition());
                actions.push(Action::DraftChanged);
                actions.push(Action::Notice { message: self.config.labels.submitted.clone(), retryable: false });
                actions
            }
            Err(BackendError::Unauthenticated) => {
                editor.user = None;
                vec![
                    Action::DraftChanged,
                    Action::ShowLogin { message: Some(self.config.labels.session_expired.clone()) },
                ]
            }
            Err(BackendError::Conflict) => {
                if !confirm.confirm(Prompt::RefetchAfterConflict) {
                    return vec![Action::DraftChanged];
                }
                editor.machine.reset();
                editor.autofilled = None;
                vec![Action::DraftChanged, Action::RefetchPage(request.page)]
            }
            Err(e) => {
                log::warn!("engine: save failed: {e}");
                vec![
                    Action::DraftChanged,
                    Action::Notice { message: self.config.labels.submit_failed.clone(), retryable: true },
                ]
            }
        }
    }

    pub fn set_session(&mut self, user: Option<SessionUser>) -> Vec<Action> {
        let Some(editor) = &mut self.editor else {
            return Vec::new();
        };
        editor.user = user;
        vec![Action::DraftChanged]
    }

    #[must_use]
    pub fn login_failed(&self) -> Vec<Action> {
        vec![Action::ShowLogin { message: Some(self.config.labels.login_failed.clone()) }]
    }
}

/// The overlay engine bound to its container element.
pub struct Engine {
    root: HtmlElement,
    pub core: EngineCore,
}

impl Engine {
    #[must_use]
    pub fn new(root: HtmlElement, core: EngineCore) -> Self {
        Self { root, core }
    }

    /// Carry out `actions`. DOM work happens here, including the measurement
    /// round trips it triggers; everything else is returned for the host.
    pub fn dispatch(&mut self, actions: Vec<Action>) -> Vec<Action> {
        let mut queue: VecDeque<Action> = actions.into();
        let mut host = Vec::new();
        while let Some(action) = queue.pop_front() {
            match action {
                Action::MeasurePopup { popup_id, generation } => match render::measure_popup(&self.root, &popup_id) {
                    Ok(m) => {
                        queue.extend(self.core.popup_measured(generation, &popup_id, m.height, m.pending_images, m.viewport));
                    }
                    Err(e) => log::error!("engine: measuring {popup_id} failed: {e:?}"),
                },
                Action::ShowPopup { popup_id, generation } => match render::show_popup(&self.root, &popup_id) {
                    Ok(edge) => {
                        queue.extend(self.core.popup_overflow(generation, &popup_id, edge.bottom, edge.viewport_height));
                    }
                    Err(e) => log::error!("engine: showing {popup_id} failed: {e:?}"),
                },
                other => match render::apply(&self.root, &other) {
                    Ok(true) => {}
                    Ok(false) => host.push(other),
                    Err(e) => log::error!("engine: render failed: {e:?}"),
                },
            }
        }
        host
    }
}
