//! Rendering: applies overlay actions to the DOM.
//!
//! This module is the only place that touches `web_sys`. It receives actions
//! already decided by [`crate::engine::EngineCore`] and writes them into the
//! overlay container; it never mutates engine state.
//!
//! All fallible DOM calls propagate errors via `Result<_, JsValue>`. The
//! caller ([`crate::engine::Engine::dispatch`]) logs them.

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlElement, HtmlImageElement};

use crate::engine::Action;
use crate::input::FlexDirection;
use crate::marker::MarkerView;
use crate::popup::{Placement, PopupView, Viewport};

/// Id of the page layout container that receives overflow spacers.
const LAYOUT_ID: &str = "layout";

const SELECTED_CLASS: &str = "is-selected";

/// Popup size and image state at measurement time.
#[derive(Debug, Clone, Copy)]
pub struct PopupMetrics {
    pub height: f64,
    /// Embedded images neither loaded nor failed yet.
    pub pending_images: usize,
    pub viewport: Viewport,
}

/// Bottom edge of a shown popup, viewport coordinates.
#[derive(Debug, Clone, Copy)]
pub struct PopupEdge {
    pub bottom: f64,
    pub viewport_height: f64,
}

/// Apply one DOM action. Returns `false` for actions the host owns.
///
/// # Errors
///
/// Returns `Err` if a DOM call fails or an expected element is missing.
pub fn apply(root: &HtmlElement, action: &Action) -> Result<bool, JsValue> {
    match action {
        Action::LayoutOverlay { width, height } => {
            let style = root.style();
            style.set_property("width", &px(*width))?;
            style.set_property("height", &px(*height))?;
        }
        Action::RenderMarkers { markers, popups, .. } => render_markers(root, markers, popups)?,
        Action::RemoveMarker { dom_id } => {
            if let Some(el) = document(root)?.get_element_by_id(dom_id) {
                el.remove();
            }
        }
        Action::SelectMarker { dom_id } => select_marker(root, dom_id.as_deref())?,
        Action::SetLayoutDirection(direction) => set_layout_direction(root, *direction)?,
        Action::PlacePopup { popup_id, placement } => place_popup(root, popup_id, placement)?,
        Action::HidePopup { popup_id } => set_popup_visible(&popup_el(root, popup_id)?, false)?,
        Action::SetSpacer { spacer_id, height } => set_spacer(root, spacer_id, *height)?,
        Action::RemoveSpacer { spacer_id } => {
            if let Some(el) = document(root)?.get_element_by_id(spacer_id) {
                el.remove();
            }
        }
        _ => return Ok(false),
    }
    Ok(true)
}

// =============================================================
// Markers and popups
// =============================================================

fn render_markers(root: &HtmlElement, markers: &[MarkerView], popups: &[PopupView]) -> Result<(), JsValue> {
    let doc = document(root)?;
    root.set_inner_html("");
    for marker in markers {
        let el = create(&doc, "div")?;
        el.set_id(&marker.dom_id);
        el.set_class_name(&format!("marker marker-{}", marker.ann_type));
        el.set_attribute("data-popup", &marker.popup_id)?;
        el.set_text_content(Some(&marker.number.to_string()));
        let style = el.style();
        style.set_property("left", &px(marker.left()))?;
        style.set_property("top", &px(marker.top()))?;
        style.set_property("width", &px(marker.diameter))?;
        style.set_property("height", &px(marker.diameter))?;
        style.set_property("line-height", &px(marker.diameter))?;
        style.set_property("font-size", &px(marker.font_size()))?;
        style.set_property("background", &marker.background())?;
        root.append_child(&el)?;
    }
    for view in popups {
        let popup = popup_element(&doc, view)?;
        root.append_child(&popup)?;
    }
    Ok(())
}

fn popup_element(doc: &Document, view: &PopupView) -> Result<HtmlElement, JsValue> {
    let el = create(doc, "div")?;
    el.set_id(&view.popup_id);
    el.set_class_name("popup");
    el.set_attribute("data-popup", &view.popup_id)?;
    el.set_attribute("data-marker", &view.marker_dom_id)?;

    let title = create(doc, "div")?;
    title.set_class_name("popup-title");
    title.set_text_content(Some(&view.title));
    el.append_child(&title)?;

    let body = create(doc, "div")?;
    body.set_class_name("popup-body");
    body.set_inner_html(&view.html);
    el.append_child(&body)?;

    let placement = view.default_placement(crate::consts::POPUP_GAP_PX);
    let style = el.style();
    style.set_property("left", &px(placement.left))?;
    style.set_property("top", &px(placement.top))?;
    style.set_property("transform", "translateX(-50%)")?;
    if let Some(width) = view.width {
        style.set_property("width", &px(width))?;
        style.set_property("max-width", "none")?;
    }
    set_popup_visible(&el, false)?;
    Ok(el)
}

fn place_popup(root: &HtmlElement, popup_id: &str, placement: &Placement) -> Result<(), JsValue> {
    let el = popup_el(root, popup_id)?;
    let style = el.style();
    style.set_property("left", &px(placement.left))?;
    style.set_property("top", &px(placement.top))?;
    el.class_list().toggle_with_force("above", placement.is_above())?;
    Ok(())
}

// Hidden popups keep their layout box so they can be measured.
fn set_popup_visible(el: &HtmlElement, visible: bool) -> Result<(), JsValue> {
    let style = el.style();
    style.set_property("visibility", if visible { "visible" } else { "hidden" })?;
    style.set_property("pointer-events", if visible { "auto" } else { "none" })?;
    Ok(())
}

/// Reveal a popup and report where its bottom edge landed.
///
/// # Errors
///
/// Returns `Err` if the popup element is missing.
pub fn show_popup(root: &HtmlElement, popup_id: &str) -> Result<PopupEdge, JsValue> {
    let el = popup_el(root, popup_id)?;
    set_popup_visible(&el, true)?;
    Ok(PopupEdge { bottom: el.get_bounding_client_rect().bottom(), viewport_height: viewport_height()? })
}

/// Measure a popup's rendered height and its unsettled images.
///
/// # Errors
///
/// Returns `Err` if the popup element is missing.
pub fn measure_popup(root: &HtmlElement, popup_id: &str) -> Result<PopupMetrics, JsValue> {
    let el = popup_el(root, popup_id)?;
    let images = el.query_selector_all("img")?;
    let mut pending_images = 0;
    for i in 0..images.length() {
        let Some(node) = images.item(i) else {
            continue;
        };
        if node.dyn_ref::<HtmlImageElement>().is_some_and(|img| !img.complete()) {
            pending_images += 1;
        }
    }
    Ok(PopupMetrics {
        height: el.get_bounding_client_rect().height(),
        pending_images,
        viewport: Viewport {
            height: viewport_height()?,
            overlay_top: root.get_bounding_client_rect().top(),
        },
    })
}

fn select_marker(root: &HtmlElement, dom_id: Option<&str>) -> Result<(), JsValue> {
    let selected = root.query_selector_all(&format!(".{SELECTED_CLASS}"))?;
    for i in 0..selected.length() {
        let Some(node) = selected.item(i) else {
            continue;
        };
        if let Some(el) = node.dyn_ref::<Element>() {
            el.class_list().remove_1(SELECTED_CLASS)?;
        }
    }
    if let Some(el) = dom_id.and_then(|id| element_by_id(root, id)) {
        el.class_list().add_1(SELECTED_CLASS)?;
    }
    Ok(())
}

// =============================================================
// Page layout
// =============================================================

fn layout_container(root: &HtmlElement) -> Result<Element, JsValue> {
    match document(root)?.get_element_by_id(LAYOUT_ID) {
        Some(layout) => Ok(layout),
        None => root
            .parent_element()
            .ok_or_else(|| JsValue::from_str("overlay has no layout container")),
    }
}

fn set_layout_direction(root: &HtmlElement, direction: FlexDirection) -> Result<(), JsValue> {
    let layout = layout_container(root)?;
    if let Some(layout) = layout.dyn_ref::<HtmlElement>() {
        layout.style().set_property("flex-direction", direction.as_css())?;
    }
    Ok(())
}

fn set_spacer(root: &HtmlElement, spacer_id: &str, height: f64) -> Result<(), JsValue> {
    let doc = document(root)?;
    let spacer = match doc.get_element_by_id(spacer_id) {
        Some(existing) => existing.dyn_into::<HtmlElement>()?,
        None => {
            let el = create(&doc, "div")?;
            el.set_id(spacer_id);
            el.set_class_name("popup-spacer");
            layout_container(root)?.append_child(&el)?;
            el
        }
    };
    spacer.style().set_property("height", &px(height))?;
    Ok(())
}

// =============================================================
// Helpers
// =============================================================

fn document(root: &HtmlElement) -> Result<Document, JsValue> {
    root.owner_document()
        .ok_or_else(|| JsValue::from_str("overlay is detached from a document"))
}

fn create(doc: &Document, tag: &str) -> Result<HtmlElement, JsValue> {
    Ok(doc.create_element(tag)?.dyn_into::<HtmlElement>()?)
}

fn element_by_id(root: &HtmlElement, id: &str) -> Option<Element> {
    root.owner_document()?.get_element_by_id(id)
}

fn popup_el(root: &HtmlElement, popup_id: &str) -> Result<HtmlElement, JsValue> {
    let el = element_by_id(root, popup_id).ok_or_else(|| JsValue::from_str(&format!("no popup {popup_id}")))?;
    Ok(el.dyn_into::<HtmlElement>()?)
}

fn viewport_height() -> Result<f64, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    Ok(window.inner_height()?.as_f64().unwrap_or(0.0))
}

fn px(value: f64) -> String {
    format!("{value}px")
}
