//! Bridge component between Leptos state and the imperative `overlay::engine::Engine`.
//!
//! ARCHITECTURE
//! ============
//! [`OverlayRuntime`] owns the engine, the backend and the page's panel
//! signal. DOM events on the image container become single engine calls; the
//! engine applies overlay DOM work itself and hands back the rest, which the
//! runtime folds into [`ViewerState`] or carries out (timers, fetches,
//! navigation). The engine borrow is always released before a returned action
//! runs and is never held across an `.await`.

use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
#[cfg(feature = "csr")]
use leptos_router::hooks::use_query_map;
#[cfg(feature = "csr")]
use gloo_events::EventListener;
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement, HtmlImageElement};

use overlay::config::ViewerConfig;
use overlay::doc::{AnnType, PageId};
use overlay::engine::{Action, Engine, EngineCore};
use overlay::mapper::{Point, Size};
#[cfg(feature = "csr")]
use overlay::sync::{self, Backend};

use crate::net::backend::ClientBackend;
use crate::state::viewer::ViewerState;
use crate::util::confirm::WindowConfirm;
#[cfg(feature = "csr")]
use crate::util::generation::GenerationHold;
use crate::util::host;
use crate::util::location;

const MARKER_SELECTOR: &str = ".marker";
const POPUP_SELECTOR: &str = ".popup";
const POPUP_ATTR: &str = "data-popup";
/// Clicks under these never count as "outside".
const INSIDE_SELECTOR: &str = ".image-container, .popup, .mobile-overlay-content";

/// Pushes a url onto the router history.
pub type NavigateFn = Rc<dyn Fn(&str)>;

/// Run `f` after `delay_ms`. Outside the browser nothing is scheduled.
fn after(delay_ms: u32, f: impl FnOnce() + 'static) {
    #[cfg(feature = "csr")]
    {
        gloo_timers::callback::Timeout::new(delay_ms, f).forget();
    }
    #[cfg(not(feature = "csr"))]
    {
        log::debug!("overlay host: timer of {delay_ms}ms skipped outside the browser");
        drop(f);
    }
}

/// Engine, backend and panel state for one viewer page.
#[derive(Clone)]
pub struct OverlayRuntime {
    inner: Rc<RuntimeInner>,
}

struct RuntimeInner {
    config: ViewerConfig,
    backend: ClientBackend,
    state: RwSignal<ViewerState>,
    engine: RefCell<Option<Engine>>,
    image: RefCell<Option<HtmlImageElement>>,
    /// Popup image listeners of the latest render generation.
    #[cfg(feature = "csr")]
    image_listeners: RefCell<GenerationHold<EventListener>>,
    navigate: NavigateFn,
}

impl OverlayRuntime {
    pub fn new(config: ViewerConfig, state: RwSignal<ViewerState>, navigate: NavigateFn) -> Self {
        let backend = ClientBackend::from_config(&config);
        Self {
            inner: Rc::new(RuntimeInner {
                config,
                backend,
                state,
                engine: RefCell::new(None),
                image: RefCell::new(None),
                #[cfg(feature = "csr")]
                image_listeners: RefCell::new(GenerationHold::default()),
                navigate,
            }),
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.inner.config
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.engine.borrow().is_some()
    }

    /// Bind the engine to the overlay element and the page image. Returns
    /// `false` when already mounted.
    pub fn mount(&self, root: HtmlElement, image: HtmlImageElement) -> bool {
        if self.is_mounted() {
            return false;
        }
        *self.inner.image.borrow_mut() = Some(image);
        *self.inner.engine.borrow_mut() = Some(Engine::new(root, EngineCore::new(self.inner.config.clone())));
        log::info!("overlay host: mounted (editor: {}, mock: {})", self.inner.config.editor, self.inner.backend.is_mock());
        self.run(|core, _| core.resize(host::window_width()));
        self.refresh_editor();
        if self.inner.config.editor {
            self.bootstrap_session();
        }
        true
    }

    /// Make one engine call, let the engine apply its DOM work, then carry out
    /// what is left.
    pub fn run(&self, call: impl FnOnce(&mut EngineCore, &mut WindowConfirm<'_>) -> Vec<Action>) {
        let host_actions = {
            let Ok(mut slot) = self.inner.engine.try_borrow_mut() else {
                log::warn!("overlay host: engine busy; dropping event");
                return;
            };
            let Some(engine) = slot.as_mut() else {
                log::debug!("overlay host: engine not mounted yet");
                return;
            };
            let mut confirm = WindowConfirm::new(&self.inner.config.labels);
            let actions = call(&mut engine.core, &mut confirm);
            engine.dispatch(actions)
        };
        self.handle(host_actions);
    }

    fn handle(&self, actions: Vec<Action>) {
        if actions.is_empty() {
            return;
        }
        let mut rest = Vec::new();
        self.inner.state.update(|state| {
            rest = actions.into_iter().filter_map(|a| state.apply(a)).collect();
        });
        for action in rest {
            match action {
                Action::Navigate(page) => self.navigate(page),
                Action::RefetchPage(page) => self.load_page(page),
                Action::ScheduleReposition { token, delay_ms } => {
                    let rt = self.clone();
                    after(delay_ms, move || {
                        let display = rt.display_size();
                        rt.run(|core, _| core.resize_settled(token, display));
                    });
                }
                Action::ScheduleHoverHide { popup_id, token, delay_ms } => {
                    let rt = self.clone();
                    after(delay_ms, move || rt.run(|core, _| core.hover_grace_elapsed(&popup_id, token)));
                }
                Action::AwaitImages { popup_id, generation, timeout_ms } => {
                    self.await_images(popup_id, generation, timeout_ms);
                }
                Action::DraftChanged => self.refresh_editor(),
                other => log::debug!("overlay host: ignoring {other:?}"),
            }
        }
    }

    fn refresh_editor(&self) {
        let view = self
            .inner
            .engine
            .try_borrow()
            .ok()
            .and_then(|slot| slot.as_ref().and_then(|e| e.core.editor_view()));
        self.inner.state.update(|s| s.editor = view);
    }

    // --- Pages ---

    fn navigate(&self, page: PageId) {
        let (path, search, hash) = host::location_parts();
        let href = location::page_href(&path, &search, &hash, page);
        log::info!("overlay host: navigating to {page}");
        (self.inner.navigate)(&href);
    }

    /// Load `page` under a new navigation generation.
    pub fn load_page(&self, page: PageId) {
        let ticket = {
            let Ok(mut slot) = self.inner.engine.try_borrow_mut() else {
                log::warn!("overlay host: engine busy; not loading {page}");
                return;
            };
            let Some(engine) = slot.as_mut() else {
                return;
            };
            engine.core.request_page(page)
        };
        self.inner.state.update(|s| s.page_changed(page));
        self.refresh_editor();
        #[cfg(feature = "csr")]
        {
            let rt = self.clone();
            leptos::task::spawn_local(async move {
                let backend = &rt.inner.backend;
                let (payload, regions) = futures::join!(backend.fetch_page(page), backend.fetch_regions(page));
                rt.run(|core, _| {
                    let mut actions = core.apply_page(ticket, payload);
                    actions.extend(core.apply_regions(ticket, regions));
                    actions
                });
            });
        }
        #[cfg(not(feature = "csr"))]
        {
            log::debug!("overlay host: {ticket:?} not fetched outside the browser");
        }
    }

    // --- Images ---

    fn image(&self) -> Option<HtmlImageElement> {
        self.inner.image.borrow().clone()
    }

    fn display_size(&self) -> Size {
        self.image().map_or_else(Size::default, |img| {
            let rect = img.get_bounding_client_rect();
            Size::new(rect.width(), rect.height())
        })
    }

    /// The page image finished decoding.
    pub fn image_loaded(&self) {
        let Some(img) = self.image() else {
            return;
        };
        let natural = Size::new(f64::from(img.natural_width()), f64::from(img.natural_height()));
        let display = self.display_size();
        self.run(|core, _| core.image_loaded(natural, display));
    }

    /// Client coordinates to displayed-image pixels.
    fn image_point(&self, client_x: i32, client_y: i32) -> Option<Point> {
        let rect = self.image()?.get_bounding_client_rect();
        Some(Point::new(f64::from(client_x) - rect.left(), f64::from(client_y) - rect.top()))
    }

    fn await_images(&self, popup_id: String, generation: u64, timeout_ms: u32) {
        #[cfg(feature = "csr")]
        {
            let images = web_sys::window()
                .and_then(|w| w.document())
                .and_then(|d| d.get_element_by_id(&popup_id))
                .and_then(|el| el.query_selector_all("img").ok());
            if let Some(images) = images {
                let Ok(mut held) = self.inner.image_listeners.try_borrow_mut() else {
                    log::warn!("overlay host: image listeners busy; {popup_id} relies on the timeout");
                    return self.wait_timeout(popup_id, generation, timeout_ms);
                };
                for i in 0..images.length() {
                    let Some(img) = images.item(i).and_then(|n| n.dyn_into::<HtmlImageElement>().ok()) else {
                        continue;
                    };
                    if img.complete() {
                        continue;
                    }
                    for kind in ["load", "error"] {
                        let rt = self.clone();
                        let popup_id = popup_id.clone();
                        let listener = EventListener::once(&img, kind, move |_| {
                            rt.run(|core, _| core.popup_image_settled(generation, &popup_id));
                        });
                        held.hold(generation, listener);
                    }
                }
            }
        }
        self.wait_timeout(popup_id, generation, timeout_ms);
    }

    fn wait_timeout(&self, popup_id: String, generation: u64, timeout_ms: u32) {
        let rt = self.clone();
        after(timeout_ms, move || rt.run(|core, _| core.popup_wait_timed_out(generation, &popup_id)));
    }

    // --- Pointer and touch ---

    /// Click inside the image container.
    pub fn container_click(&self, ev: &web_sys::MouseEvent) {
        let target = event_element(ev.target());
        if target.as_ref().and_then(|t| closest(t, POPUP_SELECTOR)).is_some() {
            return;
        }
        let marker = target.as_ref().and_then(|t| closest(t, MARKER_SELECTOR));
        if let Some(popup_id) = marker.and_then(|m| m.get_attribute(POPUP_ATTR)) {
            self.run(|core, confirm| core.click_marker(&popup_id, confirm));
            return;
        }
        let Some(point) = self.image_point(ev.client_x(), ev.client_y()) else {
            return;
        };
        self.run(|core, confirm| core.click_image(point, confirm));
    }

    /// Any click in the document. Ones outside the overlay hide every popup
    /// and the mobile overlay.
    pub fn document_click(&self, ev: &web_sys::MouseEvent) {
        if event_element(ev.target()).is_some_and(|t| closest(&t, INSIDE_SELECTOR).is_some()) {
            return;
        }
        self.run(|core, _| core.click_outside());
    }

    pub fn pointer_over(&self, ev: &web_sys::MouseEvent) {
        let Some(target) = event_element(ev.target()) else {
            return;
        };
        if let Some(popup_id) = closest(&target, MARKER_SELECTOR).and_then(|m| m.get_attribute(POPUP_ATTR)) {
            self.run(|core, _| core.marker_enter(&popup_id));
        } else if let Some(popup_id) = closest(&target, POPUP_SELECTOR).and_then(|p| p.get_attribute(POPUP_ATTR)) {
            self.run(|core, _| {
                core.popup_enter(&popup_id);
                Vec::new()
            });
        }
    }

    pub fn pointer_out(&self, ev: &web_sys::MouseEvent) {
        let Some(target) = event_element(ev.target()) else {
            return;
        };
        let related = event_element(ev.related_target());
        let still_inside = |el: &Element| {
            related.as_ref().is_some_and(|r| {
                let node: &web_sys::Node = r;
                el.contains(Some(node))
            })
        };
        if let Some(marker) = closest(&target, MARKER_SELECTOR) {
            if still_inside(&marker) {
                return;
            }
            if let Some(popup_id) = marker.get_attribute(POPUP_ATTR) {
                self.run(|core, _| core.marker_leave(&popup_id));
            }
        } else if let Some(popup) = closest(&target, POPUP_SELECTOR) {
            if still_inside(&popup) {
                return;
            }
            if let Some(popup_id) = popup.get_attribute(POPUP_ATTR) {
                self.run(|core, _| core.popup_leave(&popup_id));
            }
        }
    }

    pub fn touch_start(&self, ev: &web_sys::TouchEvent) {
        if let Some(touch) = ev.touches().get(0) {
            let at = Point::new(f64::from(touch.client_x()), f64::from(touch.client_y()));
            self.run(|core, _| {
                core.touch_start(at);
                Vec::new()
            });
        }
    }

    pub fn touch_end(&self, ev: &web_sys::TouchEvent) {
        if let Some(touch) = ev.changed_touches().get(0) {
            let at = Point::new(f64::from(touch.client_x()), f64::from(touch.client_y()));
            self.run(|core, _| core.touch_end(at));
        }
    }

    // --- Panels ---

    pub fn close_mobile_overlay(&self) {
        self.run(|core, _| core.close_mobile_overlay());
    }

    pub fn show_general_from_overlay(&self) {
        self.run(|core, _| core.show_general_from_overlay());
    }

    pub fn next_page(&self) {
        self.run(|core, _| core.next_page());
    }

    pub fn prev_page(&self) {
        self.run(|core, _| core.prev_page());
    }

    // --- Editor ---

    pub fn select_type(&self, ann_type: AnnType) {
        self.run(|core, confirm| core.editor_select_type(ann_type, confirm));
    }

    pub fn set_content(&self, content: String) {
        self.run(|core, _| core.editor_set_content(content));
    }

    pub fn set_coords_text(&self, text: &str) {
        self.run(|core, _| core.editor_set_coords_text(text));
    }

    pub fn cancel_draft(&self) {
        self.run(|core, _| core.editor_cancel());
    }

    pub fn stage(&self) {
        self.run(|core, _| core.editor_stage());
    }

    /// Save the draft. Blocked submits get their reaction (login prompt,
    /// inline errors) immediately.
    pub fn submit(&self) {
        let begun = {
            let Ok(mut slot) = self.inner.engine.try_borrow_mut() else {
                log::warn!("overlay host: engine busy; submit ignored");
                return;
            };
            let Some(engine) = slot.as_mut() else {
                return;
            };
            match engine.core.begin_submit() {
                Ok(request) => Ok(request),
                Err(blocked) => {
                    log::info!("overlay host: submit blocked: {blocked:?}");
                    let actions = engine.core.blocked_actions(&blocked);
                    Err(engine.dispatch(actions))
                }
            }
        };
        let request = match begun {
            Ok(request) => request,
            Err(host_actions) => {
                self.handle(host_actions);
                return;
            }
        };
        self.inner.state.update(ViewerState::dismiss_notice);
        self.refresh_editor();
        #[cfg(feature = "csr")]
        {
            let rt = self.clone();
            leptos::task::spawn_local(async move {
                let result = sync::perform_submit(&rt.inner.backend, &request).await;
                rt.run(|core, confirm| core.finish_submit(&request, result, confirm));
            });
        }
        #[cfg(not(feature = "csr"))]
        {
            log::debug!("overlay host: save for {} not sent outside the browser", request.page);
        }
    }

    // --- Session ---

    pub fn open_login(&self) {
        self.handle(vec![Action::ShowLogin { message: None }]);
    }

    pub fn close_login(&self) {
        self.inner.state.update(ViewerState::close_login);
    }

    pub fn login(&self, token: String) {
        self.inner.state.update(|s| s.login_busy = true);
        #[cfg(feature = "csr")]
        {
            let rt = self.clone();
            leptos::task::spawn_local(async move {
                match rt.inner.backend.login(&token).await {
                    Ok(user) => {
                        log::info!("overlay host: signed in as {}", user.username);
                        rt.close_login();
                        rt.run(|core, _| core.set_session(Some(user)));
                    }
                    Err(e) => {
                        log::warn!("overlay host: sign-in failed: {e}");
                        rt.run(|core, _| core.login_failed());
                    }
                }
            });
        }
        #[cfg(not(feature = "csr"))]
        {
            log::debug!("overlay host: sign-in with {} chars skipped outside the browser", token.len());
        }
    }

    fn bootstrap_session(&self) {
        #[cfg(feature = "csr")]
        {
            let rt = self.clone();
            leptos::task::spawn_local(async move {
                let user = match rt.inner.backend.current_user().await {
                    Ok(user) => user,
                    Err(e) => {
                        log::warn!("overlay host: session check failed: {e}");
                        None
                    }
                };
                rt.run(|core, _| core.set_session(user));
            });
        }
    }

    pub fn dismiss_notice(&self) {
        self.inner.state.update(ViewerState::dismiss_notice);
    }
}

fn event_element(target: Option<web_sys::EventTarget>) -> Option<Element> {
    target.and_then(|t| t.dyn_into::<Element>().ok())
}

fn closest(el: &Element, selector: &str) -> Option<Element> {
    el.closest(selector).ok().flatten()
}

/// The runtime provided by the viewer page.
pub fn use_runtime() -> StoredValue<OverlayRuntime, LocalStorage> {
    expect_context::<StoredValue<OverlayRuntime, LocalStorage>>()
}

/// Page image with the overlay layered on top.
///
/// Mounts the engine once both elements exist, then loads whichever page the
/// `page` query parameter names.
#[component]
pub fn OverlayHost() -> impl IntoView {
    let state = expect_context::<RwSignal<ViewerState>>();
    let runtime = use_runtime();
    let overlay_ref = NodeRef::<leptos::html::Div>::new();
    let image_ref = NodeRef::<leptos::html::Img>::new();

    #[cfg(feature = "csr")]
    {
        let query = use_query_map();
        Effect::new(move || {
            let param = query.with(|q| q.get(location::PAGE_PARAM));
            let (Some(root), Some(image)) = (overlay_ref.get(), image_ref.get()) else {
                return;
            };
            let rt = runtime.get_value();
            rt.mount(root.into(), image);
            let page = location::initial_page(param.as_deref(), rt.config());
            rt.load_page(page);
        });

        let on_resize = window_event_listener(leptos::ev::resize, move |_| {
            runtime.get_value().run(|core, _| core.resize(host::window_width()));
        });
        let on_document_click = window_event_listener(leptos::ev::click, move |ev| {
            runtime.get_value().document_click(&ev);
        });
        on_cleanup(move || {
            on_resize.remove();
            on_document_click.remove();
        });
    }

    let image_src = move || state.with(|s| s.image_src.clone().unwrap_or_default());

    view! {
        <div
            class="image-container"
            on:click=move |ev| runtime.get_value().container_click(&ev)
            on:mouseover=move |ev| runtime.get_value().pointer_over(&ev)
            on:mouseout=move |ev| runtime.get_value().pointer_out(&ev)
            on:touchstart=move |ev| runtime.get_value().touch_start(&ev)
            on:touchend=move |ev| runtime.get_value().touch_end(&ev)
        >
            <img
                id="page-image"
                alt="Page image"
                node_ref=image_ref
                src=image_src
                on:load=move |_| runtime.get_value().image_loaded()
                on:error=move |_| log::warn!("overlay host: page image failed to load")
            />
            <div id="overlay-container" class="overlay" node_ref=overlay_ref></div>
        </div>
    }
}
