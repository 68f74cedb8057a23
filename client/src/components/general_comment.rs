//! Page-level comment block under the image.
//!
//! Scrolls itself into view whenever the engine asks (the mobile overlay's
//! "show general comment" button).

use leptos::prelude::*;

use crate::state::viewer::ViewerState;

#[component]
pub fn GeneralComment() -> impl IntoView {
    let state = expect_context::<RwSignal<ViewerState>>();
    let container_ref = NodeRef::<leptos::html::Section>::new();
    let html = move || state.with(|s| s.general_html.clone());

    #[cfg(feature = "csr")]
    Effect::new(move || {
        let seq = state.with(|s| s.scroll_general_seq);
        if seq == 0 {
            return;
        }
        if let Some(el) = container_ref.get() {
            let options = web_sys::ScrollIntoViewOptions::new();
            options.set_behavior(web_sys::ScrollBehavior::Smooth);
            el.scroll_into_view_with_scroll_into_view_options(&options);
        }
    });

    view! {
        <section id="global-comment-container" class="general-comment" node_ref=container_ref>
            <div class="general-comment__body" inner_html=html></div>
        </section>
    }
}
