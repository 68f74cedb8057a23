//! Full-screen comment overlay for narrow screens.

use leptos::prelude::*;

use crate::components::overlay_host::use_runtime;
use crate::state::viewer::ViewerState;

#[component]
pub fn MobileOverlay() -> impl IntoView {
    let state = expect_context::<RwSignal<ViewerState>>();
    let runtime = use_runtime();
    let labels = runtime.with_value(|rt| rt.config().labels.clone());
    let item = move || state.with(|s| s.mobile.clone());

    let close_label = labels.close.clone();
    let general_label = labels.show_general;

    move || {
        item().map(|item| {
            let close_label = close_label.clone();
            let general_label = general_label.clone();
            view! {
                <div
                    id="mobile-overlay"
                    class="mobile-overlay"
                    on:click=move |_| runtime.get_value().close_mobile_overlay()
                >
                    <div class="mobile-overlay-content" on:click=|ev| ev.stop_propagation()>
                        <button
                            class="mobile-overlay-close"
                            title=close_label
                            on:click=move |_| runtime.get_value().close_mobile_overlay()
                        >
                            "×"
                        </button>
                        <h3>{item.title}</h3>
                        <div class="mobile-overlay-body" inner_html=item.html></div>
                        <button
                            class="btn mobile-overlay-general"
                            on:click=move |_| runtime.get_value().show_general_from_overlay()
                        >
                            {general_label}
                        </button>
                    </div>
                </div>
            }
        })
    }
}
