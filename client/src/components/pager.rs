//! Previous/next page controls.

#[cfg(test)]
#[path = "pager_test.rs"]
mod pager_test;

use leptos::prelude::*;

use overlay::doc::PageId;

use crate::components::overlay_host::use_runtime;
use crate::state::viewer::ViewerState;

fn page_label(page: Option<PageId>, page_count: Option<u32>) -> String {
    match (page, page_count) {
        (Some(page), Some(count)) => format!("Page {} of {count}", page.number()),
        (Some(page), None) => format!("Page {}", page.number()),
        (None, _) => String::new(),
    }
}

fn has_next(page: Option<PageId>, page_count: Option<u32>) -> bool {
    page.is_some_and(|p| p.next(page_count).is_some())
}

fn has_prev(page: Option<PageId>) -> bool {
    page.is_some_and(|p| p.prev().is_some())
}

#[component]
pub fn Pager() -> impl IntoView {
    let state = expect_context::<RwSignal<ViewerState>>();
    let runtime = use_runtime();
    let page_count = runtime.with_value(|rt| rt.config().page_count);
    let page = move || state.with(|s| s.page);

    view! {
        <nav class="pager">
            <button
                class="btn pager__prev"
                prop:disabled=move || !has_prev(page())
                on:click=move |_| runtime.get_value().prev_page()
            >
                "‹ Previous"
            </button>
            <span class="pager__label">{move || page_label(page(), page_count)}</span>
            <button
                class="btn pager__next"
                prop:disabled=move || !has_next(page(), page_count)
                on:click=move |_| runtime.get_value().next_page()
            >
                "Next ›"
            </button>
        </nav>
    }
}
