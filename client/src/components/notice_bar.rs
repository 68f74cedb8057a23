//! Transient notices: saved, preview updated, save failures with retry.

use leptos::prelude::*;

use crate::components::overlay_host::use_runtime;
use crate::state::viewer::ViewerState;

#[component]
pub fn NoticeBar() -> impl IntoView {
    let state = expect_context::<RwSignal<ViewerState>>();
    let runtime = use_runtime();
    let notice = move || state.with(|s| s.notice.clone());

    move || {
        notice().map(|notice| {
            view! {
                <div class="notice-bar" class:notice-bar--error=notice.retryable role="status">
                    <span class="notice-bar__message">{notice.message}</span>
                    {notice.retryable.then(|| view! {
                        <button class="btn btn--link" on:click=move |_| runtime.get_value().submit()>
                            "Retry"
                        </button>
                    })}
                    <button class="btn btn--link" on:click=move |_| runtime.get_value().dismiss_notice()>
                        "×"
                    </button>
                </div>
            }
        })
    }
}
