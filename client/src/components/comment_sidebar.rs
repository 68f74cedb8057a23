//! Single-item sidebar showing the last clicked comment.

use leptos::prelude::*;

use crate::state::viewer::ViewerState;

#[component]
pub fn CommentSidebar() -> impl IntoView {
    let state = expect_context::<RwSignal<ViewerState>>();
    let item = move || state.with(|s| s.sidebar.clone());

    view! {
        <aside class="comment-sidebar">
            {move || match item() {
                Some(item) => view! {
                    <div class="sidebar-item">
                        <h3 class="sidebar-item__title">{item.title}</h3>
                        <div class="sidebar-item__body" inner_html=item.html></div>
                    </div>
                }
                .into_any(),
                None => view! { <p class="sidebar-empty">"Select a marker to read its comment."</p> }.into_any(),
            }}
        </aside>
    }
}
