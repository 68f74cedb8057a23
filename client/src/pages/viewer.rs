//! Page viewer: image, overlay, panels and (in editor mode) the editor form.
//!
//! ARCHITECTURE
//! ============
//! Builds the [`OverlayRuntime`] for the route and provides it to every panel
//! through context. The `layout` element is the flex container whose direction
//! the engine sets and which receives popup overflow spacers.

use std::rc::Rc;

use leptos::prelude::*;
use leptos_router::NavigateOptions;
use leptos_router::hooks::use_navigate;

use overlay::config::ViewerConfig;

use crate::components::comment_sidebar::CommentSidebar;
use crate::components::editor_panel::EditorPanel;
use crate::components::general_comment::GeneralComment;
use crate::components::login_modal::LoginModal;
use crate::components::mobile_overlay::MobileOverlay;
use crate::components::notice_bar::NoticeBar;
use crate::components::overlay_host::{NavigateFn, OverlayHost, OverlayRuntime};
use crate::components::pager::Pager;
use crate::state::viewer::ViewerState;

#[component]
pub fn ViewerPage() -> impl IntoView {
    let config = expect_context::<ViewerConfig>();
    let state = expect_context::<RwSignal<ViewerState>>();
    let editor = config.editor;

    let navigate = use_navigate();
    let navigate: NavigateFn = Rc::new(move |href: &str| navigate(href, NavigateOptions::default()));
    provide_context(StoredValue::new_local(OverlayRuntime::new(config, state, navigate)));

    view! {
        <div id="layout" class="layout" class:layout--editor=editor>
            <main class="page-column">
                <Pager />
                <OverlayHost />
                <GeneralComment />
            </main>
            <div class="side-column">
                <CommentSidebar />
                {editor.then(|| view! { <EditorPanel /> })}
            </div>
            <MobileOverlay />
            <LoginModal />
            <NoticeBar />
        </div>
    }
}
