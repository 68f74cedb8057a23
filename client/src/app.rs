//! Root component: shared contexts and routing.

use leptos::prelude::*;
use leptos_meta::{Title, provide_meta_context};
use leptos_router::components::{Route, Router, Routes};
use leptos_router::path;

use overlay::config::ViewerConfig;

use crate::pages::viewer::ViewerPage;
use crate::state::viewer::ViewerState;

#[component]
pub fn App(config: ViewerConfig) -> impl IntoView {
    provide_meta_context();
    provide_context(config);
    provide_context(RwSignal::new(ViewerState::default()));

    view! {
        <Title text="RedPen" />
        <Router>
            <Routes fallback=|| view! { <ViewerPage /> }>
                <Route path=path!("/") view=ViewerPage />
            </Routes>
        </Router>
    }
}
