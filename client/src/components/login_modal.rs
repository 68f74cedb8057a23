//! Sign-in dialog for editors.
//!
//! Opens when a submit needs a session or the session expired; the message
//! says which. The draft is untouched while it is open.

use leptos::prelude::*;

use crate::components::overlay_host::use_runtime;
use crate::state::viewer::ViewerState;

#[component]
pub fn LoginModal() -> impl IntoView {
    let state = expect_context::<RwSignal<ViewerState>>();
    let runtime = use_runtime();
    let token = RwSignal::new(String::new());

    let is_open = move || state.with(|s| s.login.is_some());
    let message = move || state.with(|s| s.login.as_ref().and_then(|l| l.message.clone()));
    let busy = move || state.with(|s| s.login_busy);

    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        if busy() {
            return;
        }
        let value = token.get().trim().to_owned();
        if value.is_empty() {
            return;
        }
        runtime.get_value().login(value);
    };

    let on_cancel = move |_: leptos::ev::MouseEvent| {
        token.set(String::new());
        runtime.get_value().close_login();
    };

    view! {
        <Show when=is_open>
            <div class="modal-backdrop">
                <form class="modal login-modal" on:submit=on_submit>
                    <h2 class="modal__title">"Sign in"</h2>
                    <p class="login-modal__message">{message}</p>
                    <input
                        class="login-input"
                        type="password"
                        placeholder="Access token"
                        prop:value=move || token.get()
                        on:input=move |ev| token.set(event_target_value(&ev))
                    />
                    <div class="modal__actions">
                        <button class="btn btn--primary" type="submit" prop:disabled=busy>
                            {move || if busy() { "Signing in..." } else { "Sign in" }}
                        </button>
                        <button class="btn btn--link" type="button" on:click=on_cancel>
                            "Cancel"
                        </button>
                    </div>
                </form>
            </div>
        </Show>
    }
}
