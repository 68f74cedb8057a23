//! Annotation editor form.
//!
//! SYSTEM CONTEXT
//! ==============
//! Renders the engine's `EditorView` snapshot field by field. Every edit goes
//! back through the runtime, so the draft machine stays the only owner of
//! draft state and the form simply follows `DraftChanged`.

#[cfg(test)]
#[path = "editor_panel_test.rs"]
mod editor_panel_test;

use leptos::prelude::*;

use overlay::doc::AnnType;
use overlay::draft::EditingMode;
use overlay::engine::EditorView;

use crate::components::overlay_host::use_runtime;
use crate::state::viewer::ViewerState;

/// Editable types as `(value, label)`.
const TYPE_OPTIONS: [(&str, &str); 3] = [("main", "Main finding"), ("comment", "Comment"), ("general", "General note")];

fn mode_label(mode: EditingMode) -> &'static str {
    match mode {
        EditingMode::None => "No draft",
        EditingMode::New => "New annotation",
        EditingMode::Existing => "Editing saved annotation",
    }
}

fn submit_label(submitting: bool) -> &'static str {
    if submitting { "Saving..." } else { "Submit" }
}

/// Read one field of the editor snapshot, or its default when there is none.
fn editor_field<T: Default>(state: RwSignal<ViewerState>, read: impl Fn(&EditorView) -> T) -> T {
    state.with(|s| s.editor.as_ref().map(read).unwrap_or_default())
}

#[component]
pub fn EditorPanel() -> impl IntoView {
    let state = expect_context::<RwSignal<ViewerState>>();
    let runtime = use_runtime();

    let has_editor = move || state.with(|s| s.editor.is_some());
    let ann_type = move || editor_field(state, |e| e.ann_type.to_string());
    let content = move || editor_field(state, |e| e.content.clone());
    let coords_text = move || editor_field(state, |e| e.coords_text.clone());
    let show_coords = move || editor_field(state, |e| e.show_coords);
    let mode = move || mode_label(editor_field(state, |e| e.mode));
    let dirty = move || editor_field(state, |e| e.dirty);
    let can_stage = move || editor_field(state, |e| e.can_stage);
    let can_submit = move || editor_field(state, |e| e.can_submit);
    let submitting = move || editor_field(state, |e| e.submitting);
    let type_error = move || editor_field(state, |e| e.type_error.clone());
    let content_error = move || editor_field(state, |e| e.content_error.clone());
    let coords_error = move || editor_field(state, |e| e.coords_error.clone());
    let username = move || editor_field(state, |e| e.username.clone());

    view! {
        <Show when=has_editor>
            <section class="editor-panel">
                <header class="editor-panel__header">
                    <span class="editor-panel__mode">{mode}</span>
                    <span class="editor-panel__dirty" class:is-hidden=move || !dirty()>"unsaved"</span>
                    <span class="editor-panel__session">
                        {move || match username() {
                            Some(name) => view! { <span>"Signed in as " {name}</span> }.into_any(),
                            None => view! {
                                <button class="btn btn--link" on:click=move |_| runtime.get_value().open_login()>
                                    "Sign in"
                                </button>
                            }
                            .into_any(),
                        }}
                    </span>
                </header>

                <label class="editor-panel__label" for="editor-type">"Type"</label>
                <select
                    id="editor-type"
                    class="editor-panel__input"
                    prop:value=ann_type
                    on:change=move |ev| runtime.get_value().select_type(AnnType::from(event_target_value(&ev)))
                >
                    {TYPE_OPTIONS
                        .iter()
                        .map(|(value, label)| view! { <option value=*value>{*label}</option> })
                        .collect_view()}
                </select>
                <p class="editor-panel__error">{type_error}</p>

                <label class="editor-panel__label" for="editor-content">"Text"</label>
                <textarea
                    id="editor-content"
                    class="editor-panel__textarea"
                    rows="6"
                    prop:value=content
                    on:input=move |ev| runtime.get_value().set_content(event_target_value(&ev))
                ></textarea>
                <p class="editor-panel__error">{content_error}</p>

                <div class="editor-panel__coords" class:is-hidden=move || !show_coords()>
                    <label class="editor-panel__label" for="editor-coords">"Coordinates"</label>
                    <input
                        id="editor-coords"
                        class="editor-panel__input"
                        type="text"
                        placeholder="[x, y]"
                        prop:value=coords_text
                        on:change=move |ev| runtime.get_value().set_coords_text(&event_target_value(&ev))
                    />
                    <p class="editor-panel__hint">"Click the image to place the marker."</p>
                    <p class="editor-panel__error">{coords_error}</p>
                </div>

                <div class="editor-panel__actions">
                    <button
                        class="btn"
                        prop:disabled=move || !can_stage()
                        on:click=move |_| runtime.get_value().stage()
                    >
                        "Preview"
                    </button>
                    <button
                        class="btn btn--primary"
                        prop:disabled=move || !can_submit()
                        on:click=move |_| runtime.get_value().submit()
                    >
                        {move || submit_label(submitting())}
                    </button>
                    <button class="btn btn--link" on:click=move |_| runtime.get_value().cancel_draft()>
                        "Cancel"
                    </button>
                </div>
            </section>
        </Show>
    }
}
