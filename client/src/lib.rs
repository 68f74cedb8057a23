//! Leptos shell for the RedPen page viewer and annotation editor.
//!
//! SYSTEM CONTEXT
//! ==============
//! Compiled to WebAssembly with the `csr` feature and mounted on the page
//! body. Resolves the viewer configuration from the host page, then hands
//! pointer, touch and form events to the `overlay` engine and renders the
//! panels it drives. Without `csr` the crate builds natively so its pure
//! pieces can be unit tested.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`app`] | Root component, contexts and routing |
//! | [`pages`] | The viewer route |
//! | [`components`] | Overlay host and panels |
//! | [`net`] | HTTP and mock backends |
//! | [`state`] | Panel state shared through context |
//! | [`util`] | Host page inputs, url handling, confirm prompts |

pub mod app;
pub mod components;
pub mod net;
pub mod pages;
pub mod state;
pub mod util;

#[cfg(feature = "csr")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    use leptos::prelude::*;
    use overlay::config::ViewerConfig;

    use crate::app::App;

    console_error_panic_hook::set_once();
    let config = ViewerConfig::resolve(&util::host::collect());
    let _ = console_log::init_with_level(config.log_level());
    log::info!("redpen: starting (editor: {}, page {})", config.editor, config.start_page);
    leptos::mount::mount_to_body(move || view! { <App config=config /> });
}
