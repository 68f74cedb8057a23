//! Host page inputs: configuration globals, the current location and the
//! window size.
//!
//! Browser-only; without `csr` every reader returns an empty default so the
//! shell builds and tests natively.

#[cfg(test)]
#[path = "host_test.rs"]
mod host_test;

use overlay::config::HostInputs;
#[cfg(feature = "csr")]
use wasm_bindgen::JsValue;

#[cfg(feature = "csr")]
const CONFIG_GLOBAL: &str = "REDPEN_CONFIG";
#[cfg(feature = "csr")]
const EDITOR_GLOBAL: &str = "REDPEN_EDITOR";
#[cfg(feature = "csr")]
const MOCKS_GLOBAL: &str = "REDPEN_MOCKS";
#[cfg(feature = "csr")]
const API_BASE_GLOBAL: &str = "REDPEN_API_BASE";

/// Read everything [`overlay::config::ViewerConfig::resolve`] needs.
pub fn collect() -> HostInputs {
    #[cfg(feature = "csr")]
    {
        let Some(window) = web_sys::window() else {
            return HostInputs::default();
        };
        let location = window.location();
        HostInputs {
            config_json: global(&window, CONFIG_GLOBAL)
                .and_then(|v| js_sys::JSON::stringify(&v).ok())
                .map(String::from),
            editor_global: global(&window, EDITOR_GLOBAL).and_then(|v| v.as_bool()) == Some(true),
            mocks_global: global(&window, MOCKS_GLOBAL).and_then(|v| v.as_bool()) == Some(true),
            api_base_global: global(&window, API_BASE_GLOBAL).and_then(|v| v.as_string()),
            search: location.search().unwrap_or_default(),
            hash: location.hash().unwrap_or_default(),
        }
    }
    #[cfg(not(feature = "csr"))]
    {
        HostInputs::default()
    }
}

#[cfg(feature = "csr")]
fn global(window: &web_sys::Window, name: &str) -> Option<JsValue> {
    js_sys::Reflect::get(window, &JsValue::from_str(name))
        .ok()
        .filter(|v| !v.is_undefined() && !v.is_null())
}

/// `window.innerWidth` in CSS pixels; `0` when unavailable.
pub fn window_width() -> f64 {
    #[cfg(feature = "csr")]
    {
        web_sys::window()
            .and_then(|w| w.inner_width().ok())
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
    }
    #[cfg(not(feature = "csr"))]
    {
        0.0
    }
}

/// Current `(pathname, search, hash)`.
pub fn location_parts() -> (String, String, String) {
    #[cfg(feature = "csr")]
    {
        let Some(location) = web_sys::window().map(|w| w.location()) else {
            return ("/".into(), String::new(), String::new());
        };
        (
            location.pathname().unwrap_or_else(|_| "/".into()),
            location.search().unwrap_or_default(),
            location.hash().unwrap_or_default(),
        )
    }
    #[cfg(not(feature = "csr"))]
    {
        ("/".into(), String::new(), String::new())
    }
}
