//! Page selection in the URL.
//!
//! The current page is the `page` query parameter; every other parameter
//! (`editor=1` in particular) and the hash survive navigation.

#[cfg(test)]
#[path = "location_test.rs"]
mod location_test;

use overlay::config::ViewerConfig;
use overlay::doc::PageId;

pub const PAGE_PARAM: &str = "page";

/// Page to show for a `page` parameter value, falling back to the configured
/// start page when it is missing, malformed or past the last page.
pub fn initial_page(param: Option<&str>, config: &ViewerConfig) -> PageId {
    let fallback = PageId::new(config.start_page);
    let Some(page) = param.and_then(PageId::parse) else {
        return fallback;
    };
    match config.page_count {
        Some(last) if page.number() > last => fallback,
        _ => page,
    }
}

/// Url for `page`, keeping the other query parameters and the hash.
pub fn page_href(path: &str, search: &str, hash: &str, page: PageId) -> String {
    let mut params: Vec<&str> = search
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| pair.split('=').next() != Some(PAGE_PARAM))
        .collect();
    let page_pair = format!("{PAGE_PARAM}={}", page.number());
    params.push(&page_pair);
    let path = if path.is_empty() { "/" } else { path };
    format!("{path}?{}{hash}", params.join("&"))
}
