//! HTTP implementation of the overlay backend.
//!
//! Browser builds (`csr`): real requests via `gloo-net`. Native builds get
//! [`BackendError::Network`] from every call so the shell still compiles and
//! tests without a browser.
//!
//! ERROR HANDLING
//! ==============
//! Non-success statuses map through [`BackendError::from_status`]; transport
//! and decode failures carry their message. Nothing here panics.

#![allow(clippy::unused_async)]

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use std::cell::RefCell;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use overlay::config::ViewerConfig;
use overlay::doc::{PageId, PagePayload, RawRegion};
use overlay::sync::{Backend, BackendError, SavePayload, SaveResponse, SessionUser};

const CSRF_ENDPOINT: &str = "/api/auth/csrf";
const LOGIN_ENDPOINT: &str = "/api/auth/login";
const ME_ENDPOINT: &str = "/api/auth/me";
#[cfg(feature = "csr")]
const CSRF_HEADER: &str = "X-CSRF-Token";

fn page_endpoint(page: PageId) -> String {
    format!("/api/pages/{}", page.api_id())
}

fn annotations_endpoint(page: PageId, id: Option<&str>) -> String {
    match id {
        Some(id) => format!("{}/annotations/{id}", page_endpoint(page)),
        None => format!("{}/annotations", page_endpoint(page)),
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, BackendError> {
    serde_json::from_str(body).map_err(|e| BackendError::Decode(e.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CsrfResponse {
    csrf_token: String,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    token: &'a str,
}

#[derive(Debug, Clone, Copy)]
enum Method {
    Post,
    Put,
}

/// Talks to the annotation API, or to the static files in viewer mode.
#[derive(Debug)]
pub struct HttpBackend {
    api_base: String,
    /// Page data comes from the API instead of the static annotation files.
    editor: bool,
    csrf: RefCell<Option<String>>,
}

impl HttpBackend {
    #[must_use]
    pub fn new(config: &ViewerConfig) -> Self {
        Self { api_base: config.api_base.clone(), editor: config.editor, csrf: RefCell::new(None) }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }

    fn page_url(&self, page: PageId) -> String {
        if self.editor { self.api_url(&page_endpoint(page)) } else { page.annotations_path() }
    }

    /// The static annotation list for `page`, whatever the mode.
    ///
    /// # Errors
    ///
    /// Transport, status and decode failures.
    pub async fn fetch_static(&self, page: PageId) -> Result<PagePayload, BackendError> {
        let body = get(&page.annotations_path()).await?;
        Ok(PagePayload::from_annotations(decode(&body)?))
    }
}

impl Backend for HttpBackend {
    async fn fetch_page(&self, page: PageId) -> Result<PagePayload, BackendError> {
        if !self.editor {
            return self.fetch_static(page).await;
        }
        decode(&get(&self.page_url(page)).await?)
    }

    async fn fetch_regions(&self, page: PageId) -> Result<Vec<RawRegion>, BackendError> {
        decode(&get(&page.regions_path()).await?)
    }

    async fn current_user(&self) -> Result<Option<SessionUser>, BackendError> {
        match get(&self.api_url(ME_ENDPOINT)).await {
            Ok(body) => Ok(Some(decode(&body)?)),
            Err(BackendError::Unauthenticated) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn login(&self, token: &str) -> Result<SessionUser, BackendError> {
        send(Method::Post, &self.api_url(LOGIN_ENDPOINT), &LoginRequest { token }, None).await?;
        self.csrf.borrow_mut().take();
        self.current_user().await?.ok_or(BackendError::Unauthenticated)
    }

    async fn freshness_token(&self) -> Result<String, BackendError> {
        if let Some(token) = self.csrf.borrow().clone() {
            return Ok(token);
        }
        let body: CsrfResponse = decode(&get(&self.api_url(CSRF_ENDPOINT)).await?)?;
        *self.csrf.borrow_mut() = Some(body.csrf_token.clone());
        Ok(body.csrf_token)
    }

    async fn save(
        &self,
        page: PageId,
        id: Option<&str>,
        payload: &SavePayload,
        freshness: &str,
    ) -> Result<SaveResponse, BackendError> {
        let url = self.api_url(&annotations_endpoint(page, id));
        let method = if id.is_some() { Method::Put } else { Method::Post };
        let result = send(method, &url, payload, Some(freshness)).await;
        if matches!(result, Err(BackendError::Status(403))) {
            log::info!("api: freshness token rejected; fetching a new one next time");
            self.csrf.borrow_mut().take();
        }
        decode(&result?)
    }
}

/// GET `url`, returning the body of a successful response.
async fn get(url: &str) -> Result<String, BackendError> {
    #[cfg(feature = "csr")]
    {
        let resp = gloo_net::http::Request::get(url)
            .credentials(web_sys::RequestCredentials::Include)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        if !resp.ok() {
            return Err(BackendError::from_status(resp.status()));
        }
        resp.text().await.map_err(|e| BackendError::Network(e.to_string()))
    }
    #[cfg(not(feature = "csr"))]
    {
        Err(offline(url))
    }
}

/// Send `body` as JSON, returning the body of a successful response.
async fn send<B: Serialize>(method: Method, url: &str, body: &B, csrf: Option<&str>) -> Result<String, BackendError> {
    #[cfg(feature = "csr")]
    {
        let builder = match method {
            Method::Post => gloo_net::http::Request::post(url),
            Method::Put => gloo_net::http::Request::put(url),
        };
        let builder = builder.credentials(web_sys::RequestCredentials::Include);
        let builder = match csrf {
            Some(token) => builder.header(CSRF_HEADER, token),
            None => builder,
        };
        let resp = builder
            .json(body)
            .map_err(|e| BackendError::Decode(e.to_string()))?
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        if !resp.ok() {
            return Err(BackendError::from_status(resp.status()));
        }
        resp.text().await.map_err(|e| BackendError::Network(e.to_string()))
    }
    #[cfg(not(feature = "csr"))]
    {
        let _ = (method, body, csrf);
        Err(offline(url))
    }
}

#[cfg(not(feature = "csr"))]
fn offline(url: &str) -> BackendError {
    BackendError::Network(format!("{url}: not available outside the browser"))
}
