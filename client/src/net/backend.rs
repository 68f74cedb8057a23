//! Backend selected at start-up.
//!
//! `Backend` uses `async fn` and so cannot be boxed; this enum dispatches
//! between the HTTP adapter and the in-process mock. The mock still reads the
//! static page files, seeding each page on first visit so demos show the real
//! annotations.

#[cfg(test)]
#[path = "backend_test.rs"]
mod backend_test;

use overlay::config::ViewerConfig;
use overlay::doc::{PageId, PagePayload, RawRegion};
use overlay::mock::MockBackend;
use overlay::sync::{Backend, BackendError, SavePayload, SaveResponse, SessionUser};

use crate::net::api::HttpBackend;

/// Mock sessions start signed in as this user.
const MOCK_USER: &str = "mockuser";

#[derive(Debug)]
pub enum ClientBackend {
    Http(HttpBackend),
    Mock { mock: MockBackend, http: HttpBackend },
}

impl ClientBackend {
    #[must_use]
    pub fn from_config(config: &ViewerConfig) -> Self {
        let http = HttpBackend::new(config);
        if config.mock {
            log::info!("backend: using in-process mock");
            Self::Mock { mock: MockBackend::new().signed_in(MOCK_USER), http }
        } else {
            Self::Http(http)
        }
    }

    #[must_use]
    pub fn is_mock(&self) -> bool {
        matches!(self, Self::Mock { .. })
    }

    /// Copy the static annotations for `page` into the mock, once.
    async fn seed_mock(mock: &MockBackend, http: &HttpBackend, page: PageId) {
        if mock.has_page(page) {
            return;
        }
        match http.fetch_static(page).await {
            Ok(payload) => {
                let natural = payload.natural_size();
                mock.seed(page, natural, payload.annotations);
            }
            Err(e) => {
                log::warn!("backend: no static annotations for {page} ({e}); mock starts empty");
                mock.seed(page, None, Vec::new());
            }
        }
    }
}

impl Backend for ClientBackend {
    async fn fetch_page(&self, page: PageId) -> Result<PagePayload, BackendError> {
        match self {
            Self::Http(http) => http.fetch_page(page).await,
            Self::Mock { mock, http } => {
                Self::seed_mock(mock, http, page).await;
                mock.fetch_page(page).await
            }
        }
    }

    async fn fetch_regions(&self, page: PageId) -> Result<Vec<RawRegion>, BackendError> {
        match self {
            Self::Http(http) | Self::Mock { http, .. } => http.fetch_regions(page).await,
        }
    }

    async fn current_user(&self) -> Result<Option<SessionUser>, BackendError> {
        match self {
            Self::Http(http) => http.current_user().await,
            Self::Mock { mock, .. } => mock.current_user().await,
        }
    }

    async fn login(&self, token: &str) -> Result<SessionUser, BackendError> {
        match self {
            Self::Http(http) => http.login(token).await,
            Self::Mock { mock, .. } => mock.login(token).await,
        }
    }

    async fn freshness_token(&self) -> Result<String, BackendError> {
        match self {
            Self::Http(http) => http.freshness_token().await,
            Self::Mock { mock, .. } => mock.freshness_token().await,
        }
    }

    async fn save(
        &self,
        page: PageId,
        id: Option<&str>,
        payload: &SavePayload,
        freshness: &str,
    ) -> Result<SaveResponse, BackendError> {
        match self {
            Self::Http(http) => http.save(page, id, payload, freshness).await,
            Self::Mock { mock, .. } => mock.save(page, id, payload, freshness).await,
        }
    }
}
