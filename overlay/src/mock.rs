//! In-process backend for demos and tests.
//!
//! Behaves like the real API at the level the editor cares about: any
//! non-empty login token signs in, saves need a freshness token it issued,
//! every save bumps the page version, and a save based on an old version is a
//! conflict.

#[cfg(test)]
#[path = "mock_test.rs"]
mod mock_test;

use std::cell::RefCell;
use std::collections::HashMap;

use crate::doc::{Annotation, PageId, PagePayload, RawRegion};
use crate::mapper::Size;
use crate::sync::{Backend, BackendError, SavePayload, SaveResponse, SessionUser};

#[derive(Debug, Clone, Default)]
struct MockPage {
    version: u64,
    natural: Option<Size>,
    annotations: Vec<Annotation>,
}

impl MockPage {
    fn token(&self) -> String {
        version_token(self.version)
    }
}

fn version_token(version: u64) -> String {
    format!("mock-sha-{version}")
}

#[derive(Debug, Default)]
struct MockState {
    pages: HashMap<PageId, MockPage>,
    regions: HashMap<PageId, Vec<RawRegion>>,
    user: Option<SessionUser>,
    issued: Vec<String>,
    next_id: u64,
    fail_next_save: Option<BackendError>,
    saves: usize,
}

#[derive(Debug, Default)]
pub struct MockBackend {
    state: RefCell<MockState>,
}

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a page.
    #[must_use]
    pub fn with_page(self, page: PageId, natural: Option<Size>, annotations: Vec<Annotation>) -> Self {
        self.seed(page, natural, annotations);
        self
    }

    #[must_use]
    pub fn with_regions(self, page: PageId, regions: Vec<RawRegion>) -> Self {
        self.state.borrow_mut().regions.insert(page, regions);
        self
    }

    /// Seed a page at version 1, replacing anything stored for it.
    pub fn seed(&self, page: PageId, natural: Option<Size>, annotations: Vec<Annotation>) {
        self.state
            .borrow_mut()
            .pages
            .insert(page, MockPage { version: 1, natural, annotations });
    }

    #[must_use]
    pub fn has_page(&self, page: PageId) -> bool {
        self.state.borrow().pages.contains_key(&page)
    }

    /// Start with an authenticated session.
    #[must_use]
    pub fn signed_in(self, username: &str) -> Self {
        self.state.borrow_mut().user = Some(mock_user(username));
        self
    }

    /// Drop the session so the next save is unauthenticated.
    pub fn expire_session(&self) {
        self.state.borrow_mut().user = None;
    }

    /// Make the next save fail with `error`.
    pub fn fail_next_save(&self, error: BackendError) {
        self.state.borrow_mut().fail_next_save = Some(error);
    }

    /// Simulate another editor changing the page.
    pub fn bump_version(&self, page: PageId) {
        self.state.borrow_mut().pages.entry(page).or_default().version += 1;
    }

    #[must_use]
    pub fn version_token(&self, page: PageId) -> Option<String> {
        self.state.borrow().pages.get(&page).map(MockPage::token)
    }

    #[must_use]
    pub fn annotations(&self, page: PageId) -> Vec<Annotation> {
        self.state
            .borrow()
            .pages
            .get(&page)
            .map(|p| p.annotations.clone())
            .unwrap_or_default()
    }

    /// Saves accepted so far.
    #[must_use]
    pub fn saves(&self) -> usize {
        self.state.borrow().saves
    }
}

fn mock_user(username: &str) -> SessionUser {
    SessionUser { user_id: Some("mock-user".into()), username: username.to_string() }
}

impl Backend for MockBackend {
    async fn fetch_page(&self, page: PageId) -> Result<PagePayload, BackendError> {
        let state = self.state.borrow();
        let stored = state.pages.get(&page).cloned().unwrap_or_default();
        Ok(PagePayload {
            page_id: Some(page.api_id()),
            orig_w: stored.natural.map(|s| s.width),
            orig_h: stored.natural.map(|s| s.height),
            version_token: Some(stored.token()),
            annotations: stored.annotations,
        })
    }

    async fn fetch_regions(&self, page: PageId) -> Result<Vec<RawRegion>, BackendError> {
        Ok(self.state.borrow().regions.get(&page).cloned().unwrap_or_default())
    }

    async fn current_user(&self) -> Result<Option<SessionUser>, BackendError> {
        Ok(self.state.borrow().user.clone())
    }

    async fn login(&self, token: &str) -> Result<SessionUser, BackendError> {
        if token.trim().is_empty() {
            return Err(BackendError::Unauthenticated);
        }
        let user = mock_user("reviewer");
        self.state.borrow_mut().user = Some(user.clone());
        Ok(user)
    }

    async fn freshness_token(&self) -> Result<String, BackendError> {
        let mut state = self.state.borrow_mut();
        let token = format!("mock-csrf-{}", state.issued.len() + 1);
        state.issued.push(token.clone());
        Ok(token)
    }

    async fn save(
        &self,
        page: PageId,
        id: Option<&str>,
        payload: &SavePayload,
        freshness: &str,
    ) -> Result<SaveResponse, BackendError> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        if state.user.is_none() {
            return Err(BackendError::Unauthenticated);
        }
        if !state.issued.iter().any(|t| t == freshness) {
            return Err(BackendError::Status(403));
        }
        if let Some(error) = state.fail_next_save.take() {
            return Err(error);
        }
        let stored = state.pages.entry(page).or_default();
        if payload.expected_version.as_deref() != Some(stored.token().as_str()) {
            return Err(BackendError::Conflict);
        }
        let record = Annotation {
            id: None,
            ann_type: payload.ann_type.clone(),
            text: payload.text.clone(),
            target_block: None,
            coords: payload.coords,
        };
        let saved_id = match id {
            Some(id) => {
                let Some(slot) = stored.annotations.iter_mut().find(|a| a.id.as_deref() == Some(id)) else {
                    return Err(BackendError::Status(404));
                };
                let target_block = if slot.coords == record.coords { slot.target_block.take() } else { None };
                *slot = Annotation { id: Some(id.to_string()), target_block, ..record };
                id.to_string()
            }
            None => {
                state.next_id += 1;
                let fresh_id = format!("srv-{}", state.next_id);
                stored.annotations.push(Annotation { id: Some(fresh_id.clone()), ..record });
                fresh_id
            }
        };
        stored.version += 1;
        let version = stored.token();
        state.saves += 1;
        Ok(SaveResponse { id: Some(saved_id), version_token: Some(version) })
    }
}
