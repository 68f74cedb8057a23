//! Local annotation store sync: staging drafts and saving them.
//!
//! SYSTEM CONTEXT
//! ==============
//! The backend is an external collaborator reached through [`Backend`]. The
//! browser client implements it over HTTP; [`crate::mock::MockBackend`]
//! implements it in-process for demos and tests.
//!
//! DESIGN
//! ======
//! Staging is synchronous and purely local. Saving is split so no engine
//! borrow is held across an await: the engine snapshots a [`SaveRequest`]
//! (`EngineCore::begin_submit`), [`perform_submit`] talks to the backend, and
//! the engine applies the outcome (`EngineCore::finish_submit`) only if the
//! request still matches the active page.

#[cfg(test)]
#[path = "sync_test.rs"]
mod sync_test;

use serde::{Deserialize, Serialize};

use crate::doc::{AnnType, Annotation, Coords, PageDoc, PageId, PagePayload, RawRegion, opt_id};
use crate::draft::{Draft, DraftMachine, ValidationErrors};

/// Prefix of locally generated ids that the server has never seen.
pub const PLACEHOLDER_PREFIX: &str = "local-";

#[must_use]
pub fn placeholder_id() -> String {
    format!("{PLACEHOLDER_PREFIX}{}", uuid::Uuid::new_v4())
}

#[must_use]
pub fn is_placeholder(id: &str) -> bool {
    id.starts_with(PLACEHOLDER_PREFIX)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("not signed in")]
    Unauthenticated,
    #[error("page changed on the server")]
    Conflict,
    #[error("server returned status {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

impl BackendError {
    /// Map a non-success HTTP status.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthenticated,
            409 => Self::Conflict,
            other => Self::Status(other),
        }
    }
}

/// The signed-in editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    #[serde(default, deserialize_with = "opt_id", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub username: String,
}

/// Body of a create or update request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePayload {
    pub ann_type: AnnType,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coords: Option<Coords>,
    /// Version token the edit was based on.
    #[serde(default, rename = "clientPageSha")]
    pub expected_version: Option<String>,
}

impl SavePayload {
    #[must_use]
    pub fn from_draft(draft: &Draft, expected_version: Option<String>) -> Self {
        Self {
            ann_type: draft.ann_type.clone(),
            text: draft.content.clone(),
            coords: if draft.ann_type.is_spatial() { draft.coords } else { None },
            expected_version,
        }
    }
}

/// Raw save response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveResponse {
    #[serde(default, deserialize_with = "opt_id")]
    pub id: Option<String>,
    #[serde(default, rename = "serverPageSha", alias = "newVersionToken")]
    pub version_token: Option<String>,
}

/// A successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveAck {
    pub id: String,
    pub version_token: Option<String>,
}

/// Everything needed to save a draft and apply the result later.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub page: PageId,
    /// Navigation generation the request was issued under.
    pub generation: u64,
    /// Server id for an update; `None` creates.
    pub server_id: Option<String>,
    /// Id the draft carried locally, placeholder included.
    pub local_id: Option<String>,
    pub payload: SavePayload,
    pub draft: Draft,
    /// Coordinates changed against the baseline, so any region anchor is dropped.
    pub moved: bool,
}

/// Why a submit could not start.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitBlocked {
    #[error("{0}")]
    Invalid(ValidationErrors),
    #[error("sign-in required")]
    LoginRequired,
    #[error("no page loaded")]
    NoPage,
    #[error("a save is already in flight")]
    InFlight,
    #[error("editor is not enabled")]
    ReadOnly,
}

/// Page data, regions, auth and saves.
#[allow(async_fn_in_trait)]
pub trait Backend {
    async fn fetch_page(&self, page: PageId) -> Result<PagePayload, BackendError>;

    async fn fetch_regions(&self, page: PageId) -> Result<Vec<RawRegion>, BackendError>;

    /// The current session, `None` when anonymous.
    async fn current_user(&self) -> Result<Option<SessionUser>, BackendError>;

    async fn login(&self, token: &str) -> Result<SessionUser, BackendError>;

    /// Anti-forgery token required by [`Backend::save`].
    async fn freshness_token(&self) -> Result<String, BackendError>;

    async fn save(
        &self,
        page: PageId,
        id: Option<&str>,
        payload: &SavePayload,
        freshness: &str,
    ) -> Result<SaveResponse, BackendError>;
}

/// Run the network half of a submit.
///
/// # Errors
///
/// Propagates backend errors; a response without an id is a
/// [`BackendError::Decode`].
pub async fn perform_submit<B: Backend>(backend: &B, request: &SaveRequest) -> Result<SaveAck, BackendError> {
    let freshness = backend.freshness_token().await?;
    let response = backend
        .save(request.page, request.server_id.as_deref(), &request.payload, &freshness)
        .await?;
    let Some(id) = response.id else {
        return Err(BackendError::Decode("save response has no id".into()));
    };
    Ok(SaveAck { id, version_token: response.version_token })
}

/// What staging did to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staged {
    /// Replaced the general singleton.
    General,
    /// Appended a new annotation under a placeholder id.
    Created(String),
    Updated(String),
    /// The id was not on the page; appended instead.
    Recovered(String),
}

/// Whether the draft's coordinates differ from its baseline.
#[must_use]
pub fn moved(machine: &DraftMachine) -> bool {
    machine.baseline().is_none_or(|base| base.coords != machine.draft().coords)
}

/// Record for a draft, keeping the previous region anchor unless the draft moved.
#[must_use]
pub fn staged_record(page: &PageDoc, draft: &Draft, moved: bool) -> Annotation {
    let mut ann = draft.to_annotation();
    if let Some(prev) = draft.id.as_deref().and_then(|id| page.get(id)) {
        if !moved || ann.coords.is_none() {
            ann.target_block.clone_from(&prev.target_block);
        }
    }
    ann
}

/// Apply the draft to the page as a local preview.
///
/// Returns `Ok(None)` when the draft is unchanged since the last stage. On
/// success the draft becomes the new baseline in `Existing` mode.
///
/// # Errors
///
/// Returns the validation errors and leaves the page untouched.
pub fn stage(machine: &mut DraftMachine, page: &mut PageDoc) -> Result<Option<Staged>, ValidationErrors> {
    machine.validation()?;
    if machine.baseline().is_some() && !machine.is_dirty() {
        return Ok(None);
    }
    let mut draft = machine.draft().clone();
    let moved = moved(machine);
    let outcome = if draft.ann_type == AnnType::General {
        page.replace_general(staged_record(page, &draft, moved));
        Staged::General
    } else if let Some(id) = draft.id.clone() {
        if page.upsert(staged_record(page, &draft, moved)) {
            Staged::Updated(id)
        } else {
            log::warn!("stage: {id} not on {}; appending", page.page_id);
            Staged::Recovered(id)
        }
    } else {
        let id = placeholder_id();
        draft.id = Some(id.clone());
        page.upsert(draft.to_annotation());
        Staged::Created(id)
    };
    machine.begin_existing(draft);
    Ok(Some(outcome))
}

/// Fold a successful save into the page. Returns the id that was replaced,
/// when the server assigned a different one.
pub fn reconcile(page: &mut PageDoc, request: &SaveRequest, ack: &SaveAck) -> Option<String> {
    if ack.version_token.is_some() {
        page.version_token.clone_from(&ack.version_token);
    }
    let mut draft = request.draft.clone();
    let replaced = request.local_id.as_deref().filter(|old| *old != ack.id).map(str::to_string);
    if let Some(old) = replaced.as_deref() {
        page.rename(old, &ack.id);
    }
    draft.id = Some(ack.id.clone());
    let record = staged_record(page, &draft, request.moved);
    if draft.ann_type == AnnType::General {
        page.replace_general(record);
    } else {
        page.upsert(record);
    }
    replaced
}
