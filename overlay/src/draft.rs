//! Editor draft state machine.
//!
//! One draft exists while the editor is mounted. Entering `New` or `Existing`
//! snapshots a baseline; the draft is dirty while it differs from that
//! snapshot. Any transition that would throw away a dirty draft asks the
//! injected [`Confirm`] first and leaves everything untouched when declined.

#[cfg(test)]
#[path = "draft_test.rs"]
mod draft_test;

use crate::doc::{AnnType, Annotation, Coords};

/// The annotation being composed or edited.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Draft {
    pub id: Option<String>,
    pub ann_type: AnnType,
    pub content: String,
    pub coords: Option<Coords>,
}

impl Draft {
    /// Empty draft of the given type.
    #[must_use]
    pub fn empty(ann_type: AnnType) -> Self {
        Self { ann_type, ..Self::default() }
    }

    #[must_use]
    pub fn from_annotation(ann: &Annotation) -> Self {
        Self {
            id: ann.id.clone(),
            ann_type: ann.ann_type.clone(),
            content: ann.text.clone(),
            coords: if ann.ann_type.is_spatial() { ann.coords } else { None },
        }
    }

    /// Annotation record for this draft. General drafts never carry coords.
    #[must_use]
    pub fn to_annotation(&self) -> Annotation {
        Annotation {
            id: self.id.clone(),
            ann_type: self.ann_type.clone(),
            text: self.content.clone(),
            target_block: None,
            coords: if self.ann_type.is_spatial() { self.coords } else { None },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditingMode {
    #[default]
    None,
    New,
    Existing,
}

/// A single field's validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    InvalidType,
    ContentRequired,
    CoordsForbidden,
    CoordsRequired,
}

/// Per-field validation result shown inline next to each form field.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("draft is invalid")]
pub struct ValidationErrors {
    pub ann_type: Option<FieldError>,
    pub content: Option<FieldError>,
    pub coords: Option<FieldError>,
}

impl ValidationErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ann_type.is_none() && self.content.is_none() && self.coords.is_none()
    }
}

/// Check a draft before staging or submitting.
///
/// # Errors
///
/// Returns every failing field at once.
pub fn validate(draft: &Draft) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if !draft.ann_type.is_editable() {
        errors.ann_type = Some(FieldError::InvalidType);
    }
    if draft.content.trim().is_empty() {
        errors.content = Some(FieldError::ContentRequired);
    }
    match (&draft.ann_type, draft.coords) {
        (AnnType::General, Some(_)) => errors.coords = Some(FieldError::CoordsForbidden),
        (t, None) if t.is_spatial() => errors.coords = Some(FieldError::CoordsRequired),
        (t, Some(c)) if t.is_spatial() && !c.is_finite() => {
            errors.coords = Some(FieldError::CoordsRequired);
        }
        _ => {}
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// User prompts the machine and the sync layer may raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// Throw away a dirty draft?
    DiscardChanges,
    /// Save hit a version conflict; discard local changes and reload?
    RefetchAfterConflict,
}

/// Blocking yes/no prompt, e.g. `window.confirm`.
pub trait Confirm {
    fn confirm(&mut self, prompt: Prompt) -> bool;
}

impl<F: FnMut(Prompt) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: Prompt) -> bool {
        self(prompt)
    }
}

/// Outcome of a transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// The user kept the dirty draft.
    Declined,
    /// Nothing to do in the current state.
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct DraftMachine {
    draft: Draft,
    baseline: Option<Draft>,
    mode: EditingMode,
}

impl DraftMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    #[must_use]
    pub fn baseline(&self) -> Option<&Draft> {
        self.baseline.as_ref()
    }

    #[must_use]
    pub fn mode(&self) -> EditingMode {
        self.mode
    }

    /// Type or content differ from the baseline; for spatial drafts, coords too.
    /// Without a baseline nothing is dirty.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        let Some(base) = &self.baseline else {
            return false;
        };
        if base.ann_type != self.draft.ann_type || base.content != self.draft.content {
            return true;
        }
        if self.draft.ann_type == AnnType::General {
            return false;
        }
        base.coords != self.draft.coords
    }

    /// # Errors
    ///
    /// See [`validate`].
    pub fn validation(&self) -> Result<(), ValidationErrors> {
        validate(&self.draft)
    }

    /// Staging needs a valid draft that moved away from its baseline.
    #[must_use]
    pub fn can_stage(&self) -> bool {
        self.validation().is_ok() && (self.baseline.is_none() || self.is_dirty())
    }

    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.validation().is_ok()
    }

    // --- Entering modes ---

    /// Start a new draft. Its baseline is the empty draft of the same type,
    /// so anything already typed or placed counts as a change.
    pub fn begin_new(&mut self, draft: Draft) {
        self.baseline = Some(Draft::empty(draft.ann_type.clone()));
        self.draft = draft;
        self.mode = EditingMode::New;
    }

    pub fn begin_existing(&mut self, draft: Draft) {
        self.baseline = Some(draft.clone());
        self.draft = draft;
        self.mode = EditingMode::Existing;
    }

    /// Drop the draft and baseline entirely, keeping the selected type.
    pub fn reset(&mut self) {
        self.draft = Draft::empty(self.draft.ann_type.clone());
        self.baseline = None;
        self.mode = EditingMode::None;
    }

    fn may_discard(&self, confirm: &mut dyn Confirm) -> bool {
        self.mode == EditingMode::None || !self.is_dirty() || confirm.confirm(Prompt::DiscardChanges)
    }

    // --- Field edits ---

    pub fn set_content(&mut self, content: String) {
        self.draft.content = content;
    }

    /// Typed coordinates. Ignored for general drafts.
    pub fn set_coords(&mut self, coords: Option<Coords>) {
        if self.draft.ann_type.is_spatial() {
            self.draft.coords = coords;
        }
    }

    // --- Transitions ---

    /// Type selector changed. `general` is the page's existing general note.
    pub fn select_type(
        &mut self,
        ann_type: AnnType,
        general: Option<&Annotation>,
        confirm: &mut dyn Confirm,
    ) -> Transition {
        if ann_type == self.draft.ann_type && self.mode != EditingMode::None {
            return Transition::Ignored;
        }
        if ann_type == AnnType::General {
            if !self.may_discard(confirm) {
                return Transition::Declined;
            }
            match general {
                Some(existing) => self.begin_existing(Draft::from_annotation(existing)),
                None => self.begin_new(Draft::empty(AnnType::General)),
            }
            return Transition::Applied;
        }
        if self.mode == EditingMode::None {
            self.begin_new(Draft::empty(ann_type));
            return Transition::Applied;
        }
        if self.draft.ann_type == AnnType::General {
            if !self.may_discard(confirm) {
                return Transition::Declined;
            }
            self.begin_new(Draft::empty(ann_type));
            return Transition::Applied;
        }
        // Spatial to spatial edits the current draft in place.
        self.draft.ann_type = ann_type;
        Transition::Applied
    }

    /// A marker was clicked: load its annotation as the draft.
    pub fn load_existing(&mut self, ann: &Annotation, confirm: &mut dyn Confirm) -> Transition {
        if !self.may_discard(confirm) {
            return Transition::Declined;
        }
        self.begin_existing(Draft::from_annotation(ann));
        Transition::Applied
    }

    /// Empty image area was clicked at `coords` (original pixels).
    pub fn place(&mut self, coords: Coords, confirm: &mut dyn Confirm) -> Transition {
        if !self.draft.ann_type.is_spatial() {
            return Transition::Ignored;
        }
        match self.mode {
            EditingMode::New => {
                self.draft.coords = Some(coords);
                Transition::Applied
            }
            EditingMode::Existing => {
                if !self.may_discard(confirm) {
                    return Transition::Declined;
                }
                self.begin_new(Draft {
                    id: None,
                    ann_type: self.draft.ann_type.clone(),
                    content: String::new(),
                    coords: Some(coords),
                });
                Transition::Applied
            }
            EditingMode::None => {
                self.begin_new(Draft {
                    id: None,
                    ann_type: self.draft.ann_type.clone(),
                    content: self.draft.content.clone(),
                    coords: Some(coords),
                });
                Transition::Applied
            }
        }
    }

    /// The server assigned `id` to the annotation being edited.
    pub fn rename(&mut self, id: &str) {
        self.draft.id = Some(id.to_string());
        if let Some(base) = &mut self.baseline {
            base.id = Some(id.to_string());
        }
    }

    /// Revert to the baseline. Returns the baseline that was restored.
    pub fn cancel(&mut self) -> Option<&Draft> {
        let base = self.baseline.clone()?;
        self.draft = base;
        self.baseline.as_ref()
    }
}
