//! The add-block flow: catalog browsing and multi-select.
//!
//! [`AddBlockFlow`] owns everything that lives only while the dialog is open
//! (the fetched catalog, the pending selection, the "adding" flag). Remote
//! work is split into `begin_*` / `apply_*` / `finish_*` steps keyed by the
//! dialog epoch, so the caller can run requests without holding the flow
//! borrowed and late completions fall on the floor.

use ubr_types::{BlockDefinition, BlockId, PageId};

use crate::api::ApiError;
use crate::modal::ModalLifecycle;
use crate::notify::Notice;
use crate::store::AddOutcome;

/// Ordered set of block ids chosen for insertion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectionPicker {
    pending: Vec<BlockId>,
}

impl SelectionPicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select if absent, deselect if present. Returns whether it is now selected.
    pub fn toggle(&mut self, id: BlockId) -> bool {
        match self.pending.iter().position(|p| p == &id) {
            Some(pos) => {
                self.pending.remove(pos);
                false
            }
            None => {
                self.pending.push(id);
                true
            }
        }
    }

    pub fn is_selected(&self, id: &BlockId) -> bool {
        self.pending.contains(id)
    }

    /// Selection in click order, which is also the attach order.
    pub fn pending(&self) -> &[BlockId] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// What the picker body shows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CatalogState {
    #[default]
    Idle,
    Loading,
    Loaded(Vec<BlockDefinition>),
    /// Blocking error; the only way forward is closing the dialog.
    Failed(String),
}

/// Reasons a confirm never reaches the network.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfirmError {
    #[error("Please select at least one block.")]
    NothingSelected,
    #[error("Page ID not provided.")]
    MissingPage,
    #[error("an add is already in progress")]
    Busy,
    #[error("the add-block dialog is not open")]
    Closed,
}

impl ConfirmError {
    pub fn notice(&self) -> Notice {
        match self {
            ConfirmError::NothingSelected => Notice::warning(self.to_string()),
            _ => Notice::error(self.to_string()),
        }
    }
}

/// Toast for a finished add.
pub fn outcome_notice(outcome: &AddOutcome) -> Notice {
    if outcome.is_success() {
        Notice::success(outcome.summary())
    } else {
        Notice::error(outcome.summary())
    }
}

pub const CATALOG_FAILED: &str = "Failed to load blocks. Please try again.";

#[derive(Clone, Debug, Default)]
pub struct AddBlockFlow {
    modal: ModalLifecycle,
    picker: SelectionPicker,
    catalog: CatalogState,
    adding: bool,
}

impl AddBlockFlow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the dialog with an empty selection; fetch the catalog next.
    pub fn open(&mut self) -> u64 {
        self.picker.clear();
        self.catalog = CatalogState::Loading;
        self.adding = false;
        self.modal.open()
    }

    pub fn close(&mut self) {
        self.modal.close();
    }

    pub fn is_open(&self) -> bool {
        self.modal.is_open()
    }

    pub fn epoch(&self) -> u64 {
        self.modal.epoch()
    }

    pub fn modal(&self) -> &ModalLifecycle {
        &self.modal
    }

    pub fn modal_mut(&mut self) -> &mut ModalLifecycle {
        &mut self.modal
    }

    pub fn catalog(&self) -> &CatalogState {
        &self.catalog
    }

    pub fn picker(&self) -> &SelectionPicker {
        &self.picker
    }

    pub fn is_adding(&self) -> bool {
        self.adding
    }

    /// Catalog fetch failed; the dialog offers nothing but close.
    pub fn is_blocked(&self) -> bool {
        matches!(self.catalog, CatalogState::Failed(_))
    }

    /// Toggle a catalog card. Ignored while the dialog is closed.
    pub fn toggle(&mut self, id: BlockId) -> bool {
        if !self.is_open() {
            return false;
        }
        self.picker.toggle(id)
    }

    /// Install a catalog fetch result. Returns a notice on failure, and
    /// `None` for success or for a result belonging to a stale opening.
    pub fn apply_catalog(
        &mut self,
        epoch: u64,
        result: Result<Vec<BlockDefinition>, ApiError>,
    ) -> Option<Notice> {
        if !self.modal.is_current(epoch) {
            tracing::debug!(epoch, current = self.modal.epoch(), "stale catalog response dropped");
            return None;
        }
        match result {
            Ok(blocks) => {
                self.catalog = CatalogState::Loaded(blocks);
                None
            }
            Err(error) => {
                self.catalog = CatalogState::Failed(error.to_string());
                Some(Notice::error(CATALOG_FAILED))
            }
        }
    }

    pub fn can_confirm(&self) -> bool {
        self.is_open()
            && matches!(self.catalog, CatalogState::Loaded(_))
            && !self.adding
            && !self.picker.is_empty()
    }

    /// Validate and mark the flow busy. Returns the ids to attach, in order.
    pub fn begin_confirm(&mut self, page: PageId) -> Result<Vec<BlockId>, ConfirmError> {
        if !self.is_open() {
            return Err(ConfirmError::Closed);
        }
        if self.adding {
            return Err(ConfirmError::Busy);
        }
        if self.picker.is_empty() {
            return Err(ConfirmError::NothingSelected);
        }
        if !page.is_set() {
            return Err(ConfirmError::MissingPage);
        }
        self.adding = true;
        Ok(self.picker.pending().to_vec())
    }

    /// Settle a confirm. Returns false when the dialog moved on meanwhile.
    ///
    /// Full success clears the selection and closes. Otherwise the dialog
    /// stays open with the selection exactly as it was confirmed.
    pub fn finish_confirm(&mut self, epoch: u64, outcome: &AddOutcome) -> bool {
        if !self.modal.is_current(epoch) {
            return false;
        }
        self.adding = false;
        if outcome.is_success() {
            self.picker.clear();
            self.modal.close();
        }
        true
    }

    /// Release the busy flag after a confirm that errored before reporting.
    pub fn abort_confirm(&mut self, epoch: u64) {
        if self.modal.is_current(epoch) {
            self.adding = false;
        }
    }
}
