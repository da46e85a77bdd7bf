//! The page-blocks sidebar as a headless controller.
//!
//! Composes the section store with the interaction state around it: the
//! panel toggle, the per-item action menu, the delete confirmation, drag
//! reordering, the add-block dialog, and the editor hand-off. Every outcome a
//! user should see goes through the [`Notifier`].
//!
//! A front end (the `ubr` CLI, a TUI, a test) drives it by calling the
//! handler methods and rendering from the accessors.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use ubr_types::{BlockId, Section, SectionId};
use url::Url;

use crate::api::BlocksApi;
use crate::catalog::RemoteBlockCatalog;
use crate::config::{ClientConfig, ConfigError};
use crate::edit::EditSession;
use crate::notify::{Notice, Notifier};
use crate::picker::{AddBlockFlow, outcome_notice};
use crate::reorder::{DragReorderController, ItemRect, KeyDirection, Point};
use crate::store::{AddOutcome, LoadOutcome, PageSectionStore, StoreError};

pub const DELETE_SUCCESS: &str = "Block deleted successfully";
pub const DELETE_FAILED: &str = "Delete failed";
pub const REORDER_FAILED: &str = "Reorder failed";

pub struct Sidebar {
    store: Arc<PageSectionStore>,
    catalog: RemoteBlockCatalog,
    notifier: Arc<dyn Notifier>,
    drag: DragReorderController<SectionId>,
    add_flow: AddBlockFlow,
    edit: EditSession,
    panel_open: bool,
    menu_open: Option<SectionId>,
    delete_confirm: Option<SectionId>,
}

impl Sidebar {
    pub fn new(
        api: Arc<dyn BlocksApi>,
        config: &ClientConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            store: Arc::new(PageSectionStore::new(api.clone(), config)),
            catalog: RemoteBlockCatalog::new(api, config.request_timeout()),
            notifier,
            drag: DragReorderController::new(),
            add_flow: AddBlockFlow::new(),
            edit: EditSession::from_config(config)?,
            panel_open: false,
            menu_open: None,
            delete_confirm: None,
        })
    }

    pub fn store(&self) -> &Arc<PageSectionStore> {
        &self.store
    }

    pub fn sections(&self) -> Vec<Section> {
        self.store.sections()
    }

    fn notify(&self, notice: Notice) {
        self.notifier.notify(notice);
    }

    /// Initial load. An unset page is reported once and leaves the list empty.
    pub async fn start(&self) -> Result<LoadOutcome, StoreError> {
        if !self.store.page().is_set() {
            warn!("Page ID not found in host data");
            return Ok(LoadOutcome::Inert);
        }
        self.refresh().await
    }

    /// Reload the list. Failures are logged, the list stays as it was.
    pub async fn refresh(&self) -> Result<LoadOutcome, StoreError> {
        self.store.load().await.inspect_err(|error| {
            warn!(%error, "failed to fetch page blocks");
        })
    }

    // ── Panel and menus ─────────────────────────────────────────────────

    pub fn is_panel_open(&self) -> bool {
        self.panel_open
    }

    pub fn toggle_panel(&mut self) -> bool {
        self.panel_open = !self.panel_open;
        self.panel_open
    }

    pub fn close_panel(&mut self) {
        self.panel_open = false;
        self.menu_open = None;
    }

    /// Label of the pin button for the panel's current state.
    pub fn panel_toggle_label(&self) -> &'static str {
        if self.panel_open {
            "Close Edit Sidebar"
        } else {
            "Open Edit Sidebar"
        }
    }

    /// Open one item's action menu; clicking the same item again closes it.
    pub fn toggle_menu(&mut self, id: &SectionId) {
        self.menu_open = match &self.menu_open {
            Some(open) if open == id => None,
            _ => Some(id.clone()),
        };
    }

    /// Pointer pressed outside any menu.
    pub fn close_menu(&mut self) {
        self.menu_open = None;
    }

    pub fn menu_open(&self) -> Option<&SectionId> {
        self.menu_open.as_ref()
    }

    /// Escape dismisses the topmost dialog, then the menu.
    pub fn escape(&mut self) -> bool {
        let now = Instant::now();
        if self.add_flow.modal_mut().escape(now) {
            return true;
        }
        if self.delete_confirm.take().is_some() {
            return true;
        }
        self.menu_open.take().is_some()
    }

    // ── Delete ──────────────────────────────────────────────────────────

    /// Ask for confirmation. Returns the prompt, or `None` if the section is
    /// no longer on the page.
    pub fn request_delete(&mut self, id: &SectionId) -> Option<String> {
        self.menu_open = None;
        let section = self.store.get(id)?;
        self.delete_confirm = Some(section.id);
        Some(delete_prompt(&section.title))
    }

    pub fn pending_delete(&self) -> Option<&SectionId> {
        self.delete_confirm.as_ref()
    }

    pub fn cancel_delete(&mut self) {
        self.delete_confirm = None;
    }

    /// Delete the section awaiting confirmation. `None` if nothing was pending.
    pub async fn confirm_delete(&mut self) -> Option<Result<(), StoreError>> {
        let id = self.delete_confirm.take()?;
        let result = self.store.remove(&id).await;
        match &result {
            Ok(()) => self.notify(Notice::success(DELETE_SUCCESS)),
            Err(error) => {
                warn!(section = %id, %error, "delete failed");
                self.notify(Notice::error(DELETE_FAILED));
            }
        }
        Some(result)
    }

    // ── Drag reordering ─────────────────────────────────────────────────

    pub fn drag(&self) -> &DragReorderController<SectionId> {
        &self.drag
    }

    pub fn pointer_down(&mut self, index: usize, at: Point) {
        if let Some(id) = self.section_at(index) {
            self.drag.pointer_down(index, id, at);
        }
    }

    pub fn pointer_move(&mut self, at: Point, rects: &[ItemRect]) -> Option<usize> {
        self.drag.pointer_move(at, rects)
    }

    pub fn drag_start(&mut self, index: usize) {
        self.menu_open = None;
        if let Some(id) = self.section_at(index) {
            self.drag.drag_start(index, id);
        }
    }

    fn section_at(&self, index: usize) -> Option<SectionId> {
        let id = self.store.ids().into_iter().nth(index);
        if id.is_none() {
            debug!(index, "no section to lift");
        }
        id
    }

    pub fn drag_cancel(&mut self) {
        self.drag.drag_cancel();
    }

    pub fn key_move(&mut self, direction: KeyDirection) -> Option<usize> {
        self.drag.key_move(direction, self.store.len())
    }

    /// Drop on an explicit target (`None`: outside the list).
    pub async fn drag_end(&mut self, over: Option<usize>) -> Option<Result<(), StoreError>> {
        let proposed = self.drag.drag_end(&self.store.ids(), over);
        self.commit_order(proposed).await
    }

    /// Release the pointer at the tracked target.
    pub async fn pointer_up(&mut self) -> Option<Result<(), StoreError>> {
        let proposed = self.drag.pointer_up(&self.store.ids());
        self.commit_order(proposed).await
    }

    /// Keyboard drop at the tracked target.
    pub async fn key_drop(&mut self) -> Option<Result<(), StoreError>> {
        let proposed = self.drag.finish(&self.store.ids());
        self.commit_order(proposed).await
    }

    async fn commit_order(
        &self,
        proposed: Option<Vec<SectionId>>,
    ) -> Option<Result<(), StoreError>> {
        let order = proposed?;
        let result = self.store.reorder(order).await;
        if let Err(error) = &result {
            warn!(%error, "reorder failed");
            self.notify(Notice::error(REORDER_FAILED));
        }
        Some(result)
    }

    // ── Add-block dialog ────────────────────────────────────────────────

    pub fn add_flow(&self) -> &AddBlockFlow {
        &self.add_flow
    }

    /// Open the dialog and fetch the catalog into it.
    pub async fn open_add_flow(&mut self) -> u64 {
        let epoch = self.add_flow.open();
        let result = self.catalog.fetch().await;
        if let Some(notice) = self.add_flow.apply_catalog(epoch, result) {
            self.notify(notice);
        }
        epoch
    }

    pub fn close_add_flow(&mut self) {
        self.add_flow.close();
    }

    pub fn toggle_block(&mut self, id: BlockId) -> bool {
        self.add_flow.toggle(id)
    }

    /// Attach the selection. `None` when validation stopped it locally.
    ///
    /// Whenever anything attached, the list reloads so new sections show up,
    /// even if the dialog stays open for a retry.
    pub async fn confirm_add(&mut self) -> Option<AddOutcome> {
        let epoch = self.add_flow.epoch();
        let ids = match self.add_flow.begin_confirm(self.store.page()) {
            Ok(ids) => ids,
            Err(rejected) => {
                debug!(%rejected, "add rejected before sending");
                self.notify(rejected.notice());
                return None;
            }
        };

        let outcome = match self.store.add(&ids).await {
            Ok(outcome) => outcome,
            Err(error) => {
                self.add_flow.abort_confirm(epoch);
                self.notify(Notice::error(error.to_string()));
                return None;
            }
        };

        self.notify(outcome_notice(&outcome));
        self.add_flow.finish_confirm(epoch, &outcome);
        if !outcome.succeeded().is_empty() {
            // Best effort: a failed reload is logged by `refresh` and the
            // list keeps its last state until the next load.
            if self.refresh().await.is_err() {
                debug!("list not refreshed after add");
            }
        }
        info!(added = outcome.succeeded().len(), total = outcome.total(), "add flow settled");
        Some(outcome)
    }

    // ── Editor ──────────────────────────────────────────────────────────

    pub fn editor(&self) -> &EditSession {
        &self.edit
    }

    pub fn open_editor(&mut self, id: SectionId) -> Result<Url, url::ParseError> {
        self.menu_open = None;
        self.edit.open(id)
    }

    pub async fn close_editor(&mut self) -> Option<Result<LoadOutcome, StoreError>> {
        self.edit.close(&self.store).await
    }
}

/// Confirmation text for deleting a section.
pub fn delete_prompt(title: &str) -> String {
    format!("Are you sure you want to delete \"{title}\"?")
}
