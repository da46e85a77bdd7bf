//! Ordered list of a page's sections, kept in step with the host.
//!
//! # Sync protocol
//!
//! - `load` replaces the sequence with a fresh fetch, stably sorted by rank.
//! - `remove` / `reorder` apply locally first, then persist. A failure is
//!   repaired by refetching, never by undoing the local change by hand.
//! - `add` only talks to the host; the caller reloads afterwards.
//!
//! # Sequencing
//!
//! Responses can come back in any order, so every load and mutation takes a
//! ticket from a monotonic counter and the store counts mutations in flight:
//!
//! ```text
//! load(ticket t) completes
//!   t older than an applied load        -> Superseded
//!   a mutation is still in flight       -> Superseded, mark dirty
//!   a mutation began or settled since t -> refetch (bounded attempts)
//!   otherwise                           -> apply, Loaded
//!
//! mutation settles
//!   failed                              -> mark dirty
//!   dirty and nothing else in flight    -> corrective load
//! ```
//!
//! The net effect: once the last overlapping mutation settles, exactly one
//! reconciliation runs against the final server state.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use ubr_types::{BlockId, PageId, Section, SectionId, section_ids, sections_from_records};

use crate::api::{ApiError, BlocksApi, bounded};
use crate::config::ClientConfig;
use crate::constants::MAX_LOAD_ATTEMPTS;

/// Errors from store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("no blocks selected")]
    EmptySelection,
    #[error("page id not provided")]
    MissingPage,
    #[error("new order is not a permutation of the current sections")]
    NotAPermutation,
    #[error("unknown section {0}")]
    UnknownSection(SectionId),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result of a [`PageSectionStore::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The fetched list replaced the local sequence.
    Loaded { count: usize },
    /// A newer operation owns the sequence; the response was dropped.
    Superseded,
    /// No page configured. Nothing was requested.
    Inert,
}

/// One block that could not be attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddFailure {
    pub block_id: BlockId,
    pub error: ApiError,
}

/// Aggregate result of [`PageSectionStore::add`], in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Success { added: Vec<BlockId> },
    PartialFailure { succeeded: Vec<BlockId>, failed: Vec<AddFailure> },
    TotalFailure { failed: Vec<AddFailure> },
}

impl AddOutcome {
    fn from_results(succeeded: Vec<BlockId>, failed: Vec<AddFailure>) -> Self {
        match (succeeded.is_empty(), failed.is_empty()) {
            (_, true) => AddOutcome::Success { added: succeeded },
            (true, false) => AddOutcome::TotalFailure { failed },
            (false, false) => AddOutcome::PartialFailure { succeeded, failed },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AddOutcome::Success { .. })
    }

    pub fn succeeded(&self) -> &[BlockId] {
        match self {
            AddOutcome::Success { added } => added,
            AddOutcome::PartialFailure { succeeded, .. } => succeeded,
            AddOutcome::TotalFailure { .. } => &[],
        }
    }

    pub fn failed(&self) -> &[AddFailure] {
        match self {
            AddOutcome::Success { .. } => &[],
            AddOutcome::PartialFailure { failed, .. } | AddOutcome::TotalFailure { failed } => {
                failed
            }
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded().len() + self.failed().len()
    }

    /// User-facing summary. Counts only; failed ids are not named.
    pub fn summary(&self) -> String {
        match self {
            AddOutcome::Success { added } => {
                format!("Added {} block(s) successfully!", added.len())
            }
            _ => format!(
                "Added {}/{} blocks. Some failed.",
                self.succeeded().len(),
                self.total()
            ),
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    sections: Vec<Section>,
    version: u64,
    next_ticket: u64,
    /// Ticket of the newest remove/reorder.
    last_mutation: u64,
    /// Ticket of the load whose result is currently shown.
    applied_load: u64,
    in_flight: usize,
    /// A mutation failed (or a load was dropped) and nobody has refetched yet.
    needs_resync: bool,
}

impl StoreState {
    fn take_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    fn begin_mutation(&mut self) {
        self.last_mutation = self.take_ticket();
        self.in_flight += 1;
    }

    /// Returns true when the caller should run the corrective load.
    fn settle_mutation(&mut self, failed: bool) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        if failed {
            self.needs_resync = true;
        }
        self.needs_resync && self.in_flight == 0
    }
}

enum LoadDecision {
    Retry,
    Drop,
}

/// The page's sections, owned exclusively by this store.
///
/// Cheap to share behind an `Arc`; the state mutex is never held across an
/// await, so operations may overlap freely.
pub struct PageSectionStore {
    api: Arc<dyn BlocksApi>,
    page: PageId,
    timeout: Duration,
    state: Mutex<StoreState>,
    changes: watch::Sender<u64>,
}

impl PageSectionStore {
    pub fn new(api: Arc<dyn BlocksApi>, config: &ClientConfig) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            api,
            page: config.page_id,
            timeout: config.request_timeout(),
            state: Mutex::new(StoreState::default()),
            changes,
        }
    }

    pub fn page(&self) -> PageId {
        self.page
    }

    pub fn sections(&self) -> Vec<Section> {
        self.state.lock().sections.clone()
    }

    pub fn ids(&self) -> Vec<SectionId> {
        section_ids(&self.state.lock().sections)
    }

    pub fn get(&self, id: &SectionId) -> Option<Section> {
        self.state.lock().sections.iter().find(|s| &s.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().sections.is_empty()
    }

    /// Bumped on every local change.
    pub fn version(&self) -> u64 {
        self.state.lock().version
    }

    /// Watch the version counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// True while a remove or reorder is waiting on the host.
    pub fn is_syncing(&self) -> bool {
        self.state.lock().in_flight > 0
    }

    /// True when local state is known to diverge and a reload is owed.
    pub fn needs_resync(&self) -> bool {
        self.state.lock().needs_resync
    }

    fn bump(&self, state: &mut StoreState) {
        state.version += 1;
        self.changes.send_replace(state.version);
    }

    async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, ApiError>>,
    ) -> Result<T, ApiError> {
        bounded(self.timeout, fut).await
    }

    /// Replace the sequence with the host's current list.
    ///
    /// On failure the sequence is left as it was.
    pub async fn load(&self) -> Result<LoadOutcome, StoreError> {
        let Some(page) = self.page.checked() else {
            debug!("no page configured, load skipped");
            return Ok(LoadOutcome::Inert);
        };

        for attempt in 1..=MAX_LOAD_ATTEMPTS {
            let (ticket, clean) = {
                let mut state = self.state.lock();
                (state.take_ticket(), state.in_flight == 0)
            };

            let records = self.call(self.api.page_blocks(page)).await.inspect_err(|e| {
                warn!(%page, error = %e, "failed to load page sections");
            })?;

            let decision = {
                let mut state = self.state.lock();
                if ticket < state.applied_load {
                    LoadDecision::Drop
                } else if state.in_flight > 0 {
                    // The mutation that settles last will reload.
                    state.needs_resync = true;
                    LoadDecision::Drop
                } else if ticket < state.last_mutation || !clean {
                    LoadDecision::Retry
                } else {
                    let sections = sections_from_records(records);
                    let count = sections.len();
                    state.sections = sections;
                    state.applied_load = ticket;
                    state.needs_resync = false;
                    self.bump(&mut state);
                    info!(%page, count, "loaded page sections");
                    return Ok(LoadOutcome::Loaded { count });
                }
            };

            match decision {
                LoadDecision::Drop => {
                    debug!(%page, ticket, "load superseded");
                    return Ok(LoadOutcome::Superseded);
                }
                LoadDecision::Retry => {
                    debug!(%page, ticket, attempt, "mutation raced load, refetching")
                }
            }
        }

        warn!(%page, attempts = MAX_LOAD_ATTEMPTS, "load kept racing mutations, giving up");
        Ok(LoadOutcome::Superseded)
    }

    /// Attach catalog blocks to the page, one request at a time.
    ///
    /// The local sequence is not touched; reload to see the new sections.
    pub async fn add(&self, block_ids: &[BlockId]) -> Result<AddOutcome, StoreError> {
        if block_ids.is_empty() {
            return Err(StoreError::EmptySelection);
        }
        let page = self.page.checked().ok_or(StoreError::MissingPage)?;

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for block_id in block_ids {
            match self.call(self.api.add_block_to_page(page, block_id)).await {
                Ok(_) => {
                    debug!(%page, block = %block_id, "block attached");
                    succeeded.push(block_id.clone());
                }
                Err(error) => {
                    warn!(%page, block = %block_id, %error, "failed to attach block");
                    failed.push(AddFailure {
                        block_id: block_id.clone(),
                        error,
                    });
                }
            }
        }

        let outcome = AddOutcome::from_results(succeeded, failed);
        info!(%page, added = outcome.succeeded().len(), total = outcome.total(), "add finished");
        Ok(outcome)
    }

    /// Drop a section locally, then delete it on the host.
    pub async fn remove(&self, id: &SectionId) -> Result<(), StoreError> {
        {
            let mut state = self.state.lock();
            let pos = state
                .sections
                .iter()
                .position(|s| &s.id == id)
                .ok_or_else(|| StoreError::UnknownSection(id.clone()))?;
            state.sections.remove(pos);
            state.begin_mutation();
            self.bump(&mut state);
        }
        info!(section = %id, "removing section");
        self.persist(self.api.delete_page_block(id)).await
    }

    /// Show `order` immediately, then persist it as the page's block order.
    pub async fn reorder(&self, order: Vec<SectionId>) -> Result<(), StoreError> {
        let page = self.page.checked().ok_or(StoreError::MissingPage)?;
        {
            let mut state = self.state.lock();
            if !is_permutation(&state.sections, &order) {
                return Err(StoreError::NotAPermutation);
            }
            let mut remaining = std::mem::take(&mut state.sections);
            let mut reordered = Vec::with_capacity(remaining.len());
            for id in &order {
                if let Some(pos) = remaining.iter().position(|s| &s.id == id) {
                    reordered.push(remaining.swap_remove(pos));
                }
            }
            state.sections = reordered;
            state.begin_mutation();
            self.bump(&mut state);
        }
        info!(%page, order = ?order, "reordering sections");
        self.persist(self.api.reorder_page_blocks(page, &order)).await
    }

    /// Await a mutation's remote call and reconcile if needed.
    async fn persist(
        &self,
        call: impl Future<Output = Result<(), ApiError>>,
    ) -> Result<(), StoreError> {
        let guard = InFlight { store: self, settled: false };
        let result = self.call(call).await;
        let resync = guard.settle(result.is_err());

        if let Err(error) = &result {
            warn!(%error, "mutation failed, local order is stale");
        }
        if resync {
            match self.load().await {
                Ok(outcome) => debug!(?outcome, "corrective reload"),
                Err(error) => warn!(%error, "corrective reload failed"),
            }
        }
        result.map_err(StoreError::from)
    }
}

/// Keeps the in-flight count honest if a mutation future is dropped
/// before its response arrives.
struct InFlight<'a> {
    store: &'a PageSectionStore,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, failed: bool) -> bool {
        self.settled = true;
        self.store.state.lock().settle_mutation(failed)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            // Outcome unknown: treat like a failure.
            self.store.state.lock().settle_mutation(true);
            debug!("mutation abandoned before its response");
        }
    }
}

fn is_permutation(current: &[Section], proposed: &[SectionId]) -> bool {
    if current.len() != proposed.len() {
        return false;
    }
    let mut a = section_ids(current);
    let mut b = proposed.to_vec();
    a.sort();
    b.sort();
    a == b
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use ubr_types::PageBlockRecord;

    use super::*;
    use crate::memory::{MemoryApi, Op, Request};

    fn page() -> PageId {
        PageId::new(42)
    }

    fn record(id: u64, name: &str, order: Option<i64>) -> PageBlockRecord {
        PageBlockRecord {
            id: SectionId::from(id),
            name: name.to_string(),
            description: None,
            image: None,
            order,
        }
    }

    fn ids(raw: &[&str]) -> Vec<SectionId> {
        raw.iter().map(|s| SectionId::from(*s)).collect()
    }

    fn setup() -> (Arc<MemoryApi>, PageSectionStore) {
        let api = Arc::new(MemoryApi::demo());
        let store = PageSectionStore::new(api.clone(), &ClientConfig::new("http://cms.test", page()));
        (api, store)
    }

    #[tokio::test]
    async fn test_load_sorts_by_rank() {
        let (_api, store) = setup();
        assert_eq!(store.load().await.unwrap(), LoadOutcome::Loaded { count: 3 });
        assert_eq!(store.ids(), ids(&["7", "5", "9"]));
        assert_eq!(store.get(&SectionId::from("7")).unwrap().kind, "feature-grid");
    }

    #[tokio::test]
    async fn test_load_keeps_server_order_for_equal_ranks() {
        let (api, store) = setup();
        api.seed_page(
            page(),
            vec![record(5, "A", Some(2)), record(9, "B", None), record(3, "C", Some(2))],
        );
        store.load().await.unwrap();
        assert_eq!(store.ids(), ids(&["9", "5", "3"]));
    }

    #[tokio::test]
    async fn test_unset_page_is_inert() {
        let api = Arc::new(MemoryApi::demo());
        let store = PageSectionStore::new(api.clone(), &ClientConfig::new("http://cms.test", PageId::UNSET));
        assert_eq!(store.load().await.unwrap(), LoadOutcome::Inert);
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn test_failed_load_leaves_sequence() {
        let (api, store) = setup();
        store.load().await.unwrap();
        let before = store.version();

        api.fail(Op::PageBlocks);
        assert!(matches!(store.load().await, Err(StoreError::Api(_))));
        assert_eq!(store.ids(), ids(&["7", "5", "9"]));
        assert_eq!(store.version(), before);
    }

    #[tokio::test]
    async fn test_add_validates_before_network() {
        let (api, store) = setup();
        assert_eq!(store.add(&[]).await, Err(StoreError::EmptySelection));

        let inert = PageSectionStore::new(api.clone(), &ClientConfig::default());
        assert_eq!(
            inert.add(&[BlockId::from("3")]).await,
            Err(StoreError::MissingPage)
        );
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn test_add_reports_partial_failure_in_input_order() {
        let (api, store) = setup();
        api.fail_block("4");

        let outcome = store
            .add(&[BlockId::from("3"), BlockId::from("4"), BlockId::from("6")])
            .await
            .unwrap();

        assert_eq!(outcome.succeeded(), &[BlockId::from("3"), BlockId::from("6")]);
        assert_eq!(outcome.failed().len(), 1);
        assert_eq!(outcome.failed()[0].block_id, BlockId::from("4"));
        assert_eq!(outcome.summary(), "Added 2/3 blocks. Some failed.");
        // The local sequence waits for an explicit reload.
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_add_total_failure() {
        let (api, store) = setup();
        api.fail(Op::AddBlock);
        let outcome = store.add(&[BlockId::from("3")]).await.unwrap();
        assert!(matches!(outcome, AddOutcome::TotalFailure { .. }));
        assert_eq!(outcome.summary(), "Added 0/1 blocks. Some failed.");
    }

    #[tokio::test]
    async fn test_add_success_summary() {
        let (_api, store) = setup();
        let outcome = store.add(&[BlockId::from("3"), BlockId::from("8")]).await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.summary(), "Added 2 block(s) successfully!");
    }

    #[tokio::test]
    async fn test_reorder_rejects_non_permutation() {
        let (api, store) = setup();
        store.load().await.unwrap();
        api.clear_events();
        let version = store.version();

        for bad in [ids(&["7", "5"]), ids(&["7", "5", "5"]), ids(&["7", "5", "1"])] {
            assert_eq!(store.reorder(bad).await, Err(StoreError::NotAPermutation));
        }
        assert_eq!(store.ids(), ids(&["7", "5", "9"]));
        assert_eq!(store.version(), version);
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn test_reorder_persists_sequence() {
        let (api, store) = setup();
        store.load().await.unwrap();

        store.reorder(ids(&["9", "7", "5"])).await.unwrap();
        assert_eq!(store.ids(), ids(&["9", "7", "5"]));
        assert_eq!(api.page_ids(page()), ids(&["9", "7", "5"]));
        assert!(!store.is_syncing());
    }

    #[tokio::test]
    async fn test_remove_unknown_section() {
        let (api, store) = setup();
        store.load().await.unwrap();
        api.clear_events();

        assert_eq!(
            store.remove(&SectionId::from("404")).await,
            Err(StoreError::UnknownSection(SectionId::from("404")))
        );
        assert!(api.requests().is_empty());
    }

    #[tokio::test]
    async fn test_failed_remove_reloads_from_host() {
        let (api, store) = setup();
        store.load().await.unwrap();
        api.fail_times(Op::DeleteBlock, 1);
        api.clear_events();

        let err = store.remove(&SectionId::from("9")).await.unwrap_err();
        assert_eq!(err, StoreError::Api(ApiError::Status {
            status: 500,
            body: "injected failure".into(),
        }));
        assert_eq!(store.ids(), ids(&["7", "5", "9"]));
        assert_eq!(
            api.requests(),
            vec![
                Request::DeleteBlock { section: SectionId::from("9") },
                Request::PageBlocks { page: page() },
            ]
        );
    }

    #[tokio::test]
    async fn test_subscribers_see_version_bumps() {
        let (_api, store) = setup();
        let mut rx = store.subscribe();
        store.load().await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), store.version());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_mutation_marks_store_dirty() {
        let (api, store) = setup();
        store.load().await.unwrap();
        api.gate(Op::DeleteBlock);

        let abandoned =
            tokio::time::timeout(Duration::from_millis(10), store.remove(&SectionId::from("5")))
                .await;
        assert!(abandoned.is_err());
        assert!(!store.is_syncing());
        assert!(store.needs_resync());

        api.open_gate(Op::DeleteBlock);
        store.load().await.unwrap();
        assert!(!store.needs_resync());
        assert_eq!(store.ids(), ids(&["7", "9"]));
    }
}
