//! In-memory host implementing [`BlocksApi`].
//!
//! Behaves like the builder plugin's REST API closely enough to drive the
//! whole client offline: a catalog, per-page section lists with server-side
//! ranks, and id assignment on attach. On top of that it can misbehave on
//! demand, which is what the sync tests need:
//!
//! - **Faults** make an operation (or one catalog block) fail with HTTP 500
//!   without touching server state.
//! - **Gates** hold responses "in transit" after the server has already
//!   applied (or read) state, until the test releases them one by one.
//! - Every call is recorded as a `Begin`/`End` pair in arrival order. The
//!   log keeps the most recent [`EVENT_LOG_LIMIT`] events.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use ubr_types::{
    AddToPageResponse, BlockDefinition, BlockId, PageBlockRecord, PageId, SectionId,
};

use crate::api::{ApiError, BlocksApi};

/// Kinds of remote operation, for faults, gates, and log filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    ListBlocks,
    AddBlock,
    PageBlocks,
    DeleteBlock,
    Reorder,
}

/// A recorded remote call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    ListBlocks,
    AddBlock { page: PageId, block: BlockId },
    PageBlocks { page: PageId },
    DeleteBlock { section: SectionId },
    Reorder { page: PageId, order: Vec<SectionId> },
}

impl Request {
    pub fn op(&self) -> Op {
        match self {
            Request::ListBlocks => Op::ListBlocks,
            Request::AddBlock { .. } => Op::AddBlock,
            Request::PageBlocks { .. } => Op::PageBlocks,
            Request::DeleteBlock { .. } => Op::DeleteBlock,
            Request::Reorder { .. } => Op::Reorder,
        }
    }
}

/// Request lifecycle as the host saw it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiEvent {
    Begin(Request),
    End { request: Request, ok: bool },
}

#[derive(Clone, Copy, Debug)]
enum Fault {
    Always,
    Times(usize),
}

#[derive(Default)]
struct HostState {
    catalog: Vec<BlockDefinition>,
    /// Records in insertion order; `order` carries the rank.
    pages: HashMap<PageId, Vec<PageBlockRecord>>,
    next_section: u64,
    op_faults: HashMap<Op, Fault>,
    block_faults: HashSet<BlockId>,
    events: EventLog,
}

/// Events kept by default before the oldest are dropped.
pub const EVENT_LOG_LIMIT: usize = 4096;

/// Call log, oldest first, holding at most `limit` entries.
struct EventLog {
    entries: VecDeque<ApiEvent>,
    limit: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
            limit: EVENT_LOG_LIMIT,
        }
    }
}

impl EventLog {
    fn push(&mut self, event: ApiEvent) {
        self.entries.push_back(event);
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }

    fn iter(&self) -> impl Iterator<Item = &ApiEvent> {
        self.entries.iter()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

impl HostState {
    /// Consume one injected fault for `op`, if any is armed.
    fn take_fault(&mut self, op: Op) -> bool {
        match self.op_faults.get_mut(&op) {
            Some(Fault::Always) => true,
            Some(Fault::Times(n)) if *n > 0 => {
                *n -= 1;
                if *n == 0 {
                    self.op_faults.remove(&op);
                }
                true
            }
            _ => false,
        }
    }

    fn attach(&mut self, page: PageId, block: &BlockId) -> Result<AddToPageResponse, ApiError> {
        if !page.is_set() {
            return Err(bad_request("invalid page id"));
        }
        if self.block_faults.contains(block) {
            return Err(injected());
        }
        let def = self
            .catalog
            .iter()
            .find(|b| &b.id == block)
            .cloned()
            .ok_or_else(|| not_found(format!("block {block} not found")))?;

        self.next_section += 1;
        let records = self.pages.entry(page).or_default();
        let order = records.iter().filter_map(|r| r.order).max().map_or(0, |o| o + 1);
        records.push(PageBlockRecord {
            id: SectionId::from(self.next_section),
            name: def.name.clone(),
            description: def.description.clone(),
            image: def.image.clone(),
            order: Some(order),
        });
        Ok(AddToPageResponse {
            message: Some(format!("{} added to page", def.name)),
        })
    }

    fn delete(&mut self, section: &SectionId) -> Result<(), ApiError> {
        for records in self.pages.values_mut() {
            if let Some(pos) = records.iter().position(|r| &r.id == section) {
                records.remove(pos);
                return Ok(());
            }
        }
        Err(not_found(format!("section {section} not found")))
    }

    fn reorder(&mut self, page: PageId, order: &[SectionId]) -> Result<(), ApiError> {
        let records = self
            .pages
            .get_mut(&page)
            .ok_or_else(|| not_found(format!("page {page} not found")))?;

        let current: HashSet<&SectionId> = records.iter().map(|r| &r.id).collect();
        let proposed: HashSet<&SectionId> = order.iter().collect();
        if order.len() != records.len() || proposed.len() != order.len() || current != proposed {
            return Err(bad_request("block_order must list every section exactly once"));
        }

        for record in records.iter_mut() {
            record.order = order.iter().position(|id| id == &record.id).map(|i| i as i64);
        }
        Ok(())
    }
}

fn injected() -> ApiError {
    ApiError::Status {
        status: 500,
        body: "injected failure".to_string(),
    }
}

fn not_found(msg: String) -> ApiError {
    ApiError::Status { status: 404, body: msg }
}

fn bad_request(msg: &str) -> ApiError {
    ApiError::Status {
        status: 400,
        body: msg.to_string(),
    }
}

/// In-memory stand-in for the host CMS.
#[derive(Default)]
pub struct MemoryApi {
    state: Mutex<HostState>,
    gates: Mutex<HashMap<Op, Arc<Semaphore>>>,
    /// Token this client sends, and the token the host insists on (if any).
    sent_token: String,
    required_token: Option<String>,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(self, blocks: Vec<BlockDefinition>) -> Self {
        self.state.lock().catalog = blocks;
        self
    }

    /// Token attached to every call, as an HTTP client would from config.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.sent_token = token.into();
        self
    }

    /// Keep at most `limit` events in the call log.
    pub fn with_event_limit(self, limit: usize) -> Self {
        self.state.lock().events.limit = limit;
        self
    }

    /// Make the host reject mutating calls whose token does not match.
    pub fn require_token(mut self, token: impl Into<String>) -> Self {
        self.required_token = Some(token.into());
        self
    }

    /// Put sections on a page, replacing whatever was there.
    pub fn seed_page(&self, page: PageId, records: Vec<PageBlockRecord>) {
        let mut state = self.state.lock();
        let highest = records.iter().filter_map(|r| r.id.as_number()).max().unwrap_or(0);
        state.next_section = state.next_section.max(highest);
        state.pages.insert(page, records);
    }

    /// A small site for offline use: four catalog blocks, three sections on page 42.
    pub fn demo() -> Self {
        let catalog = vec![
            BlockDefinition {
                description: Some("Full-width banner with headline and call to action".into()),
                ..BlockDefinition::new("3", "Hero")
            },
            BlockDefinition {
                description: Some("Three-column feature highlights".into()),
                ..BlockDefinition::new("4", "Feature Grid")
            },
            BlockDefinition::new("6", "Testimonials"),
            BlockDefinition::new("8", "Footer"),
        ];
        let api = Self::new().with_catalog(catalog);
        api.seed_page(
            PageId::new(42),
            vec![
                record(5, "Hero", 2),
                record(9, "Footer", 3),
                record(7, "Feature Grid", 1),
            ],
        );
        api
    }

    // ── Fault injection ─────────────────────────────────────────────────

    /// Fail every call of `op` until healed.
    pub fn fail(&self, op: Op) {
        self.state.lock().op_faults.insert(op, Fault::Always);
    }

    /// Fail the next `times` calls of `op`.
    pub fn fail_times(&self, op: Op, times: usize) {
        self.state.lock().op_faults.insert(op, Fault::Times(times));
    }

    /// Fail attach requests for one catalog block.
    pub fn fail_block(&self, block: impl Into<BlockId>) {
        self.state.lock().block_faults.insert(block.into());
    }

    pub fn heal(&self, op: Op) {
        self.state.lock().op_faults.remove(&op);
    }

    pub fn heal_all(&self) {
        let mut state = self.state.lock();
        state.op_faults.clear();
        state.block_faults.clear();
    }

    // ── Gates ───────────────────────────────────────────────────────────

    /// Hold every response of `op` until released.
    pub fn gate(&self, op: Op) {
        self.gates.lock().insert(op, Arc::new(Semaphore::new(0)));
    }

    /// Let `n` held (or future) responses of `op` through, oldest first.
    pub fn release(&self, op: Op, n: usize) {
        if let Some(gate) = self.gates.lock().get(&op) {
            gate.add_permits(n);
        }
    }

    /// Remove the gate for `op`, letting everything through.
    pub fn open_gate(&self, op: Op) {
        if let Some(gate) = self.gates.lock().remove(&op) {
            gate.close();
        }
    }

    async fn pass_gate(&self, op: Op) {
        let gate = self.gates.lock().get(&op).cloned();
        if let Some(gate) = gate {
            // A closed gate means "open": acquire errors and we pass.
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }

    // ── Inspection ──────────────────────────────────────────────────────

    pub fn events(&self) -> Vec<ApiEvent> {
        self.state.lock().events.iter().cloned().collect()
    }

    /// Calls in arrival order.
    pub fn requests(&self) -> Vec<Request> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                ApiEvent::Begin(r) => Some(r.clone()),
                ApiEvent::End { .. } => None,
            })
            .collect()
    }

    pub fn requests_for(&self, op: Op) -> Vec<Request> {
        self.requests().into_iter().filter(|r| r.op() == op).collect()
    }

    /// Number of `op` calls that have started.
    pub fn begun(&self, op: Op) -> usize {
        self.requests_for(op).len()
    }

    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }

    /// Server truth for a page, sorted by rank the way a fresh load would be.
    pub fn page(&self, page: PageId) -> Vec<PageBlockRecord> {
        let mut records = self.state.lock().pages.get(&page).cloned().unwrap_or_default();
        records.sort_by_key(|r| r.order.unwrap_or(0));
        records
    }

    pub fn page_ids(&self, page: PageId) -> Vec<SectionId> {
        self.page(page).into_iter().map(|r| r.id).collect()
    }

    /// Change a section's title behind the client's back, as the embedded
    /// editor would.
    pub fn rename_section(&self, section: &SectionId, name: impl Into<String>) -> bool {
        let name = name.into();
        let mut state = self.state.lock();
        for records in state.pages.values_mut() {
            if let Some(record) = records.iter_mut().find(|r| &r.id == section) {
                record.name = name;
                return true;
            }
        }
        false
    }

    // ── Dispatch ────────────────────────────────────────────────────────

    async fn call<T, F>(&self, request: Request, apply: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut HostState) -> Result<T, ApiError> + Send,
        T: Send,
    {
        let op = request.op();
        let result = {
            let mut state = self.state.lock();
            state.events.push(ApiEvent::Begin(request.clone()));
            if let Some(err) = self.token_rejection(op) {
                Err(err)
            } else if state.take_fault(op) {
                Err(injected())
            } else {
                apply(&mut state)
            }
        };

        self.pass_gate(op).await;

        self.state.lock().events.push(ApiEvent::End {
            request,
            ok: result.is_ok(),
        });
        result
    }

    fn token_rejection(&self, op: Op) -> Option<ApiError> {
        let required = self.required_token.as_ref()?;
        let mutating = !matches!(op, Op::ListBlocks);
        (mutating && required != &self.sent_token).then(|| ApiError::Status {
            status: 403,
            body: "rest_cookie_invalid_nonce".to_string(),
        })
    }
}

fn record(id: u64, name: &str, order: i64) -> PageBlockRecord {
    PageBlockRecord {
        id: SectionId::from(id),
        name: name.to_string(),
        description: None,
        image: None,
        order: Some(order),
    }
}

#[async_trait]
impl BlocksApi for MemoryApi {
    async fn list_blocks(&self) -> Result<Vec<BlockDefinition>, ApiError> {
        self.call(Request::ListBlocks, |state| Ok(state.catalog.clone()))
            .await
    }

    async fn add_block_to_page(
        &self,
        page: PageId,
        block: &BlockId,
    ) -> Result<AddToPageResponse, ApiError> {
        let request = Request::AddBlock {
            page,
            block: block.clone(),
        };
        self.call(request, |state| state.attach(page, block)).await
    }

    async fn page_blocks(&self, page: PageId) -> Result<Vec<PageBlockRecord>, ApiError> {
        self.call(Request::PageBlocks { page }, |state| {
            Ok(state.pages.get(&page).cloned().unwrap_or_default())
        })
        .await
    }

    async fn delete_page_block(&self, section: &SectionId) -> Result<(), ApiError> {
        let request = Request::DeleteBlock {
            section: section.clone(),
        };
        self.call(request, |state| state.delete(section)).await
    }

    async fn reorder_page_blocks(&self, page: PageId, order: &[SectionId]) -> Result<(), ApiError> {
        let request = Request::Reorder {
            page,
            order: order.to_vec(),
        };
        self.call(request, |state| state.reorder(page, order)).await
    }
}
