//! Page-section sync client for the Unicorn Builder REST API.
//!
//! Keeps a page's ordered list of sections in step with the host CMS:
//! optimistic local edits, remote persistence, and reconciliation by
//! refetch when the host disagrees. Also carries the interaction state the
//! editor sidebar needs around that list (drag reordering, the add-block
//! dialog, the editor hand-off) as plain, UI-agnostic controllers.
//!
//! The host is reached through the [`BlocksApi`] trait: [`HttpApi`] talks to
//! a real site, [`MemoryApi`] keeps everything in process.

pub mod api;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod edit;
pub mod http;
pub mod memory;
pub mod modal;
pub mod notify;
pub mod picker;
pub mod reorder;
pub mod sidebar;
pub mod store;

pub use api::{ApiError, BlocksApi, bounded};
pub use catalog::RemoteBlockCatalog;
pub use config::{ClientConfig, ConfigError};
pub use edit::EditSession;
pub use http::HttpApi;
pub use memory::{ApiEvent, EVENT_LOG_LIMIT, MemoryApi, Op, Request};
pub use modal::{ModalLifecycle, next_focus};
pub use notify::{LogNotifier, Notice, NoticeLevel, NoticeQueue, Notifier};
pub use picker::{AddBlockFlow, CatalogState, ConfirmError, SelectionPicker, outcome_notice};
pub use reorder::{DragReorderController, ItemRect, KeyDirection, Point, closest_center, move_item};
pub use sidebar::{Sidebar, delete_prompt};
pub use store::{AddFailure, AddOutcome, LoadOutcome, PageSectionStore, StoreError};
