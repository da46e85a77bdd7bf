//! Shared data types for the Unicorn Builder page-blocks client.
//!
//! A pure leaf crate: identifiers, page sections, catalog blocks, the host's
//! startup data, and the exact JSON shapes of the REST API. No I/O.
//!
//! |----------------------|-------------------------------------------------|
//! | Type                 | Purpose                                         |
//! |----------------------|-------------------------------------------------|
//! | [`PageId`]           | Which page (0 = none)                           |
//! | [`SectionId`]        | Which block instance on a page (opaque token)   |
//! | [`BlockId`]          | Which catalog block (opaque token)              |
//! | [`Section`]          | Block instance with title, slug, server rank    |
//! | [`BlockDefinition`]  | Catalog entry available for insertion           |
//! | [`HostData`]         | `{currentPageId, nonce}` injected by the host   |
//! |----------------------|-------------------------------------------------|

pub mod block;
pub mod host;
pub mod ids;
pub mod section;
pub mod wire;

pub use block::BlockDefinition;
pub use host::HostData;
pub use ids::{BlockId, PageId, SectionId};
pub use section::{Section, section_ids, sections_from_records, slugify};
pub use wire::{AddToPageRequest, AddToPageResponse, EmptyBody, PageBlockRecord, ReorderRequest};
