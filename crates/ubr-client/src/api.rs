//! The REST surface the client consumes, as a trait.
//!
//! [`BlocksApi`] is the seam between the sync logic and the wire. The store,
//! catalog, and sidebar only ever hold an `Arc<dyn BlocksApi>`, so the same
//! code runs against the real host ([`HttpApi`](crate::HttpApi)) or the
//! in-memory host ([`MemoryApi`](crate::MemoryApi)).

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use ubr_types::{AddToPageResponse, BlockDefinition, BlockId, PageBlockRecord, PageId, SectionId};

/// Errors from a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Connection refused, reset, DNS failure, and friends.
    #[error("transport error: {0}")]
    Transport(String),
    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// The body was not the JSON we expected.
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid request URL: {0}")]
    Url(String),
}

impl ApiError {
    /// HTTP status, when the server got far enough to send one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Remote operations of the page-blocks REST API.
///
/// Every implementation attaches the anti-forgery token it was configured
/// with; an empty token is still sent.
#[async_trait]
pub trait BlocksApi: Send + Sync {
    /// `GET /blocks`
    async fn list_blocks(&self) -> Result<Vec<BlockDefinition>, ApiError>;

    /// `POST /blocks/add-to-page/{page}` with `{block_id}`.
    async fn add_block_to_page(
        &self,
        page: PageId,
        block: &BlockId,
    ) -> Result<AddToPageResponse, ApiError>;

    /// `POST /page-blocks/{page}` with `{}`.
    async fn page_blocks(&self, page: PageId) -> Result<Vec<PageBlockRecord>, ApiError>;

    /// `DELETE /page-blocks-delete/{section}`
    async fn delete_page_block(&self, section: &SectionId) -> Result<(), ApiError>;

    /// `POST /page-blocks-reorder/{page}` with `{block_order}`.
    async fn reorder_page_blocks(&self, page: PageId, order: &[SectionId]) -> Result<(), ApiError>;
}

/// Run a remote call with an upper bound on how long it may take.
pub async fn bounded<T, F>(timeout: Duration, call: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(ApiError::Timeout(timeout)),
    }
}
