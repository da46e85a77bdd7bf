//! Read-only access to the host's block catalog.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use ubr_types::BlockDefinition;

use crate::api::{ApiError, BlocksApi, bounded};

/// Fetch-and-list over `GET /blocks`. Nothing is cached between calls.
#[derive(Clone)]
pub struct RemoteBlockCatalog {
    api: Arc<dyn BlocksApi>,
    timeout: Duration,
}

impl RemoteBlockCatalog {
    pub fn new(api: Arc<dyn BlocksApi>, timeout: Duration) -> Self {
        Self { api, timeout }
    }

    pub async fn fetch(&self) -> Result<Vec<BlockDefinition>, ApiError> {
        match bounded(self.timeout, self.api.list_blocks()).await {
            Ok(blocks) => {
                debug!(count = blocks.len(), "fetched block catalog");
                Ok(blocks)
            }
            Err(error) => {
                warn!(%error, "failed to fetch block catalog");
                Err(error)
            }
        }
    }
}
