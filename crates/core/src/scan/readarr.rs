//! Readarr scanner.

use std::sync::Arc;

use async_trait::async_trait;

use super::session::Scanner;
use super::sync::MediaSyncer;
use super::types::{ItemResult, ScanError};
use crate::arr::{InventoryItem, InventorySource};
use crate::reconcile::TransitionGuard;

/// Reconciles books listed by every Readarr instance.
pub struct ReadarrScanner {
    syncer: MediaSyncer,
    sources: Vec<Arc<dyn InventorySource>>,
}

impl ReadarrScanner {
    pub fn new(syncer: MediaSyncer, sources: Vec<Arc<dyn InventorySource>>) -> Self {
        Self { syncer, sources }
    }
}

#[async_trait]
impl Scanner for ReadarrScanner {
    fn name(&self) -> &'static str {
        "readarr"
    }

    fn sources(&self) -> Vec<Arc<dyn InventorySource>> {
        self.sources.clone()
    }

    async fn process_item(
        &self,
        source: &dyn InventorySource,
        item: &InventoryItem,
        guard: &dyn TransitionGuard,
    ) -> Result<ItemResult, ScanError> {
        self.syncer
            .sync_download_item(source.instance(), item, guard)
            .await
    }
}
