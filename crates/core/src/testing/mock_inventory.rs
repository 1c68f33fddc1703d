//! Mock inventory source for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::arr::{EpisodeInventory, InventoryItem, InventorySource, ServiceError, SourceInstance};

/// Mock implementation of [`InventorySource`].
///
/// Serves configured items and episode lists, counts listing calls and can
/// fail the next call with a given error.
///
/// # Example
///
/// ```rust,ignore
/// use requestarr_core::testing::{fixtures, MockInventorySource};
///
/// let source = MockInventorySource::new(fixtures::source(1, "radarr", false));
/// source.add_item(fixtures::movie_item(10, 603, 1)).await;
///
/// let items = source.fetch_inventory().await?;
/// assert_eq!(items.len(), 1);
/// assert_eq!(source.fetch_count().await, 1);
/// ```
pub struct MockInventorySource {
    instance: SourceInstance,
    items: Arc<RwLock<Vec<InventoryItem>>>,
    /// Episode lists keyed by external item ID.
    episodes: Arc<RwLock<HashMap<i64, Vec<EpisodeInventory>>>>,
    /// If set, the next call fails with this error.
    next_error: Arc<RwLock<Option<ServiceError>>>,
    fetch_count: Arc<RwLock<usize>>,
}

impl MockInventorySource {
    pub fn new(instance: SourceInstance) -> Self {
        Self {
            instance,
            items: Arc::new(RwLock::new(Vec::new())),
            episodes: Arc::new(RwLock::new(HashMap::new())),
            next_error: Arc::new(RwLock::new(None)),
            fetch_count: Arc::new(RwLock::new(0)),
        }
    }

    pub async fn add_item(&self, item: InventoryItem) {
        self.items.write().await.push(item);
    }

    /// Replace the listed items.
    pub async fn set_items(&self, items: Vec<InventoryItem>) {
        *self.items.write().await = items;
    }

    pub async fn set_episodes(&self, external_item_id: i64, episodes: Vec<EpisodeInventory>) {
        self.episodes
            .write()
            .await
            .insert(external_item_id, episodes);
    }

    pub async fn set_next_error(&self, error: ServiceError) {
        *self.next_error.write().await = Some(error);
    }

    /// Number of inventory listings served.
    pub async fn fetch_count(&self) -> usize {
        *self.fetch_count.read().await
    }
}

#[async_trait]
impl InventorySource for MockInventorySource {
    fn instance(&self) -> &SourceInstance {
        &self.instance
    }

    async fn fetch_inventory(&self) -> Result<Vec<InventoryItem>, ServiceError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        *self.fetch_count.write().await += 1;
        Ok(self.items.read().await.clone())
    }

    async fn fetch_episodes(
        &self,
        item: &InventoryItem,
    ) -> Result<Vec<EpisodeInventory>, ServiceError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        Ok(self
            .episodes
            .read()
            .await
            .get(&item.external_item_id)
            .cloned()
            .unwrap_or_default())
    }
}
