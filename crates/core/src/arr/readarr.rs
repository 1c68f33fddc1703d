//! Readarr v1 API client.
//!
//! Books are identified by Hardcover ID, which Readarr reports as the
//! `foreignBookId` when backed by a Hardcover metadata server.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::client::ServiceHttp;
use super::radarr::QueuePage;
use super::{InventoryItem, InventorySource, ServiceError, SourceInstance};
use crate::config::{ServiceInstance, ServiceType};
use crate::media::{ExternalIds, MediaType};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadarrBook {
    id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    foreign_book_id: String,
    #[serde(default)]
    monitored: bool,
    #[serde(default)]
    statistics: Option<ReadarrStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadarrStatistics {
    #[serde(default)]
    book_file_count: u32,
}

/// Readarr API client for one instance.
pub struct ReadarrClient {
    http: ServiceHttp,
    instance: SourceInstance,
}

impl ReadarrClient {
    pub fn new(config: &ServiceInstance) -> Result<Self, ServiceError> {
        let http = ServiceHttp::new(
            "readarr",
            "X-Api-Key",
            &config.url,
            &config.api_key,
            config.timeout_secs,
        )?;
        Ok(Self {
            http,
            instance: SourceInstance::from_service(ServiceType::Readarr, config),
        })
    }

    pub fn instance(&self) -> &SourceInstance {
        &self.instance
    }

    async fn queued_book_ids(&self) -> HashSet<i64> {
        let page: Result<QueuePage, _> = self
            .http
            .get_json("queue", "/api/v1/queue", &[("pageSize", "1000".to_string())])
            .await;
        match page {
            Ok(page) => page.records.iter().filter_map(|r| r.book_id).collect(),
            Err(e) => {
                warn!(instance = %self.instance.name, error = %e, "Failed to read Readarr queue");
                HashSet::new()
            }
        }
    }

    fn to_item(&self, book: ReadarrBook, queued: &HashSet<i64>) -> Option<InventoryItem> {
        let Ok(hardcover_id) = book.foreign_book_id.parse::<u32>() else {
            debug!(
                book_id = book.id,
                foreign_id = %book.foreign_book_id,
                "Skipping book without a Hardcover ID"
            );
            return None;
        };

        Some(InventoryItem {
            external_item_id: book.id,
            library_item_id: None,
            media_type: MediaType::Book,
            ids: ExternalIds::hardcover(hardcover_id),
            title: book.title,
            monitored: book.monitored,
            grabbed: queued.contains(&book.id),
            file_count: book.statistics.map(|s| s.book_file_count).unwrap_or(0),
            is_4k: self.instance.is_4k,
            seasons: Vec::new(),
        })
    }
}

#[async_trait]
impl InventorySource for ReadarrClient {
    fn instance(&self) -> &SourceInstance {
        &self.instance
    }

    async fn fetch_inventory(&self) -> Result<Vec<InventoryItem>, ServiceError> {
        let books: Vec<ReadarrBook> = self.http.get_json("books", "/api/v1/book", &[]).await?;
        let queued = self.queued_book_ids().await;

        Ok(books
            .into_iter()
            .filter_map(|b| self.to_item(b, &queued))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ReadarrClient {
        let config: ServiceInstance = toml::from_str(
            r#"
id = 1
name = "Readarr"
url = "http://localhost:8787"
api_key = "key"
"#,
        )
        .unwrap();
        ReadarrClient::new(&config).unwrap()
    }

    #[test]
    fn test_book_mapping() {
        let json = r#"[
            {"id": 4, "title": "Dune", "foreignBookId": "312", "monitored": true, "statistics": {"bookFileCount": 1}},
            {"id": 5, "title": "Unknown", "foreignBookId": "gr-abc", "monitored": true}
        ]"#;
        let books: Vec<ReadarrBook> = serde_json::from_str(json).unwrap();
        let client = client();
        let items: Vec<InventoryItem> = books
            .into_iter()
            .filter_map(|b| client.to_item(b, &HashSet::new()))
            .collect();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].ids.hardcover_id, Some(312));
        assert_eq!(items[0].media_type, MediaType::Book);
        assert!(items[0].has_file());
    }
}
