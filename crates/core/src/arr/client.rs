//! HTTP plumbing shared by the service clients.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::ServiceError;
use crate::metrics::{EXTERNAL_SERVICE_DURATION, EXTERNAL_SERVICE_REQUESTS};

/// Authenticated JSON GET client for one service instance.
pub(crate) struct ServiceHttp {
    client: Client,
    base_url: String,
    api_key: String,
    auth_header: &'static str,
    service: &'static str,
}

impl ServiceHttp {
    pub fn new(
        service: &'static str,
        auth_header: &'static str,
        url: &str,
        api_key: &str,
        timeout_secs: u32,
    ) -> Result<Self, ServiceError> {
        if api_key.is_empty() {
            return Err(ServiceError::NotConfigured(format!(
                "{} API key is required",
                service
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs as u64))
            .build()?;

        Ok(Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            auth_header,
            service,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path` and decode the JSON body, recording call metrics.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ServiceError> {
        let start = Instant::now();
        let result = self.send(path, query).await;

        EXTERNAL_SERVICE_DURATION
            .with_label_values(&[self.service, operation])
            .observe(start.elapsed().as_secs_f64());
        EXTERNAL_SERVICE_REQUESTS
            .with_label_values(&[
                self.service,
                operation,
                if result.is_ok() { "success" } else { "error" },
            ])
            .inc();

        result
    }

    async fn send<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ServiceError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(service = self.service, %url, "GET");

        let response = self
            .client
            .get(&url)
            .header(self.auth_header, &self.api_key)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == 401 {
            return Err(ServiceError::NotConfigured(format!(
                "Invalid {} API key",
                self.service
            )));
        }
        if status == 404 {
            return Err(ServiceError::NotFound(path.to_string()));
        }
        if status == 429 {
            return Err(ServiceError::RateLimitExceeded);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        response.json().await.map_err(|e| {
            ServiceError::ParseError(format!(
                "Failed to parse {} response for {}: {}",
                self.service, path, e
            ))
        })
    }
}
