use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::types::{PageSnapshot, RawSearchEntry, SearchOptions};
use super::BrowserAutomation;
use crate::config::{BrowserConfig, RequestConfig};
use crate::error::{BrowserError, BrowserResult};

/// HTTP client for the external browser-automation service.
///
/// The service owns the actual browser (navigation, settling, extraction
/// scripts, the debugging channel); this client only speaks its small
/// request/response protocol.
#[derive(Clone)]
pub struct BrowserBridgeClient {
    client: Client,
    base_url: String,
    timeout_ms: u64,
}

#[derive(Debug, Serialize)]
struct SearchCall<'a> {
    query: &'a str,
    options: &'a SearchOptions,
}

#[derive(Debug, Deserialize)]
struct SearchReply {
    #[serde(default)]
    results: Vec<RawSearchEntry>,
}

#[derive(Debug, Serialize)]
struct PageCall<'a> {
    url: &'a str,
}

impl BrowserBridgeClient {
    /// Create a new bridge client
    pub fn new(config: &BrowserConfig, request_config: &RequestConfig) -> BrowserResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(BrowserError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_ms: request_config.timeout_ms,
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_send_error(&self, e: reqwest::Error) -> BrowserError {
        if e.is_timeout() {
            BrowserError::Timeout {
                timeout_ms: self.timeout_ms,
            }
        } else if e.is_connect() {
            BrowserError::Unavailable {
                message: e.to_string(),
            }
        } else {
            BrowserError::Http(e)
        }
    }
}

#[async_trait::async_trait]
impl BrowserAutomation for BrowserBridgeClient {
    async fn execute_search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> BrowserResult<Vec<RawSearchEntry>> {
        let url = format!("{}/v1/search", self.base_url);
        debug!(query = %query, "Executing browser search");

        let response = self
            .client
            .post(&url)
            .json(&SearchCall { query, options })
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(BrowserError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let reply: SearchReply =
            response
                .json()
                .await
                .map_err(|e| BrowserError::Extraction {
                    message: format!("Failed to parse search results: {}", e),
                })?;

        info!(query = %query, results = reply.results.len(), "Search completed");
        Ok(reply.results)
    }

    async fn fetch_page(&self, page_url: &str) -> BrowserResult<PageSnapshot> {
        let url = format!("{}/v1/page", self.base_url);
        debug!(url = %page_url, "Fetching rendered page");

        let response = self
            .client
            .post(&url)
            .json(&PageCall { url: page_url })
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(BrowserError::Navigation {
                url: page_url.to_string(),
                message: format!("{} - {}", status.as_u16(), error_body),
            });
        }

        let snapshot: PageSnapshot =
            response
                .json()
                .await
                .map_err(|e| BrowserError::Extraction {
                    message: format!("Failed to parse page snapshot: {}", e),
                })?;

        Ok(snapshot)
    }
}
