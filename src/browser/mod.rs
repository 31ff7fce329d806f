//! Browser-automation collaborator.
//!
//! Navigation, DOM inspection and result extraction happen in an external
//! browser service; this module only carries typed requests and responses
//! across that boundary. The browser drives a single controllable surface,
//! which is why callers bound their concurrency instead of hammering it.

mod client;
mod types;

pub use client::*;
pub use types::*;

use async_trait::async_trait;

use crate::error::BrowserResult;

/// Search execution and page fetching through the shared browser surface.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BrowserAutomation: Send + Sync {
    /// Issue a search, wait for the results page to settle, and extract
    /// result entries from the rendered page.
    async fn execute_search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> BrowserResult<Vec<RawSearchEntry>>;

    /// Navigate to a URL and return the rendered page content.
    async fn fetch_page(&self, url: &str) -> BrowserResult<PageSnapshot>;
}
