use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, warn};

use super::{domain_of, ExtractedContent, SearchResult, TableData};
use crate::browser::{BrowserAutomation, PageRegion, PageSnapshot};

/// Below this word count a page is treated as likely not-yet-rendered and
/// fetched once more after a short wait.
const MIN_PLAUSIBLE_WORDS: usize = 80;

/// Wait before the single re-fetch of a thin page.
const RETRY_WAIT_MS: u64 = 750;

/// Container selectors that usually hold the primary content, in preference
/// order. The full body is the fallback.
const PRIMARY_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role=main]",
    "#main-content",
    ".article-body",
    ".post-content",
    ".entry-content",
    "#content",
    ".content",
];

/// Lines containing these markers are navigation/ads/consent noise.
const NOISE_MARKERS: &[&str] = &[
    "cookie",
    "accept all",
    "subscribe",
    "newsletter",
    "sign in",
    "sign up",
    "log in",
    "advertisement",
    "sponsored",
    "share this",
    "related articles",
];

/// Fetches result URLs and turns rendered pages into [`ExtractedContent`].
///
/// Fetch failures produce no content for that URL and never abort the run.
pub struct PageAnalyzer {
    browser: Arc<dyn BrowserAutomation>,
    retry_wait_ms: u64,
}

impl PageAnalyzer {
    /// Create a new analyzer
    pub fn new(browser: Arc<dyn BrowserAutomation>) -> Self {
        Self {
            browser,
            retry_wait_ms: RETRY_WAIT_MS,
        }
    }

    /// Shorten the thin-page retry wait (for tests)
    pub fn with_retry_wait_ms(mut self, retry_wait_ms: u64) -> Self {
        self.retry_wait_ms = retry_wait_ms;
        self
    }

    /// Fetch one result URL and extract structured content.
    ///
    /// A page with an implausibly low word count is fetched once more after
    /// a short wait before being accepted as final.
    pub async fn analyze(&self, result: &SearchResult) -> Option<ExtractedContent> {
        let snapshot = match self.browser.fetch_page(&result.url).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(url = %result.url, error = %e, "Page fetch failed, skipping");
                return None;
            }
        };

        let mut content = snapshot_to_content(snapshot, &result.title);

        if content.word_count < MIN_PLAUSIBLE_WORDS {
            debug!(
                url = %result.url,
                words = content.word_count,
                "Thin page, retrying once after wait"
            );
            tokio::time::sleep(std::time::Duration::from_millis(self.retry_wait_ms)).await;

            match self.browser.fetch_page(&result.url).await {
                Ok(snapshot) => {
                    let retried = snapshot_to_content(snapshot, &result.title);
                    if retried.word_count > content.word_count {
                        content = retried;
                    }
                }
                Err(e) => {
                    debug!(url = %result.url, error = %e, "Retry fetch failed, keeping first pass");
                }
            }
        }

        debug!(
            url = %content.url,
            words = content.word_count,
            tables = content.tables.len(),
            "Page analyzed"
        );
        Some(content)
    }
}

/// Turn a raw snapshot into structured content
fn snapshot_to_content(snapshot: PageSnapshot, fallback_title: &str) -> ExtractedContent {
    let text = pick_primary_region(&snapshot.regions)
        .map(|region| strip_noise(&region.text))
        .unwrap_or_default();
    let word_count = text.split_whitespace().count();

    ExtractedContent {
        domain: domain_of(&snapshot.url),
        title: snapshot
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| fallback_title.to_string()),
        published: snapshot.published.as_deref().and_then(parse_page_date),
        modified: snapshot.modified.as_deref().and_then(parse_page_date),
        tables: snapshot
            .tables
            .into_iter()
            .map(|t| TableData {
                headers: t.headers,
                rows: t.rows,
                context: t.context,
            })
            .collect(),
        headings: snapshot.headings,
        url: snapshot.url,
        text,
        word_count,
        fetched_at: Utc::now(),
    }
}

/// Pick the region most likely to hold the article body: preferred
/// containers first, then the longest body-level region as fallback.
fn pick_primary_region(regions: &[PageRegion]) -> Option<&PageRegion> {
    for selector in PRIMARY_SELECTORS {
        if let Some(region) = regions
            .iter()
            .find(|r| r.selector.eq_ignore_ascii_case(selector) && !r.text.trim().is_empty())
        {
            return Some(region);
        }
    }
    regions
        .iter()
        .filter(|r| !r.text.trim().is_empty())
        .max_by_key(|r| r.text.len())
}

/// Drop navigation/ads/consent lines and collapse blank runs
fn strip_noise(text: &str) -> String {
    let kept: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            let lower = line.to_lowercase();
            !NOISE_MARKERS.iter().any(|marker| lower.contains(marker))
        })
        .collect();
    kept.join("\n")
}

/// Parse page metadata dates: RFC 3339 first, then bare `YYYY-MM-DD`
fn parse_page_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value.trim()) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}
