use serde::{Deserialize, Serialize};

/// Options for one search call
#[derive(Debug, Clone, Serialize)]
pub struct SearchOptions {
    /// Maximum entries to extract from the results page.
    #[serde(rename = "maxResults")]
    pub max_results: usize,
    /// Restrict results to pages newer than this many days, when the
    /// query vocabulary suggests time-sensitivity.
    #[serde(rename = "recencyDays", skip_serializing_if = "Option::is_none")]
    pub recency_days: Option<u32>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 8,
            recency_days: None,
        }
    }
}

/// One entry extracted from a rendered search results page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSearchEntry {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

/// Rendered page content returned by the browser bridge.
///
/// The bridge runs its extraction script in the page and reports text per
/// container it found, plus structural elements. Which region counts as
/// primary content is decided on this side, in the page analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub title: Option<String>,
    #[serde(default)]
    pub regions: Vec<PageRegion>,
    #[serde(default)]
    pub tables: Vec<RawTable>,
    #[serde(default)]
    pub headings: Vec<String>,
    /// Publish date as reported by page metadata, if any.
    pub published: Option<String>,
    /// Last-modified date as reported by page metadata, if any.
    pub modified: Option<String>,
}

/// Text of one content container, labeled by the selector that matched it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRegion {
    pub selector: String,
    pub text: String,
}

/// A table lifted from the page with its surrounding text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTable {
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
    #[serde(default)]
    pub context: String,
}
