use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use super::{domain_of, SearchResult, SubQuestion};
use crate::browser::{BrowserAutomation, SearchOptions};
use crate::error::{BrowserError, BrowserResult};

/// Default cap on in-flight searches. The browser collaborator is a shared,
/// effectively single-capacity surface; exceeding its real concurrency
/// produces cross-talk between navigations.
pub const DEFAULT_MAX_CONCURRENT: usize = 3;

/// Default number of results kept per query.
pub const DEFAULT_RESULTS_PER_QUERY: usize = 8;

/// Video/streaming domains whose pages carry no extractable factual text.
const EXCLUDED_DOMAINS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "vimeo.com",
    "tiktok.com",
    "twitch.tv",
    "dailymotion.com",
    "netflix.com",
    "spotify.com",
    "soundcloud.com",
];

/// Generic filler words a model likes to pad queries with.
const FILLER_WORDS: &[&str] = &[
    "comprehensive",
    "detailed",
    "ultimate",
    "complete",
    "definitive",
    "in-depth",
    "thorough",
];

/// Vocabulary that marks a query as time-sensitive.
const RECENCY_HINTS: &[&str] = &[
    "price", "prices", "pricing", "cost", "costs", "latest", "new", "newest", "current",
    "today", "now", "vs", "versus", "compare", "comparison", "news", "release", "update",
    "updated",
];

/// Outcome of one round of searches.
///
/// `unavailable` counts searches that failed because the bridge itself was
/// unreachable, as opposed to a navigation or extraction problem on one
/// query. The caller can tell "the browser is down" apart from "the
/// searches found nothing".
#[derive(Debug, Default)]
pub struct SearchRound {
    /// Sub-question id → its (possibly empty) result list.
    pub results: HashMap<String, Vec<SearchResult>>,
    /// Searches actually issued (not skipped by the deadline).
    pub attempted: usize,
    /// Of those, how many failed with the bridge unreachable.
    pub unavailable: usize,
}

/// Runs searches for a batch of sub-questions with bounded concurrency.
///
/// Sub-questions are chunked into fixed-size batches; batches run
/// sequentially, but all searches within a batch run concurrently and the
/// whole batch is awaited before the next one starts. A failed search
/// degrades to an empty result list for that sub-question.
pub struct ParallelSearcher {
    browser: Arc<dyn BrowserAutomation>,
    max_concurrent: usize,
    max_results_per_query: usize,
}

impl ParallelSearcher {
    /// Create a searcher with default bounds
    pub fn new(browser: Arc<dyn BrowserAutomation>) -> Self {
        Self {
            browser,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_results_per_query: DEFAULT_RESULTS_PER_QUERY,
        }
    }

    /// Override the in-flight search cap
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Override the per-query result cap
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results_per_query = max_results.max(1);
        self
    }

    /// Run searches for all sub-questions.
    ///
    /// Individual failures degrade to an empty result list for that
    /// sub-question. Batches started after `deadline` are skipped; entries
    /// for skipped sub-questions are absent rather than empty.
    pub async fn search_all(
        &self,
        sub_questions: &[SubQuestion],
        deadline: Option<Instant>,
    ) -> SearchRound {
        let mut round = SearchRound::default();

        for batch in sub_questions.chunks(self.max_concurrent) {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    warn!(
                        remaining = sub_questions.len() - round.results.len(),
                        "Deadline reached, skipping remaining search batches"
                    );
                    break;
                }
            }

            let mut handles = Vec::with_capacity(batch.len());
            for sub_question in batch {
                let browser = Arc::clone(&self.browser);
                let id = sub_question.id.clone();
                let query = sub_question.search_query.clone();
                let max_results = self.max_results_per_query;
                handles.push(tokio::spawn(async move {
                    let outcome = run_one_search(browser.as_ref(), &query, max_results).await;
                    (id, outcome)
                }));
            }

            // Await the entire batch before touching the shared map, so no
            // two concurrent tasks ever write the same key.
            for handle in handles {
                match handle.await {
                    Ok((id, outcome)) => {
                        round.attempted += 1;
                        let entries = match outcome {
                            Ok(entries) => entries,
                            Err(e) => {
                                if matches!(e, BrowserError::Unavailable { .. }) {
                                    round.unavailable += 1;
                                }
                                warn!(error = %e, "Search failed, treating as empty");
                                Vec::new()
                            }
                        };
                        round.results.insert(id, entries);
                    }
                    Err(e) => warn!(error = %e, "Search task panicked"),
                }
            }
        }

        round
    }
}

/// Execute one search against the bridge
async fn run_one_search(
    browser: &dyn BrowserAutomation,
    raw_query: &str,
    max_results: usize,
) -> BrowserResult<Vec<SearchResult>> {
    let query = sanitize_query(raw_query);
    let options = SearchOptions {
        max_results,
        recency_days: if is_time_sensitive(&query) {
            Some(365)
        } else {
            None
        },
    };

    let entries = browser.execute_search(&query, &options).await?;

    let results: Vec<SearchResult> = entries
        .into_iter()
        .filter(|entry| !is_excluded_domain(&entry.url))
        .take(max_results)
        .enumerate()
        .map(|(idx, entry)| SearchResult {
            url: entry.url,
            title: entry.title,
            snippet: entry.snippet,
            position: idx + 1,
            query: query.clone(),
        })
        .collect();

    debug!(query = %query, results = results.len(), "Search produced results");
    Ok(results)
}

/// Strip year references, "as of" phrasing and filler adjectives from a
/// model-generated query, so the model's out-of-date internal knowledge
/// cannot bias search results toward stale pages.
pub fn sanitize_query(query: &str) -> String {
    let tokens: Vec<&str> = query.split_whitespace().collect();
    let mut kept: Vec<&str> = Vec::with_capacity(tokens.len());
    let mut i = 0;

    while i < tokens.len() {
        let lower = tokens[i].to_lowercase();
        let bare = lower.trim_matches(|c: char| !c.is_alphanumeric());

        // Drop "as of <date...>" / "latest as of ..." phrasing entirely.
        if bare == "as" && tokens.get(i + 1).map(|t| t.to_lowercase()) == Some("of".to_string()) {
            i += 2;
            // Swallow the date tokens that follow.
            while i < tokens.len() && is_date_token(tokens[i]) {
                i += 1;
            }
            continue;
        }

        if is_year_token(bare) || FILLER_WORDS.contains(&bare) {
            i += 1;
            continue;
        }

        kept.push(tokens[i]);
        i += 1;
    }

    kept.join(" ")
}

/// Whether the query's vocabulary suggests time-sensitivity
pub fn is_time_sensitive(query: &str) -> bool {
    query
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .any(|t| RECENCY_HINTS.contains(&t.trim_matches(|c: char| !c.is_alphanumeric())))
}

/// Whether a result URL points at a known video/streaming domain
pub fn is_excluded_domain(url: &str) -> bool {
    let domain = domain_of(url);
    EXCLUDED_DOMAINS
        .iter()
        .any(|excluded| domain == *excluded || domain.ends_with(&format!(".{}", excluded)))
}

fn is_year_token(token: &str) -> bool {
    token.len() == 4
        && token.chars().all(|c| c.is_ascii_digit())
        && (token.starts_with("19") || token.starts_with("20"))
}

fn is_date_token(token: &str) -> bool {
    let bare = token
        .to_lowercase()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_string();
    const MONTHS: &[&str] = &[
        "january", "february", "march", "april", "may", "june", "july", "august",
        "september", "october", "november", "december",
    ];
    is_year_token(&bare) || MONTHS.contains(&bare.as_str()) || bare.chars().all(|c| c.is_ascii_digit())
}
