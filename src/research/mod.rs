//! The research pipeline.
//!
//! Phases, in data-flow order:
//! - [`QuestionPlanner`]: prompt decomposition into sub-questions
//! - [`ParallelSearcher`]: batched, bounded-concurrency search execution
//! - [`PageAnalyzer`]: rendered page → structured content
//! - [`SourceEvaluator`]: authority/recency/relevance scoring + fact extraction
//! - [`CrossReferencer`]: fact grouping and confidence tiers
//! - [`GapAnalyzer`]: unanswered sub-question detection
//! - [`ResponseSynthesizer`]: cited narrative answer
//! - [`ResearchEngine`]: phase orchestration under one deadline
//!
//! Partial failure is the default expectation at every stage: an empty
//! collection, not an error, is the signal that a search or fetch produced
//! nothing.

mod analyzer;
mod crossref;
mod engine;
mod evaluator;
mod gaps;
mod planner;
mod report;
mod searcher;
mod synthesizer;
mod types;

pub use analyzer::*;
pub use crossref::*;
pub use engine::*;
pub use evaluator::*;
pub use gaps::*;
pub use planner::*;
pub use report::*;
pub use searcher::*;
pub use synthesizer::*;
pub use types::*;

/// Extract JSON from a completion string, handling markdown code blocks.
///
/// Attempts extraction in this order:
/// 1. Try parsing as raw JSON first (fast path)
/// 2. Extract from ```json ... ``` code blocks
/// 3. Extract from ``` ... ``` code blocks
/// 4. Return error if none work
pub(crate) fn extract_json_from_completion(completion: &str) -> Result<&str, String> {
    // Fast path: raw JSON
    let trimmed = completion.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok(trimmed);
    }

    // Try ```json ... ``` blocks
    if completion.contains("```json") {
        return completion
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Found ```json block but content was empty or malformed".to_string());
    }

    // Try ``` ... ``` blocks
    if completion.contains("```") {
        return completion
            .split("```")
            .nth(1)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Found ``` block but content was empty or malformed".to_string());
    }

    Err(format!(
        "No JSON found in response. First 100 chars: '{}'",
        completion.chars().take(100).collect::<String>()
    ))
}
