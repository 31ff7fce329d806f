use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{extract_json_from_completion, ExtractedContent, ExtractedFact, SourceEvaluation, SubQuestion};
use crate::llm::{CompletionClient, CompletionRequest, Message};
use crate::prompts::FACT_EXTRACTION_PROMPT;

/// Authority and relevance carry more weight than recency: not all queries
/// are time-sensitive.
const WEIGHT_AUTHORITY: f64 = 0.4;
const WEIGHT_RELEVANCE: f64 = 0.4;
const WEIGHT_RECENCY: f64 = 0.2;

/// Neutral recency score for undated pages.
const RECENCY_NEUTRAL: u8 = 60;

/// Character cap on page text sent to the fact extractor.
const FACT_EXTRACTION_TEXT_CAP: usize = 6000;

/// Domain reputation table. Official, government and major-reference
/// domains score highest; suffix rules catch the rest.
const DOMAIN_AUTHORITY: &[(&str, u8)] = &[
    ("wikipedia.org", 90),
    ("nature.com", 92),
    ("arxiv.org", 85),
    ("reuters.com", 88),
    ("apnews.com", 88),
    ("bbc.com", 85),
    ("github.com", 85),
    ("stackoverflow.com", 82),
    ("nytimes.com", 80),
    ("theguardian.com", 78),
    ("techcrunch.com", 70),
    ("medium.com", 50),
    ("reddit.com", 45),
    ("quora.com", 40),
];

/// Scores a fetched page and extracts its atomic factual claims.
pub struct SourceEvaluator {
    llm: Arc<dyn CompletionClient>,
    model: String,
}

/// Shape the fact-extraction prompt asks the model to produce
#[derive(Debug, Deserialize)]
struct RawFact {
    claim: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    category: Option<String>,
}

impl SourceEvaluator {
    /// Create a new evaluator
    pub fn new(llm: Arc<dyn CompletionClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// Score a page against its originating sub-question and extract facts.
    ///
    /// A fact-extraction failure degrades to an empty fact list; the page's
    /// scores are still returned so it can participate in conflict
    /// detection.
    pub async fn evaluate(
        &self,
        content: ExtractedContent,
        sub_question: &SubQuestion,
    ) -> SourceEvaluation {
        let authority = authority_score(&content.domain);
        let recency = recency_score(content.published, content.modified, Utc::now());
        let relevance = relevance_score(&content, &sub_question.question);
        let overall = combine_scores(authority, recency, relevance);

        let facts = self.extract_facts(&content, sub_question).await;

        debug!(
            url = %content.url,
            authority,
            recency,
            relevance,
            overall,
            facts = facts.len(),
            "Source evaluated"
        );

        SourceEvaluation {
            url: content.url.clone(),
            domain: content.domain.clone(),
            authority_score: authority,
            recency_score: recency,
            relevance_score: relevance,
            overall_score: overall,
            facts,
            content,
        }
    }

    async fn extract_facts(
        &self,
        content: &ExtractedContent,
        sub_question: &SubQuestion,
    ) -> Vec<ExtractedFact> {
        let page_text = truncate_at_boundary(&content.text, FACT_EXTRACTION_TEXT_CAP);

        let request = CompletionRequest::new(
            &self.model,
            vec![
                Message::system(FACT_EXTRACTION_PROMPT),
                Message::user(format!(
                    "Research question: {}\n\nPage ({}):\n{}",
                    sub_question.question, content.url, page_text
                )),
            ],
        )
        .with_max_tokens(1500)
        .with_temperature(0.2);

        let completion = match self.llm.complete(request).await {
            Ok(response) => response.content,
            Err(e) => {
                warn!(url = %content.url, error = %e, "Fact extraction failed, keeping zero facts");
                return Vec::new();
            }
        };

        let json = match extract_json_from_completion(&completion) {
            Ok(json) => json,
            Err(e) => {
                warn!(url = %content.url, error = %e, "Fact extraction output unparseable");
                return Vec::new();
            }
        };

        let raw: Vec<RawFact> = match serde_json::from_str(json) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(url = %content.url, error = %e, "Fact extraction JSON malformed");
                return Vec::new();
            }
        };

        raw.into_iter()
            .filter(|f| !f.claim.trim().is_empty())
            .map(|f| ExtractedFact {
                claim: f.claim,
                value: f.value.filter(|v| !v.trim().is_empty()),
                context: f.context.unwrap_or_default(),
                source_url: content.url.clone(),
                confidence: f
                    .confidence
                    .map(|c| c.clamp(0.0, 100.0).round() as u8)
                    .unwrap_or(50),
                category: f
                    .category
                    .as_deref()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(sub_question.category),
            })
            .collect()
    }
}

/// 0-100 estimate of a domain's trustworthiness
pub fn authority_score(domain: &str) -> u8 {
    let domain = domain.to_lowercase();

    if domain.ends_with(".gov") || domain.ends_with(".edu") || domain.contains(".gov.") {
        return 95;
    }

    for (known, score) in DOMAIN_AUTHORITY {
        if domain == *known || domain.ends_with(&format!(".{}", known)) {
            return *score;
        }
    }

    if domain.ends_with(".org") {
        return 70;
    }

    55
}

/// 0-100 estimate of how current a page is, from its publish/modified
/// dates. Undated pages score the neutral mid value, not zero.
pub fn recency_score(
    published: Option<DateTime<Utc>>,
    modified: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> u8 {
    let best = match (published, modified) {
        (Some(p), Some(m)) => Some(p.max(m)),
        (Some(p), None) => Some(p),
        (None, Some(m)) => Some(m),
        (None, None) => None,
    };

    let Some(date) = best else {
        return RECENCY_NEUTRAL;
    };

    let days = (now - date).num_days();
    match days {
        d if d < 0 => RECENCY_NEUTRAL, // clock skew or bogus metadata
        0..=30 => 95,
        31..=90 => 85,
        91..=365 => 70,
        366..=730 => 50,
        _ => 30,
    }
}

/// 0-100 estimate of topical overlap between the page and the question
pub fn relevance_score(content: &ExtractedContent, question: &str) -> u8 {
    let keywords: Vec<String> = question
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 3)
        .map(str::to_string)
        .collect();

    if keywords.is_empty() {
        return 50;
    }

    let text = content.text.to_lowercase();
    let title = content.title.to_lowercase();
    let headings = content.headings.join(" ").to_lowercase();

    let matched = keywords.iter().filter(|k| text.contains(*k)).count();
    let mut score = (matched as f64 / keywords.len() as f64) * 80.0;

    if keywords.iter().any(|k| title.contains(k)) {
        score += 12.0;
    }
    if keywords.iter().any(|k| headings.contains(k)) {
        score += 8.0;
    }

    score.clamp(0.0, 100.0).round() as u8
}

/// Cut `text` to at most `max_bytes`, stepping back to the nearest char
/// boundary so multibyte text never splits mid-character.
fn truncate_at_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut cut = max_bytes;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    &text[..cut]
}

fn combine_scores(authority: u8, recency: u8, relevance: u8) -> u8 {
    (authority as f64 * WEIGHT_AUTHORITY
        + relevance as f64 * WEIGHT_RELEVANCE
        + recency as f64 * WEIGHT_RECENCY)
        .round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::{CompletionResponse, MockCompletionClient};
    use crate::research::{Priority, QuestionCategory};
    use chrono::Duration;

    fn content(domain: &str, text: &str) -> ExtractedContent {
        ExtractedContent {
            url: format!("https://{}/page", domain),
            title: "Widget pricing overview".to_string(),
            domain: domain.to_string(),
            published: None,
            modified: None,
            text: text.to_string(),
            tables: vec![],
            headings: vec!["Pricing".to_string()],
            word_count: text.split_whitespace().count(),
            fetched_at: Utc::now(),
        }
    }

    fn question(text: &str) -> SubQuestion {
        SubQuestion::new(text, QuestionCategory::Pricing, Priority::High, text)
    }

    #[test]
    fn test_authority_official_domains_highest() {
        assert_eq!(authority_score("nasa.gov"), 95);
        assert_eq!(authority_score("mit.edu"), 95);
        assert_eq!(authority_score("data.gov.uk"), 95);
        assert_eq!(authority_score("wikipedia.org"), 90);
        assert_eq!(authority_score("en.wikipedia.org"), 90);
    }

    #[test]
    fn test_authority_default_and_suffix() {
        assert_eq!(authority_score("some-blog.example.com"), 55);
        assert_eq!(authority_score("mozilla.org"), 70);
        assert_eq!(authority_score("reddit.com"), 45);
    }

    #[test]
    fn test_recency_neutral_when_undated() {
        let now = Utc::now();
        assert_eq!(recency_score(None, None, now), RECENCY_NEUTRAL);
    }

    #[test]
    fn test_recency_buckets() {
        let now = Utc::now();
        assert_eq!(recency_score(Some(now - Duration::days(10)), None, now), 95);
        assert_eq!(recency_score(Some(now - Duration::days(60)), None, now), 85);
        assert_eq!(recency_score(Some(now - Duration::days(200)), None, now), 70);
        assert_eq!(recency_score(Some(now - Duration::days(700)), None, now), 50);
        assert_eq!(recency_score(Some(now - Duration::days(2000)), None, now), 30);
    }

    #[test]
    fn test_recency_uses_most_recent_date() {
        let now = Utc::now();
        let old = now - Duration::days(2000);
        let fresh = now - Duration::days(5);
        assert_eq!(recency_score(Some(old), Some(fresh), now), 95);
    }

    #[test]
    fn test_relevance_rewards_keyword_overlap() {
        let page = content(
            "example.com",
            "The widget pricing page lists every plan with monthly costs.",
        );
        let high = relevance_score(&page, "What is the widget pricing plan?");

        let off_topic = content("example.com", "A treatise on medieval falconry.");
        let low = relevance_score(&off_topic, "What is the widget pricing plan?");

        assert!(high > low);
        assert!(high >= 80, "expected strong match, got {}", high);
    }

    #[test]
    fn test_combine_weights_favor_authority_and_relevance() {
        // authority 100, relevance 100, recency 0 → 80
        assert_eq!(combine_scores(100, 0, 100), 80);
        // authority 0, relevance 0, recency 100 → 20
        assert_eq!(combine_scores(0, 100, 0), 20);
    }

    #[test]
    fn test_truncate_at_boundary_respects_multibyte() {
        // "é" is two bytes; an odd cap lands mid-character
        let text = "é".repeat(10);
        let cut = truncate_at_boundary(&text, 7);
        assert_eq!(cut, "é".repeat(3));

        let short = "abc";
        assert_eq!(truncate_at_boundary(short, 100), "abc");
        assert_eq!(truncate_at_boundary("abcdef", 4), "abcd");
    }

    #[tokio::test]
    async fn test_evaluate_survives_multibyte_page_text() {
        let mut llm = MockCompletionClient::new();
        llm.expect_complete().returning(|_| {
            Ok(CompletionResponse {
                content: "[]".to_string(),
                model: None,
                usage: None,
            })
        });

        // One leading ASCII byte puts every later "é" off boundary at the cap.
        let text = format!("a{}", "é".repeat(FACT_EXTRACTION_TEXT_CAP));
        let evaluator = SourceEvaluator::new(Arc::new(llm), "test-model");
        let eval = evaluator
            .evaluate(content("example.com", &text), &question("widget pricing"))
            .await;
        assert!(eval.facts.is_empty());
        assert!(eval.overall_score > 0);
    }

    #[tokio::test]
    async fn test_evaluate_extracts_facts() {
        let mut llm = MockCompletionClient::new();
        llm.expect_complete().returning(|_| {
            Ok(CompletionResponse {
                content: r#"[
                    {"claim": "The Pro plan costs $10 per month", "value": "$10/month", "context": "Pro is $10/mo", "confidence": 90, "category": "pricing"},
                    {"claim": "", "confidence": 80},
                    {"claim": "Widgets ship with an API", "confidence": 150}
                ]"#
                .to_string(),
                model: None,
                usage: None,
            })
        });

        let evaluator = SourceEvaluator::new(Arc::new(llm), "test-model");
        let eval = evaluator
            .evaluate(content("example.com", "Pro is $10/mo"), &question("widget pricing"))
            .await;

        // Empty claim dropped, confidence clamped to 100
        assert_eq!(eval.facts.len(), 2);
        assert_eq!(eval.facts[0].value.as_deref(), Some("$10/month"));
        assert_eq!(eval.facts[0].confidence, 90);
        assert_eq!(eval.facts[1].confidence, 100);
        assert_eq!(eval.facts[0].source_url, "https://example.com/page");
    }

    #[tokio::test]
    async fn test_evaluate_keeps_scores_when_extraction_fails() {
        let mut llm = MockCompletionClient::new();
        llm.expect_complete().returning(|_| {
            Err(LlmError::Timeout { timeout_ms: 1000 })
        });

        let evaluator = SourceEvaluator::new(Arc::new(llm), "test-model");
        let eval = evaluator
            .evaluate(content("wikipedia.org", "text"), &question("widget pricing"))
            .await;

        assert!(eval.facts.is_empty());
        assert_eq!(eval.authority_score, 90);
        assert!(eval.overall_score > 0);
    }

    #[tokio::test]
    async fn test_fact_category_defaults_to_sub_question() {
        let mut llm = MockCompletionClient::new();
        llm.expect_complete().returning(|_| {
            Ok(CompletionResponse {
                content: r#"[{"claim": "some claim"}]"#.to_string(),
                model: None,
                usage: None,
            })
        });

        let evaluator = SourceEvaluator::new(Arc::new(llm), "test-model");
        let eval = evaluator
            .evaluate(content("example.com", "text"), &question("widget pricing"))
            .await;
        assert_eq!(eval.facts[0].category, QuestionCategory::Pricing);
        assert_eq!(eval.facts[0].confidence, 50);
    }
}
