use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category of a sub-question, used to steer search and fact extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionCategory {
    Pricing,
    Features,
    Comparison,
    Facts,
    Opinions,
    News,
}

impl QuestionCategory {
    /// Get the category name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionCategory::Pricing => "pricing",
            QuestionCategory::Features => "features",
            QuestionCategory::Comparison => "comparison",
            QuestionCategory::Facts => "facts",
            QuestionCategory::Opinions => "opinions",
            QuestionCategory::News => "news",
        }
    }
}

impl std::str::FromStr for QuestionCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pricing" => Ok(QuestionCategory::Pricing),
            "features" => Ok(QuestionCategory::Features),
            "comparison" => Ok(QuestionCategory::Comparison),
            "facts" => Ok(QuestionCategory::Facts),
            "opinions" => Ok(QuestionCategory::Opinions),
            "news" => Ok(QuestionCategory::News),
            _ => Err(format!("Unknown question category: {}", s)),
        }
    }
}

/// Priority of a sub-question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(format!("Unknown priority: {}", s)),
        }
    }
}

/// One decomposed, independently searchable unit of the user's question.
///
/// Created once by the planner; immutable afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubQuestion {
    pub id: String,
    pub question: String,
    pub category: QuestionCategory,
    pub priority: Priority,
    /// Ready-to-run search query derived from the question.
    #[serde(rename = "searchQuery")]
    pub search_query: String,
}

impl SubQuestion {
    /// Create a new sub-question with a generated id
    pub fn new(
        question: impl Into<String>,
        category: QuestionCategory,
        priority: Priority,
        search_query: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            question: question.into(),
            category,
            priority,
            search_query: search_query.into(),
        }
    }
}

/// One search hit, tagged with its originating query and 1-based rank
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
    /// 1-based position on the results page.
    pub position: usize,
    /// The query string that produced this result.
    pub query: String,
}

/// A table lifted from a page, with the text around it for context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub context: String,
}

/// Structured representation of one fetched page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub url: String,
    pub title: String,
    pub domain: String,
    pub published: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    /// Main text of the primary content region, noise stripped.
    pub text: String,
    pub tables: Vec<TableData>,
    pub headings: Vec<String>,
    pub word_count: usize,
    pub fetched_at: DateTime<Utc>,
}

/// An atomic factual claim extracted from one page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedFact {
    pub claim: String,
    /// Scalar or short text value when the claim carries one.
    pub value: Option<String>,
    /// The sentence or fragment the claim was taken from.
    pub context: String,
    pub source_url: String,
    /// 0-100: how explicitly and unambiguously the page states the claim.
    pub confidence: u8,
    pub category: QuestionCategory,
}

/// Scores and extracted facts for one successfully analyzed page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEvaluation {
    pub url: String,
    pub domain: String,
    /// 0-100 estimate of the domain's trustworthiness.
    pub authority_score: u8,
    /// 0-100 estimate of how current the content is.
    pub recency_score: u8,
    /// 0-100 estimate of topical match with the sub-question.
    pub relevance_score: u8,
    /// Weighted combination of the three scores.
    pub overall_score: u8,
    pub facts: Vec<ExtractedFact>,
    pub content: ExtractedContent,
}

/// Citation pointing back at one contributing source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReference {
    pub url: String,
    pub domain: String,
    pub title: String,
    pub authority_score: u8,
    /// Short exact quote from the source's context.
    pub quote: String,
}

/// Discrete confidence label for a fact or a whole run.
///
/// Ordered low < medium < high so tiers can be compared directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    /// Get the tier name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceTier::High => "high",
            ConfidenceTier::Medium => "medium",
            ConfidenceTier::Low => "low",
        }
    }

    /// The next tier down, saturating at low
    pub fn downgraded(&self) -> Self {
        match self {
            ConfidenceTier::High => ConfidenceTier::Medium,
            ConfidenceTier::Medium | ConfidenceTier::Low => ConfidenceTier::Low,
        }
    }
}

impl std::fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A claim cluster verified across sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedFact {
    pub claim: String,
    pub value: Option<String>,
    /// Contributing sources, sorted by descending authority score.
    pub sources: Vec<SourceReference>,
    /// Number of distinct domains agreeing on the claim.
    pub agreement_count: usize,
    pub confidence: ConfidenceTier,
    /// Present when contributing sources reported different values.
    pub conflicting_values: Option<String>,
}

/// Importance of an unanswered or weakly-answered area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GapImportance {
    Critical,
    Important,
    NiceToHave,
}

/// A sub-question left unanswered or under-supported
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gap {
    pub sub_question_id: String,
    pub description: String,
    /// Query to run in a follow-up round to close this gap.
    pub suggested_query: String,
    pub importance: GapImportance,
}

/// Wall-clock accounting for one pipeline phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseStats {
    pub name: String,
    pub duration_ms: u64,
    pub items_processed: usize,
}

/// Run totals
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchStats {
    pub searches_run: usize,
    pub pages_analyzed: usize,
    pub facts_extracted: usize,
    pub facts_verified: usize,
    pub total_duration_ms: u64,
    pub phases: Vec<PhaseStats>,
}

/// The single output of one research run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResult {
    /// Final narrative answer with citations.
    pub response: String,
    /// Flattened, deduplicated citation list.
    pub sources: Vec<SourceReference>,
    pub facts: Vec<VerifiedFact>,
    /// Gaps still open after all follow-up rounds.
    pub gaps: Vec<Gap>,
    pub confidence: ConfidenceTier,
    pub follow_up_questions: Vec<String>,
    pub stats: ResearchStats,
}

/// Extract the registrable host part of a URL, without scheme or path.
///
/// Good enough for domain-reputation lookups and agreement counting; this
/// deliberately avoids a full URL parser.
pub fn domain_of(url: &str) -> String {
    let stripped = url
        .trim()
        .strip_prefix("https://")
        .or_else(|| url.trim().strip_prefix("http://"))
        .unwrap_or(url.trim());
    let host = stripped.split(['/', '?', '#']).next().unwrap_or("");
    let host = host.split('@').next_back().unwrap_or(host);
    let host = host.split(':').next().unwrap_or(host);
    host.trim_start_matches("www.").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip() {
        for s in ["pricing", "features", "comparison", "facts", "opinions", "news"] {
            let category: QuestionCategory = s.parse().unwrap();
            assert_eq!(category.as_str(), s);
        }
        assert!("invalid".parse::<QuestionCategory>().is_err());
    }

    #[test]
    fn test_priority_from_str() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("medium".parse::<Priority>().unwrap(), Priority::Medium);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_confidence_tier_ordering() {
        assert!(ConfidenceTier::High > ConfidenceTier::Medium);
        assert!(ConfidenceTier::Medium > ConfidenceTier::Low);
    }

    #[test]
    fn test_confidence_tier_downgrade_saturates() {
        assert_eq!(ConfidenceTier::High.downgraded(), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::Medium.downgraded(), ConfidenceTier::Low);
        assert_eq!(ConfidenceTier::Low.downgraded(), ConfidenceTier::Low);
    }

    #[test]
    fn test_sub_question_ids_are_unique() {
        let a = SubQuestion::new("q", QuestionCategory::Facts, Priority::High, "q");
        let b = SubQuestion::new("q", QuestionCategory::Facts, Priority::High, "q");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("https://www.example.com/path?x=1"), "example.com");
        assert_eq!(domain_of("http://docs.rust-lang.org/std/"), "docs.rust-lang.org");
        assert_eq!(domain_of("https://example.com:8080/x"), "example.com");
        assert_eq!(domain_of("example.com/page"), "example.com");
    }

    #[test]
    fn test_tier_serialization_is_lowercase() {
        assert_eq!(
            serde_json::to_string(&ConfidenceTier::High).unwrap(),
            "\"high\""
        );
        assert_eq!(
            serde_json::to_string(&GapImportance::NiceToHave).unwrap(),
            "\"nice-to-have\""
        );
    }
}
