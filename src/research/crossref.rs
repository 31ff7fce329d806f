use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::{ConfidenceTier, ExtractedFact, SourceEvaluation, SourceReference, VerifiedFact};
use crate::config::DeepResearchConfig;

/// References with authority at or above this are "official".
const OFFICIAL_AUTHORITY: u8 = 90;

/// Character cap on the exact quote carried by a citation.
const QUOTE_CAP: usize = 150;

/// Groups extracted facts across sources and assigns confidence tiers.
///
/// Grouping is a pure function of claim text (no network calls), which
/// keeps this phase synchronous. Two genuinely different claims can
/// collide on the same five-word key; that is a known approximation, not
/// a bug.
pub struct CrossReferencer {
    min_source_confidence: u8,
    require_multiple_sources: bool,
}

struct Contribution<'a> {
    fact: &'a ExtractedFact,
    /// Fact confidence after damping for low-scoring sources.
    confidence: u8,
    domain: &'a str,
    title: &'a str,
    authority: u8,
}

impl CrossReferencer {
    /// Create a cross-referencer from the run config
    pub fn new(config: &DeepResearchConfig) -> Self {
        Self {
            min_source_confidence: config.min_source_confidence,
            require_multiple_sources: config.require_multiple_sources,
        }
    }

    /// Turn the flat pool of extracted facts into verified facts.
    ///
    /// Facts from sources scoring below `min_source_confidence` are kept
    /// (they still matter for conflict detection) but their per-fact
    /// confidence is halved, so they rarely lift a tier on their own.
    pub fn verify(&self, evaluations: &[SourceEvaluation]) -> Vec<VerifiedFact> {
        let mut groups: HashMap<String, Vec<Contribution<'_>>> = HashMap::new();

        for eval in evaluations {
            let damp = eval.overall_score < self.min_source_confidence;
            for fact in &eval.facts {
                let confidence = if damp { fact.confidence / 2 } else { fact.confidence };
                groups.entry(claim_key(&fact.claim)).or_default().push(Contribution {
                    fact,
                    confidence,
                    domain: &eval.domain,
                    title: &eval.content.title,
                    authority: eval.authority_score,
                });
            }
        }

        let mut verified: Vec<VerifiedFact> = groups
            .into_values()
            .filter_map(|group| self.verify_group(group))
            .collect();

        // High tier first; more agreement first within a tier.
        verified.sort_by(|a, b| {
            b.confidence
                .cmp(&a.confidence)
                .then(b.agreement_count.cmp(&a.agreement_count))
        });

        debug!(facts = verified.len(), "Cross-referencing complete");
        verified
    }

    fn verify_group(&self, group: Vec<Contribution<'_>>) -> Option<VerifiedFact> {
        // Highest individual confidence wins the representative claim/value.
        let representative = group.iter().max_by_key(|c| c.confidence)?;
        let claim = representative.fact.claim.clone();
        let value = representative.fact.value.clone();

        let mut sources: Vec<SourceReference> = group
            .iter()
            .map(|c| SourceReference {
                url: c.fact.source_url.clone(),
                domain: c.domain.to_string(),
                title: c.title.to_string(),
                authority_score: c.authority,
                quote: short_quote(&c.fact.context),
            })
            .collect();
        sources.sort_by(|a, b| b.authority_score.cmp(&a.authority_score));

        let unique_sources = group
            .iter()
            .map(|c| c.domain)
            .collect::<BTreeSet<_>>()
            .len();
        let avg_authority =
            group.iter().map(|c| c.authority as f64).sum::<f64>() / group.len() as f64;
        let avg_fact_confidence =
            group.iter().map(|c| c.confidence as f64).sum::<f64>() / group.len() as f64;
        let has_official = sources
            .iter()
            .any(|s| s.authority_score >= OFFICIAL_AUTHORITY);

        let mut tier = confidence_tier(
            unique_sources,
            avg_authority,
            avg_fact_confidence,
            has_official,
        );
        if self.require_multiple_sources && unique_sources < 2 && !has_official {
            tier = tier.downgraded();
        }

        Some(VerifiedFact {
            claim,
            value,
            conflicting_values: conflicting_values_note(&group),
            agreement_count: unique_sources,
            confidence: tier,
            sources,
        })
    }
}

/// Normalize a claim into its grouping key: lowercase, strip
/// non-alphanumerics, drop words of three letters or fewer, keep the five
/// longest remaining words, sort them alphabetically and join with `-`.
///
/// Idempotent: running it on an existing key returns the same key.
pub fn claim_key(claim: &str) -> String {
    let mut words = significant_words(claim);
    words.sort_by(|a, b| b.len().cmp(&a.len()));
    words.truncate(5);
    words.sort();
    words.join("-")
}

/// Lowercased words longer than three letters, deduplicated, in order of
/// first appearance
pub(crate) fn significant_words(text: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 3)
        .filter(|w| seen.insert(w.to_string()))
        .map(str::to_string)
        .collect()
}

/// The exact tier decision order.
///
/// Deterministic given the four inputs; exercised directly by tests.
pub fn confidence_tier(
    unique_sources: usize,
    avg_authority: f64,
    avg_fact_confidence: f64,
    has_official: bool,
) -> ConfidenceTier {
    if (unique_sources >= 3 && avg_authority >= 70.0)
        || (unique_sources >= 2 && avg_authority >= 75.0)
        || (unique_sources >= 2 && avg_fact_confidence >= 80.0)
        || (unique_sources >= 1 && has_official && avg_fact_confidence >= 75.0)
    {
        ConfidenceTier::High
    } else if unique_sources >= 2
        || has_official
        || avg_authority >= 70.0
        || avg_fact_confidence >= 70.0
        || (unique_sources >= 1 && avg_fact_confidence >= 60.0)
    {
        ConfidenceTier::Medium
    } else {
        ConfidenceTier::Low
    }
}

fn short_quote(context: &str) -> String {
    let trimmed = context.trim();
    if trimmed.chars().count() <= QUOTE_CAP {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(QUOTE_CAP).collect();
    format!("{}…", cut.trim_end())
}

fn conflicting_values_note(group: &[Contribution<'_>]) -> Option<String> {
    let mut distinct: Vec<String> = Vec::new();
    for c in group {
        if let Some(value) = &c.fact.value {
            let value = value.trim();
            if !value.is_empty() && !distinct.iter().any(|v| v.eq_ignore_ascii_case(value)) {
                distinct.push(value.to_string());
            }
        }
    }
    if distinct.len() > 1 {
        Some(format!("Conflicting values reported: {}", distinct.join("; ")))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::{ExtractedContent, QuestionCategory};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn fact(claim: &str, value: Option<&str>, url: &str, confidence: u8) -> ExtractedFact {
        ExtractedFact {
            claim: claim.to_string(),
            value: value.map(str::to_string),
            context: format!("Context around the claim: {}", claim),
            source_url: url.to_string(),
            confidence,
            category: QuestionCategory::Facts,
        }
    }

    fn evaluation(domain: &str, authority: u8, overall: u8, facts: Vec<ExtractedFact>) -> SourceEvaluation {
        let url = format!("https://{}/page", domain);
        SourceEvaluation {
            url: url.clone(),
            domain: domain.to_string(),
            authority_score: authority,
            recency_score: 60,
            relevance_score: 70,
            overall_score: overall,
            facts,
            content: ExtractedContent {
                url,
                title: format!("{} article", domain),
                domain: domain.to_string(),
                published: None,
                modified: None,
                text: String::new(),
                tables: vec![],
                headings: vec![],
                word_count: 0,
                fetched_at: Utc::now(),
            },
        }
    }

    fn default_crossref() -> CrossReferencer {
        // require_multiple_sources off so tier rules are tested unmodified
        CrossReferencer::new(&DeepResearchConfig {
            require_multiple_sources: false,
            ..DeepResearchConfig::default()
        })
    }

    #[test]
    fn test_claim_key_normalization() {
        let key = claim_key("The Pro plan costs $10 per month!");
        assert_eq!(key, "costs-month-plan");
    }

    #[test]
    fn test_claim_key_keeps_five_longest_words() {
        let key = claim_key("enterprise subscription includes unlimited storage plus priority support");
        // seven significant words; the five longest survive
        let words: Vec<&str> = key.split('-').collect();
        assert_eq!(words.len(), 5);
        assert!(words.contains(&"subscription"));
        assert!(words.contains(&"enterprise"));
        assert!(!words.contains(&"plus"));
    }

    #[test]
    fn test_claim_key_is_idempotent() {
        let key = claim_key("The widget API supports streaming responses since version two");
        assert_eq!(claim_key(&key), key);
    }

    #[test]
    fn test_similar_claims_share_a_key() {
        let a = claim_key("The Pro plan costs $10 per month");
        let b = claim_key("Pro plan: costs are $10/month");
        assert_eq!(a, b);
    }

    #[test]
    fn test_tier_decision_table() {
        use ConfidenceTier::*;
        // Fixed points of the decision order
        assert_eq!(confidence_tier(3, 75.0, 50.0, false), High);
        assert_eq!(confidence_tier(1, 40.0, 40.0, false), Low);
        assert_eq!(confidence_tier(2, 50.0, 50.0, false), Medium);
        // Remaining high rules
        assert_eq!(confidence_tier(2, 75.0, 10.0, false), High);
        assert_eq!(confidence_tier(2, 10.0, 80.0, false), High);
        assert_eq!(confidence_tier(1, 10.0, 75.0, true), High);
        // Medium rules
        assert_eq!(confidence_tier(1, 10.0, 10.0, true), Medium);
        assert_eq!(confidence_tier(1, 70.0, 10.0, false), Medium);
        assert_eq!(confidence_tier(0, 10.0, 70.0, false), Medium);
        assert_eq!(confidence_tier(1, 10.0, 60.0, false), Medium);
        // Just under every threshold
        assert_eq!(confidence_tier(1, 69.0, 59.0, false), Low);
    }

    #[test]
    fn test_agreement_counts_distinct_domains_not_facts() {
        let crossref = default_crossref();
        let evals = vec![
            evaluation(
                "a.example.com",
                60,
                70,
                vec![
                    fact("The Pro plan costs $10 per month", Some("$10"), "https://a.example.com/1", 80),
                    fact("Pro plan costs: $10 a month", Some("$10"), "https://a.example.com/2", 75),
                ],
            ),
            evaluation(
                "b.example.org",
                60,
                70,
                vec![fact("The Pro plan costs $10 per month", Some("$10"), "https://b.example.org/1", 70)],
            ),
        ];

        let verified = crossref.verify(&evals);
        assert_eq!(verified.len(), 1);
        // Three facts, but only two distinct domains
        assert_eq!(verified[0].agreement_count, 2);
        assert_eq!(verified[0].sources.len(), 3);
    }

    #[test]
    fn test_sources_sorted_by_descending_authority() {
        let crossref = default_crossref();
        let evals = vec![
            evaluation("low.example.com", 45, 70, vec![fact("Widget weighs three kilograms exactly", None, "https://low.example.com/1", 60)]),
            evaluation("gov.example.gov", 95, 70, vec![fact("The widget weighs exactly three kilograms", None, "https://gov.example.gov/1", 60)]),
            evaluation("mid.example.org", 70, 70, vec![fact("Widget weighs exactly three kilograms", None, "https://mid.example.org/1", 60)]),
        ];

        let verified = crossref.verify(&evals);
        assert_eq!(verified.len(), 1);
        let authorities: Vec<u8> = verified[0].sources.iter().map(|s| s.authority_score).collect();
        assert_eq!(authorities, vec![95, 70, 45]);
    }

    #[test]
    fn test_representative_is_highest_confidence_fact() {
        let crossref = default_crossref();
        let evals = vec![
            evaluation("a.example.com", 60, 70, vec![fact("Pro plan monthly cost in dollars", Some("$12"), "https://a.example.com/1", 40)]),
            evaluation("b.example.com", 60, 70, vec![fact("Pro plan monthly cost in dollars", Some("$10"), "https://b.example.com/1", 95)]),
        ];

        let verified = crossref.verify(&evals);
        assert_eq!(verified.len(), 1);
        assert_eq!(verified[0].value.as_deref(), Some("$10"));
    }

    #[test]
    fn test_conflicting_values_noted() {
        let crossref = default_crossref();
        let evals = vec![
            evaluation("a.example.com", 60, 70, vec![fact("The Pro plan costs ten dollars monthly", Some("$10"), "https://a.example.com/1", 80)]),
            evaluation("b.example.com", 60, 70, vec![fact("Pro plan monthly costs ten dollars", Some("$12"), "https://b.example.com/1", 80)]),
        ];

        let verified = crossref.verify(&evals);
        assert_eq!(verified.len(), 1);
        let note = verified[0].conflicting_values.as_ref().unwrap();
        assert!(note.contains("$10"));
        assert!(note.contains("$12"));
    }

    #[test]
    fn test_agreeing_values_produce_no_note() {
        let crossref = default_crossref();
        let evals = vec![
            evaluation("a.example.com", 60, 70, vec![fact("The Pro plan costs ten dollars monthly", Some("$10"), "https://a.example.com/1", 80)]),
            evaluation("b.example.com", 60, 70, vec![fact("Pro plan monthly costs ten dollars", Some("$10"), "https://b.example.com/1", 80)]),
        ];

        let verified = crossref.verify(&evals);
        assert!(verified[0].conflicting_values.is_none());
    }

    #[test]
    fn test_low_scoring_sources_are_damped_not_dropped() {
        let crossref = default_crossref();
        // Source scores 30 overall, below the default floor of 50
        let evals = vec![evaluation(
            "spam.example.com",
            40,
            30,
            vec![fact("Widget ships with a free trial period", None, "https://spam.example.com/1", 90)],
        )];

        let verified = crossref.verify(&evals);
        assert_eq!(verified.len(), 1, "fact must be kept");
        // 90 damped to 45: below every medium threshold for a single weak source
        assert_eq!(verified[0].confidence, ConfidenceTier::Low);
    }

    #[test]
    fn test_require_multiple_sources_demotes_single_domain() {
        let strict = CrossReferencer::new(&DeepResearchConfig::default());
        let evals = vec![evaluation(
            "blog.example.com",
            55,
            70,
            vec![fact("Widget supports seventeen output formats natively", None, "https://blog.example.com/1", 85)],
        )];

        let verified = strict.verify(&evals);
        // avg confidence 85 would be medium; single non-official domain demotes
        assert_eq!(verified[0].confidence, ConfidenceTier::Low);
    }

    #[test]
    fn test_output_sorted_by_tier() {
        let crossref = default_crossref();
        let evals = vec![
            evaluation("weak.example.com", 40, 70, vec![fact("Obscure minor detail about widgets", None, "https://weak.example.com/1", 30)]),
            evaluation("gov.example.gov", 95, 80, vec![fact("Widgets certified under national safety standard", None, "https://gov.example.gov/1", 90)]),
        ];

        let verified = crossref.verify(&evals);
        assert_eq!(verified.len(), 2);
        assert!(verified[0].confidence > verified[1].confidence);
        assert_eq!(verified[0].confidence, ConfidenceTier::High);
    }

    #[test]
    fn test_quote_is_truncated() {
        let long_context = "x".repeat(400);
        assert!(short_quote(&long_context).chars().count() <= QUOTE_CAP + 1);
        assert_eq!(short_quote("short context"), "short context");
    }
}
