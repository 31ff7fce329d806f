use super::{GapImportance, ResearchResult};

/// Render a research result as a self-contained markdown report.
///
/// The synthesized response already carries its `[N]` citations; this adds
/// the evidence appendix around it.
pub fn render_report(result: &ResearchResult) -> String {
    let mut report = String::new();

    report.push_str("# Research report\n\n");
    report.push_str(&format!(
        "**Overall confidence:** {}\n\n",
        result.confidence.as_str()
    ));
    report.push_str(&result.response);
    if !result.response.ends_with('\n') {
        report.push('\n');
    }

    if !result.facts.is_empty() {
        report.push_str("\n## Verified facts\n\n");
        for fact in &result.facts {
            report.push_str(&format!(
                "- **{}**{} — {} confidence, {} source{}\n",
                fact.claim,
                fact.value
                    .as_ref()
                    .map(|v| format!(" ({})", v))
                    .unwrap_or_default(),
                fact.confidence.as_str(),
                fact.agreement_count,
                if fact.agreement_count == 1 { "" } else { "s" },
            ));
            if let Some(conflict) = &fact.conflicting_values {
                report.push_str(&format!("  - ⚠ {}\n", conflict));
            }
        }
    }

    if !result.sources.is_empty() {
        report.push_str("\n## Sources\n\n");
        for (i, source) in result.sources.iter().enumerate() {
            report.push_str(&format!(
                "{}. [{}]({}) — {} (authority {})\n",
                i + 1,
                source.title,
                source.url,
                source.domain,
                source.authority_score
            ));
        }
    }

    if !result.gaps.is_empty() {
        report.push_str("\n## Gaps\n\n");
        for gap in &result.gaps {
            let marker = match gap.importance {
                GapImportance::Critical => "critical",
                GapImportance::Important => "important",
                GapImportance::NiceToHave => "nice to have",
            };
            report.push_str(&format!("- ({}) {}\n", marker, gap.description));
        }
    }

    if !result.follow_up_questions.is_empty() {
        report.push_str("\n## Suggested follow-ups\n\n");
        for question in &result.follow_up_questions {
            report.push_str(&format!("- {}\n", question));
        }
    }

    report.push_str(&format!(
        "\n---\n{} searches, {} pages analyzed, {} facts verified in {:.1}s\n",
        result.stats.searches_run,
        result.stats.pages_analyzed,
        result.stats.facts_verified,
        result.stats.total_duration_ms as f64 / 1000.0
    ));

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::{
        ConfidenceTier, Gap, ResearchStats, SourceReference, VerifiedFact,
    };

    fn sample_result() -> ResearchResult {
        ResearchResult {
            response: "The plan costs $10 per month [1].".to_string(),
            sources: vec![SourceReference {
                url: "https://example.com/pricing".to_string(),
                domain: "example.com".to_string(),
                title: "Pricing".to_string(),
                authority_score: 80,
                quote: String::new(),
            }],
            facts: vec![VerifiedFact {
                claim: "The plan costs ten dollars monthly".to_string(),
                value: Some("$10".to_string()),
                sources: vec![],
                agreement_count: 2,
                confidence: ConfidenceTier::High,
                conflicting_values: None,
            }],
            gaps: vec![Gap {
                sub_question_id: "sq".to_string(),
                description: "No verified facts address: annual discounts".to_string(),
                suggested_query: "annual discount".to_string(),
                importance: GapImportance::Important,
            }],
            confidence: ConfidenceTier::High,
            follow_up_questions: vec!["Is there a free tier?".to_string()],
            stats: ResearchStats {
                searches_run: 4,
                pages_analyzed: 6,
                facts_extracted: 12,
                facts_verified: 5,
                total_duration_ms: 42_500,
                phases: vec![],
            },
        }
    }

    #[test]
    fn test_report_contains_all_sections() {
        let report = render_report(&sample_result());
        assert!(report.contains("# Research report"));
        assert!(report.contains("**Overall confidence:** high"));
        assert!(report.contains("The plan costs $10 per month [1]."));
        assert!(report.contains("## Verified facts"));
        assert!(report.contains("2 sources"));
        assert!(report.contains("## Sources"));
        assert!(report.contains("1. [Pricing](https://example.com/pricing)"));
        assert!(report.contains("## Gaps"));
        assert!(report.contains("(important)"));
        assert!(report.contains("## Suggested follow-ups"));
        assert!(report.contains("4 searches, 6 pages analyzed, 5 facts verified in 42.5s"));
    }

    #[test]
    fn test_report_omits_empty_sections() {
        let mut result = sample_result();
        result.facts.clear();
        result.gaps.clear();
        result.follow_up_questions.clear();
        result.sources.clear();

        let report = render_report(&result);
        assert!(!report.contains("## Verified facts"));
        assert!(!report.contains("## Gaps"));
        assert!(!report.contains("## Sources"));
        assert!(!report.contains("## Suggested follow-ups"));
    }
}
