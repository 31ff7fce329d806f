use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use super::{extract_json_from_completion, Gap, SourceReference, VerifiedFact};
use crate::llm::{CompletionClient, CompletionRequest, Message};
use crate::prompts::SYNTHESIS_PROMPT;

/// Composes the final cited answer from verified facts.
///
/// A synthesis failure never discards the evidence: the fallback is a
/// deterministic template that still lists every verified fact with its
/// citations.
pub struct ResponseSynthesizer {
    llm: Arc<dyn CompletionClient>,
    model: String,
}

/// Shape the synthesis prompt asks the model to produce
#[derive(Debug, Deserialize)]
struct SynthesisOutput {
    response: String,
    #[serde(rename = "followUpQuestions", default)]
    follow_up_questions: Vec<String>,
}

/// The synthesized answer plus suggested follow-up questions
pub struct Synthesis {
    pub response: String,
    pub follow_up_questions: Vec<String>,
}

impl ResponseSynthesizer {
    /// Create a new synthesizer
    pub fn new(llm: Arc<dyn CompletionClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// Produce the cited answer. `sources` carries the numbering used for
    /// `[N]` citations; index 0 is citation `[1]`.
    pub async fn synthesize(
        &self,
        prompt: &str,
        facts: &[VerifiedFact],
        gaps: &[Gap],
        sources: &[SourceReference],
    ) -> Synthesis {
        let context = build_context(prompt, facts, gaps, sources);
        let request = CompletionRequest::new(
            &self.model,
            vec![Message::system(SYNTHESIS_PROMPT), Message::user(context)],
        )
        .with_max_tokens(2500)
        .with_temperature(0.4);

        let completion = match self.llm.complete(request).await {
            Ok(response) => response.content,
            Err(e) => {
                warn!(error = %e, "Synthesis completion failed, using fallback template");
                return fallback_synthesis(prompt, facts, gaps, sources);
            }
        };

        match parse_completion(&completion) {
            Some(output) if !output.response.trim().is_empty() => {
                debug!(
                    follow_ups = output.follow_up_questions.len(),
                    "Synthesis complete"
                );
                Synthesis {
                    response: output.response,
                    follow_up_questions: output.follow_up_questions,
                }
            }
            _ => {
                warn!("Synthesis output unparseable, using fallback template");
                fallback_synthesis(prompt, facts, gaps, sources)
            }
        }
    }
}

fn parse_completion(completion: &str) -> Option<SynthesisOutput> {
    let json = extract_json_from_completion(completion).ok()?;
    serde_json::from_str(json).ok()
}

/// Map each source URL to its 1-based citation number
fn citation_numbers(sources: &[SourceReference]) -> HashMap<&str, usize> {
    sources
        .iter()
        .enumerate()
        .map(|(i, s)| (s.url.as_str(), i + 1))
        .collect()
}

fn build_context(
    prompt: &str,
    facts: &[VerifiedFact],
    gaps: &[Gap],
    sources: &[SourceReference],
) -> String {
    let numbers = citation_numbers(sources);
    let mut context = format!("Research question:\n{}\n\nNumbered sources:\n", prompt);

    for (i, source) in sources.iter().enumerate() {
        context.push_str(&format!(
            "[{}] {} — {} (authority {})\n",
            i + 1,
            source.domain,
            source.title,
            source.authority_score
        ));
    }

    context.push_str("\nVerified facts:\n");
    for fact in facts {
        let citations: Vec<String> = fact
            .sources
            .iter()
            .filter_map(|s| numbers.get(s.url.as_str()))
            .map(|n| format!("[{}]", n))
            .collect();
        context.push_str(&format!(
            "- ({} confidence) {}{} {}\n",
            fact.confidence.as_str(),
            fact.claim,
            fact.value
                .as_ref()
                .map(|v| format!(": {}", v))
                .unwrap_or_default(),
            citations.join("")
        ));
        if let Some(conflict) = &fact.conflicting_values {
            context.push_str(&format!("  Note: {}\n", conflict));
        }
    }

    if !gaps.is_empty() {
        context.push_str("\nKnown gaps (acknowledge these honestly):\n");
        for gap in gaps {
            context.push_str(&format!("- {}\n", gap.description));
        }
    }

    context
}

/// Deterministic answer used when the model cannot synthesize one, or when
/// the run deadline leaves no time for a synthesis call
pub(crate) fn fallback_synthesis(
    prompt: &str,
    facts: &[VerifiedFact],
    gaps: &[Gap],
    sources: &[SourceReference],
) -> Synthesis {
    let numbers = citation_numbers(sources);
    let mut response = format!("## Research findings\n\n**Question:** {}\n", prompt);

    if facts.is_empty() {
        response.push_str("\nNo facts could be verified within this run.\n");
    } else {
        response.push_str("\n### Verified facts\n\n");
        for fact in facts {
            let citations: Vec<String> = fact
                .sources
                .iter()
                .filter_map(|s| numbers.get(s.url.as_str()))
                .map(|n| format!("[{}]", n))
                .collect();
            response.push_str(&format!(
                "- {}{} ({} confidence) {}\n",
                fact.claim,
                fact.value
                    .as_ref()
                    .map(|v| format!(": {}", v))
                    .unwrap_or_default(),
                fact.confidence.as_str(),
                citations.join("")
            ));
        }
    }

    if !gaps.is_empty() {
        response.push_str("\n### Open gaps\n\n");
        for gap in gaps {
            response.push_str(&format!("- {}\n", gap.description));
        }
    }

    Synthesis {
        response,
        follow_up_questions: gaps.iter().map(|g| g.suggested_query.clone()).collect(),
    }
}
