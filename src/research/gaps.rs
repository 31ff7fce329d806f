use tracing::debug;

use super::crossref::significant_words;
use super::{ConfidenceTier, Gap, GapImportance, Priority, SubQuestion, VerifiedFact};

/// Fraction of a sub-question's significant words that must appear in a
/// fact before the fact counts as addressing it.
const COVERAGE_THRESHOLD: f64 = 0.5;

/// Flags sub-questions the verified facts fail to answer.
///
/// Coverage is judged lexically, with the same word normalization used
/// for claim grouping. No extra model calls are made here.
pub struct GapAnalyzer;

enum Coverage {
    Answered,
    /// Only low-tier facts address the question.
    Weak,
    Unanswered,
}

impl GapAnalyzer {
    /// Create a new gap analyzer
    pub fn new() -> Self {
        Self
    }

    /// Compare sub-questions against verified facts and emit one gap per
    /// question that remains unanswered or only weakly answered.
    pub fn find_gaps(&self, sub_questions: &[SubQuestion], facts: &[VerifiedFact]) -> Vec<Gap> {
        let gaps: Vec<Gap> = sub_questions
            .iter()
            .filter_map(|sq| match coverage(sq, facts) {
                Coverage::Answered => None,
                Coverage::Weak => Some(Gap {
                    sub_question_id: sq.id.clone(),
                    description: format!(
                        "Only low-confidence sources address: {}",
                        sq.question
                    ),
                    suggested_query: sq.search_query.clone(),
                    importance: importance_of(sq.priority, true),
                }),
                Coverage::Unanswered => Some(Gap {
                    sub_question_id: sq.id.clone(),
                    description: format!("No verified facts address: {}", sq.question),
                    suggested_query: sq.search_query.clone(),
                    importance: importance_of(sq.priority, false),
                }),
            })
            .collect();

        debug!(gaps = gaps.len(), questions = sub_questions.len(), "Gap analysis complete");
        gaps
    }
}

impl Default for GapAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn coverage(sub_question: &SubQuestion, facts: &[VerifiedFact]) -> Coverage {
    let matching: Vec<&VerifiedFact> = facts
        .iter()
        .filter(|fact| addresses(sub_question, fact))
        .collect();

    if matching.is_empty() {
        Coverage::Unanswered
    } else if matching.iter().all(|f| f.confidence == ConfidenceTier::Low) {
        Coverage::Weak
    } else {
        Coverage::Answered
    }
}

/// Lexical overlap between question and fact, over the question's words
fn addresses(sub_question: &SubQuestion, fact: &VerifiedFact) -> bool {
    let question_words = significant_words(&sub_question.question);
    if question_words.is_empty() {
        return false;
    }

    let mut fact_text = fact.claim.clone();
    if let Some(value) = &fact.value {
        fact_text.push(' ');
        fact_text.push_str(value);
    }
    let fact_words = significant_words(&fact_text);

    let matched = question_words
        .iter()
        .filter(|w| fact_words.contains(w))
        .count();
    matched as f64 / question_words.len() as f64 >= COVERAGE_THRESHOLD
}

fn importance_of(priority: Priority, weakly_answered: bool) -> GapImportance {
    match priority {
        Priority::High if !weakly_answered => GapImportance::Critical,
        Priority::High => GapImportance::Important,
        Priority::Medium => GapImportance::Important,
        Priority::Low => GapImportance::NiceToHave,
    }
}
