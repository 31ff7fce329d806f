use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use super::{extract_json_from_completion, Priority, QuestionCategory, SubQuestion};
use crate::llm::{CompletionClient, CompletionRequest, Message};
use crate::prompts::PLANNER_PROMPT;

/// Turns the raw user prompt into an ordered list of sub-questions.
///
/// A planning failure never fails the run: it degrades to a single
/// sub-question equal to the verbatim prompt.
pub struct QuestionPlanner {
    llm: Arc<dyn CompletionClient>,
    model: String,
}

/// Shape the planner prompt asks the model to produce
#[derive(Debug, Deserialize)]
struct PlannedQuestion {
    question: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(rename = "searchQuery", default)]
    search_query: Option<String>,
}

impl QuestionPlanner {
    /// Create a new planner
    pub fn new(llm: Arc<dyn CompletionClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// Decompose the prompt into at most `max_sub_questions` sub-questions
    pub async fn plan(&self, prompt: &str, max_sub_questions: usize) -> Vec<SubQuestion> {
        let request = CompletionRequest::new(
            &self.model,
            vec![
                Message::system(PLANNER_PROMPT),
                Message::user(format!(
                    "Decompose into at most {} sub-questions:\n\n{}",
                    max_sub_questions, prompt
                )),
            ],
        )
        .with_max_tokens(1500)
        .with_temperature(0.3);

        let completion = match self.llm.complete(request).await {
            Ok(response) => response.content,
            Err(e) => {
                warn!(error = %e, "Planner completion failed, using verbatim prompt");
                return vec![Self::fallback(prompt)];
            }
        };

        match Self::parse_completion(&completion, max_sub_questions) {
            Some(questions) if !questions.is_empty() => {
                debug!(count = questions.len(), "Planner produced sub-questions");
                questions
            }
            _ => {
                warn!("Planner output unparseable, using verbatim prompt");
                vec![Self::fallback(prompt)]
            }
        }
    }

    /// Single fallback sub-question: the verbatim prompt
    fn fallback(prompt: &str) -> SubQuestion {
        SubQuestion::new(prompt, QuestionCategory::Facts, Priority::High, prompt)
    }

    fn parse_completion(completion: &str, max: usize) -> Option<Vec<SubQuestion>> {
        let json = extract_json_from_completion(completion).ok()?;
        let planned: Vec<PlannedQuestion> = serde_json::from_str(json).ok()?;

        let questions = planned
            .into_iter()
            .filter(|p| !p.question.trim().is_empty())
            .take(max)
            .map(|p| {
                let category = p
                    .category
                    .as_deref()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(QuestionCategory::Facts);
                let priority = p
                    .priority
                    .as_deref()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(Priority::Medium);
                let search_query = p
                    .search_query
                    .filter(|q| !q.trim().is_empty())
                    .unwrap_or_else(|| p.question.clone());
                SubQuestion::new(p.question, category, priority, search_query)
            })
            .collect();
        Some(questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::{CompletionResponse, MockCompletionClient};

    fn response(content: &str) -> CompletionResponse {
        CompletionResponse {
            content: content.to_string(),
            model: None,
            usage: None,
        }
    }

    #[tokio::test]
    async fn test_plan_parses_model_output() {
        let mut llm = MockCompletionClient::new();
        llm.expect_complete().returning(|_| {
            Ok(response(
                r#"[
                    {"question": "What does plan X cost?", "category": "pricing", "priority": "high", "searchQuery": "plan X cost"},
                    {"question": "What features ship in plan X?", "category": "features", "priority": "medium", "searchQuery": "plan X features"}
                ]"#,
            ))
        });

        let planner = QuestionPlanner::new(Arc::new(llm), "test-model");
        let questions = planner.plan("Tell me about plan X", 5).await;

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].category, QuestionCategory::Pricing);
        assert_eq!(questions[0].priority, Priority::High);
        assert_eq!(questions[0].search_query, "plan X cost");
        assert_eq!(questions[1].category, QuestionCategory::Features);
    }

    #[tokio::test]
    async fn test_plan_truncates_to_max() {
        let mut llm = MockCompletionClient::new();
        llm.expect_complete().returning(|_| {
            Ok(response(
                r#"[
                    {"question": "a"}, {"question": "b"}, {"question": "c"}, {"question": "d"}
                ]"#,
            ))
        });

        let planner = QuestionPlanner::new(Arc::new(llm), "test-model");
        let questions = planner.plan("prompt", 2).await;
        assert_eq!(questions.len(), 2);
        // Missing category/priority degrade to defaults, not errors
        assert_eq!(questions[0].category, QuestionCategory::Facts);
        assert_eq!(questions[0].priority, Priority::Medium);
        assert_eq!(questions[0].search_query, "a");
    }

    #[tokio::test]
    async fn test_plan_falls_back_on_llm_error() {
        let mut llm = MockCompletionClient::new();
        llm.expect_complete().returning(|_| {
            Err(LlmError::Unavailable {
                message: "down".to_string(),
                retries: 3,
            })
        });

        let planner = QuestionPlanner::new(Arc::new(llm), "test-model");
        let questions = planner.plan("What is the airspeed of a swallow?", 5).await;

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question, "What is the airspeed of a swallow?");
        assert_eq!(questions[0].search_query, "What is the airspeed of a swallow?");
        assert_eq!(questions[0].priority, Priority::High);
    }

    #[tokio::test]
    async fn test_plan_falls_back_on_unparseable_output() {
        let mut llm = MockCompletionClient::new();
        llm.expect_complete()
            .returning(|_| Ok(response("I could not decompose that question.")));

        let planner = QuestionPlanner::new(Arc::new(llm), "test-model");
        let questions = planner.plan("original prompt", 5).await;

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question, "original prompt");
    }

    #[tokio::test]
    async fn test_plan_falls_back_on_empty_array() {
        let mut llm = MockCompletionClient::new();
        llm.expect_complete().returning(|_| Ok(response("[]")));

        let planner = QuestionPlanner::new(Arc::new(llm), "test-model");
        let questions = planner.plan("original prompt", 5).await;
        assert_eq!(questions.len(), 1);
    }
}
