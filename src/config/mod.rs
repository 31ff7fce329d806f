use std::env;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub browser: BrowserConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub research: DeepResearchConfig,
}

/// Language-model completion service configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// Browser-automation bridge configuration
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub base_url: String,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration shared by both collaborator clients
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// Per-run research limits.
///
/// Passed into the engine once per invocation; never held as shared
/// mutable state.
#[derive(Debug, Clone)]
pub struct DeepResearchConfig {
    /// Upper bound on sub-questions the planner may produce.
    pub max_sub_questions: usize,
    /// Upper bound on search calls issued for a single sub-question
    /// across the initial pass and follow-up rounds.
    pub max_searches_per_question: usize,
    /// Upper bound on pages fetched across the whole run.
    pub max_pages_to_fetch: usize,
    /// Upper bound on follow-up search rounds triggered by gaps.
    pub max_follow_up_searches: usize,
    /// Sources scoring below this overall score have their extracted
    /// facts damped during cross-referencing (they are not discarded).
    pub min_source_confidence: u8,
    /// Demote single-domain, non-official facts one confidence tier.
    pub require_multiple_sources: bool,
    /// Hard wall-clock ceiling for the whole run.
    pub timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let llm = LlmConfig {
            api_key: env::var("LLM_API_KEY").map_err(|_| AppError::Config {
                message: "LLM_API_KEY is required".to_string(),
            })?,
            base_url: env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
        };

        let browser = BrowserConfig {
            base_url: env::var("BROWSER_BRIDGE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:9231".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),
            max_retries: env::var("MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            retry_delay_ms: env::var("RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
        };

        let research = DeepResearchConfig {
            max_sub_questions: env::var("RESEARCH_MAX_SUB_QUESTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            max_searches_per_question: env::var("RESEARCH_MAX_SEARCHES_PER_QUESTION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            max_pages_to_fetch: env::var("RESEARCH_MAX_PAGES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(6),
            max_follow_up_searches: env::var("RESEARCH_MAX_FOLLOW_UPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            min_source_confidence: env::var("RESEARCH_MIN_SOURCE_CONFIDENCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(50),
            require_multiple_sources: env::var("RESEARCH_REQUIRE_MULTIPLE_SOURCES")
                .ok()
                .map(|s| s != "false" && s != "0")
                .unwrap_or(true),
            timeout_ms: env::var("RESEARCH_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(120_000),
        };

        Ok(Config {
            llm,
            browser,
            logging,
            request,
            research,
        })
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for DeepResearchConfig {
    fn default() -> Self {
        Self {
            max_sub_questions: 5,
            max_searches_per_question: 2,
            max_pages_to_fetch: 6,
            max_follow_up_searches: 2,
            min_source_confidence: 50,
            require_multiple_sources: true,
            timeout_ms: 120_000,
        }
    }
}
