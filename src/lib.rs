//! # Deep Research Engine
//!
//! An autonomous research service that answers open-ended questions by
//! decomposing them, searching the web through a browser-automation
//! collaborator, scoring and cross-referencing sources, and synthesizing a
//! cited answer with calibrated confidence.
//!
//! ## Pipeline
//!
//! - **Planning**: prompt decomposition into prioritized sub-questions
//! - **Searching**: bounded-concurrency query execution with domain filtering
//! - **Analysis**: rendered page extraction into structured content
//! - **Evaluation**: authority/recency/relevance scoring plus fact extraction
//! - **Cross-referencing**: fact grouping, agreement counting, confidence tiers
//! - **Gap analysis**: detection of sub-questions the evidence fails to answer
//! - **Synthesis**: narrative answer with `[N]` citations and follow-ups
//!
//! The whole run executes under one deadline; every phase degrades to
//! partial output rather than failing the run.
//!
//! ## Architecture
//!
//! ```text
//! Caller → JSON-RPC (stdio) → ResearchEngine → LLM service (HTTP)
//!                                   ↓
//!                          Browser bridge (HTTP)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use deep_research_engine::{AppState, Config, RpcServer};
//! use deep_research_engine::browser::BrowserBridgeClient;
//! use deep_research_engine::llm::HttpCompletionClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let llm = Arc::new(HttpCompletionClient::new(&config.llm, config.request.clone())?);
//!     let browser = Arc::new(BrowserBridgeClient::new(&config.browser, &config.request)?);
//!     let state = Arc::new(AppState::new(config, llm, browser));
//!     RpcServer::new(state).run().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Browser-automation bridge client and types.
pub mod browser;
/// Configuration management for the engine.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Language-model completion client and types.
pub mod llm;
/// System prompts for the planning, extraction, and synthesis calls.
pub mod prompts;
/// The research pipeline phases and orchestration.
pub mod research;
/// JSON-RPC server implementation and request handling.
pub mod server;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use server::{AppState, RpcServer, SharedState};
