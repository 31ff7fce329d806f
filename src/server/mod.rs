//! JSON-RPC server surface.
//!
//! This module provides:
//! - The stdio JSON-RPC 2.0 server loop
//! - Method routing for research requests
//! - Shared application state

mod rpc;

pub use rpc::*;

use std::sync::Arc;

use crate::browser::BrowserAutomation;
use crate::config::Config;
use crate::llm::CompletionClient;
use crate::research::ResearchEngine;

/// Application state shared across request handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// The research pipeline.
    pub engine: ResearchEngine,
}

impl AppState {
    /// Create new application state from the two collaborators
    pub fn new(
        config: Config,
        llm: Arc<dyn CompletionClient>,
        browser: Arc<dyn BrowserAutomation>,
    ) -> Self {
        let engine = ResearchEngine::new(llm, browser, &config);
        Self { config, engine }
    }
}

/// Shared application state handle
pub type SharedState = Arc<AppState>;
