//! Language-model completion collaborator.
//!
//! The engine never talks to a model vendor directly; it goes through the
//! host's completion service, reached over HTTP by [`HttpCompletionClient`].
//! Phases that need a completion depend on the [`CompletionClient`] trait so
//! they can be exercised against mocks.

mod client;
mod types;

pub use client::*;
pub use types::*;

use async_trait::async_trait;

use crate::error::LlmResult;

/// A single non-streaming text completion call.
///
/// Used for planning, fact extraction prompts, and synthesis.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Run one completion and return the generated text.
    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse>;
}
