//! services/api/src/adapters/progression_llm.rs
//!
//! This module contains the adapter for the Adaptive Progression flow.
//! It implements the `AdaptiveProgressionService` port from the `core` crate.

use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use life_engine_core::flows::{
    parse_progression, render_progression_prompt, ProgressionRequest, ProgressionSuggestion,
    PROGRESSION_SYSTEM_PROMPT,
};
use life_engine_core::ports::{AdaptiveProgressionService, PortResult};

use super::chat::complete;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AdaptiveProgressionService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiProgressionAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiProgressionAdapter {
    /// Creates a new `OpenAiProgressionAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `AdaptiveProgressionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AdaptiveProgressionService for OpenAiProgressionAdapter {
    async fn suggest_next_level(
        &self,
        request: &ProgressionRequest,
    ) -> PortResult<ProgressionSuggestion> {
        let reply = complete(
            &self.client,
            &self.model,
            PROGRESSION_SYSTEM_PROMPT,
            render_progression_prompt(request),
        )
        .await?;
        parse_progression(&reply)
    }
}
