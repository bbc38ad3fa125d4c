//! services/api/src/adapters/insights_llm.rs
//!
//! This module contains the adapter for the Cross-Domain Insights flow.
//! It implements the `CrossDomainInsightsService` port from the `core` crate.

use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use life_engine_core::flows::{
    parse_insights, render_insights_prompt, CrossDomainInsights, InsightScores,
    INSIGHTS_SYSTEM_PROMPT,
};
use life_engine_core::ports::{CrossDomainInsightsService, PortResult};

use super::chat::complete;

/// An adapter that implements `CrossDomainInsightsService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiInsightsAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiInsightsAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl CrossDomainInsightsService for OpenAiInsightsAdapter {
    async fn analyze(&self, scores: &InsightScores) -> PortResult<CrossDomainInsights> {
        let reply = complete(
            &self.client,
            &self.model,
            INSIGHTS_SYSTEM_PROMPT,
            render_insights_prompt(scores),
        )
        .await?;
        parse_insights(&reply)
    }
}
