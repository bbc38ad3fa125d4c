//! services/api/src/adapters/unconfigured.rs
//!
//! Stands in for both generative flows when no OpenAI key is configured, so
//! the data routes keep working and the flow routes fail cleanly.

use async_trait::async_trait;
use life_engine_core::flows::{
    CrossDomainInsights, InsightScores, ProgressionRequest, ProgressionSuggestion,
};
use life_engine_core::ports::{
    AdaptiveProgressionService, CrossDomainInsightsService, PortError, PortResult,
};

#[derive(Clone, Copy, Debug, Default)]
pub struct UnconfiguredFlows;

fn not_configured() -> PortError {
    PortError::Unexpected("OPENAI_API_KEY is not set".to_string())
}

#[async_trait]
impl AdaptiveProgressionService for UnconfiguredFlows {
    async fn suggest_next_level(
        &self,
        _request: &ProgressionRequest,
    ) -> PortResult<ProgressionSuggestion> {
        Err(not_configured())
    }
}

#[async_trait]
impl CrossDomainInsightsService for UnconfiguredFlows {
    async fn analyze(&self, _scores: &InsightScores) -> PortResult<CrossDomainInsights> {
        Err(not_configured())
    }
}
