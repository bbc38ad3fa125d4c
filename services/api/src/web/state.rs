//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use life_engine_core::ports::{
    AdaptiveProgressionService, CrossDomainInsightsService, DocumentStore,
};
use life_engine_core::schema::ValidationContext;
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<Config>,
    pub progression: Arc<dyn AdaptiveProgressionService>,
    pub insights: Arc<dyn CrossDomainInsightsService>,
}

impl AppState {
    /// How form dates and clock times are read for this deployment.
    pub fn validation_context(&self) -> ValidationContext {
        ValidationContext {
            utc_offset: self.config.schedule_offset,
        }
    }
}
