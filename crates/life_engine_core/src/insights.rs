//! crates/life_engine_core/src/insights.rs
//!
//! Cross-domain insight scores. Four collections feed one set of averages;
//! the averages are recomputed from whatever snapshots are current, so a
//! partially loaded set of bindings still yields a consistent result.

use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::binding::{BindingRequest, CollectionBinding};
use crate::domain::{Collection, CollectionPath, Document, UserContext};
use crate::flows::{CrossDomainInsights, InsightScores};
use crate::ports::{
    CollectionQuery, CrossDomainInsightsService, DocumentStore, PortError, PortResult,
};
use crate::schema::FieldErrors;

/// Protein grams that count as one nutrition point.
const PROTEIN_PER_POINT: f64 = 15.0;
const MAX_SCORE: f64 = 10.0;

/// The collections insight scores are drawn from, in `compute_scores` order.
pub const SOURCES: [Collection; 4] = [
    Collection::SleepOptimizations,
    Collection::DeepWorkSessions,
    Collection::NutritionDiets,
    Collection::ExerciseSessions,
];

/// Mean rounded to one decimal; an empty input scores 0.
fn average(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        return 0.0;
    }
    (sum / count as f64 * 10.0).round() / 10.0
}

pub fn compute_scores(
    sleep: &[Document],
    deep_work: &[Document],
    nutrition: &[Document],
    exercise: &[Document],
) -> InsightScores {
    let rpe_values = exercise.iter().flat_map(|session| {
        session
            .fields
            .get("exerciseDetails")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|line| line.get("rpe").and_then(Value::as_f64))
    });

    InsightScores {
        sleep_quality: average(sleep.iter().filter_map(|d| d.f64_field("quality"))),
        deep_work_performance: average(
            deep_work
                .iter()
                .filter_map(|d| d.f64_field("confidenceScore")),
        ),
        nutrition_score: average(
            nutrition
                .iter()
                .filter_map(|d| d.f64_field("protein"))
                .map(|protein| protein / PROTEIN_PER_POINT),
        )
        .min(MAX_SCORE),
        exercise_consistency: average(rpe_values),
    }
}

/// Rejects scores outside 0–10 before they reach the model.
pub fn validate_scores(scores: &InsightScores) -> PortResult<()> {
    let mut errors = FieldErrors::new();
    for (field, value) in [
        ("sleepQuality", scores.sleep_quality),
        ("deepWorkPerformance", scores.deep_work_performance),
        ("nutritionScore", scores.nutrition_score),
        ("exerciseConsistency", scores.exercise_consistency),
    ] {
        if !(0.0..=MAX_SCORE).contains(&value) {
            errors.insert(field, format!("Score must be between 0 and {}", MAX_SCORE));
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(PortError::Validation(errors))
    }
}

/// One-shot averages over the user's current records.
pub async fn load_scores(
    store: &dyn DocumentStore,
    ctx: &UserContext,
) -> PortResult<InsightScores> {
    let mut snapshots = Vec::with_capacity(SOURCES.len());
    for collection in SOURCES {
        let path = CollectionPath::new(&ctx.user_id, collection);
        snapshots.push(store.query(&CollectionQuery::new(path)).await?);
    }
    Ok(compute_scores(&snapshots[0], &snapshots[1], &snapshots[2], &snapshots[3]))
}

/// Live bindings on the four source collections.
pub struct InsightSources {
    bindings: Vec<CollectionBinding>,
}

impl InsightSources {
    pub fn open(store: Arc<dyn DocumentStore>, ctx: Option<&UserContext>) -> Self {
        let bindings = SOURCES
            .iter()
            .map(|c| CollectionBinding::open(store.clone(), ctx, &BindingRequest::new(*c)))
            .collect();
        Self { bindings }
    }

    /// True while any source is still resolving.
    pub fn is_loading(&self) -> bool {
        self.bindings.iter().any(|b| b.snapshot().loading)
    }

    /// Recomputes the averages from the latest snapshot of each source. A
    /// source whose query failed fails the whole set.
    pub fn current_scores(&self) -> PortResult<InsightScores> {
        let snapshots: Vec<_> = self.bindings.iter().map(CollectionBinding::snapshot).collect();
        if let Some(error) = snapshots.iter().find_map(|s| s.error.clone()) {
            return Err(PortError::Unexpected(error));
        }
        Ok(compute_scores(
            snapshots[0].records(),
            snapshots[1].records(),
            snapshots[2].records(),
            snapshots[3].records(),
        ))
    }

    pub async fn settled_scores(&mut self) -> PortResult<InsightScores> {
        for binding in &mut self.bindings {
            binding.settled().await;
        }
        self.current_scores()
    }
}

pub async fn generate_insights(
    flow: &dyn CrossDomainInsightsService,
    scores: &InsightScores,
) -> PortResult<CrossDomainInsights> {
    validate_scores(scores)?;
    info!("Requesting cross-domain insights for {:?}", scores);
    flow.analyze(scores).await
}
