//! crates/life_engine_core/src/progression.rs
//!
//! Adaptive progression: pick a domain, summarise its latest logged entry and
//! ask the progression flow for the next challenge level.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::domain::{
    local_date, Collection, CollectionPath, DeepWorkSession, Document, FitnessSession,
    PhotographySession, UserContext, VocalPracticeSession,
};
use crate::flows::{ProgressionRequest, ProgressionSuggestion};
use crate::ports::{
    AdaptiveProgressionService, CollectionQuery, DocumentStore, OrderBy, PortError, PortResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressionDomain {
    DeepWork,
    Fitness,
    VocalPractice,
    Photography,
}

impl ProgressionDomain {
    pub const ALL: [ProgressionDomain; 4] = [
        ProgressionDomain::DeepWork,
        ProgressionDomain::Fitness,
        ProgressionDomain::VocalPractice,
        ProgressionDomain::Photography,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ProgressionDomain::DeepWork => "Deep Work",
            ProgressionDomain::Fitness => "Fitness",
            ProgressionDomain::VocalPractice => "Vocal Practice",
            ProgressionDomain::Photography => "Photography",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            ProgressionDomain::DeepWork => "deep-work",
            ProgressionDomain::Fitness => "fitness",
            ProgressionDomain::VocalPractice => "vocal-practice",
            ProgressionDomain::Photography => "photography",
        }
    }

    pub fn collection(&self) -> Collection {
        match self {
            ProgressionDomain::DeepWork => Collection::DeepWorkSessions,
            ProgressionDomain::Fitness => Collection::ExerciseSessions,
            ProgressionDomain::VocalPractice => Collection::VocalPracticeSessions,
            ProgressionDomain::Photography => Collection::PhotographySessions,
        }
    }
}

impl fmt::Display for ProgressionDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ProgressionDomain {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProgressionDomain::ALL
            .into_iter()
            .find(|d| d.slug() == s)
            .ok_or_else(|| PortError::NotFound(format!("Unknown progression domain '{}'", s)))
    }
}

/// The latest entry of a domain, decoded into its typed record.
#[derive(Debug, Clone, PartialEq)]
pub enum PerformanceEntry {
    DeepWork(DeepWorkSession),
    Fitness(FitnessSession),
    VocalPractice(VocalPracticeSession),
    Photography(PhotographySession),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub summary: String,
    pub level: String,
}

impl PerformanceEntry {
    pub fn decode(domain: ProgressionDomain, doc: &Document) -> PortResult<Self> {
        Ok(match domain {
            ProgressionDomain::DeepWork => PerformanceEntry::DeepWork(doc.decode()?),
            ProgressionDomain::Fitness => PerformanceEntry::Fitness(doc.decode()?),
            ProgressionDomain::VocalPractice => PerformanceEntry::VocalPractice(doc.decode()?),
            ProgressionDomain::Photography => PerformanceEntry::Photography(doc.decode()?),
        })
    }

    /// Summarises the entry; its date reads at `offset`.
    pub fn summarize(&self, offset: FixedOffset) -> PerformanceSummary {
        match self {
            PerformanceEntry::DeepWork(s) => PerformanceSummary {
                summary: format!(
                    "Topic: {}, Confidence: {}/10, Blockages: {}",
                    s.topic,
                    s.confidence_score,
                    or_none(&s.blockage_notes)
                ),
                level: format!("Session on {}", local_date(s.created_at, offset)),
            },
            PerformanceEntry::Fitness(s) => PerformanceSummary {
                summary: s
                    .exercise_details
                    .iter()
                    .map(|line| {
                        let mut text = format!("{}: {}x{}", line.exercise, line.sets, line.reps);
                        if let Some(weight) = line.weight {
                            text.push_str(&format!(" @ {}kg", weight));
                        }
                        if let Some(rpe) = line.rpe {
                            text.push_str(&format!(" (RPE {})", rpe));
                        }
                        text
                    })
                    .collect::<Vec<_>>()
                    .join("; "),
                level: format!("{} on {}", s.routine_name, local_date(s.created_at, offset)),
            },
            PerformanceEntry::VocalPractice(s) => PerformanceSummary {
                summary: format!(
                    "Curriculum: {}, Exercise: {}, Score: {}/10, Struggles: {}",
                    s.curriculum,
                    s.exercise,
                    s.performance_score,
                    or_none(&s.struggle_point_tag)
                ),
                level: format!("Practice on {}", local_date(s.created_at, offset)),
            },
            PerformanceEntry::Photography(s) => PerformanceSummary {
                summary: format!(
                    "Shots: {}, Quality: {}/5, Pipeline: {}, Gaps: {}",
                    s.shot_counter,
                    s.quality_assessment,
                    s.editing_pipeline,
                    or_none(&s.skill_gap_analysis)
                ),
                level: format!("Session on {}", local_date(s.created_at, offset)),
            },
        }
    }
}

fn or_none(text: &str) -> &str {
    if text.trim().is_empty() {
        "None"
    } else {
        text
    }
}

/// The newest entry of the domain, if the user has logged any.
pub async fn latest_entry(
    store: &dyn DocumentStore,
    ctx: &UserContext,
    domain: ProgressionDomain,
) -> PortResult<Option<PerformanceEntry>> {
    let path = CollectionPath::new(&ctx.user_id, domain.collection());
    let docs = store
        .query(
            &CollectionQuery::new(path)
                .order_by(OrderBy::desc("createdAt"))
                .limit(1),
        )
        .await?;
    docs.first()
        .map(|doc| PerformanceEntry::decode(domain, doc))
        .transpose()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionOutcome {
    pub domain: ProgressionDomain,
    pub performance: PerformanceSummary,
    #[serde(flatten)]
    pub suggestion: ProgressionSuggestion,
}

/// Summarises the latest entry and asks the flow for the next level. Fails
/// with `NotFound` before any flow call when nothing has been logged.
pub async fn suggest_progression(
    store: &dyn DocumentStore,
    flow: &dyn AdaptiveProgressionService,
    ctx: &UserContext,
    domain: ProgressionDomain,
    offset: FixedOffset,
) -> PortResult<ProgressionOutcome> {
    let entry = latest_entry(store, ctx, domain).await?.ok_or_else(|| {
        PortError::NotFound(format!(
            "No data available. Please log a session for {} first.",
            domain.label()
        ))
    })?;
    let performance = entry.summarize(offset);
    let request = ProgressionRequest {
        domain: domain.label().to_string(),
        performance_data: performance.summary.clone(),
        current_level: performance.level.clone(),
    };

    info!("Requesting progression for {}", domain);
    let suggestion = flow.suggest_next_level(&request).await.map_err(|e| {
        warn!("Progression flow failed for {}: {}", domain, e);
        e
    })?;
    Ok(ProgressionOutcome {
        domain,
        performance,
        suggestion,
    })
}
