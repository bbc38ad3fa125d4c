//! crates/life_engine_core/src/domain.rs
//!
//! Defines the core data structures for the application: the generic stored
//! `Document`, the per-user collection addressing, and the typed domain
//! records that documents decode into.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ports::{PortError, PortResult};

/// The domain fields of a document, keyed by their camelCase field name.
pub type Fields = serde_json::Map<String, Value>;

//=========================================================================================
// Users and Collections
//=========================================================================================

/// An opaque user identifier. It prefixes every storage path the user owns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Parses a user id, rejecting values that would break path addressing.
    pub fn parse(raw: &str) -> PortResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.contains('/') {
            return Err(PortError::Unauthorized);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The explicit request context handed to every component that touches a
/// user's data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: UserId,
}

impl UserContext {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }
}

/// Every top-level per-user collection, one canonical name per domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    #[serde(rename = "timeBlocks")]
    TimeBlocks,
    #[serde(rename = "deepWorkSessions")]
    DeepWorkSessions,
    #[serde(rename = "exerciseSessions")]
    ExerciseSessions,
    #[serde(rename = "sleepOptimizations")]
    SleepOptimizations,
    #[serde(rename = "nutritionDiets")]
    NutritionDiets,
    #[serde(rename = "expenseManagements")]
    ExpenseManagements,
    #[serde(rename = "photographySessions")]
    PhotographySessions,
    #[serde(rename = "vocalPracticeSessions")]
    VocalPracticeSessions,
    #[serde(rename = "youtubeLectureProductions")]
    YoutubeLectureProductions,
    #[serde(rename = "projects")]
    Projects,
}

impl Collection {
    pub const ALL: [Collection; 10] = [
        Collection::TimeBlocks,
        Collection::DeepWorkSessions,
        Collection::ExerciseSessions,
        Collection::SleepOptimizations,
        Collection::NutritionDiets,
        Collection::ExpenseManagements,
        Collection::PhotographySessions,
        Collection::VocalPracticeSessions,
        Collection::YoutubeLectureProductions,
        Collection::Projects,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::TimeBlocks => "timeBlocks",
            Collection::DeepWorkSessions => "deepWorkSessions",
            Collection::ExerciseSessions => "exerciseSessions",
            Collection::SleepOptimizations => "sleepOptimizations",
            Collection::NutritionDiets => "nutritionDiets",
            Collection::ExpenseManagements => "expenseManagements",
            Collection::PhotographySessions => "photographySessions",
            Collection::VocalPracticeSessions => "vocalPracticeSessions",
            Collection::YoutubeLectureProductions => "youtubeLectureProductions",
            Collection::Projects => "projects",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| PortError::NotFound(format!("Unknown collection '{}'", s)))
    }
}

/// A fully qualified collection path such as `users/{uid}/timeBlocks` or
/// `users/{uid}/projects/{pid}/tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    user_id: UserId,
    relative: String,
}

impl CollectionPath {
    pub fn new(user_id: &UserId, collection: Collection) -> Self {
        Self {
            user_id: user_id.clone(),
            relative: collection.as_str().to_string(),
        }
    }

    /// The nested task collection owned by one project.
    pub fn tasks(user_id: &UserId, project_id: Uuid) -> Self {
        Self {
            user_id: user_id.clone(),
            relative: format!("{}/{}/tasks", Collection::Projects.as_str(), project_id),
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "users/{}/{}", self.user_id, self.relative)
    }
}

impl Serialize for CollectionPath {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

//=========================================================================================
// The Generic Stored Document
//=========================================================================================

/// One persisted record: store-assigned `id` and `createdAt`, the owning
/// `userId`, and the schema-validated domain fields flattened alongside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: Fields,
}

/// The calendar date of `at` as seen at `offset`, e.g. `2024-07-24`.
pub fn local_date(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%Y-%m-%d").to_string()
}

/// Keys the store owns. Callers can never write them through domain fields.
pub const RESERVED_KEYS: [&str; 3] = ["id", "userId", "createdAt"];

impl Document {
    /// Looks up a value by key, including the store-owned keys.
    pub fn value(&self, key: &str) -> Option<Value> {
        match key {
            "id" => Some(Value::String(self.id.to_string())),
            "userId" => Some(Value::String(self.user_id.to_string())),
            "createdAt" => serde_json::to_value(self.created_at).ok(),
            _ => self.fields.get(key).cloned(),
        }
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn f64_field(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(Value::as_f64)
    }

    /// Decodes the document into one of the typed domain records.
    pub fn decode<T: DeserializeOwned>(&self) -> PortResult<T> {
        let value = serde_json::to_value(self).map_err(|e| PortError::Unexpected(e.to_string()))?;
        serde_json::from_value(value).map_err(|e| {
            PortError::Unexpected(format!("Document {} has an unexpected shape: {}", self.id, e))
        })
    }
}

//=========================================================================================
// Typed Domain Records
//=========================================================================================

/// A scheduled interval on the weekly calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBlock {
    pub id: Uuid,
    pub user_id: UserId,
    pub description: String,
    pub domain: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepWorkSession {
    pub id: Uuid,
    pub user_id: UserId,
    #[serde(default)]
    pub time_block_id: String,
    pub subject: String,
    pub topic: String,
    #[serde(default)]
    pub subtopic: String,
    pub concept: String,
    pub confidence_score: f64,
    #[serde(default)]
    pub blockage_notes: String,
    pub created_at: DateTime<Utc>,
}

/// One exercise line inside a fitness session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseLog {
    pub exercise: String,
    pub sets: u32,
    pub reps: u32,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub rpe: Option<f64>,
    #[serde(default)]
    pub form_notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitnessSession {
    pub id: Uuid,
    pub user_id: UserId,
    pub routine_name: String,
    pub exercise_details: Vec<ExerciseLog>,
    #[serde(default)]
    pub form_feedback: String,
    #[serde(default)]
    pub recovery_notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepLog {
    pub id: Uuid,
    pub user_id: UserId,
    pub planned_bedtime: String,
    pub actual_bedtime: String,
    pub quality: f64,
    #[serde(default)]
    pub obstacles: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionLog {
    pub id: Uuid,
    pub user_id: UserId,
    pub meal_name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub user_id: UserId,
    pub category: String,
    pub description: String,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotographySession {
    pub id: Uuid,
    pub user_id: UserId,
    #[serde(default)]
    pub time_block_id: String,
    pub shot_counter: u32,
    pub quality_assessment: f64,
    pub editing_pipeline: String,
    #[serde(default)]
    pub skill_gap_analysis: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocalPracticeSession {
    pub id: Uuid,
    pub user_id: UserId,
    #[serde(default)]
    pub time_block_id: String,
    pub curriculum: String,
    pub sub_curriculum: String,
    pub exercise: String,
    pub performance_score: f64,
    #[serde(default)]
    pub struggle_point_tag: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YoutubeLectureProduction {
    pub id: Uuid,
    pub user_id: UserId,
    #[serde(default)]
    pub time_block_id: String,
    pub workflow_stage: String,
    pub syllabus_alignment: String,
    #[serde(default)]
    pub quality_feedback_loop: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[serde(rename = "On Track")]
    OnTrack,
    #[serde(rename = "At Risk")]
    AtRisk,
    #[serde(rename = "Completed")]
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub user_id: UserId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: ProjectStatus,
    /// Stored percentage, 0–100. Never recomputed from tasks on write.
    #[serde(default)]
    pub progress: u8,
    pub created_at: DateTime<Utc>,
}

/// A task inside a project's nested `tasks` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_document() -> Document {
        let mut fields = Fields::new();
        fields.insert("subject".into(), json!("Linear Algebra"));
        fields.insert("topic".into(), json!("Eigenvalues"));
        fields.insert("concept".into(), json!("Finding Eigenvectors"));
        fields.insert("confidenceScore".into(), json!(7));
        Document {
            id: Uuid::new_v4(),
            user_id: UserId::parse("user-1").unwrap(),
            created_at: Utc::now(),
            fields,
        }
    }

    #[test]
    fn user_id_rejects_blank_and_path_separators() {
        assert!(UserId::parse("").is_err());
        assert!(UserId::parse("   ").is_err());
        assert!(UserId::parse("a/b").is_err());
        assert_eq!(UserId::parse(" abc ").unwrap().as_str(), "abc");
    }

    #[test]
    fn collection_paths_are_prefixed_by_the_owner() {
        let uid = UserId::parse("u42").unwrap();
        assert_eq!(
            CollectionPath::new(&uid, Collection::TimeBlocks).to_string(),
            "users/u42/timeBlocks"
        );
        let project = Uuid::nil();
        assert_eq!(
            CollectionPath::tasks(&uid, project).to_string(),
            format!("users/u42/projects/{}/tasks", project)
        );
    }

    #[test]
    fn collection_names_round_trip_through_from_str() {
        for collection in Collection::ALL {
            assert_eq!(collection.as_str().parse::<Collection>().unwrap(), collection);
        }
        assert!("fitness-sessions".parse::<Collection>().is_err());
    }

    #[test]
    fn document_serializes_flat_and_decodes_into_typed_record() {
        let doc = sample_document();
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["userId"], json!("user-1"));
        assert_eq!(value["subject"], json!("Linear Algebra"));

        let session: DeepWorkSession = doc.decode().unwrap();
        assert_eq!(session.topic, "Eigenvalues");
        assert_eq!(session.confidence_score, 7.0);
        assert_eq!(session.subtopic, "");
    }

    #[test]
    fn document_value_exposes_store_owned_keys() {
        let doc = sample_document();
        assert_eq!(doc.value("id"), Some(json!(doc.id.to_string())));
        assert_eq!(doc.value("userId"), Some(json!("user-1")));
        assert!(doc.value("createdAt").is_some());
        assert_eq!(doc.value("missing"), None);
    }
}
