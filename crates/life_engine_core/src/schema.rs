//! crates/life_engine_core/src/schema.rs
//!
//! The record schema layer. Each domain collection has one canonical
//! `RecordSchema` that creation forms validate against and that form
//! descriptors are generated from.

use chrono::{FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use serde::Serialize;
use serde_json::{json, Number, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::{Collection, Fields};

//=========================================================================================
// Field Errors
//=========================================================================================

/// Field-level validation messages keyed by field path (`exerciseDetails.0.sets`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn remove(&mut self, field: &str) {
        self.0.remove(field);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn merge(&mut self, other: FieldErrors) {
        for (field, message) in other.0 {
            self.insert(field, message);
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
        f.write_str(&parts.join("; "))
    }
}

//=========================================================================================
// Field Specifications
//=========================================================================================

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Integer { min: Option<i64>, max: Option<i64> },
    Decimal { min: Option<f64>, max: Option<f64> },
    Choice { options: &'static [&'static str] },
    /// `HH:MM`, stored normalised.
    ClockTime,
    /// `YYYY-MM-DD`.
    Date,
    /// An array of strings, or a comma separated string.
    TextList,
    /// A nested list of sub-records, e.g. the exercise lines of a workout.
    Rows {
        fields: &'static [FieldSpec],
        min_rows: usize,
    },
}

/// What an absent optional field is stored as.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Fallback {
    /// `""` for text, `null` for numbers, `[]` for lists.
    Empty,
    Text(&'static str),
    Integer(i64),
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub fallback: Fallback,
}

impl FieldSpec {
    pub const fn required(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: true,
            fallback: Fallback::Empty,
        }
    }

    pub const fn optional(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: false,
            fallback: Fallback::Empty,
        }
    }

    pub const fn with_fallback(self, fallback: Fallback) -> Self {
        Self { fallback, ..self }
    }

    fn empty_value(&self) -> Value {
        match (self.fallback, self.kind) {
            (Fallback::Text(text), _) => json!(text),
            (Fallback::Integer(n), _) => json!(n),
            (Fallback::Empty, FieldKind::Integer { .. } | FieldKind::Decimal { .. }) => Value::Null,
            (Fallback::Empty, FieldKind::TextList | FieldKind::Rows { .. }) => json!([]),
            (Fallback::Empty, _) => json!(""),
        }
    }
}

/// Context a schema needs beyond the raw input.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext {
    /// The offset used to turn form dates and clock times into instants.
    pub utc_offset: FixedOffset,
}

impl Default for ValidationContext {
    fn default() -> Self {
        Self {
            utc_offset: Utc.fix(),
        }
    }
}

type FinishFn = fn(&mut Fields, &ValidationContext) -> Result<(), FieldErrors>;

/// A canonical record shape.
#[derive(Debug, Serialize)]
pub struct RecordSchema {
    /// Singular display noun, e.g. "Deep work session".
    pub noun: &'static str,
    pub fields: &'static [FieldSpec],
    /// Values every new record starts with and the user never supplies.
    #[serde(skip)]
    pub constants: &'static [(&'static str, bool)],
    /// Cross-field checks and derived values, run after per-field coercion.
    #[serde(skip)]
    pub finish: Option<FinishFn>,
}

impl RecordSchema {
    /// Validates raw form input and returns exactly the fields to store.
    ///
    /// Unknown keys (including `id`, `userId` and `createdAt`) are ignored, so
    /// the result never carries anything the schema does not name.
    pub fn validate(&self, input: &Fields, ctx: &ValidationContext) -> Result<Fields, FieldErrors> {
        let mut out = validate_fields(self.fields, input, "")?;
        for (name, value) in self.constants {
            out.insert((*name).to_string(), Value::Bool(*value));
        }
        if let Some(finish) = self.finish {
            finish(&mut out, ctx)?;
        }
        Ok(out)
    }
}

fn validate_fields(
    specs: &[FieldSpec],
    input: &Fields,
    prefix: &str,
) -> Result<Fields, FieldErrors> {
    let mut out = Fields::new();
    let mut errors = FieldErrors::new();

    for spec in specs {
        let key = format!("{}{}", prefix, spec.name);
        let raw = input.get(spec.name).filter(|v| !is_blank(v));
        match raw {
            None if spec.required => errors.insert(key, format!("{} is required", spec.label)),
            None => {
                out.insert(spec.name.to_string(), spec.empty_value());
            }
            Some(raw) => match coerce(spec, raw, &key) {
                Ok(value) => {
                    out.insert(spec.name.to_string(), value);
                }
                Err(nested) => errors.merge(nested),
            },
        }
    }

    if errors.is_empty() {
        Ok(out)
    } else {
        Err(errors)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn single(key: &str, message: String) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.insert(key, message);
    errors
}

fn coerce(spec: &FieldSpec, raw: &Value, key: &str) -> Result<Value, FieldErrors> {
    let label = spec.label;
    match spec.kind {
        FieldKind::Text => match raw {
            Value::String(s) => Ok(json!(s.trim())),
            Value::Number(n) => Ok(json!(n.to_string())),
            _ => Err(single(key, format!("{} must be text", label))),
        },
        FieldKind::Integer { min, max } => {
            let n = as_number(raw)
                .filter(|n| n.fract() == 0.0)
                .ok_or_else(|| single(key, format!("{} must be a whole number", label)))?;
            // `i64::MAX as f64` rounds up to 2^63, which is already out of range.
            if n < i64::MIN as f64 || n >= i64::MAX as f64 {
                return Err(single(key, format!("{} is out of range", label)));
            }
            let n = n as i64;
            if let Some(min) = min.filter(|min| n < *min) {
                return Err(single(key, format!("{} must be at least {}", label, min)));
            }
            if let Some(max) = max.filter(|max| n > *max) {
                return Err(single(key, format!("{} must be at most {}", label, max)));
            }
            Ok(json!(n))
        }
        FieldKind::Decimal { min, max } => {
            let n = as_number(raw)
                .ok_or_else(|| single(key, format!("{} must be a number", label)))?;
            if let Some(min) = min.filter(|min| n < *min) {
                return Err(single(key, format!("{} must be at least {}", label, min)));
            }
            if let Some(max) = max.filter(|max| n > *max) {
                return Err(single(key, format!("{} must be at most {}", label, max)));
            }
            Number::from_f64(n)
                .map(Value::Number)
                .ok_or_else(|| single(key, format!("{} must be a number", label)))
        }
        FieldKind::Choice { options } => {
            let chosen = raw.as_str().map(str::trim).unwrap_or_default();
            if options.contains(&chosen) {
                Ok(json!(chosen))
            } else {
                Err(single(
                    key,
                    format!("{} must be one of: {}", label, options.join(", ")),
                ))
            }
        }
        FieldKind::ClockTime => raw
            .as_str()
            .and_then(|s| NaiveTime::parse_from_str(s.trim(), "%H:%M").ok())
            .map(|t| json!(t.format("%H:%M").to_string()))
            .ok_or_else(|| single(key, format!("{} must be a time in HH:MM format", label))),
        FieldKind::Date => raw
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
            .map(|d| json!(d.format("%Y-%m-%d").to_string()))
            .ok_or_else(|| single(key, format!("{} must be a date in YYYY-MM-DD format", label))),
        FieldKind::TextList => {
            let items: Vec<String> = match raw {
                Value::Array(items) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                Value::String(s) => s
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                _ => return Err(single(key, format!("{} must be a list of text", label))),
            };
            Ok(json!(items))
        }
        FieldKind::Rows { fields, min_rows } => {
            let rows = raw
                .as_array()
                .ok_or_else(|| single(key, format!("{} must be a list", label)))?;
            if rows.len() < min_rows {
                return Err(single(
                    key,
                    format!("Add at least {} {}", min_rows, label.to_lowercase()),
                ));
            }
            let mut out = Vec::with_capacity(rows.len());
            let mut errors = FieldErrors::new();
            for (index, row) in rows.iter().enumerate() {
                let prefix = format!("{}.{}.", key, index);
                match row.as_object() {
                    Some(row) => match validate_fields(fields, row, &prefix) {
                        Ok(valid) => out.push(Value::Object(valid)),
                        Err(nested) => errors.merge(nested),
                    },
                    None => errors.insert(
                        format!("{}.{}", key, index),
                        "Each entry must be an object",
                    ),
                }
            }
            if errors.is_empty() {
                Ok(Value::Array(out))
            } else {
                Err(errors)
            }
        }
    }
}

fn as_number(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

//=========================================================================================
// Canonical Schemas
//=========================================================================================

pub const TIME_BLOCK_DOMAINS: &[&str] = &[
    "Deep Work",
    "Projects",
    "Fitness",
    "Vocal",
    "Photography",
    "YouTube",
    "Sleep",
    "Nutrition",
    "Expenses",
    "Other",
];

pub const EDITING_PIPELINES: &[&str] = &["Raw", "Basic Edit", "Advanced", "Published"];

pub const WORKFLOW_STAGES: &[&str] = &[
    "Learning",
    "Scripting",
    "Recording",
    "Audio Enhancement",
    "Visual Enhancement",
    "Publishing",
    "Analytics Review",
];

pub const PROJECT_STATUSES: &[&str] = &["On Track", "At Risk", "Completed"];

/// Upper bound for counters that records decode as `u32`.
const COUNT_MAX: i64 = u32::MAX as i64;

const fn int(min: Option<i64>, max: Option<i64>) -> FieldKind {
    FieldKind::Integer { min, max }
}

const fn dec(min: Option<f64>, max: Option<f64>) -> FieldKind {
    FieldKind::Decimal { min, max }
}

const TIME_BLOCK_ID: FieldSpec = FieldSpec::optional("timeBlockId", "Time block", FieldKind::Text);

pub static TIME_BLOCK: RecordSchema = RecordSchema {
    noun: "Time block",
    fields: &[
        FieldSpec::required("description", "Description", FieldKind::Text),
        FieldSpec::required("domain", "Domain", FieldKind::Choice { options: TIME_BLOCK_DOMAINS }),
        FieldSpec::required("date", "Date", FieldKind::Date),
        FieldSpec::required("startTime", "Start time", FieldKind::ClockTime),
        FieldSpec::required("endTime", "End time", FieldKind::ClockTime),
    ],
    constants: &[("completed", false)],
    finish: Some(finish_time_block),
};

/// Combines the form's date and clock times into absolute instants and checks
/// that the block ends after it starts.
fn finish_time_block(fields: &mut Fields, ctx: &ValidationContext) -> Result<(), FieldErrors> {
    let date = fields
        .remove("date")
        .and_then(|v| v.as_str().and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()));
    let time = |fields: &Fields, key: &str| {
        fields
            .get(key)
            .and_then(Value::as_str)
            .and_then(|s| NaiveTime::parse_from_str(s, "%H:%M").ok())
    };
    let (Some(date), Some(start), Some(end)) =
        (date, time(fields, "startTime"), time(fields, "endTime"))
    else {
        return Err(single("date", "Date and times are required".to_string()));
    };

    if end <= start {
        return Err(single("endTime", "End time must be after start time".to_string()));
    }

    let to_instant = |t: NaiveTime| {
        ctx.utc_offset
            .from_local_datetime(&date.and_time(t))
            .single()
            .map(|dt| dt.with_timezone(&Utc))
    };
    let (Some(start), Some(end)) = (to_instant(start), to_instant(end)) else {
        return Err(single("startTime", "Time could not be resolved".to_string()));
    };

    fields.insert("startTime".into(), json!(start));
    fields.insert("endTime".into(), json!(end));
    Ok(())
}

pub static DEEP_WORK_SESSION: RecordSchema = RecordSchema {
    noun: "Deep work session",
    fields: &[
        TIME_BLOCK_ID,
        FieldSpec::required("subject", "Subject", FieldKind::Text),
        FieldSpec::required("topic", "Topic", FieldKind::Text),
        FieldSpec::optional("subtopic", "Subtopic", FieldKind::Text),
        FieldSpec::required("concept", "Concept", FieldKind::Text),
        FieldSpec::required("confidenceScore", "Confidence score", int(Some(1), Some(10))),
        FieldSpec::optional("blockageNotes", "Blockage notes", FieldKind::Text),
    ],
    constants: &[],
    finish: None,
};

static EXERCISE_LINE: [FieldSpec; 6] = [
    FieldSpec::required("exercise", "Exercise name", FieldKind::Text),
    FieldSpec::required("sets", "Sets", int(Some(1), Some(COUNT_MAX))),
    FieldSpec::required("reps", "Reps", int(Some(1), Some(COUNT_MAX))),
    FieldSpec::optional("weight", "Weight", dec(Some(0.0), None)),
    FieldSpec::optional("rpe", "RPE", dec(Some(0.0), Some(10.0))),
    FieldSpec::optional("formNotes", "Form notes", FieldKind::Text),
];

pub static FITNESS_SESSION: RecordSchema = RecordSchema {
    noun: "Workout",
    fields: &[
        FieldSpec::required("routineName", "Routine name", FieldKind::Text),
        FieldSpec::required(
            "exerciseDetails",
            "Exercise",
            FieldKind::Rows {
                fields: &EXERCISE_LINE,
                min_rows: 1,
            },
        ),
        FieldSpec::optional("formFeedback", "Form feedback", FieldKind::Text),
        FieldSpec::optional("recoveryNotes", "Recovery notes", FieldKind::Text),
    ],
    constants: &[],
    finish: None,
};

pub static SLEEP_LOG: RecordSchema = RecordSchema {
    noun: "Sleep log",
    fields: &[
        FieldSpec::required("plannedBedtime", "Planned bedtime", FieldKind::ClockTime),
        FieldSpec::required("actualBedtime", "Actual bedtime", FieldKind::ClockTime),
        FieldSpec::required("quality", "Quality", int(Some(1), Some(10))),
        FieldSpec::optional("obstacles", "Obstacles", FieldKind::TextList),
    ],
    constants: &[],
    finish: None,
};

pub static NUTRITION_LOG: RecordSchema = RecordSchema {
    noun: "Meal",
    fields: &[
        FieldSpec::required("mealName", "Meal name", FieldKind::Text),
        FieldSpec::required("calories", "Calories", dec(Some(0.0), None)),
        FieldSpec::required("protein", "Protein", dec(Some(0.0), None)),
        FieldSpec::required("carbs", "Carbs", dec(Some(0.0), None)),
        FieldSpec::required("fat", "Fat", dec(Some(0.0), None)),
    ],
    constants: &[],
    finish: None,
};

pub static EXPENSE: RecordSchema = RecordSchema {
    noun: "Expense",
    fields: &[
        FieldSpec::required("category", "Category", FieldKind::Text),
        FieldSpec::required("description", "Description", FieldKind::Text),
        FieldSpec::required("amount", "Amount", dec(Some(0.0), None)),
    ],
    constants: &[],
    finish: None,
};

pub static PHOTOGRAPHY_SESSION: RecordSchema = RecordSchema {
    noun: "Photography session",
    fields: &[
        TIME_BLOCK_ID,
        FieldSpec::required("shotCounter", "Shot counter", int(Some(1), Some(COUNT_MAX))),
        FieldSpec::required("qualityAssessment", "Quality assessment", int(Some(1), Some(5))),
        FieldSpec::required(
            "editingPipeline",
            "Editing pipeline",
            FieldKind::Choice { options: EDITING_PIPELINES },
        ),
        FieldSpec::optional("skillGapAnalysis", "Skill gap analysis", FieldKind::Text),
    ],
    constants: &[],
    finish: None,
};

pub static VOCAL_PRACTICE_SESSION: RecordSchema = RecordSchema {
    noun: "Vocal session",
    fields: &[
        TIME_BLOCK_ID,
        FieldSpec::required("curriculum", "Curriculum", FieldKind::Text),
        FieldSpec::required("subCurriculum", "Sub-curriculum", FieldKind::Text),
        FieldSpec::required("exercise", "Exercise", FieldKind::Text),
        FieldSpec::required("performanceScore", "Performance score", dec(Some(0.0), Some(10.0))),
        FieldSpec::optional("strugglePointTag", "Struggle point", FieldKind::Text),
    ],
    constants: &[],
    finish: None,
};

pub static YOUTUBE_LECTURE_PRODUCTION: RecordSchema = RecordSchema {
    noun: "Production",
    fields: &[
        TIME_BLOCK_ID,
        FieldSpec::required(
            "workflowStage",
            "Workflow stage",
            FieldKind::Choice { options: WORKFLOW_STAGES },
        ),
        FieldSpec::required("syllabusAlignment", "Syllabus alignment", FieldKind::Text),
        FieldSpec::optional("qualityFeedbackLoop", "Quality feedback", FieldKind::Text),
    ],
    constants: &[],
    finish: None,
};

pub static PROJECT: RecordSchema = RecordSchema {
    noun: "Project",
    fields: &[
        FieldSpec::required("name", "Project name", FieldKind::Text),
        FieldSpec::optional("description", "Description", FieldKind::Text),
        FieldSpec::optional("status", "Status", FieldKind::Choice { options: PROJECT_STATUSES })
            .with_fallback(Fallback::Text("On Track")),
        FieldSpec::optional("progress", "Progress", int(Some(0), Some(100)))
            .with_fallback(Fallback::Integer(0)),
    ],
    constants: &[],
    finish: None,
};

pub static TASK: RecordSchema = RecordSchema {
    noun: "Task",
    fields: &[FieldSpec::required("title", "Title", FieldKind::Text)],
    constants: &[("completed", false)],
    finish: None,
};

/// The canonical schema for a top-level collection.
pub fn schema_for(collection: Collection) -> &'static RecordSchema {
    match collection {
        Collection::TimeBlocks => &TIME_BLOCK,
        Collection::DeepWorkSessions => &DEEP_WORK_SESSION,
        Collection::ExerciseSessions => &FITNESS_SESSION,
        Collection::SleepOptimizations => &SLEEP_LOG,
        Collection::NutritionDiets => &NUTRITION_LOG,
        Collection::ExpenseManagements => &EXPENSE,
        Collection::PhotographySessions => &PHOTOGRAPHY_SESSION,
        Collection::VocalPracticeSessions => &VOCAL_PRACTICE_SESSION,
        Collection::YoutubeLectureProductions => &YOUTUBE_LECTURE_PRODUCTION,
        Collection::Projects => &PROJECT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    // Required fields and coercion

    #[test]
    fn required_fields_are_reported_by_name() {
        let errors = DEEP_WORK_SESSION
            .validate(&input(json!({"subject": "  "})), &ValidationContext::default())
            .unwrap_err();
        assert_eq!(errors.get("subject"), Some("Subject is required"));
        assert_eq!(errors.get("topic"), Some("Topic is required"));
        assert_eq!(errors.get("confidenceScore"), Some("Confidence score is required"));
        assert!(errors.get("subtopic").is_none());
    }

    #[test]
    fn numeric_strings_are_coerced_and_range_checked() {
        let ok = DEEP_WORK_SESSION
            .validate(
                &input(json!({
                    "subject": "Linear Algebra",
                    "topic": "Eigenvalues",
                    "concept": "Finding Eigenvectors",
                    "confidenceScore": "8"
                })),
                &ValidationContext::default(),
            )
            .unwrap();
        assert_eq!(ok["confidenceScore"], json!(8));

        let err = DEEP_WORK_SESSION
            .validate(
                &input(json!({
                    "subject": "s", "topic": "t", "concept": "c", "confidenceScore": 11
                })),
                &ValidationContext::default(),
            )
            .unwrap_err();
        assert_eq!(err.get("confidenceScore"), Some("Confidence score must be at most 10"));
    }

    #[test]
    fn counters_are_capped_at_their_stored_width() {
        let line = |sets: Value| {
            input(json!({
                "routineName": "Push Day",
                "exerciseDetails": [{"exercise": "Bench", "sets": sets, "reps": 10}]
            }))
        };
        let ok = FITNESS_SESSION
            .validate(&line(json!(4_294_967_295u64)), &ValidationContext::default())
            .unwrap();
        assert_eq!(ok["exerciseDetails"][0]["sets"], json!(4_294_967_295u64));

        let err = FITNESS_SESSION
            .validate(&line(json!(5_000_000_000u64)), &ValidationContext::default())
            .unwrap_err();
        assert_eq!(
            err.get("exerciseDetails.0.sets"),
            Some("Sets must be at most 4294967295")
        );

        let err = FITNESS_SESSION
            .validate(&line(json!(1e19)), &ValidationContext::default())
            .unwrap_err();
        assert_eq!(err.get("exerciseDetails.0.sets"), Some("Sets is out of range"));
    }

    #[test]
    fn optional_fields_default_to_empty_values() {
        let fields = FITNESS_SESSION
            .validate(
                &input(json!({
                    "routineName": "Push Day",
                    "exerciseDetails": [{"exercise": "Bench", "sets": 4, "reps": "10"}]
                })),
                &ValidationContext::default(),
            )
            .unwrap();
        assert_eq!(fields["formFeedback"], json!(""));
        let line = &fields["exerciseDetails"][0];
        assert_eq!(line["reps"], json!(10));
        assert_eq!(line["weight"], Value::Null);
        assert_eq!(line["formNotes"], json!(""));
    }

    #[test]
    fn unknown_and_store_owned_keys_are_dropped() {
        let fields = EXPENSE
            .validate(
                &input(json!({
                    "category": "Learning",
                    "description": "Course",
                    "amount": 49.99,
                    "userId": "someone-else",
                    "createdAt": "2020-01-01T00:00:00Z",
                    "extra": true
                })),
                &ValidationContext::default(),
            )
            .unwrap();
        let mut keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["amount", "category", "description"]);
    }

    // Nested rows, lists and choices

    #[test]
    fn nested_rows_report_indexed_errors_and_minimum_count() {
        let ctx = ValidationContext::default();
        let empty = FITNESS_SESSION
            .validate(&input(json!({"routineName": "Legs", "exerciseDetails": []})), &ctx)
            .unwrap_err();
        assert_eq!(empty.get("exerciseDetails"), Some("Add at least 1 exercise"));

        let bad = FITNESS_SESSION
            .validate(
                &input(json!({
                    "routineName": "Legs",
                    "exerciseDetails": [{"exercise": "Squat", "sets": 0, "reps": 5}]
                })),
                &ctx,
            )
            .unwrap_err();
        assert_eq!(bad.get("exerciseDetails.0.sets"), Some("Sets must be at least 1"));
    }

    #[test]
    fn text_lists_accept_comma_separated_strings() {
        let fields = SLEEP_LOG
            .validate(
                &input(json!({
                    "plannedBedtime": "22:00",
                    "actualBedtime": "22:45",
                    "quality": 6,
                    "obstacles": "Stress, Caffeine, "
                })),
                &ValidationContext::default(),
            )
            .unwrap();
        assert_eq!(fields["obstacles"], json!(["Stress", "Caffeine"]));
    }

    #[test]
    fn choices_reject_values_outside_the_option_list() {
        let err = PHOTOGRAPHY_SESSION
            .validate(
                &input(json!({
                    "shotCounter": 40,
                    "qualityAssessment": 3,
                    "editingPipeline": "Draft"
                })),
                &ValidationContext::default(),
            )
            .unwrap_err();
        assert!(err.get("editingPipeline").unwrap().starts_with("Editing pipeline must be one of"));
    }

    #[test]
    fn project_defaults_status_and_progress() {
        let fields = PROJECT
            .validate(&input(json!({"name": "Life Engine"})), &ValidationContext::default())
            .unwrap();
        assert_eq!(fields["status"], json!("On Track"));
        assert_eq!(fields["progress"], json!(0));
        assert_eq!(fields["description"], json!(""));
    }

    // Time blocks

    #[test]
    fn time_block_combines_date_and_times_into_instants() {
        let ctx = ValidationContext {
            utc_offset: FixedOffset::east_opt(2 * 3600).unwrap(),
        };
        let fields = TIME_BLOCK
            .validate(
                &input(json!({
                    "description": "Linear algebra",
                    "domain": "Deep Work",
                    "date": "2024-07-24",
                    "startTime": "09:00",
                    "endTime": "10:30"
                })),
                &ctx,
            )
            .unwrap();
        assert_eq!(fields["startTime"], json!("2024-07-24T07:00:00Z"));
        assert_eq!(fields["endTime"], json!("2024-07-24T08:30:00Z"));
        assert_eq!(fields["completed"], json!(false));
        assert!(!fields.contains_key("date"));
    }

    #[test]
    fn time_block_rejects_end_before_start() {
        let err = TIME_BLOCK
            .validate(
                &input(json!({
                    "description": "x",
                    "domain": "Other",
                    "date": "2024-07-24",
                    "startTime": "10:00",
                    "endTime": "10:00"
                })),
                &ValidationContext::default(),
            )
            .unwrap_err();
        assert_eq!(err.get("endTime"), Some("End time must be after start time"));
    }
}
