//! crates/life_engine_core/src/page.rs
//!
//! The generic data page: a header with an optional "log new" action and a
//! history card that wraps a table bound to one collection. Every domain page
//! is one `DataPage` value built by `pages()`. Record dates render at the
//! display offset the pages are built for.

use chrono::FixedOffset;
use serde::Serialize;
use serde_json::Value;

use crate::binding::{BindingRequest, BindingSnapshot};
use crate::domain::{local_date, Collection, Document};
use crate::ports::OrderBy;
use crate::schema::{self, RecordSchema};
use crate::table::{display_value, render_table, ColumnDef, EmptyState, TableView};

pub struct DataPage {
    pub title: &'static str,
    pub description: &'static str,
    pub collection: Collection,
    /// Caption of the history card, e.g. "Expense History".
    pub history_title: &'static str,
    pub columns: Vec<ColumnDef<Document>>,
    /// Present when the page can log new records.
    pub form: Option<FormSpec>,
    pub empty: EmptyState,
    pub order_by: OrderBy,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FormSpec {
    /// Label of the header action, e.g. "Log Session".
    pub action: &'static str,
    pub schema: &'static RecordSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageHeader {
    pub title: String,
    pub description: String,
    pub action: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageBody {
    History { title: String, table: TableView },
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageView {
    pub header: PageHeader,
    pub body: PageBody,
}

/// What `/pages` lists: enough for a client to build the header and form.
#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub collection: Collection,
    pub title: &'static str,
    pub description: &'static str,
    pub form: Option<FormSpec>,
}

impl DataPage {
    pub fn binding_request(&self) -> BindingRequest {
        BindingRequest::new(self.collection).order_by(self.order_by.clone())
    }

    pub fn summary(&self) -> PageSummary {
        PageSummary {
            collection: self.collection,
            title: self.title,
            description: self.description,
            form: self.form,
        }
    }

    /// Composes the page from the latest binding snapshot.
    pub fn render(&self, snapshot: &BindingSnapshot) -> PageView {
        let header = PageHeader {
            title: self.title.to_string(),
            description: self.description.to_string(),
            action: self.form.map(|f| f.action.to_string()),
        };
        let body = match &snapshot.error {
            Some(message) => PageBody::Error {
                message: message.clone(),
            },
            None => PageBody::History {
                title: self.history_title.to_string(),
                table: render_table(snapshot.data.as_deref(), &self.columns, &self.empty),
            },
        };
        PageView { header, body }
    }
}

//=========================================================================================
// Cell Renderers
//=========================================================================================

fn date_cell(offset: FixedOffset) -> impl Fn(&Document) -> String + Send + Sync {
    move |doc: &Document| local_date(doc.created_at, offset)
}

fn score_cell(key: &'static str, out_of: u8) -> impl Fn(&Document) -> String + Send + Sync {
    move |doc: &Document| match doc.f64_field(key) {
        Some(score) => format!("{}/{}", score, out_of),
        None => String::new(),
    }
}

fn money_cell(key: &'static str) -> impl Fn(&Document) -> String + Send + Sync {
    move |doc: &Document| format!("${:.2}", doc.f64_field(key).unwrap_or(0.0))
}

/// Optional text and lists read "None" when empty.
fn or_none(key: &'static str) -> impl Fn(&Document) -> String + Send + Sync {
    move |doc: &Document| {
        let text = display_value(doc.fields.get(key));
        if text.is_empty() {
            "None".to_string()
        } else {
            text
        }
    }
}

/// "Squat 3x5 @ 100kg, Plank 3x1" from the session's exercise lines.
pub fn exercise_summary(doc: &Document) -> String {
    let Some(Value::Array(lines)) = doc.fields.get("exerciseDetails") else {
        return String::new();
    };
    lines
        .iter()
        .map(|line| {
            let name = line.get("exercise").and_then(Value::as_str).unwrap_or("Exercise");
            let sets = display_value(line.get("sets"));
            let reps = display_value(line.get("reps"));
            match line.get("weight").and_then(Value::as_f64) {
                Some(weight) => format!("{} {}x{} @ {}kg", name, sets, reps, weight),
                None => format!("{} {}x{}", name, sets, reps),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

//=========================================================================================
// Page Definitions
//=========================================================================================

const LOG_SESSION_HINT: &str = "Click \"Log Session\" to get started.";

pub fn pages(offset: FixedOffset) -> Vec<DataPage> {
    vec![
        DataPage {
            title: "Deep Work",
            description: "Track study sessions, confidence, and blockages.",
            collection: Collection::DeepWorkSessions,
            history_title: "Deep Work History",
            columns: vec![
                ColumnDef::rendered("createdAt", "Date", date_cell(offset)),
                ColumnDef::raw("subject", "Subject"),
                ColumnDef::raw("topic", "Topic"),
                ColumnDef::raw("concept", "Concept"),
                ColumnDef::rendered(
                    "confidenceScore",
                    "Confidence",
                    score_cell("confidenceScore", 10),
                ),
                ColumnDef::rendered("blockageNotes", "Blockages", or_none("blockageNotes")),
            ],
            form: Some(FormSpec {
                action: "Log Session",
                schema: &schema::DEEP_WORK_SESSION,
            }),
            empty: EmptyState {
                icon: "brain-circuit",
                title: "No deep work sessions logged yet.",
                description: LOG_SESSION_HINT,
            },
            order_by: OrderBy::desc("createdAt"),
        },
        DataPage {
            title: "Fitness Optimization",
            description: "Log workouts, track progress, and get intelligent progression.",
            collection: Collection::ExerciseSessions,
            history_title: "Workout History",
            columns: vec![
                ColumnDef::rendered("createdAt", "Date", date_cell(offset)),
                ColumnDef::raw("routineName", "Routine"),
                ColumnDef::rendered("exerciseDetails", "Exercises", exercise_summary),
                ColumnDef::rendered("recoveryNotes", "Recovery", or_none("recoveryNotes")),
            ],
            form: Some(FormSpec {
                action: "Log Workout",
                schema: &schema::FITNESS_SESSION,
            }),
            empty: EmptyState {
                icon: "dumbbell",
                title: "No workouts logged yet.",
                description: "Click \"Log Workout\" to get started.",
            },
            order_by: OrderBy::desc("createdAt"),
        },
        DataPage {
            title: "Sleep Optimization",
            description: "Track actual vs. planned sleep, quality, and obstacles.",
            collection: Collection::SleepOptimizations,
            history_title: "Sleep History",
            columns: vec![
                ColumnDef::rendered("createdAt", "Date", date_cell(offset)),
                ColumnDef::raw("plannedBedtime", "Planned"),
                ColumnDef::raw("actualBedtime", "Actual"),
                ColumnDef::rendered("quality", "Quality", score_cell("quality", 10)),
                ColumnDef::rendered("obstacles", "Obstacles", or_none("obstacles")),
            ],
            form: Some(FormSpec {
                action: "Log Sleep",
                schema: &schema::SLEEP_LOG,
            }),
            empty: EmptyState {
                icon: "bed",
                title: "No sleep logs yet.",
                description: "Click \"Log Sleep\" to add your first entry.",
            },
            order_by: OrderBy::desc("createdAt"),
        },
        DataPage {
            title: "Nutrition",
            description: "Log meals and keep an eye on your macros.",
            collection: Collection::NutritionDiets,
            history_title: "Meal History",
            columns: vec![
                ColumnDef::rendered("createdAt", "Date", date_cell(offset)),
                ColumnDef::raw("mealName", "Meal"),
                ColumnDef::raw("calories", "Calories"),
                ColumnDef::raw("protein", "Protein (g)"),
                ColumnDef::raw("carbs", "Carbs (g)"),
                ColumnDef::raw("fat", "Fat (g)"),
            ],
            form: Some(FormSpec {
                action: "Log Meal",
                schema: &schema::NUTRITION_LOG,
            }),
            empty: EmptyState {
                icon: "utensils",
                title: "No meals logged yet.",
                description: "Click \"Log Meal\" to get started.",
            },
            order_by: OrderBy::desc("createdAt"),
        },
        DataPage {
            title: "Expense Management",
            description: "Track your expenses and manage your budget.",
            collection: Collection::ExpenseManagements,
            history_title: "Expense History",
            columns: vec![
                ColumnDef::rendered("createdAt", "Date", date_cell(offset)),
                ColumnDef::raw("description", "Description"),
                ColumnDef::raw("category", "Category"),
                ColumnDef::rendered("amount", "Amount", money_cell("amount")),
            ],
            form: Some(FormSpec {
                action: "Log Expense",
                schema: &schema::EXPENSE,
            }),
            empty: EmptyState {
                icon: "wallet",
                title: "No expenses logged yet.",
                description: "Click \"Log Expense\" to get started.",
            },
            order_by: OrderBy::desc("createdAt"),
        },
        DataPage {
            title: "Photography",
            description: "Track your photo sessions, ratings, and workflow.",
            collection: Collection::PhotographySessions,
            history_title: "Photography History",
            columns: vec![
                ColumnDef::rendered("createdAt", "Date", date_cell(offset)),
                ColumnDef::raw("shotCounter", "Shots Taken"),
                ColumnDef::rendered(
                    "qualityAssessment",
                    "Quality",
                    score_cell("qualityAssessment", 5),
                ),
                ColumnDef::raw("editingPipeline", "Pipeline"),
                ColumnDef::rendered("skillGapAnalysis", "Skill Gaps", or_none("skillGapAnalysis")),
            ],
            form: Some(FormSpec {
                action: "Log Session",
                schema: &schema::PHOTOGRAPHY_SESSION,
            }),
            empty: EmptyState {
                icon: "camera",
                title: "No photography sessions logged yet.",
                description: LOG_SESSION_HINT,
            },
            order_by: OrderBy::desc("createdAt"),
        },
        DataPage {
            title: "Vocal Practice",
            description: "Track your singing sessions and performance scores.",
            collection: Collection::VocalPracticeSessions,
            history_title: "Practice History",
            columns: vec![
                ColumnDef::rendered("createdAt", "Date", date_cell(offset)),
                ColumnDef::raw("curriculum", "Curriculum"),
                ColumnDef::raw("exercise", "Exercise"),
                ColumnDef::rendered(
                    "performanceScore",
                    "Score",
                    score_cell("performanceScore", 10),
                ),
                ColumnDef::rendered(
                    "strugglePointTag",
                    "Struggle Point",
                    or_none("strugglePointTag"),
                ),
            ],
            form: Some(FormSpec {
                action: "Log Session",
                schema: &schema::VOCAL_PRACTICE_SESSION,
            }),
            empty: EmptyState {
                icon: "mic",
                title: "No vocal sessions logged yet.",
                description: LOG_SESSION_HINT,
            },
            order_by: OrderBy::desc("createdAt"),
        },
        DataPage {
            title: "YouTube Production",
            description: "Track your video creation workflow.",
            collection: Collection::YoutubeLectureProductions,
            history_title: "Production History",
            columns: vec![
                ColumnDef::rendered("createdAt", "Date", date_cell(offset)),
                ColumnDef::raw("syllabusAlignment", "Syllabus Alignment"),
                ColumnDef::raw("workflowStage", "Workflow Stage"),
                ColumnDef::rendered(
                    "qualityFeedbackLoop",
                    "Quality Feedback",
                    or_none("qualityFeedbackLoop"),
                ),
            ],
            form: Some(FormSpec {
                action: "Log Production Entry",
                schema: &schema::YOUTUBE_LECTURE_PRODUCTION,
            }),
            empty: EmptyState {
                icon: "youtube",
                title: "No production entries logged yet.",
                description: "Click \"Log Production Entry\" to get started.",
            },
            order_by: OrderBy::desc("createdAt"),
        },
    ]
}

pub fn page_for(collection: Collection, offset: FixedOffset) -> Option<DataPage> {
    pages(offset).into_iter().find(|page| page.collection == collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Fields, UserId};
    use chrono::{Offset, TimeZone, Utc};
    use serde_json::json;
    use uuid::Uuid;

    fn doc(fields: Value) -> Document {
        Document {
            id: Uuid::new_v4(),
            user_id: UserId::parse("u1").unwrap(),
            created_at: Utc.with_ymd_and_hms(2024, 7, 24, 9, 30, 0).unwrap(),
            fields: fields.as_object().cloned().unwrap_or_else(Fields::new),
        }
    }

    fn utc() -> FixedOffset {
        Utc.fix()
    }

    #[test]
    fn every_domain_collection_has_exactly_one_page() {
        let all = pages(utc());
        for collection in Collection::ALL {
            let count = all.iter().filter(|p| p.collection == collection).count();
            let expected = match collection {
                Collection::TimeBlocks | Collection::Projects => 0,
                _ => 1,
            };
            assert_eq!(count, expected, "{}", collection);
        }
    }

    #[test]
    fn page_forms_use_the_collection_schema() {
        for page in pages(utc()) {
            let form = page.form.unwrap();
            assert!(std::ptr::eq(form.schema, schema::schema_for(page.collection)));
        }
    }

    #[test]
    fn loading_page_has_header_action_and_loading_table() {
        let page = page_for(Collection::ExpenseManagements, utc()).unwrap();
        let view = page.render(&BindingSnapshot {
            data: None,
            loading: true,
            error: None,
        });
        assert_eq!(view.header.action.as_deref(), Some("Log Expense"));
        assert_eq!(
            view.body,
            PageBody::History {
                title: "Expense History".into(),
                table: TableView::Loading,
            }
        );
    }

    #[test]
    fn query_errors_replace_the_history_card() {
        let page = page_for(Collection::SleepOptimizations, utc()).unwrap();
        let view = page.render(&BindingSnapshot {
            data: None,
            loading: false,
            error: Some("permission denied".into()),
        });
        assert_eq!(
            view.body,
            PageBody::Error {
                message: "permission denied".into()
            }
        );
    }

    #[test]
    fn deep_work_rows_use_custom_renderers() {
        let page = page_for(Collection::DeepWorkSessions, utc()).unwrap();
        let view = page.render(&BindingSnapshot {
            data: Some(vec![doc(json!({
                "subject": "Math",
                "topic": "Linear Algebra",
                "concept": "Eigenvectors",
                "confidenceScore": 7,
                "blockageNotes": ""
            }))]),
            loading: false,
            error: None,
        });
        let PageBody::History { table: TableView::Rows { rows, .. }, .. } = view.body else {
            panic!("expected rows");
        };
        assert_eq!(
            rows[0],
            vec!["2024-07-24", "Math", "Linear Algebra", "Eigenvectors", "7/10", "None"]
        );
    }

    #[test]
    fn dates_render_at_the_display_offset() {
        let late = Document {
            created_at: Utc.with_ymd_and_hms(2024, 7, 24, 23, 30, 0).unwrap(),
            ..doc(json!({}))
        };
        let ahead = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(date_cell(utc())(&late), "2024-07-24");
        assert_eq!(date_cell(ahead)(&late), "2024-07-25");
    }

    #[test]
    fn money_and_exercise_cells_format_values() {
        let expense = doc(json!({"amount": 12.5}));
        assert_eq!(money_cell("amount")(&expense), "$12.50");

        let workout = doc(json!({
            "exerciseDetails": [
                {"exercise": "Curl", "sets": 4, "reps": 10, "weight": 13},
                {"exercise": "Plank", "sets": 3, "reps": 1, "weight": null}
            ]
        }));
        assert_eq!(exercise_summary(&workout), "Curl 4x10 @ 13kg, Plank 3x1");
    }
}
