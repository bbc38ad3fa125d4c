//! crates/life_engine_core/src/projects.rs
//!
//! Projects and their nested tasks. A project's `progress` is whatever was
//! stored; the task summary is derived on every read and never written back.

use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::domain::{Collection, CollectionPath, Document, Fields, Project, Task, UserContext};
use crate::form::create_record;
use crate::ports::{CollectionQuery, DocumentStore, OrderBy, PortResult};
use crate::schema::{ValidationContext, TASK};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub completed: usize,
    pub total: usize,
}

impl TaskSummary {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        Self {
            completed: tasks.iter().filter(|t| t.completed).count(),
            total: tasks.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectOverview {
    #[serde(flatten)]
    pub project: Project,
    pub tasks: Vec<Task>,
    pub task_summary: TaskSummary,
}

impl ProjectOverview {
    pub fn new(project: Project, tasks: Vec<Task>) -> Self {
        let task_summary = TaskSummary::from_tasks(&tasks);
        Self {
            project,
            tasks,
            task_summary,
        }
    }
}

/// Every project, newest first, each with its tasks oldest first.
pub async fn load_projects(
    store: &dyn DocumentStore,
    ctx: &UserContext,
) -> PortResult<Vec<ProjectOverview>> {
    let projects_path = CollectionPath::new(&ctx.user_id, Collection::Projects);
    let docs = store
        .query(&CollectionQuery::new(projects_path).order_by(OrderBy::desc("createdAt")))
        .await?;

    let mut overviews = Vec::with_capacity(docs.len());
    for doc in docs {
        let project: Project = doc.decode()?;
        let tasks = load_tasks(store, ctx, project.id).await?;
        overviews.push(ProjectOverview::new(project, tasks));
    }
    Ok(overviews)
}

pub async fn load_tasks(
    store: &dyn DocumentStore,
    ctx: &UserContext,
    project_id: Uuid,
) -> PortResult<Vec<Task>> {
    let path = CollectionPath::tasks(&ctx.user_id, project_id);
    store
        .query(&CollectionQuery::new(path).order_by(OrderBy::asc("createdAt")))
        .await?
        .iter()
        .map(Document::decode::<Task>)
        .collect()
}

/// Adds a task under an existing project.
pub async fn create_task(
    store: &dyn DocumentStore,
    ctx: &UserContext,
    project_id: Uuid,
    input: &Fields,
) -> PortResult<Document> {
    let projects = CollectionPath::new(&ctx.user_id, Collection::Projects);
    store.get_document(&projects, project_id).await?;
    let path = CollectionPath::tasks(&ctx.user_id, project_id);
    create_record(store, &path, &TASK, input, &ValidationContext::default()).await
}

/// Flips one task's `completed` flag. The parent project is left untouched.
pub async fn toggle_task(
    store: &dyn DocumentStore,
    ctx: &UserContext,
    project_id: Uuid,
    task_id: Uuid,
) -> PortResult<Document> {
    let path = CollectionPath::tasks(&ctx.user_id, project_id);
    let updated = toggle_completed(store, &path, task_id).await?;
    info!("Toggled task {} of project {}", task_id, project_id);
    Ok(updated)
}

/// Reads a document's `completed` flag and writes back its negation.
pub async fn toggle_completed(
    store: &dyn DocumentStore,
    path: &CollectionPath,
    id: Uuid,
) -> PortResult<Document> {
    let current = store.get_document(path, id).await?;
    let completed = current
        .fields
        .get("completed")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let mut patch = Fields::new();
    patch.insert("completed".to_string(), json!(!completed));
    store.update_fields(path, id, patch).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use crate::memory::MemoryStore;
    use crate::ports::PortError;
    use crate::schema::PROJECT;

    fn ctx() -> UserContext {
        UserContext::new(UserId::parse("u1").unwrap())
    }

    fn input(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    async fn seed_project(store: &MemoryStore, name: &str) -> Document {
        create_record(
            store,
            &CollectionPath::new(&ctx().user_id, Collection::Projects),
            &PROJECT,
            &input(json!({"name": name})),
            &ValidationContext::default(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn new_projects_start_on_track_with_zero_progress() {
        let store = MemoryStore::new();
        let doc = seed_project(&store, "Thesis").await;
        let project: Project = doc.decode().unwrap();
        assert_eq!(project.progress, 0);
        assert_eq!(project.status, crate::domain::ProjectStatus::OnTrack);
    }

    #[tokio::test]
    async fn overview_derives_task_summary_without_touching_progress() {
        let store = MemoryStore::new();
        let older = seed_project(&store, "Older").await;
        let newer = seed_project(&store, "Newer").await;
        let first = create_task(&store, &ctx(), newer.id, &input(json!({"title": "Outline"})))
            .await
            .unwrap();
        create_task(&store, &ctx(), newer.id, &input(json!({"title": "Draft"})))
            .await
            .unwrap();
        toggle_task(&store, &ctx(), newer.id, first.id).await.unwrap();

        let overviews = load_projects(&store, &ctx()).await.unwrap();
        assert_eq!(overviews.len(), 2);
        assert_eq!(overviews[0].project.id, newer.id);
        assert_eq!(overviews[1].project.id, older.id);
        assert_eq!(overviews[0].tasks[0].title, "Outline");
        assert_eq!(overviews[0].task_summary, TaskSummary { completed: 1, total: 2 });
        assert_eq!(overviews[0].project.progress, 0);
    }

    #[tokio::test]
    async fn toggling_a_task_touches_only_that_task() {
        let store = MemoryStore::new();
        let project = seed_project(&store, "Garden").await;
        let a = create_task(&store, &ctx(), project.id, &input(json!({"title": "Dig"})))
            .await
            .unwrap();
        let b = create_task(&store, &ctx(), project.id, &input(json!({"title": "Plant"})))
            .await
            .unwrap();

        let mut changes = store.changes();
        let toggled = toggle_task(&store, &ctx(), project.id, a.id).await.unwrap();
        assert_eq!(toggled.fields["completed"], json!(true));

        let event = changes.recv().await.unwrap();
        assert_eq!(event.document_id, a.id);
        assert!(changes.try_recv().is_err());

        let path = CollectionPath::tasks(&ctx().user_id, project.id);
        let untouched = store.get_document(&path, b.id).await.unwrap();
        assert_eq!(untouched, b);
        let projects = CollectionPath::new(&ctx().user_id, Collection::Projects);
        assert_eq!(store.get_document(&projects, project.id).await.unwrap(), project);
    }

    #[tokio::test]
    async fn tasks_need_an_existing_project() {
        let store = MemoryStore::new();
        let err = create_task(&store, &ctx(), Uuid::new_v4(), &input(json!({"title": "x"})))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }
}
