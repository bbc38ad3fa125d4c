//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::{flow_error_response, port_error_response};
use crate::web::{protocol::subscription_request, state::AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use chrono::{NaiveDate, Utc};
use life_engine_core::binding::CollectionBinding;
use life_engine_core::domain::{Collection, CollectionPath, Document, Fields, UserContext};
use life_engine_core::flows::{CrossDomainInsights, InsightScores};
use life_engine_core::form::{CreationForm, Notification, SubmitOutcome};
use life_engine_core::insights::{generate_insights, load_scores, InsightSources};
use life_engine_core::page::{page_for, pages, DataPage, PageSummary, PageView};
use life_engine_core::ports::{PortError, SortDirection};
use life_engine_core::progression::{suggest_progression, ProgressionDomain, ProgressionOutcome};
use life_engine_core::projects::{create_task, load_projects, toggle_task, ProjectOverview};
use life_engine_core::schedule::{toggle_time_block, ScheduleState, WeekNav, WeeklySchedule};
use life_engine_core::schema::{schema_for, TASK};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        list_pages_handler,
        page_view_handler,
        list_collection_handler,
        create_record_handler,
        schedule_handler,
        toggle_block_handler,
        projects_handler,
        create_task_handler,
        toggle_task_handler,
        progression_handler,
        insight_scores_handler,
        insights_handler,
    ),
    components(
        schemas(HealthResponse, ProgressionPayload, ScoresPayload, InsightsPayload)
    ),
    tags(
        (name = "Life Engine API", description = "Per-user life tracking collections, the weekly schedule and the generative coaching flows.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
}

/// Ordering for a one-shot collection read. Defaults to newest first.
#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CollectionParams {
    /// Field to order by, e.g. `createdAt` or `startTime`.
    pub order: Option<String>,
    /// `asc` or `desc`.
    #[param(value_type = Option<String>)]
    pub direction: Option<SortDirection>,
    pub limit: Option<usize>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScheduleParams {
    /// Any day of the week to show. Defaults to today.
    pub date: Option<NaiveDate>,
    /// `prev`, `next` or `today`, applied to `date`.
    #[param(value_type = Option<String>)]
    pub nav: Option<WeekNav>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResponse {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub schedule: ScheduleState,
}

#[derive(Deserialize, ToSchema)]
pub struct ProgressionPayload {
    /// One of `deep-work`, `fitness`, `vocal-practice`, `photography`.
    pub domain: String,
}

/// Explicit insight scores, each between 0 and 10.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoresPayload {
    pub sleep_quality: f64,
    pub deep_work_performance: f64,
    pub nutrition_score: f64,
    pub exercise_consistency: f64,
}

impl From<ScoresPayload> for InsightScores {
    fn from(p: ScoresPayload) -> Self {
        InsightScores {
            sleep_quality: p.sleep_quality,
            deep_work_performance: p.deep_work_performance,
            nutrition_score: p.nutrition_score,
            exercise_consistency: p.exercise_consistency,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct InsightsPayload {
    /// When omitted the scores are averaged from the user's records.
    #[serde(default)]
    pub scores: Option<ScoresPayload>,
}

#[derive(Serialize)]
pub struct InsightsResponse {
    pub scores: InsightScores,
    #[serde(flatten)]
    pub insights: CrossDomainInsights,
}

//=========================================================================================
// Response Helpers
//=========================================================================================

fn parse_collection(raw: &str) -> Result<Collection, Response> {
    raw.parse::<Collection>().map_err(port_error_response)
}

fn created(document: Document, notification: Notification) -> Response {
    (
        StatusCode::CREATED,
        Json(json!({ "document": document, "notification": notification })),
    )
        .into_response()
}

/// Field errors go back together with what was submitted, so the form can be
/// shown again as entered.
fn invalid(errors: impl Serialize, values: &Fields) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "errors": errors, "values": values })),
    )
        .into_response()
}

fn submit_response(outcome: SubmitOutcome, values: &Fields) -> Response {
    match outcome {
        SubmitOutcome::Created {
            document,
            notification,
        } => created(document, notification),
        SubmitOutcome::Invalid(errors) => invalid(errors, values),
        SubmitOutcome::Failed(notification) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "notification": notification })),
        )
            .into_response(),
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "The service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Lists every domain page with its form schema.
#[utoipa::path(
    get,
    path = "/pages",
    responses(
        (status = 200, description = "One summary per domain page"),
        (status = 400, description = "Missing or invalid x-user-id header")
    ),
    params(("x-user-id" = String, Header, description = "The id of the user."))
)]
pub async fn list_pages_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<Vec<PageSummary>> {
    let offset = app_state.config.schedule_offset;
    Json(pages(offset).iter().map(DataPage::summary).collect())
}

/// Renders a domain page: header plus the history table over the user's records.
#[utoipa::path(
    get,
    path = "/pages/{collection}",
    responses(
        (status = 200, description = "The page header and its history card"),
        (status = 404, description = "Unknown collection or one without a page")
    ),
    params(
        ("collection" = String, Path, description = "Collection name, e.g. `expenseManagements`."),
        ("x-user-id" = String, Header, description = "The id of the user.")
    )
)]
pub async fn page_view_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<UserContext>,
    Path(collection): Path<String>,
) -> Result<Json<PageView>, Response> {
    let collection = parse_collection(&collection)?;
    let page = page_for(collection, app_state.config.schedule_offset).ok_or_else(|| {
        port_error_response(PortError::NotFound(format!(
            "No page is defined for {}",
            collection
        )))
    })?;

    let mut binding =
        CollectionBinding::open(app_state.store.clone(), Some(&ctx), &page.binding_request());
    let snapshot = binding.settled().await;
    Ok(Json(page.render(&snapshot)))
}

/// Reads one of the user's collections in the requested order.
#[utoipa::path(
    get,
    path = "/collections/{collection}",
    responses(
        (status = 200, description = "The matching records"),
        (status = 404, description = "Unknown collection")
    ),
    params(
        ("collection" = String, Path, description = "Collection name, e.g. `timeBlocks`."),
        ("x-user-id" = String, Header, description = "The id of the user."),
        CollectionParams
    )
)]
pub async fn list_collection_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<UserContext>,
    Path(collection): Path<String>,
    Query(params): Query<CollectionParams>,
) -> Result<Json<Vec<Document>>, Response> {
    let collection = parse_collection(&collection)?;
    let request = subscription_request(
        collection,
        Vec::new(),
        params.order,
        params.direction,
        params.limit,
    );
    let documents = app_state
        .store
        .query(&request.resolve(&ctx))
        .await
        .map_err(port_error_response)?;
    Ok(Json(documents))
}

/// Validates form input against the collection's schema and stores one record.
#[utoipa::path(
    post,
    path = "/collections/{collection}",
    request_body(content_type = "application/json", description = "Form values keyed by field name."),
    responses(
        (status = 201, description = "Record created, with a confirmation notification"),
        (status = 404, description = "Unknown collection"),
        (status = 422, description = "Field errors, echoed with the submitted values"),
        (status = 500, description = "The write failed; an error notification is returned")
    ),
    params(
        ("collection" = String, Path, description = "Collection name, e.g. `sleepOptimizations`."),
        ("x-user-id" = String, Header, description = "The id of the user.")
    )
)]
pub async fn create_record_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<UserContext>,
    Path(collection): Path<String>,
    Json(input): Json<Fields>,
) -> Response {
    let collection = match parse_collection(&collection) {
        Ok(collection) => collection,
        Err(response) => return response,
    };
    let path = CollectionPath::new(&ctx.user_id, collection);

    let mut form = CreationForm::new(schema_for(collection), app_state.validation_context());
    form.open();
    for (field, value) in input {
        form.set(&field, value);
    }
    let outcome = form.submit(app_state.store.as_ref(), &path).await;
    submit_response(outcome, form.values())
}

/// The time blocks of one Monday-to-Sunday week, laid out on the grid.
#[utoipa::path(
    get,
    path = "/schedule",
    responses(
        (status = 200, description = "The week window and its schedule state")
    ),
    params(
        ("x-user-id" = String, Header, description = "The id of the user."),
        ScheduleParams
    )
)]
pub async fn schedule_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<UserContext>,
    Query(params): Query<ScheduleParams>,
) -> Result<Json<ScheduleResponse>, Response> {
    let offset = app_state.config.schedule_offset;
    let today = Utc::now().with_timezone(&offset).date_naive();

    let mut schedule = WeeklySchedule::new(params.date.unwrap_or(today), offset);
    if let Some(nav) = params.nav {
        schedule.navigate(nav, today).map_err(port_error_response)?;
    }
    let state = schedule.refresh(app_state.store.as_ref(), &ctx).await.clone();
    let window = schedule.window();

    Ok(Json(ScheduleResponse {
        window_start: window.start(),
        window_end: window.end(),
        schedule: state,
    }))
}

/// Flips a time block's `completed` flag.
#[utoipa::path(
    post,
    path = "/schedule/blocks/{id}/toggle",
    responses(
        (status = 200, description = "The updated time block"),
        (status = 404, description = "No such time block")
    ),
    params(
        ("id" = Uuid, Path, description = "The time block id."),
        ("x-user-id" = String, Header, description = "The id of the user.")
    )
)]
pub async fn toggle_block_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<UserContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<Document>, Response> {
    toggle_time_block(app_state.store.as_ref(), &ctx, id)
        .await
        .map(Json)
        .map_err(port_error_response)
}

/// Every project, newest first, with its tasks and task summary.
#[utoipa::path(
    get,
    path = "/projects",
    responses((status = 200, description = "Projects with their tasks")),
    params(("x-user-id" = String, Header, description = "The id of the user."))
)]
pub async fn projects_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<UserContext>,
) -> Result<Json<Vec<ProjectOverview>>, Response> {
    load_projects(app_state.store.as_ref(), &ctx)
        .await
        .map(Json)
        .map_err(port_error_response)
}

/// Adds a task to a project.
#[utoipa::path(
    post,
    path = "/projects/{id}/tasks",
    request_body(content_type = "application/json", description = "`{\"title\": \"...\"}`"),
    responses(
        (status = 201, description = "Task created"),
        (status = 404, description = "No such project"),
        (status = 422, description = "Field errors, echoed with the submitted values")
    ),
    params(
        ("id" = Uuid, Path, description = "The project id."),
        ("x-user-id" = String, Header, description = "The id of the user.")
    )
)]
pub async fn create_task_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<UserContext>,
    Path(project_id): Path<Uuid>,
    Json(input): Json<Fields>,
) -> Response {
    match create_task(app_state.store.as_ref(), &ctx, project_id, &input).await {
        Ok(document) => created(document, Notification::created(TASK.noun)),
        Err(PortError::Validation(errors)) => invalid(errors, &input),
        Err(e) => port_error_response(e),
    }
}

/// Flips one task's `completed` flag.
#[utoipa::path(
    post,
    path = "/projects/{id}/tasks/{task_id}/toggle",
    responses(
        (status = 200, description = "The updated task"),
        (status = 404, description = "No such task")
    ),
    params(
        ("id" = Uuid, Path, description = "The project id."),
        ("task_id" = Uuid, Path, description = "The task id."),
        ("x-user-id" = String, Header, description = "The id of the user.")
    )
)]
pub async fn toggle_task_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<UserContext>,
    Path((project_id, task_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Document>, Response> {
    toggle_task(app_state.store.as_ref(), &ctx, project_id, task_id)
        .await
        .map(Json)
        .map_err(port_error_response)
}

/// Suggests the next challenge level from the domain's latest entry.
#[utoipa::path(
    post,
    path = "/progression",
    request_body = ProgressionPayload,
    responses(
        (status = 200, description = "The summarised performance and the suggestion"),
        (status = 404, description = "Unknown domain, or nothing logged for it yet"),
        (status = 502, description = "The generative flow failed")
    ),
    params(("x-user-id" = String, Header, description = "The id of the user."))
)]
pub async fn progression_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<UserContext>,
    Json(payload): Json<ProgressionPayload>,
) -> Result<Json<ProgressionOutcome>, Response> {
    let domain: ProgressionDomain = payload.domain.parse().map_err(port_error_response)?;
    suggest_progression(
        app_state.store.as_ref(),
        app_state.progression.as_ref(),
        &ctx,
        domain,
        app_state.config.schedule_offset,
    )
    .await
    .map(Json)
    .map_err(flow_error_response)
}

/// The four averaged domain scores the insights flow works from.
#[utoipa::path(
    get,
    path = "/insights/scores",
    responses((status = 200, description = "Scores between 0 and 10")),
    params(("x-user-id" = String, Header, description = "The id of the user."))
)]
pub async fn insight_scores_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<UserContext>,
) -> Result<Json<InsightScores>, Response> {
    load_scores(app_state.store.as_ref(), &ctx)
        .await
        .map(Json)
        .map_err(port_error_response)
}

/// Correlates the domain scores into insights and recommendations.
#[utoipa::path(
    post,
    path = "/insights",
    request_body = InsightsPayload,
    responses(
        (status = 200, description = "The scores used, with insights and recommendations"),
        (status = 422, description = "A score outside 0 to 10"),
        (status = 500, description = "A source collection could not be read"),
        (status = 502, description = "The generative flow failed")
    ),
    params(("x-user-id" = String, Header, description = "The id of the user."))
)]
pub async fn insights_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(ctx): Extension<UserContext>,
    Json(payload): Json<InsightsPayload>,
) -> Result<Json<InsightsResponse>, Response> {
    let scores = match payload.scores {
        Some(explicit) => explicit.into(),
        None => {
            let mut sources = InsightSources::open(app_state.store.clone(), Some(&ctx));
            sources
                .settled_scores()
                .await
                .map_err(port_error_response)?
        }
    };
    info!("Generating insights for user {}", ctx.user_id);

    let insights = generate_insights(app_state.insights.as_ref(), &scores)
        .await
        .map_err(flow_error_response)?;
    Ok(Json(InsightsResponse { scores, insights }))
}
