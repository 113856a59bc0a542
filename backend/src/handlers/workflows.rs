use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::AppState;
use crate::automation::{Viewer, Workflow, WorkflowDraft};
use crate::error::{ApiResult, AppError};
use crate::services::audit::ExecutionRecord;

pub fn workflow_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_workflows).post(create_workflow))
        .route(
            "/:id",
            get(get_workflow).put(update_workflow).delete(delete_workflow),
        )
        .route("/:id/active", patch(set_workflow_active))
        .route("/:id/executions", get(workflow_executions))
}

async fn list_workflows(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
) -> ApiResult<Json<Vec<Workflow>>> {
    let workflows = state.repository.list(&viewer).await?;
    Ok(Json(workflows))
}

async fn create_workflow(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Json(draft): Json<WorkflowDraft>,
) -> ApiResult<(StatusCode, Json<Workflow>)> {
    let workflow = state.repository.create(&viewer, draft).await?;
    tracing::info!(workflow_id = %workflow.id, org_id = %viewer.org_id, "workflow created");
    Ok((StatusCode::CREATED, Json(workflow)))
}

async fn get_workflow(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Workflow>> {
    let workflow = state.repository.get(&viewer, id).await?;
    Ok(Json(workflow))
}

async fn update_workflow(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Path(id): Path<Uuid>,
    Json(draft): Json<WorkflowDraft>,
) -> ApiResult<Json<Workflow>> {
    let workflow = state.repository.update(&viewer, id, draft).await?;
    Ok(Json(workflow))
}

async fn delete_workflow(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.repository.delete(&viewer, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct ActiveBody {
    is_active: bool,
}

async fn set_workflow_active(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Path(id): Path<Uuid>,
    Json(body): Json<ActiveBody>,
) -> ApiResult<Json<Workflow>> {
    let workflow = state
        .repository
        .set_active(&viewer, id, body.is_active)
        .await?;
    Ok(Json(workflow))
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    limit: Option<i64>,
}

async fn workflow_executions(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Path(id): Path<Uuid>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<Json<Vec<ExecutionRecord>>> {
    // Visibility check first; history is as private as the workflow.
    state.repository.get(&viewer, id).await?;

    let limit = params.limit.unwrap_or(50).clamp(1, 500);
    let records = state
        .audit
        .history(id, limit)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;
    Ok(Json(records))
}
