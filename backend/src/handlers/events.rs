use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use serde_json::json;
use std::sync::Arc;

use leadhub_shared::LeadEvent;

use crate::AppState;
use crate::error::{ApiResult, AppError};

pub fn event_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", post(ingest_event))
}

/// Accept a lead event and hand it to the dispatcher. The response does
/// not wait for workflow runs; matching and execution happen on a
/// background task.
async fn ingest_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<LeadEvent>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    if event.after.org_id != event.org_id {
        return Err(AppError::BadRequest(
            "Event org_id does not match the lead snapshot".to_string(),
        ));
    }

    tracing::debug!(
        org_id = %event.org_id,
        event = event.kind.as_str(),
        lead_id = %event.after.id,
        "lead event accepted"
    );

    state.dispatcher.dispatch(event);

    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "accepted" }))))
}
