use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, State},
    http::{StatusCode, request::Parts},
    response::Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::AppState;
use crate::automation::Viewer;
use crate::error::AppError;

pub mod events;
pub mod workflows;

pub use events::event_routes;
pub use workflows::workflow_routes;

/// Roles that may see and edit every workflow in the org.
const EDITOR_ROLES: &[&str] = &["admin", "manager"];

fn header_uuid(parts: &Parts, name: &str) -> Result<Uuid, AppError> {
    let value = parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized(format!("Missing {name} header")))?;
    Uuid::parse_str(value).map_err(|_| AppError::Unauthorized(format!("Invalid {name} header")))
}

/// Identity comes from the gateway as trusted headers.
#[async_trait]
impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_uuid(parts, "x-user-id")?;
        let org_id = header_uuid(parts, "x-org-id")?;
        let org_editor = parts
            .headers
            .get("x-org-role")
            .and_then(|v| v.to_str().ok())
            .map(|role| EDITOR_ROLES.contains(&role))
            .unwrap_or(false);

        Ok(Viewer { user_id, org_id, org_editor })
    }
}

pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let db_ok = crate::database::health_check(&state.db_pool).await;
    let status = if db_ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (
        status,
        Json(json!({
            "status": if db_ok { "healthy" } else { "degraded" },
            "service": "leadhub-api",
        })),
    )
}
