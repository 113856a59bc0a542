// Lead persistence seam used by the action executor

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use leadhub_shared::CUSTOM_FIELD_PREFIX;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Invalid(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Mutations the engine applies to lead records, plus round-robin cursor
/// persistence. Production uses [`PgLeadStore`]; tests swap in an in-memory
/// implementation.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Set a standard column or (via the `custom_` prefix) a custom field.
    async fn set_lead_field(
        &self,
        org_id: Uuid,
        lead_id: Uuid,
        field_name: &str,
        value: &JsonValue,
    ) -> StoreResult<()>;

    async fn assign_lead(&self, org_id: Uuid, lead_id: Uuid, user_id: Uuid) -> StoreResult<()>;

    async fn add_note(&self, org_id: Uuid, lead_id: Uuid, text: &str) -> StoreResult<()>;

    async fn save_cursor(
        &self,
        org_id: Uuid,
        workflow_id: Uuid,
        position: i64,
    ) -> StoreResult<()>;

    async fn load_cursors(&self) -> StoreResult<Vec<((Uuid, Uuid), usize)>>;
}

/// Standard lead columns writable by `update_field` actions.
const WRITABLE_COLUMNS: &[&str] = &["name", "email", "phone", "company", "stage_id"];

pub struct PgLeadStore {
    pool: PgPool,
}

impl PgLeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadStore for PgLeadStore {
    async fn set_lead_field(
        &self,
        org_id: Uuid,
        lead_id: Uuid,
        field_name: &str,
        value: &JsonValue,
    ) -> StoreResult<()> {
        if let Some(key) = field_name.strip_prefix(CUSTOM_FIELD_PREFIX) {
            sqlx::query(
                r#"
                UPDATE leads
                SET custom_data = jsonb_set(COALESCE(custom_data, '{}'::jsonb), $3, $4, true),
                    updated_at = NOW()
                WHERE id = $1 AND org_id = $2
                "#,
            )
            .bind(lead_id)
            .bind(org_id)
            .bind(vec![key.to_string()])
            .bind(value)
            .execute(&self.pool)
            .await?;
            return Ok(());
        }

        if !WRITABLE_COLUMNS.contains(&field_name) {
            return Err(StoreError::Invalid(format!(
                "'{field_name}' is not a writable lead field"
            )));
        }

        let text = match value {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Null => None,
            other => Some(other.to_string()),
        };

        // Column names come from the whitelist above, never from the caller.
        let query = format!(
            "UPDATE leads SET {field_name} = $3, updated_at = NOW() WHERE id = $1 AND org_id = $2"
        );
        sqlx::query(&query)
            .bind(lead_id)
            .bind(org_id)
            .bind(text)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn assign_lead(&self, org_id: Uuid, lead_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        sqlx::query(
            "UPDATE leads SET assigned_to = $3, updated_at = NOW() WHERE id = $1 AND org_id = $2",
        )
        .bind(lead_id)
        .bind(org_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn add_note(&self, org_id: Uuid, lead_id: Uuid, text: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO lead_notes (id, org_id, lead_id, body, created_by_system, created_at)
            VALUES ($1, $2, $3, $4, true, NOW())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(org_id)
        .bind(lead_id)
        .bind(text)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_cursor(
        &self,
        org_id: Uuid,
        workflow_id: Uuid,
        position: i64,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO workflow_cursors (org_id, workflow_id, position, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (org_id, workflow_id)
            DO UPDATE SET position = $3, updated_at = NOW()
            "#,
        )
        .bind(org_id)
        .bind(workflow_id)
        .bind(position)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_cursors(&self) -> StoreResult<Vec<((Uuid, Uuid), usize)>> {
        let rows: Vec<(Uuid, Uuid, i64)> =
            sqlx::query_as("SELECT org_id, workflow_id, position FROM workflow_cursors")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(org_id, workflow_id, position)| {
                ((org_id, workflow_id), position.max(0) as usize)
            })
            .collect())
    }
}
