// Execution audit trail - append-only record of every workflow run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use leadhub_shared::{EventKind, LeadEvent};

use crate::automation::actions::ActionResult;
use crate::automation::repository::Workflow;

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type AuditResult<T> = Result<T, AuditError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Succeeded,
    Partial,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "succeeded" => Self::Succeeded,
            "partial" => Self::Partial,
            _ => Self::Failed,
        }
    }

    fn classify(results: &[ActionResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        if succeeded == results.len() {
            Self::Succeeded
        } else if succeeded == 0 {
            Self::Failed
        } else {
            Self::Partial
        }
    }
}

/// One workflow run against one event. Success and failure alike are
/// persisted; nothing is silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub workflow_name: String,
    pub event_kind: EventKind,
    pub lead_id: Uuid,
    pub status: ExecutionStatus,
    pub results: Vec<ActionResult>,
    pub executed_at: DateTime<Utc>,
}

impl ExecutionRecord {
    pub fn new(workflow: &Workflow, event: &LeadEvent, results: Vec<ActionResult>) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_id: workflow.id,
            workflow_name: workflow.name.clone(),
            event_kind: event.kind,
            lead_id: event.after.id,
            status: ExecutionStatus::classify(&results),
            results,
            executed_at: Utc::now(),
        }
    }
}

/// Persists execution records and serves the run-history API.
pub struct AuditLogger {
    pool: PgPool,
}

impl AuditLogger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, record: &ExecutionRecord) -> AuditResult<()> {
        sqlx::query(
            r#"
            INSERT INTO workflow_executions
            (id, workflow_id, workflow_name, event_kind, lead_id, status, results, executed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.id)
        .bind(record.workflow_id)
        .bind(&record.workflow_name)
        .bind(record.event_kind.as_str())
        .bind(record.lead_id)
        .bind(record.status.as_str())
        .bind(serde_json::to_value(&record.results)?)
        .bind(record.executed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Recent runs for one workflow, newest first.
    pub async fn history(
        &self,
        workflow_id: Uuid,
        limit: i64,
    ) -> AuditResult<Vec<ExecutionRecord>> {
        type Row = (
            Uuid,
            Uuid,
            String,
            String,
            Uuid,
            String,
            serde_json::Value,
            DateTime<Utc>,
        );

        let rows: Vec<Row> = sqlx::query_as(
            r#"
            SELECT id, workflow_id, workflow_name, event_kind, lead_id, status, results, executed_at
            FROM workflow_executions
            WHERE workflow_id = $1
            ORDER BY executed_at DESC
            LIMIT $2
            "#,
        )
        .bind(workflow_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(
                |(id, workflow_id, workflow_name, kind, lead_id, status, results, executed_at)| {
                    Ok(ExecutionRecord {
                        id,
                        workflow_id,
                        workflow_name,
                        event_kind: parse_event_kind(&kind),
                        lead_id,
                        status: ExecutionStatus::parse(&status),
                        results: serde_json::from_value(results)?,
                        executed_at,
                    })
                },
            )
            .collect()
    }
}

fn parse_event_kind(s: &str) -> EventKind {
    match s {
        "lead_created" => EventKind::LeadCreated,
        "lead_stage_changed" => EventKind::LeadStageChanged,
        "lead_assigned" => EventKind::LeadAssigned,
        _ => EventKind::FieldChanged,
    }
}
