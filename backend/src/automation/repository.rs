// Workflow persistence and visibility scoping

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use super::actions::{Action, ActionOp, Assignee};
use super::triggers::Trigger;
use crate::error::{AppError, ApiResult, ValidationBuilder};

use leadhub_shared::LeadEvent;

/// Who a workflow belongs to. Personal workflows run only for events
/// actored by their owner; organization workflows run for everyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowScope {
    Personal,
    Organization,
}

impl WorkflowScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Organization => "organization",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "personal" => Some(Self::Personal),
            "organization" => Some(Self::Organization),
            _ => None,
        }
    }
}

/// The caller on whose behalf a repository operation runs.
#[derive(Debug, Clone, Copy)]
pub struct Viewer {
    pub user_id: Uuid,
    pub org_id: Uuid,
    /// Org admins and managers can see and edit everything in the org.
    pub org_editor: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub scope: WorkflowScope,
    pub owner_user_id: Uuid,
    pub is_shared: bool,
    pub is_active: bool,
    pub triggers: Vec<Trigger>,
    pub actions: Vec<Action>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    /// OR semantics: any one matching trigger fires the workflow.
    pub fn matches(&self, event: &LeadEvent) -> bool {
        self.triggers.iter().any(|t| t.matches(event))
    }

    /// Whether this workflow should run for an event actored by `actor`.
    /// Shared personal workflows are visible org-wide but still execute
    /// only for their owner's events.
    pub fn runs_for_actor(&self, actor_user_id: Uuid) -> bool {
        match self.scope {
            WorkflowScope::Organization => true,
            WorkflowScope::Personal => self.owner_user_id == actor_user_id,
        }
    }

    pub fn visible_to(&self, viewer: &Viewer) -> bool {
        if self.org_id != viewer.org_id {
            return false;
        }
        match self.scope {
            WorkflowScope::Organization => true,
            WorkflowScope::Personal => {
                self.owner_user_id == viewer.user_id || viewer.org_editor || self.is_shared
            }
        }
    }

    pub fn editable_by(&self, viewer: &Viewer) -> bool {
        if self.org_id != viewer.org_id {
            return false;
        }
        self.owner_user_id == viewer.user_id || viewer.org_editor
    }
}

/// Incoming payload for create and full-update. Triggers and actions
/// arrive as the wire-shape arrays and are validated before they touch
/// the database.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub scope: WorkflowScope,
    #[serde(default)]
    pub is_shared: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub triggers: Vec<Trigger>,
    pub actions: Vec<Action>,
}

fn default_active() -> bool {
    true
}

impl WorkflowDraft {
    /// Structural validation applied on every save. A workflow never
    /// reaches the database with zero triggers or zero actions.
    pub fn validate(&self) -> Result<(), AppError> {
        let mut builder = ValidationBuilder::new();

        if self.name.trim().is_empty() {
            builder = builder.error("name", "Name is required");
        }
        if self.triggers.is_empty() {
            builder = builder.error("triggers", "At least one trigger is required");
        }
        if self.actions.is_empty() {
            builder = builder.error("actions", "At least one action is required");
        }

        for action in &self.actions {
            builder = match &action.op {
                ActionOp::Webhook { url, .. } => {
                    if url.starts_with("http://") || url.starts_with("https://") {
                        builder
                    } else {
                        builder.error("actions", "Webhook URL must be http or https")
                    }
                }
                ActionOp::ZingbotFlow { flow_id, .. } => {
                    if flow_id.trim().is_empty() {
                        builder.error("actions", "Zingbot flow id is required")
                    } else {
                        builder
                    }
                }
                ActionOp::AssignUser { user_id: Assignee::User(id) } if id.is_nil() => {
                    builder.error("actions", "Assignment target user is required")
                }
                ActionOp::AssignUser { .. } => builder,
                ActionOp::UpdateField { field_name, .. } => {
                    if field_name.trim().is_empty() {
                        builder.error("actions", "Field name is required")
                    } else {
                        builder
                    }
                }
                ActionOp::AddNote { note_text } => {
                    if note_text.trim().is_empty() {
                        builder.error("actions", "Note text is required")
                    } else {
                        builder
                    }
                }
            };
        }

        match builder.build() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Read side used by the dispatcher. Split from the full repository so
/// event processing can be exercised without a database.
#[async_trait]
pub trait WorkflowSource: Send + Sync {
    async fn active_workflows(&self, org_id: Uuid) -> Result<Vec<Workflow>, sqlx::Error>;
}

#[derive(Clone)]
pub struct WorkflowRepository {
    pool: PgPool,
}

type WorkflowRow = (
    Uuid,
    Uuid,
    String,
    Option<String>,
    String,
    Uuid,
    bool,
    bool,
    JsonValue,
    JsonValue,
    DateTime<Utc>,
    DateTime<Utc>,
);

const WORKFLOW_COLUMNS: &str = "id, org_id, name, description, scope, owner_user_id, \
     is_shared, is_active, triggers, actions, created_at, updated_at";

impl WorkflowRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn from_row(row: WorkflowRow) -> Result<Workflow, AppError> {
        let (
            id,
            org_id,
            name,
            description,
            scope,
            owner_user_id,
            is_shared,
            is_active,
            triggers,
            actions,
            created_at,
            updated_at,
        ) = row;

        let scope = WorkflowScope::parse(&scope)
            .ok_or_else(|| AppError::InternalError(format!("unknown workflow scope '{scope}'")))?;
        let triggers: Vec<Trigger> = serde_json::from_value(triggers)
            .map_err(|e| AppError::InternalError(format!("corrupt trigger config: {e}")))?;
        let actions: Vec<Action> = serde_json::from_value(actions)
            .map_err(|e| AppError::InternalError(format!("corrupt action config: {e}")))?;

        Ok(Workflow {
            id,
            org_id,
            name,
            description,
            scope,
            owner_user_id,
            is_shared,
            is_active,
            triggers,
            actions,
            created_at,
            updated_at,
        })
    }

    pub async fn create(&self, viewer: &Viewer, draft: WorkflowDraft) -> ApiResult<Workflow> {
        draft.validate()?;

        let row: WorkflowRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO workflows
                (id, org_id, name, description, scope, owner_user_id,
                 is_shared, is_active, triggers, actions, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW())
            RETURNING {WORKFLOW_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(viewer.org_id)
        .bind(draft.name.trim())
        .bind(&draft.description)
        .bind(draft.scope.as_str())
        .bind(viewer.user_id)
        .bind(draft.is_shared)
        .bind(draft.is_active)
        .bind(serde_json::to_value(&draft.triggers)?)
        .bind(serde_json::to_value(&draft.actions)?)
        .fetch_one(&self.pool)
        .await?;

        Self::from_row(row)
    }

    pub async fn get(&self, viewer: &Viewer, id: Uuid) -> ApiResult<Workflow> {
        let row: Option<WorkflowRow> = sqlx::query_as(&format!(
            "SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE id = $1 AND org_id = $2"
        ))
        .bind(id)
        .bind(viewer.org_id)
        .fetch_optional(&self.pool)
        .await?;

        let workflow = row
            .map(Self::from_row)
            .transpose()?
            .filter(|w| w.visible_to(viewer))
            .ok_or_else(|| AppError::NotFound("Workflow not found".to_string()))?;

        Ok(workflow)
    }

    /// All workflows the viewer may see, newest first. Visibility is
    /// filtered in process since it mixes scope, ownership, and sharing.
    pub async fn list(&self, viewer: &Viewer) -> ApiResult<Vec<Workflow>> {
        let rows: Vec<WorkflowRow> = sqlx::query_as(&format!(
            "SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE org_id = $1 ORDER BY created_at DESC"
        ))
        .bind(viewer.org_id)
        .fetch_all(&self.pool)
        .await?;

        let mut workflows = Vec::with_capacity(rows.len());
        for row in rows {
            let workflow = Self::from_row(row)?;
            if workflow.visible_to(viewer) {
                workflows.push(workflow);
            }
        }
        Ok(workflows)
    }

    pub async fn update(
        &self,
        viewer: &Viewer,
        id: Uuid,
        draft: WorkflowDraft,
    ) -> ApiResult<Workflow> {
        draft.validate()?;

        let existing = self.get(viewer, id).await?;
        if !existing.editable_by(viewer) {
            return Err(AppError::Forbidden(
                "Only the owner or an org admin can modify this workflow".to_string(),
            ));
        }

        let row: WorkflowRow = sqlx::query_as(&format!(
            r#"
            UPDATE workflows
            SET name = $3, description = $4, scope = $5, is_shared = $6,
                is_active = $7, triggers = $8, actions = $9, updated_at = NOW()
            WHERE id = $1 AND org_id = $2
            RETURNING {WORKFLOW_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(viewer.org_id)
        .bind(draft.name.trim())
        .bind(&draft.description)
        .bind(draft.scope.as_str())
        .bind(draft.is_shared)
        .bind(draft.is_active)
        .bind(serde_json::to_value(&draft.triggers)?)
        .bind(serde_json::to_value(&draft.actions)?)
        .fetch_one(&self.pool)
        .await?;

        Self::from_row(row)
    }

    pub async fn set_active(&self, viewer: &Viewer, id: Uuid, active: bool) -> ApiResult<Workflow> {
        let existing = self.get(viewer, id).await?;
        if !existing.editable_by(viewer) {
            return Err(AppError::Forbidden(
                "Only the owner or an org admin can modify this workflow".to_string(),
            ));
        }

        let row: WorkflowRow = sqlx::query_as(&format!(
            r#"
            UPDATE workflows SET is_active = $3, updated_at = NOW()
            WHERE id = $1 AND org_id = $2
            RETURNING {WORKFLOW_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(viewer.org_id)
        .bind(active)
        .fetch_one(&self.pool)
        .await?;

        Self::from_row(row)
    }

    pub async fn delete(&self, viewer: &Viewer, id: Uuid) -> ApiResult<()> {
        let existing = self.get(viewer, id).await?;
        if !existing.editable_by(viewer) {
            return Err(AppError::Forbidden(
                "Only the owner or an org admin can delete this workflow".to_string(),
            ));
        }

        sqlx::query("DELETE FROM workflows WHERE id = $1 AND org_id = $2")
            .bind(id)
            .bind(viewer.org_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl WorkflowSource for WorkflowRepository {
    async fn active_workflows(&self, org_id: Uuid) -> Result<Vec<Workflow>, sqlx::Error> {
        let rows: Vec<WorkflowRow> = sqlx::query_as(&format!(
            "SELECT {WORKFLOW_COLUMNS} FROM workflows \
             WHERE org_id = $1 AND is_active = true ORDER BY created_at ASC"
        ))
        .bind(org_id)
        .fetch_all(&self.pool)
        .await?;

        // Rows with unreadable configs are skipped rather than failing the
        // whole event.
        Ok(rows
            .into_iter()
            .filter_map(|row| match Self::from_row(row) {
                Ok(workflow) => Some(workflow),
                Err(err) => {
                    tracing::error!("skipping unreadable workflow: {err:?}");
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::triggers::TriggerRule;
    use serde_json::json;

    fn draft(triggers: Vec<Trigger>, actions: Vec<Action>) -> WorkflowDraft {
        WorkflowDraft {
            name: "Welcome flow".into(),
            description: None,
            scope: WorkflowScope::Organization,
            is_shared: false,
            is_active: true,
            triggers,
            actions,
        }
    }

    fn note_action() -> Action {
        Action::new(ActionOp::AddNote { note_text: "hi".into() })
    }

    #[test]
    fn save_requires_a_trigger_and_an_action() {
        let no_triggers = draft(vec![], vec![note_action()]);
        assert!(matches!(no_triggers.validate(), Err(AppError::ValidationError { .. })));

        let no_actions = draft(vec![Trigger::new(TriggerRule::LeadCreated {})], vec![]);
        assert!(matches!(no_actions.validate(), Err(AppError::ValidationError { .. })));

        let ok = draft(vec![Trigger::new(TriggerRule::LeadCreated {})], vec![note_action()]);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn webhook_url_must_be_http() {
        let bad = draft(
            vec![Trigger::new(TriggerRule::LeadCreated {})],
            vec![Action::new(ActionOp::Webhook {
                url: "ftp://example.test/hook".into(),
                payload_type: Default::default(),
            })],
        );
        assert!(bad.validate().is_err());
    }

    #[test]
    fn personal_workflows_hide_from_non_owners_unless_shared() {
        let org_id = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();
        let now = Utc::now();

        let mut workflow = Workflow {
            id: Uuid::new_v4(),
            org_id,
            name: "Mine".into(),
            description: None,
            scope: WorkflowScope::Personal,
            owner_user_id: owner,
            is_shared: false,
            is_active: true,
            triggers: vec![Trigger::new(TriggerRule::LeadCreated {})],
            actions: vec![note_action()],
            created_at: now,
            updated_at: now,
        };

        let peer = Viewer { user_id: other, org_id, org_editor: false };
        let admin = Viewer { user_id: other, org_id, org_editor: true };

        assert!(!workflow.visible_to(&peer));
        assert!(workflow.visible_to(&admin));

        workflow.is_shared = true;
        assert!(workflow.visible_to(&peer));
        // Sharing grants read, not write.
        assert!(!workflow.editable_by(&peer));
        assert!(workflow.editable_by(&admin));
    }

    #[test]
    fn shared_personal_workflow_still_runs_only_for_owner() {
        let owner = Uuid::new_v4();
        let now = Utc::now();
        let workflow = Workflow {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            name: "Mine".into(),
            description: None,
            scope: WorkflowScope::Personal,
            owner_user_id: owner,
            is_shared: true,
            is_active: true,
            triggers: vec![Trigger::new(TriggerRule::LeadCreated {})],
            actions: vec![note_action()],
            created_at: now,
            updated_at: now,
        };

        assert!(workflow.runs_for_actor(owner));
        assert!(!workflow.runs_for_actor(Uuid::new_v4()));
    }

    #[test]
    fn draft_accepts_wire_shape_payload() {
        let draft: WorkflowDraft = serde_json::from_value(json!({
            "name": "New lead intake",
            "scope": "organization",
            "triggers": [
                { "trigger_type": "lead_created", "config": {} }
            ],
            "actions": [
                { "action_type": "add_note", "config": { "note_text": "welcome" } }
            ]
        }))
        .unwrap();

        assert!(draft.validate().is_ok());
        assert!(draft.is_active);
        assert_eq!(draft.actions[0].kind(), "add_note");
    }
}
