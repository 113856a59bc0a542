// In-memory doubles and fixtures shared by the automation tests

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use leadhub_shared::{LeadSnapshot, OrgUser};

use super::actions::{Action, ActionOp};
use super::balancer::AssignmentBalancer;
use super::executor::ActionExecutor;
use super::repository::{Workflow, WorkflowScope, WorkflowSource};
use super::store::{LeadStore, StoreResult};
use super::triggers::{Trigger, TriggerRule};
use crate::config::ZingbotConfig;
use crate::services::users::UserDirectory;
use crate::services::zingbot::ZingbotClient;

/// Records every mutation instead of touching Postgres.
#[derive(Default)]
pub struct MemoryLeadStore {
    field_writes: Mutex<Vec<(Uuid, String, JsonValue)>>,
    assignments: Mutex<Vec<(Uuid, Uuid)>>,
    notes: Mutex<Vec<String>>,
    cursors: Mutex<HashMap<(Uuid, Uuid), i64>>,
}

impl MemoryLeadStore {
    pub fn notes(&self) -> Vec<String> {
        self.notes.lock().unwrap().clone()
    }

    pub fn field_writes(&self) -> Vec<(Uuid, String, JsonValue)> {
        self.field_writes.lock().unwrap().clone()
    }

    pub fn assignments(&self) -> Vec<(Uuid, Uuid)> {
        self.assignments.lock().unwrap().clone()
    }

    pub fn cursor(&self, org_id: Uuid, workflow_id: Uuid) -> Option<i64> {
        self.cursors.lock().unwrap().get(&(org_id, workflow_id)).copied()
    }
}

#[async_trait]
impl LeadStore for MemoryLeadStore {
    async fn set_lead_field(
        &self,
        _org_id: Uuid,
        lead_id: Uuid,
        field_name: &str,
        value: &JsonValue,
    ) -> StoreResult<()> {
        self.field_writes.lock().unwrap().push((lead_id, field_name.to_string(), value.clone()));
        Ok(())
    }

    async fn assign_lead(&self, _org_id: Uuid, lead_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        self.assignments.lock().unwrap().push((lead_id, user_id));
        Ok(())
    }

    async fn add_note(&self, _org_id: Uuid, _lead_id: Uuid, text: &str) -> StoreResult<()> {
        self.notes.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn save_cursor(
        &self,
        org_id: Uuid,
        workflow_id: Uuid,
        position: i64,
    ) -> StoreResult<()> {
        self.cursors.lock().unwrap().insert((org_id, workflow_id), position);
        Ok(())
    }

    async fn load_cursors(&self) -> StoreResult<Vec<((Uuid, Uuid), usize)>> {
        Ok(self
            .cursors
            .lock()
            .unwrap()
            .iter()
            .map(|(&key, &position)| (key, position as usize))
            .collect())
    }
}

/// Fixed user list, same order for every call.
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: Vec<OrgUser>,
}

impl MemoryUserDirectory {
    pub fn with_users(count: usize) -> Self {
        let users = (0..count)
            .map(|i| OrgUser {
                id: Uuid::new_v4(),
                name: format!("User {i}"),
                email: Some(format!("user{i}@example.test")),
                phone: Some(format!("+1555123{}", 4 + i)),
            })
            .collect();
        Self { users }
    }

    pub fn users(&self) -> &[OrgUser] {
        &self.users
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn list_org_users(&self, _org_id: Uuid) -> StoreResult<Vec<OrgUser>> {
        Ok(self.users.clone())
    }

    async fn get_user(&self, _org_id: Uuid, user_id: Uuid) -> StoreResult<Option<OrgUser>> {
        Ok(self.users.iter().find(|u| u.id == user_id).cloned())
    }
}

pub struct MemoryWorkflowSource {
    workflows: Vec<Workflow>,
}

impl MemoryWorkflowSource {
    pub fn with(workflows: Vec<Workflow>) -> Self {
        Self { workflows }
    }
}

#[async_trait]
impl WorkflowSource for MemoryWorkflowSource {
    async fn active_workflows(&self, org_id: Uuid) -> Result<Vec<Workflow>, sqlx::Error> {
        Ok(self
            .workflows
            .iter()
            .filter(|w| w.org_id == org_id && w.is_active)
            .cloned()
            .collect())
    }
}

/// Executor wired to memory doubles. The Zingbot base URL points nowhere;
/// tests that exercise Zingbot delivery build their own client.
pub fn executor_with(
    store: Arc<MemoryLeadStore>,
    users: MemoryUserDirectory,
) -> ActionExecutor {
    let zingbot = ZingbotClient::new(&ZingbotConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        api_key: "test-key".to_string(),
        timeout_secs: 1,
    });
    ActionExecutor::new(
        store,
        Arc::new(users),
        Arc::new(AssignmentBalancer::new()),
        zingbot,
        Duration::from_secs(5),
    )
}

pub fn lead() -> LeadSnapshot {
    LeadSnapshot {
        id: Uuid::new_v4(),
        org_id: Uuid::new_v4(),
        name: "Sam Porter".into(),
        email: Some("sam@example.test".into()),
        phone: Some("+15550001".into()),
        company: Some("Porter Logistics".into()),
        stage_id: Some("new".into()),
        assigned_to: None,
        custom_data: HashMap::new(),
    }
}

/// Active org-scoped workflow with a lead_created trigger and no actions.
pub fn workflow(org_id: Uuid) -> Workflow {
    let now = Utc::now();
    Workflow {
        id: Uuid::new_v4(),
        org_id,
        name: "Test workflow".into(),
        description: None,
        scope: WorkflowScope::Organization,
        owner_user_id: Uuid::new_v4(),
        is_shared: false,
        is_active: true,
        triggers: vec![Trigger::new(TriggerRule::LeadCreated {})],
        actions: vec![Action::new(ActionOp::AddNote { note_text: "placeholder".into() })],
        created_at: now,
        updated_at: now,
    }
}
