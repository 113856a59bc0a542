// Action execution - sequential, failure-isolated side effects

use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use leadhub_shared::LeadSnapshot;

use super::actions::{
    Action, ActionOp, ActionResult, Assignee, FlowTarget, PayloadType, webhook_payload,
};
use super::balancer::AssignmentBalancer;
use super::store::LeadStore;
use super::template;
use crate::services::users::UserDirectory;
use crate::services::zingbot::ZingbotClient;

/// Mutable state for one workflow run. Seeded from the event's `after`
/// snapshot; actions mutate it in place so later actions observe earlier
/// ones.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub org_id: Uuid,
    pub workflow_id: Uuid,
    pub actor_user_id: Uuid,
    pub lead: LeadSnapshot,
}

/// Executes a workflow's actions in stored order. Every handler returns an
/// [`ActionResult`]; a failure is recorded and the run continues with the
/// next action.
pub struct ActionExecutor {
    store: Arc<dyn LeadStore>,
    users: Arc<dyn UserDirectory>,
    balancer: Arc<AssignmentBalancer>,
    zingbot: ZingbotClient,
    http: reqwest::Client,
}

impl ActionExecutor {
    pub fn new(
        store: Arc<dyn LeadStore>,
        users: Arc<dyn UserDirectory>,
        balancer: Arc<AssignmentBalancer>,
        zingbot: ZingbotClient,
        webhook_timeout: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(webhook_timeout)
            .build()
            .unwrap_or_default();

        Self { store, users, balancer, zingbot, http }
    }

    /// Run all actions sequentially, continuing past failures.
    pub async fn run(&self, actions: &[Action], ctx: &mut RunContext) -> Vec<ActionResult> {
        let mut results = Vec::with_capacity(actions.len());
        for action in actions {
            let result = self.execute(action, ctx).await;
            if !result.success {
                warn!(
                    workflow_id = %ctx.workflow_id,
                    action = action.kind(),
                    "action failed: {}",
                    result.message
                );
            }
            results.push(result);
        }
        results
    }

    async fn execute(&self, action: &Action, ctx: &mut RunContext) -> ActionResult {
        match &action.op {
            ActionOp::Webhook { url, payload_type } => {
                self.send_webhook(url, *payload_type, &ctx.lead).await
            }
            ActionOp::ZingbotFlow { flow_id, target } => {
                self.invoke_zingbot(flow_id, *target, ctx).await
            }
            ActionOp::AssignUser { user_id } => self.assign_user(*user_id, ctx).await,
            ActionOp::UpdateField { field_name, field_value } => {
                self.update_field(field_name, field_value, ctx).await
            }
            ActionOp::AddNote { note_text } => self.add_note(note_text, ctx).await,
        }
    }

    async fn send_webhook(
        &self,
        url: &str,
        payload_type: PayloadType,
        lead: &LeadSnapshot,
    ) -> ActionResult {
        let body = webhook_payload(payload_type, lead);

        let mut outcome = self.http.post(url).json(&body).send().await;
        if let Err(err) = &outcome {
            // One immediate retry on transport errors; HTTP error statuses
            // are final.
            warn!("webhook delivery to {url} failed ({err}), retrying once");
            outcome = self.http.post(url).json(&body).send().await;
        }

        match outcome {
            Ok(response) if response.status().is_success() => {
                ActionResult::success("webhook", format!("delivered ({})", response.status()))
            }
            Ok(response) => ActionResult::failure(
                "webhook",
                format!("endpoint returned {}", response.status()),
            ),
            Err(err) => ActionResult::failure("webhook", format!("delivery failed: {err}")),
        }
    }

    async fn invoke_zingbot(
        &self,
        flow_id: &str,
        target: FlowTarget,
        ctx: &RunContext,
    ) -> ActionResult {
        let phone = match target {
            FlowTarget::Lead => ctx.lead.phone.clone(),
            FlowTarget::AssignedUser => {
                let Some(user_id) = ctx.lead.assigned_to else {
                    return ActionResult::failure("zingbot_flow", "lead has no assigned user");
                };
                match self.users.get_user(ctx.org_id, user_id).await {
                    Ok(Some(user)) => user.phone,
                    Ok(None) => {
                        return ActionResult::failure("zingbot_flow", "assigned user not found");
                    }
                    Err(err) => {
                        return ActionResult::failure(
                            "zingbot_flow",
                            format!("user lookup failed: {err}"),
                        );
                    }
                }
            }
        };

        let Some(phone) = phone.filter(|p| !p.trim().is_empty()) else {
            return ActionResult::failure("zingbot_flow", "no target phone available");
        };

        match self.zingbot.invoke_flow(flow_id, &phone, ctx.lead.id).await {
            Ok(()) => {
                ActionResult::success("zingbot_flow", format!("flow {flow_id} invoked for {phone}"))
            }
            Err(err) => ActionResult::failure("zingbot_flow", err.to_string()),
        }
    }

    async fn assign_user(&self, assignee: Assignee, ctx: &mut RunContext) -> ActionResult {
        let user_id = match assignee {
            Assignee::User(id) => id,
            Assignee::RoundRobin => {
                let users = match self.users.list_org_users(ctx.org_id).await {
                    Ok(users) => users,
                    Err(err) => {
                        return ActionResult::failure(
                            "assign_user",
                            format!("user directory unavailable: {err}"),
                        );
                    }
                };
                let Some((user, position)) =
                    self.balancer.next(ctx.org_id, ctx.workflow_id, &users)
                else {
                    return ActionResult::failure("assign_user", "no eligible users in org");
                };
                // Rotation state persists best-effort; an unsaved cursor
                // costs fairness across restarts, not correctness.
                if let Err(err) = self
                    .store
                    .save_cursor(ctx.org_id, ctx.workflow_id, position as i64)
                    .await
                {
                    warn!(workflow_id = %ctx.workflow_id, "cursor persistence failed: {err}");
                }
                user.id
            }
        };

        match self.store.assign_lead(ctx.org_id, ctx.lead.id, user_id).await {
            Ok(()) => {
                ctx.lead.assigned_to = Some(user_id);
                ActionResult::success("assign_user", format!("assigned to {user_id}"))
            }
            Err(err) => {
                ActionResult::failure("assign_user", format!("assignment failed: {err}"))
            }
        }
    }

    async fn update_field(
        &self,
        field_name: &str,
        field_value: &str,
        ctx: &mut RunContext,
    ) -> ActionResult {
        let rendered = template::render(field_value, &ctx.lead);
        let value = JsonValue::String(rendered);

        match self
            .store
            .set_lead_field(ctx.org_id, ctx.lead.id, field_name, &value)
            .await
        {
            Ok(()) => {
                ctx.lead.set_field(field_name, value);
                ActionResult::success("update_field", format!("set {field_name}"))
            }
            Err(err) => ActionResult::failure(
                "update_field",
                format!("failed to set {field_name}: {err}"),
            ),
        }
    }

    async fn add_note(&self, note_text: &str, ctx: &RunContext) -> ActionResult {
        let rendered = template::render(note_text, &ctx.lead);

        match self.store.add_note(ctx.org_id, ctx.lead.id, &rendered).await {
            Ok(()) => ActionResult::success("add_note", "note added"),
            Err(err) => ActionResult::failure("add_note", format!("note failed: {err}")),
        }
    }
}
