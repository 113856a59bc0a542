// Event fan-out: match workflows against an event and run them

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use leadhub_shared::LeadEvent;

use super::actions::ActionResult;
use super::executor::{ActionExecutor, RunContext};
use super::repository::{Workflow, WorkflowSource};
use crate::services::audit::{AuditLogger, ExecutionRecord};

/// Receives lead events and runs every matching active workflow. Event
/// processing happens on a spawned task so the ingesting request returns
/// immediately.
pub struct Dispatcher {
    workflows: Arc<dyn WorkflowSource>,
    executor: Arc<ActionExecutor>,
    audit: Arc<AuditLogger>,
    run_deadline: Duration,
}

impl Dispatcher {
    pub fn new(
        workflows: Arc<dyn WorkflowSource>,
        executor: Arc<ActionExecutor>,
        audit: Arc<AuditLogger>,
        run_deadline: Duration,
    ) -> Self {
        Self { workflows, executor, audit, run_deadline }
    }

    /// Fire-and-forget entry point used by the ingestion handler.
    pub fn dispatch(self: &Arc<Self>, event: LeadEvent) {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            let records = dispatcher.process_event(&event).await;
            for record in &records {
                if let Err(err) = dispatcher.audit.record(record).await {
                    error!(workflow_id = %record.workflow_id, "audit write failed: {err}");
                }
            }
        });
    }

    /// Match and run all eligible workflows for one event. Matching
    /// failures never exist (matching is pure); run failures surface as
    /// failed results inside the returned records.
    pub async fn process_event(&self, event: &LeadEvent) -> Vec<ExecutionRecord> {
        let workflows = match self.workflows.active_workflows(event.org_id).await {
            Ok(workflows) => workflows,
            Err(err) => {
                error!(org_id = %event.org_id, "workflow load failed, event skipped: {err}");
                return Vec::new();
            }
        };

        let matched: Vec<&Workflow> = workflows
            .iter()
            .filter(|w| w.is_active)
            .filter(|w| w.runs_for_actor(event.actor_user_id))
            .filter(|w| w.matches(event))
            .collect();

        if matched.is_empty() {
            return Vec::new();
        }

        info!(
            org_id = %event.org_id,
            event = event.kind.as_str(),
            count = matched.len(),
            "running matched workflows"
        );

        let runs = matched.into_iter().map(|workflow| self.run_workflow(workflow, event));
        join_all(runs).await
    }

    async fn run_workflow(&self, workflow: &Workflow, event: &LeadEvent) -> ExecutionRecord {
        let mut ctx = RunContext {
            org_id: event.org_id,
            workflow_id: workflow.id,
            actor_user_id: event.actor_user_id,
            lead: event.after.clone(),
        };

        let results = match tokio::time::timeout(
            self.run_deadline,
            self.executor.run(&workflow.actions, &mut ctx),
        )
        .await
        {
            Ok(results) => results,
            Err(_) => {
                error!(workflow_id = %workflow.id, "workflow run exceeded deadline");
                vec![ActionResult::failure("workflow", "run deadline exceeded")]
            }
        };

        ExecutionRecord::new(workflow, event, results)
    }
}
