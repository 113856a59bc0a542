//! Lead automation engine.
//!
//! Workflows pair triggers (OR-matched against lead events) with an
//! ordered list of actions. The [`Dispatcher`] receives events from the
//! ingestion endpoint, finds matching active workflows, and hands each
//! one to the [`ActionExecutor`]; every run lands in the audit log as an
//! execution record.

pub mod actions;
pub mod balancer;
pub mod conditions;
pub mod dispatcher;
pub mod executor;
pub mod repository;
pub mod store;
pub mod template;
pub mod triggers;

#[cfg(test)]
pub mod testing;

pub use actions::{Action, ActionOp, ActionResult};
pub use balancer::AssignmentBalancer;
pub use dispatcher::Dispatcher;
pub use executor::{ActionExecutor, RunContext};
pub use repository::{Viewer, Workflow, WorkflowDraft, WorkflowRepository, WorkflowScope};
pub use store::{LeadStore, PgLeadStore};
pub use triggers::{Trigger, TriggerRule};
