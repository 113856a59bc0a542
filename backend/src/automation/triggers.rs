// Trigger definitions and event matching

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use leadhub_shared::{EventKind, LeadEvent};

use super::conditions::{self, ConditionOperator};

/// One trigger in a workflow: stable id plus the typed rule. Wire shape is
/// `{ "id": ..., "trigger_type": ..., "config": { ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(flatten)]
    pub rule: TriggerRule,
}

/// Type-specific trigger configuration, validated once at the API boundary
/// instead of re-parsed from loose maps on every evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trigger_type", content = "config", rename_all = "snake_case")]
pub enum TriggerRule {
    LeadCreated {},
    StageChanged {
        /// Empty or absent means any destination stage.
        #[serde(default)]
        to_stage: Option<String>,
    },
    Assigned {
        #[serde(default)]
        assign_type: AssignMatch,
        #[serde(default)]
        user_id: Option<Uuid>,
    },
    FieldChanged {
        field_name: String,
        operator: ConditionOperator,
        #[serde(default)]
        field_value: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignMatch {
    #[default]
    Any,
    ToUser,
    ToMe,
}

impl Trigger {
    pub fn new(rule: TriggerRule) -> Self {
        Self { id: Uuid::new_v4(), rule }
    }

    pub fn matches(&self, event: &LeadEvent) -> bool {
        self.rule.matches(event)
    }
}

impl TriggerRule {
    /// Decide whether this trigger is satisfied by the event.
    pub fn matches(&self, event: &LeadEvent) -> bool {
        match self {
            Self::LeadCreated {} => event.kind == EventKind::LeadCreated,
            Self::StageChanged { to_stage } => {
                if event.kind != EventKind::LeadStageChanged {
                    return false;
                }
                match to_stage.as_deref() {
                    None | Some("") => true,
                    Some(stage) => event.after.stage_id.as_deref() == Some(stage),
                }
            }
            Self::Assigned { assign_type, user_id } => {
                if event.kind != EventKind::LeadAssigned {
                    return false;
                }
                match assign_type {
                    AssignMatch::Any => true,
                    AssignMatch::ToUser => {
                        user_id.is_some() && event.after.assigned_to == *user_id
                    }
                    AssignMatch::ToMe => {
                        event.after.assigned_to == Some(event.actor_user_id)
                    }
                }
            }
            Self::FieldChanged { field_name, operator, field_value } => {
                let before = event.before_field(field_name);
                let after = event.after_field(field_name);
                if before == after {
                    return false;
                }
                conditions::evaluate(*operator, after.as_ref(), field_value.as_deref())
            }
        }
    }
}
