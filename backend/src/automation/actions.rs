// Action definitions, per-variant config, and webhook payload shaping

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use serde_json::json;
use uuid::Uuid;

use leadhub_shared::LeadSnapshot;

/// One action in a workflow's ordered list. Wire shape is
/// `{ "id": ..., "action_type": ..., "config": { ... } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(flatten)]
    pub op: ActionOp,
}

/// Type-specific action configuration as a tagged union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action_type", content = "config", rename_all = "snake_case")]
pub enum ActionOp {
    Webhook {
        url: String,
        #[serde(default)]
        payload_type: PayloadType,
    },
    ZingbotFlow {
        flow_id: String,
        #[serde(default)]
        target: FlowTarget,
    },
    AssignUser {
        user_id: Assignee,
    },
    UpdateField {
        field_name: String,
        field_value: String,
    },
    AddNote {
        note_text: String,
    },
}

impl Action {
    pub fn new(op: ActionOp) -> Self {
        Self { id: Uuid::new_v4(), op }
    }

    pub fn kind(&self) -> &'static str {
        self.op.kind()
    }
}

impl ActionOp {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Webhook { .. } => "webhook",
            Self::ZingbotFlow { .. } => "zingbot_flow",
            Self::AssignUser { .. } => "assign_user",
            Self::UpdateField { .. } => "update_field",
            Self::AddNote { .. } => "add_note",
        }
    }
}

/// How much of the lead goes into a webhook body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadType {
    #[default]
    Full,
    Basic,
    Custom,
}

/// Whose phone a Zingbot flow is pointed at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowTarget {
    #[default]
    Lead,
    AssignedUser,
}

/// Assignment target: a concrete user id, or the `round_robin` sentinel that
/// delegates to the balancer. Serialized as the plain string the UI sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Assignee {
    RoundRobin,
    User(Uuid),
}

impl TryFrom<String> for Assignee {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "round_robin" {
            return Ok(Self::RoundRobin);
        }
        Uuid::parse_str(&value)
            .map(Self::User)
            .map_err(|_| format!("user_id must be a uuid or 'round_robin', got '{value}'"))
    }
}

impl From<Assignee> for String {
    fn from(value: Assignee) -> Self {
        match value {
            Assignee::RoundRobin => "round_robin".to_string(),
            Assignee::User(id) => id.to_string(),
        }
    }
}

/// Outcome of one executed action. Failures are recorded, never propagated
/// to sibling actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_type: String,
    pub success: bool,
    pub message: String,
}

impl ActionResult {
    pub fn success(action_type: &str, message: impl Into<String>) -> Self {
        Self { action_type: action_type.to_string(), success: true, message: message.into() }
    }

    pub fn failure(action_type: &str, message: impl Into<String>) -> Self {
        Self { action_type: action_type.to_string(), success: false, message: message.into() }
    }
}

/// Build the webhook JSON body for a lead according to the payload type.
pub fn webhook_payload(payload_type: PayloadType, lead: &LeadSnapshot) -> JsonValue {
    match payload_type {
        PayloadType::Full => serde_json::to_value(lead).unwrap_or_default(),
        PayloadType::Basic => json!({
            "id": lead.id,
            "name": lead.name,
            "email": lead.email,
            "phone": lead.phone,
            "company": lead.company,
        }),
        PayloadType::Custom => json!({
            "id": lead.id,
            "custom_fields": lead.custom_data,
        }),
    }
}
