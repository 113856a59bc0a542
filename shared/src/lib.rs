use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use uuid::Uuid;

/// Prefix that routes a field name into a lead's custom-field map.
/// `custom_city` reads and writes `custom_data["city"]`.
pub const CUSTOM_FIELD_PREFIX: &str = "custom_";

/// Kind of lead mutation that produced an event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    LeadCreated,
    LeadStageChanged,
    LeadAssigned,
    FieldChanged,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LeadCreated => "lead_created",
            Self::LeadStageChanged => "lead_stage_changed",
            Self::LeadAssigned => "lead_assigned",
            Self::FieldChanged => "field_changed",
        }
    }
}

/// Point-in-time snapshot of a lead record: standard columns plus the flat
/// custom-field map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadSnapshot {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub stage_id: Option<String>,
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub custom_data: HashMap<String, JsonValue>,
}

impl LeadSnapshot {
    /// Resolve a field by name: standard columns by their column name,
    /// custom fields through the `custom_` prefix. Unknown names yield None.
    pub fn field(&self, name: &str) -> Option<JsonValue> {
        if let Some(key) = name.strip_prefix(CUSTOM_FIELD_PREFIX) {
            return self.custom_data.get(key).cloned();
        }
        match name {
            "id" => Some(JsonValue::String(self.id.to_string())),
            "name" => Some(JsonValue::String(self.name.clone())),
            "email" => self.email.clone().map(JsonValue::String),
            "phone" => self.phone.clone().map(JsonValue::String),
            "company" => self.company.clone().map(JsonValue::String),
            "stage_id" => self.stage_id.clone().map(JsonValue::String),
            "assigned_to" => self.assigned_to.map(|u| JsonValue::String(u.to_string())),
            _ => None,
        }
    }

    /// Write a field by name using the same addressing rules as [`Self::field`].
    /// Writes to unknown standard columns are ignored; the persistence layer
    /// is responsible for rejecting them.
    pub fn set_field(&mut self, name: &str, value: JsonValue) {
        if let Some(key) = name.strip_prefix(CUSTOM_FIELD_PREFIX) {
            self.custom_data.insert(key.to_string(), value);
            return;
        }
        let text = match &value {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Null => None,
            other => Some(other.to_string()),
        };
        match name {
            "name" => self.name = text.unwrap_or_default(),
            "email" => self.email = text,
            "phone" => self.phone = text,
            "company" => self.company = text,
            "stage_id" => self.stage_id = text,
            "assigned_to" => {
                self.assigned_to = text.and_then(|t| Uuid::parse_str(&t).ok());
            }
            _ => {}
        }
    }
}

/// Immutable record of one lead mutation, with full before/after snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub org_id: Uuid,
    pub actor_user_id: Uuid,
    /// Absent for `lead_created` events.
    #[serde(default)]
    pub before: Option<LeadSnapshot>,
    pub after: LeadSnapshot,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl LeadEvent {
    pub fn new(
        kind: EventKind,
        actor_user_id: Uuid,
        before: Option<LeadSnapshot>,
        after: LeadSnapshot,
    ) -> Self {
        Self {
            kind,
            org_id: after.org_id,
            actor_user_id,
            before,
            after,
            timestamp: Utc::now(),
        }
    }

    /// Field value prior to the mutation. A missing snapshot reads as absent.
    pub fn before_field(&self, name: &str) -> Option<JsonValue> {
        self.before.as_ref().and_then(|lead| lead.field(name))
    }

    pub fn after_field(&self, name: &str) -> Option<JsonValue> {
        self.after.field(name)
    }
}

/// Directory entry for an organization member, as supplied by the org/user
/// subsystem.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgUser {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lead() -> LeadSnapshot {
        LeadSnapshot {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            name: "Acme Contact".into(),
            email: Some("contact@acme.test".into()),
            phone: None,
            company: Some("Acme".into()),
            stage_id: Some("new".into()),
            assigned_to: None,
            custom_data: HashMap::from([("city".to_string(), json!("NYC"))]),
        }
    }

    #[test]
    fn field_resolves_standard_columns() {
        let lead = lead();
        assert_eq!(lead.field("name"), Some(json!("Acme Contact")));
        assert_eq!(lead.field("stage_id"), Some(json!("new")));
        assert_eq!(lead.field("phone"), None);
        assert_eq!(lead.field("nonexistent"), None);
    }

    #[test]
    fn field_resolves_custom_prefix() {
        let lead = lead();
        assert_eq!(lead.field("custom_city"), Some(json!("NYC")));
        assert_eq!(lead.field("custom_missing"), None);
    }

    #[test]
    fn set_field_writes_custom_map() {
        let mut lead = lead();
        lead.set_field("custom_city", json!("LA"));
        assert_eq!(lead.custom_data.get("city"), Some(&json!("LA")));
    }

    #[test]
    fn set_field_writes_standard_columns() {
        let mut lead = lead();
        lead.set_field("stage_id", json!("won"));
        assert_eq!(lead.stage_id.as_deref(), Some("won"));

        let user = Uuid::new_v4();
        lead.set_field("assigned_to", json!(user.to_string()));
        assert_eq!(lead.assigned_to, Some(user));
    }

    #[test]
    fn event_wire_shape_uses_type_tag() {
        let after = lead();
        let event = LeadEvent::new(EventKind::LeadCreated, Uuid::new_v4(), None, after);
        let wire = serde_json::to_value(&event).unwrap();
        assert_eq!(wire["type"], json!("lead_created"));
        assert!(wire["before"].is_null());
        let parsed: LeadEvent = serde_json::from_value(wire).unwrap();
        assert_eq!(parsed.kind, EventKind::LeadCreated);
    }
}
