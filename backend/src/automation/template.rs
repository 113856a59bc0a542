// Template rendering - closed {{lead.field}} token substitution

use regex::Regex;
use serde_json::Value as JsonValue;
use std::sync::OnceLock;

use leadhub_shared::LeadSnapshot;

static TOKEN_RE: OnceLock<Regex> = OnceLock::new();

fn token_re() -> &'static Regex {
    TOKEN_RE.get_or_init(|| Regex::new(r"\{\{\s*lead\.([A-Za-z0-9_]+)\s*\}\}").unwrap())
}

/// Replace `{{lead.<field>}}` tokens with values from the lead context.
/// Unresolved tokens render as empty string. Pure substitution, no
/// expressions.
pub fn render(template: &str, lead: &LeadSnapshot) -> String {
    token_re()
        .replace_all(template, |caps: &regex::Captures<'_>| {
            lead.field(&caps[1]).map(|v| value_text(&v)).unwrap_or_default()
        })
        .into_owned()
}

fn value_text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
