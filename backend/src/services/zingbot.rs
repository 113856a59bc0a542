// Zingbot flow invocation client

use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

use crate::config::ZingbotConfig;

#[derive(Debug, thiserror::Error)]
pub enum ZingbotError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("flow invocation returned status {0}")]
    Status(u16),
}

/// Client for the external Zingbot automation platform. Flows are invoked
/// by id against a phone number; calls carry a hard timeout so a slow
/// endpoint never stalls a workflow run beyond its deadline.
#[derive(Clone)]
pub struct ZingbotClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ZingbotClient {
    pub fn new(config: &ZingbotConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    pub async fn invoke_flow(
        &self,
        flow_id: &str,
        phone: &str,
        lead_id: Uuid,
    ) -> Result<(), ZingbotError> {
        let url = format!("{}/flows/{}/invoke", self.base_url, flow_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "phone": phone, "lead_id": lead_id }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ZingbotError::Status(response.status().as_u16()));
        }

        Ok(())
    }
}
