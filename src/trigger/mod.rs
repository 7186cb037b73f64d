//! Trigger endpoint client.
//!
//! One GET per client against `/data-exchange/trigger`, parameterized by
//! client id and trigger date. The payload stays opaque: whatever JSON the
//! endpoint returns is what gets archived.

use crate::models::ClientRecord;
use crate::types::{AppError, AppResult};
use chrono::NaiveDate;
use std::time::Duration;
use tracing::info;

/// Authorization scope gating trigger archival.
pub const TRIGGER_SCOPE: &str = "dex/trigger:all";

/// Path of the trigger endpoint under the API base URL.
pub const TRIGGER_PATH: &str = "/data-exchange/trigger";

pub struct TriggerFetcher {
    http: reqwest::Client,
    base_url: Option<String>,
    timeout: Duration,
}

impl TriggerFetcher {
    pub fn new(http: reqwest::Client, base_url: Option<String>, timeout: Duration) -> Self {
        Self {
            http,
            base_url,
            timeout,
        }
    }

    /// Trigger endpoint for a client: its own override, or base URL + path.
    fn endpoint_for(&self, client: &ClientRecord) -> AppResult<String> {
        if let Some(url) = client.trigger_url.as_deref() {
            return Ok(url.to_string());
        }
        match self.base_url.as_deref() {
            Some(base) => Ok(format!("{}{}", base.trim_end_matches('/'), TRIGGER_PATH)),
            None => Err(AppError::Config(format!(
                "client {} has no trigger URL and DEX_API_BASE_URL is not set",
                client.client_id
            ))),
        }
    }

    /// Fetch the trigger payload for one client and date.
    pub async fn fetch(
        &self,
        client: &ClientRecord,
        token: Option<&str>,
        trigger_date: NaiveDate,
    ) -> AppResult<serde_json::Value> {
        let url = self.endpoint_for(client)?;
        let date = trigger_date.format("%Y-%m-%d").to_string();

        let mut request = self
            .http
            .get(&url)
            .query(&[
                ("clientId", client.client_id.as_str()),
                ("triggerDate", date.as_str()),
            ])
            .timeout(self.timeout);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::TriggerFetch(format!(
                "{url} returned {status} for client {}",
                client.client_id
            )));
        }

        let payload = response.json::<serde_json::Value>().await?;
        info!(client_id = %client.client_id, %date, "Fetched trigger data");
        Ok(payload)
    }
}
