//! Run orchestration.
//!
//! One run: resolve the trigger date, enumerate clients, and per client
//! acquire a token, fetch the trigger payload, and upload it. Each client is
//! processed independently; failures are recorded in the summary and the
//! batch moves on.

use crate::auth::TokenProvider;
use crate::clients::ClientSource;
use crate::config::Config;
use crate::models::{ClientRecord, RunSummary};
use crate::storage::{self, ObjectMeta, Uploader};
use crate::trigger::TriggerFetcher;
use crate::types::{AppError, AppResult};
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use std::time::Duration;
use tracing::{error, info, warn};

pub struct Archiver {
    config: Config,
    source: ClientSource,
    tokens: TokenProvider,
    fetcher: TriggerFetcher,
    uploader: Box<dyn Uploader>,
}

impl Archiver {
    pub async fn from_config(config: Config) -> AppResult<Self> {
        let http = reqwest::Client::new();
        let source = ClientSource::from_config(&config, http.clone()).await?;
        let tokens = TokenProvider::new(http.clone());
        let fetcher = TriggerFetcher::new(
            http,
            config.api.base_url.clone(),
            Duration::from_secs(config.api.timeout_secs),
        );
        let uploader = storage::from_config(&config.storage)?;

        Ok(Self {
            config,
            source,
            tokens,
            fetcher,
            uploader,
        })
    }

    /// Trigger date for this run: the explicit date when given, otherwise
    /// today plus the configured offset.
    pub fn resolve_date(&self, explicit: Option<NaiveDate>, offset_days: Option<i64>) -> NaiveDate {
        match explicit {
            Some(date) => date,
            None => {
                let offset = offset_days.unwrap_or(self.config.run.date_offset_days);
                Utc::now().date_naive() + ChronoDuration::days(offset)
            }
        }
    }

    pub async fn list_clients(&self) -> AppResult<Vec<ClientRecord>> {
        self.source.get_clients().await
    }

    /// Run one batch. Client discovery failure is fatal; everything after
    /// that is per-client and best-effort.
    pub async fn run_once(&self, trigger_date: NaiveDate, dry_run: bool) -> AppResult<RunSummary> {
        info!(date = %trigger_date, dry_run, "Starting trigger archive run");

        let clients = self.source.get_clients().await?;
        let mut summary = RunSummary::new(trigger_date);
        summary.total_clients = clients.len();

        if clients.is_empty() {
            warn!("No clients found with trigger scope");
            return Ok(summary);
        }

        // Fail the run up front rather than once per client: without a base
        // URL, every client must carry its own trigger URL override.
        if self.config.api.base_url.is_none() {
            if let Some(client) = clients.iter().find(|c| {
                !c.client_id.is_empty()
                    && c.has_scope(&self.config.auth.scope)
                    && c.trigger_url.is_none()
            }) {
                return Err(AppError::Config(format!(
                    "DEX_API_BASE_URL is not set and client {} has no trigger URL",
                    client.client_id
                )));
            }
        }

        for client in &clients {
            if client.client_id.is_empty() {
                warn!(name = client.display_name(), "Skipping client without id");
                summary.skipped_clients += 1;
                continue;
            }
            if !client.has_scope(&self.config.auth.scope) {
                info!(
                    client_id = %client.client_id,
                    scope = %self.config.auth.scope,
                    "Skipping client without required scope"
                );
                summary.skipped_clients += 1;
                continue;
            }

            info!(
                client_id = %client.client_id,
                name = client.display_name(),
                "Processing client"
            );
            match self.archive_client(client, trigger_date, dry_run).await {
                Ok(path) => summary.record_success(&client.client_id, path),
                Err(e) => {
                    error!(client_id = %client.client_id, error = %e, "Client archive failed");
                    summary.record_failure(client, e.to_string());
                }
            }
        }

        info!(
            total = summary.total_clients,
            succeeded = summary.successful_archives,
            failed = summary.failed_archives,
            skipped = summary.skipped_clients,
            "Archive run completed"
        );
        Ok(summary)
    }

    async fn archive_client(
        &self,
        client: &ClientRecord,
        trigger_date: NaiveDate,
        dry_run: bool,
    ) -> AppResult<String> {
        let token = self.resolve_token(client).await?;
        let payload = self
            .fetcher
            .fetch(client, token.as_deref(), trigger_date)
            .await?;

        let key = storage::archive_key(&self.config.storage.prefix, &client.client_id, trigger_date);
        if dry_run {
            info!(client_id = %client.client_id, %key, "Dry run, skipping upload");
            return Ok(format!("dry-run:{key}"));
        }

        let body = serde_json::to_vec_pretty(&payload)?;
        let meta = ObjectMeta::new(&client.client_id, trigger_date);
        self.uploader.upload(&key, &body, &meta).await
    }

    /// Per-client credentials win over the global job credentials; with
    /// neither, the fetch goes out unauthenticated.
    async fn resolve_token(&self, client: &ClientRecord) -> AppResult<Option<String>> {
        let scope = &self.config.auth.scope;

        if let Some((id, secret, url)) = client.own_credentials() {
            return Ok(Some(self.tokens.token(url, id, secret, scope).await?));
        }
        if let Some((id, secret, url)) = self.config.auth.global_credentials() {
            return Ok(Some(self.tokens.token(url, id, secret, scope).await?));
        }
        Ok(None)
    }
}
