use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::{Client, StatusCode};
use serde::Serialize;

use super::wire::{FetchCommand, FetchReply, ScheduleRecord, UpdateCommand};
use super::{RemoteHandle, SyncError};
use crate::models::settings::RemoteSettings;

/// Remote reached over HTTP: each command is POSTed as JSON to one
/// endpoint.
pub struct HttpScheduleRemote {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpScheduleRemote {
    pub fn new(settings: &RemoteSettings) -> Result<Self> {
        let endpoint = settings
            .endpoint
            .clone()
            .ok_or_else(|| anyhow!("No remote endpoint configured"))?;

        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(anyhow!("Remote endpoint must be an http(s) URL"));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to build schedule HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            token: settings.token.clone(),
        })
    }

    async fn post<T: Serialize>(
        &self,
        schedule_id: &str,
        body: &T,
    ) -> Result<reqwest::Response, SyncError> {
        let mut request = self.client.post(&self.endpoint).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|err| {
            log::warn!(
                "Request to {} failed: {}",
                Self::redact_endpoint(&self.endpoint),
                err
            );
            SyncError::Transport(err.to_string())
        })?;

        match Self::classify_status(response.status(), schedule_id) {
            Some(err) => Err(err),
            None => Ok(response),
        }
    }

    /// Map a non-success status to the error the editor acts on.
    fn classify_status(status: StatusCode, schedule_id: &str) -> Option<SyncError> {
        if status.is_success() {
            return None;
        }
        if status == StatusCode::NOT_FOUND {
            return Some(SyncError::NotFound {
                schedule_id: schedule_id.to_string(),
            });
        }
        if status.is_client_error() {
            return Some(SyncError::Rejected(format!("HTTP status {}", status)));
        }
        Some(SyncError::Transport(format!("HTTP status {}", status)))
    }

    fn redact_endpoint(url: &str) -> String {
        match url.split_once('?') {
            Some((base, _)) => format!("{}?***redacted***", base),
            None => url.to_string(),
        }
    }
}

impl RemoteHandle for HttpScheduleRemote {
    async fn schedule_fetch(&self, schedule_id: &str) -> Result<ScheduleRecord, SyncError> {
        let response = self.post(schedule_id, &FetchCommand::new(schedule_id)).await?;

        let reply: FetchReply = response
            .json()
            .await
            .map_err(|err| SyncError::Malformed(err.to_string()))?;

        reply.into_record().ok_or_else(|| SyncError::NotFound {
            schedule_id: schedule_id.to_string(),
        })
    }

    async fn schedule_update(
        &self,
        schedule_id: &str,
        record: &ScheduleRecord,
    ) -> Result<(), SyncError> {
        self.post(schedule_id, &UpdateCommand::new(schedule_id, record)).await?;
        Ok(())
    }
}
