//! Status notification backends.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use uuid::Uuid;

use crate::deployments::models::Deployment;
use crate::deployments::service::StatusNotifier;
use crate::error::{Error, Result};
use crate::settings::NotifierSettings;

/// Channel token for collaborators that multiplex notifications per
/// deployment, e.g. a pub/sub dashboard feed.
pub fn deployment_channel(id: Uuid) -> String {
    format!("private-deployments-{}", id)
}

/// Delivers status notifications as JSON to a configured webhook endpoint,
/// e.g. a chat integration. Transport failures and non-2xx responses surface
/// as [`Error::Notification`]; no retry is performed.
pub struct WebhookNotifier {
    client: Client,
    endpoint: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct StatusPayload<'a> {
    status: &'a str,
    repo: &'a str,
    sha: &'a str,
    #[serde(rename = "ref")]
    git_ref: &'a str,
    environment: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

impl WebhookNotifier {
    /// `base_url` is the public URL deployments are viewed under; it is
    /// injected here rather than read from process-wide state.
    pub fn new(endpoint: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            base_url: base_url.into(),
        }
    }

    pub fn from_settings(settings: &NotifierSettings, base_url: impl Into<String>) -> Self {
        Self::new(settings.webhook_url.clone(), base_url)
    }

    fn payload<'a>(&self, deployment: &'a Deployment) -> StatusPayload<'a> {
        StatusPayload {
            status: deployment.status.as_str(),
            repo: &deployment.repo,
            sha: &deployment.sha,
            git_ref: &deployment.git_ref,
            environment: &deployment.environment,
            description: deployment.description.as_deref(),
            error: deployment.error_message.as_deref(),
            channel: deployment.id.map(deployment_channel),
            url: deployment.url(&self.base_url),
        }
    }
}

#[async_trait]
impl StatusNotifier for WebhookNotifier {
    async fn update_status(&self, deployment: &Deployment) -> Result<()> {
        tracing::debug!(
            repo = %deployment.repo,
            status = %deployment.status,
            "delivering status notification"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.payload(deployment))
            .send()
            .await
            .map_err(|e| Error::Notification(e.to_string()))?;

        response
            .error_for_status()
            .map_err(|e| Error::Notification(e.to_string()))?;

        Ok(())
    }
}
