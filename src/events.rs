//! Decoding of inbound `deployment` event payloads.
//!
//! The source-control provider posts a JSON body describing the requested
//! deployment; this module normalizes it into a [`DeployRequest`]. Anything
//! missing the external id, sha, or repository is rejected before a
//! [`crate::Deployment`] is ever constructed.

use serde::Deserialize;

use crate::deployments::models::DeployRequest;
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct DeploymentEvent {
    deployment: EventDeployment,
    repository: EventRepository,
}

#[derive(Debug, Deserialize)]
struct EventDeployment {
    #[serde(default)]
    id: i64,
    #[serde(default)]
    sha: String,
    #[serde(rename = "ref", default)]
    git_ref: String,
    #[serde(default)]
    environment: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventRepository {
    #[serde(default)]
    full_name: String,
}

/// Decodes a `deployment` event payload into normalized creation parameters.
pub fn deploy_request_from_payload(payload: &[u8]) -> Result<DeployRequest> {
    let event: DeploymentEvent =
        serde_json::from_slice(payload).map_err(|e| Error::Validation(e.to_string()))?;

    if event.deployment.id <= 0 {
        return Err(Error::Validation("deployment id is missing".to_string()));
    }
    if event.deployment.sha.is_empty() {
        return Err(Error::Validation("deployment sha is missing".to_string()));
    }
    if event.repository.full_name.is_empty() {
        return Err(Error::Validation("repository is missing".to_string()));
    }

    Ok(DeployRequest {
        external_id: event.deployment.id,
        sha: event.deployment.sha,
        git_ref: event.deployment.git_ref,
        environment: event.deployment.environment,
        description: event.deployment.description,
        repo: event.repository.full_name,
        provider: None,
    })
}
