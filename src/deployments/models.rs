use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef};
use sqlx::{Decode, Encode, FromRow, Postgres, Type};
use uuid::Uuid;

/// Maximum number of deployments returned by a list query with no limit set.
pub const DEFAULT_DEPLOYMENTS_LIMIT: i64 = 20;

/// Lifecycle states of a deployment.
///
/// `Failed`, `Errored`, and `Succeeded` are terminal. The state machine
/// itself imposes no adjacency restrictions; callers are responsible for
/// invoking transitions in a sensible order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeploymentStatus {
    #[default]
    Pending,
    Started,
    Failed,
    Errored,
    Succeeded,
}

impl DeploymentStatus {
    /// True for the terminal states: no further transitions are meaningful.
    pub fn is_completed(self) -> bool {
        matches!(self, Self::Failed | Self::Errored | Self::Succeeded)
    }

    /// Canonical wire form, used for storage and serialized representations.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Started => "started",
            Self::Failed => "failed",
            Self::Errored => "errored",
            Self::Succeeded => "succeeded",
        }
    }
}

impl std::fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for DeploymentStatus {
    /// Decoding never fails: unrecognized values degrade to `Pending`.
    fn from(s: &str) -> Self {
        match s {
            "pending" => Self::Pending,
            "started" => Self::Started,
            "failed" => Self::Failed,
            "errored" => Self::Errored,
            "succeeded" => Self::Succeeded,
            other => {
                tracing::warn!(status = other, "unrecognized deployment status, treating as pending");
                Self::Pending
            }
        }
    }
}

impl From<String> for DeploymentStatus {
    fn from(s: String) -> Self {
        s.as_str().into()
    }
}

impl From<DeploymentStatus> for String {
    fn from(status: DeploymentStatus) -> Self {
        status.as_str().to_owned()
    }
}

// Stored as `text`; decoding shares the lossy fallback above.

impl Type<Postgres> for DeploymentStatus {
    fn type_info() -> PgTypeInfo {
        <&str as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <&str as Type<Postgres>>::compatible(ty)
    }
}

impl<'q> Encode<'q, Postgres> for DeploymentStatus {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        <&str as Encode<'q, Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

impl<'r> Decode<'r, Postgres> for DeploymentStatus {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        Ok(<&str as Decode<'r, Postgres>>::decode(value)?.into())
    }
}

/// Normalized parameters for creating a deployment, decoded from an inbound
/// `deployment` event (see [`crate::events`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployRequest {
    /// Identifier of the deployment in the triggering system.
    pub external_id: i64,
    /// The commit being deployed.
    pub sha: String,
    /// The git ref that resolved to the sha.
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// Target environment name.
    #[serde(default)]
    pub environment: String,
    /// Human-supplied context provided when the deployment was triggered.
    #[serde(default)]
    pub description: Option<String>,
    /// The repository being deployed, in `owner/name` form.
    pub repo: String,
    /// The backend expected to execute the deployment, when known up front.
    /// The entity's own provider field is only set once the deployment starts.
    #[serde(default)]
    pub provider: Option<String>,
}

/// A single attempt to deploy a specific commit to a specific environment,
/// tracked from request through terminal outcome.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Deployment {
    /// Internal identifier, assigned by the store on first persistence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub status: DeploymentStatus,
    /// Identifier of the deployment in the triggering system.
    pub external_id: i64,
    pub sha: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub environment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Repository in `owner/name` form.
    pub repo: String,
    /// Name of the backend executing the deployment; set by [`Deployment::started`].
    #[serde(default)]
    pub provider: String,
    /// Populated when the deployment errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Stamped by the store on first persistence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Status value observed before the most recent in-memory transition.
    /// Drives change detection in the notifying service; never persisted and
    /// meaningless once the entity is reloaded from storage.
    #[serde(skip)]
    #[sqlx(default)]
    prev_status: DeploymentStatus,
}

impl Deployment {
    /// Builds a new, unpersisted deployment from normalized trigger parameters.
    pub fn new(req: DeployRequest) -> Self {
        Self {
            id: None,
            status: DeploymentStatus::Pending,
            external_id: req.external_id,
            sha: req.sha,
            git_ref: req.git_ref,
            environment: req.environment,
            description: req.description,
            repo: req.repo,
            provider: String::new(),
            error_message: None,
            created_at: None,
            started_at: None,
            completed_at: None,
            prev_status: DeploymentStatus::Pending,
        }
    }

    /// The status value prior to the most recent in-memory transition.
    pub fn previous_status(&self) -> DeploymentStatus {
        self.prev_status
    }

    /// Display URL for this deployment under the given base URL.
    ///
    /// `None` until the store has assigned an id.
    pub fn url(&self, base_url: &str) -> Option<String> {
        self.id
            .map(|id| format!("{}/deploys/{}", base_url.trim_end_matches('/'), id))
    }

    /// Marks the deployment as started by the named provider.
    ///
    /// Bypasses the shared transition routine: `prev_status` keeps pointing
    /// at the pre-start value so the following update is seen as a change.
    pub fn started(&mut self, provider: impl Into<String>) {
        self.started_at = Some(Utc::now());
        self.status = DeploymentStatus::Started;
        self.provider = provider.into();
    }

    /// Marks the deployment as succeeded.
    pub fn succeeded(&mut self) {
        self.change_status(DeploymentStatus::Succeeded);
    }

    /// Marks the deployment as failed.
    pub fn failed(&mut self) {
        self.change_status(DeploymentStatus::Failed);
    }

    /// Marks the deployment as errored, recording the reason for display.
    pub fn errored(&mut self, err: impl std::fmt::Display) {
        self.error_message = Some(err.to_string());
        self.change_status(DeploymentStatus::Errored);
    }

    // completed_at is stamped once, on the first transition into a completed
    // state. Re-entering a completed state must not move it.
    fn change_status(&mut self, status: DeploymentStatus) {
        if status.is_completed() && self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
        self.prev_status = self.status;
        self.status = status;
    }
}

/// Query parameters for listing deployments.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DeploymentsQuery {
    /// Maximum number of records to return. Unset or zero means
    /// [`DEFAULT_DEPLOYMENTS_LIMIT`].
    #[serde(default)]
    pub limit: Option<i64>,
}

impl DeploymentsQuery {
    pub fn effective_limit(self) -> i64 {
        match self.limit {
            Some(limit) if limit > 0 => limit,
            _ => DEFAULT_DEPLOYMENTS_LIMIT,
        }
    }
}
