use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::deployments::models::{Deployment, DeploymentsQuery};
use crate::deployments::service::DeploymentStore;
use crate::error::{Error, Result};

/// Postgres-backed implementation of the deployment store.
///
/// The in-memory `prev_status` snapshot is deliberately not a column: it only
/// has meaning within the process that performed the transition.
#[derive(Clone)]
pub struct PgDeploymentStore {
    pool: PgPool,
}

impl PgDeploymentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeploymentStore for PgDeploymentStore {
    async fn create(&self, deployment: &mut Deployment) -> Result<()> {
        let (id, created_at): (Uuid, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO deployments
                (status, external_id, sha, git_ref, environment, description,
                 repo, provider, error_message, started_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id, created_at
            "#,
        )
        .bind(deployment.status)
        .bind(deployment.external_id)
        .bind(deployment.sha.as_str())
        .bind(deployment.git_ref.as_str())
        .bind(deployment.environment.as_str())
        .bind(deployment.description.as_deref())
        .bind(deployment.repo.as_str())
        .bind(deployment.provider.as_str())
        .bind(deployment.error_message.as_deref())
        .bind(deployment.started_at)
        .bind(deployment.completed_at)
        .fetch_one(&self.pool)
        .await?;

        deployment.id = Some(id);
        deployment.created_at = Some(created_at);
        Ok(())
    }

    async fn update(&self, deployment: &Deployment) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE deployments
            SET status = $2, environment = $3, description = $4, provider = $5,
                error_message = $6, started_at = $7, completed_at = $8
            WHERE id = $1
            "#,
        )
        .bind(deployment.id)
        .bind(deployment.status)
        .bind(deployment.environment.as_str())
        .bind(deployment.description.as_deref())
        .bind(deployment.provider.as_str())
        .bind(deployment.error_message.as_deref())
        .bind(deployment.started_at)
        .bind(deployment.completed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }
        Ok(())
    }

    async fn list(&self, query: DeploymentsQuery) -> Result<Vec<Deployment>> {
        let deployments = sqlx::query_as::<_, Deployment>(
            r#"
            SELECT id, status, external_id, sha, git_ref, environment, description,
                   repo, provider, error_message, created_at, started_at, completed_at
            FROM deployments
            ORDER BY external_id DESC
            LIMIT $1
            "#,
        )
        .bind(query.effective_limit())
        .fetch_all(&self.pool)
        .await?;

        Ok(deployments)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Deployment> {
        sqlx::query_as::<_, Deployment>(
            r#"
            SELECT id, status, external_id, sha, git_ref, environment, description,
                   repo, provider, error_message, created_at, started_at, completed_at
            FROM deployments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::NotFound)
    }
}
