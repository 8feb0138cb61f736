use async_trait::async_trait;
use uuid::Uuid;

use crate::deployments::models::{Deployment, DeploymentsQuery};
use crate::error::Result;

/// Persistence port for deployment records.
///
/// Calls may block on network or database I/O; callers must not hold any
/// in-process lock across them.
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    /// Persists a new record, assigning `id` and `created_at`.
    async fn create(&self, deployment: &mut Deployment) -> Result<()>;

    /// Persists the current in-memory field values over the record keyed by id.
    async fn update(&self, deployment: &Deployment) -> Result<()>;

    /// The most recent deployments, ordered by descending external id.
    async fn list(&self, query: DeploymentsQuery) -> Result<Vec<Deployment>>;

    /// Fails with [`crate::Error::NotFound`] when no record matches.
    async fn find_by_id(&self, id: Uuid) -> Result<Deployment>;
}

/// Notification port: announces a deployment's current status to observers.
///
/// Delivery failures surface as an error; no retry is performed here.
#[async_trait]
pub trait StatusNotifier: Send + Sync {
    async fn update_status(&self, deployment: &Deployment) -> Result<()>;
}

/// Store decorator that emits exactly one notification per observed status
/// transition.
///
/// The ordering between notification and persistence is deliberately
/// asymmetric:
///
/// - `create` persists first and notifies after, so observers are never told
///   about a deployment that does not exist in storage.
/// - `update` notifies first and persists after, and only notifies when the
///   status differs from the last observed value, so a transition that cannot
///   be announced is also never recorded as persisted.
pub struct DeploymentsService<S, N> {
    store: S,
    notifier: N,
}

impl<S, N> DeploymentsService<S, N>
where
    S: DeploymentStore,
    N: StatusNotifier,
{
    pub fn new(store: S, notifier: N) -> Self {
        Self { store, notifier }
    }

    /// Persists a new deployment, then announces it.
    ///
    /// If persistence fails no notification is sent. If the notifier fails
    /// its error is returned even though the record is already durable, so a
    /// `create` error means "may or may not be visible to observers", not
    /// "was not persisted".
    pub async fn create(&self, deployment: &mut Deployment) -> Result<()> {
        self.store.create(deployment).await?;
        tracing::info!(
            deployment_id = ?deployment.id,
            external_id = deployment.external_id,
            repo = %deployment.repo,
            environment = %deployment.environment,
            "deployment created"
        );
        self.notifier.update_status(deployment).await
    }

    /// Announces the status change, if any, then persists.
    ///
    /// A failed notification aborts the persist and propagates, so durable
    /// state never gets ahead of what observers have seen; the deployment
    /// stays at its previous stored status until the update is retried.
    pub async fn update(&self, deployment: &Deployment) -> Result<()> {
        if deployment.status != deployment.previous_status() {
            self.notifier.update_status(deployment).await?;
            tracing::info!(
                deployment_id = ?deployment.id,
                from = %deployment.previous_status(),
                to = %deployment.status,
                "deployment status change notified"
            );
        } else {
            tracing::debug!(
                deployment_id = ?deployment.id,
                status = %deployment.status,
                "status unchanged, skipping notification"
            );
        }

        self.store.update(deployment).await
    }

    pub async fn list(&self, query: DeploymentsQuery) -> Result<Vec<Deployment>> {
        self.store.list(query).await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Deployment> {
        self.store.find_by_id(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deployments::models::{DeployRequest, DeploymentStatus};
    use crate::error::Error;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Shared call log, used to assert ordering across the two collaborators.
    type CallLog = Arc<Mutex<Vec<&'static str>>>;

    struct RecordingStore {
        calls: CallLog,
        creates: Arc<AtomicUsize>,
        updates: Arc<AtomicUsize>,
        fail_create: bool,
    }

    impl RecordingStore {
        fn new(calls: CallLog) -> Self {
            Self {
                calls,
                creates: Arc::new(AtomicUsize::new(0)),
                updates: Arc::new(AtomicUsize::new(0)),
                fail_create: false,
            }
        }
    }

    #[async_trait]
    impl DeploymentStore for RecordingStore {
        async fn create(&self, deployment: &mut Deployment) -> Result<()> {
            self.calls.lock().unwrap().push("store.create");
            self.creates.fetch_add(1, Ordering::SeqCst);
            if self.fail_create {
                return Err(Error::Persistence(sqlx::Error::PoolClosed));
            }
            deployment.id = Some(Uuid::new_v4());
            deployment.created_at = Some(Utc::now());
            Ok(())
        }

        async fn update(&self, _deployment: &Deployment) -> Result<()> {
            self.calls.lock().unwrap().push("store.update");
            self.updates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn list(&self, _query: DeploymentsQuery) -> Result<Vec<Deployment>> {
            Ok(Vec::new())
        }

        async fn find_by_id(&self, _id: Uuid) -> Result<Deployment> {
            Err(Error::NotFound)
        }
    }

    struct RecordingNotifier {
        calls: CallLog,
        statuses: Arc<Mutex<Vec<DeploymentStatus>>>,
        fail: bool,
    }

    impl RecordingNotifier {
        fn new(calls: CallLog) -> Self {
            Self {
                calls,
                statuses: Arc::new(Mutex::new(Vec::new())),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl StatusNotifier for RecordingNotifier {
        async fn update_status(&self, deployment: &Deployment) -> Result<()> {
            self.calls.lock().unwrap().push("notifier.update_status");
            if self.fail {
                return Err(Error::Notification("delivery refused".to_string()));
            }
            self.statuses.lock().unwrap().push(deployment.status);
            Ok(())
        }
    }

    fn deployment() -> Deployment {
        Deployment::new(DeployRequest {
            external_id: 42,
            sha: "abc123".to_string(),
            git_ref: "refs/heads/main".to_string(),
            environment: "production".to_string(),
            description: None,
            repo: "acme/widgets".to_string(),
            provider: None,
        })
    }

    fn service(
        store: RecordingStore,
        notifier: RecordingNotifier,
    ) -> DeploymentsService<RecordingStore, RecordingNotifier> {
        DeploymentsService::new(store, notifier)
    }

    #[tokio::test]
    async fn test_create_persists_then_notifies() {
        let calls: CallLog = Arc::default();
        let store = RecordingStore::new(calls.clone());
        let notifier = RecordingNotifier::new(calls.clone());
        let creates = store.creates.clone();
        let statuses = notifier.statuses.clone();
        let service = service(store, notifier);

        let mut deployment = deployment();
        service.create(&mut deployment).await.unwrap();

        assert_eq!(creates.load(Ordering::SeqCst), 1);
        assert_eq!(*statuses.lock().unwrap(), vec![DeploymentStatus::Pending]);
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["store.create", "notifier.update_status"]
        );
        assert!(deployment.id.is_some());
    }

    #[tokio::test]
    async fn test_create_failure_skips_notification() {
        let calls: CallLog = Arc::default();
        let mut store = RecordingStore::new(calls.clone());
        store.fail_create = true;
        let notifier = RecordingNotifier::new(calls.clone());
        let service = service(store, notifier);

        let err = service.create(&mut deployment()).await.unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
        assert_eq!(*calls.lock().unwrap(), vec!["store.create"]);
    }

    #[tokio::test]
    async fn test_create_surfaces_notifier_error_after_persist() {
        let calls: CallLog = Arc::default();
        let store = RecordingStore::new(calls.clone());
        let mut notifier = RecordingNotifier::new(calls.clone());
        notifier.fail = true;
        let creates = store.creates.clone();
        let service = service(store, notifier);

        let mut deployment = deployment();
        let err = service.create(&mut deployment).await.unwrap_err();
        assert!(matches!(err, Error::Notification(_)));
        // The record is durable even though the caller saw an error.
        assert_eq!(creates.load(Ordering::SeqCst), 1);
        assert!(deployment.id.is_some());
    }

    #[tokio::test]
    async fn test_update_without_transition_skips_notifier() {
        let calls: CallLog = Arc::default();
        let store = RecordingStore::new(calls.clone());
        let notifier = RecordingNotifier::new(calls.clone());
        let updates = store.updates.clone();
        let service = service(store, notifier);

        // Freshly constructed: status and snapshot are both pending.
        service.update(&deployment()).await.unwrap();

        assert_eq!(updates.load(Ordering::SeqCst), 1);
        assert_eq!(*calls.lock().unwrap(), vec!["store.update"]);
    }

    #[tokio::test]
    async fn test_update_with_transition_notifies_before_persisting() {
        let calls: CallLog = Arc::default();
        let store = RecordingStore::new(calls.clone());
        let notifier = RecordingNotifier::new(calls.clone());
        let statuses = notifier.statuses.clone();
        let service = service(store, notifier);

        let mut deployment = deployment();
        deployment.started("heroku");
        deployment.succeeded();
        service.update(&deployment).await.unwrap();

        assert_eq!(*statuses.lock().unwrap(), vec![DeploymentStatus::Succeeded]);
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["notifier.update_status", "store.update"]
        );
    }

    #[tokio::test]
    async fn test_update_aborts_persist_when_notifier_fails() {
        let calls: CallLog = Arc::default();
        let store = RecordingStore::new(calls.clone());
        let mut notifier = RecordingNotifier::new(calls.clone());
        notifier.fail = true;
        let updates = store.updates.clone();
        let service = service(store, notifier);

        let mut deployment = deployment();
        deployment.started("heroku");
        let err = service.update(&deployment).await.unwrap_err();

        assert!(matches!(err, Error::Notification(_)));
        assert_eq!(updates.load(Ordering::SeqCst), 0);
        assert_eq!(*calls.lock().unwrap(), vec!["notifier.update_status"]);
    }

    #[tokio::test]
    async fn test_full_lifecycle_notifies_each_transition_once() {
        let calls: CallLog = Arc::default();
        let store = RecordingStore::new(calls.clone());
        let notifier = RecordingNotifier::new(calls.clone());
        let statuses = notifier.statuses.clone();
        let service = service(store, notifier);

        let mut deployment = deployment();
        service.create(&mut deployment).await.unwrap();

        deployment.started("heroku");
        service.update(&deployment).await.unwrap();

        deployment.succeeded();
        service.update(&deployment).await.unwrap();

        assert_eq!(
            *statuses.lock().unwrap(),
            vec![
                DeploymentStatus::Pending,
                DeploymentStatus::Started,
                DeploymentStatus::Succeeded,
            ]
        );
        assert_eq!(deployment.provider, "heroku");
        assert!(deployment.started_at.is_some());
        assert!(deployment.completed_at.is_some());
    }
}
