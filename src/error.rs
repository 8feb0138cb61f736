use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures surfaced by the deployments core.
///
/// Collaborator failures are propagated unchanged to the caller; nothing in
/// this crate retries or swallows them.
#[derive(Debug, Error)]
pub enum Error {
    /// The inbound trigger payload was malformed or incomplete.
    #[error("invalid deploy request: {0}")]
    Validation(String),

    /// No deployment matches the requested id.
    #[error("deployment not found")]
    NotFound,

    /// The store failed to create, update, or query deployment records.
    #[error("deployment persistence failed")]
    Persistence(#[from] sqlx::Error),

    /// A status notification could not be delivered.
    #[error("status notification failed: {0}")]
    Notification(String),
}
