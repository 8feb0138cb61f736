//! Deployment lifecycle tracking.
//!
//! This crate records deployments triggered by an external event source and
//! announces every real status transition to interested observers exactly
//! once. The core is the [`Deployment`] entity with its status state machine
//! and [`DeploymentsService`], a decorator over a persistence port and a
//! notification port that defines the ordering between "the record is
//! durable" and "observers have heard about it".
//!
//! The HTTP surface that feeds this crate (webhook routing, authentication)
//! lives in the embedding server, not here.

pub mod db;
pub mod deployments;
pub mod error;
pub mod events;
pub mod notify;
pub mod settings;

pub use deployments::models::{DeployRequest, Deployment, DeploymentStatus, DeploymentsQuery};
pub use deployments::service::{DeploymentStore, DeploymentsService, StatusNotifier};
pub use error::{Error, Result};
