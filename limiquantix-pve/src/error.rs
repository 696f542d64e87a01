//! Error types for provisioning translation and submission.

use thiserror::Error;

use crate::types::{InstanceRef, Variant};

/// The request does not have the shape the translator expects.
///
/// Every variant names the offending group or field as a dotted path
/// (`config.cores`, `volumes[1].storage`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// A group that must be a mapping is something else.
    #[error("{group} must be a mapping")]
    NotAMapping { group: String },

    /// An indexed group used a key that is not a decimal index.
    #[error("{group} has non-numeric index '{index}'")]
    InvalidIndex { group: String, index: String },

    /// A nested value appeared where a scalar was expected.
    #[error("{field} must be a scalar value")]
    NonScalar { field: String },

    /// A required field is absent or blank.
    #[error("{field} is required")]
    MissingField { field: String },

    /// A field that must be an integer is not one.
    #[error("{field} must be an integer, got '{value}'")]
    InvalidNumber { field: String, value: String },
}

/// Errors reported by the virtualization client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Failed to reach the virtualization API.
    #[error("Failed to connect to virtualization API: {0}")]
    ConnectionFailed(String),

    /// The API refused the request.
    #[error("Request rejected by virtualization API: {0}")]
    Rejected(String),

    /// The referenced instance does not exist.
    #[error("Instance not found: {0}")]
    NotFound(String),

    /// Creation failed after the instance was partly set up on the node.
    #[error("Creation of {instance} did not complete: {reason}")]
    PartiallyCreated { instance: InstanceRef, reason: String },

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// The instance left behind by a failed creation, if any.
    pub fn partial_instance(&self) -> Option<&InstanceRef> {
        match self {
            ClientError::PartiallyCreated { instance, .. } => Some(instance),
            _ => None,
        }
    }
}

/// What happened to a partially created instance after a failed creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// Nothing was left on the node.
    NotNeeded,
    /// The partial instance was destroyed.
    RolledBack(InstanceRef),
    /// Destroying the partial instance failed as well.
    Failed { instance: InstanceRef, reason: String },
}

impl std::fmt::Display for RollbackOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RollbackOutcome::NotNeeded => write!(f, "no rollback needed"),
            RollbackOutcome::RolledBack(instance) => write!(f, "rolled back {}", instance),
            RollbackOutcome::Failed { instance, reason } => {
                write!(f, "rollback of {} failed: {}", instance, reason)
            }
        }
    }
}

/// Errors surfaced by [`crate::Provisioner`].
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// The request could not be translated.
    #[error("Invalid provisioning request: {0}")]
    Shape(#[from] ShapeError),

    /// The vmid was rejected before any remote call.
    #[error("Invalid vmid: '{0}'")]
    InvalidIdentifier(String),

    /// The requested node is not part of the cluster.
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// The cluster reported no nodes at all.
    #[error("No nodes available in cluster")]
    NoNodes,

    /// A lookup against the client failed before creation was attempted.
    #[error("Virtualization client error: {0}")]
    Client(#[source] ClientError),

    /// Creation failed; `rollback` records the cleanup of any partial instance.
    #[error("Failed to create {variant} {vmid}: {source} ({rollback})")]
    CreationFailed {
        variant: Variant,
        vmid: u32,
        source: ClientError,
        rollback: RollbackOutcome,
    },
}

/// Errors found while validating [`crate::ProvisionSettings`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Result type alias for translation.
pub type Result<T> = std::result::Result<T, ShapeError>;
