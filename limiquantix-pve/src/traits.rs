//! The virtualization client the provisioner delegates to.

use async_trait::async_trait;

use crate::error::ClientError;
use crate::settings::VmidRange;
use crate::types::{InstanceRef, NodeRef, ParsedPayload, Variant};

/// Result type alias for client operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Remote operations needed to provision a guest.
///
/// Implementations own transport, authentication, retries and timeouts.
#[async_trait]
pub trait VirtualizationClient: Send + Sync {
    /// List cluster nodes, sorted by node name.
    async fn list_nodes(&self) -> ClientResult<Vec<NodeRef>>;

    /// Ask the cluster for the next free guest id.
    async fn next_vmid(&self) -> ClientResult<u32>;

    /// Create a guest on `node` from a translated payload.
    ///
    /// When creation fails after the guest was partly set up, the error must
    /// be [`ClientError::PartiallyCreated`] so the caller can clean up.
    async fn create_instance(
        &self,
        node: &NodeRef,
        variant: Variant,
        payload: &ParsedPayload,
    ) -> ClientResult<InstanceRef>;

    /// Destroy a guest.
    async fn destroy_instance(&self, instance: &InstanceRef) -> ClientResult<()>;

    /// Check that a user-supplied guest id is acceptable. Must not make
    /// remote calls. The provisioner applies its configured range on top of
    /// this check.
    fn validate_id(&self, candidate: &str) -> bool {
        VmidRange::default().contains(candidate)
    }
}
