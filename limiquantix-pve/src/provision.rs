//! Translation plus submission, with rollback of partial creations.

use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{ClientError, ProvisionError, RollbackOutcome};
use crate::request::ProvisioningRequest;
use crate::settings::{ProvisionSettings, VmidRange};
use crate::traits::VirtualizationClient;
use crate::translate::Translator;
use crate::types::{InstanceRef, NodeRef, ParamValue, Variant};

/// Result type alias for provisioning.
pub type ProvisionResult<T> = std::result::Result<T, ProvisionError>;

/// Creates guests from provisioning requests through a [`VirtualizationClient`].
///
/// Holds no per-request state; one provisioner can serve concurrent requests.
pub struct Provisioner {
    client: Arc<dyn VirtualizationClient>,
    translator: Translator,
    vmid_range: VmidRange,
}

impl Provisioner {
    pub fn new(client: Arc<dyn VirtualizationClient>, settings: &ProvisionSettings) -> Self {
        Self {
            client,
            translator: Translator::new(settings),
            vmid_range: settings.vmid,
        }
    }

    /// Translate `request`, create the guest and roll back on failure.
    ///
    /// A supplied vmid is validated before any remote call. Without one the
    /// next free id is requested and written into the payload.
    #[instrument(skip_all, fields(variant = %variant))]
    pub async fn create_and_provision(
        &self,
        request: &ProvisioningRequest,
        variant: Variant,
    ) -> ProvisionResult<InstanceRef> {
        let mut payload = self.translator.translate(request, variant)?;

        let vmid = match request.vmid()? {
            Some(candidate) => self.checked_vmid(&candidate)?,
            None => {
                let allocated = self.client.next_vmid().await.map_err(ProvisionError::Client)?;
                let vmid = self.checked_vmid(&allocated.to_string())?;
                payload.insert("vmid", ParamValue::from(vmid));
                vmid
            }
        };

        let node = self.select_node(request.node()?).await?;
        debug!(vmid, node = %node.node, params = payload.len(), "Submitting creation request");

        match self.client.create_instance(&node, variant, &payload).await {
            Ok(instance) => {
                info!(instance = %instance, "Instance created");
                Ok(instance)
            }
            Err(source) => {
                warn!(vmid, error = %source, "Failed to create instance");
                let rollback = self.rollback(&source).await;
                Err(ProvisionError::CreationFailed {
                    variant,
                    vmid,
                    source,
                    rollback,
                })
            }
        }
    }

    /// An id must fall inside the configured range and satisfy the client.
    fn checked_vmid(&self, candidate: &str) -> ProvisionResult<u32> {
        if !self.vmid_range.contains(candidate) || !self.client.validate_id(candidate) {
            return Err(ProvisionError::InvalidIdentifier(candidate.to_string()));
        }
        candidate
            .trim()
            .parse()
            .map_err(|_| ProvisionError::InvalidIdentifier(candidate.to_string()))
    }

    /// Pick the requested node, or the first node when none was requested.
    async fn select_node(&self, requested: Option<String>) -> ProvisionResult<NodeRef> {
        let nodes = self.client.list_nodes().await.map_err(ProvisionError::Client)?;

        match requested {
            Some(name) => nodes
                .into_iter()
                .find(|node| node.node == name)
                .ok_or(ProvisionError::NodeNotFound(name)),
            None => nodes.into_iter().next().ok_or(ProvisionError::NoNodes),
        }
    }

    /// Best-effort destroy of whatever `failure` left behind.
    async fn rollback(&self, failure: &ClientError) -> RollbackOutcome {
        let Some(instance) = failure.partial_instance() else {
            return RollbackOutcome::NotNeeded;
        };

        match self.client.destroy_instance(instance).await {
            Ok(()) => {
                info!(instance = %instance, "Rolled back partial instance");
                RollbackOutcome::RolledBack(instance.clone())
            }
            Err(e) => {
                error!(instance = %instance, error = %e, "Failed to roll back partial instance");
                RollbackOutcome::Failed {
                    instance: instance.clone(),
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockClient, MockFailure};
    use crate::traits::ClientResult;
    use crate::types::ParsedPayload;
    use async_trait::async_trait;
    use serde_json::json;

    /// Forwards to a [`MockClient`] but keeps the trait's default id check.
    struct DefaultValidationClient(MockClient);

    #[async_trait]
    impl VirtualizationClient for DefaultValidationClient {
        async fn list_nodes(&self) -> ClientResult<Vec<NodeRef>> {
            self.0.list_nodes().await
        }

        async fn next_vmid(&self) -> ClientResult<u32> {
            self.0.next_vmid().await
        }

        async fn create_instance(
            &self,
            node: &NodeRef,
            variant: Variant,
            payload: &ParsedPayload,
        ) -> ClientResult<InstanceRef> {
            self.0.create_instance(node, variant, payload).await
        }

        async fn destroy_instance(&self, instance: &InstanceRef) -> ClientResult<()> {
            self.0.destroy_instance(instance).await
        }
    }

    fn container_request(vmid: &str) -> ProvisioningRequest {
        ProvisioningRequest::from_form(&json!({
            "vmid": vmid,
            "node": "pve",
            "config_attributes": { "memory": "512", "cores": "1" },
            "volumes_attributes": { "0": { "id": "rootfs", "storage": "local-lvm", "size": "8" } },
        }))
        .unwrap()
    }

    fn provisioner(client: Arc<MockClient>) -> Provisioner {
        Provisioner::new(client, &ProvisionSettings::default())
    }

    #[tokio::test]
    async fn test_create_success() {
        let client = Arc::new(MockClient::new(["pve2", "pve"]));
        let instance = provisioner(client.clone())
            .create_and_provision(&container_request("101"), Variant::Container)
            .await
            .unwrap();

        assert_eq!(instance.vmid, 101);
        assert_eq!(instance.node, "pve");
        assert_eq!(instance.variant, Variant::Container);
        assert!(client.instance_exists(101));
        assert_eq!(client.create_calls(), 1);
        assert_eq!(client.destroy_calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_vmid_makes_no_remote_call() {
        let client = Arc::new(MockClient::new(["pve"]));
        let err = provisioner(client.clone())
            .create_and_provision(&container_request("12"), Variant::Container)
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::InvalidIdentifier(ref id) if id == "12"));
        assert_eq!(client.remote_calls(), 0);
    }

    #[tokio::test]
    async fn test_partial_creation_is_rolled_back_once() {
        let client = Arc::new(
            MockClient::new(["pve"]).with_failure(MockFailure::PartialCreate("disk allocation failed".to_string())),
        );
        let err = provisioner(client.clone())
            .create_and_provision(&container_request("102"), Variant::Container)
            .await
            .unwrap_err();

        match err {
            ProvisionError::CreationFailed { vmid, rollback, .. } => {
                assert_eq!(vmid, 102);
                assert!(matches!(rollback, RollbackOutcome::RolledBack(ref i) if i.vmid == 102));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(client.destroy_calls(), 1);
        assert!(!client.instance_exists(102));
    }

    #[tokio::test]
    async fn test_rollback_failure_is_reported() {
        let client = Arc::new(
            MockClient::new(["pve"]).with_failure(MockFailure::PartialCreateUndeletable("lock timeout".to_string())),
        );
        let err = provisioner(client.clone())
            .create_and_provision(&container_request("103"), Variant::Container)
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("lock timeout"));
        assert!(message.contains("rollback of container 103 on pve failed"));
        assert_eq!(client.destroy_calls(), 1);
        assert!(client.instance_exists(103));
    }

    #[tokio::test]
    async fn test_rejected_creation_needs_no_rollback() {
        let client = Arc::new(MockClient::new(["pve"]).with_failure(MockFailure::RejectCreate("quota".to_string())));
        let err = provisioner(client.clone())
            .create_and_provision(&container_request("104"), Variant::Container)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProvisionError::CreationFailed { rollback: RollbackOutcome::NotNeeded, .. }
        ));
        assert_eq!(client.destroy_calls(), 0);
    }

    #[tokio::test]
    async fn test_vmid_is_allocated_when_missing() {
        let client = Arc::new(MockClient::new(["pve"]));
        let request = ProvisioningRequest::new()
            .with_config("memory", "256")
            .with_config("cpu_type", "host");

        let instance = provisioner(client.clone())
            .create_and_provision(&request, Variant::Vm)
            .await
            .unwrap();

        assert_eq!(instance.vmid, 100);
        let payload = client.instance_payload(100).unwrap();
        assert_eq!(payload.get("vmid"), Some(&ParamValue::Int(100)));
    }

    #[tokio::test]
    async fn test_unknown_node() {
        let client = Arc::new(MockClient::new(["pve"]));
        let request = container_request("105").with_general("node", "pve9");

        let err = provisioner(client.clone())
            .create_and_provision(&request, Variant::Container)
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::NodeNotFound(ref n) if n == "pve9"));
        assert_eq!(client.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_configured_vmid_range_applies_to_any_client() {
        let client = Arc::new(DefaultValidationClient(MockClient::new(["pve"])));
        let settings = ProvisionSettings {
            vmid: VmidRange { min: 1000, max: 1999 },
            ..Default::default()
        };
        let provisioner = Provisioner::new(client.clone(), &settings);

        let err = provisioner
            .create_and_provision(&container_request("500"), Variant::Container)
            .await
            .unwrap_err();
        assert!(matches!(err, ProvisionError::InvalidIdentifier(ref id) if id == "500"));
        assert_eq!(client.0.remote_calls(), 0);

        let instance = provisioner
            .create_and_provision(&container_request("1500"), Variant::Container)
            .await
            .unwrap();
        assert_eq!(instance.vmid, 1500);
    }

    #[tokio::test]
    async fn test_first_sorted_node_is_used_when_none_requested() {
        let client = Arc::new(MockClient::new(["pve2", "pve1"]));
        let request = ProvisioningRequest::new()
            .with_general("vmid", "110")
            .with_config("memory", "512");

        let instance = provisioner(client.clone())
            .create_and_provision(&request, Variant::Container)
            .await
            .unwrap();

        assert_eq!(instance.node, "pve1");
        assert_eq!(instance.vmid, 110);
    }

    #[tokio::test]
    async fn test_empty_cluster_has_no_nodes() {
        let client = Arc::new(MockClient::new(Vec::<String>::new()));
        let request = ProvisioningRequest::new()
            .with_general("vmid", "111")
            .with_config("memory", "512");

        let err = provisioner(client.clone())
            .create_and_provision(&request, Variant::Container)
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::NoNodes));
        assert_eq!(client.create_calls(), 0);
    }
}
