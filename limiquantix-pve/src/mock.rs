//! Mock virtualization client for testing and development.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::error::ClientError;
use crate::settings::VmidRange;
use crate::traits::{ClientResult, VirtualizationClient};
use crate::types::{InstanceRef, NodeRef, ParsedPayload, Variant};

/// Failure the mock injects into its remote operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    /// Every remote call fails with a connection error.
    Unreachable(String),
    /// Creation is refused before anything is set up.
    RejectCreate(String),
    /// Creation fails after the guest was registered on the node.
    PartialCreate(String),
    /// Like `PartialCreate`, and destroying the leftover guest fails too.
    PartialCreateUndeletable(String),
}

/// In-memory stand-in for a cluster.
///
/// Records how many remote calls were made so tests can assert on the
/// provisioner's call pattern.
pub struct MockClient {
    nodes: Vec<NodeRef>,
    instances: RwLock<HashMap<u32, MockInstance>>,
    failure: Option<MockFailure>,
    vmid_range: VmidRange,
    remote_calls: AtomicUsize,
    create_calls: AtomicUsize,
    destroy_calls: AtomicUsize,
}

struct MockInstance {
    instance: InstanceRef,
    payload: ParsedPayload,
    created_at: DateTime<Utc>,
}

impl MockClient {
    /// Create a mock cluster with the given node names.
    pub fn new<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut nodes: Vec<NodeRef> = nodes
            .into_iter()
            .map(|name| NodeRef {
                node: name.into(),
                status: Some("online".to_string()),
            })
            .collect();
        nodes.sort_by(|a, b| a.node.cmp(&b.node));

        info!(nodes = nodes.len(), "Creating mock virtualization client");
        Self {
            nodes,
            instances: RwLock::new(HashMap::new()),
            failure: None,
            vmid_range: VmidRange::default(),
            remote_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            destroy_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_failure(mut self, failure: MockFailure) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn with_vmid_range(mut self, range: VmidRange) -> Self {
        self.vmid_range = range;
        self
    }

    /// Number of remote operations attempted (everything but `validate_id`).
    pub fn remote_calls(&self) -> usize {
        self.remote_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn destroy_calls(&self) -> usize {
        self.destroy_calls.load(Ordering::SeqCst)
    }

    pub fn instance_exists(&self, vmid: u32) -> bool {
        self.instances
            .read()
            .map(|instances| instances.contains_key(&vmid))
            .unwrap_or(false)
    }

    /// Payload the guest was created from.
    pub fn instance_payload(&self, vmid: u32) -> Option<ParsedPayload> {
        let instances = self.instances.read().ok()?;
        instances.get(&vmid).map(|i| i.payload.clone())
    }

    /// When the guest was created.
    pub fn instance_created_at(&self, vmid: u32) -> Option<DateTime<Utc>> {
        let instances = self.instances.read().ok()?;
        instances.get(&vmid).map(|i| i.created_at)
    }

    fn remote_call(&self) -> ClientResult<()> {
        self.remote_calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(MockFailure::Unreachable(reason)) => Err(ClientError::ConnectionFailed(reason.clone())),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl VirtualizationClient for MockClient {
    async fn list_nodes(&self) -> ClientResult<Vec<NodeRef>> {
        self.remote_call()?;
        Ok(self.nodes.clone())
    }

    async fn next_vmid(&self) -> ClientResult<u32> {
        self.remote_call()?;

        let instances = self.instances.read().map_err(|_| {
            ClientError::Internal("Lock poisoned".to_string())
        })?;

        (self.vmid_range.min..=self.vmid_range.max)
            .find(|id| !instances.contains_key(id))
            .ok_or_else(|| ClientError::Rejected("No free vmid".to_string()))
    }

    #[instrument(skip_all, fields(node = %node.node, variant = %variant, params = payload.len()))]
    async fn create_instance(
        &self,
        node: &NodeRef,
        variant: Variant,
        payload: &ParsedPayload,
    ) -> ClientResult<InstanceRef> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.remote_call()?;

        let vmid = payload
            .vmid()
            .ok_or_else(|| ClientError::Rejected("vmid parameter missing".to_string()))?;

        if !self.nodes.iter().any(|n| n.node == node.node) {
            return Err(ClientError::NotFound(format!("node {}", node.node)));
        }

        let mut instances = self.instances.write().map_err(|_| {
            ClientError::Internal("Lock poisoned".to_string())
        })?;

        if instances.contains_key(&vmid) {
            return Err(ClientError::Rejected(format!("vmid {} already exists", vmid)));
        }

        if let Some(MockFailure::RejectCreate(reason)) = &self.failure {
            return Err(ClientError::Rejected(reason.clone()));
        }

        let instance = InstanceRef {
            node: node.node.clone(),
            vmid,
            variant,
        };
        instances.insert(vmid, MockInstance {
            instance: instance.clone(),
            payload: payload.clone(),
            created_at: Utc::now(),
        });

        match &self.failure {
            Some(MockFailure::PartialCreate(reason))
            | Some(MockFailure::PartialCreateUndeletable(reason)) => {
                debug!(vmid, "Simulating failure after partial creation");
                Err(ClientError::PartiallyCreated {
                    instance,
                    reason: reason.clone(),
                })
            }
            _ => {
                info!(vmid, path = variant.api_path(), "Mock instance created");
                Ok(instance)
            }
        }
    }

    #[instrument(skip_all, fields(instance = %instance))]
    async fn destroy_instance(&self, instance: &InstanceRef) -> ClientResult<()> {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
        self.remote_call()?;

        if let Some(MockFailure::PartialCreateUndeletable(reason)) = &self.failure {
            return Err(ClientError::Rejected(reason.clone()));
        }

        let mut instances = self.instances.write().map_err(|_| {
            ClientError::Internal("Lock poisoned".to_string())
        })?;

        match instances.get(&instance.vmid) {
            Some(existing) if existing.instance == *instance => {
                instances.remove(&instance.vmid);
                info!("Mock instance destroyed");
                Ok(())
            }
            _ => Err(ClientError::NotFound(format!(
                "{}/{} on {}",
                instance.variant.api_path(),
                instance.vmid,
                instance.node
            ))),
        }
    }

    fn validate_id(&self, candidate: &str) -> bool {
        self.vmid_range.contains(candidate)
    }
}
