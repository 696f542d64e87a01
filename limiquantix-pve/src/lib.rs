//! # limiquantix PVE
//!
//! Provisioning parameter translator for Proxmox VE.
//!
//! Host provisioning forms arrive as flat and nested string attributes. This
//! crate classifies them, builds cpu, memory, disk and network descriptors,
//! and merges everything into the flat parameter map the creation API takes.
//!
//! ## Architecture
//!
//! ```text
//! ProvisioningRequest
//!         │
//!         ▼
//! ┌───────────────┐   cpu / memory / remainder
//! │   classify    │──────────────────────────────┐
//! └───────────────┘                              │
//!   volumes[i] ──▶ build_volume                  │
//!   interfaces[i] ──▶ build_interface            │
//!         │                                      ▼
//!         └────────────▶ Translator ──▶ ParsedPayload
//!                                            │
//!                                            ▼
//!                  Provisioner ──▶ VirtualizationClient
//!                  (vmid check, node pick, rollback)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use limiquantix_pve::{translate, ProvisioningRequest, Variant};
//! use serde_json::json;
//!
//! let request = ProvisioningRequest::from_form(&json!({
//!     "vmid": "100",
//!     "config_attributes": { "memory": "536870912", "cores": "1", "arch": "amd64" },
//!     "volumes_attributes": {
//!         "0": { "id": "rootfs", "storage": "local-lvm", "size": "1073741824" }
//!     },
//! })).unwrap();
//!
//! let payload = translate(&request, Variant::Container).unwrap();
//! assert_eq!(payload.get("rootfs").unwrap().to_string(), "local-lvm:1073741824");
//! ```

mod attributes;
pub mod classify;
pub mod cpu;
pub mod error;
pub mod interface;
pub mod memory;
pub mod mock;
pub mod provision;
pub mod request;
pub mod settings;
pub mod traits;
pub mod translate;
pub mod types;
pub mod volume;

pub use classify::{classify, Classified, Taxonomy, CONTAINER_TAXONOMY, VM_TAXONOMY};
pub use cpu::{build_container_cpu, build_cpu, cpu_flag_string, ContainerCpuDescriptor, CpuDescriptor};
pub use error::{ClientError, ProvisionError, RollbackOutcome, SettingsError, ShapeError};
pub use interface::{build_interface, build_interfaces, InterfaceAction, InterfaceEncoding};
pub use memory::{build_container_memory, build_memory, Ballooning, ContainerMemoryDescriptor, MemoryDescriptor};
pub use mock::{MockClient, MockFailure};
pub use provision::{ProvisionResult, Provisioner};
pub use request::ProvisioningRequest;
pub use settings::{ProvisionSettings, VariantSettings, VmidRange, DEFAULT_SETTINGS_PATH};
pub use traits::{ClientResult, VirtualizationClient};
pub use translate::{translate, Translator};
pub use types::*;
pub use volume::{build_volume, build_volumes, VolumeAction};
