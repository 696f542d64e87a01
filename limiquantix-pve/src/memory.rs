//! Memory descriptor builders and the ballooning policy.

use tracing::debug;

use crate::attributes::{flag, get_integer, require_integer};
use crate::error::Result;
use crate::types::{AttributeMap, ParsedPayload};

const GROUP: &str = "config";

/// How guest memory may shrink under host pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ballooning {
    /// Memory floats between `min_memory` and the configured size.
    Enabled {
        /// Floor the balloon driver may shrink the guest to
        min_memory: i64,
        /// Relative priority when the host redistributes memory
        shares: i64,
    },
    /// Fixed allocation; `target` is sent verbatim as `balloon`.
    Disabled { target: i64 },
}

/// Memory parameters for a virtual machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryDescriptor {
    pub memory: i64,
    pub ballooning: Ballooning,
}

impl MemoryDescriptor {
    pub fn to_payload(&self) -> ParsedPayload {
        let mut payload = ParsedPayload::new();
        payload.insert("memory", self.memory);
        match self.ballooning {
            Ballooning::Enabled { min_memory, shares } => {
                payload.insert("balloon", min_memory);
                payload.insert("shares", shares);
            }
            Ballooning::Disabled { target } => {
                payload.insert("balloon", target);
            }
        }
        payload
    }
}

/// Build the VM memory descriptor.
///
/// The form's `balloon` field doubles as the on/off switch: `1` enables
/// ballooning (and then `min_memory` and `shares` are required), any other
/// value is taken as the fixed balloon target. Blank means a target of 0.
pub fn build_memory(group: &AttributeMap) -> Result<MemoryDescriptor> {
    let memory = require_integer(group, GROUP, "memory")?;

    let ballooning = if flag(group, GROUP, "balloon")? {
        Ballooning::Enabled {
            min_memory: require_integer(group, GROUP, "min_memory")?,
            shares: require_integer(group, GROUP, "shares")?,
        }
    } else {
        Ballooning::Disabled {
            target: get_integer(group, GROUP, "balloon")?.unwrap_or(0),
        }
    };

    let descriptor = MemoryDescriptor { memory, ballooning };
    debug!(?descriptor, "Built memory descriptor");
    Ok(descriptor)
}

/// Memory parameters for a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerMemoryDescriptor {
    pub memory: i64,
    pub swap: Option<i64>,
}

impl ContainerMemoryDescriptor {
    pub fn to_payload(&self) -> ParsedPayload {
        let mut payload = ParsedPayload::new();
        payload.insert("memory", self.memory);
        if let Some(swap) = self.swap {
            payload.insert("swap", swap);
        }
        payload
    }
}

pub fn build_container_memory(group: &AttributeMap) -> Result<ContainerMemoryDescriptor> {
    let descriptor = ContainerMemoryDescriptor {
        memory: require_integer(group, GROUP, "memory")?,
        swap: get_integer(group, GROUP, "swap")?,
    };
    debug!(?descriptor, "Built container memory descriptor");
    Ok(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShapeError;
    use crate::types::ParamValue;
    use serde_json::json;

    fn group(value: serde_json::Value) -> AttributeMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_ballooning_enabled() {
        let memory = build_memory(&group(json!({
            "memory": "2048",
            "min_memory": "1024",
            "balloon": "1",
            "shares": "500",
        })))
        .unwrap();

        assert_eq!(
            memory.ballooning,
            Ballooning::Enabled { min_memory: 1024, shares: 500 }
        );

        let payload = memory.to_payload();
        assert_eq!(payload.get("memory"), Some(&ParamValue::Int(2048)));
        assert_eq!(payload.get("balloon"), Some(&ParamValue::Int(1024)));
        assert_eq!(payload.get("shares"), Some(&ParamValue::Int(500)));
    }

    #[test]
    fn test_ballooning_disabled() {
        let memory = build_memory(&group(json!({
            "memory": "512",
            "min_memory": "",
            "balloon": "0",
            "shares": "",
        })))
        .unwrap();

        let payload = memory.to_payload();
        assert_eq!(payload.len(), 2);
        assert_eq!(payload.get("balloon"), Some(&ParamValue::Int(0)));
        assert!(!payload.contains_key("shares"));
    }

    #[test]
    fn test_enabled_requires_floor() {
        let err = build_memory(&group(json!({
            "memory": "512",
            "balloon": "1",
            "shares": "1000",
        })))
        .unwrap_err();

        assert_eq!(err, ShapeError::MissingField { field: "config.min_memory".to_string() });
    }

    #[test]
    fn test_container_memory() {
        let memory = build_container_memory(&group(json!({
            "memory": "536870912",
            "swap": "536870912",
        })))
        .unwrap();

        let payload = memory.to_payload();
        assert_eq!(payload.get("memory"), Some(&ParamValue::Int(536870912)));
        assert_eq!(payload.get("swap"), Some(&ParamValue::Int(536870912)));
    }
}
