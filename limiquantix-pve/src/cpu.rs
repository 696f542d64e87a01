//! CPU descriptor builders.

use tracing::debug;

use crate::attributes::{flag, get_integer, get_text, require_text};
use crate::error::Result;
use crate::types::{AttributeMap, ParsedPayload};

const GROUP: &str = "config";

/// CPU parameters for a virtual machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuDescriptor {
    /// Model and flag string (`cputype=host,flags=+spec-ctrl`)
    pub cpu: String,
    pub cores: Option<i64>,
    pub sockets: Option<i64>,
    pub vcpus: Option<i64>,
    pub cpulimit: Option<i64>,
    pub cpuunits: Option<i64>,
    pub numa: Option<i64>,
}

impl CpuDescriptor {
    pub fn to_payload(&self) -> ParsedPayload {
        let mut payload = ParsedPayload::new();
        payload.insert("cpu", self.cpu.as_str());
        let fields = [
            ("cores", self.cores),
            ("sockets", self.sockets),
            ("vcpus", self.vcpus),
            ("cpulimit", self.cpulimit),
            ("cpuunits", self.cpuunits),
            ("numa", self.numa),
        ];
        for (key, value) in fields {
            if let Some(v) = value {
                payload.insert(key, v);
            }
        }
        payload
    }
}

/// Build the `cpu` option string from a model and the two mitigation flags.
pub fn cpu_flag_string(cpu_type: &str, spectre: bool, pcid: bool) -> String {
    let mut cpu = format!("cputype={}", cpu_type);
    if spectre || pcid {
        cpu.push_str(",flags=");
    }
    if spectre {
        cpu.push_str("+spec-ctrl");
    }
    if spectre && pcid {
        cpu.push(';');
    }
    if pcid {
        cpu.push_str("+pcid");
    }
    cpu
}

/// Build the VM cpu descriptor from the cpu group.
///
/// `cpu_type` is required; the topology fields are optional and blank
/// values are dropped.
pub fn build_cpu(group: &AttributeMap) -> Result<CpuDescriptor> {
    let cpu_type = require_text(group, GROUP, "cpu_type")?;
    let spectre = flag(group, GROUP, "spectre")?;
    let pcid = flag(group, GROUP, "pcid")?;

    let descriptor = CpuDescriptor {
        cpu: cpu_flag_string(&cpu_type, spectre, pcid),
        cores: get_integer(group, GROUP, "cores")?,
        sockets: get_integer(group, GROUP, "sockets")?,
        vcpus: get_integer(group, GROUP, "vcpus")?,
        cpulimit: get_integer(group, GROUP, "cpulimit")?,
        cpuunits: get_integer(group, GROUP, "cpuunits")?,
        numa: get_integer(group, GROUP, "numa")?,
    };

    debug!(cpu = %descriptor.cpu, "Built cpu descriptor");
    Ok(descriptor)
}

/// CPU parameters for a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerCpuDescriptor {
    /// Guest architecture (`amd64`, `arm64`, ...)
    pub arch: Option<String>,
    pub cores: Option<i64>,
    pub cpulimit: Option<i64>,
    pub cpuunits: Option<i64>,
}

impl ContainerCpuDescriptor {
    pub fn to_payload(&self) -> ParsedPayload {
        let mut payload = ParsedPayload::new();
        if let Some(arch) = &self.arch {
            payload.insert("arch", arch.as_str());
        }
        let fields = [
            ("cores", self.cores),
            ("cpulimit", self.cpulimit),
            ("cpuunits", self.cpuunits),
        ];
        for (key, value) in fields {
            if let Some(v) = value {
                payload.insert(key, v);
            }
        }
        payload
    }
}

/// Build the container cpu descriptor. Every field is optional.
pub fn build_container_cpu(group: &AttributeMap) -> Result<ContainerCpuDescriptor> {
    let descriptor = ContainerCpuDescriptor {
        arch: get_text(group, GROUP, "arch")?,
        cores: get_integer(group, GROUP, "cores")?,
        cpulimit: get_integer(group, GROUP, "cpulimit")?,
        cpuunits: get_integer(group, GROUP, "cpuunits")?,
    };

    debug!(?descriptor, "Built container cpu descriptor");
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
    fn test_flag_string_combinations() {
        assert_eq!(cpu_flag_string("host", false, false), "cputype=host");
        assert_eq!(cpu_flag_string("host", true, false), "cputype=host,flags=+spec-ctrl");
        assert_eq!(cpu_flag_string("host", false, true), "cputype=host,flags=+pcid");
        assert_eq!(
            cpu_flag_string("kvm64", true, true),
            "cputype=kvm64,flags=+spec-ctrl;+pcid"
        );
    }

    #[test]
    fn test_spectre_only() {
        let cpu = build_cpu(&group(json!({
            "cpu_type": "host",
            "spectre": "1",
            "pcid": "0",
        })))
        .unwrap();

        assert_eq!(cpu.cpu, "cputype=host,flags=+spec-ctrl");
    }

    #[test]
    fn test_topology_is_coerced_and_blanks_dropped() {
        let cpu = build_cpu(&group(json!({
            "cpu_type": "kvm64",
            "spectre": "0",
            "pcid": "0",
            "cores": "2",
            "sockets": "1",
            "vcpus": "",
            "cpulimit": "",
            "cpuunits": "1024",
            "numa": "0",
        })))
        .unwrap();

        let payload = cpu.to_payload();
        assert_eq!(payload.get("cpu").and_then(ParamValue::as_str), Some("cputype=kvm64"));
        assert_eq!(payload.get("cores"), Some(&ParamValue::Int(2)));
        assert_eq!(payload.get("cpuunits"), Some(&ParamValue::Int(1024)));
        assert_eq!(payload.get("numa"), Some(&ParamValue::Int(0)));
        assert!(!payload.contains_key("vcpus"));
        assert!(!payload.contains_key("cpulimit"));
        assert!(!payload.contains_key("spectre"));
        assert!(!payload.contains_key("cpu_type"));
    }

    #[test]
    fn test_missing_cpu_type() {
        let err = build_cpu(&group(json!({ "cores": "2" }))).unwrap_err();
        assert_eq!(err, ShapeError::MissingField { field: "config.cpu_type".to_string() });
    }

    #[test]
    fn test_container_cpu_keeps_arch_text() {
        let cpu = build_container_cpu(&group(json!({
            "arch": "amd64",
            "cores": "1",
            "cpulimit": "",
            "cpuunits": "",
        })))
        .unwrap();

        let payload = cpu.to_payload();
        assert_eq!(payload.len(), 2);
        assert_eq!(payload.get("arch").and_then(ParamValue::as_str), Some("amd64"));
        assert_eq!(payload.get("cores"), Some(&ParamValue::Int(1)));
    }
}
