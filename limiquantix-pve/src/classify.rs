//! Partitioning of a flat config group into cpu, memory and leftover keys.

use crate::types::{AttributeMap, Variant};

/// Static key sets that drive classification for one guest type.
#[derive(Debug, Clone, Copy)]
pub struct Taxonomy {
    /// Keys consumed by the cpu builder
    pub cpu_keys: &'static [&'static str],
    /// Keys consumed by the memory builder
    pub memory_keys: &'static [&'static str],
    /// Keys consumed by the caller and never sent as parameters
    pub structural_keys: &'static [&'static str],
}

pub const VM_TAXONOMY: Taxonomy = Taxonomy {
    cpu_keys: &[
        "cpu_type", "spectre", "pcid", "vcpus", "cpulimit", "cpuunits", "cores", "sockets", "numa",
    ],
    memory_keys: &["memory", "min_memory", "balloon", "shares"],
    structural_keys: &[
        "node",
        "config",
        "config_attributes",
        "volumes",
        "volumes_attributes",
        "interfaces",
        "interfaces_attributes",
        "firmware_type",
        "provision_method",
    ],
};

pub const CONTAINER_TAXONOMY: Taxonomy = Taxonomy {
    cpu_keys: &["arch", "cores", "cpulimit", "cpuunits"],
    memory_keys: &["memory", "swap"],
    structural_keys: &[
        "node",
        "type",
        "name",
        "config",
        "config_attributes",
        "volumes",
        "volumes_attributes",
        "interfaces",
        "interfaces_attributes",
        "firmware_type",
        "provision_method",
    ],
};

impl Taxonomy {
    pub fn for_variant(variant: Variant) -> &'static Taxonomy {
        match variant {
            Variant::Vm => &VM_TAXONOMY,
            Variant::Container => &CONTAINER_TAXONOMY,
        }
    }

    pub fn is_structural(&self, key: &str) -> bool {
        self.structural_keys.contains(&key)
    }

    /// Copy of `attrs` without the structural keys.
    pub fn strip_structural(&self, attrs: &AttributeMap) -> AttributeMap {
        attrs
            .iter()
            .filter(|(key, _)| !self.is_structural(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// The three disjoint groups produced by [`classify`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classified {
    pub cpu: AttributeMap,
    pub memory: AttributeMap,
    pub remainder: AttributeMap,
}

/// Split `attrs` by taxonomy membership.
///
/// Cpu keys win over memory keys; structural keys are dropped from the
/// remainder. The input is left untouched.
pub fn classify(attrs: &AttributeMap, taxonomy: &Taxonomy) -> Classified {
    let mut classified = Classified::default();

    for (key, value) in attrs {
        let target = if taxonomy.cpu_keys.contains(&key.as_str()) {
            &mut classified.cpu
        } else if taxonomy.memory_keys.contains(&key.as_str()) {
            &mut classified.memory
        } else if taxonomy.is_structural(key) {
            continue;
        } else {
            &mut classified.remainder
        };
        target.insert(key.clone(), value.clone());
    }

    classified
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: serde_json::Value) -> AttributeMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_vm_partition_is_disjoint() {
        let config = attrs(json!({
            "cpu_type": "host",
            "cores": "2",
            "memory": "1024",
            "balloon": "0",
            "onboot": "1",
            "node": "pve",
        }));

        let classified = classify(&config, &VM_TAXONOMY);

        assert_eq!(classified.cpu.len(), 2);
        assert!(classified.cpu.contains_key("cpu_type"));
        assert_eq!(classified.memory.len(), 2);
        assert!(classified.memory.contains_key("balloon"));
        assert_eq!(classified.remainder.len(), 1);
        assert!(classified.remainder.contains_key("onboot"));

        for key in classified.cpu.keys() {
            assert!(!classified.memory.contains_key(key));
            assert!(!classified.remainder.contains_key(key));
        }
    }

    #[test]
    fn test_container_keys() {
        let config = attrs(json!({
            "arch": "amd64",
            "cores": "1",
            "swap": "512",
            "ostype": "debian",
        }));

        let classified = classify(&config, &CONTAINER_TAXONOMY);

        assert!(classified.cpu.contains_key("arch"));
        assert!(classified.memory.contains_key("swap"));
        assert!(classified.remainder.contains_key("ostype"));
    }

    #[test]
    fn test_strip_structural() {
        let general = attrs(json!({
            "vmid": "100",
            "name": "test",
            "node": "pve",
            "firmware_type": "bios",
            "provision_method": "build",
        }));

        let vm = VM_TAXONOMY.strip_structural(&general);
        assert_eq!(vm.keys().collect::<Vec<_>>(), vec!["name", "vmid"]);

        let container = CONTAINER_TAXONOMY.strip_structural(&general);
        assert_eq!(container.keys().collect::<Vec<_>>(), vec!["vmid"]);
    }
}
