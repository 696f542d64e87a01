//! Provisioning requests and parsing of the nested host form.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attributes::{get_text, text};
use crate::error::{Result, ShapeError};
use crate::types::AttributeMap;

const CONFIG_KEYS: [&str; 2] = ["config_attributes", "config"];
const VOLUME_KEYS: [&str; 2] = ["volumes_attributes", "volumes"];
const INTERFACE_KEYS: [&str; 2] = ["interfaces_attributes", "interfaces"];

/// One host provisioning request, split into its groups.
///
/// Volumes and interfaces are kept in submission order; that order decides
/// which entry wins when two resolve to the same payload key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningRequest {
    /// Top-level keys: vmid, node, name, firmware type, provision method, ...
    pub general: AttributeMap,
    /// CPU, memory and miscellaneous guest settings
    pub config: AttributeMap,
    /// Disk groups
    pub volumes: Vec<AttributeMap>,
    /// Network interface groups
    pub interfaces: Vec<AttributeMap>,
}

impl ProvisioningRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a general attribute.
    pub fn with_general(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.general.insert(key.into(), value.into());
        self
    }

    /// Set a config attribute.
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Append a volume group.
    pub fn with_volume(mut self, volume: AttributeMap) -> Self {
        self.volumes.push(volume);
        self
    }

    /// Append an interface group.
    pub fn with_interface(mut self, interface: AttributeMap) -> Self {
        self.interfaces.push(interface);
        self
    }

    /// Parse the nested form shape submitted by the host UI.
    ///
    /// Config lives under `config_attributes` (or `config`); volumes and
    /// interfaces under `volumes_attributes` / `interfaces_attributes` (or
    /// the bare names). Indexed groups may be arrays or objects keyed by
    /// decimal index; objects are ordered by index value. Every other
    /// top-level key is general.
    pub fn from_form(form: &Value) -> Result<Self> {
        let form = form.as_object().ok_or_else(|| ShapeError::NotAMapping {
            group: "request".to_string(),
        })?;

        let mut request = ProvisioningRequest::new();

        for (key, value) in form {
            if CONFIG_KEYS.contains(&key.as_str()) {
                request.config.extend(mapping(key, value)?);
            } else if VOLUME_KEYS.contains(&key.as_str()) {
                request.volumes.extend(indexed_groups(key, value)?);
            } else if INTERFACE_KEYS.contains(&key.as_str()) {
                request.interfaces.extend(indexed_groups(key, value)?);
            } else {
                request.general.insert(key.clone(), value.clone());
            }
        }

        Ok(request)
    }

    /// The requested vmid, if one was given.
    pub fn vmid(&self) -> Result<Option<String>> {
        get_text(&self.general, "general", "vmid")
    }

    /// The requested node name, if one was given.
    ///
    /// Accepts either a plain name or a node record with a `node`/`name` key.
    pub fn node(&self) -> Result<Option<String>> {
        match self.general.get("node") {
            None => Ok(None),
            Some(Value::Object(record)) => match get_text(record, "general.node", "node")? {
                Some(node) => Ok(Some(node)),
                None => get_text(record, "general.node", "name"),
            },
            Some(value) => text("general.node", value),
        }
    }
}

fn mapping(group: &str, value: &Value) -> Result<AttributeMap> {
    match value {
        Value::Null => Ok(AttributeMap::new()),
        Value::Object(map) => Ok(map.clone()),
        _ => Err(ShapeError::NotAMapping {
            group: group.to_string(),
        }),
    }
}

fn indexed_groups(group: &str, value: &Value) -> Result<Vec<AttributeMap>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| mapping(&format!("{}[{}]", group, index), item))
            .collect(),
        Value::Object(entries) => {
            let mut indexed = entries
                .iter()
                .map(|(index, item)| -> Result<(u64, AttributeMap)> {
                    let position = index.trim().parse::<u64>().map_err(|_| ShapeError::InvalidIndex {
                        group: group.to_string(),
                        index: index.clone(),
                    })?;
                    Ok((position, mapping(&format!("{}[{}]", group, index), item)?))
                })
                .collect::<Result<Vec<_>>>()?;
            indexed.sort_by_key(|(position, _)| *position);
            Ok(indexed.into_iter().map(|(_, item)| item).collect())
        }
        _ => Err(ShapeError::NotAMapping {
            group: group.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_indexed_object_is_ordered_numerically() {
        let request = ProvisioningRequest::from_form(&json!({
            "vmid": "100",
            "volumes_attributes": {
                "10": { "id": "mp9" },
                "2": { "id": "mp1" },
                "0": { "id": "rootfs" },
            },
        }))
        .unwrap();

        let ids: Vec<_> = request
            .volumes
            .iter()
            .map(|v| v["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["rootfs", "mp1", "mp9"]);
        assert_eq!(request.general.len(), 1);
    }

    #[test]
    fn test_array_groups() {
        let request = ProvisioningRequest::from_form(&json!({
            "config": { "cores": "2" },
            "interfaces": [
                { "id": "net0" },
                { "id": "net1" },
            ],
        }))
        .unwrap();

        assert_eq!(request.interfaces.len(), 2);
        assert_eq!(request.config["cores"], "2");
    }

    #[test]
    fn test_non_mapping_group() {
        let err = ProvisioningRequest::from_form(&json!({ "config_attributes": "cores=2" })).unwrap_err();
        assert_eq!(err, ShapeError::NotAMapping { group: "config_attributes".to_string() });

        let err = ProvisioningRequest::from_form(&json!(["vmid"])).unwrap_err();
        assert_eq!(err, ShapeError::NotAMapping { group: "request".to_string() });

        let err = ProvisioningRequest::from_form(&json!({ "volumes_attributes": { "a": {} } })).unwrap_err();
        assert!(matches!(err, ShapeError::InvalidIndex { .. }));
    }

    #[test]
    fn test_node_accepts_record() {
        let request = ProvisioningRequest::new().with_general("node", json!({ "name": "pve" }));
        assert_eq!(request.node().unwrap().as_deref(), Some("pve"));

        let request = ProvisioningRequest::new().with_general("node", "pve2");
        assert_eq!(request.node().unwrap().as_deref(), Some("pve2"));

        assert_eq!(ProvisioningRequest::new().node().unwrap(), None);
    }
}
