//! Type definitions for provisioning requests, payloads and instance references.

use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;
use std::str::FromStr;

/// Parameter listing the slots to remove.
pub const DELETE_KEY: &str = "delete";

/// A flat group of form attributes (`cores => "2"`, `bridge => "vmbr0"`).
pub type AttributeMap = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// VARIANT
// =============================================================================

/// Guest type being provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Full virtual machine (QEMU/KVM)
    Vm,
    /// OS-level container (LXC)
    Container,
}

impl Variant {
    /// Get the API path segment for this guest type.
    pub fn api_path(&self) -> &'static str {
        match self {
            Variant::Vm => "qemu",
            Variant::Container => "lxc",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Vm => write!(f, "vm"),
            Variant::Container => write!(f, "container"),
        }
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vm" | "qemu" => Ok(Variant::Vm),
            "container" | "lxc" => Ok(Variant::Container),
            other => Err(format!("unknown variant '{}'", other)),
        }
    }
}

// =============================================================================
// PAYLOAD
// =============================================================================

/// A single scalar creation parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Text(String),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            ParamValue::Int(_) => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(i64::from(v))
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Int(i64::from(v))
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

/// The flat parameter map submitted to the creation API.
///
/// Keys are kept sorted so that two translations of the same request
/// serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParsedPayload(BTreeMap<String, ParamValue>);

impl ParsedPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parameter, returning the value it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Option<ParamValue> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, ParamValue> {
        self.0.iter()
    }

    /// Merge `other` into `self`; entries from `other` win on collision.
    pub fn merge(&mut self, other: ParsedPayload) {
        self.0.extend(other.0);
    }

    /// Insert a slot action entry. Slot ids under `delete` accumulate into a
    /// comma-separated list; any other key replaces the earlier entry, which
    /// is returned.
    pub fn insert_action(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Option<ParamValue> {
        let key = key.into();
        let value = value.into();
        if key == DELETE_KEY {
            if let (Some(ParamValue::Text(existing)), ParamValue::Text(slot)) = (self.0.get_mut(&key), &value) {
                if !existing.split(',').any(|id| id == slot) {
                    existing.push(',');
                    existing.push_str(slot);
                }
                return None;
            }
        }
        self.0.insert(key, value)
    }

    /// Merge slot actions from `other` with [`ParsedPayload::insert_action`].
    pub fn merge_actions(&mut self, other: ParsedPayload) {
        for (key, value) in other.0 {
            self.insert_action(key, value);
        }
    }

    /// The `vmid` parameter, when it holds a valid id.
    pub fn vmid(&self) -> Option<u32> {
        match self.0.get("vmid")? {
            ParamValue::Int(v) => u32::try_from(*v).ok(),
            ParamValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Render as `(name, value)` pairs for a form-encoded request body.
    pub fn to_form_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}

impl FromIterator<(String, ParamValue)> for ParsedPayload {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ParsedPayload {
    type Item = (String, ParamValue);
    type IntoIter = btree_map::IntoIter<String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ParsedPayload {
    type Item = (&'a String, &'a ParamValue);
    type IntoIter = btree_map::Iter<'a, String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// =============================================================================
// CLUSTER REFERENCES
// =============================================================================

/// A node in the cluster, as listed by the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    /// The node name (e.g., "pve1")
    pub node: String,
    /// Current node status (e.g., "online")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl NodeRef {
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            status: None,
        }
    }
}

/// A guest created on a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceRef {
    /// Node hosting the guest
    pub node: String,
    /// Cluster-wide guest id
    pub vmid: u32,
    /// Guest type
    pub variant: Variant,
}

impl fmt::Display for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} on {}", self.variant, self.vmid, self.node)
    }
}
