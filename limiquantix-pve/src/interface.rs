//! Network interface actions.

use tracing::{debug, warn};

use crate::attributes::{flag, get_text, require_text};
use crate::error::Result;
use crate::types::{AttributeMap, ParsedPayload, DELETE_KEY};

/// Interface fields in the order they are encoded. The first one is the
/// name/model field whose label depends on the guest type.
const ENCODED_FIELDS: [&str; 5] = ["name", "bridge", "ip", "ip6", "rate"];

/// How the name field of an interface is labelled in the encoded string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceEncoding {
    pub name_key: String,
}

impl InterfaceEncoding {
    pub fn new(name_key: impl Into<String>) -> Self {
        Self { name_key: name_key.into() }
    }

    /// VM NICs carry the device model (`model=virtio`).
    pub fn vm() -> Self {
        Self::new("model")
    }

    /// Container NICs carry the in-guest interface name (`name=eth0`).
    pub fn container() -> Self {
        Self::new("name")
    }
}

/// What to do with one interface slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceAction {
    Add {
        /// Slot id (`net0`)
        slot: String,
        /// `key=value` pairs, comma-joined
        encoded: String,
    },
    Delete { slot: String },
}

impl InterfaceAction {
    pub fn slot(&self) -> &str {
        match self {
            InterfaceAction::Add { slot, .. } | InterfaceAction::Delete { slot } => slot,
        }
    }

    pub fn to_payload(&self) -> ParsedPayload {
        let mut payload = ParsedPayload::new();
        match self {
            InterfaceAction::Add { slot, encoded } => {
                payload.insert(slot.as_str(), encoded.as_str());
            }
            InterfaceAction::Delete { slot } => {
                payload.insert(DELETE_KEY, slot.as_str());
            }
        }
        payload
    }
}

/// Build the action for the interface group at `index`.
pub fn build_interface(
    group: &AttributeMap,
    index: usize,
    encoding: &InterfaceEncoding,
) -> Result<InterfaceAction> {
    let path = format!("interfaces[{}]", index);
    let slot = require_text(group, &path, "id")?;

    if flag(group, &path, "_delete")? {
        debug!(slot = %slot, "Interface marked for deletion");
        return Ok(InterfaceAction::Delete { slot });
    }

    let mut pairs = Vec::with_capacity(ENCODED_FIELDS.len());
    for (position, field) in ENCODED_FIELDS.into_iter().enumerate() {
        if let Some(value) = get_text(group, &path, field)? {
            let label = if position == 0 { encoding.name_key.as_str() } else { field };
            pairs.push(format!("{}={}", label, value));
        }
    }

    if pairs.is_empty() {
        warn!(slot = %slot, "Interface has no settings");
    }

    let action = InterfaceAction::Add {
        slot,
        encoded: pairs.join(","),
    };
    debug!(?action, "Built interface action");
    Ok(action)
}

/// Build every interface group in order and merge the results.
pub fn build_interfaces(groups: &[AttributeMap], encoding: &InterfaceEncoding) -> Result<ParsedPayload> {
    let mut payload = ParsedPayload::new();
    for (index, group) in groups.iter().enumerate() {
        for (key, value) in build_interface(group, index, encoding)?.to_payload() {
            if let Some(previous) = payload.insert_action(key.clone(), value) {
                warn!(key = %key, previous = %previous, index, "Interface entry overrides an earlier one");
            }
        }
    }
    Ok(payload)
}
