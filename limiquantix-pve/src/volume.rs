//! Disk volume actions.
//!
//! Each indexed volume group becomes one payload entry: either the slot id
//! mapped to a disk spec (`scsi0 => local-lvm:32,cache=writeback`) or
//! `delete => <slot id>`.

use tracing::{debug, warn};

use crate::attributes::{field_path, flag, get_text, require_text, text};
use crate::error::{Result, ShapeError};
use crate::types::{AttributeMap, ParsedPayload, Variant, DELETE_KEY};

/// Fields that describe the slot itself and never become disk options.
const RESERVED_FIELDS: [&str; 6] = ["bus", "device", "storage", "size", "_delete", "id"];

/// Container mount points without an explicit id are named `mp<device>`.
const MOUNT_POINT_PREFIX: &str = "mp";

/// What to do with one disk slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeAction {
    Add {
        /// Slot id (`scsi0`, `rootfs`, `mp0`)
        id: String,
        storage: String,
        size: String,
        /// Extra `key=value` options, comma-joined; empty when there are none
        options: String,
    },
    Delete { id: String },
}

impl VolumeAction {
    pub fn id(&self) -> &str {
        match self {
            VolumeAction::Add { id, .. } | VolumeAction::Delete { id } => id,
        }
    }

    /// Disk spec in `storage:size[,key=value]*` form, for additions.
    pub fn disk_spec(&self) -> Option<String> {
        match self {
            VolumeAction::Add { storage, size, options, .. } => {
                let mut spec = format!("{}:{}", storage, size);
                if !options.is_empty() {
                    spec.push(',');
                    spec.push_str(options);
                }
                Some(spec)
            }
            VolumeAction::Delete { .. } => None,
        }
    }

    pub fn to_payload(&self) -> ParsedPayload {
        let mut payload = ParsedPayload::new();
        match self {
            VolumeAction::Add { id, .. } => {
                payload.insert(id.as_str(), self.disk_spec().unwrap_or_default());
            }
            VolumeAction::Delete { id } => {
                payload.insert(DELETE_KEY, id.as_str());
            }
        }
        payload
    }
}

fn slot_id(group: &AttributeMap, path: &str, variant: Variant) -> Result<String> {
    let device = get_text(group, path, "device")?.unwrap_or_default();
    match variant {
        Variant::Vm => {
            let bus = require_text(group, path, "bus")?;
            Ok(format!("{}{}", bus, device))
        }
        Variant::Container => match get_text(group, path, "id")? {
            Some(id) => Ok(id),
            None if !device.is_empty() => Ok(format!("{}{}", MOUNT_POINT_PREFIX, device)),
            None => Err(ShapeError::MissingField {
                field: field_path(path, "id"),
            }),
        },
    }
}

/// Build the action for the volume group at `index`.
pub fn build_volume(group: &AttributeMap, index: usize, variant: Variant) -> Result<VolumeAction> {
    let path = format!("volumes[{}]", index);
    let id = slot_id(group, &path, variant)?;

    if flag(group, &path, "_delete")? {
        debug!(id = %id, "Volume marked for deletion");
        return Ok(VolumeAction::Delete { id });
    }

    let storage = require_text(group, &path, "storage")?;
    let size = require_text(group, &path, "size")?;

    let mut options = Vec::new();
    for (key, value) in group {
        if RESERVED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        if let Some(value) = text(&field_path(&path, key), value)? {
            options.push(format!("{}={}", key, value));
        }
    }

    let action = VolumeAction::Add {
        id,
        storage,
        size,
        options: options.join(","),
    };
    debug!(?action, "Built volume action");
    Ok(action)
}

/// Build every volume group in order and merge the results.
///
/// Later groups override earlier ones when two resolve to the same key.
pub fn build_volumes(groups: &[AttributeMap], variant: Variant) -> Result<ParsedPayload> {
    let mut payload = ParsedPayload::new();
    for (index, group) in groups.iter().enumerate() {
        for (key, value) in build_volume(group, index, variant)?.to_payload() {
            if let Some(previous) = payload.insert_action(key.clone(), value) {
                warn!(key = %key, previous = %previous, index, "Volume entry overrides an earlier one");
            }
        }
    }
    Ok(payload)
}
