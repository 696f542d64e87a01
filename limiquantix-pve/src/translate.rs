//! Composition of the builders into one creation payload.

use tracing::{debug, instrument};

use crate::attributes::{field_path, get_text, param, text};
use crate::classify::{classify, Taxonomy};
use crate::cpu::{build_container_cpu, build_cpu};
use crate::error::Result;
use crate::interface::{build_interfaces, InterfaceEncoding};
use crate::memory::{build_container_memory, build_memory};
use crate::request::ProvisioningRequest;
use crate::settings::ProvisionSettings;
use crate::types::{AttributeMap, ParamValue, ParsedPayload, Variant};
use crate::volume::build_volumes;

/// Translates provisioning requests into creation payloads.
///
/// Translation is pure: the same request always yields the same payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Translator {
    vm_interfaces: InterfaceEncoding,
    container_interfaces: InterfaceEncoding,
}

impl Default for Translator {
    fn default() -> Self {
        Self {
            vm_interfaces: InterfaceEncoding::vm(),
            container_interfaces: InterfaceEncoding::container(),
        }
    }
}

impl Translator {
    pub fn new(settings: &ProvisionSettings) -> Self {
        Self {
            vm_interfaces: settings.interface_encoding(Variant::Vm),
            container_interfaces: settings.interface_encoding(Variant::Container),
        }
    }

    pub fn interface_encoding(&self, variant: Variant) -> &InterfaceEncoding {
        match variant {
            Variant::Vm => &self.vm_interfaces,
            Variant::Container => &self.container_interfaces,
        }
    }

    /// Translate `request` for the given guest type.
    ///
    /// Payload entries are merged in this order, later groups winning:
    /// general leftovers, (container) ostemplate, config leftovers, volumes,
    /// interfaces, cpu, memory. Volume and interface deletions are combined
    /// into one comma-separated `delete` list.
    #[instrument(skip_all, fields(variant = %variant))]
    pub fn translate(&self, request: &ProvisioningRequest, variant: Variant) -> Result<ParsedPayload> {
        let taxonomy = Taxonomy::for_variant(variant);
        let classified = classify(&request.config, taxonomy);

        let mut payload = passthrough(&taxonomy.strip_structural(&request.general), "general", false)?;
        if variant == Variant::Container {
            payload.merge(ostemplate(&request.general)?);
        }
        payload.merge(passthrough(&classified.remainder, "config", true)?);
        let mut actions = build_volumes(&request.volumes, variant)?;
        actions.merge_actions(build_interfaces(&request.interfaces, self.interface_encoding(variant))?);
        payload.merge(actions);

        match variant {
            Variant::Vm => {
                payload.merge(build_cpu(&classified.cpu)?.to_payload());
                payload.merge(build_memory(&classified.memory)?.to_payload());
            }
            Variant::Container => {
                payload.merge(build_container_cpu(&classified.cpu)?.to_payload());
                payload.merge(build_container_memory(&classified.memory)?.to_payload());
            }
        }

        debug!(?payload, "Translated provisioning request");
        Ok(payload)
    }
}

/// Translate with the default interface encodings.
pub fn translate(request: &ProvisioningRequest, variant: Variant) -> Result<ParsedPayload> {
    Translator::default().translate(request, variant)
}

/// Copy the non-blank scalars of `attrs`, optionally coercing numeric text.
fn passthrough(attrs: &AttributeMap, group: &str, coerce: bool) -> Result<ParsedPayload> {
    let mut payload = ParsedPayload::new();
    for (key, value) in attrs {
        let field = field_path(group, key);
        let value = if coerce {
            param(&field, value)?
        } else {
            text(&field, value)?.map(ParamValue::Text)
        };
        if let Some(value) = value {
            payload.insert(key.as_str(), value);
        }
    }
    Ok(payload)
}

/// Container template: `ostemplate` is the template file volume id.
fn ostemplate(general: &AttributeMap) -> Result<ParsedPayload> {
    let mut payload = ParsedPayload::new();
    if let Some(file) = get_text(general, "general", "ostemplate_file")? {
        payload.insert("ostemplate", file);
    }
    Ok(payload)
}
