//! Translator settings, loaded from YAML.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::SettingsError;
use crate::interface::InterfaceEncoding;
use crate::types::Variant;

/// Default settings file location.
pub const DEFAULT_SETTINGS_PATH: &str = "/etc/limiquantix/pve.yaml";

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const VALID_LOG_FORMATS: [&str; 2] = ["pretty", "json"];

/// Provisioning settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionSettings {
    /// Virtual machine translation settings
    pub vm: VariantSettings,
    /// Container translation settings
    pub container: VariantSettings,
    /// Range accepted by the default vmid validator
    pub vmid: VmidRange,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log format (pretty, json)
    pub log_format: String,
}

impl Default for ProvisionSettings {
    fn default() -> Self {
        Self {
            vm: VariantSettings::default(),
            container: VariantSettings::default(),
            vmid: VmidRange::default(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

/// Per guest type settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantSettings {
    /// Label for the interface name field; `model` for VMs and `name` for
    /// containers when unset
    pub interface_name_key: Option<String>,
}

/// Inclusive range of acceptable guest ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmidRange {
    pub min: u32,
    pub max: u32,
}

impl Default for VmidRange {
    fn default() -> Self {
        Self {
            min: 100,
            max: 999_999_999,
        }
    }
}

impl VmidRange {
    /// Whether `candidate` is a canonical decimal id inside the range.
    pub fn contains(&self, candidate: &str) -> bool {
        let candidate = candidate.trim();
        if candidate.is_empty()
            || candidate.starts_with('0')
            || !candidate.bytes().all(|b| b.is_ascii_digit())
        {
            return false;
        }
        candidate
            .parse::<u32>()
            .map(|id| (self.min..=self.max).contains(&id))
            .unwrap_or(false)
    }
}

impl ProvisionSettings {
    /// Load settings from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        let settings: ProvisionSettings = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Interface encoding for `variant`.
    pub fn interface_encoding(&self, variant: Variant) -> InterfaceEncoding {
        let configured = match variant {
            Variant::Vm => &self.vm.interface_name_key,
            Variant::Container => &self.container.interface_name_key,
        };
        match (configured, variant) {
            (Some(key), _) => InterfaceEncoding::new(key.clone()),
            (None, Variant::Vm) => InterfaceEncoding::vm(),
            (None, Variant::Container) => InterfaceEncoding::container(),
        }
    }

    /// Validate settings.
    pub fn validate(&self) -> std::result::Result<(), SettingsError> {
        for (field, variant) in [("vm", &self.vm), ("container", &self.container)] {
            if let Some(key) = &variant.interface_name_key {
                if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                    return Err(SettingsError::InvalidValue {
                        field: format!("{}.interface_name_key", field),
                        message: format!("'{}' is not a valid parameter name", key),
                    });
                }
            }
        }

        if self.vmid.min == 0 || self.vmid.min > self.vmid.max {
            return Err(SettingsError::InvalidValue {
                field: "vmid".to_string(),
                message: format!("invalid range {}..={}", self.vmid.min, self.vmid.max),
            });
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(SettingsError::InvalidValue {
                field: "log_level".to_string(),
                message: format!("must be one of: {:?}", VALID_LOG_LEVELS),
            });
        }

        if !VALID_LOG_FORMATS.contains(&self.log_format.to_lowercase().as_str()) {
            return Err(SettingsError::InvalidValue {
                field: "log_format".to_string(),
                message: format!("must be one of: {:?}", VALID_LOG_FORMATS),
            });
        }

        Ok(())
    }
}
