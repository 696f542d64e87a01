//! Settings resolution for the CLI.

use anyhow::Result;
use limiquantix_pve::{ProvisionSettings, DEFAULT_SETTINGS_PATH};
use std::path::Path;

use crate::cli::Args;

/// Load settings from the explicit path, else the default location, else
/// built-in defaults; then apply CLI overrides.
pub fn load(args: &Args) -> Result<ProvisionSettings> {
    let settings = match &args.config {
        Some(path) => ProvisionSettings::load(path)?,
        None if Path::new(DEFAULT_SETTINGS_PATH).exists() => ProvisionSettings::load(DEFAULT_SETTINGS_PATH)?,
        None => ProvisionSettings::default(),
    };

    let settings = with_cli_overrides(settings, args);
    settings.validate()?;
    Ok(settings)
}

fn with_cli_overrides(mut settings: ProvisionSettings, args: &Args) -> ProvisionSettings {
    if let Some(ref level) = args.log_level {
        settings.log_level = level.clone();
    }

    if let Some(ref format) = args.log_format {
        settings.log_format = format.clone();
    }

    settings
}
