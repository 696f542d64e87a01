//! # pvectl
//!
//! Translates host provisioning forms into Proxmox VE creation parameters.
//!
//! ## Usage
//! ```bash
//! pvectl translate --request host.yaml --variant container --output form
//! pvectl provision --request host.yaml --variant vm --mock-node pve1 --mock-node pve2
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use limiquantix_common::LogFormat;
use limiquantix_pve::{
    MockClient, ParsedPayload, ProvisionSettings, Provisioner, ProvisioningRequest, Translator,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

mod cli;
mod config;

use cli::{Args, Command, OutputFormat, RequestArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = config::load(&args)?;

    let log_format: LogFormat = settings.log_format.parse()?;
    limiquantix_common::init_logging(&settings.log_level, log_format)?;

    match &args.command {
        Command::Translate { request, output } => translate(&settings, request, *output),
        Command::Provision { request, mock_nodes } => provision(&settings, request, mock_nodes).await,
    }
}

fn translate(settings: &ProvisionSettings, args: &RequestArgs, output: OutputFormat) -> Result<()> {
    let request = read_request(&args.request)?;
    let payload = Translator::new(settings)
        .translate(&request, args.variant.into())
        .with_context(|| format!("Failed to translate {}", args.request))?;

    print!("{}", render(&payload, output)?);
    Ok(())
}

async fn provision(settings: &ProvisionSettings, args: &RequestArgs, mock_nodes: &[String]) -> Result<()> {
    let request = read_request(&args.request)?;
    let client = Arc::new(
        MockClient::new(mock_nodes.iter().cloned()).with_vmid_range(settings.vmid),
    );
    let provisioner = Provisioner::new(client.clone(), settings);

    match provisioner.create_and_provision(&request, args.variant.into()).await {
        Ok(instance) => {
            info!(instance = %instance, "Provisioned on mock cluster");
            if let Some(payload) = client.instance_payload(instance.vmid) {
                print!("{}", render(&payload, OutputFormat::Json)?);
            }
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Provisioning failed");
            Err(e.into())
        }
    }
}

fn read_request(path: &str) -> Result<ProvisioningRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request file: {}", path))?;

    let is_json = Path::new(path)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let form: serde_json::Value = if is_json {
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path))?
    } else {
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path))?
    };

    Ok(ProvisioningRequest::from_form(&form)?)
}

fn render(payload: &ParsedPayload, output: OutputFormat) -> Result<String> {
    Ok(match output {
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(payload)?),
        OutputFormat::Yaml => serde_yaml::to_string(payload)?,
        OutputFormat::Form => payload
            .to_form_pairs()
            .into_iter()
            .map(|(name, value)| format!("{}={}\n", name, value))
            .collect(),
    })
}
