//! Command-line argument parsing.

use clap::{Parser, Subcommand, ValueEnum};
use limiquantix_pve::Variant;

/// pvectl - translate host provisioning forms into Proxmox VE parameters
#[derive(Parser, Debug)]
#[command(name = "pvectl")]
#[command(about = "Translate host provisioning forms into Proxmox VE creation parameters")]
#[command(version)]
pub struct Args {
    /// Path to settings file (optional, defaults used if not found)
    #[arg(short, long, env = "PVECTL_CONFIG")]
    pub config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "PVECTL_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long, env = "PVECTL_LOG_FORMAT")]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Translate a request file and print the payload
    Translate {
        #[command(flatten)]
        request: RequestArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        output: OutputFormat,
    },

    /// Translate a request and submit it to the in-memory mock cluster
    Provision {
        #[command(flatten)]
        request: RequestArgs,

        /// Node names of the mock cluster
        #[arg(long = "mock-node", default_value = "pve")]
        mock_nodes: Vec<String>,
    },
}

#[derive(clap::Args, Debug)]
pub struct RequestArgs {
    /// Path to the request file (YAML or JSON host form)
    #[arg(short, long)]
    pub request: String,

    /// Guest type
    #[arg(short, long, value_enum, default_value = "vm")]
    pub variant: VariantArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantArg {
    Vm,
    Container,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Vm => Variant::Vm,
            VariantArg::Container => Variant::Container,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed JSON object
    Json,
    /// YAML mapping
    Yaml,
    /// One `name=value` line per parameter
    Form,
}
