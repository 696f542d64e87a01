//! # limiquantix Common
//!
//! Shared utilities for the limiquantix provisioning tools.
//!
//! ## Logging
//!
//! ```rust,no_run
//! use limiquantix_common::{init_logging, LogFormat};
//!
//! init_logging("info", LogFormat::Pretty).unwrap();
//! tracing::info!(vmid = 100, "Provisioning request translated");
//! ```

pub mod logging;

pub use logging::{init_logging, LogFormat};
