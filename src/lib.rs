pub mod cli;
pub mod commands;

pub use tdo_core as core;
pub use tdo_core::{ClientConfig, RemoteClient, TaskEngine};

use anyhow::Result;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

/// Initialize tracing from an optional directive (`--log`), falling back to
/// the environment and then to warnings only.
pub fn init_tracing(filter: Option<String>) -> Result<()> {
    let filter = filter.unwrap_or_else(|| "warn".to_string());
    let directive: Directive = filter.parse()?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .try_init();
    Ok(())
}
