use std::io;

use anyhow::Context;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the stderr subscriber used by the command line tool.
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects `info` and the
/// configured filter applies.
pub fn init_logging(filter: &str, verbose: bool) -> anyhow::Result<()> {
    let directive = if verbose { "info" } else { filter };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .try_init()
        .context("failed to install the log subscriber")?;
    Ok(())
}
