use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Initialize diagnostic logging on stderr.
///
/// `RUST_LOG` takes precedence; otherwise only warnings are shown, or
/// debug output from this crate when `verbose` is set.
pub fn init_logging(verbose: bool) -> Result<()> {
    let default_filter = if verbose { "warn,sumverify=debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::debug!("logging initialized");
    Ok(())
}
