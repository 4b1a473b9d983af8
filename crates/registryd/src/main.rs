//! registryd — loads configuration, opens the configured registry
//! identifier, and runs a liveness self-check.
//!
//! This system has no network surface (§1 Non-goals): a real deployment
//! embeds the `registry` facade directly in-process rather than talking to
//! this binary over a socket. `registryd` exists to own the ambient
//! concerns — config loading and log setup — and prove the configured
//! identifier opens cleanly.

use anyhow::{Context, Result};
use registry_core::config::RegistryConfig;

fn main() -> Result<()> {
    let config = RegistryConfig::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log.level)),
        )
        .init();

    tracing::info!(identifier = %config.default_identifier, "registryd starting");

    let mut reg = registry::Registry::open(&config.default_identifier, "registryd")
        .context("failed to open configured registry identifier")?;

    // Liveness self-check: round-trip a sentinel key through the whole
    // configured channel stack before declaring the daemon up.
    reg.set_int("registryd.liveness", 1)
        .context("liveness self-check write failed")?;
    let value = reg.get_int("registryd.liveness").context("liveness self-check read failed")?;
    if value != 1 {
        anyhow::bail!("liveness self-check returned unexpected value {value}");
    }

    tracing::info!("registryd ready");
    Ok(())
}
