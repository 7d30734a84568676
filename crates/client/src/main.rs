//! Vitals scenario runner.
//!
//! Plays a scripted scenario against the attribute runtime and prints the
//! report as JSON on stdout.
//!
//! # Examples
//!
//! ```bash
//! # Built-in hero-vs-goblin scenario
//! cargo run -p vitals-client
//!
//! # Custom scenario, hard-clamp rescaling, debug logs to a file
//! VITALS_RESCALE_POLICY=hard_clamp VITALS_LOG_DIR=default RUST_LOG=debug \
//!     cargo run -p vitals-client -- path/to/scenario.toml
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use vitals_client::{ClientConfig, Scenario, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let mut config = ClientConfig::from_env();
    if let Some(path) = std::env::args_os().nth(1) {
        config.scenario_file = Some(PathBuf::from(path));
    }

    let _guard = logging::setup_logging(config.log_dir.as_deref())?;

    let runtime_config = config.runtime_config()?;
    tracing::info!(
        "Rescale policy: {}, regen interval: {:?}",
        runtime_config.vitals.rescale_policy,
        runtime_config.vitals.regen_interval()
    );

    let scenario = match &config.scenario_file {
        Some(path) => Scenario::load(path)?,
        None => Scenario::builtin()?,
    };

    let report = scenario.run(runtime_config).await?;

    let json = serde_json::to_string_pretty(&report).context("Failed to encode report")?;
    println!("{json}");

    Ok(())
}
