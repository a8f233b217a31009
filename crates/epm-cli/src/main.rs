//! `epm` binary: loads configuration, installs logging, runs one command

use std::io;
use std::path::PathBuf;

use anyhow::Context;
use epm_config::Config;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let matches = epm_cli::build().get_matches();

    let config_path = matches.get_one::<PathBuf>("config").cloned();
    let config = Config::load(config_path.as_deref()).context("loading configuration")?;

    let filter = EnvFilter::try_new(&config.log_filter)
        .with_context(|| format!("invalid log filter '{}'", config.log_filter))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    epm_cli::run(&matches, &config, &mut out)
}
