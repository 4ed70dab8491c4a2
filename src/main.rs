use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use sling_config::{load_config, load_file, Config};

mod cli;
mod logging;
mod runner;

fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("could not determine the config directory")?;
    Ok(base.join("sling"))
}

fn load(args: &cli::Args) -> Result<Config> {
    if let Some(path) = &args.config {
        return load_file(path).with_context(|| format!("cannot load {}", path.display()));
    }
    let project_dir = env::current_dir().ok();
    load_config(&config_dir()?, project_dir.as_deref()).context("cannot load configuration")
}

fn run(args: cli::Args) -> Result<i32> {
    let config = load(&args)?;
    let log_path = logging::init(&config.log)?;
    info!(log = %log_path.display(), "sling starting");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;
    let result = runtime.block_on(runner::run(config, args));
    if let Err(e) = &result {
        error!("session failed: {e:#}");
    }
    result
}

fn main() {
    let args = cli::Args::parse();
    match run(args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("sling: {e:#}");
            std::process::exit(1);
        }
    }
}
