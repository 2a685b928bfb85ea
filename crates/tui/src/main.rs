mod app;

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    sync::Mutex,
};

use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};
use vibr_core::{
    config::{self, AppConfig},
    FileStore, GenerationClient, LifecycleController, Repository,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config::ensure_default_config()?;
    let config = AppConfig::load()?;
    init_logging(&config)?;
    info!(config = %config_path.display(), data_dir = %config.data_dir.display(), "Starting Vibr");

    let repository = Repository::init(FileStore::new(&config.data_dir))
        .context("failed to open saved games")?;
    let client = GenerationClient::from_config(&config.generator)
        .context("failed to configure generator")?;
    let controller = LifecycleController::new(repository, client);

    let mut app = app::VibrApp::new(controller, config);
    app.run().await
}

fn init_logging(config: &AppConfig) -> Result<()> {
    fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("failed to create {}", config.log_dir.display()))?;
    let log_path = config.log_dir.join("vibr.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // The terminal belongs to the UI, so logs only go to the file.
    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
