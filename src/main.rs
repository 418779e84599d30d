mod ai;
mod app;
mod config;
mod db;
mod dom;
mod domain;
mod feed;
mod guard;
mod infrastructure;
mod store;
mod tasks;

use anyhow::Result;
use infrastructure::{directories, logging, shutdown};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_config()?;
    let paths = directories::ensure_directories(&config.directories)?;
    logging::init_tracing(&config.logging, &paths)?;

    let (shutdown, _) = shutdown::Shutdown::new();
    shutdown::install_signal_handlers(shutdown.clone());

    let app = app::FeedGuardApp::initialize(config, paths, shutdown.clone()).await?;
    app.run().await
}
