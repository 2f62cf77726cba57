mod app;
mod args;
mod bot;
mod config;
mod error;
mod line;
mod services;
mod web;

pub type Result<T> = std::result::Result<T, error::Error>;
pub type ShutdownRx = watch::Receiver<()>;

use app::App;
use args::{Args, Command};
use clap::Parser;
use config::Config;
use mimalloc::MiMalloc;
use std::path::Path;
use tokio::{signal, sync::watch};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load()?;
    let app = App::new(config)?;

    match args.subcommand {
        None => run(app).await,
        Some(Command::RichMenu {
            definition,
            image,
            default,
        }) => upload_rich_menu(app, &definition, &image, default).await,
    }
}

async fn run(app: App) -> anyhow::Result<()> {
    if app.nlp.is_some() {
        info!("Address extraction is enabled");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(());

    tokio::spawn(async move {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Could not listen for shutdown signal: {err}");
            // Dropping the sender would stop the server
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal");
        shutdown_tx.send(()).ok();
    });

    web::run(app, shutdown_rx).await
}

async fn upload_rich_menu(
    app: App,
    definition: &Path,
    image: &Path,
    set_default: bool,
) -> anyhow::Result<()> {
    let rich_menu_id = line::rich_menu::upload(&app.line, definition, image, set_default).await?;
    println!("{rich_menu_id}");

    Ok(())
}
