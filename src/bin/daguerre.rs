//! Saves every image sent to the bot into a local directory.
#[macro_use]
extern crate log;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use argh::FromArgs;
use daguerre::*;

/// Telegram bot that saves the images you send it to local disk.
#[derive(FromArgs)]
struct Args {
    /// directory to save images in (overrides SAVE_PATH)
    #[argh(option)]
    save_path: Option<PathBuf>,

    /// long-poll timeout in seconds (overrides POLL_TIMEOUT)
    #[argh(option, from_str_fn(poll_timeout_flag))]
    poll_timeout: Option<i64>,

    /// dotenv file to load before reading the environment
    #[argh(option, default = "PathBuf::from(\".env\")")]
    env_file: PathBuf,
}

fn poll_timeout_flag(value: &str) -> Result<i64, String> {
    config::parse_poll_timeout(value).map_err(|err| err.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();

    // Load the dotenv file before the logger so it can set RUST_LOG.
    let dotenv = dotenvy::from_path(&args.env_file);
    daguerre::init_logger();
    match dotenv {
        Ok(()) => info!("Loaded {}", args.env_file.display()),
        Err(err) if err.not_found() => {}
        Err(err) => warn!("Could not load {}: {}", args.env_file.display(), err),
    }

    let mut config = Config::from_env().context("Invalid configuration")?;
    if let Some(save_path) = args.save_path {
        config = config.with_save_path(save_path);
    }
    if let Some(poll_timeout) = args.poll_timeout {
        config = config.with_poll_timeout_s(poll_timeout);
    }
    let config = Arc::new(config);

    let ingest = Arc::new(Ingest::new(Arc::clone(&config)));
    ingest.ensure_directory().await?;

    info!("Starting daguerre...");
    info!("Images will be saved to: {}", config.save_path().display());
    match config.allowed_users {
        Some(ref allowed) => info!("Restricted to user IDs: {}", allowed),
        None => info!("Open to all users (no restrictions)"),
    }

    let mut router =
        Router::new(Client::new(config.token.clone())).with_poll_timeout_s(config.poll_timeout_s);

    if let Err(err) = bot::register_commands(&router.api()).await {
        warn!("Could not register bot commands: {:#}", err);
    }

    bot::add_routes(&mut router, ingest);

    let (_, shutdown_tx) = router.shutdown();
    let polling = tokio::spawn(async move {
        router.start().await;
    });

    info!("Press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    shutdown_tx.send(()).await?;
    polling.await?;
    Ok(())
}
