//! `daguerre` is a Telegram bot that saves the images you send it to local
//! disk, with timestamped file names.
//!
//! # Components
//!
//! - [`Client`] is a thin shim over the Telegram Bot API HTTP endpoints, and
//! [`API`] exposes the typed methods the bot needs on top of it.
//!
//! - [`Router`] runs the long-polling loop and hands each message to the
//! handlers whose [`Route`] matches it. Handlers receive an [`Event`] and
//! return an [`Action`].
//!
//! - [`Ingest`] is the ingestion pipeline: it checks the sender against the
//! allow-list, names the file, downloads it and writes it to the save
//! directory. It returns a [`StoredFile`] or an [`IngestError`], and never
//! talks to the chat itself.
//!
//! - [`bot`] connects the two: it registers the routes for photos, documents
//! and the `/start`, `/help` and `/status` commands, and turns pipeline
//! outcomes into replies.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use daguerre::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(Config::from_env()?);
//!     let mut router = Router::new(Client::new(config.token.clone()));
//!
//!     bot::add_routes(&mut router, Arc::new(Ingest::new(config)));
//!     router.start().await;
//!     Ok(())
//! }
//! ```

#[macro_use]
extern crate log;

pub mod api;
pub mod bot;
pub mod client;
pub mod config;
pub mod error;
pub mod fake;
pub mod handler;
pub mod ingest;
pub mod router;
pub mod storage;

pub use api::{ApiResponse, API};
pub use client::*;
pub use config::{AllowList, Config, ConfigError};
pub use error::IngestError;
pub use handler::{Action, Event, Handler};
pub use ingest::{Attachment, AttachmentKind, Download, Ingest};
pub use router::*;
pub use storage::StoredFile;

/// This method initializes [`env_logger`] from the environment, defaulting to `info` level logging.
pub fn init_logger() {
    // We use try_init here so it can by run by tests.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
    debug!("Logger initialized.");
}
