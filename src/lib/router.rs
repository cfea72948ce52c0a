//! `Router` owns the long-polling loop. It asks Telegram for updates, and
//! hands each message update to the registered handlers whose `Route` matches,
//! in the order they were added.
//!
//! Every update runs on its own task, so a slow download never blocks the
//! next message. Handler errors are passed to the error handler and the loop
//! keeps going.
use std::{cmp::max, sync::Arc, time::Duration};

use futures::Future;
use lazy_static::lazy_static;
use regex::Regex;
use tokio::sync::{mpsc, Notify};

use crate::{
    api::{GetUpdatesRequest, SendMessageRequest, Update, API},
    handler::{default_error_handler, ErrorHandler},
    Action, Client, Event, Handler,
};

lazy_static! {
    /// `/name` or `/name@botname`, followed by arguments or nothing.
    static ref COMMAND_RE: Regex =
        Regex::new(r"^/([A-Za-z0-9_]+)(?:@[A-Za-z0-9_]+)?(?:\s|$)").unwrap();
}

/// Returns the command name if `text` is a bot command.
pub fn parse_command(text: &str) -> Option<&str> {
    COMMAND_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Matches the content of a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    /// Any message.
    Any,

    /// Messages carrying a photo.
    Photo,

    /// Messages carrying a document.
    Document,

    /// The bot command with this name (without the leading slash).
    Command(String),

    /// Text that is not a command.
    Text,
}

impl Matcher {
    fn matches(&self, update: &Update) -> bool {
        let Some(ref message) = update.message else {
            return false;
        };

        match self {
            Matcher::Any => true,
            Matcher::Photo => message.largest_photo().is_some(),
            Matcher::Document => message.document.is_some(),
            Matcher::Command(name) => message
                .text
                .as_deref()
                .and_then(parse_command)
                .is_some_and(|command| command == name),
            Matcher::Text => message
                .text
                .as_deref()
                .is_some_and(|text| parse_command(text).is_none()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Message(Matcher),

    /// Matches every message update.
    Default,
}

impl Route {
    pub fn matches(&self, update: &Update) -> bool {
        match self {
            Route::Message(matcher) => matcher.matches(update),
            Route::Default => update.message.is_some(),
        }
    }
}

pub struct Router {
    api: Arc<API>,
    routes: Vec<(Route, Handler)>,
    error_handler: Arc<ErrorHandler>,

    /// HTTP poll timeout
    timeout_s: i64,

    /// Shutdown notifier
    shutdown: Arc<Notify>,
    shutdown_tx: Arc<mpsc::Sender<()>>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl Router {
    pub fn new(client: Client) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let error_handler: ErrorHandler =
            Box::new(|api, chat_id, err| Box::pin(default_error_handler(api, chat_id, err)));

        Self {
            api: Arc::new(API::new(client)),
            routes: vec![],
            error_handler: Arc::new(error_handler),
            timeout_s: 60,
            shutdown: Arc::new(Notify::new()),
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        }
    }

    pub fn with_poll_timeout_s(mut self, timeout_s: i64) -> Self {
        self.timeout_s = timeout_s;
        self
    }

    pub fn with_error_handler<Func, Fut>(mut self, func: Func) -> Self
    where
        Func: Send + Sync + 'static + Fn(Arc<API>, i64, anyhow::Error) -> Fut,
        Fut: Send + 'static + Future<Output = ()>,
    {
        let error_handler: ErrorHandler =
            Box::new(move |api, chat_id, err| Box::pin(func(api, chat_id, err)));
        self.error_handler = Arc::new(error_handler);
        self
    }

    /// The API this router polls with.
    pub fn api(&self) -> Arc<API> {
        Arc::clone(&self.api)
    }

    /// Add a handler for `route`. Handlers run in the order they were added.
    pub fn add_route(&mut self, route: Route, h: impl Into<Handler>) -> &mut Self {
        self.routes.push((route, h.into()));
        self
    }

    /// Returns the completion notifier and the shutdown sender. Send `()` on
    /// the sender to stop the loop, then wait on the notifier.
    pub fn shutdown(&self) -> (Arc<Notify>, Arc<mpsc::Sender<()>>) {
        (Arc::clone(&self.shutdown), Arc::clone(&self.shutdown_tx))
    }

    /// Start the router. Runs until a shutdown signal is received.
    pub async fn start(&mut self) {
        let routes = Arc::new(std::mem::take(&mut self.routes));
        let mut last_update_id = 0;

        loop {
            debug!(
                "Polling /getUpdates with last_update_id = {} timeout = {}s",
                last_update_id, self.timeout_s
            );

            let request = GetUpdatesRequest::new()
                .with_timeout(self.timeout_s)
                .with_offset(last_update_id + 1);

            let updates = tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!("Received shutdown signal");
                    break;
                }
                updates = self.api.get_updates(&request) => updates,
            };

            let updates = match updates {
                Ok(updates) => updates,
                Err(err) => {
                    error!("Failed to poll for updates: {:#}", err);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            for update in updates {
                last_update_id = max(last_update_id, update.update_id);

                let api = Arc::clone(&self.api);
                let routes = Arc::clone(&routes);
                let error_handler = Arc::clone(&self.error_handler);
                tokio::spawn(async move {
                    Self::handle_update(api, routes, error_handler, update).await;
                });
            }
        }

        self.shutdown.notify_waiters();
    }

    async fn handle_update(
        api: Arc<API>,
        routes: Arc<Vec<(Route, Handler)>>,
        error_handler: Arc<ErrorHandler>,
        update: Update,
    ) {
        let Ok(chat_id) = update.chat_id() else {
            debug!("Ignoring update {}: not a message", update.update_id);
            return;
        };

        for (route, handler) in routes.iter() {
            if !route.matches(&update) {
                continue;
            }

            let event = Event::new(Arc::clone(&api), update.clone());
            match (handler.f)(event).await {
                Ok(Action::Next) => {}
                Ok(Action::Done) => break,
                Ok(Action::ReplyText(text)) => {
                    if let Err(err) = api
                        .send_message(&SendMessageRequest::new(chat_id, text))
                        .await
                    {
                        error!("Failed to reply in chat {}: {:#}", chat_id, err);
                    }
                    break;
                }
                Err(err) => {
                    (error_handler)(Arc::clone(&api), chat_id, err).await;
                    break;
                }
            }
        }
    }
}
