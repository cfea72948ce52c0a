use std::sync::Arc;

use futures::{future::BoxFuture, Future};

use crate::api::{self, Update, API};

/// `Event` is what a handler receives: the API (to talk back to Telegram) and
/// the update that triggered it.
#[derive(Clone)]
pub struct Event {
    pub api: Arc<API>,
    pub update: Update,
}

impl Event {
    pub fn new(api: Arc<API>, update: Update) -> Self {
        Self { api, update }
    }
}

/// `Action` is the result of a handler call.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Continue to the next matching handler.
    Next,

    /// Stop handling this update.
    Done,

    /// Reply to the chat with the given text and stop.
    ReplyText(String),
}

/// Wraps an async handler function.
pub struct Handler {
    #[allow(clippy::type_complexity)]
    pub f: Box<dyn Fn(Event) -> BoxFuture<'static, Result<Action, anyhow::Error>> + Send + Sync>,
}

impl Handler {
    pub fn new<Func, Fut>(func: Func) -> Self
    where
        Func: Send + Sync + 'static + Fn(Event) -> Fut,
        Fut: Send + 'static + Future<Output = Result<Action, anyhow::Error>>,
    {
        Self {
            f: Box::new(move |e| Box::pin(func(e))),
        }
    }
}

impl<Func, Fut> From<Func> for Handler
where
    Func: Send + Sync + 'static + Fn(Event) -> Fut,
    Fut: Send + 'static + Future<Output = Result<Action, anyhow::Error>>,
{
    fn from(func: Func) -> Self {
        Self::new(func)
    }
}

/// Called when a handler returns an error.
pub type ErrorHandler =
    Box<dyn Fn(Arc<API>, i64, anyhow::Error) -> BoxFuture<'static, ()> + Send + Sync>;

/// The default error handler logs the error and tells the user.
pub async fn default_error_handler(api: Arc<API>, chat_id: i64, err: anyhow::Error) {
    error!("Handler error in chat {}: {:#}", chat_id, err);
    let result = api
        .send_message(&api::SendMessageRequest::new(
            chat_id,
            format!("Sorry! {}.", err),
        ))
        .await;

    if let Err(err) = result {
        error!("Error in default error handler: {}", err);
    }
}
