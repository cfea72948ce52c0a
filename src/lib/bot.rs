//! Wires the ingestion pipeline and the chat commands into a `Router`, and
//! turns pipeline outcomes into replies.

use std::sync::Arc;

use anyhow::anyhow;

use crate::{
    api::{BotCommand, SetMyCommandsRequest, API},
    ingest::{Attachment, AttachmentKind},
    storage::{self, StoredFile},
    Action, Event, Ingest, IngestError, Matcher, Route, Router,
};

pub const START_MESSAGE: &str = "Hi! Send me images and I'll save them to disk.\n\
    Commands:\n\
    /start - Show this message\n\
    /status - Check bot status\n\
    /help - Show help";

pub const UNAUTHORIZED_MESSAGE: &str = "❌ Unauthorized user";

pub const UNSUPPORTED_MESSAGE: &str = "❌ Please send only image files";

pub fn help_message(ingest: &Ingest) -> String {
    format!(
        "Just send me any image and I'll save it with a timestamp.\n\
         Supported formats: JPG, PNG, GIF, WebP\n\
         Images are saved to: {}",
        ingest.config().save_path().display()
    )
}

/// The commands advertised to Telegram clients.
pub fn commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("start", "Show the welcome message"),
        BotCommand::new("help", "Show help"),
        BotCommand::new("status", "Check bot status"),
    ]
}

/// Registers `commands()` with Telegram so clients can autocomplete them.
pub async fn register_commands(api: &API) -> anyhow::Result<()> {
    api.set_my_commands(&SetMyCommandsRequest::new(commands()))
        .await?;
    Ok(())
}

/// The reply for a photo or document the pipeline has handled.
pub fn stored_reply(kind: AttachmentKind, result: &Result<StoredFile, IngestError>) -> String {
    let title = match kind {
        AttachmentKind::Photo => "Image",
        AttachmentKind::Document => "Document",
    };

    match result {
        Ok(stored) => format!(
            "✅ {} saved!\n📁 {}\n📊 Size: {:.1} KB ({} bytes)",
            title,
            stored.file_name,
            stored.size_kb(),
            stored.size
        ),
        Err(IngestError::Unauthorized(_)) => UNAUTHORIZED_MESSAGE.to_string(),
        Err(IngestError::UnsupportedContentType(_)) => UNSUPPORTED_MESSAGE.to_string(),
        Err(err) => format!("❌ Error saving {}: {}", kind, err),
    }
}

/// Save path, number of images stored and free space.
pub async fn status_report(ingest: &Ingest) -> anyhow::Result<String> {
    ingest.ensure_directory().await?;

    let dir = ingest.config().save_path().to_path_buf();
    let image_count = storage::count_images(&dir).await?;

    let free_space = {
        let dir = dir.clone();
        tokio::task::spawn_blocking(move || storage::free_space_mb(&dir)).await?
    };
    let free_space = match free_space {
        Some(mb) => format!("{:.1} MB", mb),
        None => "unknown".to_string(),
    };

    Ok(format!(
        "✅ Bot is running\n📁 Save path: {}\n🖼 Images saved: {}\n💾 Free space: {}",
        dir.display(),
        image_count,
        free_space
    ))
}

fn sender_id(e: &Event) -> anyhow::Result<i64> {
    Ok(e.update.from_user()?.id)
}

async fn handle_photo(ingest: Arc<Ingest>, e: Event) -> anyhow::Result<Action> {
    let sender_id = sender_id(&e)?;
    let photo = e
        .update
        .message()?
        .largest_photo()
        .ok_or(anyhow!("message has no photo"))?;

    let attachment = Attachment::from(photo);
    let result = ingest
        .handle_photo(e.api.as_ref(), sender_id, &attachment)
        .await;

    Ok(Action::ReplyText(stored_reply(attachment.kind, &result)))
}

async fn handle_document(ingest: Arc<Ingest>, e: Event) -> anyhow::Result<Action> {
    let sender_id = sender_id(&e)?;
    let document = e
        .update
        .message()?
        .document
        .as_ref()
        .ok_or(anyhow!("message has no document"))?;

    let attachment = Attachment::from(document);
    let result = ingest
        .handle_document(e.api.as_ref(), sender_id, &attachment)
        .await;

    Ok(Action::ReplyText(stored_reply(attachment.kind, &result)))
}

async fn handle_status(ingest: Arc<Ingest>, e: Event) -> anyhow::Result<Action> {
    // The report reveals the save path, so it follows the allow-list.
    if !ingest.config().is_authorized(sender_id(&e)?) {
        return Ok(Action::ReplyText(UNAUTHORIZED_MESSAGE.into()));
    }

    let text = match status_report(&ingest).await {
        Ok(report) => report,
        Err(err) => {
            error!("Error checking status: {:#}", err);
            format!("❌ Error checking status: {}", err)
        }
    };

    Ok(Action::ReplyText(text))
}

async fn handle_other(ingest: Arc<Ingest>, e: Event) -> anyhow::Result<Action> {
    let sender_id = sender_id(&e).unwrap_or_default();
    Ok(Action::ReplyText(ingest.handle_other(sender_id).into()))
}

/// Adds the bot's routes to `router`: commands first, then photos, documents,
/// and finally a catch-all for everything else.
pub fn add_routes(router: &mut Router, ingest: Arc<Ingest>) {
    router.add_route(
        Route::Message(Matcher::Command("start".into())),
        |_: Event| async move { Ok(Action::ReplyText(START_MESSAGE.into())) },
    );

    let help = help_message(&ingest);
    router.add_route(
        Route::Message(Matcher::Command("help".into())),
        move |_: Event| {
            let help = help.clone();
            async move { Ok(Action::ReplyText(help)) }
        },
    );

    let status_ingest = Arc::clone(&ingest);
    router.add_route(
        Route::Message(Matcher::Command("status".into())),
        move |e: Event| handle_status(Arc::clone(&status_ingest), e),
    );

    let photo_ingest = Arc::clone(&ingest);
    router.add_route(Route::Message(Matcher::Photo), move |e: Event| {
        handle_photo(Arc::clone(&photo_ingest), e)
    });

    let document_ingest = Arc::clone(&ingest);
    router.add_route(Route::Message(Matcher::Document), move |e: Event| {
        handle_document(Arc::clone(&document_ingest), e)
    });

    router.add_route(Route::Default, move |e: Event| {
        handle_other(Arc::clone(&ingest), e)
    });
}
