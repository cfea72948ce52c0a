use std::{path::Path, sync::Arc};

use daguerre::{
    api::{Document, Message, PhotoSize, Update},
    bot,
    fake::FakeServer,
    ingest::OTHER_MESSAGE,
    *,
};
use log::*;
use tokio::sync::{mpsc, Notify};

/// Starts the bot against `fakeserver` in a background task.
fn start_bot(
    fakeserver: &FakeServer,
    save_path: &Path,
    allowed: Option<Vec<i64>>,
) -> (Arc<Notify>, Arc<mpsc::Sender<()>>) {
    let mut config = Config::new("token", save_path);
    if let Some(allowed) = allowed {
        config = config.with_allowed_users(allowed);
    }

    let client = Client::new("token").with_post_handler(fakeserver.clone());

    // Keep the Telegram poll timeout short for testing.
    let mut router = Router::new(client).with_poll_timeout_s(1);
    bot::add_routes(&mut router, Arc::new(Ingest::new(Arc::new(config))));

    let shutdown = router.shutdown();
    tokio::spawn(async move {
        info!("Starting router...");
        router.start().await;
    });

    shutdown
}

async fn stop_bot(shutdown_notifier: Arc<Notify>, shutdown_tx: Arc<mpsc::Sender<()>>) {
    info!("Shutting down...");
    let stopped = shutdown_notifier.notified();
    shutdown_tx.send(()).await.unwrap();
    stopped.await;
}

/// The file name line of a "saved!" reply.
fn saved_name(reply: &str) -> String {
    reply
        .lines()
        .nth(1)
        .unwrap()
        .trim_start_matches("📁 ")
        .to_string()
}

#[tokio::test]
async fn saves_photos_and_documents() {
    daguerre::init_logger();
    let dir = tempfile::tempdir().unwrap();
    let fakeserver = FakeServer::new();
    let (shutdown_notifier, shutdown_tx) = start_bot(&fakeserver, dir.path(), Some(vec![42]));

    let chat = fakeserver.create_chat(42, "alice").await;

    let file_id = chat.send_photo(&b"jpeg bytes"[..]).await.unwrap();
    let reply = chat.recv_text().await.unwrap();
    assert!(reply.starts_with("✅ Image saved!"), "{}", reply);
    assert!(reply.contains("(10 bytes)"));

    let name = saved_name(&reply);
    assert!(name.starts_with("img_"));
    assert!(name.ends_with(&format!("_{}.jpg", &file_id[..8])));
    assert_eq!(std::fs::read(dir.path().join(&name)).unwrap(), b"jpeg bytes");

    chat.send_document(Some("diagram.png"), Some("image/png"), &b"png!"[..])
        .await
        .unwrap();
    let reply = chat.recv_text().await.unwrap();
    assert!(reply.starts_with("✅ Document saved!"), "{}", reply);

    let name = saved_name(&reply);
    assert!(name.starts_with("diagram_"));
    assert!(name.ends_with(".png"));
    assert_eq!(
        std::fs::metadata(dir.path().join(&name)).unwrap().len(),
        4
    );

    chat.send_document(Some("report.pdf"), Some("application/pdf"), &b"%PDF"[..])
        .await
        .unwrap();
    assert_eq!(chat.recv_text().await.unwrap(), bot::UNSUPPORTED_MESSAGE);

    chat.send_text("/status").await.unwrap();
    let status = chat.recv_text().await.unwrap();
    assert!(status.starts_with("✅ Bot is running"), "{}", status);
    assert!(status.contains(&format!("Save path: {}", dir.path().display())));
    assert!(status.contains("Images saved: 2"));
    assert!(status.contains("Free space: "));

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);

    stop_bot(shutdown_notifier, shutdown_tx).await;
}

#[tokio::test]
async fn rejects_unauthorized_users() {
    daguerre::init_logger();
    let dir = tempfile::tempdir().unwrap();
    let fakeserver = FakeServer::new();
    let (shutdown_notifier, shutdown_tx) = start_bot(&fakeserver, dir.path(), Some(vec![42]));

    let chat = fakeserver.create_chat(7, "mallory").await;

    chat.send_photo(&b"jpeg"[..]).await.unwrap();
    assert_eq!(chat.recv_text().await.unwrap(), bot::UNAUTHORIZED_MESSAGE);

    chat.send_document(Some("diagram.png"), Some("image/png"), &b"png"[..])
        .await
        .unwrap();
    assert_eq!(chat.recv_text().await.unwrap(), bot::UNAUTHORIZED_MESSAGE);

    chat.send_text("/status").await.unwrap();
    assert_eq!(chat.recv_text().await.unwrap(), bot::UNAUTHORIZED_MESSAGE);

    // Instructions are not restricted.
    chat.send_text("hello?").await.unwrap();
    assert_eq!(chat.recv_text().await.unwrap(), OTHER_MESSAGE);

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    stop_bot(shutdown_notifier, shutdown_tx).await;
}

#[tokio::test]
async fn commands_and_other_messages() {
    daguerre::init_logger();
    let dir = tempfile::tempdir().unwrap();
    let save_path = dir.path().join("pics");
    let fakeserver = FakeServer::new();
    let (shutdown_notifier, shutdown_tx) = start_bot(&fakeserver, &save_path, None);

    let chat = fakeserver.create_chat(1, "bob").await;

    chat.send_text("/start").await.unwrap();
    assert_eq!(chat.recv_text().await.unwrap(), bot::START_MESSAGE);

    chat.send_text("/start@daguerre_bot").await.unwrap();
    assert_eq!(chat.recv_text().await.unwrap(), bot::START_MESSAGE);

    chat.send_text("/help").await.unwrap();
    let help = chat.recv_text().await.unwrap();
    assert!(help.contains("Supported formats: JPG, PNG, GIF, WebP"));
    assert!(help.contains(&save_path.display().to_string()));

    chat.send_text("/unknown").await.unwrap();
    assert_eq!(chat.recv_text().await.unwrap(), OTHER_MESSAGE);

    chat.send_text("just text").await.unwrap();
    assert_eq!(chat.recv_text().await.unwrap(), OTHER_MESSAGE);

    // Status creates the directory if needed.
    chat.send_text("/status").await.unwrap();
    let status = chat.recv_text().await.unwrap();
    assert!(status.contains("Images saved: 0"), "{}", status);
    assert!(save_path.is_dir());

    stop_bot(shutdown_notifier, shutdown_tx).await;
}

#[tokio::test]
async fn registers_commands() {
    let fakeserver = FakeServer::new();
    let router = Router::new(Client::new("token").with_post_handler(fakeserver.clone()));

    bot::register_commands(&router.api()).await.unwrap();

    let commands: Vec<String> = fakeserver
        .api
        .commands()
        .await
        .into_iter()
        .map(|command| command.command)
        .collect();
    assert_eq!(commands, vec!["start", "help", "status"]);
}

#[tokio::test]
async fn handler_errors_reach_the_error_handler() {
    daguerre::init_logger();
    let fakeserver = FakeServer::new();
    let client = Client::new("token").with_post_handler(fakeserver.clone());

    let mut router = Router::new(client).with_poll_timeout_s(1);
    router.add_route(Route::Default, |_: Event| async move {
        anyhow::bail!("Oh noes")
    });

    let (shutdown_notifier, shutdown_tx) = router.shutdown();
    tokio::spawn(async move {
        router.start().await;
    });

    let chat = fakeserver.create_chat(1, "bob").await;
    chat.send_text("anything").await.unwrap();
    assert_eq!(chat.recv_text().await.unwrap(), "Sorry! Oh noes.");

    stop_bot(shutdown_notifier, shutdown_tx).await;
}

fn update(message: Message) -> Update {
    Update {
        update_id: 1,
        message: Some(message),
    }
}

fn text(text: &str) -> Update {
    update(Message {
        text: Some(text.to_string()),
        ..Default::default()
    })
}

#[test]
fn parses_commands() {
    assert_eq!(parse_command("/status"), Some("status"));
    assert_eq!(parse_command("/status@daguerre_bot"), Some("status"));
    assert_eq!(parse_command("/help me"), Some("help"));
    assert_eq!(parse_command("status"), None);
    assert_eq!(parse_command("/status!"), None);
    assert_eq!(parse_command(" /status"), None);
}

#[test]
fn routes_match_message_kinds() {
    let photo = update(Message {
        photo: Some(vec![PhotoSize {
            file_id: "p".into(),
            ..Default::default()
        }]),
        ..Default::default()
    });
    let document = update(Message {
        document: Some(Document {
            file_id: "d".into(),
            ..Default::default()
        }),
        ..Default::default()
    });
    let empty_photo = update(Message {
        photo: Some(vec![]),
        ..Default::default()
    });

    assert!(Route::Message(Matcher::Photo).matches(&photo));
    assert!(!Route::Message(Matcher::Photo).matches(&document));
    assert!(!Route::Message(Matcher::Photo).matches(&empty_photo));
    assert!(Route::Message(Matcher::Document).matches(&document));
    assert!(!Route::Message(Matcher::Document).matches(&photo));

    let start = Route::Message(Matcher::Command("start".into()));
    assert!(start.matches(&text("/start")));
    assert!(!start.matches(&text("/status")));
    assert!(!start.matches(&text("start")));

    assert!(Route::Message(Matcher::Text).matches(&text("hello")));
    assert!(!Route::Message(Matcher::Text).matches(&text("/start")));
    assert!(!Route::Message(Matcher::Text).matches(&photo));

    assert!(Route::Default.matches(&photo));
    assert!(Route::Message(Matcher::Any).matches(&document));
    assert!(!Route::Default.matches(&Update::default()));
}
