use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roomchat::client::{
    ContactBook, HistoryApi, HttpHistoryClient, LogStatus, Room, RoomSession, SessionDriver,
    SessionUpdate, UiCommand, WebSocketChannel,
};
use roomchat::ClientConfig;

fn render(update: SessionUpdate) {
    match update {
        SessionUpdate::ConnectionChanged(state) => println!("* connection: {state:?}"),
        SessionUpdate::RoomChanged(Some(room)) => println!("* now in #{}", room.name),
        SessionUpdate::RoomChanged(None) => println!("* not in any room"),
        SessionUpdate::LogReplaced { messages, status } => {
            if let Some(placeholder) = status.placeholder() {
                println!("* {placeholder}");
            } else if status == LogStatus::Loading {
                println!("* loading messages...");
            }
            for message in messages {
                println!(
                    "[{}] {}: {}",
                    message.timestamp.format("%H:%M"),
                    message.sender,
                    message.body
                );
            }
        }
        SessionUpdate::MessageAppended(message) => println!(
            "[{}] {}: {}",
            message.timestamp.format("%H:%M"),
            message.sender,
            message.body
        ),
        SessionUpdate::ContactsChanged(contacts) => {
            println!("* contacts: {}", contacts.join(", "))
        }
        SessionUpdate::Notice(notice) => println!("! {notice}"),
    }
}

#[tokio::main]
async fn main() {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr so they do not interleave with the chat
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomchat=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(2);
        }
    };

    let http = match HttpHistoryClient::new(&config.server_url) {
        Ok(http) => http,
        Err(e) => {
            error!(error = %e, "Invalid server URL");
            std::process::exit(2);
        }
    };
    let csrf_token = match http.fetch_csrf_token().await {
        Ok(token) => Some(token),
        Err(e) => {
            warn!(error = %e, "No anti-forgery token, adding contacts will fail");
            None
        }
    };

    let history: Arc<dyn HistoryApi> = Arc::new(http);
    let (channel, events) = WebSocketChannel::connect(config.channel_config());
    let session = RoomSession::new(&config.username, Arc::new(channel), Arc::clone(&history));
    let contacts = ContactBook::new(&config.username, history);

    let (command_sender, command_receiver) = mpsc::unbounded_channel();
    let (update_sender, mut update_receiver) = mpsc::unbounded_channel();

    let driver = SessionDriver::new(
        session,
        contacts,
        Room::new(config.default_room.clone()),
        events,
        command_receiver,
        update_sender,
    )
    .with_csrf_token(csrf_token);
    let driver_task = tokio::spawn(driver.run());

    tokio::spawn(async move {
        while let Some(update) = update_receiver.recv().await {
            render(update);
        }
    });

    println!("* signed in as {}", config.username);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let Some(command) = UiCommand::parse(&line) else {
                    continue;
                };
                let quit = command == UiCommand::Quit;
                if command_sender.send(command).is_err() || quit {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "Failed to read input");
                break;
            }
        }
    }

    drop(command_sender);
    let _ = driver_task.await;
}
