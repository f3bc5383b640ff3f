//! OrderBuddy group ordering bot
//!
//! Main application entry point. Wires the database, the AI gateway and
//! the broadcast registry into the message router, then serves a line
//! console on stdin for driving conversations:
//!
//!   <sender_id> <group_id|-> <message text>
//!   join <sender_id> <group_id>
//!   leave <sender_id> <group_id>
//!   botjoin <group_id>
//!   botleave <group_id>

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use OrderBuddy::{
    config::Settings,
    database::{connection::create_pool, run_migrations, DatabaseService},
    handlers::{IncomingMessage, MessageRouter},
    notify::{BroadcastRegistry, Broadcaster, EventKind},
    services::ProcessGateway,
    utils::logging,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging; the guard must live until shutdown
    let _guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", OrderBuddy::info());

    info!("Connecting to database...");
    let pool = create_pool(&settings.database).await?;
    run_migrations(&pool).await?;

    let db = DatabaseService::new(pool);

    let gateway = ProcessGateway::new(
        settings.ai.command.clone(),
        settings.ai.model.clone(),
        settings.ai.working_dir.clone(),
        settings.ai.timeout_seconds,
    );

    let registry = Arc::new(default_registry());
    let router = MessageRouter::new(db, Arc::new(gateway), registry, settings);

    info!("OrderBuddy is ready, reading from stdin");
    run_console(&router).await?;

    info!("OrderBuddy has been shut down.");
    Ok(())
}

/// Registry used when no external board transport is wired in:
/// every event is emitted as a structured log line.
fn default_registry() -> BroadcastRegistry {
    let mut registry = BroadcastRegistry::new();
    for kind in [
        EventKind::OrderUpdate,
        EventKind::SessionStatus,
        EventKind::PaymentUpdate,
        EventKind::StoreChange,
        EventKind::ChatMessage,
        EventKind::ApplicationUpdate,
        EventKind::GroupUpdate,
    ] {
        registry.register(kind, logging_broadcaster(kind));
    }
    registry
}

fn logging_broadcaster(kind: EventKind) -> Broadcaster {
    Arc::new(move |room, payload| {
        Box::pin(async move {
            info!(kind = kind.as_str(), room = %room, payload = %payload, "board event");
            Ok(())
        })
    })
}

async fn run_console(router: &MessageRouter) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
            line = lines.next_line() => {
                match line? {
                    Some(line) => handle_console_line(router, &line).await,
                    None => break,
                }
            }
        }
    }

    Ok(())
}

async fn handle_console_line(router: &MessageRouter, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let mut parts = line.splitn(3, ' ');
    let first = parts.next().unwrap_or_default();

    let result = match first {
        "join" => match (parts.next(), parts.next()) {
            (Some(sender), Some(group)) => router.handle_join(sender, None, group).await,
            _ => {
                warn!("usage: join <sender_id> <group_id>");
                return;
            }
        },
        "leave" => match (parts.next(), parts.next()) {
            (Some(sender), Some(group)) => {
                router.handle_leave(sender, group).await.map(|_| None)
            }
            _ => {
                warn!("usage: leave <sender_id> <group_id>");
                return;
            }
        },
        "botjoin" => match parts.next() {
            Some(group) => router.handle_bot_added(group).await,
            None => {
                warn!("usage: botjoin <group_id>");
                return;
            }
        },
        "botleave" => match parts.next() {
            Some(group) => router.handle_bot_removed(group).await.map(|_| None),
            None => {
                warn!("usage: botleave <group_id>");
                return;
            }
        },
        sender => match (parts.next(), parts.next()) {
            (Some(group), Some(text)) => {
                let group_id = if group == "-" {
                    None
                } else {
                    Some(group.to_string())
                };
                router
                    .handle_message(IncomingMessage {
                        sender_id: sender.to_string(),
                        display_name: None,
                        group_id,
                        text: text.to_string(),
                    })
                    .await
            }
            _ => {
                warn!("usage: <sender_id> <group_id|-> <message text>");
                return;
            }
        },
    };

    match result {
        Ok(Some(reply)) => println!("{reply}"),
        Ok(None) => {}
        Err(err) => error!(error = %err, "message handling failed"),
    }
}
