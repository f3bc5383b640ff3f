//! Database-backed tests of the group ordering lifecycle: who may open
//! and close sessions, what guards opening, and how repeated sanitizer
//! violations escalate. Skipped silently when TEST_DATABASE_URL is not
//! set.

mod helpers;

use async_trait::async_trait;
use helpers::database_helper::TestDatabase;
use serial_test::serial;
use std::sync::{Arc, Mutex};
use OrderBuddy::config::Settings;
use OrderBuddy::handlers::{IncomingMessage, MessageRouter};
use OrderBuddy::notify::BroadcastRegistry;
use OrderBuddy::services::ai::{parse_ai_output, AiGateway, AiRequest, AiResponse};
use OrderBuddy::utils::errors::OrderBuddyError;

/// Gateway that replays a fixed reply and records every message it saw
struct RecordingGateway {
    stdout: String,
    calls: Mutex<Vec<String>>,
}

impl RecordingGateway {
    fn replying(stdout: &str) -> Arc<Self> {
        Arc::new(Self {
            stdout: stdout.to_string(),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiGateway for RecordingGateway {
    async fn invoke(&self, request: AiRequest) -> Result<AiResponse, OrderBuddyError> {
        self.calls.lock().unwrap().push(request.message.clone());
        Ok(parse_ai_output(&self.stdout))
    }
}

fn build_router(
    db: &TestDatabase,
    gateway: Arc<RecordingGateway>,
    settings: Settings,
) -> MessageRouter {
    MessageRouter::new(
        db.db.clone(),
        gateway,
        Arc::new(BroadcastRegistry::new()),
        settings,
    )
}

fn group_message(sender: &str, group: &str, text: &str) -> IncomingMessage {
    IncomingMessage {
        sender_id: sender.to_string(),
        display_name: Some("Ana".to_string()),
        group_id: Some(group.to_string()),
        text: text.to_string(),
    }
}

#[tokio::test]
#[serial]
async fn any_member_can_open_and_close_ordering() {
    let Some(db) = TestDatabase::try_new().await else {
        return;
    };
    let group = db.create_active_group("G1", "CODE1234").await;
    db.seed_store_with_menu(&group, "Lucky Noodles").await;

    let gateway = RecordingGateway::replying(r#"{"message": "", "actions": []}"#);
    let router = build_router(&db, gateway, Settings::default());

    // The opener holds no admin binding at all.
    let reply = router
        .handle_message(group_message("U1", "G1", "open order"))
        .await
        .unwrap()
        .expect("open should answer");
    assert!(reply.contains("Ordering is open"));
    assert!(reply.contains("Fried Rice - 80"));
    assert!(db.db.sessions.active_session(group.id).await.unwrap().is_some());

    // A different plain member closes it.
    let reply = router
        .handle_message(group_message("U2", "G1", "close order"))
        .await
        .unwrap()
        .expect("close should answer");
    assert!(reply.contains("Ordering is closed."));
    assert!(reply.contains("No orders yet."));
    assert!(db.db.sessions.active_session(group.id).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn opening_without_a_store_is_rejected() {
    let Some(db) = TestDatabase::try_new().await else {
        return;
    };
    db.create_active_group("G1", "CODE1234").await;

    let gateway = RecordingGateway::replying(r#"{"message": "", "actions": []}"#);
    let router = build_router(&db, gateway, Settings::default());

    let reply = router
        .handle_message(group_message("U1", "G1", "open order"))
        .await
        .unwrap();
    assert_eq!(
        reply.as_deref(),
        Some("No store is set for today, so ordering cannot start.")
    );
    assert_eq!(db.count_records("ordering_sessions").await, 0);
}

#[tokio::test]
#[serial]
async fn at_most_one_open_session_per_group() {
    let Some(db) = TestDatabase::try_new().await else {
        return;
    };
    let group = db.create_active_group("G1", "CODE1234").await;
    db.seed_store_with_menu(&group, "Lucky Noodles").await;

    let gateway = RecordingGateway::replying(r#"{"message": "", "actions": []}"#);
    let router = build_router(&db, gateway, Settings::default());

    router
        .handle_message(group_message("U1", "G1", "open order"))
        .await
        .unwrap();
    let reply = router
        .handle_message(group_message("U2", "G1", "open order"))
        .await
        .unwrap();
    assert_eq!(
        reply.as_deref(),
        Some("Ordering is already open for this group.")
    );
    assert_eq!(db.count_records("ordering_sessions").await, 1);

    // The unique index also rejects a direct concurrent insert.
    let opener = db.create_test_user("U3", "Cleo").await;
    let err = db
        .db
        .sessions
        .open_session(group.id, opener.id)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderBuddyError::SessionAlreadyOpen { .. }));
}

#[tokio::test]
#[serial]
async fn ban_lands_on_exactly_the_threshold_violation() {
    let Some(db) = TestDatabase::try_new().await else {
        return;
    };
    db.create_active_group("G1", "CODE1234").await;

    let mut settings = Settings::default();
    settings.security.ban_threshold = 3;
    let gateway = RecordingGateway::replying(r#"{"message": "", "actions": []}"#);
    let router = build_router(&db, gateway, settings);

    // Trigger word gets the message past the idle gate; the markup
    // makes the sanitizer count a violation.
    let spam = "order <b>free stuff</b> now";
    for _ in 0..2 {
        let reply = router
            .handle_message(group_message("U1", "G1", spam))
            .await
            .unwrap();
        assert!(reply.is_none());
    }
    let user = db.db.users.find_by_platform_id("U1").await.unwrap().unwrap();
    assert!(!user.is_banned, "two violations stay below the threshold");

    router
        .handle_message(group_message("U1", "G1", spam))
        .await
        .unwrap();
    let user = db.db.users.find_by_platform_id("U1").await.unwrap().unwrap();
    assert!(user.is_banned, "the third violation bans");

    // Banned senders are dropped before any handling.
    let reply = router
        .handle_message(group_message("U1", "G1", "help"))
        .await
        .unwrap();
    assert!(reply.is_none());
}

#[tokio::test]
#[serial]
async fn store_commands_go_to_the_ai_while_ordering_is_open() {
    let Some(db) = TestDatabase::try_new().await else {
        return;
    };
    let group = db.create_active_group("G1", "CODE1234").await;
    db.seed_store_with_menu(&group, "Lucky Noodles").await;

    let gateway = RecordingGateway::replying(
        r#"{"message": "One set store coming up... just kidding.", "actions": []}"#,
    );
    let router = build_router(&db, gateway.clone(), Settings::default());

    router
        .handle_message(group_message("U1", "G1", "open order"))
        .await
        .unwrap();

    // With a session open the same text is ordinary conversation.
    let reply = router
        .handle_message(group_message("U1", "G1", "set store Sunrise Cafe"))
        .await
        .unwrap();
    assert_eq!(
        reply.as_deref(),
        Some("One set store coming up... just kidding.")
    );
    assert_eq!(gateway.seen(), vec!["set store Sunrise Cafe".to_string()]);

    router
        .handle_message(group_message("U1", "G1", "close order"))
        .await
        .unwrap();

    // Between sessions the admin path answers and the AI stays out of it.
    let reply = router
        .handle_message(group_message("U1", "G1", "set store Sunrise Cafe"))
        .await
        .unwrap();
    assert_eq!(reply.as_deref(), Some("admin commands require admin rights"));
    assert_eq!(gateway.seen().len(), 1);
}

#[tokio::test]
#[serial]
async fn pending_group_chatter_feeds_the_application_flow() {
    let Some(db) = TestDatabase::try_new().await else {
        return;
    };
    let group = db.create_pending_group("G9").await;

    let gateway = RecordingGateway::replying(
        r#"{"message": "What is your group called?", "actions": []}"#,
    );
    let router = build_router(&db, gateway.clone(), Settings::default());

    // No bot name, no trigger word: the application flow still answers.
    let reply = router
        .handle_message(group_message("U1", "G9", "hi, we are the midday crew"))
        .await
        .unwrap();
    assert_eq!(reply.as_deref(), Some("What is your group called?"));
    assert_eq!(gateway.seen().len(), 1);

    // Speaking in the group records membership even before activation.
    let user = db.db.users.find_by_platform_id("U1").await.unwrap().unwrap();
    assert!(db.db.members.is_member(group.id, user.id).await.unwrap());
}

#[tokio::test]
#[serial]
async fn menu_keyword_renders_items_and_prices() {
    let Some(db) = TestDatabase::try_new().await else {
        return;
    };
    let group = db.create_active_group("G1", "CODE1234").await;
    db.seed_store_with_menu(&group, "Lucky Noodles").await;

    let gateway = RecordingGateway::replying(r#"{"message": "", "actions": []}"#);
    let router = build_router(&db, gateway, Settings::default());

    let reply = router
        .handle_message(group_message("U1", "G1", "menu"))
        .await
        .unwrap()
        .expect("menu should answer");
    assert!(reply.contains("[Lucky Noodles]"));
    assert!(reply.contains("Lunch Box:"));
    assert!(reply.contains("Fried Rice - 80"));
    assert!(reply.contains("Beef Noodles - 95"));
}
