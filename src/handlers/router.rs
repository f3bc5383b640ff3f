//! Message routing
//!
//! One entry point per incoming chat message. The router decides, in
//! order: banned senders are dropped, quick keywords answer directly,
//! admin commands run before the AI, and only then does the message go
//! through sanitization into the model. Board events queue up during
//! handling and flush after the database writes are done; any failure
//! discards the queue instead.

use crate::config::Settings;
use crate::database::DatabaseService;
use crate::handlers::admin::AdminHandler;
use crate::handlers::application::ApplicationHandler;
use crate::handlers::commands::{
    parse_admin_command, parse_quick_command, should_respond, QuickCommand,
};
use crate::handlers::personal::PersonalHandler;
use crate::handlers::replies;
use crate::models::chat::{ROLE_ASSISTANT, ROLE_USER};
use crate::models::group::{Group, GroupStatus};
use crate::models::order::OrderingSession;
use crate::models::user::User;
use crate::notify::{group_room, BroadcastRegistry, EventKind, NotificationQueue, ADMIN_ROOM, ALL_ROOM};
use crate::services::ai::{AiGateway, AiRequest, HistoryMessage};
use crate::services::executor::GroupContext;
use crate::services::{
    join_reasons, sanitize, ActionExecutor, PromptService, ServiceFactory, TodayStoreService,
    GROUP_PROMPT,
};
use crate::utils::errors::{OrderBuddyError, Result};
use crate::utils::logging::{log_group_event, log_security_event};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// One normalized incoming chat message
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub sender_id: String,
    pub display_name: Option<String>,
    /// None for one-on-one messages
    pub group_id: Option<String>,
    pub text: String,
}

pub struct MessageRouter {
    db: DatabaseService,
    ai: Arc<dyn AiGateway>,
    registry: Arc<BroadcastRegistry>,
    settings: Settings,
    prompts: Arc<PromptService>,
    today_stores: Arc<TodayStoreService>,
    executor: Arc<ActionExecutor>,
    admin: AdminHandler,
    application: ApplicationHandler,
    personal: PersonalHandler,
}

impl MessageRouter {
    pub fn new(
        db: DatabaseService,
        ai: Arc<dyn AiGateway>,
        registry: Arc<BroadcastRegistry>,
        settings: Settings,
    ) -> Self {
        let services = ServiceFactory::new(db.clone());
        let admin = AdminHandler::new(
            db.clone(),
            services.today_stores.clone(),
            settings.security.clone(),
        );
        let application = ApplicationHandler::new(
            db.clone(),
            ai.clone(),
            services.prompts.clone(),
            services.executor.clone(),
            settings.bot.clone(),
            settings.ai.history_limit,
        );
        let personal = PersonalHandler::new(
            db.clone(),
            ai.clone(),
            services.prompts.clone(),
            services.executor.clone(),
            settings.bot.clone(),
            settings.ai.history_limit,
        );

        Self {
            db,
            ai,
            registry,
            settings,
            prompts: services.prompts,
            today_stores: services.today_stores,
            executor: services.executor,
            admin,
            application,
            personal,
        }
    }

    /// Handle one message end to end. `Ok(None)` means stay silent.
    pub async fn handle_message(&self, message: IncomingMessage) -> Result<Option<String>> {
        let user = self
            .db
            .users
            .get_or_create(&message.sender_id, message.display_name.as_deref())
            .await?;

        if user.is_banned {
            tracing::debug!(user_id = %user.platform_user_id, "dropping message from banned user");
            return Ok(None);
        }

        let mut queue = NotificationQueue::new();

        let result = match &message.group_id {
            Some(group_id) => {
                self.handle_group_message(&user, group_id, &message.text, &mut queue)
                    .await
            }
            None => self.handle_personal_message(&user, &message.text).await,
        };

        match result {
            Ok(reply) => {
                queue.flush(&self.registry).await;
                Ok(reply)
            }
            Err(err) => {
                queue.discard();
                if let Some(reply) = err.user_message() {
                    return Ok(Some(reply));
                }
                if let OrderBuddyError::Ai(ai_err) = &err {
                    tracing::error!(error = %ai_err, "AI gateway failure");
                    return Ok(Some(replies::ai_unavailable_text()));
                }
                Err(err)
            }
        }
    }

    /// New member joined a group
    pub async fn handle_join(
        &self,
        sender_id: &str,
        display_name: Option<&str>,
        group_id: &str,
    ) -> Result<Option<String>> {
        let user = self.db.users.get_or_create(sender_id, display_name).await?;
        let group = self.db.groups.get_or_create(group_id).await?;

        if !group.is_active() {
            return Ok(None);
        }

        let (_, is_new) = self.db.members.add_member(group.id, user.id).await?;
        if !is_new {
            return Ok(None);
        }

        log_group_event(
            &group.platform_group_id,
            "member_joined",
            Some(&user.platform_user_id),
            None,
        );
        let mut queue = NotificationQueue::new();
        self.enqueue_member_event(&mut queue, &group, &user, "member_joined");
        queue.flush(&self.registry).await;

        Ok(Some(format!(
            "Welcome, {}! Say \"help\" to see what I can do.",
            user.name()
        )))
    }

    /// Member left a group
    pub async fn handle_leave(&self, sender_id: &str, group_id: &str) -> Result<()> {
        let user = self.db.users.get_or_create(sender_id, None).await?;
        let group = self.db.groups.get_or_create(group_id).await?;

        self.db.members.remove_member(group.id, user.id).await?;

        log_group_event(
            &group.platform_group_id,
            "member_left",
            Some(&user.platform_user_id),
            None,
        );
        let mut queue = NotificationQueue::new();
        self.enqueue_member_event(&mut queue, &group, &user, "member_left");
        queue.flush(&self.registry).await;
        Ok(())
    }

    /// The bot itself was added to a group
    pub async fn handle_bot_added(&self, platform_group_id: &str) -> Result<Option<String>> {
        let group = self.db.groups.get_or_create(platform_group_id).await?;
        log_group_event(&group.platform_group_id, "bot_added", None, None);

        match group.status() {
            GroupStatus::Active => Ok(Some(format!(
                "Hi, I'm {}! Say \"help\" to see what I can do.",
                self.settings.bot.name
            ))),
            GroupStatus::Suspended => Ok(Some(replies::suspended_text())),
            // A group that was active before gets restored without a new review
            GroupStatus::Inactive if group.activated_at.is_some() => {
                let restored = self
                    .db
                    .groups
                    .set_status(group.id, GroupStatus::Active)
                    .await?;
                let mut queue = NotificationQueue::new();
                queue.enqueue(
                    EventKind::GroupUpdate,
                    ADMIN_ROOM,
                    json!({
                        "group_id": restored.platform_group_id,
                        "status": restored.status,
                    }),
                );
                queue.flush(&self.registry).await;
                Ok(Some("Welcome back! The group is active again.".to_string()))
            }
            _ => Ok(Some(replies::help_text(&self.settings.bot, &group))),
        }
    }

    /// The bot was removed from a group
    pub async fn handle_bot_removed(&self, platform_group_id: &str) -> Result<()> {
        let group = self.db.groups.get_or_create(platform_group_id).await?;
        let updated = self
            .db
            .groups
            .set_status(group.id, GroupStatus::Inactive)
            .await?;
        log_group_event(&group.platform_group_id, "bot_removed", None, None);

        let mut queue = NotificationQueue::new();
        queue.enqueue(
            EventKind::GroupUpdate,
            ADMIN_ROOM,
            json!({
                "group_id": updated.platform_group_id,
                "status": updated.status,
            }),
        );
        queue.flush(&self.registry).await;
        Ok(())
    }

    fn enqueue_member_event(
        &self,
        queue: &mut NotificationQueue,
        group: &Group,
        user: &User,
        change: &str,
    ) {
        queue.enqueue(
            EventKind::GroupUpdate,
            group_room(&group.platform_group_id),
            json!({
                "group_id": group.platform_group_id,
                "user_id": user.platform_user_id,
                "change": change,
            }),
        );
    }

    async fn handle_group_message(
        &self,
        user: &User,
        platform_group_id: &str,
        text: &str,
        queue: &mut NotificationQueue,
    ) -> Result<Option<String>> {
        let group = self.db.groups.get_or_create(platform_group_id).await?;

        match group.status() {
            GroupStatus::Suspended => {
                // Help and id still answer; everything else gets the notice
                // only when the bot was addressed, to avoid spamming.
                if parse_quick_command(text).is_some()
                    || should_respond(text, false, &self.settings.bot)
                {
                    Ok(Some(replies::suspended_text()))
                } else {
                    Ok(None)
                }
            }
            GroupStatus::Pending | GroupStatus::Inactive => {
                // Membership is tracked even before the group is activated
                let (_, is_new) = self.db.members.add_member(group.id, user.id).await?;
                if is_new {
                    self.enqueue_member_event(queue, &group, user, "member_joined");
                }
                match parse_quick_command(text) {
                    Some(QuickCommand::Help) => {
                        return Ok(Some(replies::help_text(&self.settings.bot, &group)))
                    }
                    Some(QuickCommand::GroupId) => {
                        return Ok(Some(replies::group_id_text(&group)))
                    }
                    _ => {}
                }
                let Some(cleaned) = self.screen(user, Some(&group), text).await? else {
                    return Ok(None);
                };
                // Every message in an unactivated group feeds the application
                // conversation, trigger words or not.
                self.application.handle(&group, user, &cleaned, queue).await
            }
            GroupStatus::Active => {
                self.handle_active_group(user, &group, text, queue).await
            }
        }
    }

    async fn handle_active_group(
        &self,
        user: &User,
        group: &Group,
        text: &str,
        queue: &mut NotificationQueue,
    ) -> Result<Option<String>> {
        // Anyone who speaks in an active group becomes a member
        let (_, is_new) = self.db.members.add_member(group.id, user.id).await?;
        if is_new {
            self.enqueue_member_event(queue, group, user, "member_joined");
        }

        let session = self.db.sessions.active_session(group.id).await?;

        if let Some(command) = parse_quick_command(text) {
            return Ok(Some(
                self.quick_command(user, group, command, session.as_ref(), queue)
                    .await?,
            ));
        }

        // Admin commands only apply between sessions; while ordering is
        // open the same text goes to the AI like any other message.
        if session.is_none() {
            if let Some(command) = parse_admin_command(text) {
                let reply = self.admin.handle(group, user, command, queue).await?;
                return Ok(Some(reply));
            }
        }

        if !should_respond(text, session.is_some(), &self.settings.bot) {
            return Ok(None);
        }

        let Some(cleaned) = self.screen(user, Some(group), text).await? else {
            return Ok(None);
        };

        self.converse(user, group, session.as_ref(), &cleaned, queue)
            .await
    }

    async fn quick_command(
        &self,
        user: &User,
        group: &Group,
        command: QuickCommand,
        session: Option<&OrderingSession>,
        queue: &mut NotificationQueue,
    ) -> Result<String> {
        match command {
            QuickCommand::Help => Ok(replies::help_text(&self.settings.bot, group)),
            QuickCommand::GroupId => Ok(replies::group_id_text(group)),
            QuickCommand::TodayStores => {
                let store_ids = self.today_stores.today_store_ids(group).await?;
                let menu = self.db.stores.menu_entries_for_stores(&store_ids).await?;
                Ok(replies::render_menu(&menu))
            }
            QuickCommand::Summary => match session {
                Some(session) => {
                    let summaries =
                        self.db.orders.session_order_summaries(session.id).await?;
                    Ok(replies::render_session_summary(&summaries))
                }
                None => Ok("There is no ordering session open right now.".to_string()),
            },
            QuickCommand::OpenOrder => self.open_session(user, group, queue).await,
            QuickCommand::CloseOrder => self.close_session(user, group, queue).await,
        }
    }

    /// Open an ordering session. Any member may do this; the only
    /// preconditions are a selected store and no session already open.
    async fn open_session(
        &self,
        user: &User,
        group: &Group,
        queue: &mut NotificationQueue,
    ) -> Result<String> {
        let store_ids = self.today_stores.today_store_ids(group).await?;
        if store_ids.is_empty() {
            return Err(OrderBuddyError::NoStoreConfigured);
        }

        let session = self.db.sessions.open_session(group.id, user.id).await?;
        log_group_event(
            &group.platform_group_id,
            "session_opened",
            Some(&user.platform_user_id),
            None,
        );

        let payload = json!({
            "group_id": group.platform_group_id,
            "session_id": session.id,
            "status": session.status,
        });
        queue.enqueue(
            EventKind::SessionStatus,
            group_room(&group.platform_group_id),
            payload.clone(),
        );
        queue.enqueue(EventKind::SessionStatus, ALL_ROOM, payload);

        let menu = self.db.stores.menu_entries_for_stores(&store_ids).await?;
        Ok(format!(
            "Ordering is open! Tell me what you want.\n{}",
            replies::render_menu(&menu)
        ))
    }

    /// Close the open session and post the final tally
    async fn close_session(
        &self,
        user: &User,
        group: &Group,
        queue: &mut NotificationQueue,
    ) -> Result<String> {
        let session = self.db.sessions.close_session(group.id).await?;
        log_group_event(
            &group.platform_group_id,
            "session_closed",
            Some(&user.platform_user_id),
            None,
        );

        let summaries = self.db.orders.session_order_summaries(session.id).await?;
        let payload = json!({
            "group_id": group.platform_group_id,
            "session_id": session.id,
            "status": session.status,
            "orders": summaries.len(),
        });
        queue.enqueue(
            EventKind::SessionStatus,
            group_room(&group.platform_group_id),
            payload.clone(),
        );
        queue.enqueue(EventKind::SessionStatus, ALL_ROOM, payload);

        Ok(format!(
            "Ordering is closed.\n{}",
            replies::render_session_summary(&summaries)
        ))
    }

    /// Group AI conversation: build context, call the model, apply actions
    async fn converse(
        &self,
        user: &User,
        group: &Group,
        session: Option<&OrderingSession>,
        cleaned: &str,
        queue: &mut NotificationQueue,
    ) -> Result<Option<String>> {
        let system_prompt = self.prompts.get(GROUP_PROMPT).await?;

        let store_ids = self.today_stores.today_store_ids(group).await?;
        let menu = self.db.stores.menu_entries_for_stores(&store_ids).await?;
        let context = self.build_group_context(group, session, &menu, user).await?;

        let history = match session {
            Some(session) => {
                self.db
                    .chat
                    .session_messages(session.id, self.settings.ai.history_limit)
                    .await?
            }
            None => {
                self.db
                    .chat
                    .group_messages(group.id, self.settings.ai.history_limit)
                    .await?
            }
        };
        let history = self.with_speakers(history).await?;

        let response = self
            .ai
            .invoke(AiRequest {
                system_prompt,
                context,
                history,
                speaker_name: user.name().to_string(),
                message: cleaned.to_string(),
            })
            .await?;

        if response.is_empty() {
            return Ok(None);
        }

        let is_admin = self.db.admins.is_admin(group.id, user.id).await?;
        let ctx = GroupContext {
            group,
            user,
            session,
            menu: &menu,
            is_admin,
        };
        let report = self
            .executor
            .apply_group_actions(&ctx, &response.actions, queue)
            .await;

        let mut reply = response.message;
        for note in report.notes {
            if !reply.is_empty() {
                reply.push('\n');
            }
            reply.push_str(&note);
        }

        let session_id = session.map(|s| s.id);
        self.db
            .chat
            .create(Some(group.id), user.id, session_id, ROLE_USER, cleaned)
            .await?;
        self.db
            .chat
            .create(Some(group.id), user.id, session_id, ROLE_ASSISTANT, &reply)
            .await?;

        let room = group_room(&group.platform_group_id);
        queue.enqueue(
            EventKind::ChatMessage,
            room.clone(),
            json!({
                "group_id": group.platform_group_id,
                "user_id": user.platform_user_id,
                "role": ROLE_USER,
                "content": cleaned,
            }),
        );
        queue.enqueue(
            EventKind::ChatMessage,
            room,
            json!({
                "group_id": group.platform_group_id,
                "role": ROLE_ASSISTANT,
                "content": reply,
            }),
        );

        Ok(Some(reply))
    }

    /// Serialize menus and current orders as plain text model context
    async fn build_group_context(
        &self,
        group: &Group,
        session: Option<&OrderingSession>,
        menu: &[crate::models::store::MenuEntry],
        user: &User,
    ) -> Result<String> {
        let mut context = String::new();

        context.push_str(&format!("Group: {}\n", group.display_name()));

        if menu.is_empty() {
            context.push_str("No store is selected for today.\n");
        } else {
            context.push_str("Today's menu:\n");
            for entry in menu {
                context.push_str(&format!(
                    "- {} [{}] {} : {}\n",
                    entry.store_name, entry.category, entry.name, entry.price
                ));
            }
        }

        match session {
            Some(session) => {
                context.push_str("An ordering session is OPEN.\n");
                let summaries = self.db.orders.session_order_summaries(session.id).await?;
                if let Some(own) = summaries.iter().find(|s| s.user_id == user.id) {
                    context.push_str(&format!(
                        "{}'s current order (total {}):\n",
                        user.name(),
                        own.total_amount
                    ));
                    for item in &own.items {
                        context.push_str(&format!("- {} x{}\n", item.name, item.quantity));
                    }
                }
                context.push_str(&format!("Orders so far: {}.\n", summaries.len()));
            }
            None => context.push_str("No ordering session is open.\n"),
        }

        if !user.preferences.as_object().map(|o| o.is_empty()).unwrap_or(true) {
            context.push_str(&format!(
                "{}'s preferences: {}\n",
                user.name(),
                user.preferences
            ));
        }

        Ok(context)
    }

    /// Attach speaker names to history entries for the group prompt.
    /// All speakers are fetched in one query; a member without a stored
    /// display name still gets a label.
    async fn with_speakers(
        &self,
        messages: Vec<crate::models::chat::ChatMessage>,
    ) -> Result<Vec<HistoryMessage>> {
        let mut ids: Vec<Uuid> = messages
            .iter()
            .filter(|m| m.role == ROLE_USER)
            .map(|m| m.user_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let names: HashMap<Uuid, String> = self
            .db
            .users
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name().to_string()))
            .collect();

        Ok(messages
            .into_iter()
            .map(|message| {
                let speaker = (message.role == ROLE_USER).then(|| {
                    names
                        .get(&message.user_id)
                        .cloned()
                        .unwrap_or_else(|| "member".to_string())
                });
                HistoryMessage {
                    role: message.role,
                    speaker,
                    content: message.content,
                }
            })
            .collect())
    }

    /// Sanitize the text. Suspicious input is logged, counted toward the
    /// ban threshold, and silently dropped.
    async fn screen(
        &self,
        user: &User,
        group: Option<&Group>,
        text: &str,
    ) -> Result<Option<String>> {
        let outcome = sanitize(text, self.settings.security.max_message_length);
        if !outcome.is_suspicious() {
            return Ok(Some(outcome.cleaned));
        }

        let reasons = join_reasons(&outcome.reasons);
        self.db
            .security
            .create(user.id, group.map(|g| g.id), &reasons, text)
            .await?;
        log_security_event(
            &user.platform_user_id,
            group.map(|g| g.platform_group_id.as_str()),
            &reasons,
        );

        let violations = self.db.security.count_for_user(user.id).await?;
        if violations >= self.settings.security.ban_threshold {
            self.db.users.ban(user.id).await?;
            tracing::warn!(
                user_id = %user.platform_user_id,
                violations,
                "user banned after repeated suspicious input"
            );
        }

        Ok(None)
    }

    async fn handle_personal_message(
        &self,
        user: &User,
        text: &str,
    ) -> Result<Option<String>> {
        let Some(cleaned) = self.screen(user, None, text).await? else {
            return Ok(None);
        };
        self.personal.handle(user, &cleaned).await
    }
}
