//! One-on-one conversation handling
//!
//! Available only to members of at least one active group. Quick
//! commands answer directly; everything else goes to the AI with the
//! user's preferences and recent history as context.

use crate::config::BotConfig;
use crate::database::DatabaseService;
use crate::handlers::commands::{parse_personal_command, PersonalCommand};
use crate::handlers::replies::personal_help_text;
use crate::models::chat::{ROLE_ASSISTANT, ROLE_USER};
use crate::models::user::User;
use crate::services::ai::{AiGateway, AiRequest, HistoryMessage};
use crate::services::{ActionExecutor, PromptService, PERSONAL_PROMPT};
use crate::utils::errors::Result;
use std::sync::Arc;

pub struct PersonalHandler {
    db: DatabaseService,
    ai: Arc<dyn AiGateway>,
    prompts: Arc<PromptService>,
    executor: Arc<ActionExecutor>,
    bot: BotConfig,
    history_limit: i64,
}

impl PersonalHandler {
    pub fn new(
        db: DatabaseService,
        ai: Arc<dyn AiGateway>,
        prompts: Arc<PromptService>,
        executor: Arc<ActionExecutor>,
        bot: BotConfig,
        history_limit: i64,
    ) -> Self {
        Self {
            db,
            ai,
            prompts,
            executor,
            bot,
            history_limit,
        }
    }

    /// Handle a one-on-one message. `cleaned` is the sanitized text.
    pub async fn handle(&self, user: &User, cleaned: &str) -> Result<Option<String>> {
        if !self.db.members.is_member_of_any_active_group(user.id).await? {
            return Ok(Some(
                "I can only chat with members of an active group. \
Join one and say hi there first!"
                    .to_string(),
            ));
        }

        if let Some(command) = parse_personal_command(cleaned) {
            return Ok(Some(self.quick_command(user, command).await?));
        }

        self.converse(user, cleaned).await
    }

    async fn quick_command(&self, user: &User, command: PersonalCommand) -> Result<String> {
        match command {
            PersonalCommand::Help => Ok(personal_help_text(&self.bot)),
            PersonalCommand::MyGroups => {
                let groups = self.db.members.groups_for_user(user.id).await?;
                if groups.is_empty() {
                    Ok("You are not in any active group.".to_string())
                } else {
                    let names: Vec<String> = groups.iter().map(|g| g.display_name()).collect();
                    Ok(format!("Your groups: {}.", names.join(", ")))
                }
            }
            PersonalCommand::MyOrders => {
                let orders = self.db.orders.recent_orders_for_user(user.id, 5).await?;
                if orders.is_empty() {
                    return Ok("No past orders found.".to_string());
                }
                let mut lines = vec!["Your recent orders:".to_string()];
                for order in orders {
                    let items = self.db.orders.items_for_order(order.id).await?;
                    let item_list: Vec<String> = items
                        .iter()
                        .map(|i| format!("{} x{}", i.name, i.quantity))
                        .collect();
                    lines.push(format!(
                        "{} - {} ({})",
                        order.created_at.format("%Y-%m-%d"),
                        item_list.join(", "),
                        order.total_amount
                    ));
                }
                Ok(lines.join("\n"))
            }
            PersonalCommand::MyPreferences => {
                if user.preferences.as_object().map(|o| o.is_empty()).unwrap_or(true) {
                    Ok("No preferences saved yet.".to_string())
                } else {
                    Ok(format!("Saved preferences: {}", user.preferences))
                }
            }
            PersonalCommand::ClearPreferences => {
                self.db
                    .users
                    .set_preferences(user.id, serde_json::json!({}))
                    .await?;
                Ok("Preferences cleared.".to_string())
            }
        }
    }

    async fn converse(&self, user: &User, cleaned: &str) -> Result<Option<String>> {
        let system_prompt = self.prompts.get(PERSONAL_PROMPT).await?;
        let history = self
            .db
            .chat
            .personal_messages(user.id, self.history_limit)
            .await?
            .into_iter()
            .map(|m| HistoryMessage {
                role: m.role,
                speaker: None,
                content: m.content,
            })
            .collect();

        let context = format!("User preferences: {}", user.preferences);

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

        let report = self
            .executor
            .apply_personal_actions(user, &response.actions)
            .await;

        let mut reply = response.message;
        for note in report.notes {
            if !reply.is_empty() {
                reply.push('\n');
            }
            reply.push_str(&note);
        }

        self.db
            .chat
            .create(None, user.id, None, ROLE_USER, cleaned)
            .await?;
        self.db
            .chat
            .create(None, user.id, None, ROLE_ASSISTANT, &reply)
            .await?;

        Ok(Some(reply))
    }
}
