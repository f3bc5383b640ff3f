//! Application flow for groups that are not active yet
//!
//! A pending or inactive group talks to the AI only to apply for
//! activation. The latest application decides what the group sees:
//! a pending one short-circuits to "under review", a rejected one is
//! archived so the group can reapply, an approved one activates the
//! group on the next message.

use crate::config::BotConfig;
use crate::database::DatabaseService;
use crate::models::chat::{ROLE_ASSISTANT, ROLE_USER};
use crate::models::group::{ApplicationStatus, Group, GroupStatus};
use crate::models::user::User;
use crate::notify::{EventKind, NotificationQueue, ADMIN_ROOM};
use crate::services::ai::{AiGateway, AiRequest, HistoryMessage};
use crate::services::{ActionExecutor, PromptService, APPLICATION_PROMPT};
use crate::utils::errors::Result;
use serde_json::json;
use std::sync::Arc;

pub struct ApplicationHandler {
    db: DatabaseService,
    ai: Arc<dyn AiGateway>,
    prompts: Arc<PromptService>,
    executor: Arc<ActionExecutor>,
    bot: BotConfig,
    history_limit: i64,
}

impl ApplicationHandler {
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

    /// Handle a message in a group that is not active.
    /// `cleaned` is the sanitized message text.
    pub async fn handle(
        &self,
        group: &Group,
        user: &User,
        cleaned: &str,
        queue: &mut NotificationQueue,
    ) -> Result<Option<String>> {
        let latest = self
            .db
            .applications
            .latest_for_group(&group.platform_group_id)
            .await?;

        if let Some(application) = &latest {
            match application.status() {
                ApplicationStatus::Pending => {
                    return Ok(Some(
                        "Your group's application is under review. Hang tight!".to_string(),
                    ));
                }
                ApplicationStatus::Rejected => {
                    self.db.applications.archive(application.id).await?;
                    let mut reply =
                        "Your previous application was declined. You are welcome to apply again."
                            .to_string();
                    if let Some(note) = &application.review_note {
                        reply.push_str(&format!(" Reviewer note: {note}"));
                    }
                    return Ok(Some(reply));
                }
                ApplicationStatus::Approved => {
                    // Approval happened on the review side; activate on
                    // the group's next message.
                    if group.status() != GroupStatus::Active {
                        let name = application.group_name.clone().unwrap_or_default();
                        let code = application.group_code.clone().unwrap_or_default();
                        let activated =
                            self.db.groups.activate(group.id, &name, &code).await?;
                        queue.enqueue(
                            EventKind::GroupUpdate,
                            ADMIN_ROOM,
                            json!({
                                "group_id": activated.platform_group_id,
                                "status": activated.status,
                            }),
                        );
                        return Ok(Some(format!(
                            "Welcome aboard, {}! The group is now active. \
Admins can bind with the group code.",
                            activated.display_name()
                        )));
                    }
                }
                ApplicationStatus::Archived => {}
            }
        }

        self.converse(group, user, cleaned, queue).await
    }

    /// AI-led application conversation
    async fn converse(
        &self,
        group: &Group,
        user: &User,
        cleaned: &str,
        queue: &mut NotificationQueue,
    ) -> Result<Option<String>> {
        let system_prompt = self.prompts.get(APPLICATION_PROMPT).await?;
        let history = self
            .db
            .chat
            .group_messages(group.id, self.history_limit)
            .await?
            .into_iter()
            .map(|m| HistoryMessage {
                role: m.role,
                speaker: None,
                content: m.content,
            })
            .collect();

        let context = match &self.bot.apply_url {
            Some(url) => format!("Application details page: {url}"),
            None => String::new(),
        };

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
            .apply_application_actions(group, &response.actions, queue)
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
            .create(Some(group.id), user.id, None, ROLE_USER, cleaned)
            .await?;
        self.db
            .chat
            .create(Some(group.id), user.id, None, ROLE_ASSISTANT, &reply)
            .await?;

        Ok(Some(reply))
    }
}
