//! Admin command handling
//!
//! Binding and store selection. The router only consults admin commands
//! while no ordering session is open, so store changes can never shift
//! prices mid-session.

use crate::config::SecurityConfig;
use crate::database::DatabaseService;
use crate::handlers::commands::AdminCommand;
use crate::models::group::Group;
use crate::models::user::User;
use crate::notify::NotificationQueue;
use crate::services::TodayStoreService;
use crate::utils::errors::{OrderBuddyError, Result};
use crate::utils::logging::log_admin_action;
use std::sync::Arc;

pub struct AdminHandler {
    db: DatabaseService,
    stores: Arc<TodayStoreService>,
    security: SecurityConfig,
}

impl AdminHandler {
    pub fn new(db: DatabaseService, stores: Arc<TodayStoreService>, security: SecurityConfig) -> Self {
        Self { db, stores, security }
    }

    pub async fn handle(
        &self,
        group: &Group,
        user: &User,
        command: AdminCommand,
        queue: &mut NotificationQueue,
    ) -> Result<String> {
        if let AdminCommand::BindAdmin { code } = &command {
            return self.bind_admin(group, user, code).await;
        }

        if !self.db.admins.is_admin(group.id, user.id).await? {
            return Err(OrderBuddyError::PermissionDenied(
                "admin commands require admin rights".to_string(),
            ));
        }

        match command {
            AdminCommand::BindAdmin { .. } => unreachable!("handled above"),
            AdminCommand::UnbindAdmin => {
                self.db.admins.remove_admin_checked(group.id, user.id).await?;
                log_admin_action(&user.platform_user_id, &group.platform_group_id, "unbind_admin");
                Ok("You are no longer an admin of this group.".to_string())
            }
            AdminCommand::SetStore { name } => {
                let reply = self.stores.set_store(group, &name, queue).await?;
                log_admin_action(&user.platform_user_id, &group.platform_group_id, "set_store");
                Ok(reply)
            }
            AdminCommand::AddStore { name } => {
                let reply = self.stores.add_store(group, &name, queue).await?;
                log_admin_action(&user.platform_user_id, &group.platform_group_id, "add_store");
                Ok(reply)
            }
            AdminCommand::RemoveStore { name } => {
                let reply = self.stores.remove_store(group, &name, queue).await?;
                log_admin_action(&user.platform_user_id, &group.platform_group_id, "remove_store");
                Ok(reply)
            }
            AdminCommand::ClearStores => {
                let reply = self.stores.clear_stores(group, queue).await?;
                log_admin_action(&user.platform_user_id, &group.platform_group_id, "clear_stores");
                Ok(reply)
            }
        }
    }

    async fn bind_admin(&self, group: &Group, user: &User, code: &str) -> Result<String> {
        let len = code.chars().count();
        if len < self.security.group_code_min_length || len > self.security.group_code_max_length {
            return Ok("That does not look like a valid group code.".to_string());
        }

        match &group.group_code {
            Some(expected) if expected == code => {
                self.db.admins.add_admin(group.id, user.id).await?;
                log_admin_action(&user.platform_user_id, &group.platform_group_id, "bind_admin");
                Ok("You are now an admin of this group.".to_string())
            }
            _ => Ok("That code is not correct.".to_string()),
        }
    }
}
