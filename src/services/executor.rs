//! AI action execution
//!
//! Applies the structured actions returned by the model. Actions are
//! independent: one failing action is reported and the rest still run.
//! Order mutations enqueue a single board update per batch once every
//! action has been applied.

use crate::database::DatabaseService;
use crate::models::group::{CreateApplicationRequest, Group};
use crate::models::order::{
    OrderItem, OrderingSession, PAYMENT_PAID, PAYMENT_REFUNDED, PAYMENT_UNPAID,
};
use crate::models::store::MenuEntry;
use crate::models::user::User;
use crate::notify::{group_room, EventKind, NotificationQueue, ADMIN_ROOM, ALL_ROOM};
use crate::services::ai::AiAction;
use crate::services::pricing::{resolve_price, ResolvedPrice};
use crate::services::stores::TodayStoreService;
use crate::utils::errors::{OrderBuddyError, Result};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct ItemSpec {
    name: String,
    #[serde(default = "default_quantity")]
    quantity: i32,
    category: Option<String>,
    note: Option<String>,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
struct OrderSpec {
    items: Vec<ItemSpec>,
}

#[derive(Debug, Deserialize)]
struct UpdateItemSpec {
    old_item: String,
    new_item: ItemSpec,
}

#[derive(Debug, Deserialize)]
struct RemoveItemSpec {
    item_name: String,
    quantity: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct StoreSpec {
    store_name: String,
}

#[derive(Debug, Deserialize)]
struct PaymentSpec {
    payment_status: String,
}

#[derive(Debug, Deserialize)]
struct ProfileSpec {
    display_name: Option<String>,
    preferences: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApplicationSpec {
    group_name: String,
    contact_info: String,
    group_code: String,
}

/// State gathered once per incoming message, shared by all actions
pub struct GroupContext<'a> {
    pub group: &'a Group,
    pub user: &'a User,
    pub session: Option<&'a OrderingSession>,
    pub menu: &'a [MenuEntry],
    pub is_admin: bool,
}

/// Per-batch result: user-facing notes, appended below the AI message
#[derive(Debug, Default)]
pub struct ExecutionReport {
    pub notes: Vec<String>,
}

pub struct ActionExecutor {
    db: DatabaseService,
    stores: TodayStoreService,
}

impl ActionExecutor {
    pub fn new(db: DatabaseService) -> Self {
        let stores = TodayStoreService::new(db.clone());
        Self { db, stores }
    }

    /// Apply actions produced in a group conversation
    pub async fn apply_group_actions(
        &self,
        ctx: &GroupContext<'_>,
        actions: &[AiAction],
        queue: &mut NotificationQueue,
    ) -> ExecutionReport {
        let mut report = ExecutionReport::default();
        let mut order_mutated = false;

        for action in actions {
            let result = self.apply_one_group_action(ctx, action, queue).await;
            match result {
                Ok(outcome) => {
                    if let Some(note) = outcome.note {
                        report.notes.push(note);
                    }
                    order_mutated |= outcome.order_mutated;
                }
                Err(err) => {
                    tracing::warn!(
                        action = %action.kind,
                        user_id = %ctx.user.platform_user_id,
                        error = %err,
                        "action failed"
                    );
                    report
                        .notes
                        .push(err.user_message().unwrap_or_else(|| {
                            "Something went wrong with that request.".to_string()
                        }));
                }
            }
        }

        if order_mutated {
            if let Some(session) = ctx.session {
                if let Err(err) = self.enqueue_order_update(ctx.group, session, queue).await {
                    tracing::warn!(error = %err, "failed to build order update event");
                }
            }
        }

        report
    }

    async fn apply_one_group_action(
        &self,
        ctx: &GroupContext<'_>,
        action: &AiAction,
        queue: &mut NotificationQueue,
    ) -> Result<ActionOutcome> {
        match action.kind.as_str() {
            "create_order" => {
                let spec: OrderSpec = parse_action(&action.data)?;
                self.create_order(ctx, spec).await
            }
            "update_order" => {
                let spec: UpdateItemSpec = parse_action(&action.data)?;
                self.update_order(ctx, spec).await
            }
            "remove_item" => {
                let spec: RemoveItemSpec = parse_action(&action.data)?;
                self.remove_item(ctx, spec).await
            }
            "cancel_order" => self.cancel_order(ctx).await,
            "update_payment" => {
                let spec: PaymentSpec = parse_action(&action.data)?;
                self.update_payment(ctx, spec, queue).await
            }
            "set_store" | "add_store" | "remove_store" => {
                if !ctx.is_admin {
                    return Err(OrderBuddyError::PermissionDenied(
                        "store selection is admin only".to_string(),
                    ));
                }
                let spec: StoreSpec = parse_action(&action.data)?;
                let reply = match action.kind.as_str() {
                    "set_store" => {
                        self.stores
                            .set_store(ctx.group, &spec.store_name, queue)
                            .await?
                    }
                    "add_store" => {
                        self.stores
                            .add_store(ctx.group, &spec.store_name, queue)
                            .await?
                    }
                    _ => {
                        self.stores
                            .remove_store(ctx.group, &spec.store_name, queue)
                            .await?
                    }
                };
                Ok(ActionOutcome::note(reply))
            }
            other => {
                tracing::debug!(kind = other, "ignoring unknown action kind");
                Ok(ActionOutcome::none())
            }
        }
    }

    /// Add items to the member's order. Every item price is resolved
    /// before any row is written, so a single unknown item rejects the
    /// whole batch of lines.
    async fn create_order(&self, ctx: &GroupContext<'_>, spec: OrderSpec) -> Result<ActionOutcome> {
        let session = ctx.session.ok_or(OrderBuddyError::SessionNotOpen {
            group_id: ctx.group.id,
        })?;

        if spec.items.is_empty() {
            return Err(OrderBuddyError::InvalidInput(
                "There are no items in that order.".to_string(),
            ));
        }

        let mut resolved: Vec<(ResolvedPrice, &ItemSpec)> = Vec::with_capacity(spec.items.len());
        for item in &spec.items {
            if item.quantity < 1 {
                return Err(OrderBuddyError::InvalidInput(format!(
                    "quantity for {} must be at least 1",
                    item.name
                )));
            }
            let price = resolve_price(ctx.menu, &item.name, item.category.as_deref()).ok_or(
                OrderBuddyError::MenuItemNotFound {
                    name: item.name.clone(),
                },
            )?;
            resolved.push((price, item));
        }

        let order = self
            .db
            .orders
            .get_or_create(session.id, ctx.user.id, None)
            .await?;

        for (price, item) in &resolved {
            self.db
                .orders
                .insert_item(
                    order.id,
                    &price.item_name,
                    item.quantity,
                    price.unit_price,
                    item.note.as_deref(),
                )
                .await?;
        }
        let order = self.db.orders.recalculate_total(order.id).await?;

        Ok(ActionOutcome::mutated(format!(
            "Order saved, total {}.",
            order.total_amount
        )))
    }

    /// Swap one line of the member's order for another menu item.
    /// The replacement price is resolved before the old line is touched,
    /// so an unknown replacement leaves the order intact.
    async fn update_order(
        &self,
        ctx: &GroupContext<'_>,
        spec: UpdateItemSpec,
    ) -> Result<ActionOutcome> {
        let session = ctx.session.ok_or(OrderBuddyError::SessionNotOpen {
            group_id: ctx.group.id,
        })?;
        let order = self
            .db
            .orders
            .find_by_session_and_user(session.id, ctx.user.id)
            .await?
            .ok_or(OrderBuddyError::OrderNotFound {
                user_id: ctx.user.platform_user_id.clone(),
            })?;

        if spec.new_item.quantity < 1 {
            return Err(OrderBuddyError::InvalidInput(format!(
                "quantity for {} must be at least 1",
                spec.new_item.name
            )));
        }
        let price = resolve_price(
            ctx.menu,
            &spec.new_item.name,
            spec.new_item.category.as_deref(),
        )
        .ok_or(OrderBuddyError::MenuItemNotFound {
            name: spec.new_item.name.clone(),
        })?;

        let items = self.db.orders.items_for_order(order.id).await?;
        let target =
            match_order_item(&items, &spec.old_item).ok_or(OrderBuddyError::MenuItemNotFound {
                name: spec.old_item.clone(),
            })?;

        self.db.orders.delete_item(target.id).await?;
        self.db
            .orders
            .insert_item(
                order.id,
                &price.item_name,
                spec.new_item.quantity,
                price.unit_price,
                spec.new_item.note.as_deref(),
            )
            .await?;
        let order = self.db.orders.recalculate_total(order.id).await?;

        Ok(ActionOutcome::mutated(format!(
            "Replaced {} with {}. New total {}.",
            target.name, price.item_name, order.total_amount
        )))
    }

    async fn remove_item(
        &self,
        ctx: &GroupContext<'_>,
        spec: RemoveItemSpec,
    ) -> Result<ActionOutcome> {
        let session = ctx.session.ok_or(OrderBuddyError::SessionNotOpen {
            group_id: ctx.group.id,
        })?;
        let order = self
            .db
            .orders
            .find_by_session_and_user(session.id, ctx.user.id)
            .await?
            .ok_or(OrderBuddyError::OrderNotFound {
                user_id: ctx.user.platform_user_id.clone(),
            })?;

        let items = self.db.orders.items_for_order(order.id).await?;
        let target =
            match_order_item(&items, &spec.item_name).ok_or(OrderBuddyError::MenuItemNotFound {
                name: spec.item_name.clone(),
            })?;

        match spec.quantity {
            Some(q) if q > 0 && q < target.quantity => {
                self.db
                    .orders
                    .set_item_quantity(target.id, target.quantity - q)
                    .await?;
            }
            _ => {
                self.db.orders.delete_item(target.id).await?;
            }
        }

        let remaining = self.db.orders.items_for_order(order.id).await?;
        if remaining.is_empty() {
            self.db.orders.delete_order(order.id).await?;
            return Ok(ActionOutcome::mutated(
                "Removed the last item; your order was cleared.".to_string(),
            ));
        }

        let order = self.db.orders.recalculate_total(order.id).await?;
        Ok(ActionOutcome::mutated(format!(
            "Removed {}. New total {}.",
            target.name, order.total_amount
        )))
    }

    async fn cancel_order(&self, ctx: &GroupContext<'_>) -> Result<ActionOutcome> {
        let session = ctx.session.ok_or(OrderBuddyError::SessionNotOpen {
            group_id: ctx.group.id,
        })?;
        let order = self
            .db
            .orders
            .find_by_session_and_user(session.id, ctx.user.id)
            .await?
            .ok_or(OrderBuddyError::OrderNotFound {
                user_id: ctx.user.platform_user_id.clone(),
            })?;

        self.db.orders.delete_order(order.id).await?;
        Ok(ActionOutcome::mutated("Your order was cancelled.".to_string()))
    }

    /// Mark the member's own order paid, unpaid or refunded
    async fn update_payment(
        &self,
        ctx: &GroupContext<'_>,
        spec: PaymentSpec,
        queue: &mut NotificationQueue,
    ) -> Result<ActionOutcome> {
        let status = spec.payment_status.to_lowercase();
        if ![PAYMENT_UNPAID, PAYMENT_PAID, PAYMENT_REFUNDED].contains(&status.as_str()) {
            return Err(OrderBuddyError::InvalidInput(format!(
                "unknown payment status: {}",
                spec.payment_status
            )));
        }

        let session = ctx.session.ok_or(OrderBuddyError::SessionNotOpen {
            group_id: ctx.group.id,
        })?;
        let order = self
            .db
            .orders
            .find_by_session_and_user(session.id, ctx.user.id)
            .await?
            .ok_or(OrderBuddyError::OrderNotFound {
                user_id: ctx.user.platform_user_id.clone(),
            })?;

        let order = self.db.orders.set_payment_status(order.id, &status).await?;

        let payload = json!({
            "group_id": ctx.group.platform_group_id,
            "order_id": order.id,
            "user_id": ctx.user.platform_user_id,
            "payment_status": order.payment_status,
        });
        queue.enqueue(
            EventKind::PaymentUpdate,
            group_room(&ctx.group.platform_group_id),
            payload.clone(),
        );
        queue.enqueue(EventKind::PaymentUpdate, ALL_ROOM, payload);

        Ok(ActionOutcome::note(format!(
            "Payment status set to {}.",
            order.payment_status
        )))
    }

    async fn enqueue_order_update(
        &self,
        group: &Group,
        session: &OrderingSession,
        queue: &mut NotificationQueue,
    ) -> Result<()> {
        let summaries = self.db.orders.session_order_summaries(session.id).await?;
        let payload = json!({
            "group_id": group.platform_group_id,
            "session_id": session.id,
            "orders": summaries,
        });
        queue.enqueue(
            EventKind::OrderUpdate,
            group_room(&group.platform_group_id),
            payload.clone(),
        );
        queue.enqueue(EventKind::OrderUpdate, ALL_ROOM, payload);
        Ok(())
    }

    /// Apply actions produced in a one-on-one conversation
    pub async fn apply_personal_actions(
        &self,
        user: &User,
        actions: &[AiAction],
    ) -> ExecutionReport {
        let mut report = ExecutionReport::default();

        for action in actions {
            let result = self.apply_one_personal_action(user, action).await;
            match result {
                Ok(Some(note)) => report.notes.push(note),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(
                        action = %action.kind,
                        user_id = %user.platform_user_id,
                        error = %err,
                        "personal action failed"
                    );
                    report
                        .notes
                        .push(err.user_message().unwrap_or_else(|| {
                            "Something went wrong with that request.".to_string()
                        }));
                }
            }
        }

        report
    }

    async fn apply_one_personal_action(
        &self,
        user: &User,
        action: &AiAction,
    ) -> Result<Option<String>> {
        match action.kind.as_str() {
            "update_profile" => {
                let spec: ProfileSpec = parse_action(&action.data)?;
                if let Some(name) = &spec.display_name {
                    self.db.users.set_display_name(user.id, name).await?;
                }
                if let Some(preferences) = spec.preferences {
                    let merged = merge_preferences(&user.preferences, preferences);
                    self.db.users.set_preferences(user.id, merged).await?;
                }
                Ok(Some("Profile updated.".to_string()))
            }
            "clear_preferences" => {
                self.db.users.set_preferences(user.id, json!({})).await?;
                Ok(Some("Preferences cleared.".to_string()))
            }
            "query_preferences" => {
                let current = self
                    .db
                    .users
                    .find_by_id(user.id)
                    .await?
                    .map(|u| u.preferences)
                    .unwrap_or_else(|| json!({}));
                if current.as_object().map(|o| o.is_empty()).unwrap_or(true) {
                    Ok(Some("No preferences saved yet.".to_string()))
                } else {
                    Ok(Some(format!("Saved preferences: {current}")))
                }
            }
            "query_groups" => {
                let groups = self.db.members.groups_for_user(user.id).await?;
                if groups.is_empty() {
                    Ok(Some("You are not in any active group.".to_string()))
                } else {
                    let names: Vec<String> =
                        groups.iter().map(|g| g.display_name()).collect();
                    Ok(Some(format!("Your groups: {}.", names.join(", "))))
                }
            }
            "query_orders" => {
                let orders = self.db.orders.recent_orders_for_user(user.id, 5).await?;
                if orders.is_empty() {
                    return Ok(Some("No past orders found.".to_string()));
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
                Ok(Some(lines.join("\n")))
            }
            other => {
                tracing::debug!(kind = other, "ignoring unknown personal action kind");
                Ok(None)
            }
        }
    }

    /// Apply actions produced in a not-yet-active group (application flow)
    pub async fn apply_application_actions(
        &self,
        group: &Group,
        actions: &[AiAction],
        queue: &mut NotificationQueue,
    ) -> ExecutionReport {
        let mut report = ExecutionReport::default();

        for action in actions {
            if action.kind != "submit_application" {
                tracing::debug!(kind = %action.kind, "ignoring action outside application flow");
                continue;
            }
            match self.submit_application(group, &action.data, queue).await {
                Ok(note) => report.notes.push(note),
                Err(err) => {
                    tracing::warn!(error = %err, "application submission failed");
                    report
                        .notes
                        .push("Could not submit the application, please try again.".to_string());
                }
            }
        }

        report
    }

    async fn submit_application(
        &self,
        group: &Group,
        data: &serde_json::Value,
        queue: &mut NotificationQueue,
    ) -> Result<String> {
        let spec: ApplicationSpec = parse_action(data)?;

        let application = self
            .db
            .applications
            .create(CreateApplicationRequest {
                platform_group_id: group.platform_group_id.clone(),
                group_name: spec.group_name,
                contact_info: spec.contact_info,
                group_code: spec.group_code,
            })
            .await?;

        queue.enqueue(
            EventKind::ApplicationUpdate,
            ADMIN_ROOM,
            json!({
                "application_id": application.id,
                "group_id": application.platform_group_id,
                "group_name": application.group_name,
                "status": application.status,
            }),
        );

        Ok("Application submitted. You will hear back after review.".to_string())
    }
}

struct ActionOutcome {
    note: Option<String>,
    order_mutated: bool,
}

impl ActionOutcome {
    fn none() -> Self {
        Self {
            note: None,
            order_mutated: false,
        }
    }

    fn note(note: String) -> Self {
        Self {
            note: Some(note),
            order_mutated: false,
        }
    }

    fn mutated(note: String) -> Self {
        Self {
            note: Some(note),
            order_mutated: true,
        }
    }
}

/// Find a line of an order by name, exact match first, then substring
fn match_order_item<'a>(items: &'a [OrderItem], wanted: &str) -> Option<&'a OrderItem> {
    let wanted = wanted.trim().to_lowercase();
    items
        .iter()
        .find(|i| i.name.to_lowercase() == wanted)
        .or_else(|| items.iter().find(|i| i.name.to_lowercase().contains(&wanted)))
}

fn parse_action<T: serde::de::DeserializeOwned>(data: &serde_json::Value) -> Result<T> {
    serde_json::from_value(data.clone())
        .map_err(|e| OrderBuddyError::InvalidInput(format!("malformed action payload: {e}")))
}

fn merge_preferences(
    current: &serde_json::Value,
    update: serde_json::Value,
) -> serde_json::Value {
    match (current.as_object(), update.as_object()) {
        (Some(base), Some(patch)) => {
            let mut merged = base.clone();
            for (key, value) in patch {
                if value.is_null() {
                    merged.remove(key);
                } else {
                    merged.insert(key.clone(), value.clone());
                }
            }
            serde_json::Value::Object(merged)
        }
        _ => update,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_preferences_patches_keys() {
        let current = json!({"spice": "mild", "drink": "tea"});
        let merged = merge_preferences(&current, json!({"spice": "hot"}));
        assert_eq!(merged["spice"], "hot");
        assert_eq!(merged["drink"], "tea");
    }

    #[test]
    fn test_merge_preferences_null_removes_key() {
        let current = json!({"spice": "mild", "drink": "tea"});
        let merged = merge_preferences(&current, json!({"drink": null}));
        assert!(merged.get("drink").is_none());
        assert_eq!(merged["spice"], "mild");
    }

    #[test]
    fn test_merge_preferences_non_object_replaces() {
        let current = json!("legacy");
        let merged = merge_preferences(&current, json!({"spice": "hot"}));
        assert_eq!(merged["spice"], "hot");
    }

    #[test]
    fn test_parse_action_rejects_wrong_shape() {
        let result: Result<RemoveItemSpec> = parse_action(&json!({"quantity": 2}));
        assert!(result.is_err());
    }

    #[test]
    fn test_update_order_payload_parses_old_and_new_item() {
        let spec: UpdateItemSpec = parse_action(&json!({
            "old_item": "Fried Rice",
            "new_item": {"name": "Beef Noodles", "quantity": 2}
        }))
        .unwrap();
        assert_eq!(spec.old_item, "Fried Rice");
        assert_eq!(spec.new_item.name, "Beef Noodles");
        assert_eq!(spec.new_item.quantity, 2);
    }

    #[test]
    fn test_update_order_payload_is_not_an_items_list() {
        // A replace-one-item payload must never deserialize as a
        // create_order with zero items.
        let result: Result<OrderSpec> = parse_action(&json!({
            "old_item": "Fried Rice",
            "new_item": {"name": "Beef Noodles"}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_item_spec_defaults_quantity() {
        let spec: ItemSpec = serde_json::from_value(json!({"name": "Fried Rice"})).unwrap();
        assert_eq!(spec.quantity, 1);
        assert!(spec.note.is_none());
    }

    fn line(name: &str) -> OrderItem {
        OrderItem {
            id: uuid::Uuid::new_v4(),
            order_id: uuid::Uuid::new_v4(),
            name: name.to_string(),
            quantity: 1,
            unit_price: rust_decimal_macros::dec!(50),
            subtotal: rust_decimal_macros::dec!(50),
            note: None,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_match_order_item_prefers_exact() {
        let items = vec![line("Iced Tea"), line("Iced Tea Large")];
        let hit = match_order_item(&items, "iced tea").unwrap();
        assert_eq!(hit.name, "Iced Tea");
    }

    #[test]
    fn test_match_order_item_falls_back_to_substring() {
        let items = vec![line("Beef Noodles")];
        assert!(match_order_item(&items, "beef").is_some());
        assert!(match_order_item(&items, "pork").is_none());
    }
}
