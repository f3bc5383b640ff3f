//! Canned reply texts and summary rendering

use crate::config::BotConfig;
use crate::models::group::{Group, GroupStatus};
use crate::models::order::OrderSummary;
use crate::models::store::MenuEntry;
use rust_decimal::Decimal;

pub fn help_text(bot: &BotConfig, group: &Group) -> String {
    match group.status() {
        GroupStatus::Active => format!(
            "Hi, I'm {name}. While an order is open, just tell me what you want \
and I'll keep the tally.\n\
Commands: open order, close order, menu, summary, id, help.\n\
Admins: bind admin <code>, set/add/remove store <name>, clear stores.",
            name = bot.name
        ),
        GroupStatus::Suspended => {
            "This group is currently suspended. Please contact the operator.".to_string()
        }
        _ => {
            let mut text = format!(
                "Hi, I'm {}. This group is not activated yet. \
Tell me your group name, a contact, and a group code to apply.",
                bot.name
            );
            if let Some(url) = &bot.apply_url {
                text.push_str(&format!(" Details: {url}"));
            }
            text
        }
    }
}

pub fn personal_help_text(bot: &BotConfig) -> String {
    format!(
        "Hi, I'm {}. Ask me about your order history or food preferences.\n\
Commands: my groups, my orders, my preferences, clear preferences.",
        bot.name
    )
}

pub fn group_id_text(group: &Group) -> String {
    format!("Group id: {}", group.platform_group_id)
}

pub fn suspended_text() -> String {
    "This group is suspended. Ordering is unavailable.".to_string()
}

pub fn ai_unavailable_text() -> String {
    "Sorry, I could not process that right now. Please try again in a moment.".to_string()
}

/// Render the day's full menu grouped by store and category
pub fn render_menu(entries: &[MenuEntry]) -> String {
    if entries.is_empty() {
        return "No store is selected for today yet.".to_string();
    }

    let mut lines = Vec::new();
    let mut current_store = "";
    let mut current_category = "";

    for entry in entries {
        if entry.store_name != current_store {
            current_store = &entry.store_name;
            current_category = "";
            lines.push(format!("[{}]", entry.store_name));
        }
        if entry.category != current_category {
            current_category = &entry.category;
            lines.push(format!("{}:", entry.category));
        }
        lines.push(format!("  {} - {}", entry.name, entry.price));
    }

    lines.join("\n")
}

/// Render the per-member tally shown on "summary" and when a session closes
pub fn render_session_summary(summaries: &[OrderSummary]) -> String {
    if summaries.is_empty() {
        return "No orders yet.".to_string();
    }

    let mut lines = Vec::new();
    let mut grand_total = Decimal::ZERO;

    for summary in summaries {
        let name = summary.display_name.as_deref().unwrap_or("member");
        lines.push(format!("{} ({}):", name, summary.total_amount));
        for item in &summary.items {
            let mut line = format!("  {} x{} = {}", item.name, item.quantity, item.subtotal);
            if let Some(note) = &item.note {
                line.push_str(&format!(" ({note})"));
            }
            lines.push(line);
        }
        grand_total += summary.total_amount;
    }

    lines.push(format!("Total: {grand_total}"));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::OrderItemSummary;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn summary(name: &str, total: Decimal, items: Vec<OrderItemSummary>) -> OrderSummary {
        OrderSummary {
            order_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            display_name: Some(name.to_string()),
            total_amount: total,
            payment_status: "unpaid".to_string(),
            items,
        }
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(render_session_summary(&[]), "No orders yet.");
    }

    fn entry(store: &str, category: &str, name: &str, price: Decimal) -> MenuEntry {
        MenuEntry {
            item_id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            store_name: store.to_string(),
            category: category.to_string(),
            name: name.to_string(),
            price,
            description: None,
        }
    }

    #[test]
    fn test_menu_renders_stores_categories_and_prices() {
        let entries = vec![
            entry("Lucky Noodles", "Lunch Box", "Fried Rice", dec!(80)),
            entry("Lucky Noodles", "Lunch Box", "Beef Noodles", dec!(95)),
            entry("Lucky Noodles", "Drinks", "Iced Tea", dec!(30)),
            entry("Sunrise Cafe", "Drinks", "Latte", dec!(60)),
        ];
        let text = render_menu(&entries);
        assert!(text.contains("[Lucky Noodles]"));
        assert!(text.contains("Lunch Box:"));
        assert!(text.contains("  Fried Rice - 80"));
        assert!(text.contains("[Sunrise Cafe]"));
        assert!(text.contains("  Latte - 60"));
        // The category header is not repeated per item
        assert_eq!(text.matches("Lunch Box:").count(), 1);
    }

    #[test]
    fn test_menu_empty_when_no_store_selected() {
        assert_eq!(render_menu(&[]), "No store is selected for today yet.");
    }

    #[test]
    fn test_summary_includes_totals_and_notes() {
        let summaries = vec![
            summary(
                "Ana",
                dec!(160),
                vec![OrderItemSummary {
                    name: "Fried Rice".to_string(),
                    quantity: 2,
                    unit_price: dec!(80),
                    subtotal: dec!(160),
                    note: Some("no onion".to_string()),
                }],
            ),
            summary(
                "Ben",
                dec!(30),
                vec![OrderItemSummary {
                    name: "Iced Tea".to_string(),
                    quantity: 1,
                    unit_price: dec!(30),
                    subtotal: dec!(30),
                    note: None,
                }],
            ),
        ];
        let text = render_session_summary(&summaries);
        assert!(text.contains("Ana (160):"));
        assert!(text.contains("Fried Rice x2 = 160 (no onion)"));
        assert!(text.contains("Total: 190"));
    }
}
