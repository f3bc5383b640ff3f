//! Menu price resolution
//!
//! Resolves an item name against the menus of the day's stores. Lookup
//! order: exact within the hinted category, substring within the hinted
//! category, exact anywhere, substring anywhere. Entries priced at zero
//! or below never resolve.

use crate::models::store::MenuEntry;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPrice {
    pub item_name: String,
    pub unit_price: Decimal,
    pub store_name: String,
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

fn usable(entry: &MenuEntry) -> bool {
    entry.price > Decimal::ZERO
}

fn to_resolved(entry: &MenuEntry) -> ResolvedPrice {
    ResolvedPrice {
        item_name: entry.name.clone(),
        unit_price: entry.price,
        store_name: entry.store_name.clone(),
    }
}

/// Resolve one item name, optionally scoped by a category hint
pub fn resolve_price(
    entries: &[MenuEntry],
    name: &str,
    category_hint: Option<&str>,
) -> Option<ResolvedPrice> {
    let name = normalize(name);
    if name.is_empty() {
        return None;
    }

    if let Some(hint) = category_hint {
        let hint = normalize(hint);
        let in_category: Vec<&MenuEntry> = entries
            .iter()
            .filter(|e| usable(e) && normalize(&e.category) == hint)
            .collect();

        if let Some(entry) = in_category.iter().find(|e| normalize(&e.name) == name) {
            return Some(to_resolved(entry));
        }
        if let Some(entry) = in_category
            .iter()
            .find(|e| normalize(&e.name).contains(&name))
        {
            return Some(to_resolved(entry));
        }
    }

    if let Some(entry) = entries
        .iter()
        .find(|e| usable(e) && normalize(&e.name) == name)
    {
        return Some(to_resolved(entry));
    }
    entries
        .iter()
        .find(|e| usable(e) && normalize(&e.name).contains(&name))
        .map(to_resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

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

    fn sample_menu() -> Vec<MenuEntry> {
        vec![
            entry("Lucky Noodles", "Rice", "Fried Rice", dec!(80)),
            entry("Lucky Noodles", "Rice", "Shrimp Fried Rice", dec!(110)),
            entry("Lucky Noodles", "Noodles", "Beef Noodles", dec!(120)),
            entry("Sunrise Cafe", "Drinks", "Iced Tea", dec!(30)),
            entry("Sunrise Cafe", "Specials", "Fried Rice Deluxe", dec!(150)),
        ]
    }

    #[test]
    fn test_exact_in_category_beats_everything() {
        let menu = sample_menu();
        let hit = resolve_price(&menu, "fried rice", Some("Rice")).unwrap();
        assert_eq!(hit.item_name, "Fried Rice");
        assert_eq!(hit.unit_price, dec!(80));
    }

    #[test]
    fn test_substring_in_category_before_global_exact() {
        let menu = vec![
            entry("A", "Specials", "Jumbo Fried Rice", dec!(150)),
            entry("B", "Rice", "Fried Rice", dec!(80)),
        ];
        // Hinted category only has a substring hit, which still wins
        // over the exact hit outside the category.
        let hit = resolve_price(&menu, "fried rice", Some("Specials")).unwrap();
        assert_eq!(hit.item_name, "Jumbo Fried Rice");
    }

    #[test]
    fn test_global_exact_when_category_misses() {
        let menu = sample_menu();
        let hit = resolve_price(&menu, "iced tea", Some("Rice")).unwrap();
        assert_eq!(hit.item_name, "Iced Tea");
        assert_eq!(hit.store_name, "Sunrise Cafe");
    }

    #[test]
    fn test_global_substring_last() {
        let menu = sample_menu();
        let hit = resolve_price(&menu, "beef", None).unwrap();
        assert_eq!(hit.item_name, "Beef Noodles");
    }

    #[test]
    fn test_zero_price_never_resolves() {
        let menu = vec![entry("A", "Rice", "Mystery Rice", dec!(0))];
        assert!(resolve_price(&menu, "mystery rice", None).is_none());
    }

    #[test]
    fn test_zero_price_exact_skipped_for_priced_substring() {
        let menu = vec![
            entry("A", "Rice", "Fried Rice", dec!(0)),
            entry("B", "Rice", "Shrimp Fried Rice", dec!(110)),
        ];
        let hit = resolve_price(&menu, "fried rice", None).unwrap();
        assert_eq!(hit.item_name, "Shrimp Fried Rice");
    }

    #[test]
    fn test_unknown_item_is_none() {
        let menu = sample_menu();
        assert!(resolve_price(&menu, "sushi", None).is_none());
    }

    #[test]
    fn test_case_insensitive() {
        let menu = sample_menu();
        let hit = resolve_price(&menu, "FRIED RICE", None).unwrap();
        assert_eq!(hit.item_name, "Fried Rice");
    }
}
