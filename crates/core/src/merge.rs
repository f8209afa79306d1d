//! The two name-keyed merge rules shared by the store and the widget.
//!
//! `aggregate_items` is the add path: quantities of same-named items are
//! summed. `overwrite_items` is the reconciliation path: the incoming item's
//! fields win outright, quantity included, because aggregation already
//! happened upstream. Keep the two apart; collapsing them double-counts.

use std::collections::HashSet;

use crate::domain::cart::CartItem;
use crate::errors::DomainError;

/// Sums incoming quantities into same-named entries and appends unknown
/// names, preserving order of first appearance. Incoming `extra` fields
/// take precedence over stored ones.
pub fn aggregate_items(cart_items: &mut Vec<CartItem>, incoming: Vec<CartItem>) {
    for item in incoming {
        if let Some(existing) = cart_items.iter_mut().find(|existing| existing.name == item.name) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
            existing.extra.extend(item.extra);
        } else {
            cart_items.push(item);
        }
    }

    drop_empty_lines(cart_items);
}

/// Field-level overwrite keyed by name: matching entries take the incoming
/// quantity and metadata, unknown names are appended, and base entries the
/// delta does not mention are left alone.
pub fn overwrite_items(base: &mut Vec<CartItem>, incoming: Vec<CartItem>) {
    for item in incoming {
        if let Some(existing) = base.iter_mut().find(|existing| existing.name == item.name) {
            existing.quantity = item.quantity;
            existing.extra.extend(item.extra);
        } else {
            base.push(item);
        }
    }

    drop_empty_lines(base);
}

/// Quantity zero means absent; such entries never survive a mutation.
pub fn drop_empty_lines(items: &mut Vec<CartItem>) {
    items.retain(|item| item.quantity > 0);
}

pub fn validate_items(items: &[CartItem]) -> Result<(), DomainError> {
    if items.iter().any(|item| item.name.trim().is_empty()) {
        return Err(DomainError::EmptyItemName);
    }
    Ok(())
}

/// A replacement list is a full snapshot, so names must already be unique.
pub fn validate_snapshot(items: &[CartItem]) -> Result<(), DomainError> {
    validate_items(items)?;

    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.name.as_str()) {
            return Err(DomainError::DuplicateItemName(item.name.clone()));
        }
    }
    Ok(())
}

/// Produces a human-readable one-line summary, e.g. `2x Eggs, 1x Milk`.
pub fn format_item_summary(items: &[CartItem]) -> String {
    items
        .iter()
        .map(|item| format!("{}x {}", item.quantity, item.name))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        aggregate_items, format_item_summary, overwrite_items, validate_items, validate_snapshot,
    };
    use crate::domain::cart::CartItem;
    use crate::errors::DomainError;

    fn names_and_quantities(items: &[CartItem]) -> Vec<(&str, u32)> {
        items.iter().map(|item| (item.name.as_str(), item.quantity)).collect()
    }

    #[test]
    fn adding_same_item_twice_aggregates_into_one_entry() {
        let mut cart = Vec::new();
        aggregate_items(&mut cart, vec![CartItem::new("Eggs", 2)]);
        aggregate_items(&mut cart, vec![CartItem::new("Eggs", 2)]);

        assert_eq!(names_and_quantities(&cart), vec![("Eggs", 4)]);
    }

    #[test]
    fn aggregation_preserves_order_of_first_appearance() {
        let mut cart = vec![CartItem::new("Eggs", 2), CartItem::new("Milk", 1)];
        aggregate_items(&mut cart, vec![CartItem::new("Bread", 1), CartItem::new("Eggs", 1)]);

        assert_eq!(names_and_quantities(&cart), vec![("Eggs", 3), ("Milk", 1), ("Bread", 1)]);
    }

    #[test]
    fn aggregation_merges_metadata_with_incoming_precedence() {
        let mut cart =
            vec![CartItem::new("Eggs", 1).with_extra("price", json!(2)).with_extra("aisle", json!(4))];
        aggregate_items(&mut cart, vec![CartItem::new("Eggs", 1).with_extra("price", json!(3))]);

        assert_eq!(cart[0].quantity, 2);
        assert_eq!(cart[0].extra.get("price"), Some(&json!(3)));
        assert_eq!(cart[0].extra.get("aisle"), Some(&json!(4)));
    }

    #[test]
    fn zero_quantity_additions_are_not_persisted() {
        let mut cart = vec![CartItem::new("Eggs", 1)];
        aggregate_items(&mut cart, vec![CartItem::new("Milk", 0)]);

        assert_eq!(names_and_quantities(&cart), vec![("Eggs", 1)]);
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut cart = vec![CartItem::new("eggs", 1)];
        aggregate_items(&mut cart, vec![CartItem::new("Eggs", 1)]);

        assert_eq!(names_and_quantities(&cart), vec![("eggs", 1), ("Eggs", 1)]);
    }

    #[test]
    fn overwrite_takes_incoming_quantity_instead_of_summing() {
        let mut base = vec![CartItem::new("Eggs", 2), CartItem::new("Milk", 1)];
        overwrite_items(&mut base, vec![CartItem::new("Eggs", 5), CartItem::new("Tomatoes", 3)]);

        assert_eq!(names_and_quantities(&base), vec![("Eggs", 5), ("Milk", 1), ("Tomatoes", 3)]);
    }

    #[test]
    fn overwrite_to_zero_removes_the_entry() {
        let mut base = vec![CartItem::new("Eggs", 2), CartItem::new("Milk", 1)];
        overwrite_items(&mut base, vec![CartItem::new("Eggs", 0)]);

        assert_eq!(names_and_quantities(&base), vec![("Milk", 1)]);
    }

    #[test]
    fn validation_rejects_blank_names() {
        let result = validate_items(&[CartItem::new("  ", 1)]);
        assert_eq!(result, Err(DomainError::EmptyItemName));
    }

    #[test]
    fn snapshot_validation_rejects_duplicate_names() {
        let result = validate_snapshot(&[CartItem::new("Eggs", 1), CartItem::new("Eggs", 2)]);
        assert_eq!(result, Err(DomainError::DuplicateItemName("Eggs".to_owned())));
    }

    #[test]
    fn summary_lists_quantity_and_name() {
        let summary = format_item_summary(&[CartItem::new("Eggs", 2), CartItem::new("Milk", 1)]);
        assert_eq!(summary, "2x Eggs, 1x Milk");
        assert_eq!(format_item_summary(&[]), "");
    }
}
