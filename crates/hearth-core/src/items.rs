//! Operations on existing items: edit, toggle, delete, complete a shop,
//! and name suggestions.
//!
//! Every lookup is scoped to the tenant and to the list named in the
//! request; an item on a different list is reported as not found.
//! Edits that would leave two unchecked items with the same normalized
//! name on one list are rejected with a conflict.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ShoppingError, ShoppingResult};
use crate::models::{ShoppingItem, ShoppingList};
use crate::reconcile::{normalize_name, validate_category_field, validate_item_name, validate_unit};
use crate::store::Store;

/// Partial item update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    pub category: Option<String>,
}

impl ItemPatch {
    pub fn validate(&self) -> ShoppingResult<()> {
        if let Some(name) = self.name.as_deref() {
            validate_item_name(name)?;
        }
        if self.quantity.is_some_and(|q| q.is_sign_negative() && !q.is_zero()) {
            return Err(ShoppingError::validation("quantity must not be negative"));
        }
        validate_unit(self.unit.as_deref())?;
        validate_category_field(self.category.as_deref())?;
        Ok(())
    }
}

/// Counts reported by [`complete_shop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompleteSummary {
    /// Items checked by this call.
    pub completed: u64,
    /// Items that were already checked before the call.
    pub remaining: u64,
}

pub async fn require_item<S: Store + ?Sized>(
    store: &S,
    tenant_id: Uuid,
    list_id: Uuid,
    item_id: Uuid,
) -> ShoppingResult<ShoppingItem> {
    match store.get_item(tenant_id, item_id).await? {
        Some(item) if item.list_id == list_id => Ok(item),
        _ => Err(ShoppingError::not_found(format!("item {}", item_id))),
    }
}

async fn ensure_no_unchecked_twin<S: Store + ?Sized>(
    store: &S,
    item: &ShoppingItem,
) -> ShoppingResult<()> {
    if item.checked {
        return Ok(());
    }
    match store
        .find_unchecked_item(item.list_id, &item.name_normalized)
        .await?
    {
        Some(twin) if twin.id != item.id => Err(ShoppingError::conflict(format!(
            "'{}' is already on the list",
            twin.name
        ))),
        _ => Ok(()),
    }
}

pub async fn update_item<S: Store + ?Sized>(
    store: &S,
    tenant_id: Uuid,
    list_id: Uuid,
    item_id: Uuid,
    patch: ItemPatch,
    now: DateTime<Utc>,
) -> ShoppingResult<ShoppingItem> {
    patch.validate()?;
    let mut item = require_item(store, tenant_id, list_id, item_id).await?;

    if let Some(name) = patch.name {
        item.name_normalized = normalize_name(&name);
        item.name = name.trim().to_string();
    }
    if let Some(quantity) = patch.quantity {
        item.quantity = quantity;
    }
    if let Some(unit) = patch.unit {
        item.unit = Some(unit).filter(|u| !u.trim().is_empty());
    }
    if let Some(category) = patch.category.as_deref().map(str::trim) {
        if !category.is_empty() {
            item.category = category.to_string();
        }
    }
    item.updated_at = now;

    ensure_no_unchecked_twin(store, &item).await?;
    store.update_item(&item).await?;
    Ok(item)
}

/// Flip `checked`. Checking stamps `checked_at`; unchecking clears it.
pub async fn toggle_item<S: Store + ?Sized>(
    store: &S,
    tenant_id: Uuid,
    list_id: Uuid,
    item_id: Uuid,
    now: DateTime<Utc>,
) -> ShoppingResult<ShoppingItem> {
    let mut item = require_item(store, tenant_id, list_id, item_id).await?;
    item.set_checked(!item.checked, now);
    ensure_no_unchecked_twin(store, &item).await?;
    store.update_item(&item).await?;
    Ok(item)
}

pub async fn delete_item<S: Store + ?Sized>(
    store: &S,
    tenant_id: Uuid,
    list_id: Uuid,
    item_id: Uuid,
) -> ShoppingResult<ShoppingItem> {
    let item = require_item(store, tenant_id, list_id, item_id).await?;
    store.delete_item(item.id).await?;
    Ok(item)
}

/// Check off everything left on `list`.
pub async fn complete_shop<S: Store + ?Sized>(
    store: &S,
    list: &ShoppingList,
    now: DateTime<Utc>,
) -> ShoppingResult<CompleteSummary> {
    let completed = store.check_all_items(list.tenant_id, list.id, now).await?;
    let total = store.count_items(list.tenant_id, list.id).await?;
    Ok(CompleteSummary {
        completed,
        remaining: total.saturating_sub(completed),
    })
}

/// Every distinct item name the tenant has used, sorted.
pub async fn suggestions<S: Store + ?Sized>(
    store: &S,
    tenant_id: Uuid,
) -> ShoppingResult<Vec<String>> {
    Ok(store.item_names(tenant_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lists::create_list;
    use crate::reconcile::{add_item, AddItemRequest, ReconcilePolicy};
    use crate::store::memory::InMemoryStore;
    use chrono::Duration;

    async fn setup(names: &[&str]) -> (InMemoryStore, ShoppingList, Vec<ShoppingItem>, DateTime<Utc>) {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let list = create_list(&store, Uuid::new_v4(), "Weekly", true, now)
            .await
            .unwrap();
        let mut items = Vec::new();
        for name in names {
            let outcome = add_item(
                &store,
                &list,
                AddItemRequest::new(*name),
                &ReconcilePolicy::default(),
                now,
            )
            .await
            .unwrap();
            items.push(outcome.item().cloned().unwrap());
        }
        (store, list, items, now)
    }

    #[tokio::test]
    async fn test_blank_unit_clears_unit() {
        let (store, list, items, now) = setup(&["Flour"]).await;
        let id = items[0].id;

        let patch = ItemPatch {
            unit: Some("kg".to_string()),
            ..ItemPatch::default()
        };
        let item = update_item(&store, list.tenant_id, list.id, id, patch, now)
            .await
            .unwrap();
        assert_eq!(item.unit.as_deref(), Some("kg"));

        let patch = ItemPatch {
            unit: Some("  ".to_string()),
            category: Some(" ".to_string()),
            ..ItemPatch::default()
        };
        let item = update_item(&store, list.tenant_id, list.id, id, patch, now)
            .await
            .unwrap();
        assert_eq!(item.unit, None);
        assert_eq!(item.category, "Pantry");
        assert_eq!(store.all_items()[0].unit, None);
    }

    #[tokio::test]
    async fn test_toggle_twice_restores_unchecked() {
        let (store, list, items, now) = setup(&["Milk"]).await;
        let id = items[0].id;

        let checked = toggle_item(&store, list.tenant_id, list.id, id, now).await.unwrap();
        assert!(checked.checked);
        assert_eq!(checked.checked_at, Some(now));

        let later = now + Duration::minutes(5);
        let unchecked = toggle_item(&store, list.tenant_id, list.id, id, later)
            .await
            .unwrap();
        assert!(!unchecked.checked);
        assert!(unchecked.checked_at.is_none());

        let stored = store.get_item(list.tenant_id, id).await.unwrap().unwrap();
        assert!(!stored.checked);
        assert!(stored.checked_at.is_none());
    }

    #[tokio::test]
    async fn test_unchecking_into_a_twin_conflicts() {
        let (store, list, items, now) = setup(&["Bread"]).await;
        toggle_item(&store, list.tenant_id, list.id, items[0].id, now)
            .await
            .unwrap();
        let mut forced = AddItemRequest::new("bread");
        forced.force_add = true;
        // Forced add deletes the completed row, so put a checked twin back by hand.
        let mut old = items[0].clone();
        old.id = Uuid::new_v4();
        old.set_checked(true, now);
        add_item(&store, &list, forced, &ReconcilePolicy::default(), now)
            .await
            .unwrap();
        store.create_item(&old).await.unwrap();

        let err = toggle_item(&store, list.tenant_id, list.id, old.id, now)
            .await
            .unwrap_err();
        assert!(matches!(err, ShoppingError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_renormalizes_name() {
        let (store, list, items, now) = setup(&["Milk"]).await;
        let patch = ItemPatch {
            name: Some("  Oat Milk ".into()),
            quantity: Some(Decimal::new(2, 0)),
            unit: Some("l".into()),
            ..ItemPatch::default()
        };
        let updated = update_item(&store, list.tenant_id, list.id, items[0].id, patch, now)
            .await
            .unwrap();
        assert_eq!(updated.name, "Oat Milk");
        assert_eq!(updated.name_normalized, "oat milk");
        assert_eq!(updated.quantity, Decimal::new(2, 0));
        assert_eq!(updated.unit.as_deref(), Some("l"));
        assert_eq!(updated.category, "Dairy");
    }

    #[tokio::test]
    async fn test_rename_onto_existing_conflicts() {
        let (store, list, items, now) = setup(&["Milk", "Cream"]).await;
        let patch = ItemPatch {
            name: Some("MILK".into()),
            ..ItemPatch::default()
        };
        let err = update_item(&store, list.tenant_id, list.id, items[1].id, patch, now)
            .await
            .unwrap_err();
        assert!(matches!(err, ShoppingError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_rejects_negative_quantity() {
        let (store, list, items, now) = setup(&["Milk"]).await;
        let patch = ItemPatch {
            quantity: Some(Decimal::new(-1, 0)),
            ..ItemPatch::default()
        };
        assert!(matches!(
            update_item(&store, list.tenant_id, list.id, items[0].id, patch, now).await,
            Err(ShoppingError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_item_on_other_list_is_not_found() {
        let (store, list, items, now) = setup(&["Milk"]).await;
        let other = create_list(&store, list.tenant_id, "Party", false, now)
            .await
            .unwrap();
        assert!(matches!(
            toggle_item(&store, list.tenant_id, other.id, items[0].id, now).await,
            Err(ShoppingError::NotFound(_))
        ));
        assert!(matches!(
            delete_item(&store, Uuid::new_v4(), list.id, items[0].id).await,
            Err(ShoppingError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_item() {
        let (store, list, items, _now) = setup(&["Milk", "Bread"]).await;
        let deleted = delete_item(&store, list.tenant_id, list.id, items[0].id)
            .await
            .unwrap();
        assert_eq!(deleted.name, "Milk");
        assert_eq!(store.all_items().len(), 1);
    }

    #[tokio::test]
    async fn test_complete_shop_counts() {
        let (store, list, items, now) = setup(&["Milk", "Bread", "Eggs"]).await;
        toggle_item(&store, list.tenant_id, list.id, items[0].id, now)
            .await
            .unwrap();

        let summary = complete_shop(&store, &list, now).await.unwrap();
        assert_eq!(
            summary,
            CompleteSummary {
                completed: 2,
                remaining: 1
            }
        );
        assert!(store.all_items().iter().all(|i| i.checked && i.checked_at.is_some()));

        let again = complete_shop(&store, &list, now).await.unwrap();
        assert_eq!(again.completed, 0);
        assert_eq!(again.remaining, 3);
    }

    #[tokio::test]
    async fn test_suggestions_are_sorted_and_distinct() {
        let (store, list, _items, now) = setup(&["Milk", "Apples", "milk"]).await;
        let other = create_list(&store, list.tenant_id, "Party", false, now)
            .await
            .unwrap();
        add_item(
            &store,
            &other,
            AddItemRequest::new("Milk"),
            &ReconcilePolicy::default(),
            now,
        )
        .await
        .unwrap();
        assert_eq!(
            suggestions(&store, list.tenant_id).await.unwrap(),
            vec!["Apples", "Milk"]
        );
    }
}
