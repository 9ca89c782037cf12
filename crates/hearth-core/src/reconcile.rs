//! Duplicate reconciliation for "add item".
//!
//! Adding a name to a list goes down exactly one of three paths:
//!
//! 1. **Merge** into the unchecked item with the same normalized name. The
//!    quantities are summed and the item's source becomes `multiple`.
//! 2. **Prompt** when the same name was checked off within the recency
//!    window and the caller did not force the add. Nothing is written.
//! 3. **Create** a new unchecked item. When forced past a recent duplicate,
//!    the completed row is deleted first so the list keeps one row per name.
//!
//! The caller resolves the list for the tenant before calling [`add_item`]
//! and serializes concurrent adds to the same list.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::categories::categorize_for_tenant;
use crate::error::{ShoppingError, ShoppingResult};
use crate::models::{ItemSource, Quantity, ShoppingItem, ShoppingList};
use crate::store::Store;

pub const DEFAULT_RECENCY_WINDOW_HOURS: i64 = 24;

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_UNIT_LEN: usize = 50;
pub const MAX_CATEGORY_LEN: usize = 100;

/// Tunables for the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilePolicy {
    /// How long a checked item still counts as "recently completed".
    pub recency_window: Duration,
}

impl ReconcilePolicy {
    pub fn from_hours(hours: i64) -> Self {
        Self {
            recency_window: Duration::hours(hours),
        }
    }
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self::from_hours(DEFAULT_RECENCY_WINDOW_HOURS)
    }
}

/// Matching key for item names: lowercase, surrounding whitespace removed.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase().trim().to_string()
}

/// Input to [`add_item`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddItemRequest {
    pub name: String,
    #[serde(default)]
    pub quantity: Quantity,
    #[serde(default)]
    pub unit: Option<String>,
    /// Explicit category. Blank is treated as absent.
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub source: Option<ItemSource>,
    #[serde(default)]
    pub recipe_id: Option<Uuid>,
    /// Create even if the same item was recently completed.
    #[serde(default)]
    pub force_add: bool,
    /// Filled in from the authenticated caller, never from the body.
    #[serde(skip)]
    pub added_by: Option<Uuid>,
}

impl AddItemRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> ShoppingResult<()> {
        validate_item_name(&self.name)?;
        if self.quantity.is_negative() {
            return Err(ShoppingError::validation("quantity must not be negative"));
        }
        validate_unit(self.unit.as_deref())?;
        validate_category_field(self.category.as_deref())?;
        Ok(())
    }
}

pub(crate) fn validate_item_name(name: &str) -> ShoppingResult<()> {
    if name.trim().is_empty() {
        return Err(ShoppingError::validation("item name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ShoppingError::validation(format!(
            "item name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(())
}

pub(crate) fn validate_unit(unit: Option<&str>) -> ShoppingResult<()> {
    match unit {
        Some(u) if u.chars().count() > MAX_UNIT_LEN => Err(ShoppingError::validation(format!(
            "unit must be at most {} characters",
            MAX_UNIT_LEN
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn validate_category_field(category: Option<&str>) -> ShoppingResult<()> {
    match category {
        Some(c) if c.chars().count() > MAX_CATEGORY_LEN => {
            Err(ShoppingError::validation(format!(
                "category must be at most {} characters",
                MAX_CATEGORY_LEN
            )))
        }
        _ => Ok(()),
    }
}

/// What [`add_item`] did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AddOutcome {
    /// Folded into an existing unchecked item.
    Merged {
        item: ShoppingItem,
        previous_quantity: Decimal,
    },
    Created {
        item: ShoppingItem,
    },
    /// The name was completed recently; ask before adding it again.
    DuplicatePrompt {
        existing: ShoppingItem,
        hours_since_checked: f64,
    },
}

impl AddOutcome {
    /// The item now on the list, if one was written.
    pub fn item(&self) -> Option<&ShoppingItem> {
        match self {
            AddOutcome::Merged { item, .. } | AddOutcome::Created { item } => Some(item),
            AddOutcome::DuplicatePrompt { .. } => None,
        }
    }
}

/// Add an item to `list`, merging, prompting, or creating as described in
/// the module docs.
pub async fn add_item<S: Store + ?Sized>(
    store: &S,
    list: &ShoppingList,
    req: AddItemRequest,
    policy: &ReconcilePolicy,
    now: DateTime<Utc>,
) -> ShoppingResult<AddOutcome> {
    req.validate()?;

    let name_normalized = normalize_name(&req.name);
    let quantity = req.quantity.resolve();

    if let Some(mut existing) = store.find_unchecked_item(list.id, &name_normalized).await? {
        let previous_quantity = existing.quantity;
        existing.quantity = previous_quantity
            .checked_add(quantity)
            .ok_or_else(|| ShoppingError::validation("quantity too large"))?;
        existing.source = ItemSource::Multiple;
        existing.updated_at = now;
        store
            .update_item_quantity(existing.id, existing.quantity, existing.source, now)
            .await?;
        return Ok(AddOutcome::Merged {
            item: existing,
            previous_quantity,
        });
    }

    let since = now - policy.recency_window;
    if let Some(recent) = store
        .find_recently_checked_item(list.id, &name_normalized, since)
        .await?
    {
        if !req.force_add {
            let hours_since_checked = recent.hours_since_checked(now).unwrap_or(0.0);
            return Ok(AddOutcome::DuplicatePrompt {
                existing: recent,
                hours_since_checked,
            });
        }
        store.delete_item(recent.id).await?;
    }

    let display_name = req.name.trim().to_string();
    let category = match req.category.as_deref().map(str::trim) {
        Some(explicit) if !explicit.is_empty() => explicit.to_string(),
        _ => categorize_for_tenant(store, list.tenant_id, &display_name, now).await?,
    };

    let item = ShoppingItem {
        id: Uuid::new_v4(),
        list_id: list.id,
        tenant_id: list.tenant_id,
        name: display_name,
        name_normalized,
        quantity,
        unit: req.unit.filter(|u| !u.trim().is_empty()),
        category,
        checked: false,
        checked_at: None,
        source: req.source.unwrap_or_default(),
        recipe_id: req.recipe_id,
        added_by: req.added_by,
        created_at: now,
        updated_at: now,
    };
    store.create_item(&item).await?;
    Ok(AddOutcome::Created { item })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;

    fn list(tenant_id: Uuid, now: DateTime<Utc>) -> ShoppingList {
        ShoppingList {
            id: Uuid::new_v4(),
            tenant_id,
            name: "Grocery List".to_string(),
            is_default: true,
            created_at: now,
            updated_at: now,
        }
    }

    async fn setup() -> (InMemoryStore, ShoppingList, DateTime<Utc>) {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let list = list(Uuid::new_v4(), now);
        store.insert_list(&list).await.unwrap();
        (store, list, now)
    }

    async fn add(
        store: &InMemoryStore,
        list: &ShoppingList,
        req: AddItemRequest,
        now: DateTime<Utc>,
    ) -> AddOutcome {
        add_item(store, list, req, &ReconcilePolicy::default(), now)
            .await
            .unwrap()
    }

    /// Add `name`, then check it off `hours_ago` hours before `now`.
    async fn completed(
        store: &InMemoryStore,
        list: &ShoppingList,
        name: &str,
        hours_ago: i64,
        now: DateTime<Utc>,
    ) -> ShoppingItem {
        let then = now - Duration::hours(hours_ago);
        let mut item = add(store, list, AddItemRequest::new(name), then)
            .await
            .item()
            .cloned()
            .unwrap();
        item.set_checked(true, then);
        store.update_item(&item).await.unwrap();
        item
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for name in ["  Milk ", "MILK", "semi-Skimmed Milk\t", ""] {
            let once = normalize_name(name);
            assert_eq!(normalize_name(&once), once);
        }
        assert_eq!(normalize_name("  Milk "), "milk");
    }

    #[tokio::test]
    async fn test_merge_sums_quantities() {
        let (store, list, now) = setup().await;

        let first = add(&store, &list, AddItemRequest::new("Milk"), now).await;
        assert!(matches!(first, AddOutcome::Created { .. }));

        let mut again = AddItemRequest::new("milk ");
        again.quantity = Quantity::Amount(Decimal::new(2, 0));
        match add(&store, &list, again, now).await {
            AddOutcome::Merged {
                item,
                previous_quantity,
            } => {
                assert_eq!(previous_quantity, Decimal::ONE);
                assert_eq!(item.quantity, Decimal::new(3, 0));
                assert_eq!(item.source, ItemSource::Multiple);
                assert_eq!(item.name, "Milk");
            }
            other => panic!("expected merge, got {:?}", other),
        }

        let items = store.all_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, Decimal::new(3, 0));
        assert_eq!(items[0].source, ItemSource::Multiple);
    }

    #[tokio::test]
    async fn test_merge_overflow_is_rejected() {
        let (store, list, now) = setup().await;

        let mut huge = AddItemRequest::new("Milk");
        huge.quantity = Quantity::Amount(Decimal::MAX);
        add(&store, &list, huge.clone(), now).await;

        let err = add_item(&store, &list, huge, &ReconcilePolicy::default(), now)
            .await
            .unwrap_err();
        assert!(matches!(err, ShoppingError::Validation(_)));

        let items = store.all_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, Decimal::MAX);
        assert_eq!(items[0].source, ItemSource::Manual);
    }

    #[tokio::test]
    async fn test_missing_quantity_counts_as_one() {
        let (store, list, now) = setup().await;
        add(&store, &list, AddItemRequest::new("Eggs"), now).await;
        let merged = add(&store, &list, AddItemRequest::new("eggs"), now).await;
        assert_eq!(merged.item().unwrap().quantity, Decimal::new(2, 0));
    }

    #[tokio::test]
    async fn test_zero_quantity_is_kept() {
        let (store, list, now) = setup().await;
        let mut req = AddItemRequest::new("Salt");
        req.quantity = Quantity::Amount(Decimal::ZERO);
        let created = add(&store, &list, req, now).await;
        assert_eq!(created.item().unwrap().quantity, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_recent_duplicate_prompts_without_writing() {
        let (store, list, now) = setup().await;
        let bread = completed(&store, &list, "Bread", 2, now).await;

        match add(&store, &list, AddItemRequest::new("bread"), now).await {
            AddOutcome::DuplicatePrompt {
                existing,
                hours_since_checked,
            } => {
                assert_eq!(existing.id, bread.id);
                assert_eq!(hours_since_checked, 2.0);
            }
            other => panic!("expected prompt, got {:?}", other),
        }

        let items = store.all_items();
        assert_eq!(items.len(), 1);
        assert!(items[0].checked);
    }

    #[tokio::test]
    async fn test_force_add_replaces_recent_duplicate() {
        let (store, list, now) = setup().await;
        let bread = completed(&store, &list, "Bread", 2, now).await;

        let mut req = AddItemRequest::new("Bread");
        req.force_add = true;
        let created = add(&store, &list, req, now).await;
        assert!(matches!(created, AddOutcome::Created { .. }));

        let items = store.all_items();
        assert_eq!(items.len(), 1);
        assert_ne!(items[0].id, bread.id);
        assert!(!items[0].checked);
        assert!(items[0].checked_at.is_none());
    }

    #[tokio::test]
    async fn test_old_completion_does_not_prompt() {
        let (store, list, now) = setup().await;
        completed(&store, &list, "Bread", 30, now).await;

        let created = add(&store, &list, AddItemRequest::new("Bread"), now).await;
        assert!(matches!(created, AddOutcome::Created { .. }));
        assert_eq!(store.all_items().len(), 2);
    }

    #[tokio::test]
    async fn test_window_edge_is_exclusive() {
        let (store, list, now) = setup().await;
        completed(&store, &list, "Bread", 24, now).await;
        let created = add(&store, &list, AddItemRequest::new("Bread"), now).await;
        assert!(matches!(created, AddOutcome::Created { .. }));
    }

    #[tokio::test]
    async fn test_custom_window() {
        let (store, list, now) = setup().await;
        completed(&store, &list, "Bread", 30, now).await;
        let outcome = add_item(
            &store,
            &list,
            AddItemRequest::new("Bread"),
            &ReconcilePolicy::from_hours(48),
            now,
        )
        .await
        .unwrap();
        assert!(matches!(outcome, AddOutcome::DuplicatePrompt { .. }));
    }

    #[tokio::test]
    async fn test_unchecked_merge_wins_over_prompt() {
        let (store, list, now) = setup().await;
        let done = completed(&store, &list, "Bread", 1, now).await;
        let mut open = done.clone();
        open.id = Uuid::new_v4();
        open.set_checked(false, now);
        store.create_item(&open).await.unwrap();

        let merged = add(&store, &list, AddItemRequest::new("bread"), now).await;
        assert_eq!(merged.item().unwrap().id, open.id);
        assert_eq!(store.all_items().len(), 2);
    }

    #[tokio::test]
    async fn test_created_defaults() {
        let (store, list, now) = setup().await;
        let mut req = AddItemRequest::new("  Tinned Tomatoes ");
        req.added_by = Some(Uuid::new_v4());
        let item = add(&store, &list, req.clone(), now).await.item().cloned().unwrap();
        assert_eq!(item.name, "Tinned Tomatoes");
        assert_eq!(item.name_normalized, "tinned tomatoes");
        assert_eq!(item.category, "Pantry");
        assert_eq!(item.source, ItemSource::Manual);
        assert_eq!(item.quantity, Decimal::ONE);
        assert_eq!(item.added_by, req.added_by);
        assert!(!item.checked);
    }

    #[tokio::test]
    async fn test_explicit_category_wins_and_blank_is_ignored() {
        let (store, list, now) = setup().await;

        let mut req = AddItemRequest::new("Milk");
        req.category = Some("Treats".to_string());
        let item = add(&store, &list, req, now).await.item().cloned().unwrap();
        assert_eq!(item.category, "Treats");

        let mut req = AddItemRequest::new("Cheese");
        req.category = Some("   ".to_string());
        let item = add(&store, &list, req, now).await.item().cloned().unwrap();
        assert_eq!(item.category, "Dairy");
    }

    #[tokio::test]
    async fn test_tenant_rules_are_used() {
        let (store, list, now) = setup().await;
        crate::categories::ensure_categories(&store, list.tenant_id, now)
            .await
            .unwrap();
        let mut dairy = store
            .get_category_by_name(list.tenant_id, "Dairy")
            .await
            .unwrap()
            .unwrap();
        dairy.keywords.push("quark".to_string());
        store.update_category(&dairy).await.unwrap();

        let item = add(&store, &list, AddItemRequest::new("Quark"), now)
            .await
            .item()
            .cloned()
            .unwrap();
        assert_eq!(item.category, "Dairy");
    }

    #[tokio::test]
    async fn test_validation_rejects_before_writing() {
        let (store, list, now) = setup().await;
        let policy = ReconcilePolicy::default();

        let cases = [
            AddItemRequest::new("   "),
            AddItemRequest::new("x".repeat(201)),
            AddItemRequest {
                quantity: Quantity::Amount(Decimal::new(-1, 0)),
                ..AddItemRequest::new("Milk")
            },
            AddItemRequest {
                unit: Some("u".repeat(51)),
                ..AddItemRequest::new("Milk")
            },
            AddItemRequest {
                category: Some("c".repeat(101)),
                ..AddItemRequest::new("Milk")
            },
        ];
        for req in cases {
            let err = add_item(&store, &list, req, &policy, now).await.unwrap_err();
            assert!(matches!(err, ShoppingError::Validation(_)), "{:?}", err);
        }
        assert!(store.all_items().is_empty());
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let req: AddItemRequest = serde_json::from_str(r#"{"name": "Milk"}"#).unwrap();
        assert_eq!(req.quantity, Quantity::Unspecified);
        assert!(!req.force_add);
        assert!(req.source.is_none());

        let req: AddItemRequest = serde_json::from_str(
            r#"{"name": "Milk", "quantity": "2", "source": "alexa", "force_add": true}"#,
        )
        .unwrap();
        assert_eq!(req.quantity, Quantity::Amount(Decimal::new(2, 0)));
        assert_eq!(req.source, Some(ItemSource::Alexa));
        assert!(req.force_add);
    }
}
