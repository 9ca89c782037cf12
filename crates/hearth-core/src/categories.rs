//! Per-tenant category management.
//!
//! A tenant starts with no category rows. The first read (or the first
//! categorization) copies the built-in table into the store; after that the
//! rows are the tenant's own and can be renamed, recolored, reordered,
//! extended with keywords, or deleted. Deleting a category moves its items
//! to [`OTHER_CATEGORY`], which itself cannot be deleted or renamed.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::categorize::{categorize, rules_from_categories};
use crate::defaults::{default_category_rows, DEFAULT_COLOR, DEFAULT_ICON};
use crate::error::{ShoppingError, ShoppingResult};
use crate::keywords;
use crate::models::{ShoppingCategory, OTHER_CATEGORY};
use crate::store::Store;

pub const MAX_CATEGORY_NAME_LEN: usize = 100;
pub const MAX_ICON_LEN: usize = 10;

/// Fields for a new category.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryDraft {
    pub name: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

impl CategoryDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: default_icon(),
            color: default_color(),
            keywords: Vec::new(),
        }
    }
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub keywords: Option<Vec<String>>,
}

/// Result of adding a keyword.
#[derive(Debug, Clone)]
pub struct KeywordAdded {
    pub category: ShoppingCategory,
    /// False if the keyword was already present.
    pub added: bool,
    /// Other categories of the tenant that carry the same keyword.
    pub collisions: Vec<String>,
}

fn validate_category_name(name: &str) -> ShoppingResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ShoppingError::validation("category name must not be empty"));
    }
    if name.chars().count() > MAX_CATEGORY_NAME_LEN {
        return Err(ShoppingError::validation(format!(
            "category name must be at most {} characters",
            MAX_CATEGORY_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

fn validate_icon(icon: &str) -> ShoppingResult<()> {
    if icon.chars().count() > MAX_ICON_LEN {
        return Err(ShoppingError::validation(format!(
            "icon must be at most {} characters",
            MAX_ICON_LEN
        )));
    }
    Ok(())
}

/// Accepts `#rrggbb` in either letter case.
pub fn validate_color(color: &str) -> ShoppingResult<()> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(ShoppingError::validation(format!(
            "color '{}' must look like #rrggbb",
            color
        )))
    }
}

/// Copy the built-in categories to `tenant_id` if it has none.
/// Returns `true` if rows were written.
pub async fn seed_default_categories<S: Store + ?Sized>(
    store: &S,
    tenant_id: Uuid,
    now: DateTime<Utc>,
) -> ShoppingResult<bool> {
    let rows = default_category_rows(tenant_id, now);
    Ok(store.seed_categories(tenant_id, &rows).await?)
}

/// The tenant's categories in rule order, seeding defaults on first use.
pub async fn ensure_categories<S: Store + ?Sized>(
    store: &S,
    tenant_id: Uuid,
    now: DateTime<Utc>,
) -> ShoppingResult<Vec<ShoppingCategory>> {
    let categories = store.get_tenant_categories(tenant_id).await?;
    if !categories.is_empty() {
        return Ok(categories);
    }
    seed_default_categories(store, tenant_id, now).await?;
    Ok(store.get_tenant_categories(tenant_id).await?)
}

/// Categorize `name` with the tenant's own rules.
pub async fn categorize_for_tenant<S: Store + ?Sized>(
    store: &S,
    tenant_id: Uuid,
    name: &str,
    now: DateTime<Utc>,
) -> ShoppingResult<String> {
    let categories = ensure_categories(store, tenant_id, now).await?;
    let rules = rules_from_categories(&categories);
    Ok(categorize(name, &rules))
}

async fn require_category<S: Store + ?Sized>(
    store: &S,
    tenant_id: Uuid,
    category_id: Uuid,
) -> ShoppingResult<ShoppingCategory> {
    store
        .get_category(tenant_id, category_id)
        .await?
        .ok_or_else(|| ShoppingError::not_found(format!("category {}", category_id)))
}

pub async fn create_category<S: Store + ?Sized>(
    store: &S,
    tenant_id: Uuid,
    draft: CategoryDraft,
    now: DateTime<Utc>,
) -> ShoppingResult<ShoppingCategory> {
    let name = validate_category_name(&draft.name)?;
    validate_icon(&draft.icon)?;
    validate_color(&draft.color)?;

    ensure_categories(store, tenant_id, now).await?;
    if store.get_category_by_name(tenant_id, &name).await?.is_some() {
        return Err(ShoppingError::conflict(format!(
            "category '{}' already exists",
            name
        )));
    }

    let sort_order = store
        .max_category_sort_order(tenant_id)
        .await?
        .map_or(0, |max| max + 1);

    let category = ShoppingCategory {
        id: Uuid::new_v4(),
        tenant_id,
        name,
        icon: draft.icon,
        color: draft.color,
        keywords: keywords::normalize_keywords(&draft.keywords),
        sort_order,
        is_default: false,
        created_at: now,
        updated_at: now,
    };
    store.insert_category(&category).await?;
    Ok(category)
}

/// Apply `patch`. Items keep the category string they already have when a
/// category is renamed.
pub async fn update_category<S: Store + ?Sized>(
    store: &S,
    tenant_id: Uuid,
    category_id: Uuid,
    patch: CategoryPatch,
    now: DateTime<Utc>,
) -> ShoppingResult<ShoppingCategory> {
    let mut category = require_category(store, tenant_id, category_id).await?;

    if let Some(name) = patch.name.as_deref() {
        let name = validate_category_name(name)?;
        if name != category.name {
            if category.name == OTHER_CATEGORY {
                return Err(ShoppingError::conflict(format!(
                    "the '{}' category cannot be renamed",
                    OTHER_CATEGORY
                )));
            }
            if store.get_category_by_name(tenant_id, &name).await?.is_some() {
                return Err(ShoppingError::conflict(format!(
                    "category '{}' already exists",
                    name
                )));
            }
            category.name = name;
        }
    }
    if let Some(icon) = patch.icon {
        validate_icon(&icon)?;
        category.icon = icon;
    }
    if let Some(color) = patch.color {
        validate_color(&color)?;
        category.color = color;
    }
    if let Some(kws) = patch.keywords {
        category.keywords = keywords::normalize_keywords(&kws);
    }

    category.updated_at = now;
    store.update_category(&category).await?;
    Ok(category)
}

/// Delete a category and move its items to [`OTHER_CATEGORY`].
/// Returns the deleted row and how many items were moved.
pub async fn delete_category<S: Store + ?Sized>(
    store: &S,
    tenant_id: Uuid,
    category_id: Uuid,
) -> ShoppingResult<(ShoppingCategory, u64)> {
    let category = require_category(store, tenant_id, category_id).await?;
    if category.name == OTHER_CATEGORY {
        return Err(ShoppingError::conflict(format!(
            "the '{}' category cannot be deleted",
            OTHER_CATEGORY
        )));
    }
    let moved = store
        .delete_category(tenant_id, &category, OTHER_CATEGORY)
        .await?;
    Ok((category, moved))
}

/// Set each listed category's `sort_order` to its position in `ids`.
/// Ids that are not the tenant's are skipped. Returns the full, reordered
/// category list.
pub async fn reorder_categories<S: Store + ?Sized>(
    store: &S,
    tenant_id: Uuid,
    ids: &[Uuid],
    now: DateTime<Utc>,
) -> ShoppingResult<Vec<ShoppingCategory>> {
    for (position, id) in ids.iter().enumerate() {
        store
            .set_category_sort_order(tenant_id, *id, position as i64, now)
            .await?;
    }
    Ok(store.get_tenant_categories(tenant_id).await?)
}

pub async fn add_category_keyword<S: Store + ?Sized>(
    store: &S,
    tenant_id: Uuid,
    category_id: Uuid,
    keyword: &str,
    now: DateTime<Utc>,
) -> ShoppingResult<KeywordAdded> {
    let mut category = require_category(store, tenant_id, category_id).await?;
    let added = keywords::add_keyword(&mut category.keywords, keyword)?;
    if added {
        category.updated_at = now;
        store.update_category(&category).await?;
    }

    let all = store.get_tenant_categories(tenant_id).await?;
    let collisions = keywords::collisions(&all, &category.name, keyword)
        .into_iter()
        .map(str::to_string)
        .collect();

    Ok(KeywordAdded {
        category,
        added,
        collisions,
    })
}

pub async fn remove_category_keyword<S: Store + ?Sized>(
    store: &S,
    tenant_id: Uuid,
    category_id: Uuid,
    keyword: &str,
    now: DateTime<Utc>,
) -> ShoppingResult<ShoppingCategory> {
    let mut category = require_category(store, tenant_id, category_id).await?;
    if keywords::remove_keyword(&mut category.keywords, keyword) {
        category.updated_at = now;
        store.update_category(&category).await?;
    }
    Ok(category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::DEFAULT_CATEGORIES;
    use crate::lists::get_or_create_default_list;
    use crate::reconcile::{add_item, AddItemRequest, ReconcilePolicy};
    use crate::store::memory::InMemoryStore;

    async fn seeded() -> (InMemoryStore, Uuid, DateTime<Utc>) {
        let store = InMemoryStore::new();
        let tenant = Uuid::new_v4();
        let now = Utc::now();
        ensure_categories(&store, tenant, now).await.unwrap();
        (store, tenant, now)
    }

    async fn by_name(store: &InMemoryStore, tenant: Uuid, name: &str) -> ShoppingCategory {
        store
            .get_category_by_name(tenant, name)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = InMemoryStore::new();
        let tenant = Uuid::new_v4();
        let now = Utc::now();

        assert!(seed_default_categories(&store, tenant, now).await.unwrap());
        assert!(!seed_default_categories(&store, tenant, now).await.unwrap());

        let categories = store.get_tenant_categories(tenant).await.unwrap();
        assert_eq!(categories.len(), DEFAULT_CATEGORIES.len());
        assert_eq!(categories.len(), 13);
        assert_eq!(categories[0].name, "Produce");
        assert_eq!(categories[12].name, "Other");
    }

    #[tokio::test]
    async fn test_seeding_is_per_tenant() {
        let (store, tenant, now) = seeded().await;
        let other = Uuid::new_v4();
        assert!(store.get_tenant_categories(other).await.unwrap().is_empty());
        ensure_categories(&store, other, now).await.unwrap();
        assert_eq!(store.get_tenant_categories(tenant).await.unwrap().len(), 13);
        assert_eq!(store.get_tenant_categories(other).await.unwrap().len(), 13);
    }

    #[tokio::test]
    async fn test_categorize_for_tenant_seeds() {
        let store = InMemoryStore::new();
        let tenant = Uuid::new_v4();
        let category = categorize_for_tenant(&store, tenant, "Tinned Tomatoes", Utc::now())
            .await
            .unwrap();
        assert_eq!(category, "Pantry");
        assert_eq!(store.get_tenant_categories(tenant).await.unwrap().len(), 13);
    }

    #[tokio::test]
    async fn test_create_appends_and_normalizes() {
        let (store, tenant, now) = seeded().await;
        let mut draft = CategoryDraft::new("  Snacks ");
        draft.keywords = vec!["Crisps".into(), "crisps".into(), " ".into(), "Nuts".into()];
        let created = create_category(&store, tenant, draft, now).await.unwrap();

        assert_eq!(created.name, "Snacks");
        assert_eq!(created.sort_order, 13);
        assert!(!created.is_default);
        assert_eq!(created.keywords, vec!["crisps", "nuts"]);
        assert_eq!(created.icon, DEFAULT_ICON);
    }

    #[tokio::test]
    async fn test_create_duplicate_name_conflicts() {
        let (store, tenant, now) = seeded().await;
        let err = create_category(&store, tenant, CategoryDraft::new("Dairy"), now)
            .await
            .unwrap_err();
        assert!(matches!(err, ShoppingError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let (store, tenant, now) = seeded().await;
        let mut bad_color = CategoryDraft::new("Snacks");
        bad_color.color = "red".into();
        for draft in [CategoryDraft::new(" "), CategoryDraft::new("n".repeat(101)), bad_color] {
            let err = create_category(&store, tenant, draft, now).await.unwrap_err();
            assert!(matches!(err, ShoppingError::Validation(_)));
        }
    }

    #[test]
    fn test_validate_color() {
        assert!(validate_color("#A1b2C3").is_ok());
        assert!(validate_color("#12345").is_err());
        assert!(validate_color("123456#").is_err());
        assert!(validate_color("#12345g").is_err());
    }

    #[tokio::test]
    async fn test_update_renames_and_recolors() {
        let (store, tenant, now) = seeded().await;
        let dairy = by_name(&store, tenant, "Dairy").await;
        let patch = CategoryPatch {
            name: Some("Milk & Cheese".into()),
            color: Some("#ffffff".into()),
            keywords: Some(vec!["Milk".into(), "milk".into()]),
            ..CategoryPatch::default()
        };
        let updated = update_category(&store, tenant, dairy.id, patch, now)
            .await
            .unwrap();
        assert_eq!(updated.name, "Milk & Cheese");
        assert_eq!(updated.color, "#ffffff");
        assert_eq!(updated.keywords, vec!["milk"]);
        assert_eq!(updated.icon, dairy.icon);
        assert!(store
            .get_category_by_name(tenant, "Dairy")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_rename_conflicts() {
        let (store, tenant, now) = seeded().await;
        let dairy = by_name(&store, tenant, "Dairy").await;
        let patch = CategoryPatch {
            name: Some("Meat".into()),
            ..CategoryPatch::default()
        };
        let err = update_category(&store, tenant, dairy.id, patch, now)
            .await
            .unwrap_err();
        assert!(matches!(err, ShoppingError::Conflict(_)));

        let same = CategoryPatch {
            name: Some("Dairy".into()),
            ..CategoryPatch::default()
        };
        assert!(update_category(&store, tenant, dairy.id, same, now).await.is_ok());
    }

    #[tokio::test]
    async fn test_other_cannot_be_renamed_or_deleted() {
        let (store, tenant, now) = seeded().await;
        let other = by_name(&store, tenant, OTHER_CATEGORY).await;
        let patch = CategoryPatch {
            name: Some("Misc".into()),
            ..CategoryPatch::default()
        };
        assert!(matches!(
            update_category(&store, tenant, other.id, patch, now).await,
            Err(ShoppingError::Conflict(_))
        ));
        assert!(matches!(
            delete_category(&store, tenant, other.id).await,
            Err(ShoppingError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_moves_items_to_other() {
        let (store, tenant, now) = seeded().await;
        let list = get_or_create_default_list(&store, tenant, "Grocery List", now)
            .await
            .unwrap();
        let policy = ReconcilePolicy::default();
        for name in ["Milk", "Cheese", "Bread"] {
            add_item(&store, &list, AddItemRequest::new(name), &policy, now)
                .await
                .unwrap();
        }

        let dairy = by_name(&store, tenant, "Dairy").await;
        let (deleted, moved) = delete_category(&store, tenant, dairy.id).await.unwrap();
        assert_eq!(deleted.name, "Dairy");
        assert_eq!(moved, 2);

        assert!(store.get_category(tenant, dairy.id).await.unwrap().is_none());
        let mut categories: Vec<String> =
            store.all_items().into_iter().map(|i| i.category).collect();
        categories.sort();
        assert_eq!(categories, vec!["Bakery", "Other", "Other"]);
    }

    #[tokio::test]
    async fn test_other_tenants_category_is_not_found() {
        let (store, tenant, now) = seeded().await;
        let dairy = by_name(&store, tenant, "Dairy").await;
        let stranger = Uuid::new_v4();
        assert!(matches!(
            delete_category(&store, stranger, dairy.id).await,
            Err(ShoppingError::NotFound(_))
        ));
        assert!(matches!(
            add_category_keyword(&store, stranger, dairy.id, "quark", now).await,
            Err(ShoppingError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reorder_skips_foreign_ids() {
        let (store, tenant, now) = seeded().await;
        let other = by_name(&store, tenant, "Other").await;
        let produce = by_name(&store, tenant, "Produce").await;

        let reordered = reorder_categories(&store, tenant, &[other.id, Uuid::new_v4(), produce.id], now)
            .await
            .unwrap();
        assert_eq!(reordered[0].name, "Other");
        assert_eq!(reordered[0].sort_order, 0);
        let produce = reordered.iter().find(|c| c.name == "Produce").unwrap();
        assert_eq!(produce.sort_order, 2);
    }

    #[tokio::test]
    async fn test_reorder_changes_tie_break() {
        let (store, tenant, now) = seeded().await;
        let pantry = by_name(&store, tenant, "Pantry").await;
        assert_eq!(
            categorize_for_tenant(&store, tenant, "Pepper", now).await.unwrap(),
            "Produce"
        );
        reorder_categories(&store, tenant, &[pantry.id], now)
            .await
            .unwrap();
        assert_eq!(
            categorize_for_tenant(&store, tenant, "Pepper", now).await.unwrap(),
            "Pantry"
        );
    }

    #[tokio::test]
    async fn test_keywords_add_and_remove() {
        let (store, tenant, now) = seeded().await;
        let dairy = by_name(&store, tenant, "Dairy").await;

        let result = add_category_keyword(&store, tenant, dairy.id, " Quark ", now)
            .await
            .unwrap();
        assert!(result.added);
        assert!(result.collisions.is_empty());
        assert_eq!(result.category.keywords.last().unwrap(), "quark");

        let again = add_category_keyword(&store, tenant, dairy.id, "QUARK", now)
            .await
            .unwrap();
        assert!(!again.added);
        assert_eq!(
            again.category.keywords.iter().filter(|k| *k == "quark").count(),
            1
        );

        let removed = remove_category_keyword(&store, tenant, dairy.id, "Quark", now)
            .await
            .unwrap();
        assert!(!removed.keywords.contains(&"quark".to_string()));
        let stored = by_name(&store, tenant, "Dairy").await;
        assert_eq!(stored.keywords, removed.keywords);
    }

    #[tokio::test]
    async fn test_keyword_collision_is_reported_not_rejected() {
        let (store, tenant, now) = seeded().await;
        let pantry = by_name(&store, tenant, "Pantry").await;
        let result = add_category_keyword(&store, tenant, pantry.id, "milk", now)
            .await
            .unwrap();
        assert!(result.added);
        assert_eq!(result.collisions, vec!["Dairy"]);
        assert_eq!(
            categorize_for_tenant(&store, tenant, "Milk", now).await.unwrap(),
            "Dairy"
        );
    }

    #[tokio::test]
    async fn test_empty_keyword_rejected() {
        let (store, tenant, now) = seeded().await;
        let dairy = by_name(&store, tenant, "Dairy").await;
        assert!(matches!(
            add_category_keyword(&store, tenant, dairy.id, "  ", now).await,
            Err(ShoppingError::Validation(_))
        ));
    }
}
