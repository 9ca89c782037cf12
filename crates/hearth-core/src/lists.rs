//! Shopping list lookup, creation, and the list view.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ShoppingError, ShoppingResult};
use crate::models::{ListSummary, ShoppingItem, ShoppingList};
use crate::store::Store;

pub const DEFAULT_LIST_NAME: &str = "Grocery List";
pub const MAX_LIST_NAME_LEN: usize = 100;
pub const DEFAULT_HIDE_COMPLETED_AFTER_HOURS: i64 = 24;

/// A list with its visible items and the categories those items use.
#[derive(Debug, Clone, Serialize)]
pub struct ListView {
    #[serde(flatten)]
    pub list: ShoppingList,
    pub items: Vec<ShoppingItem>,
    /// Distinct item categories, sorted.
    pub categories: Vec<String>,
}

fn validate_list_name(name: &str) -> ShoppingResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ShoppingError::validation("list name must not be empty"));
    }
    if name.chars().count() > MAX_LIST_NAME_LEN {
        return Err(ShoppingError::validation(format!(
            "list name must be at most {} characters",
            MAX_LIST_NAME_LEN
        )));
    }
    Ok(name.to_string())
}

/// Create a list. A new default list takes the flag from the old one.
pub async fn create_list<S: Store + ?Sized>(
    store: &S,
    tenant_id: Uuid,
    name: &str,
    is_default: bool,
    now: DateTime<Utc>,
) -> ShoppingResult<ShoppingList> {
    let list = ShoppingList {
        id: Uuid::new_v4(),
        tenant_id,
        name: validate_list_name(name)?,
        is_default,
        created_at: now,
        updated_at: now,
    };
    store.insert_list(&list).await?;
    Ok(list)
}

pub async fn get_or_create_default_list<S: Store + ?Sized>(
    store: &S,
    tenant_id: Uuid,
    default_name: &str,
    now: DateTime<Utc>,
) -> ShoppingResult<ShoppingList> {
    if let Some(list) = store.get_default_list(tenant_id).await? {
        return Ok(list);
    }
    create_list(store, tenant_id, default_name, true, now).await
}

/// The tenant's list `list_id`, or `NotFound`.
pub async fn require_list<S: Store + ?Sized>(
    store: &S,
    tenant_id: Uuid,
    list_id: Uuid,
) -> ShoppingResult<ShoppingList> {
    store
        .get_list(tenant_id, list_id)
        .await?
        .ok_or_else(|| ShoppingError::not_found(format!("shopping list {}", list_id)))
}

pub async fn list_lists<S: Store + ?Sized>(
    store: &S,
    tenant_id: Uuid,
) -> ShoppingResult<Vec<ListSummary>> {
    Ok(store.list_summaries(tenant_id).await?)
}

/// Build the view of `list`. Items checked longer than `hide_completed_after`
/// ago are left out.
pub async fn list_view<S: Store + ?Sized>(
    store: &S,
    list: ShoppingList,
    hide_completed_after: Duration,
    now: DateTime<Utc>,
) -> ShoppingResult<ListView> {
    let items = store
        .list_items(list.tenant_id, list.id, now - hide_completed_after)
        .await?;
    let mut categories: Vec<String> = items.iter().map(|i| i.category.clone()).collect();
    categories.sort();
    categories.dedup();
    Ok(ListView {
        list,
        items,
        categories,
    })
}
