//! Storage abstraction for Hearth.
//!
//! The [`Store`] trait is the only way the core reaches persistence. Every
//! method is a single repository-style call; methods that touch more than
//! one row (seeding, category deletion, making a list the default) must be
//! atomic in the implementation.
//!
//! Tenant scoping: lookups that start from a caller-supplied id take the
//! tenant and must not return another tenant's rows. Item lookups keyed by
//! list id assume the list was already resolved for the tenant.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{ItemSource, ListSummary, ShoppingCategory, ShoppingItem, ShoppingList};

/// Abstract storage backend.
///
/// # Operations
///
/// | Group | Methods |
/// |-------|---------|
/// | Lists | [`get_list`](Store::get_list), [`get_default_list`](Store::get_default_list), [`list_summaries`](Store::list_summaries), [`insert_list`](Store::insert_list) |
/// | Reconciler lookups | [`find_unchecked_item`](Store::find_unchecked_item), [`find_recently_checked_item`](Store::find_recently_checked_item) |
/// | Items | [`get_item`](Store::get_item), [`list_items`](Store::list_items), [`create_item`](Store::create_item), [`update_item_quantity`](Store::update_item_quantity), [`update_item`](Store::update_item), [`delete_item`](Store::delete_item), [`check_all_items`](Store::check_all_items), [`count_items`](Store::count_items), [`item_names`](Store::item_names) |
/// | Categories | [`get_tenant_categories`](Store::get_tenant_categories), [`seed_categories`](Store::seed_categories), [`get_category`](Store::get_category), [`get_category_by_name`](Store::get_category_by_name), [`max_category_sort_order`](Store::max_category_sort_order), [`insert_category`](Store::insert_category), [`update_category`](Store::update_category), [`delete_category`](Store::delete_category), [`set_category_sort_order`](Store::set_category_sort_order) |
#[async_trait]
pub trait Store: Send + Sync {
    // ---- lists ----

    async fn get_list(&self, tenant_id: Uuid, list_id: Uuid) -> Result<Option<ShoppingList>>;

    async fn get_default_list(&self, tenant_id: Uuid) -> Result<Option<ShoppingList>>;

    /// All of a tenant's lists with item and checked counts, ordered by name.
    async fn list_summaries(&self, tenant_id: Uuid) -> Result<Vec<ListSummary>>;

    /// Insert a list. If `list.is_default`, any previous default of the
    /// tenant loses the flag in the same operation.
    async fn insert_list(&self, list: &ShoppingList) -> Result<()>;

    // ---- reconciler lookups ----

    /// The unchecked item in `list_id` with this normalized name, if any.
    async fn find_unchecked_item(
        &self,
        list_id: Uuid,
        name_normalized: &str,
    ) -> Result<Option<ShoppingItem>>;

    /// A checked item in `list_id` with this normalized name whose
    /// `checked_at` is strictly after `since`. The most recent one wins.
    async fn find_recently_checked_item(
        &self,
        list_id: Uuid,
        name_normalized: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<ShoppingItem>>;

    // ---- items ----

    async fn get_item(&self, tenant_id: Uuid, item_id: Uuid) -> Result<Option<ShoppingItem>>;

    /// Items of a list, hiding those checked at or before `visible_since`.
    /// Ordered by category, then name.
    async fn list_items(
        &self,
        tenant_id: Uuid,
        list_id: Uuid,
        visible_since: DateTime<Utc>,
    ) -> Result<Vec<ShoppingItem>>;

    async fn create_item(&self, item: &ShoppingItem) -> Result<()>;

    /// Write a merged quantity and source.
    async fn update_item_quantity(
        &self,
        item_id: Uuid,
        quantity: Decimal,
        source: ItemSource,
        updated_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Overwrite every mutable column of an existing item.
    async fn update_item(&self, item: &ShoppingItem) -> Result<()>;

    async fn delete_item(&self, item_id: Uuid) -> Result<()>;

    /// Check every unchecked item of a list. Returns how many changed.
    async fn check_all_items(
        &self,
        tenant_id: Uuid,
        list_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64>;

    async fn count_items(&self, tenant_id: Uuid, list_id: Uuid) -> Result<u64>;

    /// Distinct display names of all the tenant's items, sorted.
    async fn item_names(&self, tenant_id: Uuid) -> Result<Vec<String>>;

    // ---- categories ----

    /// Ordered by `sort_order`, then name.
    async fn get_tenant_categories(&self, tenant_id: Uuid) -> Result<Vec<ShoppingCategory>>;

    /// Insert `categories` only if the tenant has none. Returns `true` if
    /// rows were inserted. Must be atomic and idempotent.
    async fn seed_categories(
        &self,
        tenant_id: Uuid,
        categories: &[ShoppingCategory],
    ) -> Result<bool>;

    async fn get_category(
        &self,
        tenant_id: Uuid,
        category_id: Uuid,
    ) -> Result<Option<ShoppingCategory>>;

    async fn get_category_by_name(
        &self,
        tenant_id: Uuid,
        name: &str,
    ) -> Result<Option<ShoppingCategory>>;

    async fn max_category_sort_order(&self, tenant_id: Uuid) -> Result<Option<i64>>;

    async fn insert_category(&self, category: &ShoppingCategory) -> Result<()>;

    async fn update_category(&self, category: &ShoppingCategory) -> Result<()>;

    /// Delete a category and, in the same operation, rename the tenant's
    /// items in that category to `fallback`. Returns the reassigned count.
    async fn delete_category(
        &self,
        tenant_id: Uuid,
        category: &ShoppingCategory,
        fallback: &str,
    ) -> Result<u64>;

    /// Returns `false` if the category does not belong to the tenant.
    async fn set_category_sort_order(
        &self,
        tenant_id: Uuid,
        category_id: Uuid,
        sort_order: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<bool>;
}
