//! In-memory [`Store`] implementation for tests and embedding.
//!
//! Uses `HashMap`s behind `std::sync::RwLock`. Like the SQLite schema, it
//! refuses a second unchecked item with the same `(list_id,
//! name_normalized)`, so race-mitigation behavior is the same on both
//! backends.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{ItemSource, ListSummary, ShoppingCategory, ShoppingItem, ShoppingList};

use super::Store;

/// In-memory store for testing.
pub struct InMemoryStore {
    lists: RwLock<HashMap<Uuid, ShoppingList>>,
    items: RwLock<HashMap<Uuid, ShoppingItem>>,
    categories: RwLock<HashMap<Uuid, ShoppingCategory>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            lists: RwLock::new(HashMap::new()),
            items: RwLock::new(HashMap::new()),
            categories: RwLock::new(HashMap::new()),
        }
    }

    /// Every stored item, in no particular order.
    pub fn all_items(&self) -> Vec<ShoppingItem> {
        self.items.read().unwrap().values().cloned().collect()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn unchecked_clash(items: &HashMap<Uuid, ShoppingItem>, item: &ShoppingItem) -> bool {
    !item.checked
        && items.values().any(|other| {
            other.id != item.id
                && !other.checked
                && other.list_id == item.list_id
                && other.name_normalized == item.name_normalized
        })
}

fn sorted_categories(mut categories: Vec<ShoppingCategory>) -> Vec<ShoppingCategory> {
    categories.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then(a.name.cmp(&b.name)));
    categories
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_list(&self, tenant_id: Uuid, list_id: Uuid) -> Result<Option<ShoppingList>> {
        let lists = self.lists.read().unwrap();
        Ok(lists
            .get(&list_id)
            .filter(|l| l.tenant_id == tenant_id)
            .cloned())
    }

    async fn get_default_list(&self, tenant_id: Uuid) -> Result<Option<ShoppingList>> {
        let lists = self.lists.read().unwrap();
        Ok(lists
            .values()
            .find(|l| l.tenant_id == tenant_id && l.is_default)
            .cloned())
    }

    async fn list_summaries(&self, tenant_id: Uuid) -> Result<Vec<ListSummary>> {
        let lists = self.lists.read().unwrap();
        let items = self.items.read().unwrap();
        let mut summaries: Vec<ListSummary> = lists
            .values()
            .filter(|l| l.tenant_id == tenant_id)
            .map(|l| {
                let in_list = items.values().filter(|i| i.list_id == l.id);
                let (item_count, checked_count) =
                    in_list.fold((0u64, 0u64), |(n, c), i| (n + 1, c + u64::from(i.checked)));
                ListSummary {
                    id: l.id,
                    name: l.name.clone(),
                    is_default: l.is_default,
                    item_count,
                    checked_count,
                    updated_at: l.updated_at,
                }
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(summaries)
    }

    async fn insert_list(&self, list: &ShoppingList) -> Result<()> {
        let mut lists = self.lists.write().unwrap();
        if list.is_default {
            for other in lists.values_mut() {
                if other.tenant_id == list.tenant_id {
                    other.is_default = false;
                }
            }
        }
        lists.insert(list.id, list.clone());
        Ok(())
    }

    async fn find_unchecked_item(
        &self,
        list_id: Uuid,
        name_normalized: &str,
    ) -> Result<Option<ShoppingItem>> {
        let items = self.items.read().unwrap();
        Ok(items
            .values()
            .find(|i| i.list_id == list_id && !i.checked && i.name_normalized == name_normalized)
            .cloned())
    }

    async fn find_recently_checked_item(
        &self,
        list_id: Uuid,
        name_normalized: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<ShoppingItem>> {
        let items = self.items.read().unwrap();
        Ok(items
            .values()
            .filter(|i| i.list_id == list_id && i.checked && i.name_normalized == name_normalized)
            .filter(|i| i.checked_at.is_some_and(|at| at > since))
            .max_by_key(|i| i.checked_at)
            .cloned())
    }

    async fn get_item(&self, tenant_id: Uuid, item_id: Uuid) -> Result<Option<ShoppingItem>> {
        let items = self.items.read().unwrap();
        Ok(items
            .get(&item_id)
            .filter(|i| i.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_items(
        &self,
        tenant_id: Uuid,
        list_id: Uuid,
        visible_since: DateTime<Utc>,
    ) -> Result<Vec<ShoppingItem>> {
        let items = self.items.read().unwrap();
        let mut visible: Vec<ShoppingItem> = items
            .values()
            .filter(|i| i.tenant_id == tenant_id && i.list_id == list_id)
            .filter(|i| !i.checked || i.checked_at.map_or(true, |at| at > visible_since))
            .cloned()
            .collect();
        visible.sort_by(|a, b| a.category.cmp(&b.category).then(a.name.cmp(&b.name)));
        Ok(visible)
    }

    async fn create_item(&self, item: &ShoppingItem) -> Result<()> {
        let mut items = self.items.write().unwrap();
        if unchecked_clash(&items, item) {
            bail!(
                "unique constraint failed: unchecked item '{}' already on list {}",
                item.name_normalized,
                item.list_id
            );
        }
        items.insert(item.id, item.clone());
        Ok(())
    }

    async fn update_item_quantity(
        &self,
        item_id: Uuid,
        quantity: Decimal,
        source: ItemSource,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut items = self.items.write().unwrap();
        match items.get_mut(&item_id) {
            Some(item) => {
                item.quantity = quantity;
                item.source = source;
                item.updated_at = updated_at;
                Ok(())
            }
            None => bail!("item {} vanished during update", item_id),
        }
    }

    async fn update_item(&self, item: &ShoppingItem) -> Result<()> {
        let mut items = self.items.write().unwrap();
        if !items.contains_key(&item.id) {
            bail!("item {} vanished during update", item.id);
        }
        if unchecked_clash(&items, item) {
            bail!(
                "unique constraint failed: unchecked item '{}' already on list {}",
                item.name_normalized,
                item.list_id
            );
        }
        items.insert(item.id, item.clone());
        Ok(())
    }

    async fn delete_item(&self, item_id: Uuid) -> Result<()> {
        self.items.write().unwrap().remove(&item_id);
        Ok(())
    }

    async fn check_all_items(
        &self,
        tenant_id: Uuid,
        list_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let mut items = self.items.write().unwrap();
        let mut changed = 0;
        for item in items.values_mut() {
            if item.tenant_id == tenant_id && item.list_id == list_id && !item.checked {
                item.set_checked(true, now);
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn count_items(&self, tenant_id: Uuid, list_id: Uuid) -> Result<u64> {
        let items = self.items.read().unwrap();
        Ok(items
            .values()
            .filter(|i| i.tenant_id == tenant_id && i.list_id == list_id)
            .count() as u64)
    }

    async fn item_names(&self, tenant_id: Uuid) -> Result<Vec<String>> {
        let items = self.items.read().unwrap();
        let names: BTreeSet<String> = items
            .values()
            .filter(|i| i.tenant_id == tenant_id)
            .map(|i| i.name.clone())
            .collect();
        Ok(names.into_iter().collect())
    }

    async fn get_tenant_categories(&self, tenant_id: Uuid) -> Result<Vec<ShoppingCategory>> {
        let categories = self.categories.read().unwrap();
        Ok(sorted_categories(
            categories
                .values()
                .filter(|c| c.tenant_id == tenant_id)
                .cloned()
                .collect(),
        ))
    }

    async fn seed_categories(
        &self,
        tenant_id: Uuid,
        seed: &[ShoppingCategory],
    ) -> Result<bool> {
        let mut categories = self.categories.write().unwrap();
        if categories.values().any(|c| c.tenant_id == tenant_id) {
            return Ok(false);
        }
        for category in seed {
            categories.insert(category.id, category.clone());
        }
        Ok(true)
    }

    async fn get_category(
        &self,
        tenant_id: Uuid,
        category_id: Uuid,
    ) -> Result<Option<ShoppingCategory>> {
        let categories = self.categories.read().unwrap();
        Ok(categories
            .get(&category_id)
            .filter(|c| c.tenant_id == tenant_id)
            .cloned())
    }

    async fn get_category_by_name(
        &self,
        tenant_id: Uuid,
        name: &str,
    ) -> Result<Option<ShoppingCategory>> {
        let categories = self.categories.read().unwrap();
        Ok(categories
            .values()
            .find(|c| c.tenant_id == tenant_id && c.name == name)
            .cloned())
    }

    async fn max_category_sort_order(&self, tenant_id: Uuid) -> Result<Option<i64>> {
        let categories = self.categories.read().unwrap();
        Ok(categories
            .values()
            .filter(|c| c.tenant_id == tenant_id)
            .map(|c| c.sort_order)
            .max())
    }

    async fn insert_category(&self, category: &ShoppingCategory) -> Result<()> {
        let mut categories = self.categories.write().unwrap();
        if categories
            .values()
            .any(|c| c.tenant_id == category.tenant_id && c.name == category.name)
        {
            bail!("unique constraint failed: category '{}'", category.name);
        }
        categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn update_category(&self, category: &ShoppingCategory) -> Result<()> {
        let mut categories = self.categories.write().unwrap();
        if categories.values().any(|c| {
            c.id != category.id && c.tenant_id == category.tenant_id && c.name == category.name
        }) {
            bail!("unique constraint failed: category '{}'", category.name);
        }
        categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn delete_category(
        &self,
        tenant_id: Uuid,
        category: &ShoppingCategory,
        fallback: &str,
    ) -> Result<u64> {
        // Lock order: items, then categories.
        let mut items = self.items.write().unwrap();
        let mut categories = self.categories.write().unwrap();
        let mut reassigned = 0;
        for item in items.values_mut() {
            if item.tenant_id == tenant_id && item.category == category.name {
                item.category = fallback.to_string();
                reassigned += 1;
            }
        }
        categories.remove(&category.id);
        Ok(reassigned)
    }

    async fn set_category_sort_order(
        &self,
        tenant_id: Uuid,
        category_id: Uuid,
        sort_order: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut categories = self.categories.write().unwrap();
        match categories
            .get_mut(&category_id)
            .filter(|c| c.tenant_id == tenant_id)
        {
            Some(category) => {
                category.sort_order = sort_order;
                category.updated_at = updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
