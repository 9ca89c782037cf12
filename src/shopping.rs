//! Application service over the core shopping operations.
//!
//! [`ShoppingService`] owns the store, the configured windows, and the
//! per-list locks. Both the HTTP server and the CLI call through it, so
//! every mutation is logged the same way and reconciliation on one list is
//! never interleaved within this process.

use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};
use uuid::Uuid;

use hearth_core::categories::{self, CategoryDraft, CategoryPatch};
use hearth_core::items::{self, CompleteSummary, ItemPatch};
use hearth_core::lists::{self, ListView};
use hearth_core::models::{ListSummary, ShoppingCategory, ShoppingItem, ShoppingList};
use hearth_core::reconcile::{self, AddItemRequest, AddOutcome, ReconcilePolicy};
use hearth_core::store::Store;
use hearth_core::ShoppingResult;

use crate::config::{Config, ShoppingConfig};
use crate::db;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

/// One async mutex per list id. Entries live only while someone holds or
/// waits on the lock.
#[derive(Default)]
pub struct ListLocks {
    locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl ListLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for `list_id`, created on first use.
    pub fn lock_for(&self, list_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks.entry(list_id).or_default().clone()
    }

    /// Wait for exclusive access to `list_id`.
    pub async fn lock(&self, list_id: Uuid) -> ListGuard<'_> {
        let guard = self.lock_for(list_id).lock_owned().await;
        ListGuard {
            locks: self,
            list_id,
            guard: Some(guard),
        }
    }

    /// Number of lists with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, list_id: Uuid) {
        let mut locks = self.locks.lock().unwrap();
        if locks
            .get(&list_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&list_id);
        }
    }
}

/// Held while a list is being mutated. Dropping it unlocks the list.
pub struct ListGuard<'a> {
    locks: &'a ListLocks,
    list_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ListGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(self.list_id);
    }
}

pub struct ShoppingService {
    store: Arc<dyn Store>,
    policy: ReconcilePolicy,
    hide_completed_after: Duration,
    default_list_name: String,
    locks: ListLocks,
}

impl ShoppingService {
    pub fn new(store: Arc<dyn Store>, config: &ShoppingConfig) -> Self {
        Self {
            store,
            policy: ReconcilePolicy::from_hours(config.recency_window_hours),
            hide_completed_after: Duration::hours(config.hide_completed_after_hours),
            default_list_name: config.default_list_name.clone(),
            locks: ListLocks::new(),
        }
    }

    /// Connects to the configured database, applies migrations, and wraps
    /// it in a service.
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        migrate::migrate_pool(&pool).await?;
        Ok(Self::new(Arc::new(SqliteStore::new(pool)), &config.shopping))
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    // ---- lists ----

    pub async fn lists(&self, tenant_id: Uuid) -> ShoppingResult<Vec<ListSummary>> {
        lists::list_lists(self.store(), tenant_id).await
    }

    pub async fn create_list(
        &self,
        tenant_id: Uuid,
        name: &str,
        is_default: bool,
    ) -> ShoppingResult<ShoppingList> {
        let list = lists::create_list(self.store(), tenant_id, name, is_default, Utc::now()).await?;
        info!(tenant = %tenant_id, list = %list.id, name = %list.name, is_default, "created list");
        Ok(list)
    }

    pub async fn list(&self, tenant_id: Uuid, list_id: Uuid) -> ShoppingResult<ShoppingList> {
        lists::require_list(self.store(), tenant_id, list_id).await
    }

    pub async fn default_list(&self, tenant_id: Uuid) -> ShoppingResult<ShoppingList> {
        lists::get_or_create_default_list(
            self.store(),
            tenant_id,
            &self.default_list_name,
            Utc::now(),
        )
        .await
    }

    pub async fn list_view(&self, tenant_id: Uuid, list_id: Uuid) -> ShoppingResult<ListView> {
        let list = self.list(tenant_id, list_id).await?;
        lists::list_view(self.store(), list, self.hide_completed_after, Utc::now()).await
    }

    pub async fn default_view(&self, tenant_id: Uuid) -> ShoppingResult<ListView> {
        let list = self.default_list(tenant_id).await?;
        lists::list_view(self.store(), list, self.hide_completed_after, Utc::now()).await
    }

    // ---- items ----

    pub async fn add_item(
        &self,
        tenant_id: Uuid,
        list_id: Uuid,
        req: AddItemRequest,
    ) -> ShoppingResult<AddOutcome> {
        let list = self.list(tenant_id, list_id).await?;
        let _guard = self.locks.lock(list.id).await;

        let outcome =
            reconcile::add_item(self.store(), &list, req, &self.policy, Utc::now()).await?;
        match &outcome {
            AddOutcome::Merged {
                item,
                previous_quantity,
            } => info!(
                list = %list.id,
                item = %item.name,
                previous = %previous_quantity,
                quantity = %item.quantity,
                "merged into existing item"
            ),
            AddOutcome::Created { item } => info!(
                list = %list.id,
                item = %item.name,
                category = %item.category,
                "created item"
            ),
            AddOutcome::DuplicatePrompt {
                existing,
                hours_since_checked,
            } => debug!(
                list = %list.id,
                item = %existing.name,
                hours_since_checked,
                "recently completed duplicate"
            ),
        }
        Ok(outcome)
    }

    pub async fn update_item(
        &self,
        tenant_id: Uuid,
        list_id: Uuid,
        item_id: Uuid,
        patch: ItemPatch,
    ) -> ShoppingResult<ShoppingItem> {
        let _guard = self.locks.lock(list_id).await;
        let item =
            items::update_item(self.store(), tenant_id, list_id, item_id, patch, Utc::now())
                .await?;
        info!(list = %list_id, item = %item.id, name = %item.name, "updated item");
        Ok(item)
    }

    pub async fn toggle_item(
        &self,
        tenant_id: Uuid,
        list_id: Uuid,
        item_id: Uuid,
    ) -> ShoppingResult<ShoppingItem> {
        let _guard = self.locks.lock(list_id).await;
        let item = items::toggle_item(self.store(), tenant_id, list_id, item_id, Utc::now()).await?;
        debug!(list = %list_id, item = %item.id, checked = item.checked, "toggled item");
        Ok(item)
    }

    pub async fn delete_item(
        &self,
        tenant_id: Uuid,
        list_id: Uuid,
        item_id: Uuid,
    ) -> ShoppingResult<ShoppingItem> {
        let _guard = self.locks.lock(list_id).await;
        let item = items::delete_item(self.store(), tenant_id, list_id, item_id).await?;
        info!(list = %list_id, item = %item.id, name = %item.name, "deleted item");
        Ok(item)
    }

    pub async fn complete_shop(
        &self,
        tenant_id: Uuid,
        list_id: Uuid,
    ) -> ShoppingResult<CompleteSummary> {
        let list = self.list(tenant_id, list_id).await?;
        let _guard = self.locks.lock(list.id).await;
        let summary = items::complete_shop(self.store(), &list, Utc::now()).await?;
        info!(
            list = %list.id,
            completed = summary.completed,
            remaining = summary.remaining,
            "completed shop"
        );
        Ok(summary)
    }

    pub async fn suggestions(&self, tenant_id: Uuid) -> ShoppingResult<Vec<String>> {
        items::suggestions(self.store(), tenant_id).await
    }

    // ---- categories ----

    pub async fn categorize(&self, tenant_id: Uuid, name: &str) -> ShoppingResult<String> {
        categories::categorize_for_tenant(self.store(), tenant_id, name, Utc::now()).await
    }

    pub async fn categories(&self, tenant_id: Uuid) -> ShoppingResult<Vec<ShoppingCategory>> {
        let now = Utc::now();
        if categories::seed_default_categories(self.store(), tenant_id, now).await? {
            info!(tenant = %tenant_id, "seeded default categories");
        }
        categories::ensure_categories(self.store(), tenant_id, now).await
    }

    pub async fn create_category(
        &self,
        tenant_id: Uuid,
        draft: CategoryDraft,
    ) -> ShoppingResult<ShoppingCategory> {
        let category =
            categories::create_category(self.store(), tenant_id, draft, Utc::now()).await?;
        info!(tenant = %tenant_id, category = %category.name, "created category");
        Ok(category)
    }

    pub async fn update_category(
        &self,
        tenant_id: Uuid,
        category_id: Uuid,
        patch: CategoryPatch,
    ) -> ShoppingResult<ShoppingCategory> {
        let category =
            categories::update_category(self.store(), tenant_id, category_id, patch, Utc::now())
                .await?;
        info!(tenant = %tenant_id, category = %category.name, "updated category");
        Ok(category)
    }

    /// Returns the deleted category's name and how many items moved.
    pub async fn delete_category(
        &self,
        tenant_id: Uuid,
        category_id: Uuid,
    ) -> ShoppingResult<(String, u64)> {
        let (category, moved) =
            categories::delete_category(self.store(), tenant_id, category_id).await?;
        info!(
            tenant = %tenant_id,
            category = %category.name,
            moved,
            "deleted category"
        );
        Ok((category.name, moved))
    }

    pub async fn reorder_categories(
        &self,
        tenant_id: Uuid,
        ids: &[Uuid],
    ) -> ShoppingResult<Vec<ShoppingCategory>> {
        categories::reorder_categories(self.store(), tenant_id, ids, Utc::now()).await
    }

    pub async fn add_keyword(
        &self,
        tenant_id: Uuid,
        category_id: Uuid,
        keyword: &str,
    ) -> ShoppingResult<ShoppingCategory> {
        let result =
            categories::add_category_keyword(self.store(), tenant_id, category_id, keyword, Utc::now())
                .await?;
        if !result.collisions.is_empty() {
            warn!(
                category = %result.category.name,
                keyword,
                also_in = ?result.collisions,
                "keyword shared with other categories; the earlier category wins"
            );
        }
        Ok(result.category)
    }

    pub async fn remove_keyword(
        &self,
        tenant_id: Uuid,
        category_id: Uuid,
        keyword: &str,
    ) -> ShoppingResult<ShoppingCategory> {
        categories::remove_category_keyword(self.store(), tenant_id, category_id, keyword, Utc::now())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::store::memory::InMemoryStore;
    use rust_decimal::Decimal;

    fn service() -> Arc<ShoppingService> {
        Arc::new(ShoppingService::new(
            Arc::new(InMemoryStore::new()),
            &ShoppingConfig::default(),
        ))
    }

    #[test]
    fn test_lock_is_shared_per_list() {
        let locks = ListLocks::new();
        let a = Uuid::new_v4();
        assert!(Arc::ptr_eq(&locks.lock_for(a), &locks.lock_for(a)));
        assert!(!Arc::ptr_eq(&locks.lock_for(a), &locks.lock_for(Uuid::new_v4())));
    }

    #[tokio::test]
    async fn test_lock_entries_are_released() {
        let locks = ListLocks::new();
        let list = Uuid::new_v4();

        let first = locks.lock(list).await;
        let waiter = locks.lock_for(list);
        drop(first);
        assert_eq!(locks.len(), 1);

        drop(waiter);
        drop(locks.lock(list).await);
        assert!(locks.is_empty());

        for _ in 0..5 {
            drop(locks.lock(Uuid::new_v4()).await);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_merge_into_one_row() {
        let svc = service();
        let tenant = Uuid::new_v4();
        let list_id = svc.default_list(tenant).await.unwrap().id;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                svc.add_item(tenant, list_id, AddItemRequest::new("Milk"))
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let view = svc.list_view(tenant, list_id).await.unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].quantity, Decimal::new(20, 0));
        assert!(svc.locks.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_list_is_not_found() {
        let svc = service();
        let err = svc
            .add_item(Uuid::new_v4(), Uuid::new_v4(), AddItemRequest::new("Milk"))
            .await
            .unwrap_err();
        assert!(matches!(err, hearth_core::ShoppingError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_categories_seed_once() {
        let svc = service();
        let tenant = Uuid::new_v4();
        assert_eq!(svc.categories(tenant).await.unwrap().len(), 13);
        assert_eq!(svc.categories(tenant).await.unwrap().len(), 13);
    }
}
