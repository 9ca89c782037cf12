//! SQLite-backed [`Store`] implementation.
//!
//! Ids are stored as hyphenated UUID text, timestamps as unix seconds,
//! quantities as decimal text, and category keywords as a JSON array.
//! Multi-row operations (making a list the default, seeding categories,
//! deleting a category) run in a single transaction.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

use hearth_core::models::{
    ItemSource, ListSummary, ShoppingCategory, ShoppingItem, ShoppingList,
};
use hearth_core::store::Store;

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

const ITEM_COLUMNS: &str = "id, list_id, tenant_id, name, name_normalized, quantity, unit, \
     category, checked, checked_at, source, recipe_id, added_by, created_at, updated_at";

const CATEGORY_COLUMNS: &str = "id, tenant_id, name, icon, color, keywords_json, sort_order, \
     is_default, created_at, updated_at";

fn parse_uuid(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let text: String = row.try_get(column)?;
    Uuid::parse_str(&text).with_context(|| format!("bad uuid in column {}: {}", column, text))
}

fn parse_opt_uuid(row: &SqliteRow, column: &str) -> Result<Option<Uuid>> {
    let text: Option<String> = row.try_get(column)?;
    text.map(|t| Uuid::parse_str(&t).with_context(|| format!("bad uuid in column {}", column)))
        .transpose()
}

fn from_ts(ts: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0).ok_or_else(|| anyhow!("timestamp out of range: {}", ts))
}

fn parse_ts(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    from_ts(row.try_get(column)?)
}

fn list_from_row(row: &SqliteRow) -> Result<ShoppingList> {
    Ok(ShoppingList {
        id: parse_uuid(row, "id")?,
        tenant_id: parse_uuid(row, "tenant_id")?,
        name: row.try_get("name")?,
        is_default: row.try_get("is_default")?,
        created_at: parse_ts(row, "created_at")?,
        updated_at: parse_ts(row, "updated_at")?,
    })
}

fn item_from_row(row: &SqliteRow) -> Result<ShoppingItem> {
    let quantity: String = row.try_get("quantity")?;
    let source: String = row.try_get("source")?;
    let checked_at: Option<i64> = row.try_get("checked_at")?;
    Ok(ShoppingItem {
        id: parse_uuid(row, "id")?,
        list_id: parse_uuid(row, "list_id")?,
        tenant_id: parse_uuid(row, "tenant_id")?,
        name: row.try_get("name")?,
        name_normalized: row.try_get("name_normalized")?,
        quantity: Decimal::from_str(&quantity)
            .with_context(|| format!("bad quantity: {}", quantity))?,
        unit: row.try_get("unit")?,
        category: row.try_get("category")?,
        checked: row.try_get("checked")?,
        checked_at: checked_at.map(from_ts).transpose()?,
        source: source.parse()?,
        recipe_id: parse_opt_uuid(row, "recipe_id")?,
        added_by: parse_opt_uuid(row, "added_by")?,
        created_at: parse_ts(row, "created_at")?,
        updated_at: parse_ts(row, "updated_at")?,
    })
}

fn category_from_row(row: &SqliteRow) -> Result<ShoppingCategory> {
    let keywords_json: String = row.try_get("keywords_json")?;
    Ok(ShoppingCategory {
        id: parse_uuid(row, "id")?,
        tenant_id: parse_uuid(row, "tenant_id")?,
        name: row.try_get("name")?,
        icon: row.try_get("icon")?,
        color: row.try_get("color")?,
        keywords: serde_json::from_str(&keywords_json)
            .with_context(|| format!("bad keywords_json: {}", keywords_json))?,
        sort_order: row.try_get("sort_order")?,
        is_default: row.try_get("is_default")?,
        created_at: parse_ts(row, "created_at")?,
        updated_at: parse_ts(row, "updated_at")?,
    })
}

/// Bind the ten `CATEGORY_COLUMNS` values, in column order.
fn bind_category<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    tenant_id: Uuid,
    category: &'q ShoppingCategory,
) -> Result<Query<'q, Sqlite, SqliteArguments<'q>>> {
    Ok(query
        .bind(category.id.to_string())
        .bind(tenant_id.to_string())
        .bind(&category.name)
        .bind(&category.icon)
        .bind(&category.color)
        .bind(serde_json::to_string(&category.keywords)?)
        .bind(category.sort_order)
        .bind(category.is_default)
        .bind(category.created_at.timestamp())
        .bind(category.updated_at.timestamp()))
}

#[async_trait]
impl Store for SqliteStore {
    async fn get_list(&self, tenant_id: Uuid, list_id: Uuid) -> Result<Option<ShoppingList>> {
        let row = sqlx::query("SELECT * FROM shopping_lists WHERE id = ? AND tenant_id = ?")
            .bind(list_id.to_string())
            .bind(tenant_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(list_from_row).transpose()
    }

    async fn get_default_list(&self, tenant_id: Uuid) -> Result<Option<ShoppingList>> {
        let row = sqlx::query(
            "SELECT * FROM shopping_lists WHERE tenant_id = ? AND is_default = 1 LIMIT 1",
        )
        .bind(tenant_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(list_from_row).transpose()
    }

    async fn list_summaries(&self, tenant_id: Uuid) -> Result<Vec<ListSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT l.id, l.name, l.is_default, l.updated_at,
                   (SELECT COUNT(*) FROM shopping_items i WHERE i.list_id = l.id) AS item_count,
                   (SELECT COUNT(*) FROM shopping_items i
                     WHERE i.list_id = l.id AND i.checked = 1) AS checked_count
            FROM shopping_lists l
            WHERE l.tenant_id = ?
            ORDER BY l.name, l.id
            "#,
        )
        .bind(tenant_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<ListSummary> {
                let item_count: i64 = row.try_get("item_count")?;
                let checked_count: i64 = row.try_get("checked_count")?;
                Ok(ListSummary {
                    id: parse_uuid(row, "id")?,
                    name: row.try_get("name")?,
                    is_default: row.try_get("is_default")?,
                    item_count: item_count as u64,
                    checked_count: checked_count as u64,
                    updated_at: parse_ts(row, "updated_at")?,
                })
            })
            .collect()
    }

    async fn insert_list(&self, list: &ShoppingList) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        if list.is_default {
            sqlx::query("UPDATE shopping_lists SET is_default = 0 WHERE tenant_id = ?")
                .bind(list.tenant_id.to_string())
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO shopping_lists (id, tenant_id, name, is_default, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(list.id.to_string())
        .bind(list.tenant_id.to_string())
        .bind(&list.name)
        .bind(list.is_default)
        .bind(list.created_at.timestamp())
        .bind(list.updated_at.timestamp())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_unchecked_item(
        &self,
        list_id: Uuid,
        name_normalized: &str,
    ) -> Result<Option<ShoppingItem>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM shopping_items \
             WHERE list_id = ? AND name_normalized = ? AND checked = 0 LIMIT 1",
            ITEM_COLUMNS
        ))
        .bind(list_id.to_string())
        .bind(name_normalized)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn find_recently_checked_item(
        &self,
        list_id: Uuid,
        name_normalized: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<ShoppingItem>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM shopping_items \
             WHERE list_id = ? AND name_normalized = ? AND checked = 1 \
               AND checked_at IS NOT NULL AND checked_at > ? \
             ORDER BY checked_at DESC LIMIT 1",
            ITEM_COLUMNS
        ))
        .bind(list_id.to_string())
        .bind(name_normalized)
        .bind(since.timestamp())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn get_item(&self, tenant_id: Uuid, item_id: Uuid) -> Result<Option<ShoppingItem>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM shopping_items WHERE id = ? AND tenant_id = ?",
            ITEM_COLUMNS
        ))
        .bind(item_id.to_string())
        .bind(tenant_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn list_items(
        &self,
        tenant_id: Uuid,
        list_id: Uuid,
        visible_since: DateTime<Utc>,
    ) -> Result<Vec<ShoppingItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM shopping_items \
             WHERE tenant_id = ? AND list_id = ? \
               AND (checked = 0 OR checked_at IS NULL OR checked_at > ?) \
             ORDER BY category, name",
            ITEM_COLUMNS
        ))
        .bind(tenant_id.to_string())
        .bind(list_id.to_string())
        .bind(visible_since.timestamp())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(item_from_row).collect()
    }

    async fn create_item(&self, item: &ShoppingItem) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO shopping_items ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            ITEM_COLUMNS
        ))
        .bind(item.id.to_string())
        .bind(item.list_id.to_string())
        .bind(item.tenant_id.to_string())
        .bind(&item.name)
        .bind(&item.name_normalized)
        .bind(item.quantity.to_string())
        .bind(&item.unit)
        .bind(&item.category)
        .bind(item.checked)
        .bind(item.checked_at.map(|at| at.timestamp()))
        .bind(item.source.as_str())
        .bind(item.recipe_id.map(|id| id.to_string()))
        .bind(item.added_by.map(|id| id.to_string()))
        .bind(item.created_at.timestamp())
        .bind(item.updated_at.timestamp())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to insert item '{}'", item.name))?;
        Ok(())
    }

    async fn update_item_quantity(
        &self,
        item_id: Uuid,
        quantity: Decimal,
        source: ItemSource,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE shopping_items SET quantity = ?, source = ?, updated_at = ? WHERE id = ?",
        )
        .bind(quantity.to_string())
        .bind(source.as_str())
        .bind(updated_at.timestamp())
        .bind(item_id.to_string())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            bail!("item {} vanished during update", item_id);
        }
        Ok(())
    }

    async fn update_item(&self, item: &ShoppingItem) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE shopping_items
            SET name = ?, name_normalized = ?, quantity = ?, unit = ?, category = ?,
                checked = ?, checked_at = ?, source = ?, recipe_id = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&item.name)
        .bind(&item.name_normalized)
        .bind(item.quantity.to_string())
        .bind(&item.unit)
        .bind(&item.category)
        .bind(item.checked)
        .bind(item.checked_at.map(|at| at.timestamp()))
        .bind(item.source.as_str())
        .bind(item.recipe_id.map(|id| id.to_string()))
        .bind(item.updated_at.timestamp())
        .bind(item.id.to_string())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to update item '{}'", item.name))?;
        if result.rows_affected() == 0 {
            bail!("item {} vanished during update", item.id);
        }
        Ok(())
    }

    async fn delete_item(&self, item_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM shopping_items WHERE id = ?")
            .bind(item_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn check_all_items(
        &self,
        tenant_id: Uuid,
        list_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE shopping_items SET checked = 1, checked_at = ?, updated_at = ?
            WHERE tenant_id = ? AND list_id = ? AND checked = 0
            "#,
        )
        .bind(now.timestamp())
        .bind(now.timestamp())
        .bind(tenant_id.to_string())
        .bind(list_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn count_items(&self, tenant_id: Uuid, list_id: Uuid) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM shopping_items WHERE tenant_id = ? AND list_id = ?",
        )
        .bind(tenant_id.to_string())
        .bind(list_id.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn item_names(&self, tenant_id: Uuid) -> Result<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT name FROM shopping_items WHERE tenant_id = ? ORDER BY name",
        )
        .bind(tenant_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    async fn get_tenant_categories(&self, tenant_id: Uuid) -> Result<Vec<ShoppingCategory>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM shopping_categories WHERE tenant_id = ? ORDER BY sort_order, name",
            CATEGORY_COLUMNS
        ))
        .bind(tenant_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(category_from_row).collect()
    }

    async fn seed_categories(
        &self,
        tenant_id: Uuid,
        categories: &[ShoppingCategory],
    ) -> Result<bool> {
        let Some((first, rest)) = categories.split_first() else {
            return Ok(false);
        };

        // The first statement is a write, so a concurrent seeder waits on the
        // busy timeout for the lock instead of failing on a stale snapshot.
        let mut tx = self.pool.begin().await?;

        let guarded = format!(
            "INSERT OR IGNORE INTO shopping_categories ({}) \
             SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ? \
             WHERE NOT EXISTS (SELECT 1 FROM shopping_categories WHERE tenant_id = ?)",
            CATEGORY_COLUMNS
        );
        let inserted = bind_category(sqlx::query(&guarded), tenant_id, first)?
            .bind(tenant_id.to_string())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if inserted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        let insert = format!(
            "INSERT OR IGNORE INTO shopping_categories ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            CATEGORY_COLUMNS
        );
        for category in rest {
            bind_category(sqlx::query(&insert), tenant_id, category)?
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn get_category(
        &self,
        tenant_id: Uuid,
        category_id: Uuid,
    ) -> Result<Option<ShoppingCategory>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM shopping_categories WHERE id = ? AND tenant_id = ?",
            CATEGORY_COLUMNS
        ))
        .bind(category_id.to_string())
        .bind(tenant_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn get_category_by_name(
        &self,
        tenant_id: Uuid,
        name: &str,
    ) -> Result<Option<ShoppingCategory>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM shopping_categories WHERE tenant_id = ? AND name = ?",
            CATEGORY_COLUMNS
        ))
        .bind(tenant_id.to_string())
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn max_category_sort_order(&self, tenant_id: Uuid) -> Result<Option<i64>> {
        let max: Option<i64> =
            sqlx::query_scalar("SELECT MAX(sort_order) FROM shopping_categories WHERE tenant_id = ?")
                .bind(tenant_id.to_string())
                .fetch_one(&self.pool)
                .await?;
        Ok(max)
    }

    async fn insert_category(&self, category: &ShoppingCategory) -> Result<()> {
        let insert = format!(
            "INSERT INTO shopping_categories ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            CATEGORY_COLUMNS
        );
        bind_category(sqlx::query(&insert), category.tenant_id, category)?
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to insert category '{}'", category.name))?;
        Ok(())
    }

    async fn update_category(&self, category: &ShoppingCategory) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE shopping_categories
            SET name = ?, icon = ?, color = ?, keywords_json = ?, sort_order = ?, updated_at = ?
            WHERE id = ? AND tenant_id = ?
            "#,
        )
        .bind(&category.name)
        .bind(&category.icon)
        .bind(&category.color)
        .bind(serde_json::to_string(&category.keywords)?)
        .bind(category.sort_order)
        .bind(category.updated_at.timestamp())
        .bind(category.id.to_string())
        .bind(category.tenant_id.to_string())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to update category '{}'", category.name))?;
        Ok(())
    }

    async fn delete_category(
        &self,
        tenant_id: Uuid,
        category: &ShoppingCategory,
        fallback: &str,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let moved = sqlx::query(
            "UPDATE shopping_items SET category = ? WHERE tenant_id = ? AND category = ?",
        )
        .bind(fallback)
        .bind(tenant_id.to_string())
        .bind(&category.name)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query("DELETE FROM shopping_categories WHERE id = ? AND tenant_id = ?")
            .bind(category.id.to_string())
            .bind(tenant_id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(moved)
    }

    async fn set_category_sort_order(
        &self,
        tenant_id: Uuid,
        category_id: Uuid,
        sort_order: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE shopping_categories SET sort_order = ?, updated_at = ? WHERE id = ? AND tenant_id = ?",
        )
        .bind(sort_order)
        .bind(updated_at.timestamp())
        .bind(category_id.to_string())
        .bind(tenant_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
