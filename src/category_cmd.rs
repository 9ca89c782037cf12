//! Category commands for the `hearth` CLI.

use anyhow::{bail, Result};
use uuid::Uuid;

use hearth_core::defaults::default_rules;
use hearth_core::models::ShoppingCategory;

use crate::config::Config;
use crate::shopping::ShoppingService;

/// Print the category an item name would be filed under.
///
/// Without a tenant the built-in rules are used and no database is opened.
pub async fn run_categorize(config: &Config, name: &str, tenant_id: Option<Uuid>) -> Result<()> {
    let category = match tenant_id {
        Some(tenant_id) => {
            let svc = ShoppingService::open(config).await?;
            svc.categorize(tenant_id, name).await?
        }
        None => hearth_core::categorize(name, default_rules()),
    };
    println!("{}", category);
    Ok(())
}

pub async fn run_list(config: &Config, tenant_id: Uuid) -> Result<()> {
    let svc = ShoppingService::open(config).await?;
    let categories = svc.categories(tenant_id).await?;

    println!("{:>4}  {:<20} {:<38} {}", "#", "NAME", "ID", "KEYWORDS");
    for category in &categories {
        println!(
            "{:>4}  {:<20} {:<38} {}",
            category.sort_order,
            format!("{} {}", category.icon, category.name),
            category.id,
            category.keywords.join(", ")
        );
    }
    Ok(())
}

pub async fn run_add_keyword(
    config: &Config,
    tenant_id: Uuid,
    category: &str,
    keyword: &str,
) -> Result<()> {
    let svc = ShoppingService::open(config).await?;
    let target = resolve_category(&svc, tenant_id, category).await?;
    let updated = svc.add_keyword(tenant_id, target.id, keyword).await?;
    println!(
        "{}: {} keywords",
        updated.name,
        updated.keywords.len()
    );
    Ok(())
}

pub async fn run_remove_keyword(
    config: &Config,
    tenant_id: Uuid,
    category: &str,
    keyword: &str,
) -> Result<()> {
    let svc = ShoppingService::open(config).await?;
    let target = resolve_category(&svc, tenant_id, category).await?;
    let updated = svc.remove_keyword(tenant_id, target.id, keyword).await?;
    println!(
        "{}: {} keywords",
        updated.name,
        updated.keywords.len()
    );
    Ok(())
}

pub async fn run_delete(config: &Config, tenant_id: Uuid, category: &str) -> Result<()> {
    let svc = ShoppingService::open(config).await?;
    let target = resolve_category(&svc, tenant_id, category).await?;
    let (name, moved) = svc.delete_category(tenant_id, target.id).await?;
    println!("deleted category \"{}\"; {} items moved to Other", name, moved);
    Ok(())
}

/// Find a category by id or by case-insensitive name.
async fn resolve_category(
    svc: &ShoppingService,
    tenant_id: Uuid,
    category: &str,
) -> Result<ShoppingCategory> {
    let categories = svc.categories(tenant_id).await?;
    let by_id = Uuid::parse_str(category).ok();
    let found = categories.into_iter().find(|c| {
        Some(c.id) == by_id || c.name.eq_ignore_ascii_case(category.trim())
    });
    match found {
        Some(c) => Ok(c),
        None => bail!("No category named '{}'", category),
    }
}
