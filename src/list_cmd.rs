//! List and item commands for the `hearth` CLI.
//!
//! Each command opens the configured database through
//! [`ShoppingService::open`], runs one operation for the given tenant, and
//! prints a human-readable result to stdout.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use uuid::Uuid;

use hearth_core::models::{ItemSource, ShoppingItem, ShoppingList};
use hearth_core::reconcile::{AddItemRequest, AddOutcome};

use crate::config::Config;
use crate::shopping::ShoppingService;

/// Arguments for `hearth add`.
pub struct AddArgs {
    pub name: String,
    pub quantity: Option<Decimal>,
    pub unit: Option<String>,
    pub category: Option<String>,
    pub source: Option<String>,
    pub force: bool,
}

/// Resolve a `--list` argument: `default` or a list UUID.
pub async fn resolve_list(
    svc: &ShoppingService,
    tenant_id: Uuid,
    list: &str,
) -> Result<ShoppingList> {
    if list.eq_ignore_ascii_case("default") {
        return Ok(svc.default_list(tenant_id).await?);
    }
    let list_id = Uuid::parse_str(list)
        .with_context(|| format!("Invalid list id '{}': expected a UUID or 'default'", list))?;
    Ok(svc.list(tenant_id, list_id).await?)
}

pub async fn run_lists(config: &Config, tenant_id: Uuid) -> Result<()> {
    let svc = ShoppingService::open(config).await?;
    let lists = svc.lists(tenant_id).await?;

    if lists.is_empty() {
        println!("No shopping lists.");
        return Ok(());
    }

    println!("{:<38} {:<24} {:>6} {:>8}", "ID", "NAME", "ITEMS", "CHECKED");
    for list in &lists {
        let name = if list.is_default {
            format!("{} *", list.name)
        } else {
            list.name.clone()
        };
        println!(
            "{:<38} {:<24} {:>6} {:>8}",
            list.id, name, list.item_count, list.checked_count
        );
    }
    Ok(())
}

pub async fn run_create_list(
    config: &Config,
    tenant_id: Uuid,
    name: &str,
    is_default: bool,
) -> Result<()> {
    let svc = ShoppingService::open(config).await?;
    let list = svc.create_list(tenant_id, name, is_default).await?;
    println!("created list \"{}\" ({})", list.name, list.id);
    Ok(())
}

pub async fn run_add(config: &Config, tenant_id: Uuid, list: &str, args: AddArgs) -> Result<()> {
    let svc = ShoppingService::open(config).await?;
    let list = resolve_list(&svc, tenant_id, list).await?;

    let source = args
        .source
        .as_deref()
        .map(str::parse::<ItemSource>)
        .transpose()?;

    let req = AddItemRequest {
        name: args.name,
        quantity: args.quantity.into(),
        unit: args.unit,
        category: args.category,
        source,
        force_add: args.force,
        ..AddItemRequest::default()
    };

    match svc.add_item(tenant_id, list.id, req).await? {
        AddOutcome::Created { item } => {
            println!(
                "created \"{}\" x{} in {} ({})",
                item.name,
                format_quantity(&item),
                item.category,
                item.id
            );
        }
        AddOutcome::Merged {
            item,
            previous_quantity,
        } => {
            println!(
                "merged \"{}\" (was {}, now {})",
                item.name,
                previous_quantity.normalize(),
                item.quantity.normalize()
            );
        }
        AddOutcome::DuplicatePrompt {
            existing,
            hours_since_checked,
        } => {
            println!(
                "duplicate: \"{}\" was checked off {:.1}h ago; rerun with --force to add it again",
                existing.name, hours_since_checked
            );
        }
    }
    Ok(())
}

pub async fn run_items(config: &Config, tenant_id: Uuid, list: &str) -> Result<()> {
    let svc = ShoppingService::open(config).await?;
    let list = resolve_list(&svc, tenant_id, list).await?;
    let view = svc.list_view(tenant_id, list.id).await?;

    println!("{}", view.list.name);
    if view.items.is_empty() {
        println!("  (empty)");
        return Ok(());
    }

    let mut current: Option<&str> = None;
    for item in &view.items {
        if current != Some(item.category.as_str()) {
            println!();
            println!("  {}", item.category);
            current = Some(item.category.as_str());
        }
        println!(
            "    [{}] {:<30} {:>8}  {}",
            if item.checked { "x" } else { " " },
            item.name,
            format_quantity(item),
            item.id
        );
    }
    Ok(())
}

pub async fn run_toggle(config: &Config, tenant_id: Uuid, list: &str, item_id: Uuid) -> Result<()> {
    let svc = ShoppingService::open(config).await?;
    let list = resolve_list(&svc, tenant_id, list).await?;
    let item = svc.toggle_item(tenant_id, list.id, item_id).await?;
    let state = if item.checked { "checked" } else { "unchecked" };
    println!("{} \"{}\"", state, item.name);
    Ok(())
}

pub async fn run_complete(config: &Config, tenant_id: Uuid, list: &str) -> Result<()> {
    let svc = ShoppingService::open(config).await?;
    let list = resolve_list(&svc, tenant_id, list).await?;
    let summary = svc.complete_shop(tenant_id, list.id).await?;
    if summary.completed == 0 {
        println!("All items already checked.");
    } else {
        println!(
            "Shopping complete: {} checked off, {} already done.",
            summary.completed, summary.remaining
        );
    }
    Ok(())
}

fn format_quantity(item: &ShoppingItem) -> String {
    match &item.unit {
        Some(unit) => format!("{} {}", item.quantity.normalize(), unit),
        None => item.quantity.normalize().to_string(),
    }
}
