//! # Hearth CLI (`hearth`)
//!
//! The `hearth` binary initializes the database, serves the HTTP API, and
//! offers direct access to lists and categories for scripting and
//! troubleshooting.
//!
//! ## Usage
//!
//! ```bash
//! hearth --config ./config/hearth.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `hearth init` | Create the SQLite database and run schema migrations |
//! | `hearth serve` | Start the HTTP API |
//! | `hearth categorize <name>` | Show the category an item would get |
//! | `hearth lists` | List a tenant's shopping lists |
//! | `hearth new-list <name>` | Create a shopping list |
//! | `hearth add <name>` | Add an item (merges or flags duplicates) |
//! | `hearth items` | Show a list's visible items |
//! | `hearth toggle <item>` | Check or uncheck an item |
//! | `hearth complete` | Check off everything on a list |
//! | `hearth categories ...` | Inspect and edit categories |
//!
//! ## Examples
//!
//! ```bash
//! hearth init
//! hearth categorize "Tinned Tomatoes"
//! hearth add --tenant $TENANT --list default "Milk" --quantity 2 --unit L
//! hearth categories add-keyword --tenant $TENANT Bakery sourdough
//! RUST_LOG=hearth=debug hearth serve
//! ```
//!
//! Logs go to stderr and are filtered by `RUST_LOG` (default `hearth=info`).

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use hearth::list_cmd::AddArgs;
use hearth::{category_cmd, config, list_cmd, migrate, server};

/// Hearth: a household shopping-list service.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/hearth.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "hearth",
    about = "Hearth: household shopping lists with keyword categorization and duplicate reconciliation",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/hearth.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the list, item, and category
    /// tables. Running it again is a no-op.
    Init,

    /// Start the HTTP API on `[server] bind`.
    Serve,

    /// Show which category an item name would be filed under.
    ///
    /// With `--tenant`, the tenant's own categories are used (seeding the
    /// defaults on first use); otherwise the built-in rules.
    Categorize {
        name: String,

        #[arg(long)]
        tenant: Option<Uuid>,
    },

    /// List a tenant's shopping lists with item counts.
    Lists {
        #[arg(long)]
        tenant: Uuid,
    },

    /// Create a shopping list.
    NewList {
        #[arg(long)]
        tenant: Uuid,

        name: String,

        /// Make this the tenant's default list.
        #[arg(long)]
        default: bool,
    },

    /// Add an item to a list.
    ///
    /// An unchecked item with the same name has its quantity increased.
    /// If the item was checked off within the recency window, nothing is
    /// added unless `--force` is given.
    Add {
        #[arg(long)]
        tenant: Uuid,

        /// List UUID or `default`.
        #[arg(long, default_value = "default")]
        list: String,

        name: String,

        #[arg(long)]
        quantity: Option<Decimal>,

        #[arg(long)]
        unit: Option<String>,

        /// Category to use instead of keyword matching.
        #[arg(long)]
        category: Option<String>,

        /// `manual`, `alexa`, or `recipe`.
        #[arg(long)]
        source: Option<String>,

        /// Add even if the item was recently completed.
        #[arg(long)]
        force: bool,
    },

    /// Show a list's items grouped by category.
    Items {
        #[arg(long)]
        tenant: Uuid,

        #[arg(long, default_value = "default")]
        list: String,
    },

    /// Check or uncheck an item.
    Toggle {
        #[arg(long)]
        tenant: Uuid,

        #[arg(long, default_value = "default")]
        list: String,

        item: Uuid,
    },

    /// Check off every item on a list.
    Complete {
        #[arg(long)]
        tenant: Uuid,

        #[arg(long, default_value = "default")]
        list: String,
    },

    /// Manage a tenant's categories.
    Categories {
        #[command(subcommand)]
        action: CategoryAction,
    },
}

/// Category management subcommands.
#[derive(Subcommand)]
enum CategoryAction {
    /// List categories in display order.
    List {
        #[arg(long)]
        tenant: Uuid,
    },

    /// Add an auto-categorization keyword.
    AddKeyword {
        #[arg(long)]
        tenant: Uuid,

        /// Category name or id.
        category: String,

        keyword: String,
    },

    /// Remove an auto-categorization keyword.
    RemoveKeyword {
        #[arg(long)]
        tenant: Uuid,

        category: String,

        keyword: String,
    },

    /// Delete a category; its items move to "Other".
    Delete {
        #[arg(long)]
        tenant: Uuid,

        category: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "hearth=info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Categorize { name, tenant } => {
            category_cmd::run_categorize(&cfg, &name, tenant).await?;
        }
        Commands::Lists { tenant } => {
            list_cmd::run_lists(&cfg, tenant).await?;
        }
        Commands::NewList {
            tenant,
            name,
            default,
        } => {
            list_cmd::run_create_list(&cfg, tenant, &name, default).await?;
        }
        Commands::Add {
            tenant,
            list,
            name,
            quantity,
            unit,
            category,
            source,
            force,
        } => {
            let args = AddArgs {
                name,
                quantity,
                unit,
                category,
                source,
                force,
            };
            list_cmd::run_add(&cfg, tenant, &list, args).await?;
        }
        Commands::Items { tenant, list } => {
            list_cmd::run_items(&cfg, tenant, &list).await?;
        }
        Commands::Toggle { tenant, list, item } => {
            list_cmd::run_toggle(&cfg, tenant, &list, item).await?;
        }
        Commands::Complete { tenant, list } => {
            list_cmd::run_complete(&cfg, tenant, &list).await?;
        }
        Commands::Categories { action } => match action {
            CategoryAction::List { tenant } => {
                category_cmd::run_list(&cfg, tenant).await?;
            }
            CategoryAction::AddKeyword {
                tenant,
                category,
                keyword,
            } => {
                category_cmd::run_add_keyword(&cfg, tenant, &category, &keyword).await?;
            }
            CategoryAction::RemoveKeyword {
                tenant,
                category,
                keyword,
            } => {
                category_cmd::run_remove_keyword(&cfg, tenant, &category, &keyword).await?;
            }
            CategoryAction::Delete { tenant, category } => {
                category_cmd::run_delete(&cfg, tenant, &category).await?;
            }
        },
    }

    Ok(())
}
