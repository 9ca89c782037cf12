//! # Hearth
//!
//! A household shopping-list service. Items added to a list are filed under
//! a category by keyword, merged into an existing unchecked entry with the
//! same name, or flagged when the same thing was bought within the last day.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────┐   ┌──────────┐
//!   │   CLI    │   │   HTTP   │
//!   │ (hearth) │   │  (axum)  │
//!   └────┬─────┘   └────┬─────┘
//!        └──────┬───────┘
//!               ▼
//!      ┌─────────────────┐   ┌──────────────┐
//!      │ ShoppingService │──▶│ hearth-core  │
//!      │ per-list locks  │   │ reconcile,   │
//!      └────────┬────────┘   │ categorize   │
//!               ▼            └──────────────┘
//!        ┌─────────────┐
//!        │   SQLite    │
//!        └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! hearth init
//! hearth add --tenant $TENANT --list default "Milk" --quantity 2
//! hearth items --tenant $TENANT --list default
//! hearth serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite implementation of the core `Store` trait |
//! | [`shopping`] | Service layer shared by the CLI and the server |
//! | [`auth`] | Bearer JWT verification |
//! | [`server`] | HTTP API |
//! | [`list_cmd`] | List and item CLI commands |
//! | [`category_cmd`] | Category CLI commands |

pub mod auth;
pub mod category_cmd;
pub mod config;
pub mod db;
pub mod list_cmd;
pub mod migrate;
pub mod server;
pub mod shopping;
pub mod sqlite_store;
