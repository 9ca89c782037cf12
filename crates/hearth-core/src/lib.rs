//! # Hearth Core
//!
//! Shared shopping-list logic for Hearth: data models, the keyword
//! categorizer, the duplicate reconciler, category management, and the
//! store abstraction they all run against.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem dependencies.
//! Persistence is reached only through the [`store::Store`] trait; an
//! [`store::memory::InMemoryStore`] is provided for tests and embedding.

pub mod categories;
pub mod categorize;
pub mod defaults;
pub mod error;
pub mod items;
pub mod keywords;
pub mod lists;
pub mod models;
pub mod reconcile;
pub mod store;

pub use categorize::{categorize, CategoryRule};
pub use error::{ShoppingError, ShoppingResult};
pub use models::{ItemSource, Quantity, ShoppingCategory, ShoppingItem, ShoppingList};
pub use reconcile::{add_item, normalize_name, AddItemRequest, AddOutcome, ReconcilePolicy};
