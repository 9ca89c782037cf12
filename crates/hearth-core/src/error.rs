//! Error taxonomy for shopping-list operations.
//!
//! Validation and lookup failures are raised before any mutation. Store
//! failures are carried through untouched; nothing in this crate retries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShoppingError {
    /// Malformed input (empty name, negative quantity, bad color...).
    #[error("invalid request: {0}")]
    Validation(String),

    /// The list, item, or category does not exist for the tenant.
    #[error("{0} not found")]
    NotFound(String),

    /// The request is well-formed but clashes with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub type ShoppingResult<T> = Result<T, ShoppingError>;

impl ShoppingError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}
