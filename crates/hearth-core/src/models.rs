//! Core data models used throughout Hearth.
//!
//! Timestamps are UTC. Quantities are exact decimals; the "no quantity
//! given" case is modelled by [`Quantity`] and resolved at the request
//! boundary, so stored items always carry a concrete amount.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ShoppingError;

/// Category assigned when nothing else matches. Cannot be deleted.
pub const OTHER_CATEGORY: &str = "Other";

/// Where an item entered the list from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSource {
    #[default]
    Manual,
    Alexa,
    Recipe,
    /// Set when a later add was merged into an existing row.
    Multiple,
}

impl ItemSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemSource::Manual => "manual",
            ItemSource::Alexa => "alexa",
            ItemSource::Recipe => "recipe",
            ItemSource::Multiple => "multiple",
        }
    }
}

impl fmt::Display for ItemSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemSource {
    type Err = ShoppingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(ItemSource::Manual),
            "alexa" => Ok(ItemSource::Alexa),
            "recipe" => Ok(ItemSource::Recipe),
            "multiple" => Ok(ItemSource::Multiple),
            other => Err(ShoppingError::validation(format!(
                "unknown item source '{}': must be manual, alexa, recipe, or multiple",
                other
            ))),
        }
    }
}

/// A requested quantity that keeps "not given" apart from zero.
///
/// Serialized as an optional decimal: `null` or a missing field is
/// [`Quantity::Unspecified`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<Decimal>", into = "Option<Decimal>")]
pub enum Quantity {
    #[default]
    Unspecified,
    Amount(Decimal),
}

impl Quantity {
    /// Amount used when the caller gave none.
    pub const DEFAULT_AMOUNT: Decimal = Decimal::ONE;

    pub fn resolve(self) -> Decimal {
        match self {
            Quantity::Unspecified => Self::DEFAULT_AMOUNT,
            Quantity::Amount(amount) => amount,
        }
    }

    pub fn is_negative(self) -> bool {
        matches!(self, Quantity::Amount(amount) if amount.is_sign_negative() && !amount.is_zero())
    }
}

impl From<Option<Decimal>> for Quantity {
    fn from(value: Option<Decimal>) -> Self {
        value.map_or(Quantity::Unspecified, Quantity::Amount)
    }
}

impl From<Quantity> for Option<Decimal> {
    fn from(value: Quantity) -> Self {
        match value {
            Quantity::Unspecified => None,
            Quantity::Amount(amount) => Some(amount),
        }
    }
}

impl From<Decimal> for Quantity {
    fn from(value: Decimal) -> Self {
        Quantity::Amount(value)
    }
}

/// A named shopping list owned by one tenant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShoppingList {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A list plus its item counts, for overview screens.
#[derive(Debug, Clone, Serialize)]
pub struct ListSummary {
    pub id: Uuid,
    pub name: String,
    pub is_default: bool,
    pub item_count: u64,
    pub checked_count: u64,
    pub updated_at: DateTime<Utc>,
}

/// One line on a shopping list.
///
/// `checked_at` is `Some` exactly when `checked` is true; use
/// [`ShoppingItem::set_checked`] rather than writing the fields directly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShoppingItem {
    pub id: Uuid,
    pub list_id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub name_normalized: String,
    pub quantity: Decimal,
    pub unit: Option<String>,
    pub category: String,
    pub checked: bool,
    pub checked_at: Option<DateTime<Utc>>,
    pub source: ItemSource,
    pub recipe_id: Option<Uuid>,
    pub added_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShoppingItem {
    pub fn set_checked(&mut self, checked: bool, now: DateTime<Utc>) {
        self.checked = checked;
        self.checked_at = if checked { Some(now) } else { None };
        self.updated_at = now;
    }

    /// Hours elapsed since the item was checked, rounded to one decimal.
    pub fn hours_since_checked(&self, now: DateTime<Utc>) -> Option<f64> {
        self.checked_at.map(|at| {
            let hours = (now - at).num_seconds() as f64 / 3600.0;
            (hours * 10.0).round() / 10.0
        })
    }
}

/// A tenant's category with its auto-categorization keywords.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShoppingCategory {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub icon: String,
    pub color: String,
    /// Lowercase, deduplicated, in insertion order.
    pub keywords: Vec<String>,
    pub sort_order: i64,
    /// True for rows seeded from the built-in defaults.
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn item(now: DateTime<Utc>) -> ShoppingItem {
        ShoppingItem {
            id: Uuid::new_v4(),
            list_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "Milk".to_string(),
            name_normalized: "milk".to_string(),
            quantity: Decimal::ONE,
            unit: None,
            category: "Dairy".to_string(),
            checked: false,
            checked_at: None,
            source: ItemSource::Manual,
            recipe_id: None,
            added_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_quantity_unspecified_resolves_to_one() {
        assert_eq!(Quantity::Unspecified.resolve(), Decimal::ONE);
        assert_eq!(Quantity::Amount(Decimal::ZERO).resolve(), Decimal::ZERO);
    }

    #[test]
    fn test_quantity_negative() {
        assert!(Quantity::Amount(Decimal::new(-5, 1)).is_negative());
        assert!(!Quantity::Amount(Decimal::ZERO).is_negative());
        assert!(!Quantity::Unspecified.is_negative());
    }

    #[test]
    fn test_quantity_deserializes_from_optional_decimal() {
        let q: Quantity = serde_json::from_str("null").unwrap();
        assert_eq!(q, Quantity::Unspecified);
        let q: Quantity = serde_json::from_str("\"2.5\"").unwrap();
        assert_eq!(q, Quantity::Amount(Decimal::new(25, 1)));
    }

    #[test]
    fn test_source_parse() {
        assert_eq!("alexa".parse::<ItemSource>().unwrap(), ItemSource::Alexa);
        assert!("fridge".parse::<ItemSource>().is_err());
        assert_eq!(ItemSource::Multiple.to_string(), "multiple");
    }

    #[test]
    fn test_set_checked_keeps_timestamp_in_step() {
        let now = Utc::now();
        let mut it = item(now);
        it.set_checked(true, now);
        assert!(it.checked);
        assert_eq!(it.checked_at, Some(now));
        it.set_checked(false, now);
        assert!(!it.checked);
        assert!(it.checked_at.is_none());
    }

    #[test]
    fn test_hours_since_checked_rounds() {
        let now = Utc::now();
        let mut it = item(now);
        assert!(it.hours_since_checked(now).is_none());
        it.set_checked(true, now - Duration::minutes(135));
        assert_eq!(it.hours_since_checked(now), Some(2.3));
    }
}
