//! Keyword-based auto-categorization.
//!
//! A name is matched against an ordered list of [`CategoryRule`]s. A rule
//! matches when one of its keywords occurs, case-insensitively, anywhere in
//! the name.
//!
//! # Tie-breaking
//!
//! 1. The longest matching keyword wins, so `"tinned tomatoes"` (Pantry)
//!    beats `"tomato"` (Produce) for "Tinned Tomatoes".
//! 2. Between equally long matches the earlier rule wins. A keyword shared
//!    verbatim by two categories therefore always resolves to the one with
//!    the lower `sort_order`.
//! 3. No match yields [`OTHER_CATEGORY`].

use serde::Serialize;

use crate::models::{ShoppingCategory, OTHER_CATEGORY};

/// A category name and the keywords that select it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
    /// Position in the rule list; callers pass rules sorted by this.
    pub sort_order: i64,
}

impl From<&ShoppingCategory> for CategoryRule {
    fn from(category: &ShoppingCategory) -> Self {
        Self {
            name: category.name.clone(),
            keywords: category.keywords.clone(),
            sort_order: category.sort_order,
        }
    }
}

/// Build rules from stored categories, ordered by `sort_order` then name.
pub fn rules_from_categories(categories: &[ShoppingCategory]) -> Vec<CategoryRule> {
    let mut rules: Vec<CategoryRule> = categories.iter().map(CategoryRule::from).collect();
    rules.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then(a.name.cmp(&b.name)));
    rules
}

/// The rule and keyword that decided a categorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryMatch<'a> {
    pub category: &'a str,
    pub keyword: &'a str,
}

/// Find the winning rule for `name`, if any. Rules are read in slice order.
pub fn best_match<'a>(name: &str, rules: &'a [CategoryRule]) -> Option<CategoryMatch<'a>> {
    let name_lower = name.to_lowercase();
    let mut best: Option<(CategoryMatch<'a>, usize)> = None;

    for rule in rules {
        for keyword in &rule.keywords {
            let keyword_lower = keyword.to_lowercase();
            if keyword_lower.is_empty() || !name_lower.contains(&keyword_lower) {
                continue;
            }
            let len = keyword_lower.chars().count();
            if best.as_ref().map_or(true, |(_, best_len)| len > *best_len) {
                best = Some((
                    CategoryMatch {
                        category: &rule.name,
                        keyword,
                    },
                    len,
                ));
            }
        }
    }

    best.map(|(m, _)| m)
}

/// Map a free-text item name to a category name.
pub fn categorize(name: &str, rules: &[CategoryRule]) -> String {
    best_match(name, rules)
        .map(|m| m.category.to_string())
        .unwrap_or_else(|| OTHER_CATEGORY.to_string())
}
