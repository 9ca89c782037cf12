//! Keyword list editing.
//!
//! Keywords are stored trimmed and lowercase, and a keyword already present
//! in any letter case is never added twice. Two categories may share a
//! keyword; [`collisions`] reports such overlaps without rejecting them.

use crate::error::{ShoppingError, ShoppingResult};
use crate::models::ShoppingCategory;

pub fn normalize_keyword(keyword: &str) -> String {
    keyword.trim().to_lowercase()
}

/// Add `keyword` to `keywords`. Returns `false` if it was already present.
pub fn add_keyword(keywords: &mut Vec<String>, keyword: &str) -> ShoppingResult<bool> {
    let keyword = normalize_keyword(keyword);
    if keyword.is_empty() {
        return Err(ShoppingError::validation("keyword must not be empty"));
    }
    if keyword.chars().count() > 100 {
        return Err(ShoppingError::validation(
            "keyword must be at most 100 characters",
        ));
    }
    if keywords.iter().any(|k| k.to_lowercase() == keyword) {
        return Ok(false);
    }
    keywords.push(keyword);
    Ok(true)
}

/// Remove every case-variant of `keyword`. Returns `true` if any was removed.
pub fn remove_keyword(keywords: &mut Vec<String>, keyword: &str) -> bool {
    let keyword = normalize_keyword(keyword);
    let before = keywords.len();
    keywords.retain(|k| k.to_lowercase() != keyword);
    keywords.len() != before
}

/// Normalize a whole keyword list: lowercase, trim, drop blanks and repeats.
/// First occurrence order is kept.
pub fn normalize_keywords(keywords: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(keywords.len());
    for keyword in keywords {
        let keyword = normalize_keyword(keyword);
        if !keyword.is_empty() && !out.contains(&keyword) {
            out.push(keyword);
        }
    }
    out
}

/// Names of categories other than `category_name` that already carry `keyword`.
pub fn collisions<'a>(
    categories: &'a [ShoppingCategory],
    category_name: &str,
    keyword: &str,
) -> Vec<&'a str> {
    let keyword = normalize_keyword(keyword);
    categories
        .iter()
        .filter(|c| c.name != category_name)
        .filter(|c| c.keywords.iter().any(|k| k.to_lowercase() == keyword))
        .map(|c| c.name.as_str())
        .collect()
}
