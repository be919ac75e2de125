//! Filter composition for internship search.
//!
//! Turns a [`SearchFilters`] record into a `WHERE` clause plus bound
//! parameters over the `internships` table (aliased `i`). User text is always
//! bound, never spliced into SQL, and is LIKE-escaped before it is wrapped in
//! `%...%` so `%`, `_` and `\` only ever match themselves.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_INPUT_LEN: usize = 100;

/// The escape character declared in every composed `LIKE ... ESCAPE` clause.
const LIKE_ESCAPE: char = '\\';

/// SQL scalar function that lowercases with the same Unicode rules as
/// `str::to_lowercase`. The store registers it on every connection.
pub const FOLD_FN: &str = "ulower";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub keyword: String,
    pub location: String,
    pub industry: String,
    /// `Some(true)` restricts to remote postings; `None`/`Some(false)` do not filter.
    pub is_remote: Option<bool>,
    /// `Some(true)` restricts to paid postings; `None`/`Some(false)` do not filter.
    pub is_paid: Option<bool>,
}

impl SearchFilters {
    /// Filters prefilled from a free-text query, e.g. the home page search box.
    pub fn from_query(q: &str) -> Self {
        Self {
            keyword: q.to_string(),
            ..Default::default()
        }
    }

    /// True when no filter would restrict the result set.
    pub fn is_empty(&self) -> bool {
        self.keyword.trim().is_empty()
            && self.location.trim().is_empty()
            && self.industry.trim().is_empty()
            && self.is_remote != Some(true)
            && self.is_paid != Some(true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedQuery {
    /// Conjunction of predicates, starting with `i.is_active = 1`.
    pub where_sql: String,
    pub params: Vec<String>,
}

/// Escape LIKE metacharacters so the value matches literally.
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out
}

/// Trim, cap at `max_len` characters, then LIKE-escape.
pub fn sanitize_search_input(input: &str, max_len: usize) -> String {
    let capped: String = input.trim().chars().take(max_len).collect();
    escape_like(&capped)
}

/// Compose the search predicate for `filters`.
///
/// Substring clauses compare `ulower(column)` to a pattern lowered by the same
/// rules, so matching is case-insensitive for all of Unicode. Ordering is left
/// to the caller.
pub fn compose(filters: &SearchFilters, max_len: usize) -> ComposedQuery {
    let mut clauses = vec!["i.is_active = 1".to_string()];
    let mut params: Vec<String> = vec![];

    let keyword = sanitize_search_input(&filters.keyword, max_len);
    if !keyword.is_empty() {
        params.push(format!("%{}%", keyword.to_lowercase()));
        let n = params.len();
        clauses.push(format!(
            "({FOLD_FN}(i.title) LIKE ?{n} ESCAPE '\\' OR {FOLD_FN}(i.description) LIKE ?{n} ESCAPE '\\')"
        ));
    }

    let location = sanitize_search_input(&filters.location, max_len);
    if !location.is_empty() {
        params.push(format!("%{}%", location.to_lowercase()));
        clauses.push(format!("{}(i.location) LIKE ?{} ESCAPE '\\'", FOLD_FN, params.len()));
    }

    let industry = filters.industry.trim();
    if !industry.is_empty() {
        params.push(industry.to_string());
        clauses.push(format!("i.industry = ?{}", params.len()));
    }

    if filters.is_remote == Some(true) {
        clauses.push("i.is_remote = 1".to_string());
    }

    if filters.is_paid == Some(true) {
        clauses.push("i.is_paid = 1".to_string());
    }

    ComposedQuery {
        where_sql: clauses.join(" AND "),
        params,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_metacharacters() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("snake_case"), "snake\\_case");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_sanitize_trims_and_caps() {
        assert_eq!(sanitize_search_input("  rust  ", 100), "rust");
        assert_eq!(sanitize_search_input(&"a".repeat(150), 100).len(), 100);
        // The cap applies before escaping, and counts characters not bytes.
        assert_eq!(sanitize_search_input("ééé%", 3), "ééé");
        assert_eq!(sanitize_search_input("%%", 100), "\\%\\%");
    }

    #[test]
    fn test_empty_filters_only_restrict_active() {
        let q = compose(&SearchFilters::default(), DEFAULT_MAX_INPUT_LEN);
        assert_eq!(q.where_sql, "i.is_active = 1");
        assert!(q.params.is_empty());
        assert!(SearchFilters::default().is_empty());
    }

    #[test]
    fn test_keyword_binds_one_param_for_both_columns() {
        let q = compose(&SearchFilters::from_query("Rust_Dev"), DEFAULT_MAX_INPUT_LEN);
        assert_eq!(q.params, vec!["%rust\\_dev%".to_string()]);
        assert!(q.where_sql.contains("ulower(i.title) LIKE ?1"));
        assert!(q.where_sql.contains("ulower(i.description) LIKE ?1"));
    }

    #[test]
    fn test_params_are_numbered_in_order() {
        let filters = SearchFilters {
            keyword: "data".to_string(),
            location: "NYC".to_string(),
            industry: "Finance".to_string(),
            is_remote: Some(true),
            is_paid: Some(true),
        };
        let q = compose(&filters, DEFAULT_MAX_INPUT_LEN);
        assert_eq!(
            q.params,
            vec!["%data%".to_string(), "%nyc%".to_string(), "Finance".to_string()]
        );
        assert!(q.where_sql.contains("ulower(i.location) LIKE ?2"));
        assert!(q.where_sql.contains("i.industry = ?3"));
        assert!(q.where_sql.contains("i.is_remote = 1"));
        assert!(q.where_sql.contains("i.is_paid = 1"));
        assert!(!filters.is_empty());
    }

    #[test]
    fn test_false_flags_do_not_filter() {
        let filters = SearchFilters {
            is_remote: Some(false),
            is_paid: Some(false),
            ..Default::default()
        };
        let q = compose(&filters, DEFAULT_MAX_INPUT_LEN);
        assert_eq!(q.where_sql, "i.is_active = 1");
        assert!(filters.is_empty());
    }

    #[test]
    fn test_whitespace_only_text_is_ignored() {
        let filters = SearchFilters {
            keyword: "   ".to_string(),
            location: "\t".to_string(),
            industry: " ".to_string(),
            ..Default::default()
        };
        assert!(compose(&filters, DEFAULT_MAX_INPUT_LEN).params.is_empty());
    }
}
