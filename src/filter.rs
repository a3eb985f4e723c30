//! Filter context: the (query, category) pair that scopes one feed window.

use serde::Serialize;

use crate::item::normalize_category;

/// Category sentinel meaning "no category filter".
pub const ALL_CATEGORIES: &str = "all";

/// Always stored normalized: query trimmed, category trimmed + lowercased,
/// with "all" collapsed to the empty string. The query keeps its case for
/// display; equality compares it lowercased since matching ignores case.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FilterContext {
    query: String,
    category: String,
}

impl FilterContext {
    pub fn new(query: &str, category: &str) -> Self {
        let mut category = normalize_category(category);
        if category == ALL_CATEGORIES {
            category.clear();
        }
        Self {
            query: query.trim().to_string(),
            category,
        }
    }

    /// Unfiltered context.
    pub fn all() -> Self {
        Self::default()
    }

    /// Build from optional request parameters (missing = empty).
    pub fn from_params(q: Option<&str>, category: Option<&str>) -> Self {
        Self::new(q.unwrap_or_default(), category.unwrap_or_default())
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn is_unfiltered(&self) -> bool {
        self.query.is_empty() && self.category.is_empty()
    }

    /// Lowercased needle used for case-insensitive matching.
    pub(crate) fn query_lower(&self) -> String {
        self.query.to_lowercase()
    }

    /// Query-string pairs as the search control would share them:
    /// `q` and `category` are emitted only when they filter something.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::with_capacity(2);
        if !self.query.is_empty() {
            out.push(("q", self.query.clone()));
        }
        if !self.category.is_empty() {
            out.push(("category", self.category.clone()));
        }
        out
    }
}

impl PartialEq for FilterContext {
    fn eq(&self, other: &Self) -> bool {
        self.category == other.category && self.query_lower() == other.query_lower()
    }
}

impl Eq for FilterContext {}

impl std::hash::Hash for FilterContext {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.query_lower().hash(state);
        self.category.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_and_category_are_normalized() {
        let c = FilterContext::new("  Climate  ", "Tech");
        assert_eq!(c.query(), "Climate");
        assert_eq!(c.category(), "tech");
        assert_eq!(
            c.to_query_pairs(),
            vec![("q", "Climate".to_string()), ("category", "tech".to_string())]
        );
    }

    #[test]
    fn all_and_empty_category_are_the_same_context() {
        assert_eq!(FilterContext::new("", "All"), FilterContext::new(" ", ""));
        assert!(FilterContext::new("", " ALL ").is_unfiltered());
        assert!(FilterContext::all().to_query_pairs().is_empty());
    }

    #[test]
    fn equality_uses_normalized_fields() {
        assert_eq!(
            FilterContext::new("rates ", "Business"),
            FilterContext::new(" rates", "business")
        );
        assert_eq!(
            FilterContext::new("Rates", "business"),
            FilterContext::new("rates", "business")
        );
        assert_ne!(
            FilterContext::new("rates", "business"),
            FilterContext::new("rates", "sports")
        );
    }
}
