//! Build-scoped page registry.
//!
//! The registry is the only state shared between files. The orchestrator
//! owns it and threads it by `&mut` through each transform; the entry pass
//! clears it and config harvesting appends to it.

use crate::descriptor::RouteDescriptor;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRegistry {
    pages: Vec<String>,
}

impl PageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.pages.clear();
    }

    /// Append a page path without its leading `./` or `/`. Duplicates are kept.
    pub fn register(&mut self, path: &str) {
        self.pages.push(remove_leading_slash(path).to_string());
    }

    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// The index route, if any page has been registered.
    pub fn first_page(&self) -> Option<&str> {
        self.pages.first().map(String::as_str)
    }

    /// Whether `page` (a source-relative path without extension) is registered.
    pub fn contains(&self, page: &str) -> bool {
        let page = remove_leading_slash(page);
        self.pages.iter().any(|p| p == page)
    }

    /// One route per registered page, in registration order.
    pub fn routes(&self) -> Vec<RouteDescriptor> {
        self.pages
            .iter()
            .enumerate()
            .map(|(index, page)| RouteDescriptor::new(page, index == 0))
            .collect()
    }
}

/// Strip one leading `/` or `./`.
pub fn remove_leading_slash(path: &str) -> &str {
    path.strip_prefix("./")
        .or_else(|| path.strip_prefix('/'))
        .unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_order_and_index() {
        let mut registry = PageRegistry::new();
        registry.register("pages/index/index");
        registry.register("/pages/detail/index");
        registry.register("./pages/index/index");

        assert_eq!(
            registry.pages(),
            &["pages/index/index", "pages/detail/index", "pages/index/index"]
        );
        let routes = registry.routes();
        assert_eq!(routes.len(), 3);
        assert!(routes[0].is_index);
        assert!(routes.iter().skip(1).all(|r| !r.is_index));
        assert_eq!(routes[1].path, "/pages/detail/index");
    }

    #[test]
    fn test_reset_and_contains() {
        let mut registry = PageRegistry::new();
        registry.register("pages/index/index");
        assert!(registry.contains("/pages/index/index"));
        assert!(!registry.contains("pages/index"));
        registry.reset();
        assert!(registry.is_empty());
        assert_eq!(registry.first_page(), None);
    }
}
