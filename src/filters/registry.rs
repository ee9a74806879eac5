//! The node factory.
//!
//! Maps an operation id such as `metaops:saturation` to a constructor and the
//! metadata that constructor produces. [`FilterRegistry::instantiate`] is the
//! only way hosts and composites should obtain nodes, because it attaches
//! them.

use crate::core::error::BuildError;
use crate::core::node::{Category, FilterNode, NodeMetadata};
use indexmap::IndexMap;
use std::sync::Arc;

pub type FilterFactory = Arc<dyn Fn() -> Box<dyn FilterNode> + Send + Sync>;

#[derive(Clone)]
struct Entry {
    factory: FilterFactory,
    /// Captured at registration so listings never build a node.
    metadata: NodeMetadata,
}

/// Registered operations, in registration order.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    entries: IndexMap<String, Entry>,
}

impl FilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages, proxies, file I/O and composites.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::filters::builtin::register_all(&mut registry);
        crate::filters::meta::register_all(&mut registry);
        log::debug!("registry holds {} operation(s)", registry.len());
        registry
    }

    /// Add an operation. A second registration of the same id replaces the
    /// first.
    pub fn register<F>(&mut self, factory: F)
    where
        F: Fn() -> Box<dyn FilterNode> + Send + Sync + 'static,
    {
        let metadata = factory().metadata();
        let id = metadata.id.clone();
        let entry = Entry {
            factory: Arc::new(factory),
            metadata,
        };
        if self.entries.insert(id.clone(), entry).is_some() {
            log::warn!("'{}' registered twice; keeping the later one", id);
        }
    }

    /// A fresh node, not yet attached. `None` for unknown ids.
    pub fn create(&self, id: &str) -> Option<Box<dyn FilterNode>> {
        self.entries.get(id).map(|e| (e.factory)())
    }

    /// A fresh node, attached to this registry.
    pub fn instantiate(&self, id: &str) -> Result<Box<dyn FilterNode>, BuildError> {
        let mut node = self
            .create(id)
            .ok_or_else(|| BuildError::UnknownOperation(id.to_string()))?;
        node.attach(self)?;
        log::debug!("instantiated '{}'", id);
        Ok(node)
    }

    pub fn get_metadata(&self, id: &str) -> Option<&NodeMetadata> {
        self.entries.get(id).map(|e| &e.metadata)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn filter_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Operations of one category, in registration order.
    pub fn filters_by_category(&self, category: Category) -> Vec<&NodeMetadata> {
        self.entries
            .values()
            .filter(|e| e.metadata.category == category)
            .map(|e| &e.metadata)
            .collect()
    }

    /// Non-empty categories in [`Category::ALL`] order.
    pub fn grouped_by_category(&self) -> Vec<(Category, Vec<&NodeMetadata>)> {
        Category::ALL
            .into_iter()
            .map(|category| (category, self.filters_by_category(category)))
            .filter(|(_, members)| !members.is_empty())
            .collect()
    }

    /// Case-insensitive match on id, name, description and tags.
    pub fn search(&self, query: &str) -> Vec<&str> {
        let query = query.to_lowercase();
        let hit = |text: &str| text.to_lowercase().contains(&query);

        self.entries
            .iter()
            .filter(|(_, e)| {
                let m = &e.metadata;
                hit(&m.id) || hit(&m.name) || hit(&m.description) || m.tags.iter().any(|t| hit(t))
            })
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn unregister(&mut self, id: &str) -> bool {
        self.entries.shift_remove(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::ProxyNode;

    fn ids(metadata: Vec<&NodeMetadata>) -> Vec<&str> {
        metadata.into_iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_unknown_operation() {
        let registry = FilterRegistry::new();
        assert_eq!(
            registry.instantiate("metaops:vignette").err(),
            Some(BuildError::UnknownOperation("metaops:vignette".to_string()))
        );
    }

    #[test]
    fn test_builtins_instantiate() {
        let registry = FilterRegistry::with_builtins();

        for id in [
            "metaops:saturation",
            "metaops:brightness-contrast",
            "metaops:color-temperature",
            "metaops:hue-chroma",
            "metaops:unsharp-mask",
            "metaops:load-image",
            "metaops:save-image",
            "metaops:common-adjustments",
            ProxyNode::INPUT_ID,
            ProxyNode::OUTPUT_ID,
        ] {
            assert!(registry.instantiate(id).is_ok(), "{}", id);
        }
    }

    #[test]
    fn test_grouping() {
        let registry = FilterRegistry::with_builtins();

        assert_eq!(
            ids(registry.filters_by_category(Category::Generic)),
            vec!["metaops:common-adjustments"]
        );
        let grouped = registry.grouped_by_category();
        assert_eq!(grouped[0].0, Category::Input);
        assert!(grouped.iter().all(|(_, members)| !members.is_empty()));
    }

    #[test]
    fn test_search() {
        let registry = FilterRegistry::with_builtins();

        assert!(registry.search("UNSHARP").contains(&"metaops:unsharp-mask"));
        assert!(registry.search("nonexistent").is_empty());
    }

    #[test]
    fn test_unregister() {
        let mut registry = FilterRegistry::new();
        registry.register(|| Box::new(ProxyNode::Output));
        assert!(registry.create(ProxyNode::OUTPUT_ID).is_some());

        assert!(registry.unregister(ProxyNode::OUTPUT_ID));
        assert!(!registry.contains(ProxyNode::OUTPUT_ID));
        assert!(registry.create(ProxyNode::OUTPUT_ID).is_none());
        assert!(registry.filters_by_category(Category::Utility).is_empty());
        assert!(!registry.unregister(ProxyNode::OUTPUT_ID));
    }
}
