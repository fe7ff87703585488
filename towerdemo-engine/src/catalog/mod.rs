//! Scenario catalog: the ordered, immutable collection of demo scripts.
//!
//! The catalog is assembled once at startup from built-in scenarios plus
//! any scenario files found on disk, and never changes afterwards. Tour
//! mode plays the catalog in order.

pub mod loader;
pub mod templates;

pub use loader::ScenarioLoader;
pub use templates::BuiltinScenarios;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use towerdemo_shared::scenario::Scenario;

/// Ordered scenario collection with id lookup.
#[derive(Debug, Clone, Default)]
pub struct ScenarioCatalog {
    scenarios: Vec<Arc<Scenario>>,
    by_id: HashMap<String, usize>,
}

impl ScenarioCatalog {
    /// Build a catalog from an ordered scenario list. A scenario whose id
    /// was already seen replaces the earlier entry in place, keeping the
    /// earlier tour position; this lets user files override built-ins.
    pub fn new(scenarios: Vec<Scenario>) -> Self {
        let mut catalog = Self::default();
        for scenario in scenarios {
            catalog.insert(scenario);
        }
        catalog
    }

    /// Standard assembly: built-in scenarios first (in their authored
    /// order), then loaded files, which may override built-ins by id.
    pub fn assemble(builtins: &BuiltinScenarios, loader: &ScenarioLoader) -> Self {
        let mut catalog = Self::new(builtins.all());
        for scenario in loader.load_all() {
            catalog.insert(scenario);
        }
        info!("Scenario catalog ready with {} scenarios", catalog.len());
        catalog
    }

    fn insert(&mut self, scenario: Scenario) {
        let id = scenario.id.clone();
        match self.by_id.get(&id) {
            Some(&index) => {
                debug!("Scenario '{}' overrides an earlier catalog entry", id);
                self.scenarios[index] = Arc::new(scenario);
            }
            None => {
                self.by_id.insert(id, self.scenarios.len());
                self.scenarios.push(Arc::new(scenario));
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<Scenario>> {
        self.by_id
            .get(id)
            .map(|&index| Arc::clone(&self.scenarios[index]))
    }

    pub fn at(&self, index: usize) -> Option<&Arc<Scenario>> {
        self.scenarios.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Scenario>> {
        self.scenarios.iter()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_preserves_insertion_order() {
        let catalog = ScenarioCatalog::new(vec![
            Scenario::new("one", "One", ""),
            Scenario::new("two", "Two", ""),
        ]);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.at(0).unwrap().id, "one");
        assert_eq!(catalog.at(1).unwrap().id, "two");
    }

    #[test]
    fn duplicate_id_overrides_in_place() {
        let catalog = ScenarioCatalog::new(vec![
            Scenario::new("one", "Original", ""),
            Scenario::new("two", "Two", ""),
            Scenario::new("one", "Override", ""),
        ]);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.at(0).unwrap().title, "Override");
        assert_eq!(catalog.get("one").unwrap().title, "Override");
    }

    #[test]
    fn unknown_id_lookup_is_none() {
        let catalog = ScenarioCatalog::new(vec![]);
        assert!(catalog.get("missing").is_none());
        assert!(catalog.is_empty());
    }
}
