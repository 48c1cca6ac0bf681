//! Rule registry.
//!
//! Maps a [`SchemaId`] to the merged [`RuleSet`] registered for it.
//! Registration normally happens during setup, before any evaluation, but
//! the registry is internally synchronized: every entry is replaced
//! copy-on-write, so a lookup returns a complete snapshot and never a
//! half-merged rule set.

mod manifest;

pub use manifest::{RuleManifest, SchemaManifest};

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::document::SchemaId;
use crate::rule::RuleSet;

/// Registry of rule sets keyed by schema.
///
/// # Example
///
/// ```rust
/// use fieldgate_core::{RuleRegistry, RuleSet, SchemaId};
///
/// struct Ctx;
///
/// let registry = RuleRegistry::<Ctx>::new();
/// let model = SchemaId::new("Model");
///
/// registry.add_rule(model.clone(), RuleSet::new().expose("a", true));
/// registry.add_rule(model.clone(), RuleSet::new().expose("b", false));
///
/// let rules = registry.get_rule(&model).unwrap();
/// assert!(rules.expose_rule_for("a").is_some());
/// assert!(rules.expose_rule_for("b").is_some());
/// ```
pub struct RuleRegistry<C> {
    rules: RwLock<HashMap<SchemaId, Arc<RuleSet<C>>>>,
}

impl<C: Send + Sync> RuleRegistry<C> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
        }
    }

    /// Register rules for a schema.
    ///
    /// Deep-merges into any existing entry; the newer registration wins on
    /// overlapping keys. Creates the entry if absent.
    pub fn add_rule(&self, schema: impl Into<SchemaId>, rule_set: RuleSet<C>) {
        let schema = schema.into();
        let mut rules = self.rules.write();

        let merged = match rules.get(&schema) {
            Some(existing) => {
                let mut merged = RuleSet::clone(existing);
                merged.merge(rule_set);
                merged
            }
            None => rule_set,
        };

        log::debug!("registered rules for {}: {:?}", schema, merged);
        rules.insert(schema, Arc::new(merged));
    }

    /// Look up the rules for a schema.
    ///
    /// The returned snapshot is unaffected by later registrations.
    pub fn get_rule(&self, schema: &SchemaId) -> Option<Arc<RuleSet<C>>> {
        self.rules.read().get(schema).cloned()
    }

    /// All schemas with registered rules, sorted by name.
    pub fn schemas(&self) -> Vec<SchemaId> {
        let mut schemas: Vec<_> = self.rules.read().keys().cloned().collect();
        schemas.sort();
        schemas
    }

    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// Register every schema entry of a manifest.
    pub fn load_manifest(&self, manifest: &RuleManifest) {
        for (schema, entry) in manifest.iter() {
            self.add_rule(SchemaId::new(schema), entry.to_rule_set());
        }
    }
}

impl<C: Send + Sync> Default for RuleRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Rule;

    struct Ctx;

    #[test]
    fn test_get_rule_absent() {
        let registry = RuleRegistry::<Ctx>::new();
        assert!(registry.get_rule(&SchemaId::new("Model")).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_add_rule_merges_sections() {
        let registry = RuleRegistry::<Ctx>::new();
        registry.add_rule("Model", RuleSet::new().expose("a", true).access(false));
        registry.add_rule("Model", RuleSet::new().allow_modification("b", false));

        let rules = registry.get_rule(&SchemaId::new("Model")).unwrap();
        assert!(matches!(rules.expose_rule_for("a"), Some(Rule::Fixed(true))));
        assert!(matches!(rules.modification_rule_for("b"), Some(Rule::Fixed(false))));
        assert!(matches!(rules.access_rule_ref(), Some(Rule::Fixed(false))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_newer_registration_wins_on_overlap() {
        let registry = RuleRegistry::<Ctx>::new();
        registry.add_rule("Model", RuleSet::new().expose("a", true));
        registry.add_rule("Model", RuleSet::new().expose("a", false));

        let rules = registry.get_rule(&SchemaId::new("Model")).unwrap();
        assert!(matches!(rules.expose_rule_for("a"), Some(Rule::Fixed(false))));
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_registration() {
        let registry = RuleRegistry::<Ctx>::new();
        registry.add_rule("Model", RuleSet::new().expose("a", true));

        let snapshot = registry.get_rule(&SchemaId::new("Model")).unwrap();
        registry.add_rule("Model", RuleSet::new().expose("b", false));

        let current = registry.get_rule(&SchemaId::new("Model")).unwrap();
        assert!(snapshot.expose_rule_for("b").is_none());
        assert!(current.expose_rule_for("b").is_some());
    }

    #[test]
    fn test_schemas_are_sorted() {
        let registry = RuleRegistry::<Ctx>::new();
        registry.add_rule("TopModel", RuleSet::new());
        registry.add_rule("Model", RuleSet::new());

        assert_eq!(
            registry.schemas(),
            vec![SchemaId::new("Model"), SchemaId::new("TopModel")]
        );
    }

    #[test]
    fn test_concurrent_registration_and_lookup() {
        let registry = Arc::new(RuleRegistry::<Ctx>::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    registry.add_rule("Model", RuleSet::new().expose(format!("f{}", i), true));
                    registry.get_rule(&SchemaId::new("Model")).is_some()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }

        let rules = registry.get_rule(&SchemaId::new("Model")).unwrap();
        for i in 0..8 {
            assert!(rules.expose_rule_for(&format!("f{}", i)).is_some());
        }
    }
}
