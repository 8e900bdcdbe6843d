//! Workflow registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::definition::WorkflowDefinition;

#[derive(Default)]
struct Entries {
    definitions: HashMap<String, Arc<WorkflowDefinition>>,
    order: Vec<String>,
}

/// Named store of workflow definitions.
///
/// Registering a name that already exists replaces the stored definition;
/// the name keeps its original position in [`list`](Self::list).
#[derive(Default)]
pub struct WorkflowRegistry {
    entries: RwLock<Entries>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a definition, returning the one it replaced.
    pub fn register(&self, definition: WorkflowDefinition) -> Option<Arc<WorkflowDefinition>> {
        let name = definition.name.clone();
        let mut entries = self.entries.write();
        let previous = entries
            .definitions
            .insert(name.clone(), Arc::new(definition));

        if previous.is_some() {
            info!(workflow = %name, "Replaced workflow definition");
        } else {
            debug!(workflow = %name, "Registered workflow");
            entries.order.push(name);
        }
        previous
    }

    pub fn get(&self, name: &str) -> Option<Arc<WorkflowDefinition>> {
        self.entries.read().definitions.get(name).cloned()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.entries.read().definitions.contains_key(name)
    }

    /// Registered names, in first-registration order.
    pub fn list(&self) -> Vec<String> {
        self.entries.read().order.clone()
    }

    /// Remove a definition, returning it if it was registered.
    pub fn deregister(&self, name: &str) -> Option<Arc<WorkflowDefinition>> {
        let mut entries = self.entries.write();
        let removed = entries.definitions.remove(name)?;
        entries.order.retain(|n| n != name);
        debug!(workflow = %name, "Deregistered workflow");
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.entries.read().definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::WorkflowBuilder;
    use crate::definition::{LeafConfig, TaskNodeConfig};

    fn workflow(name: &str, instruction: &str) -> WorkflowDefinition {
        WorkflowBuilder::new(name)
            .add_leaf(LeafConfig::new("only", instruction))
            .set_entry_point("only")
            .build()
            .unwrap()
    }

    #[test]
    fn test_register_and_get() {
        let registry = WorkflowRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.register(workflow("a", "x")).is_none());

        assert!(registry.exists("a"));
        assert!(!registry.exists("b"));
        assert_eq!(registry.get("a").unwrap().entry_point, "only");
        assert!(registry.get("b").is_none());
    }

    #[test]
    fn test_register_overwrites() {
        let registry = WorkflowRegistry::new();
        registry.register(workflow("a", "first"));
        let previous = registry.register(workflow("a", "second")).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(leaf_instruction(&previous), "first");
        assert_eq!(leaf_instruction(&registry.get("a").unwrap()), "second");
    }

    fn leaf_instruction(def: &WorkflowDefinition) -> String {
        match def.node("only") {
            Some(TaskNodeConfig::Leaf(leaf)) => leaf.instruction.clone(),
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn test_list_keeps_first_registration_order() {
        let registry = WorkflowRegistry::new();
        registry.register(workflow("b", "x"));
        registry.register(workflow("a", "x"));
        registry.register(workflow("b", "y"));
        assert_eq!(registry.list(), vec!["b", "a"]);
    }

    #[test]
    fn test_deregister() {
        let registry = WorkflowRegistry::new();
        registry.register(workflow("a", "x"));
        registry.register(workflow("b", "x"));

        assert!(registry.deregister("a").is_some());
        assert!(registry.deregister("a").is_none());
        assert_eq!(registry.list(), vec!["b"]);
        assert!(!registry.exists("a"));
    }
}
