//! Base registry trait and implementation.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::RwLock;

use agentflow_protocols::error::RegistryError;

/// Trait for items that can be stored in a registry.
pub trait Registerable: Send + Sync {
    /// Returns the unique name for this item.
    fn registry_id(&self) -> &str;
}

/// Generic registry for managing items by name.
///
/// Names are unique: registering a second item under a taken name fails.
/// Registration order is remembered so listings are stable.
pub struct BaseRegistry<T: ?Sized + Registerable> {
    items: DashMap<String, Arc<T>>,
    order: RwLock<Vec<String>>,
}

impl<T: ?Sized + Registerable> BaseRegistry<T> {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            items: DashMap::new(),
            order: RwLock::new(Vec::new()),
        }
    }

    /// Register an item.
    ///
    /// Returns an error if an item with the same name is already registered.
    pub fn register(&self, item: Arc<T>) -> Result<(), RegistryError> {
        let id = item.registry_id().to_string();

        match self.items.entry(id.clone()) {
            Entry::Occupied(_) => Err(RegistryError::AlreadyRegistered(id)),
            Entry::Vacant(slot) => {
                slot.insert(item);
                self.order.write().push(id);
                Ok(())
            }
        }
    }

    /// Unregister an item by name.
    pub fn unregister(&self, id: &str) -> Result<Arc<T>, RegistryError> {
        let (_, item) = self
            .items
            .remove(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        self.order.write().retain(|name| name != id);
        Ok(item)
    }

    /// Get an item by name.
    pub fn get(&self, id: &str) -> Option<Arc<T>> {
        self.items.get(id).map(|item| item.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Registered names, in registration order.
    pub fn list_ids(&self) -> Vec<String> {
        self.order.read().clone()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Registered items, in registration order.
    pub fn items(&self) -> Vec<Arc<T>> {
        self.order
            .read()
            .iter()
            .filter_map(|id| self.get(id))
            .collect()
    }
}

impl<T: ?Sized + Registerable> Default for BaseRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "base_tests.rs"]
mod tests;
