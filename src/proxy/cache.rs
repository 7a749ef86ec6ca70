use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

use super::definition::ProxyDefinition;

/// Type → definition memo table.
///
/// Lookups take the read lock. Definitions are built outside the lock and
/// inserted first-writer-wins, so a type never ends up with two live
/// definitions even when two threads race to build it.
#[derive(Default)]
pub struct ProxyCache {
    definitions: RwLock<HashMap<TypeId, Arc<ProxyDefinition>>>,
    builds: AtomicUsize,
}

impl ProxyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, type_id: TypeId) -> Option<Arc<ProxyDefinition>> {
        self.definitions.read().get(&type_id).cloned()
    }

    /// Insert a freshly built definition unless one is already present, and
    /// return whichever definition is cached.
    pub(crate) fn insert(&self, definition: ProxyDefinition) -> Arc<ProxyDefinition> {
        self.builds.fetch_add(1, Ordering::Relaxed);
        let type_id = definition.class().id();
        self.definitions
            .write()
            .entry(type_id)
            .or_insert_with(|| Arc::new(definition))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.definitions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.read().is_empty()
    }

    /// Number of definitions built so far, including any that lost an
    /// insertion race.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }
}
