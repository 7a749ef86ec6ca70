use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::script::ScriptFunction;

/// Counter-keyed table of script functions backing native callback
/// wrappers.
///
/// Entries are added once per distinct callback wrapper and never removed,
/// so the table grows with the number of wrappers created (not with the
/// number of calls made).
#[derive(Default)]
pub struct DelegateRegistry {
    counter: AtomicU64,
    functions: RwLock<HashMap<u64, ScriptFunction>>,
}

impl DelegateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retain `function` and return its id. Ids start at 1 and only grow.
    pub fn add(&self, function: ScriptFunction) -> u64 {
        let id = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        self.functions.write().insert(id, function);
        id
    }

    pub fn get(&self, id: u64) -> Option<ScriptFunction> {
        self.functions.read().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.functions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.read().is_empty()
    }
}
