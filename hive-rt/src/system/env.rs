// Layer 1: Standard library imports
use std::collections::HashMap;

// Layer 2: Third-party crate imports
use dashmap::DashMap;

// Layer 3: Internal module imports
// (none)

/// String-keyed node environment table (the GETENV/SETENV surface).
///
/// Writes are rare; the sharded map keeps concurrent reads cheap without a
/// dedicated lock-ordering story.
pub(crate) struct Env {
    vars: DashMap<String, String>,
}

impl Env {
    pub(crate) fn new(seed: HashMap<String, String>) -> Self {
        let vars = DashMap::new();
        for (key, value) in seed {
            vars.insert(key, value);
        }
        Env { vars }
    }

    pub(crate) fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).map(|entry| entry.value().clone())
    }

    pub(crate) fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }
}
