use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::Config;
use crate::store::TableStore;

/// Builds a store client from a parsed connection config.
pub type StoreFactory = Box<dyn Fn(&Config) -> Arc<dyn TableStore> + Send + Sync>;

/// Client cache keyed by app id: one store per credential, created on first
/// open and kept for the life of the cache. Owned by whatever wires up
/// connections and passed into [`Driver`](crate::Driver) explicitly.
pub struct StoreCache {
    factory: StoreFactory,
    entries: Mutex<HashMap<String, Arc<dyn TableStore>>>,
}

impl StoreCache {
    pub fn new(factory: StoreFactory) -> StoreCache {
        StoreCache {
            factory,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the store for this config's app id, building it on first use.
    pub fn obtain(&self, config: &Config) -> Arc<dyn TableStore> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .entry(config.app_id.clone())
            .or_insert_with(|| (self.factory)(config))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
