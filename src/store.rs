use crate::ttl::TtlManager;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// The shared keyspace: a flat string->bytes map plus its TTL index.
///
/// Keyspace and TTL manager are deliberately one struct behind one lock —
/// per the concurrency model, a command's read-modify-write against both
/// must appear as a single atomic step to other commands.
#[derive(Debug, Default)]
pub struct Keyspace {
    data: HashMap<String, Vec<u8>>,
    pub ttl: TtlManager,
}

impl Keyspace {
    pub fn new() -> Self {
        Keyspace {
            data: HashMap::new(),
            ttl: TtlManager::new(),
        }
    }

    /// Lazy-expiring read: if the key's deadline has passed, evict it and
    /// return `None`; otherwise return its value.
    pub fn get(&mut self, key: &str) -> Option<&[u8]> {
        if self.ttl.is_expired(key) {
            self.data.remove(key);
            self.ttl.remove_ttl(key);
            return None;
        }
        self.data.get(key).map(|v| v.as_slice())
    }

    /// Pure liveness check that does not evict. `EXISTS` must not mutate
    /// the keyspace as a side effect of counting.
    pub fn is_live(&self, key: &str) -> bool {
        self.data.contains_key(key) && !self.ttl.is_expired(key)
    }

    /// Store `key = value`, clearing any prior deadline.
    pub fn set(&mut self, key: String, value: Vec<u8>) {
        self.ttl.remove_ttl(&key);
        self.data.insert(key, value);
    }

    /// Remove a key and its deadline. Returns whether it was live beforehand.
    pub fn delete(&mut self, key: &str) -> bool {
        let live = self.is_live(key);
        self.data.remove(key);
        self.ttl.remove_ttl(key);
        live
    }

    /// Clear everything. Returns the number of live keys that were present.
    pub fn flush(&mut self) -> usize {
        let count = self
            .data
            .keys()
            .filter(|k| !self.ttl.is_expired(k))
            .count();
        self.data.clear();
        self.ttl.clear();
        count
    }

    /// Run a TTL sweep and evict whatever it reports. Returns the keys that
    /// were actually removed.
    pub fn sweep_expired(&mut self, force: bool) -> HashSet<String> {
        let expired = self.ttl.cleanup_expired(force);
        for key in &expired {
            self.data.remove(key);
        }
        expired
    }

    /// Force a sweep, evict what it finds, and return the remaining keys.
    /// Used by `KEYS`.
    pub fn keys_after_sweep(&mut self) -> Vec<String> {
        self.sweep_expired(true);
        self.data.keys().cloned().collect()
    }

    /// Number of raw entries, including any not-yet-swept expired ones.
    pub fn raw_len(&self) -> usize {
        self.data.len()
    }
}

pub type SharedKeyspace = Arc<RwLock<Keyspace>>;
