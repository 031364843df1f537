use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

/// How often a non-forced sweep is allowed to actually run.
const CLEANUP_INTERVAL_MS: u64 = 100;

/// Get current time in milliseconds since the UNIX epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before UNIX epoch")
        .as_millis() as u64
}

/// Tracks per-key expiry deadlines and sweeps them proactively.
///
/// `deadline_of` is authoritative. `pending` is a scheduling index only — it
/// may contain entries whose `(deadline, key)` no longer matches
/// `deadline_of[key]`; those are stale and are discarded when popped.
#[derive(Debug, Default)]
pub struct TtlManager {
    deadline_of: HashMap<String, u64>,
    pending: BinaryHeap<Reverse<(u64, String)>>,
    last_sweep_ms: u64,
}

impl TtlManager {
    pub fn new() -> Self {
        TtlManager {
            deadline_of: HashMap::new(),
            pending: BinaryHeap::new(),
            last_sweep_ms: 0,
        }
    }

    /// Set an expiry `ttl_ms` milliseconds from now. Returns false and
    /// records nothing if `ttl_ms < 0`.
    pub fn set_expiry(&mut self, key: &str, ttl_ms: i64) -> bool {
        if ttl_ms < 0 {
            return false;
        }
        let deadline = now_millis() + ttl_ms as u64;
        self.deadline_of.insert(key.to_string(), deadline);
        self.pending.push(Reverse((deadline, key.to_string())));
        true
    }

    /// Remaining milliseconds until expiry, or `-1` if no deadline is set.
    /// Does not consult keyspace presence; callers combine this with a
    /// presence check to produce the `-2` "missing key" sentinel.
    pub fn get_ttl(&self, key: &str) -> i64 {
        match self.deadline_of.get(key) {
            None => -1,
            Some(&deadline) => {
                let now = now_millis();
                if now >= deadline {
                    -1
                } else {
                    (deadline - now) as i64
                }
            }
        }
    }

    /// True iff `key` has a deadline that has already passed.
    pub fn is_expired(&self, key: &str) -> bool {
        match self.deadline_of.get(key) {
            Some(&deadline) => now_millis() >= deadline,
            None => false,
        }
    }

    /// Remove any deadline for `key`. The heap entry, if any, becomes stale.
    pub fn remove_ttl(&mut self, key: &str) {
        self.deadline_of.remove(key);
    }

    /// Pop due entries off the scheduling heap and report which keys
    /// actually expired. Throttled to once per `CLEANUP_INTERVAL_MS` unless
    /// `force` is set.
    pub fn cleanup_expired(&mut self, force: bool) -> HashSet<String> {
        let now = now_millis();
        if !force && now.saturating_sub(self.last_sweep_ms) < CLEANUP_INTERVAL_MS {
            return HashSet::new();
        }
        self.last_sweep_ms = now;

        let mut expired = HashSet::new();
        while let Some(Reverse((deadline, _))) = self.pending.peek() {
            if *deadline > now {
                break;
            }
            let Reverse((deadline, key)) = self.pending.pop().unwrap();
            if self.deadline_of.get(&key) == Some(&deadline) {
                self.deadline_of.remove(&key);
                expired.insert(key);
            }
            // else: stale tombstone, discard and keep going
        }
        expired
    }

    /// Wipe all tracked deadlines.
    pub fn clear(&mut self) {
        self.deadline_of.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn set_expiry_rejects_negative_ttl() {
        let mut ttl = TtlManager::new();
        assert!(!ttl.set_expiry("k", -1));
        assert_eq!(ttl.get_ttl("k"), -1);
    }

    #[test]
    fn set_expiry_overwrites_prior_deadline() {
        let mut ttl = TtlManager::new();
        assert!(ttl.set_expiry("k", 100_000));
        assert!(ttl.set_expiry("k", 5));
        assert!(ttl.get_ttl("k") <= 5);
    }

    #[test]
    fn get_ttl_without_deadline_is_negative_one() {
        let ttl = TtlManager::new();
        assert_eq!(ttl.get_ttl("missing"), -1);
    }

    #[test]
    fn is_expired_reports_past_deadlines() {
        let mut ttl = TtlManager::new();
        ttl.set_expiry("k", 0);
        sleep(Duration::from_millis(5));
        assert!(ttl.is_expired("k"));
    }

    #[test]
    fn remove_ttl_clears_deadline() {
        let mut ttl = TtlManager::new();
        ttl.set_expiry("k", 10_000);
        ttl.remove_ttl("k");
        assert_eq!(ttl.get_ttl("k"), -1);
        assert!(!ttl.is_expired("k"));
    }

    #[test]
    fn cleanup_expired_is_throttled_unless_forced() {
        let mut ttl = TtlManager::new();
        ttl.set_expiry("k", 0);
        sleep(Duration::from_millis(5));
        let first = ttl.cleanup_expired(true);
        assert!(first.contains("k"));

        ttl.set_expiry("j", 0);
        sleep(Duration::from_millis(5));
        // Not forced and we just swept — should be throttled to empty.
        let second = ttl.cleanup_expired(false);
        assert!(second.is_empty());
    }

    #[test]
    fn cleanup_expired_discards_stale_heap_entries() {
        let mut ttl = TtlManager::new();
        ttl.set_expiry("k", 0); // pushes a tombstone-to-be
        ttl.set_expiry("k", 0); // overwrites deadline_of, heap now has two entries for k
        sleep(Duration::from_millis(5));
        let expired = ttl.cleanup_expired(true);
        assert_eq!(expired.len(), 1);
        assert!(expired.contains("k"));
    }

    #[test]
    fn cleanup_expired_only_reports_live_deadlines() {
        let mut ttl = TtlManager::new();
        ttl.set_expiry("a", 0);
        ttl.set_expiry("b", 100_000);
        sleep(Duration::from_millis(5));
        let expired = ttl.cleanup_expired(true);
        assert_eq!(expired.len(), 1);
        assert!(expired.contains("a"));
        assert!(!expired.contains("b"));
    }

    #[test]
    fn clear_wipes_everything() {
        let mut ttl = TtlManager::new();
        ttl.set_expiry("a", 100_000);
        ttl.clear();
        assert_eq!(ttl.get_ttl("a"), -1);
    }
}
