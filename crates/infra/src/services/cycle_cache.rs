use std::collections::HashMap;
use std::sync::Mutex;
use warden_domain::{Cycle, EventFamily, GroupRef};

struct CacheEntry {
    fetched_at: i64,
    cycle: Option<Cycle>,
}

/// Short-TTL cache over resolved cycles, constructed once per process and
/// shared by reference. Both found and not-found lookups are cached;
/// upstream errors never are.
pub struct CycleCache {
    ttl_millis: i64,
    entries: Mutex<HashMap<(EventFamily, GroupRef), CacheEntry>>,
}

impl CycleCache {
    pub fn new(ttl_millis: i64) -> Self {
        Self {
            ttl_millis,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// `Some(None)` is a fresh cached not-found, distinct from a cache miss.
    pub fn get(&self, family: EventFamily, group_ref: &GroupRef, now: i64) -> Option<Option<Cycle>> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(&(family, group_ref.clone()))
            .filter(|entry| now - entry.fetched_at < self.ttl_millis)
            .map(|entry| entry.cycle.clone())
    }

    pub fn insert(&self, family: EventFamily, group_ref: GroupRef, cycle: Option<Cycle>, now: i64) {
        let mut entries = self.entries.lock().unwrap();
        // Drop stale entries on the way so the map does not grow unbounded
        let ttl = self.ttl_millis;
        entries.retain(|_, entry| now - entry.fetched_at < ttl);
        entries.insert(
            (family, group_ref),
            CacheEntry {
                fetched_at: now,
                cycle,
            },
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use warden_domain::CycleState;

    fn cycle(group: &GroupRef) -> Cycle {
        Cycle::new(
            EventFamily::War,
            group.clone(),
            0,
            1000,
            CycleState::Active,
            Vec::new(),
        )
    }

    #[test]
    fn entries_expire_after_the_ttl() {
        let cache = CycleCache::new(30_000);
        let group = GroupRef::new("#AAA");
        cache.insert(EventFamily::War, group.clone(), Some(cycle(&group)), 1000);

        assert!(cache.get(EventFamily::War, &group, 20_000).is_some());
        assert!(cache.get(EventFamily::War, &group, 31_001).is_none());
    }

    #[test]
    fn cached_not_found_is_distinct_from_a_miss() {
        let cache = CycleCache::new(30_000);
        let group = GroupRef::new("#AAA");
        cache.insert(EventFamily::Raid, group.clone(), None, 1000);

        assert_eq!(cache.get(EventFamily::Raid, &group, 2000), Some(None));
        assert_eq!(cache.get(EventFamily::War, &group, 2000), None);
    }
}
