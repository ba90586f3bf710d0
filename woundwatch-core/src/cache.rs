//! Generic per-wound record cache with two-pass sweeping.
use smallvec::SmallVec;
use std::collections::HashMap;

use crate::host::WoundId;

/// Evictions collected inline before spilling to the heap.
pub type EvictionSet = SmallVec<[WoundId; 8]>;

/// Outcome of evaluating one entry during a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepVerdict {
    Keep,
    Evict,
}

/// Result of refreshing a record from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordUpdate {
    Refreshed,
    /// Host data was not ready; the previous values were kept.
    Deferred,
    /// The host no longer backs this record; it will be evicted next sweep.
    Stale,
}

/// Counts from one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub retained: usize,
    pub evicted: EvictionSet,
}

impl SweepReport {
    #[must_use]
    pub fn evicted_count(&self) -> usize {
        self.evicted.len()
    }
}

/// Mapping from wound identity to a derived record.
///
/// Records are never serialized. The cache is emptied on reload and rebuilt
/// as wounds re-register.
#[derive(Debug, Clone)]
pub struct RecordCache<R> {
    entries: HashMap<WoundId, R>,
}

impl<R> Default for RecordCache<R> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<R> RecordCache<R> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the record for `id`, returning the previous one.
    pub fn insert(&mut self, id: WoundId, record: R) -> Option<R> {
        self.entries.insert(id, record)
    }

    #[must_use]
    pub fn get(&self, id: WoundId) -> Option<&R> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: WoundId) -> Option<&mut R> {
        self.entries.get_mut(&id)
    }

    pub fn remove(&mut self, id: WoundId) -> Option<R> {
        self.entries.remove(&id)
    }

    #[must_use]
    pub fn contains(&self, id: WoundId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries ordered by wound id.
    #[must_use]
    pub fn iter(&self) -> Vec<(WoundId, &R)> {
        let mut entries: Vec<_> = self.entries.iter().map(|(id, r)| (*id, r)).collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }

    /// Evaluate every entry, then evict the ones judged stale.
    ///
    /// Verdicts are all collected before the first removal, so no entry's
    /// verdict can observe another entry's eviction in the same pass.
    pub fn sweep<F>(&mut self, mut judge: F) -> SweepReport
    where
        F: FnMut(WoundId, &mut R) -> SweepVerdict,
    {
        let mut evicted = EvictionSet::new();
        for (id, record) in &mut self.entries {
            if judge(*id, record) == SweepVerdict::Evict {
                evicted.push(*id);
            }
        }
        for id in &evicted {
            self.entries.remove(id);
        }
        evicted.sort();
        SweepReport {
            retained: self.entries.len(),
            evicted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_overwrites_last_write_wins() {
        let mut cache = RecordCache::new();
        assert_eq!(cache.insert(WoundId(1), 10), None);
        assert_eq!(cache.insert(WoundId(1), 20), Some(10));
        assert_eq!(cache.get(WoundId(1)), Some(&20));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn sweep_evicts_after_full_pass() {
        let mut cache = RecordCache::new();
        for id in 1..=5 {
            cache.insert(WoundId(id), id);
        }
        let mut seen = 0;
        let report = cache.sweep(|_, value| {
            seen += 1;
            *value *= 10;
            if *value % 20 == 0 {
                SweepVerdict::Evict
            } else {
                SweepVerdict::Keep
            }
        });
        assert_eq!(seen, 5);
        assert_eq!(report.retained, 3);
        assert_eq!(report.evicted.as_slice(), &[WoundId(2), WoundId(4)]);
        assert_eq!(cache.get(WoundId(3)), Some(&30));
        assert!(!cache.contains(WoundId(4)));
    }

    #[test]
    fn iter_is_sorted_by_id() {
        let mut cache = RecordCache::new();
        cache.insert(WoundId(9), 'c');
        cache.insert(WoundId(2), 'a');
        cache.insert(WoundId(5), 'b');
        let order: Vec<_> = cache.iter().into_iter().map(|(_, v)| *v).collect();
        assert_eq!(order, vec!['a', 'b', 'c']);
    }

    #[test]
    fn clear_and_remove() {
        let mut cache = RecordCache::new();
        cache.insert(WoundId(1), ());
        cache.insert(WoundId(2), ());
        assert_eq!(cache.remove(WoundId(1)), Some(()));
        assert_eq!(cache.remove(WoundId(1)), None);
        cache.clear();
        assert!(cache.is_empty());
    }
}
