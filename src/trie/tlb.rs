use std::collections::{HashMap, VecDeque};

use super::pool::PoolIndex;

/// Bounded block-tag -> pool index map that shortcuts the BTH walk. Replacement is strict FIFO
/// over insertion order; lookups do not refresh an entry's position.
#[derive(Debug)]
pub struct FastPathTable {
    capacity: usize,
    next_seq: u64,
    entries: HashMap<u64, (PoolIndex, u64)>,
    /// insertion order; entries whose sequence no longer matches `entries` are stale
    order: VecDeque<(u64, u64)>,
}

impl FastPathTable {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "fast-path table needs at least one entry");
        Self {
            capacity,
            next_seq: 0,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, tag: u64) -> bool {
        self.entries.contains_key(&tag)
    }

    pub fn lookup(&self, tag: u64) -> Option<PoolIndex> {
        self.entries.get(&tag).map(|&(index, _)| index)
    }

    /// Insert or retarget `tag`. Returns the tag pushed out if the table overflowed.
    pub fn insert(&mut self, tag: u64, index: PoolIndex) -> Option<u64> {
        if let Some(entry) = self.entries.get_mut(&tag) {
            entry.0 = index;
            return None;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(tag, (index, seq));
        self.order.push_back((tag, seq));

        let evicted = if self.entries.len() > self.capacity {
            self.evict_oldest()
        } else {
            None
        };
        self.compact();
        evicted
    }

    pub fn remove(&mut self, tag: u64) -> Option<PoolIndex> {
        self.entries.remove(&tag).map(|(index, _)| index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, PoolIndex)> + '_ {
        self.entries.iter().map(|(&tag, &(index, _))| (tag, index))
    }

    fn is_live(entries: &HashMap<u64, (PoolIndex, u64)>, tag: u64, seq: u64) -> bool {
        entries.get(&tag).map_or(false, |&(_, s)| s == seq)
    }

    fn evict_oldest(&mut self) -> Option<u64> {
        while let Some((tag, seq)) = self.order.pop_front() {
            if Self::is_live(&self.entries, tag, seq) {
                self.entries.remove(&tag);
                return Some(tag);
            }
        }
        None
    }

    fn compact(&mut self) {
        if self.order.len() > 2 * self.capacity {
            let entries = &self.entries;
            self.order
                .retain(|&(tag, seq)| Self::is_live(entries, tag, seq));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FastPathTable;

    #[test]
    fn lookup_after_insert() {
        let mut tlb = FastPathTable::new(4);
        assert_eq!(tlb.lookup(7), None);
        tlb.insert(7, 3);
        assert_eq!(tlb.lookup(7), Some(3));
        assert_eq!(tlb.len(), 1);
    }

    #[test]
    fn overflow_evicts_oldest_inserted() {
        let mut tlb = FastPathTable::new(2);
        assert_eq!(tlb.insert(1, 10), None);
        assert_eq!(tlb.insert(2, 20), None);
        // lookups do not promote entries
        assert_eq!(tlb.lookup(1), Some(10));
        assert_eq!(tlb.insert(3, 30), Some(1));
        assert_eq!(tlb.len(), 2);
        assert_eq!(tlb.lookup(1), None);
        assert_eq!(tlb.lookup(2), Some(20));
        assert_eq!(tlb.lookup(3), Some(30));
    }

    #[test]
    fn removed_entries_are_skipped_on_eviction() {
        let mut tlb = FastPathTable::new(2);
        tlb.insert(1, 10);
        tlb.insert(2, 20);
        assert_eq!(tlb.remove(1), Some(10));
        tlb.insert(3, 30);
        assert_eq!(tlb.len(), 2);
        // 2 is now the oldest surviving entry
        assert_eq!(tlb.insert(4, 40), Some(2));
        assert!(tlb.contains(3));
        assert!(tlb.contains(4));
    }

    #[test]
    fn reinserted_tag_goes_to_the_back() {
        let mut tlb = FastPathTable::new(2);
        tlb.insert(1, 10);
        tlb.insert(2, 20);
        tlb.remove(1);
        tlb.insert(1, 11);
        assert_eq!(tlb.insert(3, 30), Some(2));
        assert_eq!(tlb.lookup(1), Some(11));
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let mut tlb = FastPathTable::new(3);
        for tag in 0..100u64 {
            tlb.insert(tag, tag as usize);
            if tag % 3 == 0 {
                tlb.remove(tag / 2);
            }
            assert!(tlb.len() <= tlb.capacity());
        }
        assert!(tlb.order.len() <= 2 * tlb.capacity() + 1);
    }
}
