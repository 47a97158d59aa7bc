use super::pool::PoolIndex;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TopEntry {
    pub valid: bool,
    pub index: PoolIndex,
}

/// Flat first-level table; slot `i` covers addresses `[i * span, (i + 1) * span)`.
#[derive(Debug)]
pub struct TopIndex {
    entries: Vec<TopEntry>,
}

impl TopIndex {
    pub fn new(entries: usize) -> Self {
        Self {
            entries: vec![TopEntry::default(); entries.max(1)],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, slot: usize) -> TopEntry {
        self.entries[slot]
    }

    pub fn link(&mut self, slot: usize, index: PoolIndex) {
        self.entries[slot] = TopEntry { valid: true, index };
    }

    pub fn unlink(&mut self, slot: usize) {
        self.entries[slot].valid = false;
    }

    pub fn iter_valid(&self) -> impl Iterator<Item = (usize, PoolIndex)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.valid)
            .map(|(slot, entry)| (slot, entry.index))
    }
}
