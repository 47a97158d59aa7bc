use std::collections::{HashSet, VecDeque};

use anyhow::ensure;
use log::debug;
use smallvec::SmallVec;

use super::geometry::AddrLayout;
use super::pool::{BlockPool, PoolIndex};
use super::stats::CacheStats;
use super::tlb::FastPathTable;
use super::top::TopIndex;
use crate::sim::config::CacheConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write(u8),
}

/// Dirty data block pushed out of the pool, waiting to be written to the backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Writeback {
    pub tag: u64,
    pub data: Box<[u8]>,
}

/// A fully associative cache whose tags live in a software trie of BTH tables. The tables and
/// the data blocks they lead to share one fixed pool of blocks, recycled by a CLOCK sweep.
#[derive(Debug)]
pub struct DbrcCache {
    config: CacheConfig,
    layout: AddrLayout,
    pub(super) pool: BlockPool,
    pub(super) top: TopIndex,
    pub(super) tlb: FastPathTable,
    pub(super) cursor: PoolIndex,
    pub(super) writebacks: VecDeque<Writeback>,
    pub(super) stats: CacheStats,
}

impl DbrcCache {
    pub fn new(config: CacheConfig) -> Self {
        config.ensure_valid();
        Self {
            layout: AddrLayout::new(&config),
            pool: BlockPool::new(config.capacity()),
            top: TopIndex::new(config.top_entries()),
            tlb: FastPathTable::new(config.tlb_size),
            cursor: 0,
            writebacks: VecDeque::new(),
            stats: CacheStats::default(),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn layout(&self) -> &AddrLayout {
        &self.layout
    }

    pub fn pool(&self) -> &BlockPool {
        &self.pool
    }

    pub fn top(&self) -> &TopIndex {
        &self.top
    }

    pub fn fast_path(&self) -> &FastPathTable {
        &self.tlb
    }

    pub fn cursor(&self) -> PoolIndex {
        self.cursor
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Keep `index` out of replacement (or release it again).
    pub fn set_locked(&mut self, index: PoolIndex, locked: bool) {
        self.pool.set_locked(index, locked);
    }

    fn check_address(&self, addr: u64) {
        assert!(
            self.layout.contains(addr),
            "address {:#x} outside the {}-bit address space",
            addr,
            self.config.addr_bits
        );
    }

    /// Look `addr` up and perform `op` on the cached byte. Returns the byte read or written,
    /// or `None` on a miss.
    ///
    /// The BTH walk always runs so reference counters stay current, but a fast-path entry
    /// wins over whatever the walk found.
    pub fn access(&mut self, addr: u64, op: Access) -> Option<u8> {
        self.check_address(addr);
        self.stats.record_access();

        let found = self.search(addr);
        let tag = self.layout.tag(addr);
        let index = if let Some(index) = self.tlb.lookup(tag) {
            self.stats.record_fast_path_hit();
            index
        } else if let (true, Some(index)) = (found.hit, found.anchor) {
            self.stats.record_slow_path_hit();
            self.install_fast_path(tag, index);
            index
        } else {
            self.stats.record_miss();
            return None;
        };

        let offset = self.layout.offset(addr);
        let node = &mut self.pool[index];
        let value = match op {
            Access::Read => node.data().expect("resolved block holds data")[offset],
            Access::Write(value) => {
                node.data_mut().expect("resolved block holds data")[offset] = value;
                node.dirty = true;
                value
            }
        };
        Some(value)
    }

    pub fn read(&mut self, addr: u64) -> Option<u8> {
        self.access(addr, Access::Read)
    }

    pub fn write(&mut self, addr: u64, value: u8) -> bool {
        self.access(addr, Access::Write(value)).is_some()
    }

    /// Install `addr` after a miss, zero-filling the new data block and storing `value` at the
    /// address's offset.
    ///
    /// # Panics
    ///
    /// If `addr` is still resolvable through the BTH walk or the fast path; callers must only
    /// insert after [`DbrcCache::access`] missed.
    pub fn insert(&mut self, addr: u64, value: u8) -> PoolIndex {
        self.install(addr, |data, offset| data[offset] = value)
    }

    /// Install `addr` after a miss with a whole block fetched from memory.
    pub fn fill(&mut self, addr: u64, block: &[u8]) -> PoolIndex {
        assert_eq!(
            block.len(),
            self.layout.block_size(),
            "fill of {:#x} with a partial block",
            addr
        );
        self.install(addr, |data, _| data.copy_from_slice(block))
    }

    fn install(&mut self, addr: u64, write: impl FnOnce(&mut [u8], usize)) -> PoolIndex {
        self.check_address(addr);
        let depth = self.layout.depth();
        let tag = self.layout.tag(addr);

        let found = self.search(addr);
        assert!(!found.hit, "insert of {:#x} which is already cached", addr);
        assert!(
            !self.tlb.contains(tag),
            "insert of {:#x} which is already in the fast-path table",
            addr
        );

        let (start, mut parent) = match found.anchor {
            None => (1, None),
            Some(anchor) if self.pool[anchor].level >= depth => {
                // a stale data block sits on the path; rebuild it under the same parent
                let parent = (depth > 1).then(|| self.pool[anchor].parent);
                (depth, parent)
            }
            Some(anchor) => (self.pool[anchor].level + 1, Some(anchor)),
        };

        // the path we hang under and everything built below it must survive this insertion
        let mut pinned: SmallVec<[PoolIndex; 8]> = SmallVec::new();
        let mut ancestor = parent;
        while let Some(index) = ancestor {
            pinned.push(index);
            let node = &self.pool[index];
            ancestor = (node.level > 1).then_some(node.parent);
        }

        for level in start..=depth {
            let victim = self.select_victim(&pinned);
            self.stats.record_victim(victim.fallback);
            debug!(
                "level {} of {:#x} -> pool slot {}{}",
                level,
                addr,
                victim.index,
                if victim.fallback { " (fallback)" } else { "" }
            );
            self.evict(victim.index);
            self.build(victim.index, level, addr, parent);
            pinned.push(victim.index);
            parent = Some(victim.index);
        }

        let leaf = parent.expect("insertion builds at least the data block");
        let offset = self.layout.offset(addr);
        let node = &mut self.pool[leaf];
        node.tag = tag;
        write(node.data_mut().expect("data block"), offset);

        self.install_fast_path(tag, leaf);
        self.stats.record_insertion(depth + 1 - start);
        leaf
    }

    fn install_fast_path(&mut self, tag: u64, index: PoolIndex) {
        if let Some(evicted) = self.tlb.insert(tag, index) {
            debug!("fast path full, dropped block {:#x}", evicted);
            self.stats.record_fast_path_eviction();
        }
    }

    /// Hand out the writebacks queued by evictions, oldest first.
    pub fn drain_writebacks(&mut self) -> impl Iterator<Item = Writeback> + '_ {
        self.writebacks.drain(..)
    }

    /// Queue a writeback for every dirty data block still in the pool and mark it clean.
    pub fn flush_dirty(&mut self) -> usize {
        let depth = self.layout.depth();
        let mut flushed = 0;
        for index in 0..self.pool.capacity() {
            let node = &mut self.pool[index];
            if !(node.valid && node.dirty && node.level == depth) {
                continue;
            }
            if let Some(data) = node.data() {
                self.writebacks.push_back(Writeback {
                    tag: node.tag,
                    data: Box::from(data),
                });
                self.stats.record_writeback();
            }
            node.dirty = false;
            flushed += 1;
        }
        flushed
    }

    /// Clean every copy of `addr`'s block that neither the BTH walk nor the fast path can reach
    /// any more, queueing writebacks for the dirty ones. Must run before the block is refetched
    /// after a miss, or memory would hand back data older than an orphaned dirty copy.
    pub fn retire_stale(&mut self, addr: u64) -> usize {
        let depth = self.layout.depth();
        let tag = self.layout.tag(addr);
        let live = self.tlb.lookup(tag);
        let mut retired = 0;
        for index in 0..self.pool.capacity() {
            if live == Some(index) {
                continue;
            }
            let node = &mut self.pool[index];
            if !(node.valid && node.level == depth && node.tag == tag) {
                continue;
            }
            if node.dirty {
                if let Some(data) = node.data() {
                    debug!("retiring orphaned dirty block {:#x} at pool slot {}", tag, index);
                    self.writebacks.push_back(Writeback {
                        tag,
                        data: Box::from(data),
                    });
                    self.stats.record_writeback();
                }
                node.dirty = false;
            }
            retired += 1;
        }
        retired
    }

    /// Cross-check pool, top index and fast path against each other.
    pub fn check_structure(&self) -> Result<(), anyhow::Error> {
        let depth = self.layout.depth();
        let mut owned = HashSet::new();

        ensure!(
            self.top.len() == self.config.top_entries(),
            "top index holds {} slots, geometry needs {}",
            self.top.len(),
            self.config.top_entries()
        );

        for (slot, index) in self.top.iter_valid() {
            let node = &self.pool[index];
            ensure!(
                node.valid && node.parent_valid && node.level == 1 && node.parent == slot,
                "top slot {} points at pool slot {} which does not belong to it",
                slot,
                index
            );
            ensure!(owned.insert(index), "pool slot {} has two owners", index);
        }

        for (index, node) in self.pool.iter() {
            ensure!(
                node.reference <= self.config.max_reference,
                "pool slot {} reference count {} above ceiling",
                index,
                node.reference
            );
            if !node.valid {
                continue;
            }
            for slot in node.children().iter().filter(|slot| slot.valid) {
                let child = &self.pool[slot.index];
                ensure!(
                    child.valid
                        && child.parent_valid
                        && child.level == node.level + 1
                        && child.parent == index,
                    "pool slot {} links to pool slot {} which does not belong to it",
                    index,
                    slot.index
                );
                ensure!(owned.insert(slot.index), "pool slot {} has two owners", slot.index);
            }
        }

        for (index, node) in self.pool.iter() {
            if node.valid && node.parent_valid {
                ensure!(owned.contains(&index), "pool slot {} claims a parent but has none", index);
            }
        }

        ensure!(
            self.tlb.len() <= self.tlb.capacity(),
            "fast path holds {} entries, capacity {}",
            self.tlb.len(),
            self.tlb.capacity()
        );
        for (tag, index) in self.tlb.iter() {
            let node = &self.pool[index];
            ensure!(
                node.valid && node.level == depth && node.tag == tag && node.data().is_some(),
                "fast path entry {:#x} points at stale pool slot {}",
                tag,
                index
            );
        }
        Ok(())
    }
}
