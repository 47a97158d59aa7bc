use log::debug;
use smallvec::SmallVec;

use super::cache::{DbrcCache, Writeback};
use super::pool::{ChildSlot, NodePayload, PoolIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Victim {
    pub(crate) index: PoolIndex,
    /// no immediately reusable block turned up within `mna` attempts
    pub(crate) fallback: bool,
}

impl DbrcCache {
    /// CLOCK sweep from the replacement cursor. Free, orphaned and unreferenced blocks are taken
    /// on sight; everything else examined is aged to zero and remembered if it had the lowest
    /// count so far. Locked and `pinned` blocks are stepped over without costing an attempt.
    pub(crate) fn select_victim(&mut self, pinned: &[PoolIndex]) -> Victim {
        let capacity = self.pool.capacity();
        let mna = self.config().mna;

        let mut attempts = 0;
        let mut skipped = 0;
        let mut best: Option<PoolIndex> = None;
        let mut best_reference = u8::MAX;

        while attempts < mna {
            let index = self.cursor;
            self.cursor = (self.cursor + 1) % capacity;

            let node = &mut self.pool[index];
            if node.locked || pinned.contains(&index) {
                skipped += 1;
                assert!(skipped < capacity, "no unlocked block left to replace");
                continue;
            }
            skipped = 0;
            attempts += 1;

            if !node.valid || !node.parent_valid || node.reference == 0 {
                return Victim {
                    index,
                    fallback: false,
                };
            }
            if best.is_none() || node.reference < best_reference {
                best = Some(index);
                best_reference = node.reference;
            }
            node.reference = 0;
        }

        Victim {
            index: best.expect("mna > 0 guarantees a candidate"),
            fallback: true,
        }
    }

    /// Detach the victim's old contents: unlink it from its parent, and then either drop its
    /// fast-path entry (queueing a writeback if dirty) or orphan its direct children.
    pub(crate) fn evict(&mut self, index: PoolIndex) {
        let depth = self.layout().depth();
        let node = &self.pool[index];
        if !node.valid || node.level == 0 {
            return;
        }
        let level = node.level;

        if node.parent_valid {
            self.unlink(index);
        }

        if level == depth {
            let node = &mut self.pool[index];
            let tag = node.tag;
            let dirty = node.dirty;
            if dirty {
                let data = node.data().map(Box::<[u8]>::from).unwrap_or_default();
                debug!("writeback of block {:#x} from pool slot {}", tag, index);
                self.writebacks.push_back(Writeback { tag, data });
                self.stats.record_writeback();
            }
            node.tag = 0;
            node.dirty = false;
            if self.tlb.lookup(tag) == Some(index) {
                self.tlb.remove(tag);
            }
            self.stats.record_leaf_eviction();
        } else {
            let children: SmallVec<[PoolIndex; 32]> = node_children(&self.pool[index].payload);
            for &child in children.iter() {
                self.pool[child].parent_valid = false;
            }
            debug!(
                "evicted level {} table at pool slot {}, orphaned {} children",
                level,
                index,
                children.len()
            );
            self.stats.record_orphans(children.len());
        }
    }

    fn unlink(&mut self, index: PoolIndex) {
        let node = &self.pool[index];
        let parent = node.parent;
        if node.level == 1 {
            let entry = self.top.get(parent);
            if entry.valid && entry.index == index {
                self.top.unlink(parent);
            }
        } else if let Some(slot) = self.pool[parent]
            .children_mut()
            .iter_mut()
            .find(|slot| slot.valid && slot.index == index)
        {
            slot.valid = false;
        }
    }

    /// Reinitialize `index` as a fresh level `level` block for `addr` and hang it under
    /// `parent` (the top index when `None`).
    pub(crate) fn build(&mut self, index: PoolIndex, level: usize, addr: u64, parent: Option<PoolIndex>) {
        let layout = *self.layout();

        let node = &mut self.pool[index];
        node.payload = if level == layout.depth() {
            NodePayload::Leaf(vec![0u8; layout.block_size()].into_boxed_slice())
        } else {
            NodePayload::Internal(vec![ChildSlot::default(); layout.branching()])
        };
        node.valid = true;
        node.parent_valid = true;
        node.level = level;
        node.reference = 1;
        node.dirty = false;

        let previous = match parent {
            None => {
                let slot = layout.top_index(addr);
                let previous = self.top.get(slot);
                self.top.link(slot, index);
                self.pool[index].parent = slot;
                previous.valid.then_some(previous.index)
            }
            Some(parent) => {
                let selector = layout.selector(addr, level);
                let slot = &mut self.pool[parent].children_mut()[selector];
                let previous = *slot;
                *slot = ChildSlot { valid: true, index };
                self.pool[index].parent = parent;
                previous.valid.then_some(previous.index)
            }
        };

        // a stale block still hanging where the new one goes loses its parent
        if let Some(previous) = previous.filter(|&previous| previous != index) {
            self.pool[previous].parent_valid = false;
            self.stats.record_orphans(1);
        }
    }
}

fn node_children(payload: &NodePayload) -> SmallVec<[PoolIndex; 32]> {
    match payload {
        NodePayload::Internal(children) => children
            .iter()
            .filter(|slot| slot.valid)
            .map(|slot| slot.index)
            .collect(),
        _ => SmallVec::new(),
    }
}
