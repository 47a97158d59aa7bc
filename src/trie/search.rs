use super::cache::DbrcCache;
use super::pool::PoolIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    pub hit: bool,
    /// On a hit, the data block. On a miss, the deepest block reached, which a following
    /// insertion attaches under; `None` if the top index slot itself was empty.
    pub anchor: Option<PoolIndex>,
}

impl SearchResult {
    fn miss(anchor: Option<PoolIndex>) -> Self {
        Self { hit: false, anchor }
    }
}

impl DbrcCache {
    /// Walk the BTH hierarchy for `addr`. Every block stepped into below the top index has its
    /// reference counter bumped, whether or not the walk ends in a hit.
    pub fn search(&mut self, addr: u64) -> SearchResult {
        let layout = *self.layout();
        let max_reference = self.config().max_reference;

        let entry = self.top.get(layout.top_index(addr));
        if !entry.valid {
            return SearchResult::miss(None);
        }

        let mut index = entry.index;
        for level in 2..=layout.depth() {
            let selector = layout.selector(addr, level);
            let slot = self.pool[index]
                .children()
                .get(selector)
                .copied()
                .unwrap_or_default();
            if !slot.valid {
                return SearchResult::miss(Some(index));
            }
            index = slot.index;
            self.pool[index].touch(max_reference);
        }

        let node = &self.pool[index];
        let hit = node.level == layout.depth()
            && node.valid
            && node.parent_valid
            && node.tag == layout.tag(addr);
        SearchResult {
            hit,
            anchor: Some(index),
        }
    }
}
