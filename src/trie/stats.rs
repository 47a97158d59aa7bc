use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    accesses: u64,
    hits: u64,
    misses: u64,
    fast_path_hits: u64,
    slow_path_hits: u64,
    insertions: u64,
    nodes_built: u64,
    immediate_victims: u64,
    fallback_victims: u64,
    orphaned_children: u64,
    leaf_evictions: u64,
    writebacks: u64,
    fast_path_evictions: u64,
}

impl CacheStats {
    pub fn accesses(&self) -> u64 {
        self.accesses
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn fast_path_hits(&self) -> u64 {
        self.fast_path_hits
    }

    pub fn slow_path_hits(&self) -> u64 {
        self.slow_path_hits
    }

    pub fn insertions(&self) -> u64 {
        self.insertions
    }

    pub fn nodes_built(&self) -> u64 {
        self.nodes_built
    }

    pub fn immediate_victims(&self) -> u64 {
        self.immediate_victims
    }

    pub fn fallback_victims(&self) -> u64 {
        self.fallback_victims
    }

    pub fn orphaned_children(&self) -> u64 {
        self.orphaned_children
    }

    pub fn leaf_evictions(&self) -> u64 {
        self.leaf_evictions
    }

    pub fn writebacks(&self) -> u64 {
        self.writebacks
    }

    pub fn fast_path_evictions(&self) -> u64 {
        self.fast_path_evictions
    }

    pub fn hit_ratio(&self) -> f64 {
        if self.accesses == 0 {
            return 0.0;
        }
        self.hits as f64 / self.accesses as f64
    }

    pub fn record_access(&mut self) {
        self.accesses = self.accesses.saturating_add(1);
    }

    pub fn record_fast_path_hit(&mut self) {
        self.hits = self.hits.saturating_add(1);
        self.fast_path_hits = self.fast_path_hits.saturating_add(1);
    }

    pub fn record_slow_path_hit(&mut self) {
        self.hits = self.hits.saturating_add(1);
        self.slow_path_hits = self.slow_path_hits.saturating_add(1);
    }

    pub fn record_miss(&mut self) {
        self.misses = self.misses.saturating_add(1);
    }

    pub fn record_insertion(&mut self, nodes_built: usize) {
        self.insertions = self.insertions.saturating_add(1);
        self.nodes_built = self.nodes_built.saturating_add(nodes_built as u64);
    }

    pub fn record_victim(&mut self, fallback: bool) {
        if fallback {
            self.fallback_victims = self.fallback_victims.saturating_add(1);
        } else {
            self.immediate_victims = self.immediate_victims.saturating_add(1);
        }
    }

    pub fn record_orphans(&mut self, count: usize) {
        self.orphaned_children = self.orphaned_children.saturating_add(count as u64);
    }

    pub fn record_leaf_eviction(&mut self) {
        self.leaf_evictions = self.leaf_evictions.saturating_add(1);
    }

    /// Any block queued for the backing store: eviction, flush or stale-copy retirement.
    pub fn record_writeback(&mut self) {
        self.writebacks = self.writebacks.saturating_add(1);
    }

    pub fn record_fast_path_eviction(&mut self) {
        self.fast_path_evictions = self.fast_path_evictions.saturating_add(1);
    }
}
