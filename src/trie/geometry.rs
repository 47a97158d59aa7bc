use crate::sim::config::CacheConfig;

/// Splits an address into the fields the BTH hierarchy is indexed by:
///
/// ```text
/// | top index | selector 2 | ... | selector D | offset |
///             \______________ tag ___________/
/// ```
///
/// Each selector picks one of `B = block_size / 2` child slots; the tag is the block address
/// and the offset is the byte within the data block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddrLayout {
    depth: usize,
    block_bits: u32,
    branch_bits: u32,
    span_bits: u32,
    limit: u64,
}

impl AddrLayout {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            depth: config.num_bth,
            block_bits: config.block_size.trailing_zeros(),
            branch_bits: config.branching().trailing_zeros(),
            span_bits: config.span_bits(),
            limit: config.address_limit(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn block_size(&self) -> usize {
        1 << self.block_bits
    }

    pub fn branching(&self) -> usize {
        1 << self.branch_bits
    }

    pub fn contains(&self, addr: u64) -> bool {
        self.limit == u64::MAX || addr < self.limit
    }

    pub fn top_index(&self, addr: u64) -> usize {
        (addr >> self.span_bits) as usize
    }

    /// Child slot taken out of the level `level - 1` node when descending to `level`.
    pub fn selector(&self, addr: u64, level: usize) -> usize {
        debug_assert!(level >= 2 && level <= self.depth, "no selector for level {level}");
        let shift = self.span_bits - self.branch_bits * (level as u32 - 1);
        ((addr >> shift) as usize) & (self.branching() - 1)
    }

    pub fn tag(&self, addr: u64) -> u64 {
        addr >> self.block_bits
    }

    pub fn offset(&self, addr: u64) -> usize {
        (addr as usize) & (self.block_size() - 1)
    }

    pub fn block_addr(&self, tag: u64) -> u64 {
        tag << self.block_bits
    }
}
