use anyhow::bail;

use crate::base::mem::BackingStore;
use crate::trie::{Access, DbrcCache};

/// Functional (untimed) front of a DBRC cache: misses fetch the block from `mem`, fill it, and
/// retry; writebacks produced along the way go straight to `mem`.
#[derive(Debug)]
pub struct FunctionalCache<M: BackingStore> {
    pub cache: DbrcCache,
    pub mem: M,
}

impl<M: BackingStore> FunctionalCache<M> {
    pub fn new(cache: DbrcCache, mem: M) -> Self {
        assert_eq!(
            cache.layout().block_size(),
            mem.block_size(),
            "cache and memory disagree on block size"
        );
        Self { cache, mem }
    }

    /// Returns the byte and whether the access hit.
    pub fn access(&mut self, addr: u64, op: Access) -> Result<(u8, bool), anyhow::Error> {
        if let Some(value) = self.cache.access(addr, op) {
            return Ok((value, true));
        }

        // orphaned dirty copies must land in memory before the refetch
        self.cache.retire_stale(addr);
        self.drain_writebacks()?;

        let tag = self.cache.layout().tag(addr);
        let block = self.mem.fetch_block(tag)?;
        self.cache.fill(addr, &block);
        self.drain_writebacks()?;

        match self.cache.access(addr, op) {
            Some(value) => Ok((value, false)),
            None => bail!("access to {:#x} missed right after fill", addr),
        }
    }

    pub fn read(&mut self, addr: u64) -> Result<u8, anyhow::Error> {
        self.access(addr, Access::Read).map(|(value, _)| value)
    }

    pub fn write(&mut self, addr: u64, value: u8) -> Result<(), anyhow::Error> {
        self.access(addr, Access::Write(value)).map(|_| ())
    }

    /// Write every dirty block back so `mem` holds the architecturally visible state.
    pub fn flush(&mut self) -> Result<usize, anyhow::Error> {
        let flushed = self.cache.flush_dirty();
        self.drain_writebacks()?;
        Ok(flushed)
    }

    fn drain_writebacks(&mut self) -> Result<(), anyhow::Error> {
        for wb in self.cache.drain_writebacks() {
            self.mem.writeback_block(wb.tag, &wb.data)?;
        }
        Ok(())
    }
}
