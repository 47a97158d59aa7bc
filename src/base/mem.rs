use anyhow::bail;

/// Trait for the memory that sits behind a DBRC cache and holds the permanent copy of every
/// block. Blocks are addressed by tag (block address / block size).
pub trait BackingStore {
    fn block_size(&self) -> usize;

    fn fetch_block_impl(&mut self, tag: u64) -> Result<Vec<u8>, anyhow::Error>;
    fn fetch_block(&mut self, tag: u64) -> Result<Vec<u8>, anyhow::Error> {
        let block = self.fetch_block_impl(tag)?;
        if block.len() != self.block_size() {
            bail!(
                "fetch of block {:#x} returned {} bytes, expected {}",
                tag,
                block.len(),
                self.block_size()
            );
        }
        Ok(block)
    }

    fn writeback_block_impl(&mut self, tag: u64, data: &[u8]) -> Result<(), anyhow::Error>;
    fn writeback_block(&mut self, tag: u64, data: &[u8]) -> Result<(), anyhow::Error> {
        // the cache itself must only ever write back whole blocks
        assert_eq!(data.len(), self.block_size(), "partial block writeback");
        self.writeback_block_impl(tag, data)
    }
}
