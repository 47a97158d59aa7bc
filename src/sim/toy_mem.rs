use std::collections::HashMap;

use log::debug;

use crate::base::mem::BackingStore;

// a sparse block store that reads anything never written as zeros
#[derive(Debug, Default)]
pub struct ToyMemory {
    block_size: usize,
    blocks: HashMap<u64, Box<[u8]>>,
    fetches: u64,
    writebacks: u64,
}

impl ToyMemory {
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size,
            ..Self::default()
        }
    }

    pub fn fetches(&self) -> u64 {
        self.fetches
    }

    pub fn writebacks(&self) -> u64 {
        self.writebacks
    }

    /// Byte at `addr` as memory currently holds it, bypassing any cache.
    pub fn peek(&self, addr: u64) -> u8 {
        let tag = addr / self.block_size as u64;
        let offset = (addr % self.block_size as u64) as usize;
        self.blocks.get(&tag).map_or(0, |block| block[offset])
    }

    pub fn poke(&mut self, addr: u64, value: u8) {
        let tag = addr / self.block_size as u64;
        let offset = (addr % self.block_size as u64) as usize;
        let block_size = self.block_size;
        self.blocks
            .entry(tag)
            .or_insert_with(|| vec![0u8; block_size].into_boxed_slice())[offset] = value;
    }
}

impl BackingStore for ToyMemory {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn fetch_block_impl(&mut self, tag: u64) -> Result<Vec<u8>, anyhow::Error> {
        self.fetches += 1;
        Ok(self
            .blocks
            .get(&tag)
            .map(|block| block.to_vec())
            .unwrap_or_else(|| vec![0u8; self.block_size]))
    }

    fn writeback_block_impl(&mut self, tag: u64, data: &[u8]) -> Result<(), anyhow::Error> {
        debug!("memory: writeback of block {:#x}", tag);
        self.writebacks += 1;
        self.blocks.insert(tag, Box::from(data));
        Ok(())
    }
}
