use std::path::PathBuf;

use log::{warn, LevelFilter};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use toml::*;

pub trait Config: DeserializeOwned + Default {
    fn from_section(section: Option<&Value>) -> Self {
        match section {
            Some(value) => value.clone().try_into().expect("cannot deserialize config"),
            None => {
                warn!("config section not found");
                Self::default()
            }
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimConfig {
    pub trace: Option<PathBuf>,
    pub log_level: u64,
    pub fill_value: u8,
    pub stats_json: Option<PathBuf>,
    pub verify: bool,
}

impl Config for SimConfig {}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            trace: None,
            log_level: 0,
            fill_value: 42,
            stats_json: None,
            verify: false,
        }
    }
}

impl SimConfig {
    pub fn level_filter(&self) -> LevelFilter {
        match self.log_level {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    }
}

/// Largest top index, as a power of two, that `ensure_valid` accepts.
pub const MAX_TOP_BITS: u32 = 24;

/// Geometry and policy knobs of one DBRC cache instance.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    /// total data capacity in bytes; every pool block (internal or leaf) costs `block_size`
    pub size: usize,
    pub block_size: usize,
    /// number of BTH levels, the last of which holds data blocks
    pub num_bth: usize,
    pub addr_bits: u32,
    pub tlb_size: usize,
    /// maximum number of victim candidates examined before falling back to the least used one
    pub mna: usize,
    pub max_reference: u8,
}

impl Config for CacheConfig {}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            size: 64 << 10,
            block_size: 64,
            num_bth: 3,
            addr_bits: 32,
            tlb_size: 1 << 16,
            mna: 5,
            max_reference: 31,
        }
    }
}

impl CacheConfig {
    /// Fail fast on geometries the engine cannot represent.
    pub fn ensure_valid(&self) {
        assert!(
            self.block_size >= 4 && self.block_size.is_power_of_two(),
            "block_size must be a power of two >= 4"
        );
        assert!(self.num_bth >= 1, "num_bth must be >= 1");
        assert!(
            self.capacity() > self.num_bth,
            "cache must hold more than num_bth blocks (capacity {}, num_bth {})",
            self.capacity(),
            self.num_bth
        );
        assert!(self.mna > 0, "mna must be > 0");
        assert!(self.tlb_size > 0, "tlb_size must be > 0");
        assert!(self.max_reference > 0, "max_reference must be > 0");
        assert!(self.addr_bits <= 64, "addr_bits must be <= 64");
        let span_bits = self.span_bits();
        assert!(
            span_bits <= self.addr_bits,
            "top span of 2^{} bytes does not fit a {}-bit address space",
            span_bits,
            self.addr_bits
        );
        assert!(
            self.addr_bits - span_bits <= MAX_TOP_BITS,
            "top index of 2^{} entries is too large (at most 2^{})",
            self.addr_bits - span_bits,
            MAX_TOP_BITS
        );
    }

    pub fn capacity(&self) -> usize {
        self.size / self.block_size
    }

    /// Child slots per internal node: each slot is half a block wide.
    pub fn branching(&self) -> usize {
        self.block_size / 2
    }

    pub fn span_bits(&self) -> u32 {
        let block_bits = self.block_size.trailing_zeros();
        let branch_bits = self.branching().trailing_zeros();
        block_bits + branch_bits * (self.num_bth as u32 - 1)
    }

    /// Bytes of address space covered by one top index entry.
    pub fn top_span(&self) -> u64 {
        1u64 << self.span_bits()
    }

    pub fn top_entries(&self) -> usize {
        let bits = self.addr_bits - self.span_bits();
        1usize << bits
    }

    pub fn address_limit(&self) -> u64 {
        if self.addr_bits >= 64 {
            u64::MAX
        } else {
            1u64 << self.addr_bits
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_geometry_matches_reference_setup() {
        let config = CacheConfig::default();
        config.ensure_valid();
        assert_eq!(config.capacity(), 1024);
        assert_eq!(config.branching(), 32);
        assert_eq!(config.top_span(), 64 * 32 * 32);
        assert_eq!(config.top_entries(), 1 << 16);
    }

    #[test]
    fn missing_section_falls_back_to_default() {
        let config = CacheConfig::from_section(None);
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let table: Table = toml::from_str("[cache]\nnum_bth = 2\nblock_size = 4\n").unwrap();
        let config = CacheConfig::from_section(table.get("cache"));
        assert_eq!(config.num_bth, 2);
        assert_eq!(config.block_size, 4);
        assert_eq!(config.mna, 5);
        assert_eq!(config.top_span(), 8);
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn odd_block_size_is_rejected() {
        let config = CacheConfig {
            block_size: 24,
            ..CacheConfig::default()
        };
        config.ensure_valid();
    }

    #[test]
    #[should_panic(expected = "more than num_bth")]
    fn pool_smaller_than_a_path_is_rejected() {
        let config = CacheConfig {
            size: 3 * 64,
            ..CacheConfig::default()
        };
        config.ensure_valid();
    }

    #[test]
    #[should_panic(expected = "top index of 2^29 entries is too large")]
    fn oversized_top_index_is_rejected() {
        // 4-byte blocks over two levels leave 29 address bits for the top index
        let config = CacheConfig {
            block_size: 4,
            num_bth: 2,
            ..CacheConfig::default()
        };
        config.ensure_valid();
    }

    #[test]
    fn top_index_at_the_limit_is_accepted() {
        let config = CacheConfig {
            block_size: 4,
            num_bth: 2,
            addr_bits: MAX_TOP_BITS + 3,
            ..CacheConfig::default()
        };
        config.ensure_valid();
        assert_eq!(config.top_entries(), 1 << MAX_TOP_BITS);
    }

    #[test]
    fn log_levels_map_to_filters() {
        let mut sim = SimConfig::default();
        assert_eq!(sim.level_filter(), LevelFilter::Warn);
        sim.log_level = 2;
        assert_eq!(sim.level_filter(), LevelFilter::Debug);
    }
}
