use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{bail, Context};
use log::info;
use serde::Serialize;

use crate::base::mem::BackingStore;
use crate::sim::functional::FunctionalCache;
use crate::trie::{Access, DbrcCache};

/// Characters in front of the hex address on every trace line (e.g. `0x`, `R `).
pub const PREFIX_LEN: usize = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TraceReport {
    pub misses: u64,
    pub total: u64,
}

impl fmt::Display for TraceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.misses, self.total)
    }
}

/// Parse one trace line; blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<u64>, anyhow::Error> {
    let line = line.trim_end();
    if line.trim().is_empty() {
        return Ok(None);
    }
    let Some(digits) = line.get(PREFIX_LEN..) else {
        bail!("trace line '{}' is shorter than its prefix", line);
    };
    u64::from_str_radix(digits.trim(), 16)
        .map(Some)
        .with_context(|| format!("bad hex address '{}'", digits))
}

pub fn parse_trace<R: BufRead>(reader: R) -> Result<Vec<u64>, anyhow::Error> {
    let mut addrs = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if let Some(addr) = parse_line(&line).with_context(|| format!("trace line {}", lineno + 1))? {
            addrs.push(addr);
        }
    }
    Ok(addrs)
}

pub fn read_trace(path: &Path) -> Result<Vec<u64>, anyhow::Error> {
    let file = File::open(path).with_context(|| format!("cannot open trace {}", path.display()))?;
    parse_trace(BufReader::new(file))
}

/// Drive one read per address; a miss installs the block with `fill_value` at the accessed
/// byte, the same way a synchronous memory response would, then rereads it.
pub fn replay(
    cache: &mut DbrcCache,
    addrs: &[u64],
    fill_value: u8,
    verify: bool,
) -> Result<TraceReport, anyhow::Error> {
    let mut report = TraceReport::default();
    for &addr in addrs {
        if !cache.layout().contains(addr) {
            bail!("trace address {:#x} outside the {}-bit address space", addr, cache.config().addr_bits);
        }
        report.total += 1;
        if cache.read(addr).is_none() {
            cache.insert(addr, fill_value);
            let reread = cache.read(addr);
            assert_eq!(reread, Some(fill_value), "reread of {:#x} after insert", addr);
            report.misses += 1;
        }
        if verify {
            cache.check_structure().with_context(|| format!("after access to {:#x}", addr))?;
        }
    }
    info!("replayed {} accesses, {} misses", report.total, report.misses);
    Ok(report)
}

/// Same as [`replay`], but misses are served from a backing store.
pub fn replay_backed<M: BackingStore>(
    fc: &mut FunctionalCache<M>,
    addrs: &[u64],
    verify: bool,
) -> Result<TraceReport, anyhow::Error> {
    let mut report = TraceReport::default();
    for &addr in addrs {
        if !fc.cache.layout().contains(addr) {
            bail!("trace address {:#x} outside the {}-bit address space", addr, fc.cache.config().addr_bits);
        }
        report.total += 1;
        let (_, hit) = fc.access(addr, Access::Read)?;
        if !hit {
            report.misses += 1;
        }
        if verify {
            fc.cache.check_structure().with_context(|| format!("after access to {:#x}", addr))?;
        }
    }
    info!("replayed {} accesses against memory, {} misses", report.total, report.misses);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::config::CacheConfig;
    use crate::sim::toy_mem::ToyMemory;

    #[test]
    fn prefix_is_stripped() {
        assert_eq!(parse_line("0x7ffe1234").unwrap(), Some(0x7ffe1234));
        assert_eq!(parse_line("R 40\n").unwrap(), Some(0x40));
        assert_eq!(parse_line("   ").unwrap(), None);
    }

    #[test]
    fn bad_lines_are_reported() {
        assert!(parse_line("0xzz").is_err());
        assert!(parse_line("0").is_err());
        let err = parse_trace("0x10\n0xnope\n".as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("trace line 2"));
    }

    #[test]
    fn repeated_addresses_only_miss_cold() {
        let trace = "0x1000\n0x1004\n0x2000\n0x1000\n0x3040\n0x2008\n0x103f\n0x3040\n";
        let addrs = parse_trace(trace.as_bytes()).unwrap();
        let mut cache = DbrcCache::new(CacheConfig::default());
        let report = replay(&mut cache, &addrs, 42, true).unwrap();
        // distinct 64-byte blocks: 0x1000, 0x2000, 0x3040
        assert_eq!(report, TraceReport { misses: 3, total: 8 });
        assert_eq!(report.to_string(), "3/8");
    }

    #[test]
    fn backed_replay_counts_like_seeded_replay() {
        let addrs: Vec<u64> = (0..200u64).map(|i| (i % 37) * 0x40 + (i % 5)).collect();
        let mut seeded = DbrcCache::new(CacheConfig::default());
        let seeded_report = replay(&mut seeded, &addrs, 42, false).unwrap();

        let mut fc = FunctionalCache::new(DbrcCache::new(CacheConfig::default()), ToyMemory::new(64));
        let backed_report = replay_backed(&mut fc, &addrs, true).unwrap();
        assert_eq!(seeded_report, backed_report);
        assert_eq!(backed_report.misses, 37);
    }

    #[test]
    fn out_of_range_address_is_an_error() {
        let config = CacheConfig {
            addr_bits: 20,
            ..CacheConfig::default()
        };
        let mut cache = DbrcCache::new(config);
        assert!(replay(&mut cache, &[0x10_0000], 42, false).is_err());
    }
}
