use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use toml::Table;

use crate::sim::config::{CacheConfig, Config, SimConfig};
use crate::sim::trace::TraceReport;
use crate::trie::CacheStats;

#[derive(Parser, Debug, Default)]
#[command(version, about)]
pub struct DbrcArgs {
    #[arg(help = "Path to config.toml")]
    pub config_path: Option<PathBuf>,
    #[arg(long, help = "Override trace file path")]
    pub trace: Option<PathBuf>,
    #[arg(long, help = "Enable log at level (0:warn, 1:info, 2:debug)")]
    pub log: Option<u64>,
    #[arg(long, help = "Override cache size in bytes")]
    pub size: Option<usize>,
    #[arg(long, help = "Override block size in bytes")]
    pub block_size: Option<usize>,
    #[arg(long, help = "Override number of BTH levels")]
    pub num_bth: Option<usize>,
    #[arg(long, help = "Override fast-path table capacity")]
    pub tlb_size: Option<usize>,
    #[arg(long, help = "Override maximum replacement attempts")]
    pub mna: Option<usize>,
    #[arg(long, help = "Replay N random addresses instead of a trace file")]
    pub synthetic: Option<usize>,
    #[arg(long, help = "Bytes covered by --synthetic addresses (default: 4x cache size)")]
    pub footprint: Option<u64>,
    #[arg(long, default_value_t = 0, help = "Seed for --synthetic")]
    pub seed: u64,
    #[arg(long, help = "Serve misses from a backing memory instead of pre-seeding")]
    pub backed: bool,
    #[arg(long, help = "Write run statistics as JSON")]
    pub stats_json: Option<PathBuf>,
    #[arg(long, help = "Check cache structure after every access")]
    pub verify: bool,
}

pub fn read_toml(path: &Path) -> Result<String, anyhow::Error> {
    fs::read_to_string(path).with_context(|| format!("failed to read config file {}", path.display()))
}

/// Build the sim and cache configs from TOML.
/// If `cli_args` is given, override TOML options with CLI arguments.
pub fn make_configs(
    toml_string: &str,
    cli_args: Option<&DbrcArgs>,
) -> Result<(SimConfig, CacheConfig), anyhow::Error> {
    let config_table: Table = toml::from_str(toml_string).context("cannot parse config toml")?;
    let mut sim_config = SimConfig::from_section(config_table.get("sim"));
    let mut cache_config = CacheConfig::from_section(config_table.get("cache"));

    if let Some(args) = cli_args {
        sim_config.trace = args.trace.clone().or(sim_config.trace);
        sim_config.log_level = args.log.unwrap_or(sim_config.log_level);
        sim_config.stats_json = args.stats_json.clone().or(sim_config.stats_json);
        sim_config.verify |= args.verify;
        cache_config.size = args.size.unwrap_or(cache_config.size);
        cache_config.block_size = args.block_size.unwrap_or(cache_config.block_size);
        cache_config.num_bth = args.num_bth.unwrap_or(cache_config.num_bth);
        cache_config.tlb_size = args.tlb_size.unwrap_or(cache_config.tlb_size);
        cache_config.mna = args.mna.unwrap_or(cache_config.mna);
    }

    Ok((sim_config, cache_config))
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub report: TraceReport,
    pub hit_ratio: f64,
    pub stats: CacheStats,
}

pub fn write_summary(path: &Path, report: TraceReport, stats: CacheStats) -> Result<(), anyhow::Error> {
    let summary = RunSummary {
        report,
        hit_ratio: stats.hit_ratio(),
        stats,
    };
    let payload = serde_json::to_string_pretty(&summary)?;
    fs::write(path, payload).with_context(|| format!("cannot write {}", path.display()))
}
