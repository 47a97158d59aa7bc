use anyhow::bail;
use clap::Parser;
use env_logger::Builder;
use log::info;

use dbrc::sim::functional::FunctionalCache;
use dbrc::sim::toy_mem::ToyMemory;
use dbrc::sim::trace::{read_trace, replay, replay_backed};
use dbrc::sim::traffic::SyntheticTraffic;
use dbrc::trie::DbrcCache;
use dbrc::ui::{self, DbrcArgs};

pub fn main() -> Result<(), anyhow::Error> {
    let argv = DbrcArgs::parse();
    let toml_string = match &argv.config_path {
        Some(path) => ui::read_toml(path)?,
        None => String::new(),
    };
    let (sim_config, cache_config) = ui::make_configs(&toml_string, Some(&argv))?;

    Builder::new()
        .filter_level(sim_config.level_filter())
        .parse_default_env()
        .init();

    let addrs = if let Some(len) = argv.synthetic {
        let footprint = argv
            .footprint
            .unwrap_or(4 * cache_config.size as u64)
            .min(cache_config.address_limit());
        SyntheticTraffic {
            len,
            base: 0,
            footprint,
            seed: argv.seed,
        }
        .generate()
    } else if let Some(path) = &sim_config.trace {
        read_trace(path)?
    } else {
        bail!("no trace to replay; set sim.trace, --trace or --synthetic");
    };

    let cache = DbrcCache::new(cache_config);
    info!(
        "cache: {} blocks of {} bytes, {} BTH levels, {} top entries",
        cache_config.capacity(),
        cache_config.block_size,
        cache_config.num_bth,
        cache_config.top_entries()
    );

    let (report, stats) = if argv.backed {
        let mut fc = FunctionalCache::new(cache, ToyMemory::new(cache_config.block_size));
        let report = replay_backed(&mut fc, &addrs, sim_config.verify)?;
        fc.flush()?;
        info!("memory: {} fetches, {} writebacks", fc.mem.fetches(), fc.mem.writebacks());
        (report, *fc.cache.stats())
    } else {
        let mut cache = cache;
        let report = replay(&mut cache, &addrs, sim_config.fill_value, sim_config.verify)?;
        (report, *cache.stats())
    };

    println!("{}", report);
    if let Some(path) = &sim_config.stats_json {
        ui::write_summary(path, report, stats)?;
    }
    Ok(())
}
