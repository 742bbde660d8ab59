//! Cache maintenance command handlers.

use std::time::Duration;

use anyhow::Result;

use geminicraft::cache::ResponseCache;
use geminicraft::config::Config;

use super::CacheAction;

pub(crate) fn cmd_cache(config: &Config, action: CacheAction) -> Result<()> {
    let cache = ResponseCache::new(config.cache.ttl(), Config::cache_path());

    match action {
        CacheAction::Stats => {
            let stats = cache.stats();
            println!("Entries: {}", stats.entries);
            println!("Hits:    {}", stats.hits);
            println!("Misses:  {}", stats.misses);
            println!(
                "Cache is {} (ttl {}s)",
                if config.cache.enabled { "enabled" } else { "disabled" },
                config.cache.ttl_secs
            );
        }
        CacheAction::Clear { older_than_secs } => {
            let removed = cache.clear(older_than_secs.map(Duration::from_secs))?;
            match older_than_secs {
                Some(secs) => println!("Removed {removed} entr(ies) older than {secs}s."),
                None => println!("Removed {removed} entr(ies)."),
            }
        }
    }

    Ok(())
}
