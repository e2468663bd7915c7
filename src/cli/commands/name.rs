//! Name command - print the current cache name

use crate::cache::SystemClock;
use crate::config::Config;
use crate::error::OffcacheResult;

/// Execute the name command
pub async fn execute(config: &Config) -> OffcacheResult<()> {
    let policy = config.cache.naming_policy()?;
    println!("{}", policy.cache_name(&SystemClock));
    Ok(())
}
