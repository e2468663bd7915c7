//! Activate command - purge stale buckets

use super::build_manager;
use super::install::print_activation;
use crate::config::Config;
use crate::error::OffcacheResult;
use crate::ui::{self, UiContext};

/// Execute the activate command
pub async fn execute(config: &Config) -> OffcacheResult<()> {
    let ctx = UiContext::detect();
    let manager = build_manager(config).await?;

    ui::intro(&ctx, "offcache activate");
    let report = manager.activate().await?;
    print_activation(&ctx, &report);

    if report.failed.is_empty() {
        ui::outro_success(&ctx, &format!("Current bucket: {}", report.current));
    } else {
        ui::outro_warn(
            &ctx,
            &format!("{} stale bucket(s) remain", report.failed.len()),
        );
    }
    Ok(())
}
