//! Stamp command - generate a build stamp

use crate::cache::BuildStamp;
use crate::cli::args::StampArgs;
use crate::config::ConfigManager;
use crate::error::OffcacheResult;
use crate::ui::{self, UiContext};
use std::path::Path;

/// Execute the stamp command.
///
/// `target` is the file `--write` updates: the project-local config when one
/// was found, otherwise the global one.
pub async fn execute(args: StampArgs, target: &Path) -> OffcacheResult<()> {
    let stamp = BuildStamp::now();

    if !args.write {
        println!("{}", stamp);
        return Ok(());
    }

    ConfigManager::set_value(
        target,
        "cache",
        "build_stamp",
        toml::Value::String(stamp.to_string()),
    )
    .await?;

    let ctx = UiContext::detect();
    ui::step_ok_detail(
        &ctx,
        &format!("Build stamp {}", stamp),
        &target.display().to_string(),
    );
    Ok(())
}
