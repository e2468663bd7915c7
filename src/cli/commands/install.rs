//! Install command - pre-cache the manifest and activate

use super::build_manager;
use crate::cli::args::InstallArgs;
use crate::config::Config;
use crate::error::OffcacheResult;
use crate::ui::{self, AssetProgress, UiContext};
use crate::worker::{ActivationReport, InstallReport, WorkerInstance};
use std::sync::Arc;

/// Result of driving a worker through install and, optionally, activation
pub(crate) struct Lifecycle {
    pub(crate) install: InstallReport,
    /// `None` when activation was skipped
    pub(crate) activation: Option<OffcacheResult<ActivationReport>>,
}

/// Install the worker, then activate it unless told not to.
///
/// An install failure is the error; an activation failure is reported in
/// [`Lifecycle::activation`] since the bucket is already populated by then.
pub(crate) async fn run_lifecycle(
    worker: &mut WorkerInstance,
    activate: bool,
    on_asset: &(dyn Fn(&str) + Send + Sync),
) -> OffcacheResult<Lifecycle> {
    let install = worker.install_with_progress(on_asset).await?;

    let activation = if activate && install.skip_waiting {
        Some(worker.activate().await)
    } else {
        None
    };

    Ok(Lifecycle {
        install,
        activation,
    })
}

/// Execute the install command
pub async fn execute(args: InstallArgs, config: &Config) -> OffcacheResult<()> {
    let ctx = UiContext::detect();
    let manager = Arc::new(build_manager(config).await?);
    let cache_name = manager.cache_name();
    let total = manager.settings().manifest.unique_includes().len();

    ui::intro(&ctx, "offcache install");

    let mut worker = WorkerInstance::new(manager);
    let progress = AssetProgress::new(&ctx, &cache_name, total as u64);
    let on_asset = |url: &str| progress.on_asset(url);

    let result = run_lifecycle(&mut worker, !args.no_activate, &on_asset).await;
    progress.finish();

    let lifecycle = match result {
        Ok(lifecycle) => lifecycle,
        Err(e) => {
            ui::step_error_detail(&ctx, "Install failed", &e.to_string());
            return Err(e);
        }
    };

    ui::step_ok_detail(
        &ctx,
        &format!("Cached {} asset(s)", lifecycle.install.assets.len()),
        &lifecycle.install.cache_name,
    );

    match lifecycle.activation {
        Some(Ok(report)) => {
            print_activation(&ctx, &report);
            ui::outro_success(&ctx, &format!("Worker {} active", worker.id()));
        }
        Some(Err(e)) => {
            ui::step_error_detail(&ctx, "Activation failed", &e.to_string());
            return Err(e);
        }
        None => ui::outro_warn(
            &ctx,
            "Installed without activation; run `offcache activate` to purge stale buckets",
        ),
    }

    Ok(())
}

/// Report deleted and failed buckets after activation
pub(crate) fn print_activation(ctx: &UiContext, report: &ActivationReport) {
    if report.deleted.is_empty() && report.failed.is_empty() {
        ui::step_info(ctx, "No stale buckets");
    }
    for name in &report.deleted {
        ui::step_ok(ctx, &format!("Deleted stale bucket {}", name));
    }
    for (name, reason) in &report.failed {
        ui::step_error_detail(ctx, &format!("Could not delete {}", name), reason);
    }
}
