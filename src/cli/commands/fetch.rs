//! Fetch command - run requests through the cache

use super::build_manager;
use crate::cli::args::FetchArgs;
use crate::config::Config;
use crate::error::{OffcacheError, OffcacheResult};
use crate::network::Request;
use crate::ui::{self, UiContext};
use crate::worker::{FetchOutcome, ResponseSource};
use console::style;
use tokio::fs;

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config) -> OffcacheResult<()> {
    if args.output.is_some() && args.urls.len() != 1 {
        return Err(OffcacheError::User(
            "--output needs exactly one URL".to_string(),
        ));
    }

    let ctx = UiContext::detect();
    let manager = build_manager(config).await?;

    let requests = args
        .urls
        .iter()
        .map(|entry| {
            manager
                .request_for(entry)
                .map(|r| Request::new(args.method, r.url))
        })
        .collect::<OffcacheResult<Vec<_>>>()?;

    let results = manager.fetch_all(&requests).await;

    let mut failures = 0usize;
    for (request, result) in requests.iter().zip(&results) {
        match result {
            Ok(outcome) => print_outcome(&ctx, request, outcome),
            Err(e) => {
                failures += 1;
                ui::step_error_detail(&ctx, &request.to_string(), &e.to_string());
            }
        }
    }

    if let (Some(path), Some(Ok(outcome))) = (&args.output, results.first()) {
        fs::write(path, &outcome.response.body)
            .await
            .map_err(|e| OffcacheError::io(format!("writing {}", path.display()), e))?;
        ui::step_info(
            &ctx,
            &format!(
                "Wrote {} bytes to {}",
                outcome.response.body.len(),
                path.display()
            ),
        );
    }

    if failures > 0 {
        return Err(OffcacheError::User(format!(
            "{} of {} request(s) failed",
            failures,
            requests.len()
        )));
    }
    Ok(())
}

fn print_outcome(ctx: &UiContext, request: &Request, outcome: &FetchOutcome) {
    let status = format!(
        "{} {}",
        outcome.response.status, outcome.response.status_text
    );
    let status = if outcome.response.is_ok() {
        style(status.trim()).green().to_string()
    } else {
        style(status.trim()).yellow().to_string()
    };

    let source = match &outcome.source {
        ResponseSource::Cache { bucket } => format!("hit in {}", bucket),
        ResponseSource::Network { stored: true } => "miss, stored".to_string(),
        ResponseSource::Network { stored: false } => "miss, not stored".to_string(),
    };

    ui::step_ok_detail(ctx, &format!("{} {}", request, status), &source);
}
