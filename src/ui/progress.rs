//! Progress indicators with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar for pre-caching assets during install.
///
/// Shows an indicatif bar in interactive mode and one line per asset in CI.
pub struct AssetProgress {
    bar: Option<ProgressBar>,
}

impl AssetProgress {
    /// Create a progress indicator for `total` assets
    pub fn new(ctx: &UiContext, cache_name: &str, total: u64) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::new(total);
            let template = ProgressStyle::default_bar()
                .template("  {spinner:.cyan} Caching {prefix}  {bar:20.cyan/dim} {pos}/{len} {msg:.dim}")
                .map(|s| s.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ").progress_chars("━╸─"))
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            bar.set_style(template);
            bar.set_prefix(cache_name.to_string());
            bar.enable_steady_tick(std::time::Duration::from_millis(120));
            Some(bar)
        } else {
            println!("Caching {} asset(s) into {}...", total, cache_name);
            None
        };
        Self { bar }
    }

    /// Record one fetched asset
    pub fn on_asset(&self, url: &str) {
        match self.bar {
            Some(ref bar) => {
                bar.inc(1);
                bar.set_message(shorten(url, 60));
            }
            None => println!("  {} {}", style("+").green(), url),
        }
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

/// Keep the tail of a long URL, which carries the file name
fn shorten(url: &str, max: usize) -> String {
    let count = url.chars().count();
    if count <= max {
        return url.to_string();
    }
    let tail: String = url.chars().skip(count - (max - 3)).collect();
    format!("...{}", tail)
}
