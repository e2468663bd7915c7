//! Terminal output helpers
//!
//! Uses `cliclack` framing and an `indicatif` bar on an interactive terminal,
//! and falls back to plain tagged lines in CI or when piped.

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{
    intro, outro_success, outro_warn, step_error_detail, step_info, step_ok, step_ok_detail,
    step_warn_hint,
};
pub use progress::AssetProgress;
