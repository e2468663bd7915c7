//! Output context: interactive terminal vs plain (CI, pipes, tests)

use std::io::IsTerminal;

/// Environment variables that mark a CI run
const CI_VARS: &[&str] = &[
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "JENKINS_URL",
    "BUILDKITE",
];

/// Decides whether to draw spinners and progress bars
#[derive(Debug, Clone, Copy)]
pub struct UiContext {
    interactive: bool,
}

impl UiContext {
    /// Detect the current environment
    pub fn detect() -> Self {
        let tty = std::io::stdout().is_terminal() && std::io::stderr().is_terminal();
        let ci = CI_VARS.iter().any(|var| std::env::var_os(var).is_some());
        Self {
            interactive: tty && !ci,
        }
    }

    /// Plain output regardless of environment
    pub fn non_interactive() -> Self {
        Self { interactive: false }
    }

    /// Whether to use spinners, bars and cliclack framing
    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }
}
