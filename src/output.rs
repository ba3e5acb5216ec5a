//! # Output Styling
//!
//! Status lines printed by gib commands ("✅ Committed ...") use emoji when
//! the terminal can show them and bracketed plain text otherwise, so that
//! backup logs captured from cron stay readable.
//!
//! The decision respects, in order:
//! - `--color=always|never` on the command line
//! - `NO_COLOR` (any value, https://no-color.org/)
//! - `CLICOLOR=0` and `CLICOLOR_FORCE=1`
//! - `TERM=dumb`
//! - whether stdout is a terminal

use std::env;

/// Output configuration for status lines.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

/// The kinds of status line gib prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Done,
    Info,
    Hint,
    Warning,
}

impl Status {
    fn symbols(self) -> (&'static str, &'static str) {
        match self {
            Status::Done => ("✅", "[OK]"),
            Status::Info => ("📦", "[INFO]"),
            Status::Hint => ("💡", "[HINT]"),
            Status::Warning => ("⚠️ ", "[WARN]"),
        }
    }
}

impl OutputConfig {
    /// Create an output configuration from environment and the `--color` flag.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    /// Format a status line.
    pub fn line(&self, status: Status, message: &str) -> String {
        let (emoji, plain) = status.symbols();
        let prefix = if self.use_color { emoji } else { plain };
        format!("{} {}", prefix, message)
    }

    /// Print a status line to stdout.
    pub fn print(&self, status: Status, message: &str) {
        println!("{}", self.line(status, message));
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}
