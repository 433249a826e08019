//! Console styling
//!
//! Styles always emit ANSI codes; `anstream::println` strips them when the
//! output is not a terminal.

use indicatif::ProgressStyle;
use owo_colors::{OwoColorize, Style, Styled};
use std::fmt::Display;

/// Success marker
pub const CHECK: &str = "✓";
/// Failure marker
pub const CROSS: &str = "✗";

/// Semantic styles for console output
pub trait Stylize: Display + Sized {
    /// De-emphasized detail
    fn muted(&self) -> Styled<&Self> {
        self.style(Style::new().dimmed())
    }

    /// Names and numbers the reader should spot
    fn accent(&self) -> Styled<&Self> {
        self.style(Style::new().cyan())
    }

    /// Headings
    fn emphasis(&self) -> Styled<&Self> {
        self.style(Style::new().bold())
    }

    /// Good news
    fn success(&self) -> Styled<&Self> {
        self.style(Style::new().green())
    }

    /// Needs attention
    fn warn(&self) -> Styled<&Self> {
        self.style(Style::new().yellow())
    }

    /// Something went wrong
    fn error(&self) -> Styled<&Self> {
        self.style(Style::new().red().bold())
    }
}

impl<T: Display> Stylize for T {}

/// Green check mark
pub fn check() -> String {
    CHECK.green().to_string()
}

/// Red cross
pub fn cross() -> String {
    CROSS.red().to_string()
}

/// Spinner used for long-running steps
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"])
}

