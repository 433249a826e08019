//! Operator prompts
//!
//! Merging asks the operator to confirm target branches, acknowledge
//! caretaker notes and optionally edit commit messages. All of this goes
//! through [`Prompter`] so runs without a terminal behave predictably.

use crate::error::{Error, Result};
use dialoguer::{Confirm, Editor};
use std::io::IsTerminal;
use tracing::{debug, info};

/// Source of operator answers
pub trait Prompter: Send + Sync {
    /// Ask a yes/no question
    fn confirm(&self, message: &str, default: bool) -> Result<bool>;

    /// Let the operator edit `initial`; `None` keeps it unchanged
    fn edit(&self, message: &str, initial: &str) -> Result<Option<String>>;

    /// Whether git may open an editor on the operator's terminal
    fn is_interactive(&self) -> bool;
}

/// Prompts on the controlling terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        Confirm::new()
            .with_prompt(message)
            .default(default)
            .interact()
            .map_err(|e| Error::Prompt(format!("failed to read confirmation: {e}")))
    }

    fn edit(&self, message: &str, initial: &str) -> Result<Option<String>> {
        info!("{message}");
        Editor::new()
            .edit(initial)
            .map_err(|e| Error::Prompt(format!("failed to run editor: {e}")))
    }

    fn is_interactive(&self) -> bool {
        true
    }
}

/// Declines every confirmation and never opens an editor
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractivePrompter;

impl Prompter for NonInteractivePrompter {
    fn confirm(&self, message: &str, _default: bool) -> Result<bool> {
        debug!(message, "declining prompt in non-interactive mode");
        Ok(false)
    }

    fn edit(&self, message: &str, _initial: &str) -> Result<Option<String>> {
        debug!(message, "skipping editor in non-interactive mode");
        Ok(None)
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// Whether prompts can be shown: stdin is a terminal and `CI` is unset
pub fn is_interactive_environment() -> bool {
    std::io::stdin().is_terminal() && std::env::var_os("CI").is_none()
}

/// Prompter matching the current environment
pub fn prompter_for_environment() -> Box<dyn Prompter> {
    if is_interactive_environment() {
        Box::new(TerminalPrompter)
    } else {
        Box::new(NonInteractivePrompter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_interactive_declines() {
        let prompter = NonInteractivePrompter;
        assert!(!prompter.confirm("Proceed?", true).unwrap());
        assert_eq!(prompter.edit("Edit", "message").unwrap(), None);
        assert!(!prompter.is_interactive());
    }
}
