use inquire::{Password, PasswordDisplayMode};
use statbank_core::contract::PasswordPrompt;
use statbank_core::error::{Result, StatbankError};

/// Masked password prompt on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl PasswordPrompt for TerminalPrompt {
    fn prompt_password(&self, loaduser: &str) -> Result<String> {
        let message = format!("Password for load user {loaduser}:");
        Password::new(&message)
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .prompt()
            .map_err(|e| StatbankError::auth(format!("password prompt failed: {e}")))
    }
}
