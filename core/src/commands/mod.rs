/// Command definitions and parsing for the profile REPL and one-shot mode.
mod execute;
mod help;
mod parse;

pub use help::help_text;

use crate::address::Address;
use crate::form::ProfileForm;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Show native and staking-token balances: balances [org_avatar]
    Balances { organization: Option<Address> },
    /// Show the active account address
    Address,
    /// Show the stored profile for the active account
    Profile,
    /// Sign the challenge and write the profile: set_profile <name> [| description]
    SetProfile { form: ProfileForm },
    /// Drop the cached challenge signature
    ForgetSignature,
    /// Change keystore password
    Password,
    /// Print help
    Help { command: Option<String> },
    /// Exit the REPL
    Exit,
}

impl Command {
    /// Returns a confirmation prompt if this command should ask before executing.
    pub fn confirmation_prompt(&self) -> Option<String> {
        match self {
            Command::SetProfile { form } if form.description.is_empty() => Some(format!(
                "Sign in and set profile name to '{}'?",
                form.name
            )),
            Command::SetProfile { form } => Some(format!(
                "Sign in and set profile to '{}' ({})?",
                form.name, form.description
            )),
            Command::Password => Some("Change keystore password?".to_string()),
            _ => None,
        }
    }

    /// Commands that need the wallet to sign something.
    pub fn requires_signature(&self) -> bool {
        matches!(self, Command::SetProfile { .. })
    }
}
