use anyhow::{bail, Context, Result};

use super::Command;
use crate::address::Address;
use crate::form::ProfileForm;

impl Command {
    /// Parse a command from a raw input string.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let (cmd, rest) = match input.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, Some(rest.trim()).filter(|r| !r.is_empty())),
            None => (input, None),
        };
        if cmd.is_empty() {
            bail!("No command entered. Type 'help' for a list of commands.");
        }

        match cmd.to_lowercase().as_str() {
            "balances" | "balance" | "bal" => {
                let organization = rest
                    .map(|s| {
                        s.parse::<Address>()
                            .with_context(|| format!("Invalid organization avatar '{s}'"))
                    })
                    .transpose()?;
                Ok(Command::Balances { organization })
            }

            "address" | "addr" => Ok(Command::Address),

            "profile" | "whoami" => Ok(Command::Profile),

            "set_profile" | "edit" => {
                let rest = rest.ok_or_else(|| {
                    anyhow::anyhow!("Missing name. Usage: set_profile <name> [| description]")
                })?;
                let (name, description) = match rest.split_once('|') {
                    Some((name, description)) => (name.trim(), description.trim()),
                    None => (rest, ""),
                };
                if name.is_empty() {
                    bail!("Missing name. Usage: set_profile <name> [| description]");
                }
                Ok(Command::SetProfile {
                    form: ProfileForm::new(name, description),
                })
            }

            "forget_signature" | "logout" => Ok(Command::ForgetSignature),

            "password" | "passwd" => Ok(Command::Password),

            "help" | "h" | "?" => Ok(Command::Help {
                command: rest.map(|s| s.to_lowercase()),
            }),

            "exit" | "quit" | "q" => Ok(Command::Exit),

            other => bail!("Unknown command: '{other}'. Type 'help' for a list of commands."),
        }
    }
}
