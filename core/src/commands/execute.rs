use anyhow::Result;
use tokio_util::sync::CancellationToken;

use super::help::help_text;
use super::Command;
use crate::display;
use crate::network::OrganizationContext;
use crate::service::ProfileService;

impl Command {
    /// Execute a command and return the output string.
    /// `default_organization` applies to `balances` when no avatar is given.
    pub async fn execute(
        &self,
        service: &ProfileService,
        default_organization: Option<&OrganizationContext>,
        json_output: bool,
        cancel: &CancellationToken,
    ) -> Result<String> {
        match self {
            Command::Balances { organization } => {
                let explicit = organization.map(OrganizationContext::new);
                let organization = explicit.as_ref().or(default_organization);
                let (pair, reputation) = match organization {
                    Some(org) => {
                        let (pair, rep) = futures::try_join!(
                            service.balances(Some(org)),
                            service.reputation(org)
                        )?;
                        (pair, Some(rep))
                    }
                    None => (service.balances(None).await?, None),
                };
                if json_output {
                    Ok(display::format_balances_json(
                        service.address(),
                        &pair,
                        reputation.as_ref(),
                    ))
                } else {
                    Ok(display::format_balances(&pair, reputation.as_ref()))
                }
            }

            Command::Address => {
                if json_output {
                    Ok(display::format_address_json(service.address()))
                } else {
                    Ok(service.address().to_string())
                }
            }

            Command::Profile => {
                let profile = service.current_profile().await?;
                if json_output {
                    Ok(display::format_profile_json(service.address(), profile.as_ref()))
                } else {
                    Ok(display::format_profile(service.address(), profile.as_ref()))
                }
            }

            Command::SetProfile { form } => {
                service.submit_profile(form, cancel).await?;
                if json_output {
                    Ok(serde_json::json!({
                        "status": "updated",
                        "address": service.address().to_string(),
                        "name": form.name,
                        "description": form.description,
                    })
                    .to_string())
                } else {
                    Ok(format!(
                        "Profile updated.\n  Name:    {}\n  Address: {}",
                        form.name,
                        service.address().short()
                    ))
                }
            }

            Command::ForgetSignature => {
                service.forget_signature()?;
                if json_output {
                    Ok(serde_json::json!({ "status": "forgotten" }).to_string())
                } else {
                    Ok("Cached signature removed. The next profile edit will ask to sign again."
                        .to_string())
                }
            }

            Command::Help { command } => Ok(help_text(command.as_deref())),

            // Handled directly in the REPL loop (needs the keystore path and prompts)
            Command::Password => Ok(String::new()),

            Command::Exit => Ok(String::new()),
        }
    }
}
