#[must_use]
pub fn help_text(command: Option<&str>) -> String {
    match command {
        Some("balances") | Some("balance") | Some("bal") => {
            "balances [org_avatar]\n  Show the ETH balance and the staking token (GEN) balance.\n  With an organization avatar address, the staking token comes from\n  that organization's voting machine instead of the default one, and\n  the account's reputation in that organization is shown as well.\n  Aliases: balance, bal".to_string()
        }
        Some("address") | Some("addr") => {
            "address\n  Show the active account address.\n  Alias: addr".to_string()
        }
        Some("profile") | Some("whoami") => {
            "profile\n  Show the name and description stored for the active account.\n  Alias: whoami".to_string()
        }
        Some("set_profile") | Some("edit") => {
            "set_profile <name> [| description]\n  Sign the sign-in message and save the profile.\n  The description is limited to 150 characters.\n  The signature is cached and reused for later edits.\n  Example: set_profile Jane Doe | Maintains the treasury scripts\n  Alias: edit".to_string()
        }
        Some("forget_signature") | Some("logout") => {
            "forget_signature\n  Drop the cached sign-in signature.\n  The next profile edit asks the wallet to sign again.\n  Alias: logout".to_string()
        }
        Some("password") | Some("passwd") => {
            "password\n  Change the keystore's encryption password.\n  Alias: passwd".to_string()
        }
        Some("exit") | Some("quit") | Some("q") => {
            "exit\n  Exit.\n  Aliases: quit, q".to_string()
        }
        Some(other) => format!("Unknown command: '{other}'. Type 'help' for a list."),
        None => {
            "Available commands:\n\
             \n\
             \x20 balances [org]     Show ETH and staking token balances\n\
             \x20 address            Show account address\n\
             \x20 profile            Show stored profile\n\
             \x20 set_profile        Sign in and save name and description\n\
             \x20 forget_signature   Drop the cached sign-in signature\n\
             \x20 password           Change keystore password\n\
             \x20 help [cmd]         Show help for a command\n\
             \x20 exit               Exit\n\
             \n\
             Type 'help <command>' for detailed help on a specific command."
                .to_string()
        }
    }
}
