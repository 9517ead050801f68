use crate::{cancel_on_interrupt, Cli};
/// REPL shell: Reedline-based interactive profile session.
use anyhow::{Context, Result};
use dao_profile_core::commands::Command;
use dao_profile_core::{list_keystores, Keystore};
use reedline::{DefaultCompleter, DefaultPrompt, DefaultPromptSegment, Reedline, Signal};
use tokio_util::sync::CancellationToken;
use zeroize::{Zeroize, Zeroizing};

pub async fn run_repl(cli: &Cli) -> Result<()> {
    println!("DAO Profile v{}", env!("CARGO_PKG_VERSION"));
    println!("Network: {}", cli.network_config().network);
    println!();

    let key_dir = cli.key_dir()?;
    std::fs::create_dir_all(&key_dir).context("Failed to create keystore directory")?;

    let keys = list_keystores(&key_dir);
    if !keys.is_empty() {
        println!("Existing keys:");
        for name in &keys {
            println!("  - {name}");
        }
        println!();
    }

    let key_path = cli.key_path()?;
    let key_name = &cli.key;

    let keystore = if key_path.exists() {
        println!("Opening key '{key_name}'...");
        let password = Zeroizing::new(
            rpassword::prompt_password("Password: ").context("Failed to read password")?,
        );
        Keystore::open(&key_path, password.as_bytes())?
    } else {
        println!("Key '{key_name}' not found. Creating new keystore...");
        let action = prompt_action()?;
        if matches!(action, KeyAction::Quit) {
            println!("Goodbye.");
            return Ok(());
        }

        let password = prompt_new_password()?;
        let network_config = cli.network_config();

        match action {
            KeyAction::CreateNew => {
                let k =
                    Keystore::create_new(key_path.clone(), password.as_bytes(), network_config)?;
                println!();
                println!("New key created in {}", key_path.display());
                println!("Back up the keystore file; the key cannot be recovered without it.");
                println!();
                k
            }
            KeyAction::Import => {
                let secret = prompt_secret_key()?;
                let k = Keystore::import(
                    key_path.clone(),
                    password.as_bytes(),
                    &secret,
                    network_config,
                )?;
                println!();
                println!("Key imported!");
                k
            }
            KeyAction::Quit => return Ok(()),
        }
        // password and secret dropped and zeroized here
    };

    let service = cli.build_service(&keystore).await?;
    let organization = cli.organization();

    println!("Ready. Address: {}", keystore.address());
    println!("Type 'help' for a list of commands.");
    println!();

    let prompt_str = format!("[profile {}]", keystore.address().short());
    let prompt = DefaultPrompt::new(
        DefaultPromptSegment::Basic(prompt_str),
        DefaultPromptSegment::Empty,
    );

    let commands: Vec<String> = vec![
        "balances".into(),
        "balance".into(),
        "bal".into(),
        "address".into(),
        "addr".into(),
        "profile".into(),
        "whoami".into(),
        "set_profile".into(),
        "edit".into(),
        "forget_signature".into(),
        "logout".into(),
        "password".into(),
        "passwd".into(),
        "help".into(),
        "exit".into(),
        "quit".into(),
        "q".into(),
    ];
    let completer = Box::new(DefaultCompleter::new(commands));
    let mut line_editor = Reedline::create().with_completer(completer);

    loop {
        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match Command::parse(line) {
                    Ok(Command::Exit) => {
                        println!("Goodbye.");
                        break;
                    }
                    Ok(Command::Password) => {
                        if !prompt_confirm("Change keystore password?") {
                            println!("Cancelled.");
                            continue;
                        }
                        let old_pw = Zeroizing::new(
                            rpassword::prompt_password("Current password: ").unwrap_or_default(),
                        );
                        let new_pw = match prompt_new_password() {
                            Ok(pw) => pw,
                            Err(e) => {
                                eprintln!("Error: {e}");
                                continue;
                            }
                        };
                        println!("Changing password...");
                        match Keystore::change_password(
                            keystore.path(),
                            old_pw.as_bytes(),
                            new_pw.as_bytes(),
                        ) {
                            Ok(()) => println!("Password changed."),
                            Err(e) => eprintln!("Error: {e:#}"),
                        }
                    }
                    Ok(cmd) => {
                        if let Some(prompt_msg) = cmd.confirmation_prompt() {
                            if !prompt_confirm(&prompt_msg) {
                                println!("Cancelled.");
                                continue;
                            }
                        }
                        if cmd.requires_signature() {
                            println!("Requesting signature (Ctrl-C to abandon)...");
                        }

                        let cancel = CancellationToken::new();
                        let interrupt = cancel_on_interrupt(&cancel);
                        let result = cmd
                            .execute(&service, organization.as_ref(), false, &cancel)
                            .await;
                        interrupt.abort();

                        match result {
                            Ok(output) => {
                                if !output.is_empty() {
                                    println!("{output}");
                                }
                            }
                            Err(e) => {
                                eprintln!("Error: {e}");
                            }
                        }
                    }
                    Err(e) => {
                        eprintln!("{e}");
                    }
                }
            }
            Ok(Signal::CtrlD) | Ok(Signal::CtrlC) => {
                println!("Goodbye.");
                break;
            }
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        }
    }

    Ok(())
}

enum KeyAction {
    CreateNew,
    Import,
    Quit,
}

fn prompt_action() -> Result<KeyAction> {
    println!("  1) Create new key");
    println!("  2) Import existing secret key (hex)");
    println!("  3) Quit");
    loop {
        let mut input = String::new();
        print!("Choice [1/2/3]: ");
        use std::io::Write;
        std::io::stdout().flush()?;
        std::io::stdin().read_line(&mut input)?;
        match input.trim() {
            "1" | "" => return Ok(KeyAction::CreateNew),
            "2" => return Ok(KeyAction::Import),
            "3" | "q" => return Ok(KeyAction::Quit),
            _ => println!("Please enter a valid option."),
        }
    }
}

fn prompt_new_password() -> Result<Zeroizing<String>> {
    loop {
        let pass1 = Zeroizing::new(
            rpassword::prompt_password("New password: ").context("Failed to read password")?,
        );
        let pass2 = Zeroizing::new(
            rpassword::prompt_password("Confirm password: ").context("Failed to read password")?,
        );
        if *pass1 != *pass2 {
            println!("Passwords do not match. Try again.");
            continue;
        }
        if pass1.len() < 4 {
            eprintln!("WARNING: This password is very short. A weak password offers little protection if the keystore file is stolen.");
        }
        return Ok(pass1);
    }
}

fn prompt_confirm(prompt: &str) -> bool {
    use std::io::Write;
    print!("{prompt} [y/N]: ");
    std::io::stdout().flush().ok();
    let mut input = String::new();
    std::io::stdin().read_line(&mut input).is_ok() && input.trim().eq_ignore_ascii_case("y")
}

fn prompt_secret_key() -> Result<Zeroizing<String>> {
    let mut input =
        rpassword::prompt_password("Secret key (hex): ").context("Failed to read secret key")?;
    let trimmed = Zeroizing::new(input.trim().to_string());
    input.zeroize();
    if trimmed.trim_start_matches("0x").len() != 64 {
        anyhow::bail!("Secret key should be 32 bytes (64 hex characters).");
    }
    Ok(trimmed)
}
