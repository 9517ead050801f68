mod repl;

use anyhow::{bail, Context, Result};
use clap::Parser;
use dao_profile_core::commands::Command;
use dao_profile_core::{
    keystore_path, Address, Deployments, HttpProfileStore, Keystore, LocalWalletProvider,
    Network, NetworkClient, NetworkConfig, OrganizationContext, ProfileService,
    RpcContractResolver, SignatureCacheScope, SqliteCache,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

#[derive(Parser)]
#[command(
    name = "dao-profile",
    about = "Wallet-signed member profiles for DAO governance",
    version
)]
pub(crate) struct Cli {
    /// Key name (default: "default")
    #[arg(long, default_value = "default")]
    key: String,

    /// Keystore directory (default: platform data dir)
    #[arg(long)]
    key_dir: Option<PathBuf>,

    /// Read password from stdin (for scripting)
    #[arg(long)]
    password_stdin: bool,

    /// Run a single command and exit
    #[arg(long)]
    cmd: Option<String>,

    /// Network preset: mainnet, sepolia, local
    #[arg(long)]
    network: Option<Network>,

    /// Custom JSON-RPC URL (overrides --network)
    #[arg(long, env = "DAO_PROFILE_RPC_URL")]
    rpc_url: Option<String>,

    /// Base URL of the profile API
    #[arg(long, env = "DAO_PROFILE_API_URL", default_value = "http://127.0.0.1:3001")]
    profile_api: String,

    /// Default voting machine (GenesisProtocol) address
    #[arg(long, env = "DAO_PROFILE_GENESIS_PROTOCOL")]
    genesis_protocol: Option<Address>,

    /// ContributionReward scheme address, used for organization-scoped balances
    #[arg(long, env = "DAO_PROFILE_CONTRIBUTION_REWARD")]
    contribution_reward: Option<Address>,

    /// Organization avatar used by `balances` when none is given
    #[arg(long)]
    org: Option<Address>,

    /// Output in JSON format (useful with --cmd)
    #[arg(long)]
    json: bool,

    /// Allow connecting to non-HTTPS RPC URLs
    #[arg(long)]
    insecure: bool,

    /// Cache the sign-in signature per account instead of in one shared slot
    #[arg(long)]
    scope_signature_cache: bool,

    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Cli {
    fn key_dir(&self) -> Result<PathBuf> {
        match &self.key_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(dao_profile_core::data_dir()?.join("keys")),
        }
    }

    fn key_path(&self) -> Result<PathBuf> {
        keystore_path(&self.key_dir()?, &self.key)
    }

    fn network_config(&self) -> NetworkConfig {
        if let Some(url) = &self.rpc_url {
            NetworkConfig {
                network: Network::Custom,
                custom_url: Some(url.clone()),
            }
        } else {
            NetworkConfig {
                network: self.network.unwrap_or_default(),
                custom_url: None,
            }
        }
    }

    fn has_explicit_network_flags(&self) -> bool {
        self.network.is_some() || self.rpc_url.is_some()
    }

    /// Resolve the effective network config, preferring explicit CLI flags over
    /// the keystore's stored config. Warns if the CLI overrides a different stored value.
    fn resolve_network_config(&self, stored: &NetworkConfig) -> NetworkConfig {
        if self.has_explicit_network_flags() {
            let cli_config = self.network_config();
            if cli_config != *stored {
                eprintln!(
                    "Warning: CLI network flag ({}) overrides keystore's stored network ({})",
                    cli_config.network, stored.network
                );
            }
            cli_config
        } else {
            stored.clone()
        }
    }

    fn deployments(&self) -> Deployments {
        Deployments {
            genesis_protocol: self.genesis_protocol,
            contribution_reward: self.contribution_reward,
        }
    }

    fn organization(&self) -> Option<OrganizationContext> {
        self.org.map(OrganizationContext::new)
    }

    fn cache_scope(&self) -> SignatureCacheScope {
        if self.scope_signature_cache {
            SignatureCacheScope::PerAccount
        } else {
            SignatureCacheScope::Global
        }
    }

    /// Wire the profile service for an unlocked keystore.
    /// Fails early when the node cannot be reached.
    async fn build_service(&self, keystore: &Keystore) -> Result<ProfileService> {
        let config = self.resolve_network_config(keystore.network_config());
        let network = Arc::new(NetworkClient::new(&config, self.insecure)?);
        tracing::debug!(network = %config.network, rpc = network.rpc_url(), "network selected");
        network.ensure_connected().await.with_context(|| {
            format!(
                "No chain connection on {} ({}). Check --network or --rpc-url",
                config.network,
                network.rpc_url()
            )
        })?;

        let provider = Arc::new(LocalWalletProvider::new(network.clone(), keystore.signer()));
        let resolver = Arc::new(RpcContractResolver::new(network, self.deployments()));
        let store = Arc::new(HttpProfileStore::new(&self.profile_api));
        let cache = Arc::new(SqliteCache::open().context("Failed to open signature cache")?);

        Ok(ProfileService::new(*keystore.address(), provider, resolver, store, cache)
            .with_cache_scope(self.cache_scope()))
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Cancel `token` on Ctrl-C until the returned handle is aborted.
pub(crate) fn cancel_on_interrupt(token: &CancellationToken) -> tokio::task::JoinHandle<()> {
    let token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, abandoning pending request");
            token.cancel();
        }
    })
}

fn read_password_stdin() -> Result<Zeroizing<String>> {
    let mut password = String::new();
    std::io::stdin()
        .read_line(&mut password)
        .context("Failed to read password from stdin")?;
    let trimmed = password
        .trim_end_matches('\n')
        .trim_end_matches('\r')
        .to_string();
    use zeroize::Zeroize;
    password.zeroize();
    Ok(Zeroizing::new(trimmed))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if let Some(cmd_str) = &cli.cmd {
        run_oneshot(&cli, cmd_str).await
    } else {
        repl::run_repl(&cli).await
    }
}

async fn run_oneshot(cli: &Cli, cmd_str: &str) -> Result<()> {
    let command = Command::parse(cmd_str)?;
    if command == Command::Exit {
        return Ok(());
    }
    if let Command::Help { command } = &command {
        println!("{}", dao_profile_core::commands::help_text(command.as_deref()));
        return Ok(());
    }
    if command == Command::Password {
        bail!("Changing the password is only available in the interactive shell.");
    }

    let password = if cli.password_stdin {
        read_password_stdin()?
    } else {
        Zeroizing::new(rpassword::prompt_password("Password: ").context("Failed to read password")?)
    };

    let key_path = cli.key_path()?;
    if !key_path.exists() {
        bail!(
            "Keystore not found: {}. Create one first by running dao-profile without --cmd.",
            key_path.display()
        );
    }

    let keystore = Keystore::open(&key_path, password.as_bytes())?;
    let service = cli.build_service(&keystore).await?;

    let cancel = CancellationToken::new();
    let interrupt = cancel_on_interrupt(&cancel);
    let result = command
        .execute(&service, cli.organization().as_ref(), cli.json, &cancel)
        .await;
    interrupt.abort();

    let output = result?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
