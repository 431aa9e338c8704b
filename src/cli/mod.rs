//! `etf-driver` command line interface.

mod bank;
mod contract;
mod run;
mod wallet;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::client::CosmWasmClient;
use crate::config::Settings;
use crate::driver::Driver;
use crate::error::Error;
use crate::wallet::Wallet;

pub use bank::{BalanceCommand, SendCommand};
pub use contract::{DeployCommand, ExecCommand, QueryCommand};
pub use run::RunCommand;
pub use wallet::{AddressCommand, FaucetCommand, GenerateCommand};

#[derive(Parser, Debug)]
#[command(name = "etf-driver")]
#[command(about = "Deploy and drive CosmWasm ETF contracts", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Network preset from config/network.toml
    #[arg(short, long, global = true)]
    pub network: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Show the wallet address
    Address(AddressCommand),
    /// Generate a new 12-word wallet
    Generate(GenerateCommand),
    /// Request test tokens from the network faucet
    Faucet(FaucetCommand),
    /// Show a bank balance
    Balance(BalanceCommand),
    /// Send tokens
    Send(SendCommand),
    /// Upload and instantiate a contract
    Deploy(DeployCommand),
    /// Execute a message on a contract
    Exec(ExecCommand),
    /// Query a contract
    Query(QueryCommand),
    /// Run a scenario plan
    Run(RunCommand),
    /// Show chain id and latest block height
    Status,
}

impl Cli {
    pub async fn execute(self) -> Result<(), Error> {
        let settings = Settings::from_sources(self.config.as_deref(), self.network.as_deref())?;
        debug!("Using network {}", settings.network.network_name);

        match self.command {
            Commands::Address(cmd) => cmd.execute(&settings),
            Commands::Generate(cmd) => cmd.execute(&settings),
            Commands::Faucet(cmd) => cmd.execute(&settings).await,
            Commands::Balance(cmd) => cmd.execute(&settings).await,
            Commands::Send(cmd) => cmd.execute(&settings).await,
            Commands::Deploy(cmd) => cmd.execute(&settings).await,
            Commands::Exec(cmd) => cmd.execute(&settings).await,
            Commands::Query(cmd) => cmd.execute(&settings).await,
            Commands::Run(cmd) => cmd.execute(settings).await,
            Commands::Status => status(&settings).await,
        }
    }
}

/// Parse arguments, run the command and map the result to an exit code
pub async fn run_cli() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.execute().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let kind = e.kind();
            eprintln!("error[{}]: {}", kind, e);
            ExitCode::from(kind.exit_code())
        }
    }
}

/// Logs go to stderr so command output stays parseable
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()))
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

pub(crate) fn load_wallet(settings: &Settings) -> Result<Wallet, Error> {
    Wallet::from_mnemonic(
        settings.require_mnemonic()?,
        &settings.network.account_prefix,
        settings.account_index,
    )
}

/// Driver signing with the configured wallet
pub(crate) fn signing_driver(settings: &Settings) -> Result<Driver<CosmWasmClient>, Error> {
    let wallet = load_wallet(settings)?;
    let sender = wallet.address()?.to_string();
    let client = CosmWasmClient::new(settings.network.clone())?.with_wallet(wallet);
    Ok(Driver::new(client, sender, settings.driver.clone()))
}

/// Driver for read-only commands; signs only when a mnemonic is configured
pub(crate) fn read_only_driver(settings: &Settings) -> Result<Driver<CosmWasmClient>, Error> {
    if settings.mnemonic.is_some() {
        return signing_driver(settings);
    }
    let client = CosmWasmClient::new(settings.network.clone())?;
    Ok(Driver::new(client, String::new(), settings.driver.clone()))
}

async fn status(settings: &Settings) -> Result<(), Error> {
    let client = CosmWasmClient::new(settings.network.clone())?;
    let height = client.get_last_block_height().await?;
    println!("Network: {}", settings.network.network_name);
    println!("Chain ID: {}", settings.network.chain_id);
    println!("RPC: {}", settings.network.rpc_url);
    println!("Latest block: {}", height);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_command() {
        let cli = Cli::try_parse_from([
            "etf-driver",
            "run",
            "--plan",
            "config/scenarios.toml",
            "--only",
            "deploy",
            "--only",
            "etf",
            "--continue-on-failure",
        ])
        .unwrap();

        match cli.command {
            Commands::Run(cmd) => {
                assert_eq!(cmd.only, vec!["deploy".to_string(), "etf".to_string()]);
                assert!(cmd.continue_on_failure);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_exec_with_global_flags() {
        let cli = Cli::try_parse_from([
            "etf-driver",
            "exec",
            "--contract",
            "osmo1contract",
            "--msg",
            r#"{"redeem_tokens":{"etf_name":"first_swap"}}"#,
            "--funds",
            "10uosmo",
            "-v",
            "--network",
            "local",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.network.as_deref(), Some("local"));
        assert!(matches!(cli.command, Commands::Exec(_)));
    }

    #[test]
    fn test_deploy_requires_artifact() {
        assert!(Cli::try_parse_from(["etf-driver", "deploy", "--init", "{}"]).is_err());
    }
}
