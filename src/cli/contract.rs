use std::path::PathBuf;

use clap::Args;

use crate::config::Settings;
use crate::error::Error;
use crate::utils::{parse_coins, parse_json};

use super::{read_only_driver, signing_driver};

/// Role used for contracts addressed directly from the command line
const CLI_ROLE: &str = "contract";

#[derive(Args, Debug, Clone)]
pub struct DeployCommand {
    /// Wasm artifact, resolved against the artifacts dir when relative
    #[arg(long)]
    pub artifact: PathBuf,

    /// Instantiate message as JSON
    #[arg(long)]
    pub init: String,

    /// Contract label; defaults to the role
    #[arg(long)]
    pub label: Option<String>,

    /// Role name used in logs
    #[arg(long, default_value = CLI_ROLE)]
    pub role: String,

    /// Funds sent with instantiate, e.g. `1000uosmo`
    #[arg(long)]
    pub funds: Option<String>,
}

impl DeployCommand {
    pub async fn execute(self, settings: &Settings) -> Result<(), Error> {
        let init = parse_json(&self.init)?;
        let funds = parse_coins(self.funds.as_deref().unwrap_or_default())?;

        let mut driver = signing_driver(settings)?;
        let code_id = driver.upload_artifact(&self.role, &self.artifact).await?;
        println!("Code ID: {}", code_id);

        let address = driver
            .instantiate(&self.role, &init, self.label.as_deref(), &funds)
            .await?;
        println!("Contract address: {}", address);
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct ExecCommand {
    /// Contract address
    #[arg(long)]
    pub contract: String,

    /// Execute message as JSON
    #[arg(long)]
    pub msg: String,

    /// Funds sent with the message, e.g. `1000uosmo`
    #[arg(long)]
    pub funds: Option<String>,
}

impl ExecCommand {
    pub async fn execute(self, settings: &Settings) -> Result<(), Error> {
        let msg = parse_json(&self.msg)?;
        let funds = parse_coins(self.funds.as_deref().unwrap_or_default())?;

        let mut driver = signing_driver(settings)?;
        driver.adopt(CLI_ROLE, self.contract.clone());
        let outcome = driver.execute(CLI_ROLE, &msg, &funds).await?;

        println!("Transaction: {}", outcome.tx_hash);
        println!("Height: {}", outcome.height);
        println!("Gas used: {}/{}", outcome.gas_used, outcome.gas_wanted);
        println!("Events:");
        println!("{}", serde_json::to_string_pretty(&outcome.events)?);
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct QueryCommand {
    /// Contract address
    #[arg(long)]
    pub contract: String,

    /// Query message as JSON
    #[arg(long)]
    pub msg: String,
}

impl QueryCommand {
    pub async fn execute(self, settings: &Settings) -> Result<(), Error> {
        let msg = parse_json(&self.msg)?;

        let mut driver = read_only_driver(settings)?;
        driver.adopt(CLI_ROLE, self.contract.clone());
        let response = driver.query(CLI_ROLE, &msg).await?;

        println!("{}", serde_json::to_string_pretty(&response)?);
        Ok(())
    }
}
