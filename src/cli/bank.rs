use clap::Args;

use crate::config::Settings;
use crate::error::Error;
use crate::utils::parse_coins;

use super::{read_only_driver, signing_driver};

#[derive(Args, Debug, Clone)]
pub struct BalanceCommand {
    /// Address to check; defaults to the wallet's
    #[arg(short, long)]
    pub address: Option<String>,

    /// Denom to check; defaults to the fee denom
    #[arg(short, long)]
    pub denom: Option<String>,
}

impl BalanceCommand {
    pub async fn execute(self, settings: &Settings) -> Result<(), Error> {
        let denom = match self.denom {
            Some(denom) => denom,
            None => settings.network.parsed_gas_price()?.denom,
        };

        let mut driver = read_only_driver(settings)?;
        if self.address.is_none() && driver.sender().is_empty() {
            settings.require_mnemonic()?;
        }

        let coin = driver.balance(self.address.as_deref(), &denom).await?;
        println!("{} {}", coin.amount, coin.denom);
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct SendCommand {
    /// Recipient address
    #[arg(short, long)]
    pub to: String,

    /// Amount as `<amount><denom>`, comma separated for several coins
    #[arg(short, long)]
    pub amount: String,
}

impl SendCommand {
    pub async fn execute(self, settings: &Settings) -> Result<(), Error> {
        let amount = parse_coins(&self.amount)?;
        if amount.is_empty() {
            return Err(Error::Config("Nothing to send".to_string()));
        }

        let mut driver = signing_driver(settings)?;
        let outcome = driver.send(&self.to, &amount).await?;

        println!("Sent {} to {}", self.amount, self.to);
        println!("Transaction: {}", outcome.tx_hash);
        println!("Gas used: {}/{}", outcome.gas_used, outcome.gas_wanted);
        println!("Events:");
        println!("{}", serde_json::to_string_pretty(&outcome.events)?);
        Ok(())
    }
}
