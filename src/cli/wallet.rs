use clap::Args;

use crate::client::request_faucet;
use crate::config::Settings;
use crate::error::Error;
use crate::wallet::Wallet;

use super::load_wallet;

#[derive(Args, Debug, Clone)]
pub struct AddressCommand {
    /// Also print the public key
    #[arg(long)]
    pub public_key: bool,
}

impl AddressCommand {
    pub fn execute(self, settings: &Settings) -> Result<(), Error> {
        let info = load_wallet(settings)?.info()?;
        println!("{}", info.address);
        if self.public_key {
            println!("Public key: {}", info.public_key);
        }
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct GenerateCommand {
    /// Bech32 prefix; defaults to the network's
    #[arg(long)]
    pub prefix: Option<String>,
}

impl GenerateCommand {
    pub fn execute(self, settings: &Settings) -> Result<(), Error> {
        let prefix = self
            .prefix
            .as_deref()
            .unwrap_or(&settings.network.account_prefix);
        let (wallet, mnemonic) = Wallet::generate(prefix)?;

        println!("Address: {}", wallet.address()?);
        println!("Mnemonic: {}", mnemonic);
        println!();
        println!("IMPORTANT: store the mnemonic safely. It cannot be recovered.");
        Ok(())
    }
}

#[derive(Args, Debug, Clone)]
pub struct FaucetCommand {
    /// Address to fund; defaults to the wallet's
    #[arg(short, long)]
    pub address: Option<String>,

    /// Denom to request; defaults to the fee denom
    #[arg(short, long)]
    pub denom: Option<String>,
}

impl FaucetCommand {
    pub async fn execute(self, settings: &Settings) -> Result<(), Error> {
        let faucet_url = settings.network.faucet_url.as_deref().ok_or_else(|| {
            Error::Config(format!(
                "No faucet configured for {}",
                settings.network.network_name
            ))
        })?;

        let address = match self.address {
            Some(address) => address,
            None => load_wallet(settings)?.address()?.to_string(),
        };
        let denom = match self.denom {
            Some(denom) => denom,
            None => settings.network.parsed_gas_price()?.denom,
        };

        let response = request_faucet(faucet_url, &address, &denom).await?;
        println!("Faucet request for {} ({}) accepted", address, denom);
        if !response.trim().is_empty() {
            println!("{}", response.trim());
        }
        Ok(())
    }
}
