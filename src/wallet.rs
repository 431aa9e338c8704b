use bip32::DerivationPath;
use bip39::Mnemonic;
use cosmrs::{
    crypto::secp256k1::SigningKey,
    crypto::PublicKey,
    tx::{BodyBuilder, Fee, Raw, SignDoc, SignerInfo},
    AccountId, Coin as CosmosCoin, Denom,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::GasPrice;
use crate::error::Error;

/// HD Path prefix for Cosmos chains (BIP-44)
const HD_PATH_PREFIX: &str = "m/44'/118'/0'/0/";

/// HD wallet holding one secp256k1 signing key
pub struct Wallet {
    /// The signing account
    signing_account: SigningKey,
    /// Bech32 prefix addresses are rendered with
    account_prefix: String,
}

/// Shows the address only; the key never leaves the wallet
impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let address = self
            .address()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "<invalid>".to_string());
        f.debug_struct("Wallet")
            .field("address", &address)
            .field("prefix", &self.account_prefix)
            .finish_non_exhaustive()
    }
}

/// Wallet info that can be serialized safely
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletInfo {
    /// The wallet address
    pub address: String,
    /// The public key
    pub public_key: String,
}

impl Wallet {
    /// Derive a wallet from a mnemonic at `m/44'/118'/0'/0/{account_index}`
    pub fn from_mnemonic(mnemonic: &str, prefix: &str, account_index: u32) -> Result<Self, Error> {
        let mnemonic =
            Mnemonic::from_str(mnemonic.trim()).map_err(|e| Error::InvalidMnemonic(e.to_string()))?;

        let seed = mnemonic.to_seed("");
        let seed = bip32::Seed::new(seed);

        let path = format!("{}{}", HD_PATH_PREFIX, account_index);
        let path = DerivationPath::from_str(&path)
            .map_err(|e| Error::Wallet(format!("Invalid derivation path: {}", e)))?;

        let derived_key = bip32::XPrv::derive_from_path(seed.as_bytes(), &path)
            .map_err(|e| Error::Wallet(format!("Key derivation error: {}", e)))?;

        let derived_key_bytes = derived_key.to_bytes();
        let signing_account = SigningKey::from_slice(&derived_key_bytes)
            .map_err(|e| Error::Wallet(format!("Failed to create signing account: {}", e)))?;

        if prefix.is_empty() {
            return Err(Error::Config("Account prefix must not be empty".to_string()));
        }

        Ok(Self {
            signing_account,
            account_prefix: prefix.to_string(),
        })
    }

    /// Generate a new random wallet with a 12-word mnemonic
    pub fn generate(prefix: &str) -> Result<(Self, String), Error> {
        use rand::{thread_rng, RngCore};

        // 128 bits of entropy for a 12-word mnemonic
        let mut entropy = [0u8; 16];
        thread_rng().fill_bytes(&mut entropy);

        let mnemonic = Mnemonic::from_entropy(&entropy)
            .map_err(|e| Error::Wallet(format!("Failed to generate mnemonic: {}", e)))?;

        let phrase = mnemonic.to_string();
        let wallet = Self::from_mnemonic(&phrase, prefix, 0)?;

        Ok((wallet, phrase))
    }

    /// Get the wallet's address
    pub fn address(&self) -> Result<AccountId, Error> {
        self.signing_account
            .public_key()
            .account_id(&self.account_prefix)
            .map_err(|e| Error::Wallet(format!("Failed to get account ID: {}", e)))
    }

    /// Get the public key
    pub fn public_key(&self) -> PublicKey {
        self.signing_account.public_key()
    }

    /// Prepare and sign a transaction with body and auth info
    #[allow(clippy::too_many_arguments)]
    pub fn sign_tx(
        &self,
        account_number: u64,
        sequence: u64,
        chain_id: &str,
        fee: Fee,
        msgs: Vec<cosmrs::Any>,
        timeout_height: Option<u32>,
        memo: Option<String>,
    ) -> Result<Raw, Error> {
        let mut body_builder = BodyBuilder::new();
        body_builder.msgs(msgs);

        if let Some(memo_text) = memo {
            body_builder.memo(memo_text);
        }

        if let Some(height) = timeout_height {
            body_builder.timeout_height(height);
        }

        let tx_body = body_builder.finish();

        let signer_info = SignerInfo::single_direct(Some(self.public_key()), sequence);
        let auth_info = signer_info.auth_info(fee);

        let chain_id = cosmrs::tendermint::chain::Id::from_str(chain_id)
            .map_err(|e| Error::Config(format!("Invalid chain ID: {}", e)))?;

        let sign_doc = SignDoc::new(&tx_body, &auth_info, &chain_id, account_number)
            .map_err(|e| Error::Wallet(format!("Failed to create sign doc: {}", e)))?;

        sign_doc
            .sign(&self.signing_account)
            .map_err(|e| Error::Wallet(format!("Failed to sign transaction: {}", e)))
    }

    /// Get wallet info
    pub fn info(&self) -> Result<WalletInfo, Error> {
        Ok(WalletInfo {
            address: self.address()?.to_string(),
            public_key: self.signing_account.public_key().to_string(),
        })
    }

    /// Fee for `gas_limit` at the given gas price, rounded up
    pub fn fee(&self, gas_limit: u64, gas_price: &GasPrice) -> Result<Fee, Error> {
        let denom = Denom::from_str(&gas_price.denom)
            .map_err(|e| Error::Config(format!("Invalid fee denom: {}", e)))?;

        let coin = CosmosCoin {
            amount: gas_price.fee_amount(gas_limit),
            denom,
        };

        Ok(Fee::from_amount_and_gas(coin, gas_limit))
    }
}
