use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use cosmos_sdk_proto::{
    cosmos::auth::v1beta1::{BaseAccount, QueryAccountRequest, QueryAccountResponse},
    cosmos::bank::v1beta1::{MsgSend, QueryBalanceRequest, QueryBalanceResponse},
    cosmos::base::v1beta1::Coin as ProtoCoin,
    cosmos::tx::v1beta1::{SimulateRequest, SimulateResponse},
    cosmwasm::wasm::v1::{
        MsgExecuteContract, MsgInstantiateContract, MsgStoreCode, QuerySmartContractStateRequest,
        QuerySmartContractStateResponse,
    },
};
use cosmrs::{
    rpc::{Client as RpcClient, HttpClient},
    tendermint::abci::types::ExecTxResult,
    Any,
};
use cosmwasm_std::{Coin, Uint128};
use prost::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::NetworkConfig;
use crate::error::{Error, Operation};
use crate::wallet::Wallet;

/// Gas limit used for the simulation transaction
const SIMULATION_GAS_LIMIT: u64 = 10_000_000;

/// Handle to stored, immutable contract bytecode
pub type CodeId = u64;

/// One event emitted by a committed transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxEvent {
    /// Event type, e.g. `wasm` or `instantiate`
    pub kind: String,
    pub attributes: Vec<(String, String)>,
}

impl TxEvent {
    pub fn new(kind: impl Into<String>, attributes: Vec<(&str, &str)>) -> Self {
        Self {
            kind: kind.into(),
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// First value recorded under `key`
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Outcome of a committed transaction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TxOutcome {
    pub tx_hash: String,
    pub height: i64,
    pub gas_wanted: i64,
    pub gas_used: i64,
    pub events: Vec<TxEvent>,
}

impl TxOutcome {
    /// First attribute `key` on an event of type `kind`
    pub fn find_attribute(&self, kind: &str, key: &str) -> Option<&str> {
        self.events
            .iter()
            .filter(|e| e.kind == kind)
            .find_map(|e| e.attribute(key))
    }
}

/// Signed connection to a CosmWasm chain
///
/// All methods may block for a network round trip plus block inclusion.
/// Callers bound them with their own deadline.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Store contract bytecode and return its code id
    async fn upload(&self, sender: &str, wasm: Vec<u8>) -> Result<CodeId, Error>;

    /// Instantiate stored code and return the new contract address
    async fn instantiate(
        &self,
        sender: &str,
        code_id: CodeId,
        msg: &Value,
        label: &str,
        funds: &[Coin],
    ) -> Result<String, Error>;

    /// Execute a contract message
    async fn execute(
        &self,
        sender: &str,
        contract: &str,
        msg: &Value,
        funds: &[Coin],
    ) -> Result<TxOutcome, Error>;

    /// Smart query; never mutates chain state
    async fn query(&self, contract: &str, msg: &Value) -> Result<Value, Error>;

    /// Bank balance of `address` in `denom`
    async fn balance(&self, address: &str, denom: &str) -> Result<Coin, Error>;

    /// Bank transfer
    async fn send(&self, sender: &str, recipient: &str, amount: &[Coin])
        -> Result<TxOutcome, Error>;
}

#[async_trait]
impl<T: ChainClient + ?Sized> ChainClient for Arc<T> {
    async fn upload(&self, sender: &str, wasm: Vec<u8>) -> Result<CodeId, Error> {
        (**self).upload(sender, wasm).await
    }

    async fn instantiate(
        &self,
        sender: &str,
        code_id: CodeId,
        msg: &Value,
        label: &str,
        funds: &[Coin],
    ) -> Result<String, Error> {
        (**self).instantiate(sender, code_id, msg, label, funds).await
    }

    async fn execute(
        &self,
        sender: &str,
        contract: &str,
        msg: &Value,
        funds: &[Coin],
    ) -> Result<TxOutcome, Error> {
        (**self).execute(sender, contract, msg, funds).await
    }

    async fn query(&self, contract: &str, msg: &Value) -> Result<Value, Error> {
        (**self).query(contract, msg).await
    }

    async fn balance(&self, address: &str, denom: &str) -> Result<Coin, Error> {
        (**self).balance(address, denom).await
    }

    async fn send(
        &self,
        sender: &str,
        recipient: &str,
        amount: &[Coin],
    ) -> Result<TxOutcome, Error> {
        (**self).send(sender, recipient, amount).await
    }
}

/// CosmWasm client over a Tendermint RPC endpoint
pub struct CosmWasmClient {
    /// RPC client for the chain
    rpc_client: Arc<Mutex<HttpClient>>,
    /// Network configuration
    config: NetworkConfig,
    /// Wallet for signing transactions
    wallet: Option<Wallet>,
}

impl CosmWasmClient {
    /// Create a new client with the given configuration
    pub fn new(config: NetworkConfig) -> Result<Self, Error> {
        let rpc_client = HttpClient::new(config.rpc_url.as_str()).map_err(|e| {
            Error::ConnectionFailure(format!("Failed to create RPC client: {}", e))
        })?;

        Ok(Self {
            rpc_client: Arc::new(Mutex::new(rpc_client)),
            config,
            wallet: None,
        })
    }

    /// Set the wallet for signing transactions
    pub fn with_wallet(mut self, wallet: Wallet) -> Self {
        self.wallet = Some(wallet);
        self
    }

    /// Get the wallet if available
    pub fn wallet(&self) -> Result<&Wallet, Error> {
        self.wallet
            .as_ref()
            .ok_or_else(|| Error::Config("No wallet configured".to_string()))
    }

    /// Get the network configuration
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Get last block height
    pub async fn get_last_block_height(&self) -> Result<u64, Error> {
        let rpc_client = self.rpc_client.lock().await;
        let block = rpc_client.latest_block().await.map_err(|e| {
            Error::ConnectionFailure(format!("Failed to get last block height: {}", e))
        })?;
        Ok(block.block.header.height.value())
    }

    /// The sender must be the configured signer
    fn signer_for(&self, sender: &str) -> Result<&Wallet, Error> {
        let wallet = self.wallet()?;
        let address = wallet.address()?.to_string();
        if address != sender {
            return Err(Error::Config(format!(
                "Sender {} does not match signer {}",
                sender, address
            )));
        }
        Ok(wallet)
    }

    /// Run an ABCI query, mapping a non-zero code to the operation's rejection
    async fn abci_query<Req: Message>(
        &self,
        path: &str,
        request: Req,
        operation: Operation,
    ) -> Result<Vec<u8>, Error> {
        let rpc_client = self.rpc_client.lock().await;
        let response = rpc_client
            .abci_query(Some(path.to_string()), request.encode_to_vec(), None, false)
            .await
            .map_err(|e| Error::ConnectionFailure(format!("ABCI query {} failed: {}", path, e)))?;

        if !response.code.is_ok() {
            return Err(Error::rejected(operation, response.log));
        }
        Ok(response.value)
    }

    /// Signer account; a missing or unfunded account rejects `operation`
    async fn account(&self, address: &str, operation: Operation) -> Result<BaseAccount, Error> {
        let value = self
            .abci_query(
                "/cosmos.auth.v1beta1.Query/Account",
                QueryAccountRequest {
                    address: address.to_string(),
                },
                operation,
            )
            .await?;

        let account_response = QueryAccountResponse::decode(value.as_slice()).map_err(|e| {
            Error::ConnectionFailure(format!("Failed to decode account response: {}", e))
        })?;

        let account_any = account_response.account.ok_or_else(|| {
            Error::rejected(operation, format!("account {} not found", address))
        })?;
        debug!("Account type_url: {}", account_any.type_url);

        BaseAccount::decode(account_any.value.as_slice())
            .map_err(|e| Error::ConnectionFailure(format!("Failed to decode BaseAccount: {}", e)))
    }

    /// Simulate a signed transaction and return the gas it used
    async fn simulate(&self, tx_bytes: Vec<u8>, operation: Operation) -> Result<u64, Error> {
        #[allow(deprecated)]
        let request = SimulateRequest { tx: None, tx_bytes };
        let value = self
            .abci_query("/cosmos.tx.v1beta1.Service/Simulate", request, operation)
            .await?;
        let response = SimulateResponse::decode(value.as_slice()).map_err(|e| {
            Error::ConnectionFailure(format!("Failed to decode simulate response: {}", e))
        })?;
        response
            .gas_info
            .map(|info| info.gas_used)
            .ok_or_else(|| Error::rejected(operation, "simulation returned no gas info"))
    }

    /// Sign, broadcast and wait for inclusion
    async fn broadcast_tx(
        &self,
        wallet: &Wallet,
        msgs: Vec<Any>,
        operation: Operation,
    ) -> Result<TxOutcome, Error> {
        let address = wallet.address()?.to_string();
        let account = self.account(&address, operation).await?;
        debug!(
            "Account number {}, sequence {}",
            account.account_number, account.sequence
        );

        let gas_price = self.config.parsed_gas_price()?;
        let chain_id = self.config.chain_id.as_str();

        let gas_limit = match self.config.gas_limit {
            Some(limit) => limit,
            None => {
                let simulation_tx = wallet.sign_tx(
                    account.account_number,
                    account.sequence,
                    chain_id,
                    wallet.fee(SIMULATION_GAS_LIMIT, &gas_price)?,
                    msgs.clone(),
                    None,
                    None,
                )?;
                let gas_used = self.simulate(encode_tx(&simulation_tx)?, operation).await?;
                let limit = (gas_used as f64 * self.config.gas_adjustment).ceil() as u64;
                debug!("Simulated gas {} -> limit {}", gas_used, limit);
                limit
            }
        };

        let tx_raw = wallet.sign_tx(
            account.account_number,
            account.sequence,
            chain_id,
            wallet.fee(gas_limit, &gas_price)?,
            msgs,
            None,
            None,
        )?;

        let response = {
            let rpc_client = self.rpc_client.lock().await;
            rpc_client
                .broadcast_tx_commit(encode_tx(&tx_raw)?)
                .await
                .map_err(|e| {
                    Error::ConnectionFailure(format!("Failed to broadcast transaction: {}", e))
                })?
        };

        if response.check_tx.code.is_err() {
            return Err(Error::rejected(operation, response.check_tx.log));
        }
        if response.tx_result.code.is_err() {
            return Err(Error::rejected(operation, response.tx_result.log));
        }

        let tx_hash = hex::encode_upper(response.hash.as_bytes());
        info!("{} committed in tx {}", operation, tx_hash);

        Ok(outcome_from_commit(
            tx_hash,
            response.height.value() as i64,
            response.tx_result,
        ))
    }
}

/// Events come straight from the commit response
fn outcome_from_commit(tx_hash: String, height: i64, result: ExecTxResult) -> TxOutcome {
    TxOutcome {
        tx_hash,
        height,
        gas_wanted: result.gas_wanted,
        gas_used: result.gas_used,
        events: result
            .events
            .into_iter()
            .map(|event| TxEvent {
                kind: event.kind,
                attributes: event
                    .attributes
                    .iter()
                    .map(|a| {
                        (
                            String::from_utf8_lossy(a.key_bytes()).into_owned(),
                            String::from_utf8_lossy(a.value_bytes()).into_owned(),
                        )
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn encode_tx(raw: &cosmrs::tx::Raw) -> Result<Vec<u8>, Error> {
    raw.to_bytes()
        .map_err(|e| Error::Wallet(format!("Failed to encode transaction: {}", e)))
}

fn to_proto_coins(funds: &[Coin]) -> Vec<ProtoCoin> {
    funds
        .iter()
        .map(|c| ProtoCoin {
            denom: c.denom.clone(),
            amount: c.amount.to_string(),
        })
        .collect()
}

fn to_any<M: Message>(type_url: &str, msg: &M) -> Any {
    Any {
        type_url: type_url.to_string(),
        value: msg.encode_to_vec(),
    }
}

#[async_trait]
impl ChainClient for CosmWasmClient {
    async fn upload(&self, sender: &str, wasm: Vec<u8>) -> Result<CodeId, Error> {
        let wallet = self.signer_for(sender)?;
        info!("Uploading {} bytes of wasm", wasm.len());

        let msg = MsgStoreCode {
            sender: sender.to_string(),
            wasm_byte_code: wasm,
            instantiate_permission: None,
        };
        let outcome = self
            .broadcast_tx(
                wallet,
                vec![to_any("/cosmwasm.wasm.v1.MsgStoreCode", &msg)],
                Operation::Upload,
            )
            .await?;

        let code_id = outcome
            .find_attribute("store_code", "code_id")
            .ok_or_else(|| {
                Error::ConnectionFailure(format!(
                    "Tx {} committed without a code_id event",
                    outcome.tx_hash
                ))
            })?;
        code_id.parse::<CodeId>().map_err(|_| {
            Error::ConnectionFailure(format!(
                "Tx {} committed with malformed code_id '{}'",
                outcome.tx_hash, code_id
            ))
        })
    }

    async fn instantiate(
        &self,
        sender: &str,
        code_id: CodeId,
        msg: &Value,
        label: &str,
        funds: &[Coin],
    ) -> Result<String, Error> {
        let wallet = self.signer_for(sender)?;
        info!("Instantiating code {} as '{}'", code_id, label);

        let msg = MsgInstantiateContract {
            sender: sender.to_string(),
            admin: String::new(),
            code_id,
            label: label.to_string(),
            msg: serde_json::to_vec(msg)?,
            funds: to_proto_coins(funds),
        };
        let outcome = self
            .broadcast_tx(
                wallet,
                vec![to_any("/cosmwasm.wasm.v1.MsgInstantiateContract", &msg)],
                Operation::Instantiate,
            )
            .await?;

        outcome
            .find_attribute("instantiate", "_contract_address")
            .map(str::to_string)
            .ok_or_else(|| {
                Error::ConnectionFailure(format!(
                    "Tx {} committed without a contract address event",
                    outcome.tx_hash
                ))
            })
    }

    async fn execute(
        &self,
        sender: &str,
        contract: &str,
        msg: &Value,
        funds: &[Coin],
    ) -> Result<TxOutcome, Error> {
        let wallet = self.signer_for(sender)?;
        debug!("Execute on {}: {}", contract, msg);

        let msg = MsgExecuteContract {
            sender: sender.to_string(),
            contract: contract.to_string(),
            msg: serde_json::to_vec(msg)?,
            funds: to_proto_coins(funds),
        };
        self.broadcast_tx(
            wallet,
            vec![to_any("/cosmwasm.wasm.v1.MsgExecuteContract", &msg)],
            Operation::Execute,
        )
        .await
    }

    async fn query(&self, contract: &str, msg: &Value) -> Result<Value, Error> {
        let request = QuerySmartContractStateRequest {
            address: contract.to_string(),
            query_data: serde_json::to_vec(msg)?,
        };
        let value = self
            .abci_query(
                "/cosmwasm.wasm.v1.Query/SmartContractState",
                request,
                Operation::Query,
            )
            .await?;

        let response = QuerySmartContractStateResponse::decode(value.as_slice()).map_err(|e| {
            Error::ConnectionFailure(format!("Failed to decode query response: {}", e))
        })?;
        serde_json::from_slice(&response.data).map_err(Into::into)
    }

    async fn balance(&self, address: &str, denom: &str) -> Result<Coin, Error> {
        let value = self
            .abci_query(
                "/cosmos.bank.v1beta1.Query/Balance",
                QueryBalanceRequest {
                    address: address.to_string(),
                    denom: denom.to_string(),
                },
                Operation::Balance,
            )
            .await?;

        let response = QueryBalanceResponse::decode(value.as_slice()).map_err(|e| {
            Error::ConnectionFailure(format!("Failed to decode balance response: {}", e))
        })?;
        let coin = response.balance.unwrap_or_else(|| ProtoCoin {
            denom: denom.to_string(),
            amount: "0".to_string(),
        });

        Ok(Coin {
            denom: coin.denom,
            amount: Uint128::from_str(&coin.amount)
                .map_err(|e| Error::QueryRejected(format!("Malformed amount: {}", e)))?,
        })
    }

    async fn send(
        &self,
        sender: &str,
        recipient: &str,
        amount: &[Coin],
    ) -> Result<TxOutcome, Error> {
        let wallet = self.signer_for(sender)?;
        info!("Sending {:?} to {}", amount, recipient);

        let msg = MsgSend {
            from_address: sender.to_string(),
            to_address: recipient.to_string(),
            amount: to_proto_coins(amount),
        };
        self.broadcast_tx(
            wallet,
            vec![to_any("/cosmos.bank.v1beta1.MsgSend", &msg)],
            Operation::Send,
        )
        .await
    }
}

/// Ask a testnet faucet for tokens
pub async fn request_faucet(faucet_url: &str, address: &str, denom: &str) -> Result<String, Error> {
    let response = reqwest::Client::new()
        .post(faucet_url)
        .json(&serde_json::json!({ "denom": denom, "address": address }))
        .send()
        .await
        .map_err(|e| Error::ConnectionFailure(format!("Faucet request failed: {}", e)))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::ConnectionFailure(format!("Faucet response unreadable: {}", e)))?;

    if !status.is_success() {
        return Err(Error::ExecuteRejected(format!("Faucet returned {}: {}", status, body)));
    }
    Ok(body)
}
