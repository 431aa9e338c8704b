use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};

use cosmwasm_std::Coin;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::client::{ChainClient, CodeId, TxOutcome};
use crate::config::DriverConfig;
use crate::error::{Error, ErrorKind, Operation};
use crate::etf::{
    EtfSwapRoutes, GetBalanceResponse, GetInitialSwapResponse, GetTokensResponse,
    ManagerExecuteMsg, ManagerQueryMsg,
};
use crate::registry::ContractRegistry;

/// Step execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Success,
    Failed,
}

/// Outcome of one driver operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub operation: Operation,
    /// Contract role the operation targeted, if any
    pub role: Option<String>,
    pub status: StepStatus,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
}

/// Sequences upload, instantiate, execute and query against one chain client
/// and keeps what each step produced for the steps after it.
pub struct Driver<C> {
    client: C,
    /// Address every transaction is sent from
    sender: String,
    registry: ContractRegistry,
    config: DriverConfig,
    steps: Vec<StepReport>,
}

impl<C: ChainClient> Driver<C> {
    pub fn new(client: C, sender: impl Into<String>, config: DriverConfig) -> Self {
        Self {
            client,
            sender: sender.into(),
            registry: ContractRegistry::new(),
            config,
            steps: Vec::new(),
        }
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn registry(&self) -> &ContractRegistry {
        &self.registry
    }

    /// Register a contract instantiated outside this run
    pub fn adopt(&mut self, role: &str, address: impl Into<String>) {
        self.registry.record_address(role, address);
    }

    /// Register code stored outside this run
    pub fn adopt_code(&mut self, role: &str, code_id: CodeId) {
        self.registry.record_code(role, code_id);
    }

    /// Step reports recorded since the last call
    pub fn take_step_reports(&mut self) -> Vec<StepReport> {
        std::mem::take(&mut self.steps)
    }

    /// Store `wasm` and record its code id under `role`
    pub async fn upload(&mut self, role: &str, wasm: Vec<u8>) -> Result<CodeId, Error> {
        let started = Instant::now();
        let result = self.upload_inner(wasm).await;
        if let Ok(code_id) = result {
            info!("Uploaded {} as code {}", role, code_id);
            self.registry.record_code(role, code_id);
        }
        self.record(Operation::Upload, Some(role), started, &result);
        result
    }

    /// Read a wasm artifact from disk and upload it
    pub async fn upload_artifact(&mut self, role: &str, path: &Path) -> Result<CodeId, Error> {
        let path = self.config.artifact_path(path);
        match tokio::fs::read(&path).await {
            Ok(wasm) => self.upload(role, wasm).await,
            Err(source) => {
                let result = Err(Error::Artifact { path, source });
                self.record(Operation::Upload, Some(role), Instant::now(), &result);
                result
            }
        }
    }

    async fn upload_inner(&self, wasm: Vec<u8>) -> Result<CodeId, Error> {
        let client = &self.client;
        let sender = self.sender.as_str();
        let wasm = &wasm;
        self.call(Operation::Upload, move || client.upload(sender, wasm.clone()))
            .await
    }

    /// Instantiate the code recorded under `role` and record the address
    pub async fn instantiate(
        &mut self,
        role: &str,
        msg: &Value,
        label: Option<&str>,
        funds: &[Coin],
    ) -> Result<String, Error> {
        let started = Instant::now();
        let result = self
            .instantiate_inner(role, msg, label.unwrap_or(role), funds)
            .await;
        if let Ok(address) = &result {
            info!("Instantiated {} at {}", role, address);
            self.registry.record_address(role, address.clone());
        }
        self.record(Operation::Instantiate, Some(role), started, &result);
        result
    }

    async fn instantiate_inner(
        &self,
        role: &str,
        msg: &Value,
        label: &str,
        funds: &[Coin],
    ) -> Result<String, Error> {
        let code_id = self.registry.code_id(role)?;
        let client = &self.client;
        let sender = self.sender.as_str();
        self.call(Operation::Instantiate, move || {
            client.instantiate(sender, code_id, msg, label, funds)
        })
        .await
    }

    /// Execute `msg` on the contract instantiated under `role`
    pub async fn execute(
        &mut self,
        role: &str,
        msg: &Value,
        funds: &[Coin],
    ) -> Result<TxOutcome, Error> {
        let started = Instant::now();
        let result = self.execute_inner(role, msg, funds).await;
        self.record(Operation::Execute, Some(role), started, &result);
        result
    }

    async fn execute_inner(
        &self,
        role: &str,
        msg: &Value,
        funds: &[Coin],
    ) -> Result<TxOutcome, Error> {
        let contract = self.registry.address(role)?;
        let client = &self.client;
        let sender = self.sender.as_str();
        self.call(Operation::Execute, move || {
            client.execute(sender, contract, msg, funds)
        })
        .await
    }

    /// Query the contract instantiated under `role`
    pub async fn query(&mut self, role: &str, msg: &Value) -> Result<Value, Error> {
        let started = Instant::now();
        let result = self.query_inner(role, msg).await;
        self.record(Operation::Query, Some(role), started, &result);
        result
    }

    async fn query_inner(&self, role: &str, msg: &Value) -> Result<Value, Error> {
        let contract = self.registry.address(role)?;
        let client = &self.client;
        self.call(Operation::Query, move || client.query(contract, msg))
            .await
    }

    /// Execute a typed message
    pub async fn execute_msg<M: Serialize>(
        &mut self,
        role: &str,
        msg: &M,
        funds: &[Coin],
    ) -> Result<TxOutcome, Error> {
        let msg = serde_json::to_value(msg)?;
        self.execute(role, &msg, funds).await
    }

    /// Query with a typed message and response
    pub async fn query_as<Q: Serialize, R: DeserializeOwned>(
        &mut self,
        role: &str,
        msg: &Q,
    ) -> Result<R, Error> {
        let msg = serde_json::to_value(msg)?;
        let value = self.query(role, &msg).await?;
        serde_json::from_value(value).map_err(Into::into)
    }

    /// Bank balance of `address`, or of the sender
    pub async fn balance(&mut self, address: Option<&str>, denom: &str) -> Result<Coin, Error> {
        let started = Instant::now();
        let address = address.unwrap_or(self.sender.as_str()).to_string();
        let result = {
            let client = &self.client;
            let address = address.as_str();
            self.call(Operation::Balance, move || client.balance(address, denom))
                .await
        };
        self.record(Operation::Balance, None, started, &result);
        result
    }

    /// Bank transfer from the sender
    pub async fn send(&mut self, recipient: &str, amount: &[Coin]) -> Result<TxOutcome, Error> {
        let started = Instant::now();
        let result = {
            let client = &self.client;
            let sender = self.sender.as_str();
            self.call(Operation::Send, move || client.send(sender, recipient, amount))
                .await
        };
        self.record(Operation::Send, None, started, &result);
        result
    }

    /// Have the manager instantiate a swap contract from the code recorded
    /// under `swap_role`; the new address is recorded under `swap_role`.
    pub async fn instantiate_swap_via_manager(
        &mut self,
        manager_role: &str,
        swap_role: &str,
        debug: bool,
        funds: &[Coin],
    ) -> Result<TxOutcome, Error> {
        let code_id = self.registry.code_id(swap_role)?;
        let msg = ManagerExecuteMsg::InstantiateSwap { code_id, debug };
        let outcome = self.execute_msg(manager_role, &msg, funds).await?;
        self.record_instantiated(swap_role, &outcome);
        Ok(outcome)
    }

    /// Have the manager instantiate the CW20 token of an ETF from the code
    /// recorded under `token_role`.
    pub async fn instantiate_cw20_via_manager(
        &mut self,
        manager_role: &str,
        token_role: &str,
        etf_name: &str,
        etf_symbol: &str,
    ) -> Result<TxOutcome, Error> {
        let code_id = self.registry.code_id(token_role)?;
        let msg = ManagerExecuteMsg::InstantiateCw20 {
            code_id,
            etf_name: etf_name.to_string(),
            etf_symbol: etf_symbol.to_string(),
        };
        let outcome = self.execute_msg(manager_role, &msg, &[]).await?;
        self.record_instantiated(token_role, &outcome);
        Ok(outcome)
    }

    fn record_instantiated(&mut self, role: &str, outcome: &TxOutcome) {
        match outcome.find_attribute("instantiate", "_contract_address") {
            Some(address) => self.registry.record_address(role, address),
            None => warn!("No instantiate event for {} in tx {}", role, outcome.tx_hash),
        }
    }

    /// Swap `initial_balance` across the bundle's routes through the manager
    pub async fn swap_tokens(
        &mut self,
        manager_role: &str,
        swap_role: Option<&str>,
        initial_balance: Coin,
        etf: &EtfSwapRoutes,
        funds: &[Coin],
    ) -> Result<TxOutcome, Error> {
        let contract = swap_role
            .map(|role| self.registry.address(role).map(str::to_string))
            .transpose()?;
        debug!(
            "Swapping {} into {} routes of {}",
            initial_balance,
            etf.routes().len(),
            etf.name()
        );
        let msg = ManagerExecuteMsg::SwapTokens {
            contract,
            initial_balance,
            etf_swap_routes: etf.clone(),
        };
        self.execute_msg(manager_role, &msg, funds).await
    }

    /// Redeem an ETF for its underlying assets
    pub async fn redeem_tokens(
        &mut self,
        manager_role: &str,
        etf_name: &str,
        funds: &[Coin],
    ) -> Result<TxOutcome, Error> {
        let msg = ManagerExecuteMsg::RedeemTokens {
            etf_name: etf_name.to_string(),
        };
        self.execute_msg(manager_role, &msg, funds).await
    }

    /// Tokens the sender holds per ETF
    pub async fn get_tokens(
        &mut self,
        manager_role: &str,
        etf_type: &str,
    ) -> Result<GetTokensResponse, Error> {
        let msg = ManagerQueryMsg::GetTokens {
            sender: self.sender.clone(),
            etf_type: etf_type.to_string(),
        };
        self.query_as(manager_role, &msg).await
    }

    /// Sender's balance of one ETF
    pub async fn get_balance(
        &mut self,
        manager_role: &str,
        etf_type: &str,
    ) -> Result<GetBalanceResponse, Error> {
        let msg = ManagerQueryMsg::GetBalance {
            sender: self.sender.clone(),
            etf_type: etf_type.to_string(),
        };
        self.query_as(manager_role, &msg).await
    }

    pub async fn get_initial_swap(
        &mut self,
        manager_role: &str,
    ) -> Result<GetInitialSwapResponse, Error> {
        let msg = ManagerQueryMsg::GetInitialSwap {
            sender: self.sender.clone(),
        };
        self.query_as(manager_role, &msg).await
    }

    /// Run one client call under the operation deadline, retrying timeouts
    /// and connection failures as the retry policy allows
    async fn call<T, F, Fut>(&self, operation: Operation, mut f: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let deadline = self.config.operation_timeout();
        let mut attempt = 0;

        loop {
            let result = match timeout(deadline, f()).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout {
                    operation,
                    after: deadline,
                }),
            };

            match result {
                Err(e) if e.is_retryable() && attempt < self.config.retry.max_retries => {
                    attempt += 1;
                    let backoff = self.config.retry.backoff(attempt);
                    warn!(
                        "{} failed ({}), retry {}/{} in {}ms",
                        operation,
                        e,
                        attempt,
                        self.config.retry.max_retries,
                        backoff.as_millis()
                    );
                    sleep(backoff).await;
                }
                other => return other,
            }
        }
    }

    fn record<T>(
        &mut self,
        operation: Operation,
        role: Option<&str>,
        started: Instant,
        result: &Result<T, Error>,
    ) {
        let duration_ms = duration_ms(started.elapsed());
        let report = match result {
            Ok(_) => StepReport {
                operation,
                role: role.map(str::to_string),
                status: StepStatus::Success,
                duration_ms,
                error: None,
                error_kind: None,
            },
            Err(e) => {
                warn!("{} on {:?} failed: {}", operation, role, e);
                StepReport {
                    operation,
                    role: role.map(str::to_string),
                    status: StepStatus::Failed,
                    duration_ms,
                    error: Some(e.detail()),
                    error_kind: Some(e.kind()),
                }
            }
        };
        self.steps.push(report);
    }
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    duration.as_millis().min(u64::MAX as u128) as u64
}
