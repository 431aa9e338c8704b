#[cfg(test)]
#[allow(dead_code)]
pub mod test_utils {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use cosmwasm_std::{Coin, Uint128};
    use osmo_etf_driver::{
        ChainClient, CodeId, DriverConfig, Error, Operation, RetryPolicy, TxEvent, TxOutcome,
    };
    use serde_json::{json, Value};

    pub const SENDER: &str = "osmo1sender";

    /// Known-good BIP-39 test vector; never holds funds
    pub const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    /// Calls received by the mock, in order
    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Upload { sender: String, size: usize },
        Instantiate { code_id: CodeId, label: String, msg: Value },
        Execute { contract: String, msg: Value },
        Query { contract: String, msg: Value },
        Balance { address: String, denom: String },
        Send { recipient: String, amount: Vec<Coin> },
    }

    impl Call {
        pub fn operation(&self) -> Operation {
            match self {
                Call::Upload { .. } => Operation::Upload,
                Call::Instantiate { .. } => Operation::Instantiate,
                Call::Execute { .. } => Operation::Execute,
                Call::Query { .. } => Operation::Query,
                Call::Balance { .. } => Operation::Balance,
                Call::Send { .. } => Operation::Send,
            }
        }
    }

    #[derive(Debug, Clone)]
    struct ContractState {
        code_id: CodeId,
        executions: usize,
    }

    #[derive(Default)]
    struct State {
        calls: Vec<Call>,
        next_code_id: CodeId,
        next_contract: u64,
        codes: Vec<CodeId>,
        contracts: HashMap<String, ContractState>,
        balances: HashMap<(String, String), u128>,
        connection_failures_left: u32,
    }

    /// In-memory chain that stores code, instantiates contracts and answers
    /// queries deterministically
    pub struct MockChainClient {
        state: Mutex<State>,
        hang_on: Option<Operation>,
        reject_execute: Option<String>,
    }

    impl Default for MockChainClient {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockChainClient {
        pub fn new() -> Self {
            Self {
                state: Mutex::new(State {
                    next_code_id: 4880,
                    ..State::default()
                }),
                hang_on: None,
                reject_execute: None,
            }
        }

        /// Every call of `operation` never completes
        pub fn hanging_on(mut self, operation: Operation) -> Self {
            self.hang_on = Some(operation);
            self
        }

        /// Every execute is rejected with `log`
        pub fn rejecting_execute(mut self, log: &str) -> Self {
            self.reject_execute = Some(log.to_string());
            self
        }

        /// The next `count` calls fail with a connection error
        pub fn failing_connections(self, count: u32) -> Self {
            self.state.lock().unwrap().connection_failures_left = count;
            self
        }

        pub fn with_balance(self, address: &str, denom: &str, amount: u128) -> Self {
            self.state
                .lock()
                .unwrap()
                .balances
                .insert((address.to_string(), denom.to_string()), amount);
            self
        }

        pub fn calls(&self) -> Vec<Call> {
            self.state.lock().unwrap().calls.clone()
        }

        pub fn call_count(&self, operation: Operation) -> usize {
            self.calls()
                .iter()
                .filter(|c| c.operation() == operation)
                .count()
        }

        pub fn contract_count(&self) -> usize {
            self.state.lock().unwrap().contracts.len()
        }

        /// Record the call, then hang or fail as configured
        async fn enter(&self, call: Call) -> Result<(), Error> {
            let operation = call.operation();
            {
                let mut state = self.state.lock().unwrap();
                state.calls.push(call);
                if state.connection_failures_left > 0 {
                    state.connection_failures_left -= 1;
                    return Err(Error::ConnectionFailure("connection refused".to_string()));
                }
            }
            if self.hang_on == Some(operation) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(())
        }

        fn new_contract(state: &mut State, code_id: CodeId) -> String {
            state.next_contract += 1;
            let address = format!("osmo1contract{}", state.next_contract);
            state.contracts.insert(
                address.clone(),
                ContractState {
                    code_id,
                    executions: 0,
                },
            );
            address
        }

        fn outcome(state: &State, events: Vec<TxEvent>) -> TxOutcome {
            TxOutcome {
                tx_hash: format!("{:064X}", state.calls.len()),
                height: 100 + state.calls.len() as i64,
                gas_wanted: 200_000,
                gas_used: 150_000,
                events,
            }
        }
    }

    #[async_trait]
    impl ChainClient for MockChainClient {
        async fn upload(&self, sender: &str, wasm: Vec<u8>) -> Result<CodeId, Error> {
            self.enter(Call::Upload {
                sender: sender.to_string(),
                size: wasm.len(),
            })
            .await?;

            if wasm.is_empty() {
                return Err(Error::UploadRejected("Error calling the VM: empty wasm code".to_string()));
            }
            let mut state = self.state.lock().unwrap();
            let code_id = state.next_code_id;
            state.next_code_id += 1;
            state.codes.push(code_id);
            Ok(code_id)
        }

        async fn instantiate(
            &self,
            _sender: &str,
            code_id: CodeId,
            msg: &Value,
            label: &str,
            _funds: &[Coin],
        ) -> Result<String, Error> {
            self.enter(Call::Instantiate {
                code_id,
                label: label.to_string(),
                msg: msg.clone(),
            })
            .await?;

            let mut state = self.state.lock().unwrap();
            if !state.codes.contains(&code_id) {
                return Err(Error::InstantiateRejected(format!("no such code: {}", code_id)));
            }
            Ok(Self::new_contract(&mut state, code_id))
        }

        async fn execute(
            &self,
            _sender: &str,
            contract: &str,
            msg: &Value,
            _funds: &[Coin],
        ) -> Result<TxOutcome, Error> {
            self.enter(Call::Execute {
                contract: contract.to_string(),
                msg: msg.clone(),
            })
            .await?;

            if let Some(log) = &self.reject_execute {
                return Err(Error::ExecuteRejected(log.clone()));
            }

            let mut state = self.state.lock().unwrap();
            match state.contracts.get_mut(contract) {
                Some(contract) => contract.executions += 1,
                None => {
                    return Err(Error::ExecuteRejected(format!(
                        "contract {}: not found",
                        contract
                    )))
                }
            }

            // Manager messages that instantiate a sub-contract emit its address
            let sub_code = msg
                .get("instantiate_swap")
                .or_else(|| msg.get("instantiate_cw20"))
                .and_then(|m| m.get("code_id"))
                .and_then(Value::as_u64);

            let mut events = vec![TxEvent::new("execute", vec![("_contract_address", contract)])];
            if let Some(code_id) = sub_code {
                let address = Self::new_contract(&mut state, code_id);
                let code_id = code_id.to_string();
                events.push(TxEvent::new(
                    "instantiate",
                    vec![("_contract_address", address.as_str()), ("code_id", code_id.as_str())],
                ));
            }
            Ok(Self::outcome(&state, events))
        }

        async fn query(&self, contract: &str, msg: &Value) -> Result<Value, Error> {
            self.enter(Call::Query {
                contract: contract.to_string(),
                msg: msg.clone(),
            })
            .await?;

            let state = self.state.lock().unwrap();
            let contract_state = state.contracts.get(contract).ok_or_else(|| {
                Error::QueryRejected(format!("contract {}: not found", contract))
            })?;
            // Manager queries answer in the contract's response shape
            if msg.get("get_initial_swap").is_some() {
                return Ok(json!({"initial_swap": {"denom": "uosmo", "amount": "5000"}}));
            }
            if let Some(etf_type) = msg.pointer("/get_balance/etf_type").and_then(Value::as_str) {
                return Ok(json!({"balance": {"denom": etf_type, "amount": contract_state.executions.to_string()}}));
            }
            if msg.get("get_tokens").is_some() {
                return Ok(json!({"tokens_per_etf": [{"denom": "uion", "amount": "1250"}]}));
            }
            Ok(json!({
                "contract": contract,
                "code_id": contract_state.code_id,
                "executions": contract_state.executions,
                "query": msg,
            }))
        }

        async fn balance(&self, address: &str, denom: &str) -> Result<Coin, Error> {
            self.enter(Call::Balance {
                address: address.to_string(),
                denom: denom.to_string(),
            })
            .await?;

            let state = self.state.lock().unwrap();
            let amount = state
                .balances
                .get(&(address.to_string(), denom.to_string()))
                .copied()
                .unwrap_or_default();
            Ok(Coin {
                denom: denom.to_string(),
                amount: Uint128::new(amount),
            })
        }

        async fn send(
            &self,
            _sender: &str,
            recipient: &str,
            amount: &[Coin],
        ) -> Result<TxOutcome, Error> {
            self.enter(Call::Send {
                recipient: recipient.to_string(),
                amount: amount.to_vec(),
            })
            .await?;

            let mut state = self.state.lock().unwrap();
            for coin in amount {
                *state
                    .balances
                    .entry((recipient.to_string(), coin.denom.clone()))
                    .or_default() += coin.amount.u128();
            }
            Ok(Self::outcome(&state, vec![TxEvent::new("transfer", vec![("recipient", recipient)])]))
        }
    }

    /// Driver config with a short scenario deadline
    pub fn test_driver_config() -> DriverConfig {
        DriverConfig {
            operation_timeout_secs: 5,
            scenario_timeout_secs: 10,
            continue_on_failure: false,
            retry: RetryPolicy {
                max_retries: 0,
                initial_backoff_ms: 1,
                backoff_multiplier: 1.0,
            },
            ..DriverConfig::default()
        }
    }

    /// Initialize test logging once
    pub fn init_test_env() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}
