pub mod cli;
pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod etf;
pub mod registry;
pub mod runner;
pub mod scenario;
pub mod utils;
pub mod wallet;

pub use client::{ChainClient, CodeId, CosmWasmClient, TxEvent, TxOutcome};
pub use config::{DriverConfig, NetworkConfig, RetryPolicy, Settings};
pub use driver::{Driver, StepReport, StepStatus};
pub use error::{Error, ErrorKind, Operation};
pub use etf::{EtfSwapRoutes, SwapRoute};
pub use registry::ContractRegistry;
pub use runner::{Outcome, RunReport, RunSummary, ScenarioReport, ScenarioRunner};
pub use scenario::{Scenario, ScenarioPlan, Step};
pub use wallet::Wallet;

// Re-export common types from cosmwasm-std
pub use cosmwasm_std::{Coin, Uint128};
