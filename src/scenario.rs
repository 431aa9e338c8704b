//! Scenario plans: named, ordered step lists loaded from TOML.
//!
//! ```toml
//! [contracts]
//! manager = "osmo1..."
//!
//! [[scenarios]]
//! name = "deploy_swap"
//! timeout_secs = 120
//!
//! [[scenarios.steps]]
//! action = "upload"
//! role = "swap"
//! artifact = "swap.wasm"
//!
//! [[scenarios.steps]]
//! action = "instantiate"
//! role = "swap"
//! msg = { debug = true }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cosmwasm_std::Coin;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::client::CodeId;
use crate::error::Error;
use crate::etf::EtfSwapRoutes;
use crate::utils::{deserialize_coin, deserialize_coins};

/// One action of a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Store a wasm artifact under `role`
    Upload { role: String, artifact: PathBuf },
    /// Instantiate the code uploaded for `role`, or `code_id` when given
    Instantiate {
        role: String,
        msg: Value,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        code_id: Option<CodeId>,
        #[serde(default, deserialize_with = "deserialize_coins")]
        funds: Vec<Coin>,
    },
    Execute {
        role: String,
        msg: Value,
        #[serde(default, deserialize_with = "deserialize_coins")]
        funds: Vec<Coin>,
    },
    /// Query `role`; with `expect` the response must match exactly
    Query {
        role: String,
        msg: Value,
        #[serde(default)]
        expect: Option<Value>,
    },
    Balance {
        #[serde(default)]
        address: Option<String>,
        denom: String,
    },
    Send {
        recipient: String,
        #[serde(deserialize_with = "deserialize_coins")]
        amount: Vec<Coin>,
    },
    /// Manager instantiates a swap contract from the code of `swap`
    InstantiateSwap {
        manager: String,
        swap: String,
        #[serde(default)]
        debug: bool,
        #[serde(default, deserialize_with = "deserialize_coins")]
        funds: Vec<Coin>,
    },
    /// Manager instantiates the CW20 token of an ETF from the code of `token`
    InstantiateCw20 {
        manager: String,
        token: String,
        etf_name: String,
        etf_symbol: String,
    },
    SwapTokens {
        manager: String,
        #[serde(default)]
        swap: Option<String>,
        #[serde(deserialize_with = "deserialize_coin")]
        initial_balance: Coin,
        etf: EtfSwapRoutes,
        #[serde(default, deserialize_with = "deserialize_coins")]
        funds: Vec<Coin>,
    },
    RedeemTokens {
        manager: String,
        etf_name: String,
        #[serde(default, deserialize_with = "deserialize_coins")]
        funds: Vec<Coin>,
    },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Upload { role, artifact } => {
                write!(f, "upload {} from {}", role, artifact.display())
            }
            Step::Instantiate { role, .. } => write!(f, "instantiate {}", role),
            Step::Execute { role, .. } => write!(f, "execute on {}", role),
            Step::Query { role, .. } => write!(f, "query {}", role),
            Step::Balance { address, denom } => match address {
                Some(address) => write!(f, "balance of {} in {}", address, denom),
                None => write!(f, "balance in {}", denom),
            },
            Step::Send { recipient, .. } => write!(f, "send to {}", recipient),
            Step::InstantiateSwap { manager, swap, .. } => {
                write!(f, "{} instantiates {}", manager, swap)
            }
            Step::InstantiateCw20 {
                manager, etf_name, ..
            } => write!(f, "{} instantiates token for {}", manager, etf_name),
            Step::SwapTokens { etf, .. } => write!(f, "swap into {}", etf.name()),
            Step::RedeemTokens { etf_name, .. } => write!(f, "redeem {}", etf_name),
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Named, ordered list of steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Overrides the configured scenario timeout
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            description: None,
            enabled: true,
            timeout_secs: None,
            steps,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs().max(1));
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Deadline for this scenario, falling back to `default`
    pub fn timeout(&self, default: Duration) -> Duration {
        self.timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(default)
    }
}

/// Scenarios in run order plus contracts known before the run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioPlan {
    /// Existing contract addresses by role
    #[serde(default)]
    pub contracts: BTreeMap<String, String>,
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}

impl ScenarioPlan {
    pub fn new(scenarios: Vec<Scenario>) -> Self {
        Self {
            contracts: BTreeMap::new(),
            scenarios,
        }
    }

    /// Load and validate a plan from a TOML file
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read plan {}: {}", path.display(), e))
        })?;
        let plan = Self::from_toml(&content)?;
        debug!(
            "Loaded plan {} with {} scenarios",
            path.display(),
            plan.scenarios.len()
        );
        Ok(plan)
    }

    pub fn from_toml(content: &str) -> Result<Self, Error> {
        let plan: ScenarioPlan =
            toml::from_str(content).map_err(|e| Error::Config(format!("Invalid plan: {}", e)))?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let mut seen = HashSet::new();
        for scenario in &self.scenarios {
            if scenario.name.trim().is_empty() {
                return Err(Error::Config("Scenario name must not be empty".to_string()));
            }
            if !seen.insert(scenario.name.as_str()) {
                return Err(Error::Config(format!(
                    "Duplicate scenario '{}'",
                    scenario.name
                )));
            }
            if scenario.timeout_secs == Some(0) {
                return Err(Error::Config(format!(
                    "Scenario '{}' has a zero timeout",
                    scenario.name
                )));
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    /// Enable or disable one scenario by name
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<(), Error> {
        let scenario = self
            .scenarios
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::Config(format!("Unknown scenario '{}'", name)))?;
        scenario.enabled = enabled;
        Ok(())
    }

    /// Enable exactly the named scenarios and disable the rest
    pub fn only<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), Error> {
        for name in names {
            if self.get(name.as_ref()).is_none() {
                return Err(Error::Config(format!(
                    "Unknown scenario '{}'",
                    name.as_ref()
                )));
            }
        }
        for scenario in &mut self.scenarios {
            scenario.enabled = names.iter().any(|n| n.as_ref() == scenario.name);
        }
        Ok(())
    }
}
