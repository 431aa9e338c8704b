//! Message model of the ETF manager and swap contracts.
//!
//! An ETF bundle is a name plus a list of swap routes, each paired with a
//! ratio weight. The manager contract mints a CW20 token per bundle and
//! splits an initial balance across the routes in proportion to the ratios.

use cosmwasm_std::{Coin, Uint128};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One hop of a swap path: trade through `pool_id` into `token_out_denom`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRoute {
    pub pool_id: u64,
    pub token_out_denom: String,
}

impl SwapRoute {
    pub fn new(pool_id: u64, token_out_denom: impl Into<String>) -> Self {
        Self {
            pool_id,
            token_out_denom: token_out_denom.into(),
        }
    }
}

/// Named bundle of routes with one ratio per route
///
/// Always valid once constructed: deserialization goes through [`EtfSwapRoutes::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEtfSwapRoutes")]
pub struct EtfSwapRoutes {
    name: String,
    routes: Vec<SwapRoute>,
    ratios: Vec<Uint128>,
}

#[derive(Deserialize)]
struct RawEtfSwapRoutes {
    name: String,
    routes: Vec<SwapRoute>,
    ratios: Vec<Uint128>,
}

impl TryFrom<RawEtfSwapRoutes> for EtfSwapRoutes {
    type Error = Error;

    fn try_from(raw: RawEtfSwapRoutes) -> Result<Self, Self::Error> {
        EtfSwapRoutes::new(raw.name, raw.routes, raw.ratios)
    }
}

impl EtfSwapRoutes {
    /// Build a bundle; N routes need exactly N non-zero ratios
    pub fn new(
        name: impl Into<String>,
        routes: Vec<SwapRoute>,
        ratios: Vec<Uint128>,
    ) -> Result<Self, Error> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::Config("ETF name must not be empty".to_string()));
        }
        if routes.is_empty() {
            return Err(Error::Config(format!("ETF '{}' has no routes", name)));
        }
        if routes.len() != ratios.len() {
            return Err(Error::Config(format!(
                "ETF '{}' has {} routes but {} ratios",
                name,
                routes.len(),
                ratios.len()
            )));
        }
        if let Some(index) = ratios.iter().position(Uint128::is_zero) {
            return Err(Error::Config(format!(
                "ETF '{}' has a zero ratio at position {}",
                name, index
            )));
        }

        Ok(Self {
            name,
            routes,
            ratios,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn routes(&self) -> &[SwapRoute] {
        &self.routes
    }

    pub fn ratios(&self) -> &[Uint128] {
        &self.ratios
    }

    /// Split `total` across the routes in proportion to the ratios.
    ///
    /// Integer division leaves a remainder, which goes to the last route so
    /// the parts always sum to `total`.
    pub fn split(&self, total: Uint128) -> Vec<Uint128> {
        let weight: Uint128 = self.ratios.iter().copied().sum();
        let mut parts: Vec<Uint128> = self
            .ratios
            .iter()
            .map(|ratio| total.multiply_ratio(*ratio, weight))
            .collect();

        let assigned: Uint128 = parts.iter().copied().sum();
        if let Some(last) = parts.last_mut() {
            *last += total - assigned;
        }
        parts
    }
}

/// Instantiate message of the manager contract
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagerInstantiateMsg {}

/// Instantiate message of the swap contract
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwapInstantiateMsg {
    pub debug: bool,
}

/// Execute messages of the manager contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerExecuteMsg {
    /// Let the manager instantiate a swap contract from stored code
    InstantiateSwap { code_id: u64, debug: bool },
    /// Let the manager instantiate the CW20 token backing an ETF
    InstantiateCw20 {
        code_id: u64,
        etf_name: String,
        etf_symbol: String,
    },
    /// Swap `initial_balance` across the bundle's routes and mint ETF tokens
    SwapTokens {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        contract: Option<String>,
        initial_balance: Coin,
        etf_swap_routes: EtfSwapRoutes,
    },
    /// Burn ETF tokens and return the underlying assets
    RedeemTokens { etf_name: String },
}

/// Query messages of the manager contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManagerQueryMsg {
    GetTokens { sender: String, etf_type: String },
    GetInitialSwap { sender: String },
    GetBalance { sender: String, etf_type: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetTokensResponse {
    pub tokens_per_etf: Vec<Coin>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetBalanceResponse {
    pub balance: Coin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetInitialSwapResponse {
    pub initial_swap: Coin,
}

/// Query messages of the swap contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapQueryMsg {
    QueryNumPools {},
    QueryEpochsInfo {},
    QueryPool { pool_id: u64 },
    QueryPoolParams { pool_id: u64 },
    QueryMap { key: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bull_market() -> EtfSwapRoutes {
        EtfSwapRoutes::new(
            "Bull_Market_Is_Coming",
            vec![SwapRoute::new(1, "uion"), SwapRoute::new(2, "uatom")],
            vec![Uint128::new(1), Uint128::new(3)],
        )
        .unwrap()
    }

    #[test]
    fn test_mismatched_ratios_are_rejected() {
        let err = EtfSwapRoutes::new(
            "first_swap",
            vec![SwapRoute::new(1, "uion"), SwapRoute::new(2, "uatom")],
            vec![Uint128::new(1)],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("2 routes but 1 ratios"));
    }

    #[test]
    fn test_zero_ratio_and_empty_bundle_are_rejected() {
        assert!(EtfSwapRoutes::new("x", vec![], vec![]).is_err());
        assert!(EtfSwapRoutes::new("x", vec![SwapRoute::new(1, "a")], vec![Uint128::zero()]).is_err());
        assert!(EtfSwapRoutes::new(" ", vec![SwapRoute::new(1, "a")], vec![Uint128::one()]).is_err());
    }

    #[test]
    fn test_deserialization_validates() {
        let bad = json!({
            "name": "first_swap",
            "routes": [{"pool_id": 1, "token_out_denom": "uion"}],
            "ratios": ["1", "2"]
        });
        assert!(serde_json::from_value::<EtfSwapRoutes>(bad).is_err());
    }

    #[test]
    fn test_swap_tokens_wire_format() {
        let msg = ManagerExecuteMsg::SwapTokens {
            contract: Some("osmo1swap".to_string()),
            initial_balance: Coin::new(5000u128, "uosmo"),
            etf_swap_routes: EtfSwapRoutes::new(
                "first_swap",
                vec![SwapRoute::new(1, "some_denom_out")],
                vec![Uint128::one()],
            )
            .unwrap(),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "swap_tokens": {
                    "contract": "osmo1swap",
                    "initial_balance": {"denom": "uosmo", "amount": "5000"},
                    "etf_swap_routes": {
                        "name": "first_swap",
                        "routes": [{"pool_id": 1, "token_out_denom": "some_denom_out"}],
                        "ratios": ["1"]
                    }
                }
            })
        );
    }

    #[test]
    fn test_swap_contract_messages() {
        assert_eq!(
            serde_json::to_value(SwapInstantiateMsg { debug: true }).unwrap(),
            json!({"debug": true})
        );
        assert_eq!(
            serde_json::to_value(ManagerInstantiateMsg {}).unwrap(),
            json!({})
        );
        assert_eq!(
            serde_json::to_value(SwapQueryMsg::QueryNumPools {}).unwrap(),
            json!({"query_num_pools": {}})
        );
        assert_eq!(
            serde_json::to_value(SwapQueryMsg::QueryPool { pool_id: 1 }).unwrap(),
            json!({"query_pool": {"pool_id": 1}})
        );
    }

    #[test]
    fn test_split_follows_ratios_and_keeps_total() {
        let parts = bull_market().split(Uint128::new(1001));
        assert_eq!(parts, vec![Uint128::new(250), Uint128::new(751)]);
        assert_eq!(parts.iter().copied().sum::<Uint128>(), Uint128::new(1001));
    }
}
