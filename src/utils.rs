use std::str::FromStr;

use cosmwasm_std::{Coin, Uint128};
use serde::{Deserialize, Deserializer};

use crate::error::Error;

/// Parse a coin in the chain's `<amount><denom>` notation, e.g. `1000uosmo`
pub fn parse_coin(coin_str: &str) -> Result<Coin, Error> {
    let coin_str = coin_str.trim();
    let split = coin_str
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| Error::Config(format!("Coin '{}' has no denom", coin_str)))?;
    let (amount, denom) = coin_str.split_at(split);

    if amount.is_empty() {
        return Err(Error::Config(format!("Coin '{}' has no amount", coin_str)));
    }
    let amount = Uint128::from_str(amount)
        .map_err(|_| Error::Config(format!("Invalid amount in '{}'", coin_str)))?;

    Ok(Coin {
        denom: denom.to_string(),
        amount,
    })
}

/// Parse a comma separated coin list; an empty string is no coins
pub fn parse_coins(coins_str: &str) -> Result<Vec<Coin>, Error> {
    coins_str
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_coin)
        .collect()
}

/// Parse a JSON message argument
pub fn parse_json(json_str: &str) -> Result<serde_json::Value, Error> {
    serde_json::from_str(json_str)
        .map_err(|e| Error::Config(format!("Invalid JSON message: {}", e)))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CoinRepr {
    Text(String),
    Struct(Coin),
}

impl CoinRepr {
    fn into_coin<E: serde::de::Error>(self) -> Result<Coin, E> {
        match self {
            CoinRepr::Text(s) => parse_coin(&s).map_err(E::custom),
            CoinRepr::Struct(coin) => Ok(coin),
        }
    }
}

/// Deserialize a coin written either as `"1000uosmo"` or as `{ denom, amount }`
pub fn deserialize_coin<'de, D>(deserializer: D) -> Result<Coin, D::Error>
where
    D: Deserializer<'de>,
{
    CoinRepr::deserialize(deserializer)?.into_coin()
}

/// Deserialize a coin list in either notation
pub fn deserialize_coins<'de, D>(deserializer: D) -> Result<Vec<Coin>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<CoinRepr>::deserialize(deserializer)?
        .into_iter()
        .map(CoinRepr::into_coin)
        .collect()
}
