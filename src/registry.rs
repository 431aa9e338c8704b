use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::CodeId;
use crate::error::Error;

/// What the current run knows about one contract role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub code_id: Option<CodeId>,
    pub address: Option<String>,
}

/// Run-scoped table of code ids and contract addresses keyed by role
/// (e.g. `manager`, `swap`, `cw20-first`).
///
/// Filled by upload and instantiate steps and read by later steps of the same
/// run. Nothing here outlives the process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractRegistry {
    records: BTreeMap<String, ContractRecord>,
}

impl ContractRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_code(&mut self, role: &str, code_id: CodeId) {
        debug!("Registry: {} -> code {}", role, code_id);
        let record = self.records.entry(role.to_string()).or_default();
        record.code_id = Some(code_id);
        // New code invalidates an address instantiated from older code
        record.address = None;
    }

    pub fn record_address(&mut self, role: &str, address: impl Into<String>) {
        let address = address.into();
        debug!("Registry: {} -> {}", role, address);
        self.records.entry(role.to_string()).or_default().address = Some(address);
    }

    /// Code id uploaded for `role` in this run
    pub fn code_id(&self, role: &str) -> Result<CodeId, Error> {
        self.records
            .get(role)
            .and_then(|r| r.code_id)
            .ok_or_else(|| Error::Config(format!("No code uploaded for `{}` in this run", role)))
    }

    /// Address instantiated for `role` in this run
    pub fn address(&self, role: &str) -> Result<&str, Error> {
        self.records
            .get(role)
            .and_then(|r| r.address.as_deref())
            .ok_or_else(|| Error::NotInstantiated(role.to_string()))
    }

    pub fn get(&self, role: &str) -> Option<&ContractRecord> {
        self.records.get(role)
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_requires_instantiate() {
        let mut registry = ContractRegistry::new();
        registry.record_code("swap", 5274);
        assert_eq!(registry.code_id("swap").unwrap(), 5274);
        assert!(matches!(
            registry.address("swap"),
            Err(Error::NotInstantiated(role)) if role == "swap"
        ));

        registry.record_address("swap", "osmo1swap");
        assert_eq!(registry.address("swap").unwrap(), "osmo1swap");
    }

    #[test]
    fn test_reupload_clears_stale_address() {
        let mut registry = ContractRegistry::new();
        registry.record_code("manager", 1);
        registry.record_address("manager", "osmo1old");
        registry.record_code("manager", 2);
        assert!(registry.address("manager").is_err());
        assert_eq!(registry.code_id("manager").unwrap(), 2);
    }

    #[test]
    fn test_missing_code_is_config_error() {
        let registry = ContractRegistry::new();
        assert!(matches!(registry.code_id("manager"), Err(Error::Config(_))));
    }
}
