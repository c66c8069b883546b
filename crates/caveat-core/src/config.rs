//! Manager deployment configuration.
//!
//! ```yaml
//! name: DelegationManager
//! version: "1"
//! chain_id: 1
//! owner: "0x…"
//! allow_preregistered: false
//! ```

use crate::hash::Domain;
use crate::types::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_NAME: &str = "DelegationManager";
pub const DEFAULT_VERSION: &str = "1";
pub const DEFAULT_CHAIN_ID: u64 = 1;

/// Label the default manager address is derived from.
pub const MANAGER_LABEL: &str = "caveat.delegation-manager";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerConfig {
    /// Domain name signers commit to.
    pub name: String,

    pub version: String,

    pub chain_id: u64,

    /// The manager's own identity (verifying contract and enforcer caller).
    pub address: Address,

    /// Initial administrative owner.
    pub owner: Address,

    /// Accept empty signatures for delegations their delegator registered.
    pub allow_preregistered: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            version: DEFAULT_VERSION.to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            address: Address::derive(MANAGER_LABEL),
            owner: Address::ZERO,
            allow_preregistered: false,
        }
    }
}

impl ManagerConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("failed to parse manager config")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_yaml(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn with_owner(mut self, owner: Address) -> Self {
        self.owner = owner;
        self
    }

    pub fn with_preregistration(mut self, allow: bool) -> Self {
        self.allow_preregistered = allow;
        self
    }

    pub fn domain(&self) -> Domain {
        Domain::new(&self.name, &self.version, self.chain_id, self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::from_yaml("{}").unwrap();
        assert_eq!(config, ManagerConfig::default());
        assert_eq!(config.name, "DelegationManager");
        assert!(!config.allow_preregistered);
    }

    #[test]
    fn test_partial_yaml() {
        let config = ManagerConfig::from_yaml("chain_id: 10\nallow_preregistered: true\n").unwrap();
        assert_eq!(config.chain_id, 10);
        assert!(config.allow_preregistered);
        assert_eq!(config.version, "1");
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(ManagerConfig::from_yaml("chainid: 10\n").is_err());
    }

    #[test]
    fn test_from_file() {
        let owner = Address::derive("owner");
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "owner: \"{owner}\"").unwrap();
        let config = ManagerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.owner, owner);
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = ManagerConfig::from_file("/nonexistent/manager.yaml").unwrap_err();
        assert!(format!("{err:#}").contains("failed to read config"));
    }

    #[test]
    fn test_domain_tracks_config() {
        let a = ManagerConfig::default().domain().separator();
        let b = ManagerConfig {
            chain_id: 5,
            ..ManagerConfig::default()
        }
        .domain()
        .separator();
        assert_ne!(a, b);
    }
}
