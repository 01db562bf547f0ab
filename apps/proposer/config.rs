use crate::{DEFAULT_DEBOUNCE_MS, chains::ChainId, contracts::DaoAddresses, validation::SummaryRule};
use alloy::primitives::Address;
use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::{env, fs, str::FromStr};
use tracing::{info, warn};

pub static CONFIG: OnceCell<ProposerConfig> = OnceCell::new();

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ProposerConfig {
    pub rpc: RpcConfig,
    pub simulation: SimulationConfig,
    pub validation: ValidationConfig,
    pub dao: DaoConfig,
}

impl ProposerConfig {
    pub fn rpc_url(&self, chain: ChainId) -> String {
        match chain {
            ChainId::Ethereum => self.rpc.ethereum.clone(),
            ChainId::Goerli => self.rpc.goerli.clone(),
            ChainId::OptimismGoerli => self.rpc.optimism_goerli.clone(),
            ChainId::BaseGoerli => self.rpc.base_goerli.clone(),
            ChainId::ZoraGoerli => self.rpc.zora_goerli.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub ethereum: String,
    pub goerli: String,
    pub optimism_goerli: String,
    pub base_goerli: String,
    pub zora_goerli: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            ethereum: "https://eth.llamarpc.com".to_string(),
            goerli: "https://ethereum-goerli.publicnode.com".to_string(),
            optimism_goerli: "https://goerli.optimism.io".to_string(),
            base_goerli: "https://goerli.base.org".to_string(),
            zora_goerli: "https://testnet.rpc.zora.energy".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub endpoint: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://nouns.build/api/simulate".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub summary_rule: SummaryRule,
    pub debounce_ms: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            summary_rule: SummaryRule::Required,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

/// The DAO deployment this instance serves.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DaoConfig {
    pub chain: ChainId,
    pub token: Address,
    pub auction: Address,
    pub treasury: Address,
    pub governor: Address,
}

impl DaoConfig {
    pub fn addresses(&self) -> DaoAddresses {
        DaoAddresses {
            token: self.token,
            auction: self.auction,
            treasury: self.treasury,
            governor: self.governor,
        }
    }
}

impl Default for DaoConfig {
    fn default() -> Self {
        Self {
            chain: ChainId::Ethereum,
            token: Address::ZERO,
            auction: Address::ZERO,
            treasury: Address::ZERO,
            governor: Address::ZERO,
        }
    }
}

pub fn load() -> Result<()> {
    let config = load_config();
    CONFIG
        .set(config)
        .map_err(|_| anyhow::anyhow!("Proposer config already initialized"))?;
    Ok(())
}

pub fn get_config() -> &'static ProposerConfig {
    CONFIG.get().expect("Proposer config not initialized")
}

fn load_config() -> ProposerConfig {
    let path = env::var("PROPOSER_CONFIG_PATH").unwrap_or_else(|_| "proposer.yaml".to_string());
    let mut config = match fs::read_to_string(&path) {
        Ok(contents) => match serde_yaml::from_str::<ProposerConfig>(&contents) {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, path = %path, "Failed to parse proposer config, using defaults");
                ProposerConfig::default()
            }
        },
        Err(err) => {
            warn!(error = %err, path = %path, "Proposer config not found, using defaults");
            ProposerConfig::default()
        }
    };

    apply_env_overrides(&mut config);

    info!(
        chain = config.dao.chain.slug(),
        simulation_endpoint = %config.simulation.endpoint,
        summary_rule = ?config.validation.summary_rule,
        debounce_ms = config.validation.debounce_ms,
        "Proposer config loaded"
    );

    config
}

fn apply_env_overrides(config: &mut ProposerConfig) {
    let rpc_overrides = [
        ("ETHEREUM_NODE_URL", &mut config.rpc.ethereum),
        ("GOERLI_NODE_URL", &mut config.rpc.goerli),
        ("OPTIMISM_GOERLI_NODE_URL", &mut config.rpc.optimism_goerli),
        ("BASE_GOERLI_NODE_URL", &mut config.rpc.base_goerli),
        ("ZORA_GOERLI_NODE_URL", &mut config.rpc.zora_goerli),
    ];
    for (var, slot) in rpc_overrides {
        if let Ok(value) = env::var(var) {
            *slot = value;
        }
    }

    if let Ok(value) = env::var("SIMULATION_ENDPOINT") {
        config.simulation.endpoint = value;
    }

    if let Ok(value) = env::var("SUMMARY_RULE") {
        match serde_yaml::from_str::<SummaryRule>(&value) {
            Ok(rule) => config.validation.summary_rule = rule,
            Err(err) => warn!(error = %err, "Failed to parse SUMMARY_RULE override"),
        }
    }

    if let Ok(value) = env::var("DEBOUNCE_MS") {
        match value.parse::<u64>() {
            Ok(quiet) => config.validation.debounce_ms = quiet,
            Err(err) => warn!(error = %err, "Failed to parse DEBOUNCE_MS override"),
        }
    }

    if let Ok(value) = env::var("DAO_CHAIN") {
        match ChainId::from_slug(&value) {
            Some(chain) => config.dao.chain = chain,
            None => warn!(chain = %value, "Unknown DAO_CHAIN override"),
        }
    }

    let address_overrides = [
        ("DAO_TOKEN", &mut config.dao.token),
        ("DAO_AUCTION", &mut config.dao.auction),
        ("DAO_TREASURY", &mut config.dao.treasury),
        ("DAO_GOVERNOR", &mut config.dao.governor),
    ];
    for (var, slot) in address_overrides {
        if let Ok(value) = env::var(var) {
            match Address::from_str(&value) {
                Ok(address) => *slot = address,
                Err(err) => warn!(error = %err, var, "Failed to parse address override"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn defaults_are_sensible() {
        let config = load_config();
        assert_eq!(config.dao.chain, ChainId::Ethereum);
        assert_eq!(config.validation.summary_rule, SummaryRule::Required);
        assert_eq!(config.validation.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert!(config.simulation.endpoint.ends_with("/api/simulate"));
    }

    #[test]
    #[serial]
    fn env_overrides_take_effect() {
        unsafe {
            env::set_var("SIMULATION_ENDPOINT", "http://localhost:9999/simulate");
            env::set_var("SUMMARY_RULE", "required-with-transactions");
            env::set_var("DEBOUNCE_MS", "250");
            env::set_var("DAO_CHAIN", "zora-goerli");
            env::set_var(
                "DAO_TOKEN",
                "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045",
            );
        }

        let config = load_config();

        unsafe {
            env::remove_var("SIMULATION_ENDPOINT");
            env::remove_var("SUMMARY_RULE");
            env::remove_var("DEBOUNCE_MS");
            env::remove_var("DAO_CHAIN");
            env::remove_var("DAO_TOKEN");
        }

        assert_eq!(config.simulation.endpoint, "http://localhost:9999/simulate");
        assert_eq!(
            config.validation.summary_rule,
            SummaryRule::RequiredWithTransactions
        );
        assert_eq!(config.validation.debounce_ms, 250);
        assert_eq!(config.dao.chain, ChainId::ZoraGoerli);
        assert_ne!(config.dao.token, Address::ZERO);
    }

    #[test]
    #[serial]
    fn malformed_overrides_fall_back() {
        unsafe {
            env::set_var("SUMMARY_RULE", "whenever");
            env::set_var("DEBOUNCE_MS", "soon");
            env::set_var("DAO_GOVERNOR", "not-an-address");
        }

        let config = load_config();

        unsafe {
            env::remove_var("SUMMARY_RULE");
            env::remove_var("DEBOUNCE_MS");
            env::remove_var("DAO_GOVERNOR");
        }

        assert_eq!(config.validation.summary_rule, SummaryRule::Required);
        assert_eq!(config.validation.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert_eq!(config.dao.governor, Address::ZERO);
    }
}
