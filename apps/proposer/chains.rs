use crate::config;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// Networks the platform deploys DAOs to. Mainnet plus the testnets the
/// auction/governor contracts are live on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainId {
    Ethereum,
    Goerli,
    OptimismGoerli,
    BaseGoerli,
    ZoraGoerli,
}

impl ChainId {
    pub const ALL: &'static [ChainId] = &[
        ChainId::Ethereum,
        ChainId::Goerli,
        ChainId::OptimismGoerli,
        ChainId::BaseGoerli,
        ChainId::ZoraGoerli,
    ];

    pub fn id(&self) -> u64 {
        match self {
            ChainId::Ethereum => 1,
            ChainId::Goerli => 5,
            ChainId::OptimismGoerli => 420,
            ChainId::BaseGoerli => 84531,
            ChainId::ZoraGoerli => 999,
        }
    }

    /// URL segment used in proposal locations, e.g. `/dao/ethereum/0x..`.
    pub fn slug(&self) -> &'static str {
        match self {
            ChainId::Ethereum => "ethereum",
            ChainId::Goerli => "goerli",
            ChainId::OptimismGoerli => "optimism-goerli",
            ChainId::BaseGoerli => "base-goerli",
            ChainId::ZoraGoerli => "zora-goerli",
        }
    }

    pub fn from_slug(slug: &str) -> Option<ChainId> {
        Self::ALL.iter().copied().find(|c| c.slug() == slug)
    }
}

static ETHEREUM_PROVIDER: OnceCell<DynProvider> = OnceCell::new();
static GOERLI_PROVIDER: OnceCell<DynProvider> = OnceCell::new();
static OPTIMISM_GOERLI_PROVIDER: OnceCell<DynProvider> = OnceCell::new();
static BASE_GOERLI_PROVIDER: OnceCell<DynProvider> = OnceCell::new();
static ZORA_GOERLI_PROVIDER: OnceCell<DynProvider> = OnceCell::new();

/// Read-only provider for a chain, built lazily from the configured RPC url.
pub fn get_provider(chain: ChainId) -> Result<DynProvider> {
    let cell = match chain {
        ChainId::Ethereum => &ETHEREUM_PROVIDER,
        ChainId::Goerli => &GOERLI_PROVIDER,
        ChainId::OptimismGoerli => &OPTIMISM_GOERLI_PROVIDER,
        ChainId::BaseGoerli => &BASE_GOERLI_PROVIDER,
        ChainId::ZoraGoerli => &ZORA_GOERLI_PROVIDER,
    };

    cell.get_or_try_init(|| build_provider(chain)).cloned()
}

fn build_provider(chain: ChainId) -> Result<DynProvider> {
    let rpc_url = config::get_config().rpc_url(chain);
    let url = rpc_url
        .parse()
        .with_context(|| format!("Invalid RPC url for {}: {}", chain.slug(), rpc_url))?;
    Ok(ProviderBuilder::new().connect_http(url).erased())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_roundtrip() {
        for chain in ChainId::ALL {
            assert_eq!(ChainId::from_slug(chain.slug()), Some(*chain));
        }
        assert_eq!(ChainId::from_slug("solana"), None);
    }

    #[test]
    fn numeric_ids_match_deployments() {
        assert_eq!(ChainId::Ethereum.id(), 1);
        assert_eq!(ChainId::Goerli.id(), 5);
        assert_eq!(ChainId::OptimismGoerli.id(), 420);
        assert_eq!(ChainId::BaseGoerli.id(), 84531);
        assert_eq!(ChainId::ZoraGoerli.id(), 999);
    }

    #[test]
    fn serde_uses_slugs() {
        let json = serde_json::to_string(&ChainId::OptimismGoerli).unwrap();
        assert_eq!(json, "\"optimism-goerli\"");
        let back: ChainId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ChainId::OptimismGoerli);
    }
}
