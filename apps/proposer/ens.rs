use crate::validation::AddressResolver;
use alloy::{primitives::Address, providers::DynProvider};
use alloy_ens::ProviderEnsExt;
use async_trait::async_trait;
use tracing::debug;

/// ENS-backed [`AddressResolver`]. Lookups always run against mainnet,
/// whatever chain the DAO lives on; that is where the registry is.
pub struct EnsResolver {
    provider: DynProvider,
}

impl EnsResolver {
    pub fn new(provider: DynProvider) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl AddressResolver for EnsResolver {
    async fn resolve(&self, name: &str) -> Option<Address> {
        match self.provider.resolve_name(name).await {
            Ok(address) => Some(address),
            Err(e) => {
                debug!(name, error = %e, "Name did not resolve");
                None
            }
        }
    }
}
