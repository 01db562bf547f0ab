use crate::{chains::ChainId, encoder::EncodedProposal};
use alloy::primitives::{Address, Bytes};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Networks with fork-simulation backing. Everywhere else the gate is
/// skipped and treated as vacuously successful.
pub const SIMULATION_CHAINS: &[ChainId] =
    &[ChainId::Ethereum, ChainId::Goerli, ChainId::OptimismGoerli];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("unable to simulate these transactions")]
    Unavailable,
    #[error("{} transaction(s) would fail on-chain", .0.len())]
    Failed(Vec<Simulation>),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulationRequest<'a> {
    treasury_address: Address,
    chain_id: u64,
    calldatas: &'a [Bytes],
    /// Decimal wei strings, the format the service expects.
    values: Vec<String>,
    targets: &'a [Address],
}

/// Dry-run verdict for a single proposed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Simulation {
    pub target: Address,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationResult {
    pub success: bool,
    #[serde(default)]
    pub simulations: Vec<Simulation>,
}

/// Client for the external fork-simulation service.
pub struct SimulationApi {
    client: Client,
    endpoint: String,
}

impl SimulationApi {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Gate for one submission attempt. `Ok(())` means either every call
    /// simulated cleanly or the chain is outside the supported set. The
    /// failing subset is returned for display; there is no retry.
    #[instrument(skip(self, encoded), fields(chain = chain.slug()))]
    pub async fn check(
        &self,
        encoded: &EncodedProposal,
        chain: ChainId,
        treasury: Address,
    ) -> Result<(), SimulationError> {
        if !SIMULATION_CHAINS.contains(&chain) {
            debug!("Simulation not supported on this chain, skipping");
            return Ok(());
        }

        let result = self.simulate(encoded, chain, treasury).await?;
        if result.success {
            return Ok(());
        }

        let failed: Vec<Simulation> = result
            .simulations
            .into_iter()
            .filter(|simulation| !simulation.success)
            .collect();
        Err(SimulationError::Failed(failed))
    }

    /// Raw transport errors and malformed bodies never escape; they collapse
    /// into [`SimulationError::Unavailable`].
    async fn simulate(
        &self,
        encoded: &EncodedProposal,
        chain: ChainId,
        treasury: Address,
    ) -> Result<SimulationResult, SimulationError> {
        let request = SimulationRequest {
            treasury_address: treasury,
            chain_id: chain.id(),
            calldatas: &encoded.calldatas,
            values: encoded.values.iter().map(|value| value.to_string()).collect(),
            targets: &encoded.targets,
        };

        let response = match self.client.post(&self.endpoint).json(&request).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Simulation service unreachable");
                return Err(SimulationError::Unavailable);
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "Simulation service returned an error");
            return Err(SimulationError::Unavailable);
        }

        match response.json::<SimulationResult>().await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(error = %e, "Malformed simulation response");
                Err(SimulationError::Unavailable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{U256, address};
    use mockito::Server;

    const TREASURY: Address = address!("00000000000000000000000000000000000000aA");
    const TARGET: Address = address!("d8dA6BF26964aF9D7eEd9e03E53415D37aA96045");

    fn encoded() -> EncodedProposal {
        EncodedProposal {
            targets: vec![TARGET],
            values: vec![U256::from(1_500_000_000_000_000_000u128)],
            calldatas: vec![Bytes::new()],
            description: "Fund grant&&pay contributor".into(),
        }
    }

    #[tokio::test]
    async fn passes_when_every_simulation_succeeds() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "success": true,
                    "simulations": [
                        {"target": "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045", "success": true}
                    ]
                }"#,
            )
            .create_async()
            .await;

        let api = SimulationApi::new(server.url());
        let result = api.check(&encoded(), ChainId::Ethereum, TREASURY).await;

        assert!(result.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn returns_exactly_the_failing_subset() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "success": false,
                    "simulations": [
                        {"target": "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045", "success": true},
                        {"target": "0x00000000000000000000000000000000000000aA", "success": false, "errorReason": "execution reverted"}
                    ]
                }"#,
            )
            .create_async()
            .await;

        let api = SimulationApi::new(server.url());
        let error = api
            .check(&encoded(), ChainId::Ethereum, TREASURY)
            .await
            .unwrap_err();

        match error {
            SimulationError::Failed(failed) => {
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].target, TREASURY);
                assert_eq!(failed[0].error_reason.as_deref(), Some("execution reverted"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn service_error_collapses_to_unavailable() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let api = SimulationApi::new(server.url());
        let error = api
            .check(&encoded(), ChainId::Ethereum, TREASURY)
            .await
            .unwrap_err();
        assert_eq!(error, SimulationError::Unavailable);
    }

    #[tokio::test]
    async fn malformed_body_collapses_to_unavailable() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("not json")
            .create_async()
            .await;

        let api = SimulationApi::new(server.url());
        let error = api
            .check(&encoded(), ChainId::Ethereum, TREASURY)
            .await
            .unwrap_err();
        assert_eq!(error, SimulationError::Unavailable);
    }

    #[tokio::test]
    async fn unsupported_chain_never_contacts_the_service() {
        let mut server = Server::new_async().await;
        let mock = server.mock("POST", "/").expect(0).create_async().await;

        let api = SimulationApi::new(server.url());
        let result = api.check(&encoded(), ChainId::ZoraGoerli, TREASURY).await;

        assert!(result.is_ok());
        mock.assert_async().await;
    }
}
