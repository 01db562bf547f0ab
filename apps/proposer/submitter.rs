use crate::{
    CONFIRMATION_POLL_INTERVAL_SECS,
    chains::ChainId,
    config,
    contracts::{DaoAddresses, GovernanceToken, Governor},
    encoder::{self, EncodeError, EncodedProposal},
    simulation::{SimulationApi, SimulationError},
    store::ProposalStore,
    validation::{self, SummaryRule, ValidationErrors},
};
use alloy::{
    network::EthereumWallet,
    primitives::{Address, B256, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};
use utils::errors;

/// Lifecycle of one submission attempt. `Failed` is reachable from every
/// non-terminal state; nothing retries automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubmissionState {
    Idle,
    Validating,
    Simulating,
    AwaitingSignature,
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("{0}")]
    Validation(ValidationErrors),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("your wallet is connected to the wrong network")]
    WrongNetwork,
    #[error("you have {votes} votes but need more than {threshold} to submit a proposal")]
    NotEnoughVotes { votes: U256, threshold: U256 },
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error("transaction rejected in wallet")]
    UserRejected,
    #[error("transaction reverted: {0}")]
    TransactionReverted(String),
    #[error("a submission is already in progress")]
    InProgress,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Where to send the user once their proposal is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProposalLocation {
    pub chain: ChainId,
    pub token: Address,
}

impl ProposalLocation {
    pub fn path(&self) -> String {
        format!("/dao/{}/{}", self.chain.slug(), self.token)
    }
}

/// Chain interactions the orchestrator depends on, seamed out so the state
/// machine can be driven without a node.
#[async_trait]
pub trait GovernanceClient: Send + Sync {
    /// Whether the DAO's auction proxy carries code on the signer's network.
    /// An empty account means the signer is connected to the wrong chain.
    async fn auction_code_deployed(&self) -> Result<bool>;

    async fn voting_power(&self, account: Address) -> Result<U256>;

    async fn proposal_threshold(&self) -> Result<U256>;

    /// Sends the governor `propose` transaction, returning its hash.
    async fn propose(&self, proposal: &EncodedProposal) -> Result<B256, SubmitError>;

    /// Blocks until the transaction is mined; errors if it reverted.
    async fn wait_for_confirmation(&self, tx_hash: B256) -> Result<(), SubmitError>;
}

/// Production [`GovernanceClient`] over an alloy provider with a local signer.
pub struct ChainGovernance {
    provider: DynProvider,
    addresses: DaoAddresses,
}

impl ChainGovernance {
    pub fn new(chain: ChainId, addresses: DaoAddresses, signer: PrivateKeySigner) -> Result<Self> {
        let rpc_url = config::get_config().rpc_url(chain);
        let url = rpc_url
            .parse()
            .with_context(|| format!("Invalid RPC url for {}: {}", chain.slug(), rpc_url))?;
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();
        Ok(Self {
            provider,
            addresses,
        })
    }

    fn classify_send_error(e: alloy::contract::Error) -> SubmitError {
        let message = e.to_string();
        let lowered = message.to_lowercase();
        if lowered.contains("rejected") || lowered.contains("denied") {
            SubmitError::UserRejected
        } else {
            SubmitError::TransactionReverted(message)
        }
    }
}

#[async_trait]
impl GovernanceClient for ChainGovernance {
    async fn auction_code_deployed(&self) -> Result<bool> {
        let code = self
            .provider
            .get_code_at(self.addresses.auction)
            .await
            .context(errors::GET_CODE_FAILED)?;
        Ok(!code.is_empty())
    }

    async fn voting_power(&self, account: Address) -> Result<U256> {
        GovernanceToken::new(self.addresses.token, self.provider.clone())
            .getVotes(account)
            .call()
            .await
            .context(errors::GET_VOTES_FAILED)
    }

    async fn proposal_threshold(&self) -> Result<U256> {
        Governor::new(self.addresses.governor, self.provider.clone())
            .proposalThreshold()
            .call()
            .await
            .context(errors::PROPOSAL_THRESHOLD_FAILED)
    }

    async fn propose(&self, proposal: &EncodedProposal) -> Result<B256, SubmitError> {
        let governor = Governor::new(self.addresses.governor, self.provider.clone());
        let pending = governor
            .propose(
                proposal.targets.clone(),
                proposal.values.clone(),
                proposal.calldatas.clone(),
                proposal.description.clone(),
            )
            .send()
            .await
            .map_err(Self::classify_send_error)?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_confirmation(&self, tx_hash: B256) -> Result<(), SubmitError> {
        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(tx_hash)
                .await
                .context(errors::RECEIPT_FETCH_FAILED)?;
            match receipt {
                Some(receipt) if receipt.status() => return Ok(()),
                Some(_) => {
                    return Err(SubmitError::TransactionReverted(format!(
                        "transaction {tx_hash} reverted"
                    )));
                }
                None => {
                    tokio::time::sleep(Duration::from_secs(CONFIRMATION_POLL_INTERVAL_SECS)).await;
                }
            }
        }
    }
}

/// Runs one submission attempt end to end: validate, wrong-network probe,
/// eligibility, encode, simulation gate, propose, confirmation. Stages are
/// strictly sequential; the exclusive borrow plus the non-idle guard keep a
/// draft from being submitted twice concurrently.
pub struct Submitter<G> {
    governance: G,
    simulation: SimulationApi,
    chain: ChainId,
    addresses: DaoAddresses,
    signer: Address,
    summary_rule: SummaryRule,
    state: SubmissionState,
}

impl<G: GovernanceClient> Submitter<G> {
    pub fn new(
        governance: G,
        simulation: SimulationApi,
        chain: ChainId,
        addresses: DaoAddresses,
        signer: Address,
        summary_rule: SummaryRule,
    ) -> Self {
        Self {
            governance,
            simulation,
            chain,
            addresses,
            signer,
            summary_rule,
            state: SubmissionState::Idle,
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    #[instrument(skip(self, store), fields(chain = self.chain.slug(), signer = %self.signer))]
    pub async fn submit(
        &mut self,
        store: &mut ProposalStore,
    ) -> Result<ProposalLocation, SubmitError> {
        if !matches!(
            self.state,
            SubmissionState::Idle | SubmissionState::Failed | SubmissionState::Confirmed
        ) {
            return Err(SubmitError::InProgress);
        }

        match self.run(store).await {
            Ok(location) => {
                self.state = SubmissionState::Confirmed;
                store.clear();
                info!(path = %location.path(), "Proposal confirmed");
                Ok(location)
            }
            Err(e) => {
                self.state = SubmissionState::Failed;
                warn!(error = %e, "Proposal submission failed");
                Err(e)
            }
        }
    }

    async fn run(&mut self, store: &mut ProposalStore) -> Result<ProposalLocation, SubmitError> {
        self.state = SubmissionState::Validating;
        let draft = store.draft().clone();
        validation::validate_proposal(&draft, self.summary_rule)
            .map_err(SubmitError::Validation)?;

        if !self.governance.auction_code_deployed().await? {
            return Err(SubmitError::WrongNetwork);
        }

        let votes = self.governance.voting_power(self.signer).await?;
        let threshold = self.governance.proposal_threshold().await?;
        if votes <= threshold {
            return Err(SubmitError::NotEnoughVotes { votes, threshold });
        }

        let encoded = encoder::encode(&draft)?;

        self.state = SubmissionState::Simulating;
        self.simulation
            .check(&encoded, self.chain, self.addresses.treasury)
            .await?;

        self.state = SubmissionState::AwaitingSignature;
        let tx_hash = self.governance.propose(&encoded).await?;

        self.state = SubmissionState::Pending;
        info!(tx_hash = %tx_hash, "Proposal submitted, awaiting confirmation");
        self.governance.wait_for_confirmation(tx_hash).await?;

        Ok(ProposalLocation {
            chain: self.chain,
            token: self.addresses.token,
        })
    }
}
