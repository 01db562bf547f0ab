use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use dotenv::dotenv;
use proposer::{
    api::{self, AppState},
    bids, chains,
    chains::ChainId,
    config,
    ens::EnsResolver,
    simulation::SimulationApi,
    store::ProposalStore,
    submitter::{ChainGovernance, Submitter},
    validation::DebouncedResolver,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tracing::{error, info};
use utils::{errors, tracing::run_with_tracing};

const AUCTION_WATCH_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    dotenv().ok();
    run_with_tracing(|| async { run().await }).await;
}

async fn run() -> Result<()> {
    info!("Proposer service starting up");
    config::load()?;
    let config = config::get_config();

    let signer: PrivateKeySigner = std::env::var("PROPOSER_PRIVATE_KEY")
        .context(errors::PROPOSER_PRIVATE_KEY_NOT_SET)?
        .parse()
        .context("Invalid PROPOSER_PRIVATE_KEY")?;
    let signer_address = signer.address();

    let chain = config.dao.chain;
    let addresses = config.dao.addresses();

    let governance = ChainGovernance::new(chain, addresses, signer)
        .context("Failed to build governance client")?;
    let submitter = Submitter::new(
        governance,
        SimulationApi::new(config.simulation.endpoint.clone()),
        chain,
        addresses,
        signer_address,
        config.validation.summary_rule,
    );

    let provider = chains::get_provider(chain).context(errors::PROVIDER_NOT_AVAILABLE)?;
    let mainnet = chains::get_provider(ChainId::Ethereum).context(errors::PROVIDER_NOT_AVAILABLE)?;

    let resolver = DebouncedResolver::new(
        Arc::new(EnsResolver::new(mainnet)),
        Duration::from_millis(config.validation.debounce_ms),
    );

    let state = AppState {
        submitter: Arc::new(Mutex::new(submitter)),
        store: Arc::new(Mutex::new(ProposalStore::new())),
        resolver: Arc::new(resolver),
        signer: signer_address,
        provider: provider.clone(),
        auction: addresses.auction,
        summary_rule: config.validation.summary_rule,
    };

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000")
        .await
        .context("Failed to bind API listener")?;
    let addr = listener.local_addr()?;

    let server_handle = tokio::spawn(async move {
        info!(address = %addr, "Starting API server");
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server error");
        }
    });

    let watcher_handle = tokio::spawn(bids::watch_auctions(
        provider,
        addresses.auction,
        AUCTION_WATCH_INTERVAL,
    ));

    info!("All tasks started, application running indefinitely");

    tokio::select! {
        result = server_handle => {
            error!("API server task completed unexpectedly: {:?}", result);
        }
        result = watcher_handle => {
            error!("Auction watcher task completed unexpectedly: {:?}", result);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully");
        }
    }

    info!("Application shutting down");
    Ok(())
}
