use crate::{
    bids,
    ens::EnsResolver,
    simulation::SimulationError,
    store::{ProposalDraft, ProposalStore},
    submitter::{ChainGovernance, SubmitError, Submitter},
    validation::{self, DebouncedResolver, FounderAllocation, SummaryRule},
};
use alloy::{primitives::Address, providers::DynProvider};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::Utc;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub submitter: Arc<Mutex<Submitter<ChainGovernance>>>,
    pub store: Arc<Mutex<ProposalStore>>,
    pub resolver: Arc<DebouncedResolver<EnsResolver>>,
    pub signer: Address,
    pub provider: DynProvider,
    pub auction: Address,
    pub summary_rule: SummaryRule,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/proposals", post(submit_proposal))
        .route("/proposals/validate", post(validate_proposal_draft))
        .route("/founders/validate", post(validate_founders))
        .route("/bids/{token_id}", get(bid_history))
        .with_state(state)
}

async fn submit_proposal(
    State(state): State<AppState>,
    Json(draft): Json<ProposalDraft>,
) -> (StatusCode, Json<Value>) {
    let mut store = state.store.lock().await;
    store.replace_draft(draft);

    let mut submitter = state.submitter.lock().await;
    match submitter.submit(&mut store).await {
        Ok(location) => (
            StatusCode::CREATED,
            Json(json!({ "location": location.path() })),
        ),
        Err(e) => submit_error_response(e),
    }
}

async fn validate_proposal_draft(
    State(state): State<AppState>,
    Json(draft): Json<ProposalDraft>,
) -> (StatusCode, Json<Value>) {
    match validation::validate_proposal(&draft, state.summary_rule) {
        Ok(()) => (StatusCode::OK, Json(json!({ "valid": true }))),
        Err(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "valid": false, "fields": errors })),
        ),
    }
}

async fn validate_founders(
    State(state): State<AppState>,
    Json(entries): Json<Vec<FounderAllocation>>,
) -> (StatusCode, Json<Value>) {
    let result = validation::validate_founder_allocations(
        &entries,
        state.signer,
        &*state.resolver,
        Utc::now(),
    )
    .await;

    match result {
        Ok(()) => (StatusCode::OK, Json(json!({ "valid": true }))),
        Err(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "valid": false, "fields": errors })),
        ),
    }
}

async fn bid_history(
    State(state): State<AppState>,
    Path(token_id): Path<u64>,
) -> Json<Value> {
    let bids = bids::get_bids(&state.provider, state.auction, token_id).await;
    Json(json!({ "tokenId": token_id, "bids": bids }))
}

fn submit_error_response(error: SubmitError) -> (StatusCode, Json<Value>) {
    let message = error.to_string();
    match error {
        SubmitError::Validation(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": message, "fields": errors })),
        ),
        SubmitError::Encode(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": message })),
        ),
        SubmitError::Simulation(SimulationError::Failed(failed)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": message, "simulations": failed })),
        ),
        SubmitError::Simulation(SimulationError::Unavailable) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": message })),
        ),
        SubmitError::WrongNetwork
        | SubmitError::NotEnoughVotes { .. }
        | SubmitError::UserRejected => {
            (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
        }
        SubmitError::TransactionReverted(_) => {
            (StatusCode::BAD_GATEWAY, Json(json!({ "error": message })))
        }
        SubmitError::InProgress => (StatusCode::CONFLICT, Json(json!({ "error": message }))),
        SubmitError::Other(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": message })),
        ),
    }
}
