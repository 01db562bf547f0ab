use crate::contracts::Auction;
use alloy::{
    eips::BlockNumberOrTag,
    primitives::{Address, B256, U256, utils::format_ether},
    providers::DynProvider,
};
use anyhow::{Context, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};
use utils::errors;

/// One reconstructed auction bid, amount formatted as ether for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub token_id: u64,
    pub bidder: Address,
    pub amount: String,
    pub transaction_hash: B256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionState {
    pub token_id: u64,
    pub highest_bid: String,
    pub highest_bidder: Address,
    pub start_time: u64,
    pub end_time: u64,
    pub settled: bool,
}

struct RawBid {
    token_id: u64,
    bidder: Address,
    amount: U256,
    transaction_hash: B256,
}

/// Bid history for one token, highest first. Log-read failures degrade to an
/// empty history; callers render "no bids" rather than an error.
pub async fn get_bids(provider: &DynProvider, auction: Address, token_id: u64) -> Vec<Bid> {
    match read_auction_bid_events(provider, auction).await {
        Ok(raw) => collate(raw, token_id),
        Err(e) => {
            warn!(error = ?e, auction = %auction, "{}", errors::BID_EVENTS_READ_FAILED);
            Vec::new()
        }
    }
}

async fn read_auction_bid_events(provider: &DynProvider, auction: Address) -> Result<Vec<RawBid>> {
    let contract = Auction::new(auction, provider.clone());

    // All AuctionBid events from genesis; starting at the previous token's
    // mint block would narrow this.
    let events = contract
        .AuctionBid_filter()
        .from_block(0)
        .to_block(BlockNumberOrTag::Latest)
        .query()
        .await
        .context("query AuctionBid events")?;

    Ok(events
        .into_iter()
        .map(|(event, log)| RawBid {
            token_id: event.tokenId.to::<u64>(),
            bidder: event.bidder,
            amount: event.amount,
            transaction_hash: log.transaction_hash.unwrap_or_default(),
        })
        .collect())
}

fn collate(raw: Vec<RawBid>, token_id: u64) -> Vec<Bid> {
    let mut bids: Vec<RawBid> = raw
        .into_iter()
        .filter(|bid| bid.token_id == token_id)
        .collect();
    bids.sort_by(|a, b| b.amount.cmp(&a.amount));
    bids.into_iter()
        .map(|bid| Bid {
            token_id: bid.token_id,
            bidder: bid.bidder,
            amount: format_ether(bid.amount),
            transaction_hash: bid.transaction_hash,
        })
        .collect()
}

pub async fn current_auction(provider: &DynProvider, auction: Address) -> Result<AuctionState> {
    let state = Auction::new(auction, provider.clone())
        .auction()
        .call()
        .await
        .context(errors::AUCTION_READ_FAILED)?;

    Ok(AuctionState {
        token_id: state.tokenId.to::<u64>(),
        highest_bid: format_ether(state.highestBid),
        highest_bidder: state.highestBidder,
        start_time: state.startTime.to::<u64>(),
        end_time: state.endTime.to::<u64>(),
        settled: state.settled,
    })
}

/// Periodic auction watcher: logs auction turnover and the bid history of
/// each freshly created auction.
pub async fn watch_auctions(provider: DynProvider, auction: Address, interval: Duration) {
    let mut last_token_id: Option<u64> = None;
    loop {
        match current_auction(&provider, auction).await {
            Ok(state) => {
                if last_token_id != Some(state.token_id) {
                    info!(
                        token_id = state.token_id,
                        highest_bid = %state.highest_bid,
                        settled = state.settled,
                        "Auction created"
                    );
                    let bids = get_bids(&provider, auction, state.token_id).await;
                    info!(token_id = state.token_id, bids = bids.len(), "Bid history loaded");
                    last_token_id = Some(state.token_id);
                } else {
                    info!(
                        token_id = state.token_id,
                        highest_bid = %state.highest_bid,
                        "Auction unchanged"
                    );
                }
            }
            Err(e) => warn!(error = ?e, "{}", errors::AUCTION_READ_FAILED),
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, utils::parse_ether};

    const BIDDER_A: Address = address!("00000000000000000000000000000000000000Aa");
    const BIDDER_B: Address = address!("00000000000000000000000000000000000000Bb");

    fn raw(token_id: u64, bidder: Address, ether: &str, tx: u8) -> RawBid {
        RawBid {
            token_id,
            bidder,
            amount: parse_ether(ether).unwrap(),
            transaction_hash: B256::repeat_byte(tx),
        }
    }

    #[test]
    fn collate_filters_by_token_and_sorts_highest_first() {
        let bids = collate(
            vec![
                raw(7, BIDDER_A, "1.0", 1),
                raw(8, BIDDER_B, "9.0", 2),
                raw(7, BIDDER_B, "2.5", 3),
            ],
            7,
        );

        assert_eq!(bids.len(), 2);
        assert_eq!(bids[0].bidder, BIDDER_B);
        assert_eq!(bids[0].amount, "2.500000000000000000");
        assert_eq!(bids[1].bidder, BIDDER_A);
        assert_eq!(bids[1].amount, "1.000000000000000000");
    }

    #[test]
    fn collate_of_nothing_is_empty() {
        assert!(collate(Vec::new(), 7).is_empty());
    }
}
