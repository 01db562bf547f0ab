//env
pub const PROPOSER_PRIVATE_KEY_NOT_SET: &str = "PROPOSER_PRIVATE_KEY not set!";

//chain
pub const PROVIDER_NOT_AVAILABLE: &str = "Provider not available for this chain";
pub const GET_VOTES_FAILED: &str = "Failed to read voting power";
pub const PROPOSAL_THRESHOLD_FAILED: &str = "Failed to read proposal threshold";
pub const GET_CODE_FAILED: &str = "Failed to read contract code";
pub const RECEIPT_FETCH_FAILED: &str = "Failed to fetch transaction receipt";

//auction
pub const AUCTION_READ_FAILED: &str = "Failed to read current auction";
pub const BID_EVENTS_READ_FAILED: &str = "Failed to read auction bid events";
