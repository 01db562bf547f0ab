use alloy::{primitives::Address, sol};
use serde::{Deserialize, Serialize};

// Minimal surfaces of the Builder DAO deployment contracts. Only the
// functions and events this service consumes are declared.
sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract Governor {
        function propose(
            address[] memory targets,
            uint256[] memory values,
            bytes[] memory calldatas,
            string memory description
        ) external returns (bytes32);

        function proposalThreshold() external view returns (uint256);
    }

    #[allow(missing_docs)]
    #[sol(rpc)]
    contract GovernanceToken {
        struct MinterParams {
            address minter;
            bool allowed;
        }

        function getVotes(address account) external view returns (uint256);

        function mintBatchTo(uint256 amount, address recipient) external returns (uint256[] memory tokenIds);

        function updateMinters(MinterParams[] memory newMinters) external;
    }

    #[allow(missing_docs)]
    #[sol(rpc)]
    contract Auction {
        function auction()
            external
            view
            returns (
                uint256 tokenId,
                uint256 highestBid,
                address highestBidder,
                uint40 startTime,
                uint40 endTime,
                bool settled
            );

        event AuctionBid(uint256 tokenId, address bidder, uint256 amount, bool extended, uint256 endTime);

        event AuctionCreated(uint256 tokenId, uint256 startTime, uint256 endTime);
    }

    #[allow(missing_docs)]
    #[sol(rpc)]
    contract Treasury {
        function upgradeTo(address newImpl) external;
    }
}

/// Addresses of one DAO deployment on one chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoAddresses {
    pub token: Address,
    pub auction: Address,
    pub treasury: Address,
    pub governor: Address,
}
