use crate::{
    contracts::{GovernanceToken, Treasury},
    store::{ProposalDraft, TransactionKind},
};
use alloy::{
    primitives::{
        Address, Bytes, U256,
        utils::parse_ether,
    },
    sol_types::SolCall,
};
use serde::Serialize;
use thiserror::Error;

/// Joins title and summary in the on-chain description. Proposal pages split
/// on this exact separator when rendering, so it must never change.
pub const DESCRIPTION_SEPARATOR: &str = "&&";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("no encoder registered for {0} transactions")]
    UnsupportedTransactionType(&'static str),
    #[error("invalid ether amount: {0}")]
    InvalidAmount(String),
}

/// The argument set of one governor `propose` call. Position `i` across the
/// three arrays describes one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedProposal {
    pub targets: Vec<Address>,
    pub values: Vec<U256>,
    pub calldatas: Vec<Bytes>,
    pub description: String,
}

/// Deterministic, order-preserving encoding of the whole draft. Entry `i` of
/// every output array derives from `draft.transactions[i]`.
pub fn encode(draft: &ProposalDraft) -> Result<EncodedProposal, EncodeError> {
    let mut targets = Vec::with_capacity(draft.transactions.len());
    let mut values = Vec::with_capacity(draft.transactions.len());
    let mut calldatas = Vec::with_capacity(draft.transactions.len());

    for transaction in &draft.transactions {
        let (target, value, calldata) = encode_transaction(&transaction.kind)?;
        targets.push(target);
        values.push(value);
        calldatas.push(calldata);
    }

    Ok(EncodedProposal {
        targets,
        values,
        calldatas,
        description: format!(
            "{}{}{}",
            draft.title, DESCRIPTION_SEPARATOR, draft.summary
        ),
    })
}

fn encode_transaction(kind: &TransactionKind) -> Result<(Address, U256, Bytes), EncodeError> {
    match kind {
        TransactionKind::SendEth { recipient, amount } => {
            Ok((*recipient, parse_amount(amount)?, Bytes::new()))
        }
        TransactionKind::Airdrop {
            token,
            recipient,
            quantity,
        } => {
            let call = GovernanceToken::mintBatchToCall {
                amount: U256::from(*quantity),
                recipient: *recipient,
            };
            Ok((*token, U256::ZERO, call.abi_encode().into()))
        }
        TransactionKind::Custom {
            target,
            value,
            calldata,
        } => Ok((*target, parse_amount(value)?, calldata.clone())),
        TransactionKind::Upgrade {
            proxy,
            implementation,
        } => {
            let call = Treasury::upgradeToCall {
                newImpl: *implementation,
            };
            Ok((*proxy, U256::ZERO, call.abi_encode().into()))
        }
        TransactionKind::UpdateMinter {
            token,
            minter,
            allowed,
        } => {
            let call = GovernanceToken::updateMintersCall {
                newMinters: vec![GovernanceToken::MinterParams {
                    minter: *minter,
                    allowed: *allowed,
                }],
            };
            Ok((*token, U256::ZERO, call.abi_encode().into()))
        }
        TransactionKind::NounsConnect { .. } => {
            Err(EncodeError::UnsupportedTransactionType(kind.label()))
        }
    }
}

fn parse_amount(amount: &str) -> Result<U256, EncodeError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Ok(U256::ZERO);
    }
    parse_ether(amount).map_err(|_| EncodeError::InvalidAmount(amount.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TransactionDraft;
    use alloy::primitives::address;
    use proptest::prelude::*;

    const RECIPIENT: Address = address!("d8dA6BF26964aF9D7eEd9e03E53415D37aA96045");
    const TOKEN: Address = address!("0000000000000000000000000000000000000aBc");

    fn draft(transactions: Vec<TransactionKind>) -> ProposalDraft {
        ProposalDraft {
            title: "Fund grant".into(),
            summary: "pay contributor".into(),
            transactions: transactions
                .into_iter()
                .map(TransactionDraft::new)
                .collect(),
        }
    }

    #[test]
    fn send_eth_is_a_plain_value_transfer() {
        let encoded = encode(&draft(vec![TransactionKind::SendEth {
            recipient: RECIPIENT,
            amount: "1.5".into(),
        }]))
        .unwrap();

        assert_eq!(encoded.targets, vec![RECIPIENT]);
        assert_eq!(
            encoded.values,
            vec![U256::from(1_500_000_000_000_000_000u128)]
        );
        assert_eq!(encoded.calldatas, vec![Bytes::new()]);
        assert_eq!(encoded.description, "Fund grant&&pay contributor");
    }

    #[test]
    fn custom_calldata_passes_through_verbatim() {
        let calldata = Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]);
        let encoded = encode(&draft(vec![TransactionKind::Custom {
            target: TOKEN,
            value: String::new(),
            calldata: calldata.clone(),
        }]))
        .unwrap();

        assert_eq!(encoded.values, vec![U256::ZERO]);
        assert_eq!(encoded.calldatas, vec![calldata]);
    }

    #[test]
    fn airdrop_encodes_a_mint_batch_call() {
        let encoded = encode(&draft(vec![TransactionKind::Airdrop {
            token: TOKEN,
            recipient: RECIPIENT,
            quantity: 3,
        }]))
        .unwrap();

        let expected = GovernanceToken::mintBatchToCall {
            amount: U256::from(3u64),
            recipient: RECIPIENT,
        }
        .abi_encode();
        assert_eq!(encoded.targets, vec![TOKEN]);
        assert_eq!(encoded.values, vec![U256::ZERO]);
        assert_eq!(encoded.calldatas, vec![Bytes::from(expected)]);
    }

    #[test]
    fn nouns_connect_has_no_encoder() {
        let result = encode(&draft(vec![TransactionKind::NounsConnect {
            target: TOKEN,
            calldata: Bytes::new(),
        }]));
        assert_eq!(
            result,
            Err(EncodeError::UnsupportedTransactionType("nouns-connect"))
        );
    }

    #[test]
    fn malformed_amount_is_rejected() {
        let result = encode(&draft(vec![TransactionKind::SendEth {
            recipient: RECIPIENT,
            amount: "one point five".into(),
        }]));
        assert_eq!(
            result,
            Err(EncodeError::InvalidAmount("one point five".into()))
        );
    }

    fn arb_address() -> impl Strategy<Value = Address> {
        any::<[u8; 20]>().prop_map(Address::from)
    }

    proptest! {
        #[test]
        fn encoding_is_order_preserving_and_deterministic(
            recipients in proptest::collection::vec(arb_address(), 1..8),
            amount in 0u64..1_000,
        ) {
            let transactions: Vec<_> = recipients
                .iter()
                .map(|recipient| TransactionKind::SendEth {
                    recipient: *recipient,
                    amount: amount.to_string(),
                })
                .collect();
            let draft = draft(transactions);

            let first = encode(&draft).unwrap();
            let second = encode(&draft).unwrap();

            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.targets.len(), recipients.len());
            for (i, recipient) in recipients.iter().enumerate() {
                prop_assert_eq!(first.targets[i], *recipient);
            }
        }
    }
}
