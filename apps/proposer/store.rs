use alloy::primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One queued action, tagged with the data its encoder needs. The tags match
/// the transaction type ids the platform has always used on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TransactionKind {
    /// Send treasury funds to a recipient. `amount` is a decimal ether string.
    SendEth {
        recipient: Address,
        amount: String,
    },
    /// Mint `quantity` tokens of the DAO collection to a recipient.
    Airdrop {
        token: Address,
        recipient: Address,
        quantity: u64,
    },
    /// Arbitrary call with caller-supplied calldata.
    Custom {
        target: Address,
        value: String,
        calldata: Bytes,
    },
    /// Point a DAO proxy at a new implementation.
    Upgrade {
        proxy: Address,
        implementation: Address,
    },
    /// Grant or revoke a minter on the DAO token.
    UpdateMinter {
        token: Address,
        minter: Address,
        allowed: bool,
    },
    /// Assembled by an external wallet flow; carried in the queue for display
    /// but never encoded locally.
    NounsConnect {
        target: Address,
        calldata: Bytes,
    },
}

impl TransactionKind {
    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::SendEth { .. } => "send-eth",
            TransactionKind::Airdrop { .. } => "airdrop",
            TransactionKind::Custom { .. } => "custom",
            TransactionKind::Upgrade { .. } => "upgrade",
            TransactionKind::UpdateMinter { .. } => "update-minter",
            TransactionKind::NounsConnect { .. } => "nouns-connect",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    #[serde(flatten)]
    pub kind: TransactionKind,
    /// Display-only annotations (form labels, resolved names).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl TransactionDraft {
    pub fn new(kind: TransactionKind) -> Self {
        Self {
            kind,
            metadata: BTreeMap::new(),
        }
    }
}

/// The user-assembled, not-yet-submitted proposal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub transactions: Vec<TransactionDraft>,
}

/// Owned draft state for one UI session. Held by the caller and passed into
/// the pipeline explicitly; cleared when a submission confirms.
#[derive(Debug, Clone, Default)]
pub struct ProposalStore {
    draft: ProposalDraft,
}

impl ProposalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
    }

    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.draft.summary = summary.into();
    }

    pub fn add_transaction(&mut self, transaction: TransactionDraft) {
        self.draft.transactions.push(transaction);
    }

    /// Replaces the transaction at `index`. Returns false if out of range.
    pub fn replace_transaction(&mut self, index: usize, transaction: TransactionDraft) -> bool {
        match self.draft.transactions.get_mut(index) {
            Some(slot) => {
                *slot = transaction;
                true
            }
            None => false,
        }
    }

    /// Removes the transaction at `index`. Returns false if out of range.
    pub fn remove_transaction(&mut self, index: usize) -> bool {
        if index < self.draft.transactions.len() {
            self.draft.transactions.remove(index);
            true
        } else {
            false
        }
    }

    pub fn remove_all_transactions(&mut self) {
        self.draft.transactions.clear();
    }

    /// Drops the whole draft, title and summary included.
    pub fn clear(&mut self) {
        self.draft = ProposalDraft::default();
    }

    pub fn replace_draft(&mut self, draft: ProposalDraft) {
        self.draft = draft;
    }

    pub fn draft(&self) -> &ProposalDraft {
        &self.draft
    }

    pub fn transaction_count(&self) -> usize {
        self.draft.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draft.transactions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    fn send_eth(amount: &str) -> TransactionDraft {
        TransactionDraft::new(TransactionKind::SendEth {
            recipient: address!("d8dA6BF26964aF9D7eEd9e03E53415D37aA96045"),
            amount: amount.into(),
        })
    }

    #[test]
    fn queue_lifecycle() {
        let mut store = ProposalStore::new();
        assert!(store.is_empty());

        store.add_transaction(send_eth("1.0"));
        store.add_transaction(send_eth("2.0"));
        assert_eq!(store.transaction_count(), 2);

        assert!(store.replace_transaction(1, send_eth("3.0")));
        assert!(!store.replace_transaction(2, send_eth("4.0")));
        assert_eq!(
            store.draft().transactions[1].kind,
            TransactionKind::SendEth {
                recipient: address!("d8dA6BF26964aF9D7eEd9e03E53415D37aA96045"),
                amount: "3.0".into(),
            }
        );

        assert!(store.remove_transaction(0));
        assert!(!store.remove_transaction(5));
        assert_eq!(store.transaction_count(), 1);

        store.remove_all_transactions();
        assert!(store.is_empty());
    }

    #[test]
    fn clear_drops_title_and_summary() {
        let mut store = ProposalStore::new();
        store.set_title("Fund grant");
        store.set_summary("pay contributor");
        store.add_transaction(send_eth("1.5"));

        store.clear();
        assert_eq!(store.draft(), &ProposalDraft::default());
    }

    #[test]
    fn kind_tags_roundtrip() {
        let draft = send_eth("1.5");
        let json = serde_json::to_string(&draft).unwrap();
        assert!(json.contains("\"type\":\"send-eth\""));
        let back: TransactionDraft = serde_json::from_str(&json).unwrap();
        assert_eq!(back, draft);
    }
}
