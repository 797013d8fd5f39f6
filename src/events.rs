//! Ledger events
//!
//! Every committed transition produces exactly one [`LedgerEvent`]. Events are
//! the append-only audit trail, the persistence format, and the payload handed
//! to notifiers.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::{amount_string, Amount, BountyId, Identity, Timestamp};

/// 32-byte SHA-256 digest.
pub type Hash = [u8; 32];

/// `prev_hash` of the first record in the journal.
pub const GENESIS_HASH: Hash = [0u8; 32];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LedgerEvent {
    ProtocolInitialized {
        owner: Identity,
        fee_bps: u16,
    },
    BountyCreated {
        id: BountyId,
        depositor: Identity,
        #[serde(with = "amount_string")]
        amount: Amount,
        issue_reference: String,
    },
    BountyClaimed {
        id: BountyId,
        claimant: Identity,
    },
    BountyCompleted {
        id: BountyId,
        claimant: Identity,
        #[serde(with = "amount_string")]
        payout: Amount,
        #[serde(with = "amount_string")]
        fee: Amount,
        fee_recipient: Identity,
    },
    BountyRefunded {
        id: BountyId,
        depositor: Identity,
        #[serde(with = "amount_string")]
        amount: Amount,
    },
    Withdrawal {
        identity: Identity,
        #[serde(with = "amount_string")]
        amount: Amount,
    },
    /// Compensates a journaled `Withdrawal` whose transfer was rejected.
    WithdrawalReverted {
        identity: Identity,
        #[serde(with = "amount_string")]
        amount: Amount,
    },
    FeeUpdated {
        old_bps: u16,
        new_bps: u16,
    },
    OwnershipTransferred {
        previous: Identity,
        new_owner: Identity,
    },
}

impl LedgerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerEvent::ProtocolInitialized { .. } => "ProtocolInitialized",
            LedgerEvent::BountyCreated { .. } => "BountyCreated",
            LedgerEvent::BountyClaimed { .. } => "BountyClaimed",
            LedgerEvent::BountyCompleted { .. } => "BountyCompleted",
            LedgerEvent::BountyRefunded { .. } => "BountyRefunded",
            LedgerEvent::Withdrawal { .. } => "Withdrawal",
            LedgerEvent::WithdrawalReverted { .. } => "WithdrawalReverted",
            LedgerEvent::FeeUpdated { .. } => "FeeUpdated",
            LedgerEvent::OwnershipTransferred { .. } => "OwnershipTransferred",
        }
    }

    pub fn bounty_id(&self) -> Option<BountyId> {
        match self {
            LedgerEvent::BountyCreated { id, .. }
            | LedgerEvent::BountyClaimed { id, .. }
            | LedgerEvent::BountyCompleted { id, .. }
            | LedgerEvent::BountyRefunded { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// Events relayed to chat channels.
    pub fn is_announcement(&self) -> bool {
        matches!(
            self,
            LedgerEvent::BountyCreated { .. } | LedgerEvent::BountyCompleted { .. }
        )
    }
}

/// A journaled event: sequence number, commit time and hash-chain link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub timestamp: Timestamp,
    pub event: LedgerEvent,
    #[serde(with = "hex_hash")]
    pub prev_hash: Hash,
    #[serde(with = "hex_hash")]
    pub hash: Hash,
}

impl EventRecord {
    /// Build the record that follows `prev_hash`.
    pub fn seal(
        seq: u64,
        timestamp: Timestamp,
        event: LedgerEvent,
        prev_hash: Hash,
    ) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_string(&event)?;
        let hash = chain_hash(&prev_hash, seq, timestamp, &payload);
        Ok(Self {
            seq,
            timestamp,
            event,
            prev_hash,
            hash,
        })
    }

    /// Recompute the hash from the record's own contents.
    pub fn verify(&self) -> Result<bool, serde_json::Error> {
        let payload = serde_json::to_string(&self.event)?;
        Ok(chain_hash(&self.prev_hash, self.seq, self.timestamp, &payload) == self.hash)
    }
}

pub fn chain_hash(prev_hash: &Hash, seq: u64, timestamp: Timestamp, payload: &str) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash);
    hasher.update(seq.to_be_bytes());
    hasher.update(timestamp.to_be_bytes());
    hasher.update(payload.as_bytes());
    hasher.finalize().into()
}

mod hex_hash {
    use super::Hash;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("hash must be 32 bytes"))
    }
}
