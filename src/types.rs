//! Core escrow types
//!
//! Identities, amounts, timestamps and the bounty record itself.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EscrowError;

/// Sequential bounty identifier. Starts at 1 and is never reused.
pub type BountyId = u64;

/// Value in the smallest atomic unit of the host asset (e.g. wei).
pub type Amount = u128;

/// Unix timestamp in seconds.
pub type Timestamp = i64;

/// How long a claimant holds a bounty before anyone may refund it (7 days).
pub const MAX_CLAIM_DURATION_SECS: i64 = 7 * 24 * 60 * 60;

/// Highest configurable protocol fee (10%).
pub const MAX_FEE_BPS: u16 = 1000;

/// Fee rates are expressed in basis points of this denominator.
pub const FEE_DENOMINATOR: u128 = 10_000;

/// A 20-byte account identity, written as `0x`-prefixed hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Identity([u8; 20]);

impl Identity {
    pub const ZERO: Identity = Identity([0u8; 20]);

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Short form for logs and terminal output: `0x1234ab..cdef`
    pub fn short(&self) -> String {
        let full = self.to_string();
        format!("{}..{}", &full[..8], &full[full.len() - 4..])
    }
}

impl FromStr for Identity {
    type Err = EscrowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex_part = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let bytes = hex::decode(hex_part).map_err(|_| EscrowError::InvalidIdentity)?;
        let array: [u8; 20] = bytes
            .try_into()
            .map_err(|_| EscrowError::InvalidIdentity)?;
        Ok(Self(array))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self)
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Serialize `Amount` as a decimal string.
///
/// JSON numbers lose precision well below `u128::MAX`, so every amount on the
/// wire and in the journal is a string.
pub mod amount_string {
    use super::Amount;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.trim().parse().map_err(serde::de::Error::custom)
    }
}

/// Lifecycle of a bounty: `Open -> {Claimed | Refunded}`, `Claimed -> {Completed | Refunded}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BountyStatus {
    Open,
    Claimed,
    Completed,
    Refunded,
}

impl BountyStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BountyStatus::Completed | BountyStatus::Refunded)
    }

    /// Whether the bounty's value is still locked in escrow.
    pub fn is_locked(&self) -> bool {
        matches!(self, BountyStatus::Open | BountyStatus::Claimed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BountyStatus::Open => "Open",
            BountyStatus::Claimed => "Claimed",
            BountyStatus::Completed => "Completed",
            BountyStatus::Refunded => "Refunded",
        }
    }
}

impl fmt::Display for BountyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BountyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(BountyStatus::Open),
            "claimed" => Ok(BountyStatus::Claimed),
            "completed" => Ok(BountyStatus::Completed),
            "refunded" => Ok(BountyStatus::Refunded),
            other => Err(format!("unknown bounty status: {}", other)),
        }
    }
}

/// One escrowed task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounty {
    pub id: BountyId,
    pub depositor: Identity,
    pub claimant: Option<Identity>,
    #[serde(with = "amount_string")]
    pub amount: Amount,
    /// Opaque task reference, e.g. `owner/repo#42`
    pub issue_reference: String,
    pub status: BountyStatus,
    pub created_at: Timestamp,
    pub claimed_at: Option<Timestamp>,
}

impl Bounty {
    /// Deadline after which a claimed bounty may be refunded by anyone.
    pub fn claim_expires_at(&self) -> Option<Timestamp> {
        self.claimed_at
            .map(|claimed| claimed.saturating_add(MAX_CLAIM_DURATION_SECS))
    }

    /// Strictly after the deadline; refunding exactly at the deadline is rejected.
    pub fn is_claim_expired(&self, now: Timestamp) -> bool {
        self.status == BountyStatus::Claimed
            && self
                .claim_expires_at()
                .map(|deadline| now > deadline)
                .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_parse_and_display() {
        let id: Identity = "0x00000000000000000000000000000000000000aB".parse().unwrap();
        assert_eq!(id.to_string(), "0x00000000000000000000000000000000000000ab");
        assert!(!id.is_zero());

        let bare: Identity = "00000000000000000000000000000000000000ab".parse().unwrap();
        assert_eq!(id, bare);
    }

    #[test]
    fn test_identity_rejects_malformed() {
        assert!("0x1234".parse::<Identity>().is_err());
        assert!("not-an-address".parse::<Identity>().is_err());
        assert!("".parse::<Identity>().is_err());
    }

    #[test]
    fn test_zero_identity() {
        let zero: Identity = "0x0000000000000000000000000000000000000000".parse().unwrap();
        assert!(zero.is_zero());
        assert_eq!(zero, Identity::ZERO);
    }

    #[test]
    fn test_identity_short() {
        let id = Identity::from_bytes([0xab; 20]);
        assert_eq!(id.short(), "0xababab..abab");
    }

    #[test]
    fn test_bounty_serializes_amount_as_string() {
        let bounty = Bounty {
            id: 1,
            depositor: Identity::from_bytes([1; 20]),
            claimant: None,
            amount: 1_000_000_000_000_000_000,
            issue_reference: "a/b#1".to_string(),
            status: BountyStatus::Open,
            created_at: 100,
            claimed_at: None,
        };

        let json = serde_json::to_value(&bounty).unwrap();
        assert_eq!(json["amount"], "1000000000000000000");
        assert_eq!(json["status"], "Open");

        let back: Bounty = serde_json::from_value(json).unwrap();
        assert_eq!(back, bounty);
    }

    #[test]
    fn test_claim_expiry_is_strict() {
        let bounty = Bounty {
            id: 1,
            depositor: Identity::from_bytes([1; 20]),
            claimant: Some(Identity::from_bytes([2; 20])),
            amount: 10,
            issue_reference: "a/b#1".to_string(),
            status: BountyStatus::Claimed,
            created_at: 0,
            claimed_at: Some(1_000),
        };

        let deadline = 1_000 + MAX_CLAIM_DURATION_SECS;
        assert_eq!(bounty.claim_expires_at(), Some(deadline));
        assert!(!bounty.is_claim_expired(deadline));
        assert!(bounty.is_claim_expired(deadline + 1));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("claimed".parse::<BountyStatus>().unwrap(), BountyStatus::Claimed);
        assert_eq!("Refunded".parse::<BountyStatus>().unwrap(), BountyStatus::Refunded);
        assert!("bogus".parse::<BountyStatus>().is_err());
        assert!(BountyStatus::Completed.is_terminal());
        assert!(BountyStatus::Claimed.is_locked());
    }

    #[test]
    fn test_refund_reaches_terminal_from_either_locked_state() {
        for from in [BountyStatus::Open, BountyStatus::Claimed] {
            assert!(from.is_locked());
            assert!(!from.is_terminal());
        }
        assert!(BountyStatus::Refunded.is_terminal());
        assert!(!BountyStatus::Refunded.is_locked());
    }
}
