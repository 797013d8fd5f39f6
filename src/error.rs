//! Escrow error taxonomy
//!
//! Every rejection is synchronous and leaves the ledger untouched.

use thiserror::Error;

use crate::types::BountyId;

pub type Result<T> = std::result::Result<T, EscrowError>;

#[derive(Error, Debug)]
pub enum EscrowError {
    #[error("deposit value must be greater than zero")]
    InvalidAmount,

    #[error("issue reference must not be empty")]
    InvalidReference,

    #[error("bounty {0} not found")]
    NotFound(BountyId),

    #[error("bounty {0} is not open")]
    NotOpen(BountyId),

    #[error("depositor cannot claim their own bounty")]
    SelfClaim,

    #[error("bounty {0} is not claimed")]
    NotClaimed(BountyId),

    #[error("caller is not authorized")]
    NotAuthorized,

    #[error("bounty {0} cannot be refunded by this caller at this time")]
    CannotRefund(BountyId),

    #[error("no pending balance to withdraw")]
    NothingToWithdraw,

    #[error("transfer failed: {0}")]
    TransferFailed(String),

    #[error("fee of {0} bps exceeds the maximum")]
    FeeTooHigh(u16),

    #[error("invalid identity")]
    InvalidIdentity,

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("corrupt journal: {0}")]
    CorruptJournal(String),
}

impl EscrowError {
    /// Stable name used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            EscrowError::InvalidAmount => "InvalidAmount",
            EscrowError::InvalidReference => "InvalidReference",
            EscrowError::NotFound(_) => "NotFound",
            EscrowError::NotOpen(_) => "NotOpen",
            EscrowError::SelfClaim => "SelfClaim",
            EscrowError::NotClaimed(_) => "NotClaimed",
            EscrowError::NotAuthorized => "NotAuthorized",
            EscrowError::CannotRefund(_) => "CannotRefund",
            EscrowError::NothingToWithdraw => "NothingToWithdraw",
            EscrowError::TransferFailed(_) => "TransferFailed",
            EscrowError::FeeTooHigh(_) => "FeeTooHigh",
            EscrowError::InvalidIdentity => "InvalidIdentity",
            EscrowError::Storage(_) => "Storage",
            EscrowError::Codec(_) => "Codec",
            EscrowError::CorruptJournal(_) => "CorruptJournal",
        }
    }

    /// Rejections caused by the request itself, as opposed to the service.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            EscrowError::Storage(_)
                | EscrowError::Codec(_)
                | EscrowError::CorruptJournal(_)
                | EscrowError::TransferFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_taxonomy() {
        assert_eq!(EscrowError::NotFound(7).code(), "NotFound");
        assert_eq!(EscrowError::FeeTooHigh(1001).code(), "FeeTooHigh");
        assert_eq!(
            EscrowError::TransferFailed("x".to_string()).code(),
            "TransferFailed"
        );
    }

    #[test]
    fn test_rejection_classification() {
        assert!(EscrowError::SelfClaim.is_rejection());
        assert!(EscrowError::CannotRefund(1).is_rejection());
        assert!(!EscrowError::TransferFailed("x".to_string()).is_rejection());
        assert!(!EscrowError::CorruptJournal("x".to_string()).is_rejection());
    }
}
