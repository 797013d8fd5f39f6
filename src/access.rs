//! Access control
//!
//! Holds the single owner identity and the protocol fee rate. Every
//! privileged transition goes through [`AccessControl::ensure_owner`].

use serde::{Deserialize, Serialize};

use crate::error::{EscrowError, Result};
use crate::types::{Amount, Identity, FEE_DENOMINATOR, MAX_FEE_BPS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    owner: Identity,
    fee_bps: u16,
}

/// Result of splitting a completed bounty between claimant and owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    pub payout: Amount,
    pub fee: Amount,
}

impl AccessControl {
    pub fn new(owner: Identity, fee_bps: u16) -> Result<Self> {
        if owner.is_zero() {
            return Err(EscrowError::InvalidIdentity);
        }
        if fee_bps > MAX_FEE_BPS {
            return Err(EscrowError::FeeTooHigh(fee_bps));
        }
        Ok(Self { owner, fee_bps })
    }

    pub fn owner(&self) -> Identity {
        self.owner
    }

    pub fn fee_bps(&self) -> u16 {
        self.fee_bps
    }

    pub fn ensure_owner(&self, caller: &Identity) -> Result<()> {
        if *caller != self.owner {
            return Err(EscrowError::NotAuthorized);
        }
        Ok(())
    }

    pub fn check_fee_update(&self, caller: &Identity, new_bps: u16) -> Result<()> {
        self.ensure_owner(caller)?;
        if new_bps > MAX_FEE_BPS {
            return Err(EscrowError::FeeTooHigh(new_bps));
        }
        Ok(())
    }

    pub fn check_ownership_transfer(&self, caller: &Identity, new_owner: &Identity) -> Result<()> {
        self.ensure_owner(caller)?;
        if new_owner.is_zero() {
            return Err(EscrowError::InvalidIdentity);
        }
        Ok(())
    }

    pub(crate) fn set_fee_bps(&mut self, bps: u16) {
        self.fee_bps = bps;
    }

    pub(crate) fn set_owner(&mut self, owner: Identity) {
        self.owner = owner;
    }

    /// Split `amount` at the current fee rate.
    pub fn split(&self, amount: Amount) -> FeeSplit {
        split_fee(amount, self.fee_bps)
    }
}

/// `fee = floor(amount * bps / 10000)`, `payout = amount - fee`.
///
/// Computed as `q * bps + r * bps / 10000` with `amount = q * 10000 + r` so
/// the product never overflows `u128`.
pub fn split_fee(amount: Amount, fee_bps: u16) -> FeeSplit {
    let bps = fee_bps as u128;
    let fee = (amount / FEE_DENOMINATOR) * bps + (amount % FEE_DENOMINATOR) * bps / FEE_DENOMINATOR;
    FeeSplit {
        payout: amount - fee,
        fee,
    }
}
