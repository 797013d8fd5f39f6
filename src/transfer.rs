//! External value transfer
//!
//! `withdraw` is the only operation that moves value out of the escrow. The
//! transfer step sits behind [`ValueTransfer`] so it can be a chain client, a
//! payment rail, or the in-process [`VaultTransfer`].

use std::collections::HashMap;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::info;

use crate::types::{Amount, Identity};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("recipient {0} rejected the transfer")]
    Rejected(Identity),

    #[error("insufficient reserve: requested {requested}, available {available}")]
    InsufficientReserve { requested: Amount, available: Amount },

    #[error("transfer backend unavailable: {0}")]
    Unavailable(String),
}

pub trait ValueTransfer: Send + Sync {
    /// Move `amount` to `to`. An `Err` means nothing was moved.
    fn transfer(&self, to: &Identity, amount: Amount) -> Result<(), TransferError>;
}

#[derive(Debug, Default)]
struct VaultState {
    paid: HashMap<Identity, Amount>,
    total_paid: Amount,
}

/// In-process payout vault.
///
/// Records what each identity has been paid. With a reserve set, transfers
/// beyond the remaining reserve are rejected.
#[derive(Debug, Default)]
pub struct VaultTransfer {
    state: Mutex<VaultState>,
    reserve: Option<Amount>,
}

impl VaultTransfer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reserve(reserve: Amount) -> Self {
        Self {
            state: Mutex::new(VaultState::default()),
            reserve: Some(reserve),
        }
    }

    pub fn paid_to(&self, identity: &Identity) -> Amount {
        self.state.lock().paid.get(identity).copied().unwrap_or(0)
    }

    pub fn total_paid(&self) -> Amount {
        self.state.lock().total_paid
    }
}

impl ValueTransfer for VaultTransfer {
    fn transfer(&self, to: &Identity, amount: Amount) -> Result<(), TransferError> {
        if to.is_zero() {
            return Err(TransferError::Rejected(*to));
        }

        let mut state = self.state.lock();
        if let Some(reserve) = self.reserve {
            let available = reserve.saturating_sub(state.total_paid);
            if amount > available {
                return Err(TransferError::InsufficientReserve {
                    requested: amount,
                    available,
                });
            }
        }

        *state.paid.entry(*to).or_insert(0) += amount;
        state.total_paid += amount;
        info!("Vault paid {} to {}", amount, to.short());
        Ok(())
    }
}
