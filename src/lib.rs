//! Bounty Escrow - hold task rewards until an agent delivers
//!
//! A depositor locks value against an issue reference. An agent claims the
//! bounty, the protocol owner confirms delivery, and the reward is credited
//! to the agent's pending balance minus the protocol fee.
//!
//! # How it works
//!
//! 1. `deposit` opens a bounty holding the attached value
//! 2. `claim` locks it to one agent and starts the 7-day claim window
//! 3. `complete` (owner only) credits payout to the agent and the fee to the owner
//! 4. `refund` returns value to the depositor: any time while open, or by
//!    anyone once a claim has expired
//! 5. `withdraw` drains a pending balance through the external transfer
//!
//! # Guarantees
//!
//! - Every transition is journaled before memory changes, and the journal is
//!   hash-chained so tampering is detected on replay
//! - Pool balance always equals locked value plus unwithdrawn balances
//! - A pending balance is zeroed before any external transfer runs

pub mod access;
pub mod clock;
pub mod config;
pub mod error;
pub mod escrow;
pub mod events;
pub mod ledger;
pub mod notify;
pub mod server;
pub mod storage;
pub mod transfer;
pub mod types;

pub use access::{split_fee, AccessControl, FeeSplit};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{EscrowError, Result};
pub use escrow::{BountyEscrow, ProtocolGenesis};
pub use events::{EventRecord, LedgerEvent};
pub use ledger::{Ledger, LedgerTotals};
pub use notify::{NoopNotifier, Notifier, WebhookNotifier};
pub use storage::EventStore;
pub use transfer::{TransferError, ValueTransfer, VaultTransfer};
pub use types::{
    Amount, Bounty, BountyId, BountyStatus, Identity, Timestamp, MAX_CLAIM_DURATION_SECS,
    MAX_FEE_BPS,
};
