//! Bounty escrow service
//!
//! [`BountyEscrow`] is the single serialization boundary around the ledger.
//! Each public operation runs as one transaction: validate against current
//! state, journal the resulting event, apply it, then notify.

use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use tracing::{debug, error, info, warn};

use crate::access::AccessControl;
use crate::clock::Clock;
use crate::error::{EscrowError, Result};
use crate::events::{EventRecord, LedgerEvent};
use crate::ledger::{Ledger, LedgerTotals};
use crate::notify::{NoopNotifier, Notifier};
use crate::storage::EventStore;
use crate::transfer::{ValueTransfer, VaultTransfer};
use crate::types::{Amount, Bounty, BountyId, BountyStatus, Identity, Timestamp};

/// Protocol parameters used only when the journal is empty.
#[derive(Debug, Clone, Copy)]
pub struct ProtocolGenesis {
    pub owner: Identity,
    pub fee_bps: u16,
}

pub struct BountyEscrow {
    // Reentrant so the transfer step of `withdraw` can call back into the
    // escrow on the same thread; other threads stay serialized.
    ledger: ReentrantMutex<RefCell<Ledger>>,
    store: Arc<EventStore>,
    clock: Arc<dyn Clock>,
    transfer: Arc<dyn ValueTransfer>,
    notifier: Arc<dyn Notifier>,
}

impl BountyEscrow {
    /// Open the escrow on `store`, replaying its journal, or writing the
    /// genesis record if the journal is empty.
    pub fn open(
        store: Arc<EventStore>,
        genesis: ProtocolGenesis,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let records = store.load_all()?;

        let ledger = if records.is_empty() {
            let access = AccessControl::new(genesis.owner, genesis.fee_bps)?;
            store.append(
                clock.now(),
                &LedgerEvent::ProtocolInitialized {
                    owner: genesis.owner,
                    fee_bps: genesis.fee_bps,
                },
            )?;
            info!(
                "Initialized escrow: owner {}, fee {} bps",
                genesis.owner, genesis.fee_bps
            );
            Ledger::new(access)
        } else {
            store.verify_chain()?;
            let ledger = Ledger::replay(&records)?;
            info!(
                "Replayed {} journal records ({} bounties, pool {})",
                records.len(),
                ledger.bounty_count(),
                ledger.pool_balance()
            );
            ledger
        };

        Ok(Self {
            ledger: ReentrantMutex::new(RefCell::new(ledger)),
            store,
            clock,
            transfer: Arc::new(VaultTransfer::new()),
            notifier: Arc::new(NoopNotifier),
        })
    }

    pub fn with_transfer(mut self, transfer: Arc<dyn ValueTransfer>) -> Self {
        self.transfer = transfer;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn store(&self) -> &Arc<EventStore> {
        &self.store
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    pub fn deposit(
        &self,
        funder: &Identity,
        issue_reference: &str,
        value: Amount,
    ) -> Result<BountyId> {
        let record = self.commit(|ledger, _| ledger.plan_deposit(funder, issue_reference, value))?;
        match record.event {
            LedgerEvent::BountyCreated {
                id,
                ref issue_reference,
                ..
            } => {
                info!(
                    "Bounty #{} created by {}: {} for {}",
                    id,
                    funder.short(),
                    value,
                    issue_reference
                );
                Ok(id)
            }
            ref other => Err(unexpected(other)),
        }
    }

    pub fn claim(&self, agent: &Identity, id: BountyId) -> Result<()> {
        self.commit(|ledger, _| ledger.plan_claim(agent, id))?;
        info!("Bounty #{} claimed by {}", id, agent.short());
        Ok(())
    }

    /// Owner-only: pay the claimant and credit the protocol fee.
    pub fn complete(&self, caller: &Identity, id: BountyId) -> Result<(Amount, Amount)> {
        let record = self.commit(|ledger, _| ledger.plan_complete(caller, id))?;
        match record.event {
            LedgerEvent::BountyCompleted {
                claimant,
                payout,
                fee,
                ..
            } => {
                info!(
                    "Bounty #{} completed: {} to {}, fee {}",
                    id,
                    payout,
                    claimant.short(),
                    fee
                );
                Ok((payout, fee))
            }
            ref other => Err(unexpected(other)),
        }
    }

    pub fn refund(&self, caller: &Identity, id: BountyId) -> Result<Amount> {
        let record = self.commit(|ledger, now| ledger.plan_refund(caller, id, now))?;
        match record.event {
            LedgerEvent::BountyRefunded {
                depositor, amount, ..
            } => {
                info!(
                    "Bounty #{} refunded: {} to {} (triggered by {})",
                    id,
                    amount,
                    depositor.short(),
                    caller.short()
                );
                Ok(amount)
            }
            ref other => Err(unexpected(other)),
        }
    }

    /// Drain the caller's pending balance through the transfer backend.
    ///
    /// The `Withdrawal` is journaled and applied before the transfer is
    /// attempted, so reentrant calls observe the drained balance and anything
    /// they commit is ordered after it. A rejected transfer is compensated by a
    /// journaled `WithdrawalReverted`.
    pub fn withdraw(&self, caller: &Identity) -> Result<Amount> {
        let guard = self.ledger.lock();
        let now = self.clock.now();

        let event = guard.borrow().plan_withdraw(caller).map_err(|e| {
            debug!("Withdraw by {} rejected: {}", caller.short(), e);
            e
        })?;
        let amount = match event {
            LedgerEvent::Withdrawal { amount, .. } => amount,
            ref other => return Err(unexpected(other)),
        };

        let record = self.store.append(now, &event)?;
        guard.borrow_mut().apply(&record.event, record.timestamp)?;

        if let Err(e) = self.transfer.transfer(caller, amount) {
            warn!(
                "Transfer of {} to {} failed, reverting withdrawal: {}",
                amount,
                caller.short(),
                e
            );
            let revert = LedgerEvent::WithdrawalReverted {
                identity: *caller,
                amount,
            };
            match self.store.append(self.clock.now(), &revert) {
                Ok(reverted) => {
                    guard
                        .borrow_mut()
                        .apply(&reverted.event, reverted.timestamp)?;
                    drop(guard);
                    self.notifier.notify(&record);
                    self.notifier.notify(&reverted);
                }
                // The debit stays journaled and applied; value is held, not lost.
                Err(journal_err) => error!(
                    "Failed to journal reversal of {} for {}, balance stays debited: {}",
                    amount,
                    caller.short(),
                    journal_err
                ),
            }
            return Err(EscrowError::TransferFailed(e.to_string()));
        }
        drop(guard);

        info!("{} withdrew {}", caller.short(), amount);
        self.notifier.notify(&record);
        Ok(amount)
    }

    pub fn set_fee_bps(&self, caller: &Identity, new_bps: u16) -> Result<()> {
        self.commit(|ledger, _| ledger.plan_set_fee_bps(caller, new_bps))?;
        info!("Protocol fee set to {} bps", new_bps);
        Ok(())
    }

    pub fn transfer_ownership(&self, caller: &Identity, new_owner: &Identity) -> Result<()> {
        self.commit(|ledger, _| ledger.plan_transfer_ownership(caller, new_owner))?;
        info!("Ownership transferred from {} to {}", caller, new_owner);
        Ok(())
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn get_bounty(&self, id: BountyId) -> Result<Bounty> {
        self.read(|ledger| ledger.bounty(id).cloned())
            .ok_or(EscrowError::NotFound(id))
    }

    pub fn list_bounties(
        &self,
        status: Option<BountyStatus>,
        limit: usize,
        offset: usize,
    ) -> Vec<Bounty> {
        self.read(|ledger| ledger.list_bounties(status, limit, offset))
    }

    pub fn bounty_count(&self) -> usize {
        self.read(|ledger| ledger.bounty_count())
    }

    pub fn pool_balance(&self) -> Amount {
        self.read(|ledger| ledger.pool_balance())
    }

    pub fn pending_balance_of(&self, identity: &Identity) -> Amount {
        self.read(|ledger| ledger.pending_balance_of(identity))
    }

    pub fn totals(&self) -> LedgerTotals {
        self.read(|ledger| ledger.totals())
    }

    pub fn protocol(&self) -> AccessControl {
        self.read(|ledger| *ledger.access())
    }

    pub fn events(&self, after: u64, limit: usize) -> Result<Vec<EventRecord>> {
        self.store.events_after(after, limit)
    }

    pub fn bounty_history(&self, id: BountyId) -> Result<Vec<EventRecord>> {
        let _ = self.get_bounty(id)?;
        self.store.events_for_bounty(id)
    }

    // ========================================================================
    // TRANSACTION BOUNDARY
    // ========================================================================

    fn commit<F>(&self, plan: F) -> Result<EventRecord>
    where
        F: FnOnce(&Ledger, Timestamp) -> Result<LedgerEvent>,
    {
        let guard = self.ledger.lock();
        let now = self.clock.now();

        let event = {
            let ledger = guard.borrow();
            plan(&*ledger, now).map_err(|e| {
                debug!("Operation rejected: {}", e);
                e
            })?
        };
        let record = self.store.append(now, &event)?;
        guard.borrow_mut().apply(&record.event, record.timestamp)?;
        drop(guard);

        self.notifier.notify(&record);
        Ok(record)
    }

    fn read<T>(&self, f: impl FnOnce(&Ledger) -> T) -> T {
        let guard = self.ledger.lock();
        let ledger = guard.borrow();
        f(&*ledger)
    }
}

fn unexpected(event: &LedgerEvent) -> EscrowError {
    EscrowError::CorruptJournal(format!("unexpected {} event", event.kind()))
}
