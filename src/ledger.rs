//! Ledger engine
//!
//! Pure state machine over bounties and pending balances. Operations are split
//! in two phases:
//!
//! 1. `plan_*` validates a request against the current state and returns the
//!    [`LedgerEvent`] it would produce. Planning never mutates.
//! 2. [`Ledger::apply`] folds a validated event into the state.
//!
//! The same `apply` is used to rebuild the ledger from the journal, so live
//! state and replayed state cannot drift apart.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::access::AccessControl;
use crate::error::{EscrowError, Result};
use crate::events::{EventRecord, LedgerEvent};
use crate::types::{amount_string, Amount, Bounty, BountyId, BountyStatus, Identity, Timestamp};

/// Running value totals used for the conservation audit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTotals {
    /// Everything ever deposited.
    #[serde(with = "amount_string")]
    pub deposited: Amount,
    /// Held by `Open` and `Claimed` bounties.
    #[serde(with = "amount_string")]
    pub locked: Amount,
    /// Credited to identities but not yet withdrawn.
    #[serde(with = "amount_string")]
    pub pending: Amount,
    /// Transferred out.
    #[serde(with = "amount_string")]
    pub withdrawn: Amount,
}

impl LedgerTotals {
    /// Value currently held by the engine.
    pub fn pool_balance(&self) -> Amount {
        self.locked + self.pending
    }

    pub fn is_conserved(&self) -> bool {
        self.locked
            .checked_add(self.pending)
            .and_then(|v| v.checked_add(self.withdrawn))
            == Some(self.deposited)
    }
}

#[derive(Debug, Clone)]
pub struct Ledger {
    bounties: BTreeMap<BountyId, Bounty>,
    pending: HashMap<Identity, Amount>,
    access: AccessControl,
    next_id: BountyId,
    totals: LedgerTotals,
}

impl Ledger {
    pub fn new(access: AccessControl) -> Self {
        Self {
            bounties: BTreeMap::new(),
            pending: HashMap::new(),
            access,
            next_id: 1,
            totals: LedgerTotals::default(),
        }
    }

    /// Rebuild a ledger from its journal. The first record must be the
    /// `ProtocolInitialized` genesis event.
    pub fn replay(records: &[EventRecord]) -> Result<Self> {
        let (genesis, rest) = records
            .split_first()
            .ok_or_else(|| EscrowError::CorruptJournal("journal is empty".to_string()))?;

        let access = match &genesis.event {
            LedgerEvent::ProtocolInitialized { owner, fee_bps } => {
                AccessControl::new(*owner, *fee_bps)?
            }
            other => {
                return Err(EscrowError::CorruptJournal(format!(
                    "journal starts with {} instead of ProtocolInitialized",
                    other.kind()
                )))
            }
        };

        let mut ledger = Ledger::new(access);
        for record in rest {
            ledger.apply(&record.event, record.timestamp)?;
        }
        Ok(ledger)
    }

    // ========================================================================
    // PLANNING (validation only)
    // ========================================================================

    pub fn plan_deposit(
        &self,
        funder: &Identity,
        issue_reference: &str,
        value: Amount,
    ) -> Result<LedgerEvent> {
        if value == 0 {
            return Err(EscrowError::InvalidAmount);
        }
        let issue_reference = issue_reference.trim();
        if issue_reference.is_empty() {
            return Err(EscrowError::InvalidReference);
        }
        // Every other total is bounded by `deposited`, so this is the only
        // place an overflow can occur.
        if self.totals.deposited.checked_add(value).is_none() {
            return Err(EscrowError::InvalidAmount);
        }

        Ok(LedgerEvent::BountyCreated {
            id: self.next_id,
            depositor: *funder,
            amount: value,
            issue_reference: issue_reference.to_string(),
        })
    }

    pub fn plan_claim(&self, agent: &Identity, id: BountyId) -> Result<LedgerEvent> {
        let bounty = self.get(id)?;
        if bounty.status != BountyStatus::Open {
            return Err(EscrowError::NotOpen(id));
        }
        if bounty.depositor == *agent {
            return Err(EscrowError::SelfClaim);
        }
        Ok(LedgerEvent::BountyClaimed {
            id,
            claimant: *agent,
        })
    }

    pub fn plan_complete(&self, caller: &Identity, id: BountyId) -> Result<LedgerEvent> {
        self.access.ensure_owner(caller)?;
        let bounty = self.get(id)?;
        if bounty.status != BountyStatus::Claimed {
            return Err(EscrowError::NotClaimed(id));
        }
        let claimant = bounty.claimant.ok_or_else(|| {
            EscrowError::CorruptJournal(format!("claimed bounty {} has no claimant", id))
        })?;

        let split = self.access.split(bounty.amount);
        Ok(LedgerEvent::BountyCompleted {
            id,
            claimant,
            payout: split.payout,
            fee: split.fee,
            fee_recipient: self.access.owner(),
        })
    }

    pub fn plan_refund(&self, caller: &Identity, id: BountyId, now: Timestamp) -> Result<LedgerEvent> {
        let bounty = self.get(id)?;

        let open_self_refund = bounty.status == BountyStatus::Open && bounty.depositor == *caller;
        let expired_claim = bounty.is_claim_expired(now);
        if !(open_self_refund || expired_claim) {
            return Err(EscrowError::CannotRefund(id));
        }

        Ok(LedgerEvent::BountyRefunded {
            id,
            depositor: bounty.depositor,
            amount: bounty.amount,
        })
    }

    pub fn plan_withdraw(&self, caller: &Identity) -> Result<LedgerEvent> {
        let amount = self.pending_balance_of(caller);
        if amount == 0 {
            return Err(EscrowError::NothingToWithdraw);
        }
        Ok(LedgerEvent::Withdrawal {
            identity: *caller,
            amount,
        })
    }

    pub fn plan_set_fee_bps(&self, caller: &Identity, new_bps: u16) -> Result<LedgerEvent> {
        self.access.check_fee_update(caller, new_bps)?;
        Ok(LedgerEvent::FeeUpdated {
            old_bps: self.access.fee_bps(),
            new_bps,
        })
    }

    pub fn plan_transfer_ownership(
        &self,
        caller: &Identity,
        new_owner: &Identity,
    ) -> Result<LedgerEvent> {
        self.access.check_ownership_transfer(caller, new_owner)?;
        Ok(LedgerEvent::OwnershipTransferred {
            previous: self.access.owner(),
            new_owner: *new_owner,
        })
    }

    // ========================================================================
    // APPLY
    // ========================================================================

    /// Fold an event into the state. Rejects events that do not fit the
    /// current state, which during replay means the journal is corrupt.
    pub fn apply(&mut self, event: &LedgerEvent, at: Timestamp) -> Result<()> {
        match event {
            LedgerEvent::ProtocolInitialized { .. } => {
                return Err(corrupt("duplicate ProtocolInitialized"));
            }
            LedgerEvent::BountyCreated {
                id,
                depositor,
                amount,
                issue_reference,
            } => {
                if *id != self.next_id {
                    return Err(corrupt(format!(
                        "expected bounty id {}, found {}",
                        self.next_id, id
                    )));
                }
                let deposited = self
                    .totals
                    .deposited
                    .checked_add(*amount)
                    .ok_or_else(|| corrupt("deposit total overflow"))?;

                self.bounties.insert(
                    *id,
                    Bounty {
                        id: *id,
                        depositor: *depositor,
                        claimant: None,
                        amount: *amount,
                        issue_reference: issue_reference.clone(),
                        status: BountyStatus::Open,
                        created_at: at,
                        claimed_at: None,
                    },
                );
                self.next_id += 1;
                self.totals.deposited = deposited;
                self.totals.locked += *amount;
            }
            LedgerEvent::BountyClaimed { id, claimant } => {
                let bounty = self.get_mut_in(*id, BountyStatus::Open)?;
                bounty.claimant = Some(*claimant);
                bounty.claimed_at = Some(at);
                bounty.status = BountyStatus::Claimed;
            }
            LedgerEvent::BountyCompleted {
                id,
                claimant,
                payout,
                fee,
                fee_recipient,
            } => {
                let bounty = self.get_mut_in(*id, BountyStatus::Claimed)?;
                if bounty.claimant != Some(*claimant)
                    || payout.checked_add(*fee) != Some(bounty.amount)
                {
                    return Err(corrupt(format!("completion of bounty {} does not match", id)));
                }
                bounty.status = BountyStatus::Completed;
                let amount = bounty.amount;

                self.totals.locked -= amount;
                self.credit(claimant, *payout);
                self.credit(fee_recipient, *fee);
            }
            LedgerEvent::BountyRefunded {
                id,
                depositor,
                amount,
            } => {
                let bounty = self
                    .bounties
                    .get_mut(id)
                    .ok_or_else(|| corrupt(format!("unknown bounty {}", id)))?;
                if !bounty.status.is_locked()
                    || bounty.depositor != *depositor
                    || bounty.amount != *amount
                {
                    return Err(corrupt(format!("refund of bounty {} does not match", id)));
                }
                bounty.status = BountyStatus::Refunded;

                self.totals.locked -= *amount;
                self.credit(depositor, *amount);
            }
            LedgerEvent::Withdrawal { identity, amount } => {
                let balance = self.pending_balance_of(identity);
                if balance != *amount || *amount == 0 {
                    return Err(corrupt(format!(
                        "withdrawal of {} by {} does not match balance {}",
                        amount, identity, balance
                    )));
                }
                self.pending.remove(identity);
                self.totals.pending -= *amount;
                self.totals.withdrawn += *amount;
            }
            LedgerEvent::WithdrawalReverted { identity, amount } => {
                // Adds back rather than overwriting, so credits that landed
                // while the transfer was in flight are kept.
                let withdrawn = self
                    .totals
                    .withdrawn
                    .checked_sub(*amount)
                    .filter(|_| *amount > 0)
                    .ok_or_else(|| {
                        corrupt(format!(
                            "reverted withdrawal of {} by {} exceeds withdrawn total",
                            amount, identity
                        ))
                    })?;
                self.totals.withdrawn = withdrawn;
                self.credit(identity, *amount);
            }
            LedgerEvent::FeeUpdated { new_bps, .. } => {
                self.access.set_fee_bps(*new_bps);
            }
            LedgerEvent::OwnershipTransferred { new_owner, .. } => {
                self.access.set_owner(*new_owner);
            }
        }
        Ok(())
    }

    fn credit(&mut self, identity: &Identity, amount: Amount) {
        if amount == 0 {
            return;
        }
        *self.pending.entry(*identity).or_insert(0) += amount;
        self.totals.pending += amount;
    }

    fn get(&self, id: BountyId) -> Result<&Bounty> {
        self.bounties.get(&id).ok_or(EscrowError::NotFound(id))
    }

    fn get_mut_in(&mut self, id: BountyId, expected: BountyStatus) -> Result<&mut Bounty> {
        let bounty = self
            .bounties
            .get_mut(&id)
            .ok_or_else(|| corrupt(format!("unknown bounty {}", id)))?;
        if bounty.status != expected {
            return Err(corrupt(format!(
                "bounty {} is {}, expected {}",
                id, bounty.status, expected
            )));
        }
        Ok(bounty)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn bounty(&self, id: BountyId) -> Option<&Bounty> {
        self.bounties.get(&id)
    }

    /// Bounties in id order, optionally filtered by status.
    pub fn list_bounties(
        &self,
        status: Option<BountyStatus>,
        limit: usize,
        offset: usize,
    ) -> Vec<Bounty> {
        self.bounties
            .values()
            .filter(|b| status.map(|s| b.status == s).unwrap_or(true))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn bounty_count(&self) -> usize {
        self.bounties.len()
    }

    pub fn pending_balance_of(&self, identity: &Identity) -> Amount {
        self.pending.get(identity).copied().unwrap_or(0)
    }

    pub fn pool_balance(&self) -> Amount {
        self.totals.pool_balance()
    }

    pub fn totals(&self) -> LedgerTotals {
        self.totals
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }
}

fn corrupt(msg: impl Into<String>) -> EscrowError {
    EscrowError::CorruptJournal(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::GENESIS_HASH;
    use crate::types::MAX_CLAIM_DURATION_SECS;

    const ONE_ETH: Amount = 1_000_000_000_000_000_000;

    fn owner() -> Identity {
        Identity::from_bytes([0x01; 20])
    }

    fn funder() -> Identity {
        Identity::from_bytes([0x02; 20])
    }

    fn agent() -> Identity {
        Identity::from_bytes([0x03; 20])
    }

    fn stranger() -> Identity {
        Identity::from_bytes([0x04; 20])
    }

    fn ledger(fee_bps: u16) -> Ledger {
        Ledger::new(AccessControl::new(owner(), fee_bps).unwrap())
    }

    fn run(ledger: &mut Ledger, event: Result<LedgerEvent>, at: Timestamp) -> LedgerEvent {
        let event = event.unwrap();
        ledger.apply(&event, at).unwrap();
        assert!(ledger.totals().is_conserved());
        event
    }

    fn deposit(ledger: &mut Ledger, value: Amount, at: Timestamp) -> BountyId {
        let event = ledger.plan_deposit(&funder(), "a/b#1", value);
        match run(ledger, event, at) {
            LedgerEvent::BountyCreated { id, .. } => id,
            other => panic!("unexpected event {:?}", other),
        }
    }

    fn claim(ledger: &mut Ledger, id: BountyId, at: Timestamp) {
        let event = ledger.plan_claim(&agent(), id);
        run(ledger, event, at);
    }

    #[test]
    fn test_deposit_assigns_sequential_ids() {
        let mut ledger = ledger(0);
        assert_eq!(deposit(&mut ledger, 10, 1), 1);
        assert_eq!(deposit(&mut ledger, 20, 2), 2);

        let bounty = ledger.bounty(2).unwrap();
        assert_eq!(bounty.amount, 20);
        assert_eq!(bounty.status, BountyStatus::Open);
        assert_eq!(bounty.created_at, 2);
        assert_eq!(bounty.claimant, None);
        assert_eq!(ledger.pool_balance(), 30);
        assert_eq!(ledger.pending_balance_of(&funder()), 0);
    }

    #[test]
    fn test_deposit_rejects_zero_and_empty_reference() {
        let ledger = ledger(0);
        assert!(matches!(
            ledger.plan_deposit(&funder(), "a/b#1", 0),
            Err(EscrowError::InvalidAmount)
        ));
        assert!(matches!(
            ledger.plan_deposit(&funder(), "", 10),
            Err(EscrowError::InvalidReference)
        ));
        assert!(matches!(
            ledger.plan_deposit(&funder(), "   ", 10),
            Err(EscrowError::InvalidReference)
        ));
    }

    #[test]
    fn test_deposit_rejects_total_overflow() {
        let mut ledger = ledger(0);
        deposit(&mut ledger, u128::MAX, 1);
        assert!(matches!(
            ledger.plan_deposit(&funder(), "a/b#2", 1),
            Err(EscrowError::InvalidAmount)
        ));
    }

    #[test]
    fn test_claim() {
        let mut ledger = ledger(0);
        let id = deposit(&mut ledger, 10, 1);
        claim(&mut ledger, id, 5);

        let bounty = ledger.bounty(id).unwrap();
        assert_eq!(bounty.status, BountyStatus::Claimed);
        assert_eq!(bounty.claimant, Some(agent()));
        assert_eq!(bounty.claimed_at, Some(5));
    }

    #[test]
    fn test_claim_rejections() {
        let mut ledger = ledger(0);
        assert!(matches!(
            ledger.plan_claim(&agent(), 99),
            Err(EscrowError::NotFound(99))
        ));

        let id = deposit(&mut ledger, 10, 1);
        assert!(matches!(
            ledger.plan_claim(&funder(), id),
            Err(EscrowError::SelfClaim)
        ));

        claim(&mut ledger, id, 2);
        assert!(matches!(
            ledger.plan_claim(&stranger(), id),
            Err(EscrowError::NotOpen(_))
        ));
    }

    #[test]
    fn test_complete_credits_payout_and_fee() {
        let mut ledger = ledger(250);
        let id = deposit(&mut ledger, ONE_ETH, 1);
        claim(&mut ledger, id, 2);

        let event = ledger.plan_complete(&owner(), id);
        run(&mut ledger, event, 3);

        assert_eq!(ledger.bounty(id).unwrap().status, BountyStatus::Completed);
        assert_eq!(ledger.pending_balance_of(&agent()), 975_000_000_000_000_000);
        assert_eq!(ledger.pending_balance_of(&owner()), 25_000_000_000_000_000);
        assert_eq!(ledger.totals().locked, 0);
        assert_eq!(ledger.pool_balance(), ONE_ETH);
    }

    #[test]
    fn test_complete_rejections() {
        let mut ledger = ledger(250);
        let id = deposit(&mut ledger, 100, 1);

        assert!(matches!(
            ledger.plan_complete(&stranger(), id),
            Err(EscrowError::NotAuthorized)
        ));
        assert!(matches!(
            ledger.plan_complete(&owner(), 42),
            Err(EscrowError::NotFound(42))
        ));
        // Open bounties cannot skip Claimed
        assert!(matches!(
            ledger.plan_complete(&owner(), id),
            Err(EscrowError::NotClaimed(_))
        ));
    }

    #[test]
    fn test_fee_recipient_is_owner_at_completion() {
        let mut ledger = ledger(1000);
        let id = deposit(&mut ledger, 1_000, 1);
        claim(&mut ledger, id, 2);

        let event = ledger.plan_transfer_ownership(&owner(), &stranger());
        run(&mut ledger, event, 3);

        assert!(matches!(
            ledger.plan_complete(&owner(), id),
            Err(EscrowError::NotAuthorized)
        ));
        let event = ledger.plan_complete(&stranger(), id);
        run(&mut ledger, event, 4);

        assert_eq!(ledger.pending_balance_of(&stranger()), 100);
        assert_eq!(ledger.pending_balance_of(&owner()), 0);
    }

    #[test]
    fn test_fee_change_does_not_touch_completed_bounties() {
        let mut ledger = ledger(250);
        let id = deposit(&mut ledger, 10_000, 1);
        claim(&mut ledger, id, 2);
        let event = ledger.plan_complete(&owner(), id);
        run(&mut ledger, event, 3);

        let event = ledger.plan_set_fee_bps(&owner(), 1000);
        run(&mut ledger, event, 4);

        assert_eq!(ledger.access().fee_bps(), 1000);
        assert_eq!(ledger.pending_balance_of(&agent()), 9_750);
        assert_eq!(ledger.pending_balance_of(&owner()), 250);
    }

    #[test]
    fn test_open_self_refund() {
        let mut ledger = ledger(0);
        let id = deposit(&mut ledger, 10, 1);

        assert!(matches!(
            ledger.plan_refund(&stranger(), id, 2),
            Err(EscrowError::CannotRefund(_))
        ));

        let event = ledger.plan_refund(&funder(), id, 2);
        run(&mut ledger, event, 2);

        let bounty = ledger.bounty(id).unwrap();
        assert_eq!(bounty.status, BountyStatus::Refunded);
        assert_eq!(bounty.claimant, None);
        assert_eq!(ledger.pending_balance_of(&funder()), 10);
    }

    #[test]
    fn test_claimed_refund_requires_expiry() {
        let mut ledger = ledger(0);
        let id = deposit(&mut ledger, 10, 0);
        claim(&mut ledger, id, 1_000);

        // Not even the depositor may pull a live claim
        assert!(matches!(
            ledger.plan_refund(&funder(), id, 1_001),
            Err(EscrowError::CannotRefund(_))
        ));

        let deadline = 1_000 + MAX_CLAIM_DURATION_SECS;
        assert!(matches!(
            ledger.plan_refund(&stranger(), id, deadline),
            Err(EscrowError::CannotRefund(_))
        ));

        let event = ledger.plan_refund(&stranger(), id, deadline + 1);
        run(&mut ledger, event, deadline + 1);

        let bounty = ledger.bounty(id).unwrap();
        assert_eq!(bounty.status, BountyStatus::Refunded);
        assert_eq!(bounty.claimant, Some(agent()));
        assert_eq!(ledger.pending_balance_of(&funder()), 10);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut ledger = ledger(0);
        let id = deposit(&mut ledger, 10, 0);
        let event = ledger.plan_refund(&funder(), id, 1);
        run(&mut ledger, event, 1);

        let far_future = i64::MAX;
        assert!(ledger.plan_claim(&agent(), id).is_err());
        assert!(ledger.plan_complete(&owner(), id).is_err());
        assert!(ledger.plan_refund(&funder(), id, far_future).is_err());
        assert_eq!(ledger.bounty(id).unwrap().status, BountyStatus::Refunded);
    }

    #[test]
    fn test_withdraw_drains_balance() {
        let mut ledger = ledger(0);
        let id = deposit(&mut ledger, 10, 0);
        let event = ledger.plan_refund(&funder(), id, 1);
        run(&mut ledger, event, 1);

        let event = ledger.plan_withdraw(&funder());
        run(&mut ledger, event, 2);

        assert_eq!(ledger.pending_balance_of(&funder()), 0);
        assert_eq!(ledger.pool_balance(), 0);
        assert_eq!(ledger.totals().withdrawn, 10);
        assert!(matches!(
            ledger.plan_withdraw(&funder()),
            Err(EscrowError::NothingToWithdraw)
        ));
    }

    #[test]
    fn test_withdrawal_reverted_restores_balance() {
        let mut ledger = ledger(0);
        let id = deposit(&mut ledger, 10, 0);
        let event = ledger.plan_refund(&funder(), id, 1);
        run(&mut ledger, event, 1);

        let event = ledger.plan_withdraw(&funder()).unwrap();
        ledger.apply(&event, 2).unwrap();

        // A credit landing between the debit and the reversal is kept
        let second = deposit(&mut ledger, 7, 2);
        let event = ledger.plan_refund(&funder(), second, 3);
        run(&mut ledger, event, 3);

        let revert = LedgerEvent::WithdrawalReverted {
            identity: funder(),
            amount: 10,
        };
        ledger.apply(&revert, 4).unwrap();

        assert_eq!(ledger.pending_balance_of(&funder()), 17);
        assert_eq!(ledger.totals().withdrawn, 0);
        assert!(ledger.totals().is_conserved());

        // Nothing left to revert
        assert!(matches!(
            ledger.apply(&revert, 5),
            Err(EscrowError::CorruptJournal(_))
        ));
    }

    #[test]
    fn test_balances_accumulate_across_bounties() {
        let mut ledger = ledger(0);
        for _ in 0..3 {
            let id = deposit(&mut ledger, 10, 0);
            let event = ledger.plan_refund(&funder(), id, 1);
            run(&mut ledger, event, 1);
        }
        assert_eq!(ledger.pending_balance_of(&funder()), 30);
    }

    #[test]
    fn test_apply_rejects_out_of_order_events() {
        let mut ledger = ledger(0);
        let stray = LedgerEvent::BountyClaimed {
            id: 1,
            claimant: agent(),
        };
        assert!(matches!(
            ledger.apply(&stray, 0),
            Err(EscrowError::CorruptJournal(_))
        ));

        let skipped = LedgerEvent::BountyCreated {
            id: 2,
            depositor: funder(),
            amount: 1,
            issue_reference: "x".to_string(),
        };
        assert!(ledger.apply(&skipped, 0).is_err());
    }

    #[test]
    fn test_replay_rebuilds_state() {
        let access = AccessControl::new(owner(), 250).unwrap();
        let events = vec![
            LedgerEvent::ProtocolInitialized {
                owner: owner(),
                fee_bps: 250,
            },
            LedgerEvent::BountyCreated {
                id: 1,
                depositor: funder(),
                amount: 10_000,
                issue_reference: "a/b#1".to_string(),
            },
            LedgerEvent::BountyClaimed {
                id: 1,
                claimant: agent(),
            },
        ];

        let mut prev = GENESIS_HASH;
        let records: Vec<EventRecord> = events
            .into_iter()
            .enumerate()
            .map(|(i, event)| {
                let record = EventRecord::seal(i as u64 + 1, 100 + i as i64, event, prev).unwrap();
                prev = record.hash;
                record
            })
            .collect();

        let ledger = Ledger::replay(&records).unwrap();
        assert_eq!(*ledger.access(), access);
        let bounty = ledger.bounty(1).unwrap();
        assert_eq!(bounty.status, BountyStatus::Claimed);
        assert_eq!(bounty.created_at, 101);
        assert_eq!(bounty.claimed_at, Some(102));
        assert!(Ledger::replay(&records[1..]).is_err());
        assert!(Ledger::replay(&[]).is_err());
    }

    #[test]
    fn test_list_bounties_filters_and_pages() {
        let mut ledger = ledger(0);
        for _ in 0..5 {
            deposit(&mut ledger, 10, 0);
        }
        claim(&mut ledger, 2, 1);
        claim(&mut ledger, 4, 1);

        let claimed = ledger.list_bounties(Some(BountyStatus::Claimed), 10, 0);
        assert_eq!(claimed.iter().map(|b| b.id).collect::<Vec<_>>(), vec![2, 4]);

        let page = ledger.list_bounties(None, 2, 1);
        assert_eq!(page.iter().map(|b| b.id).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(ledger.bounty_count(), 5);
    }
}
