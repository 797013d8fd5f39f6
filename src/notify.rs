//! Event notifications
//!
//! Committed events are handed to a [`Notifier`] after the ledger lock is
//! released. Delivery is fire-and-forget: a failed or slow notifier never
//! affects the ledger.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::events::{EventRecord, LedgerEvent};

pub trait Notifier: Send + Sync {
    fn notify(&self, record: &EventRecord);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _record: &EventRecord) {}
}

/// Chat-style webhook payload.
#[derive(Debug, Serialize)]
pub struct WebhookMessage<'a> {
    pub content: String,
    pub event: &'a EventRecord,
}

/// Relays `BountyCreated` and `BountyCompleted` to a chat webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(
                    "Failed to build webhook client with {:?} timeout, using defaults: {}",
                    timeout, e
                );
                reqwest::Client::new()
            });

        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, record: &EventRecord) {
        if !record.event.is_announcement() {
            return;
        }

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                debug!("No async runtime, dropping notification #{}", record.seq);
                return;
            }
        };

        let body = match serde_json::to_vec(&WebhookMessage {
            content: format_message(&record.event),
            event: record,
        }) {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to encode notification #{}: {}", record.seq, e);
                return;
            }
        };

        let client = self.client.clone();
        let url = self.url.clone();
        let seq = record.seq;
        handle.spawn(async move {
            let result = client
                .post(&url)
                .header("Content-Type", "application/json")
                .body(body)
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => {
                    debug!("Delivered notification #{}", seq);
                }
                Ok(resp) => warn!("Webhook rejected notification #{}: {}", seq, resp.status()),
                Err(e) => warn!("Webhook delivery failed for #{}: {}", seq, e),
            }
        });
    }
}

/// One-line human summary for chat channels.
pub fn format_message(event: &LedgerEvent) -> String {
    match event {
        LedgerEvent::BountyCreated {
            id,
            depositor,
            amount,
            issue_reference,
        } => format!(
            "New bounty #{} on {}: {} locked by {}",
            id,
            issue_reference,
            amount,
            depositor.short()
        ),
        LedgerEvent::BountyClaimed { id, claimant } => {
            format!("Bounty #{} claimed by {}", id, claimant.short())
        }
        LedgerEvent::BountyCompleted {
            id,
            claimant,
            payout,
            fee,
            ..
        } => format!(
            "Bounty #{} completed: {} to {} (fee {})",
            id,
            payout,
            claimant.short(),
            fee
        ),
        LedgerEvent::BountyRefunded {
            id,
            depositor,
            amount,
        } => format!("Bounty #{} refunded: {} to {}", id, amount, depositor.short()),
        LedgerEvent::Withdrawal { identity, amount } => {
            format!("{} withdrew {}", identity.short(), amount)
        }
        LedgerEvent::WithdrawalReverted { identity, amount } => {
            format!("Withdrawal of {} by {} reverted", amount, identity.short())
        }
        LedgerEvent::FeeUpdated { old_bps, new_bps } => {
            format!("Protocol fee changed from {} to {} bps", old_bps, new_bps)
        }
        LedgerEvent::OwnershipTransferred {
            previous,
            new_owner,
        } => format!(
            "Ownership transferred from {} to {}",
            previous.short(),
            new_owner.short()
        ),
        LedgerEvent::ProtocolInitialized { owner, fee_bps } => {
            format!("Escrow initialized: owner {}, fee {} bps", owner.short(), fee_bps)
        }
    }
}
