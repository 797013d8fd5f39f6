//! Bounty lifecycle commands

use crate::client::EscrowClient;
use crate::style::*;
use anyhow::Result;
use bounty_escrow::{Amount, Bounty, BountyId, BountyStatus, Identity};
use chrono::{DateTime, Utc};

pub async fn deposit(
    client: &EscrowClient,
    caller: Identity,
    issue_reference: &str,
    value: Amount,
) -> Result<()> {
    let id = client.deposit(caller, issue_reference, value).await?;
    print_success(&format!(
        "Bounty #{} created for {} ({} locked)",
        id,
        style_cyan(issue_reference),
        format_amount(value)
    ));
    Ok(())
}

pub async fn claim(client: &EscrowClient, caller: Identity, id: BountyId) -> Result<()> {
    let bounty = client.claim(caller, id).await?;
    print_success(&format!("Claimed bounty #{}", id));
    if let Some(expires) = bounty.claim_expires_at() {
        println!("  Deliver before {}", style_bold(&format_time(expires)));
    }
    Ok(())
}

pub async fn complete(client: &EscrowClient, caller: Identity, id: BountyId) -> Result<()> {
    let resp = client.complete(caller, id).await?;
    print_success(&format!("Bounty #{} completed", resp.bounty_id));
    println!("  Payout: {}", style_green(&format_amount(resp.payout)));
    println!("  Fee:    {}", style_dim(&format_amount(resp.fee)));
    Ok(())
}

pub async fn refund(client: &EscrowClient, caller: Identity, id: BountyId) -> Result<()> {
    let bounty = client.refund(caller, id).await?;
    print_success(&format!(
        "Bounty #{} refunded: {} credited to {}",
        id,
        format_amount(bounty.amount),
        bounty.depositor
    ));
    Ok(())
}

pub async fn show(client: &EscrowClient, id: BountyId) -> Result<()> {
    let bounty = client.get_bounty(id).await?;
    print_header(&format!("Bounty #{}", bounty.id));
    print_bounty(&bounty);

    let history = client.bounty_history(id).await?;
    println!();
    println!("{}", style_bold("History"));
    for record in &history.events {
        println!(
            "  {:>5}  {}  {}",
            style_dim(&format!("#{}", record.seq)),
            format_time(record.timestamp),
            record.event.kind()
        );
    }
    Ok(())
}

pub async fn list(
    client: &EscrowClient,
    status: Option<BountyStatus>,
    limit: usize,
    offset: usize,
) -> Result<()> {
    print_header("Bounties");

    let bounties = client.list_bounties(status, limit, offset).await?;
    if bounties.is_empty() {
        print_info("No bounties found.");
        return Ok(());
    }

    println!();
    println!(
        "{:>6}  {:<10}  {:>24}  {:<13}  Reference",
        "ID", "Status", "Amount", "Depositor"
    );
    println!("{}", "─".repeat(80));

    for bounty in &bounties {
        println!(
            "{:>6}  {:<19}  {:>24}  {:<13}  {}",
            format!("#{}", bounty.id),
            style_status(bounty.status),
            format_amount(bounty.amount),
            bounty.depositor.short(),
            bounty.issue_reference
        );
    }

    println!();
    println!("Shown: {}", bounties.len());
    Ok(())
}

fn print_bounty(bounty: &Bounty) {
    println!("Reference:   {}", style_cyan(&bounty.issue_reference));
    println!("Status:      {}", style_status(bounty.status));
    println!("Amount:      {}", style_bold(&format_amount(bounty.amount)));
    println!("Depositor:   {}", bounty.depositor);
    println!("Created:     {}", format_time(bounty.created_at));
    if let Some(claimant) = &bounty.claimant {
        println!("Claimant:    {}", claimant);
    }
    if let (Some(claimed_at), Some(expires)) = (bounty.claimed_at, bounty.claim_expires_at()) {
        println!("Claimed:     {}", format_time(claimed_at));
        if bounty.status == BountyStatus::Claimed {
            println!("Expires:     {}", style_yellow(&format_time(expires)));
        }
    }
}

fn format_time(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}
