//! Protocol administration and journal commands

use crate::client::EscrowClient;
use crate::style::*;
use anyhow::Result;
use bounty_escrow::notify::format_message;
use bounty_escrow::server::ProtocolResponse;
use bounty_escrow::Identity;

pub async fn set_fee(client: &EscrowClient, caller: Identity, fee_bps: u16) -> Result<()> {
    let protocol = client.set_fee(caller, fee_bps).await?;
    print_success(&format!("Protocol fee set to {}", format_bps(protocol.fee_bps)));
    Ok(())
}

pub async fn transfer_owner(
    client: &EscrowClient,
    caller: Identity,
    new_owner: Identity,
) -> Result<()> {
    let protocol = client.transfer_owner(caller, new_owner).await?;
    print_success(&format!("Ownership transferred to {}", protocol.owner));
    Ok(())
}

pub async fn config(client: &EscrowClient) -> Result<()> {
    let protocol = client.protocol().await?;
    print_header("Protocol Configuration");
    print_protocol(&protocol);
    Ok(())
}

pub async fn events(client: &EscrowClient, after: u64, limit: usize) -> Result<()> {
    print_header("Event Journal");

    let resp = client.events(after, limit).await?;
    if resp.events.is_empty() {
        print_info("No events.");
        return Ok(());
    }

    println!();
    for record in &resp.events {
        println!(
            "{:>6}  {:<22}  {}",
            style_dim(&format!("#{}", record.seq)),
            style_cyan(record.event.kind()),
            format_message(&record.event)
        );
    }

    if let Some(last) = resp.events.last() {
        println!();
        println!(
            "{}",
            style_dim(&format!("Head hash: {}", hex::encode(last.hash)))
        );
        if resp.events.len() == limit {
            println!("More: escrow events --after {}", last.seq);
        }
    }
    Ok(())
}

fn print_protocol(protocol: &ProtocolResponse) {
    println!("Owner:              {}", style_cyan(&protocol.owner.to_string()));
    println!("Fee:                {}", style_bold(&format_bps(protocol.fee_bps)));
    println!("Max fee:            {}", format_bps(protocol.max_fee_bps));
    println!(
        "Claim window:       {} days",
        protocol.max_claim_duration_secs / 86_400
    );
}

fn format_bps(bps: u16) -> String {
    format!("{} bps ({:.2}%)", bps, bps as f64 / 100.0)
}
