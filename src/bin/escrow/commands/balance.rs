//! Balance and withdrawal commands

use crate::client::EscrowClient;
use crate::style::*;
use anyhow::Result;
use bounty_escrow::Identity;

pub async fn withdraw(client: &EscrowClient, caller: Identity) -> Result<()> {
    let resp = client.withdraw(caller).await?;
    print_success(&format!(
        "Withdrew {} to {}",
        style_green(&format_amount(resp.amount)),
        resp.identity
    ));
    Ok(())
}

pub async fn balance(client: &EscrowClient, identity: Identity) -> Result<()> {
    let resp = client.balance(identity).await?;
    print_header("Pending Balance");
    println!("Identity: {}", resp.identity);
    if resp.amount == 0 {
        println!("Balance:  {}", style_dim("0"));
    } else {
        println!("Balance:  {}", style_green(&format_amount(resp.amount)));
        println!();
        println!("To withdraw, run:");
        println!("  escrow --identity {} withdraw", resp.identity);
    }
    Ok(())
}

pub async fn pool(client: &EscrowClient) -> Result<()> {
    let resp = client.pool().await?;
    print_header("Escrow Pool");
    println!("Pool balance: {}", style_bold(&format_amount(resp.pool_balance)));
    println!("  Locked:     {}", format_amount(resp.totals.locked));
    println!("  Pending:    {}", format_amount(resp.totals.pending));
    println!("Deposited:    {}", style_dim(&format_amount(resp.totals.deposited)));
    println!("Withdrawn:    {}", style_dim(&format_amount(resp.totals.withdrawn)));
    println!();
    if resp.conserved {
        print_success("Pool balance matches locked + pending");
    } else {
        print_warning("Pool balance does not match locked + pending");
    }
    Ok(())
}
