//! Bounty Escrow CLI
//!
//! Command-line client for a running escrow server.

mod client;
mod commands;
mod style;

use anyhow::{anyhow, Result};
use bounty_escrow::{Amount, BountyId, BountyStatus, Identity};
use clap::{Parser, Subcommand};
use client::EscrowClient;
use style::*;

const BANNER: &str = r#"
  ███████╗███████╗ ██████╗██████╗  ██████╗ ██╗    ██╗
  ██╔════╝██╔════╝██╔════╝██╔══██╗██╔═══██╗██║    ██║
  █████╗  ███████╗██║     ██████╔╝██║   ██║██║ █╗ ██║
  ██╔══╝  ╚════██║██║     ██╔══██╗██║   ██║██║███╗██║
  ███████╗███████║╚██████╗██║  ██║╚██████╔╝╚███╔███╔╝
  ╚══════╝╚══════╝ ╚═════╝╚═╝  ╚═╝ ╚═════╝  ╚══╝╚══╝
"#;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "escrow")]
#[command(author = "CortexLM")]
#[command(version)]
#[command(about = "Bounty Escrow - lock rewards against issues and pay out delivered work", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Escrow server URL
    #[arg(
        short,
        long,
        env = "ESCROW_URL",
        default_value = "http://localhost:8080",
        global = true
    )]
    url: String,

    /// Identity acting as caller (0x-prefixed, 20 bytes)
    #[arg(short, long, env = "ESCROW_IDENTITY", global = true)]
    identity: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Lock value against an issue reference
    #[command(visible_alias = "d")]
    Deposit {
        /// Issue reference, e.g. owner/repo#42
        issue_reference: String,

        /// Value in atomic units
        value: Amount,
    },

    /// Claim an open bounty
    #[command(visible_alias = "c")]
    Claim { id: BountyId },

    /// Confirm delivery of a claimed bounty (owner only)
    Complete { id: BountyId },

    /// Refund a bounty to its depositor
    Refund { id: BountyId },

    /// Withdraw your pending balance
    #[command(visible_alias = "w")]
    Withdraw,

    /// Show one bounty and its history
    Show { id: BountyId },

    /// List bounties
    #[command(visible_alias = "ls")]
    List {
        /// Filter by status (open, claimed, completed, refunded)
        #[arg(short, long)]
        status: Option<BountyStatus>,

        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// Show a pending balance (defaults to --identity)
    #[command(visible_alias = "bal")]
    Balance { identity: Option<String> },

    /// Show pool balance and value totals
    Pool,

    /// Change the protocol fee (owner only)
    SetFee { fee_bps: u16 },

    /// Hand the owner role to another identity (owner only)
    TransferOwner { new_owner: String },

    /// Show the event journal
    Events {
        /// Only events after this sequence number
        #[arg(short, long, default_value = "0")]
        after: u64,

        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show protocol configuration
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt().with_env_filter("info").init();
    }

    let Some(command) = cli.command else {
        print_banner();
        println!("Run {} for available commands.", style_cyan("escrow --help"));
        return;
    };

    if let Err(e) = run(command, &cli.url, cli.identity.as_deref()).await {
        print_error(&format!("{}", e));
        std::process::exit(1);
    }
}

async fn run(command: Commands, url: &str, identity: Option<&str>) -> Result<()> {
    let client = EscrowClient::new(url);
    let caller = || require_identity(identity);

    match command {
        Commands::Deposit {
            issue_reference,
            value,
        } => commands::bounty::deposit(&client, caller()?, &issue_reference, value).await,
        Commands::Claim { id } => commands::bounty::claim(&client, caller()?, id).await,
        Commands::Complete { id } => commands::bounty::complete(&client, caller()?, id).await,
        Commands::Refund { id } => commands::bounty::refund(&client, caller()?, id).await,
        Commands::Show { id } => commands::bounty::show(&client, id).await,
        Commands::List {
            status,
            limit,
            offset,
        } => commands::bounty::list(&client, status, limit, offset).await,
        Commands::Withdraw => commands::balance::withdraw(&client, caller()?).await,
        Commands::Balance { identity: target } => {
            let target = match target {
                Some(target) => parse_identity(&target)?,
                None => caller()?,
            };
            commands::balance::balance(&client, target).await
        }
        Commands::Pool => commands::balance::pool(&client).await,
        Commands::SetFee { fee_bps } => commands::admin::set_fee(&client, caller()?, fee_bps).await,
        Commands::TransferOwner { new_owner } => {
            commands::admin::transfer_owner(&client, caller()?, parse_identity(&new_owner)?).await
        }
        Commands::Events { after, limit } => commands::admin::events(&client, after, limit).await,
        Commands::Config => commands::admin::config(&client).await,
    }
}

fn require_identity(identity: Option<&str>) -> Result<Identity> {
    let identity =
        identity.ok_or_else(|| anyhow!("This command needs --identity (or ESCROW_IDENTITY)"))?;
    parse_identity(identity)
}

fn parse_identity(s: &str) -> Result<Identity> {
    s.parse()
        .map_err(|_| anyhow!("Invalid identity '{}': expected 0x followed by 40 hex digits", s))
}

pub fn print_banner() {
    println!("{}", style_cyan(BANNER));
    println!(
        "  {} {}",
        style_dim("Bounty Escrow"),
        style_dim(&format!("v{}", VERSION))
    );
    println!();
}
