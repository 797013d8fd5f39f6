//! Terminal styling utilities

use bounty_escrow::{Amount, BountyStatus};

/// Display precision for amounts; atomic units are 10^-18 of a whole unit.
const DISPLAY_DECIMALS: u32 = 18;

pub fn style_cyan(s: &str) -> String {
    format!("\x1b[36m{}\x1b[0m", s)
}

pub fn style_green(s: &str) -> String {
    format!("\x1b[32m{}\x1b[0m", s)
}

pub fn style_red(s: &str) -> String {
    format!("\x1b[31m{}\x1b[0m", s)
}

pub fn style_yellow(s: &str) -> String {
    format!("\x1b[33m{}\x1b[0m", s)
}

pub fn style_dim(s: &str) -> String {
    format!("\x1b[2m{}\x1b[0m", s)
}

pub fn style_bold(s: &str) -> String {
    format!("\x1b[1m{}\x1b[0m", s)
}

pub fn print_success(msg: &str) {
    println!("{} {}", style_green("✓"), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", style_red("✗"), msg);
}

pub fn print_warning(msg: &str) {
    println!("{} {}", style_yellow("⚠"), msg);
}

pub fn print_info(msg: &str) {
    println!("{} {}", style_cyan("ℹ"), msg);
}

pub fn print_header(title: &str) {
    println!();
    println!("{}", style_bold(title));
    println!("{}", "─".repeat(title.chars().count()));
}

pub fn style_status(status: BountyStatus) -> String {
    match status {
        BountyStatus::Open => style_green(status.as_str()),
        BountyStatus::Claimed => style_yellow(status.as_str()),
        BountyStatus::Completed => style_cyan(status.as_str()),
        BountyStatus::Refunded => style_dim(status.as_str()),
    }
}

/// Render atomic units as a decimal with trailing zeros removed,
/// e.g. `975000000000000000` -> `0.975`.
pub fn format_amount(amount: Amount) -> String {
    let unit = 10u128.pow(DISPLAY_DECIMALS);
    let whole = amount / unit;
    let frac = amount % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = DISPLAY_DECIMALS as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}
