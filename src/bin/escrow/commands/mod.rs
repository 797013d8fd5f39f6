//! CLI commands

pub mod admin;
pub mod balance;
pub mod bounty;
