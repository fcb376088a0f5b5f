//! kraken - Mailbox harvester for reservation check-ins
//!
//! This crate polls a dedicated IMAP mailbox, finds the check-in links the
//! booking service sends, issues the check-in requests and empties the
//! mailbox again.

pub mod config;
pub mod domain;
pub mod providers;
pub mod services;

pub use config::Settings;
pub use services::{CycleSummary, PollService, Scheduler};
