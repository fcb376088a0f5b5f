//! Domain types for the check-in harvester.
//!
//! This module contains the value types that flow through a poll cycle:
//! mailbox windows, fetched messages, scannable text, check-in links and
//! dispatch outcomes.

mod mailbox;
mod message;
mod outcome;
mod types;

pub use mailbox::{MailboxInfo, MailboxWindow, DEFAULT_WINDOW_SIZE};
pub use message::{FetchFields, RawMessage, ScanStrategy};
pub use outcome::{DispatchOutcome, DispatchRecord};
pub use types::{CheckInLink, ScannableText, SeqNum};
