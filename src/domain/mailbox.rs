//! Mailbox metadata and the fetch window.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::SeqNum;

/// Number of most recent messages inspected per cycle.
pub const DEFAULT_WINDOW_SIZE: u32 = 30;

/// Status of a selected mailbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxInfo {
    /// Mailbox name as selected.
    pub name: String,
    /// Total number of messages currently in the mailbox.
    pub exists: u32,
    /// Flags the mailbox supports.
    pub flags: Vec<String>,
}

/// Contiguous range of sequence numbers covering the most recent messages.
///
/// `lower` is clamped to 1, so `lower <= upper` holds for every window.
/// An empty mailbox has no window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxWindow {
    lower: SeqNum,
    upper: SeqNum,
}

impl MailboxWindow {
    /// Computes the window for a mailbox holding `total` messages.
    ///
    /// Returns `None` when the mailbox is empty.
    pub fn for_total(total: u32, max_count: u32) -> Option<Self> {
        if total == 0 {
            return None;
        }
        Some(Self {
            lower: total.saturating_sub(max_count).max(1),
            upper: total,
        })
    }

    /// First sequence number in the window.
    pub fn lower(&self) -> SeqNum {
        self.lower
    }

    /// Last sequence number in the window.
    pub fn upper(&self) -> SeqNum {
        self.upper
    }

    /// Number of messages covered by the window.
    pub fn len(&self) -> usize {
        (self.upper - self.lower) as usize + 1
    }

    /// A window always holds at least one message.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns whether `seq` falls inside the window.
    pub fn contains(&self, seq: SeqNum) -> bool {
        (self.lower..=self.upper).contains(&seq)
    }

    /// IMAP sequence-set form, e.g. `10:40`.
    pub fn to_sequence_set(&self) -> String {
        format!("{}:{}", self.lower, self.upper)
    }
}

impl fmt::Display for MailboxWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.lower, self.upper)
    }
}
