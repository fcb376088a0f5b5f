//! Mailbox backend trait definitions.
//!
//! This module defines the [`MailboxConnector`] and [`MailboxSession`] traits
//! which abstract over the mail store a poll cycle talks to. The production
//! backend is IMAP over TLS; tests use the in-memory backend.

use async_trait::async_trait;

use super::FetchStream;
use crate::domain::{FetchFields, MailboxInfo, MailboxWindow};

/// Result type alias for mailbox operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors that can occur while talking to the mail store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// TCP connect or TLS handshake failed.
    #[error("connection error: {0}")]
    Connect(String),

    /// Credentials were rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Listing or selecting a mailbox failed.
    #[error("mailbox error: {0}")]
    Mailbox(String),

    /// The fetch command failed or its stream broke mid-way.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Flagging or expunging messages failed.
    #[error("store failed: {0}")]
    Store(String),
}

/// Lifecycle state of a mailbox session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Logged in and usable.
    Authenticated,
    /// Logged out; every further command fails.
    Closed,
}

/// Opens authenticated sessions against a mail store.
#[async_trait]
pub trait MailboxConnector: Send + Sync {
    /// Address of the server, for logging.
    fn server_address(&self) -> String;

    /// Connects and logs in, returning an authenticated session.
    async fn open(&self) -> Result<Box<dyn MailboxSession>>;
}

/// One authenticated conversation with the mail store.
///
/// A session is owned by a single poll cycle and never shared between cycles.
#[async_trait]
pub trait MailboxSession: Send {
    fn state(&self) -> SessionState;

    /// Lists every mailbox name visible to the account.
    async fn list(&mut self) -> Result<Vec<String>>;

    /// Selects a mailbox read-write and reports its message count.
    async fn select(&mut self, mailbox: &str) -> Result<MailboxInfo>;

    /// Starts fetching `fields` for every message in `window`.
    ///
    /// Messages are delivered through the returned stream as the server sends
    /// them; the overall fetch result is only known after
    /// [`FetchStream::finish`].
    async fn stream(&mut self, window: MailboxWindow, fields: FetchFields) -> Result<FetchStream>;

    /// Flags every message in the selected mailbox deleted and expunges.
    ///
    /// Returns the number of messages removed.
    async fn purge_all(&mut self) -> Result<u32>;

    /// Logs out. Calling this on a closed session does nothing.
    async fn close(&mut self);
}
