//! Mailbox backends.
//!
//! This module contains the [`MailboxConnector`] and [`MailboxSession`] traits
//! and their implementations:
//!
//! - [`ImapConnector`] - IMAP4rev1 over TLS
//! - [`MemoryMailbox`] - in-memory store for tests and dry runs
//!
//! # Example
//!
//! ```ignore
//! use kraken::domain::{FetchFields, MailboxWindow};
//! use kraken::providers::mailbox::MailboxConnector;
//!
//! async fn newest_subjects(connector: &dyn MailboxConnector) -> Vec<String> {
//!     let mut session = connector.open().await.expect("open failed");
//!     let info = session.select("INBOX").await.expect("select failed");
//!     let mut subjects = Vec::new();
//!     if let Some(window) = MailboxWindow::for_total(info.exists, 10) {
//!         let mut stream = session.stream(window, FetchFields::Envelope).await.expect("fetch failed");
//!         while let Some(message) = stream.next().await {
//!             subjects.extend(message.subject);
//!         }
//!         stream.finish().await.expect("fetch broke");
//!     }
//!     session.close().await;
//!     subjects
//! }
//! ```

mod fetch;
mod imap;
pub mod memory;
mod tls;
mod traits;

pub use fetch::FetchStream;
pub use imap::{ImapConfig, ImapConnector, ImapCredentials, ImapMailboxSession, ImapTransport};
pub use memory::{FailurePlan, MemoryMailbox, StoredMessage};
pub use traits::{MailboxConnector, MailboxSession, Result, SessionError, SessionState};
