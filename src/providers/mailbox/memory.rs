//! In-memory mailbox backend.
//!
//! Behaves like a single-folder IMAP account and can be told to fail at any
//! step of a cycle. Clones share the same store, so a test can keep a handle
//! and inspect what a cycle did to it afterwards.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{FetchStream, MailboxConnector, MailboxSession, Result, SessionError, SessionState};
use crate::domain::{FetchFields, MailboxInfo, MailboxWindow, RawMessage, SeqNum};

/// A message held by the in-memory store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredMessage {
    pub subject: Option<String>,
    pub body: Option<Vec<u8>>,
}

impl StoredMessage {
    pub fn new(subject: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            subject: Some(subject.into()),
            body: Some(body.into()),
        }
    }
}

/// Steps at which the store should fail.
#[derive(Debug, Clone, Default)]
pub struct FailurePlan {
    /// Refuse the connection.
    pub connect: bool,
    /// Reject the credentials.
    pub auth: bool,
    /// Fail the SELECT.
    pub select: bool,
    /// Break the fetch after this many messages were delivered.
    pub fetch_after: Option<usize>,
    /// Fail the purge.
    pub store: bool,
    /// Empty the folder after fetching, as if another client expunged it.
    pub empty_before_purge: bool,
}

#[derive(Debug)]
struct MemoryState {
    mailbox: String,
    messages: Vec<StoredMessage>,
    plan: FailurePlan,
    fetched: Vec<SeqNum>,
    opens: usize,
    closes: usize,
}

/// Single-folder mail store kept in memory.
#[derive(Debug, Clone)]
pub struct MemoryMailbox {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryMailbox {
    /// Creates an empty store whose only folder is `mailbox`.
    pub fn new(mailbox: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                mailbox: mailbox.into(),
                messages: Vec::new(),
                plan: FailurePlan::default(),
                fetched: Vec::new(),
                opens: 0,
                closes: 0,
            })),
        }
    }

    /// Seeds the store. Clones see the new messages too.
    pub fn with_messages(self, messages: impl IntoIterator<Item = StoredMessage>) -> Self {
        lock(&self.state).messages.extend(messages);
        self
    }

    pub fn with_plan(self, plan: FailurePlan) -> Self {
        lock(&self.state).plan = plan;
        self
    }

    /// Appends a message and returns its sequence number.
    pub async fn deliver(&self, message: StoredMessage) -> SeqNum {
        let mut state = lock(&self.state);
        state.messages.push(message);
        seq_of(state.messages.len())
    }

    /// Sequence numbers handed out by fetches so far, in order.
    pub async fn fetched(&self) -> Vec<SeqNum> {
        lock(&self.state).fetched.clone()
    }

    /// Number of messages currently stored.
    pub async fn len(&self) -> usize {
        lock(&self.state).messages.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of sessions opened.
    pub async fn opens(&self) -> usize {
        lock(&self.state).opens
    }

    /// Number of sessions closed.
    pub async fn closes(&self) -> usize {
        lock(&self.state).closes
    }
}

/// Guards are never held across an await.
fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn seq_of(index: usize) -> SeqNum {
    SeqNum::try_from(index).unwrap_or(SeqNum::MAX)
}

#[async_trait]
impl MailboxConnector for MemoryMailbox {
    fn server_address(&self) -> String {
        "memory".to_string()
    }

    async fn open(&self) -> Result<Box<dyn MailboxSession>> {
        let mut state = lock(&self.state);
        if state.plan.connect {
            return Err(SessionError::Connect("connection refused".to_string()));
        }
        if state.plan.auth {
            return Err(SessionError::Auth("invalid credentials".to_string()));
        }
        state.opens += 1;

        Ok(Box::new(MemorySession {
            store: Arc::clone(&self.state),
            selected: false,
            state: SessionState::Authenticated,
        }))
    }
}

/// Session against a [`MemoryMailbox`].
struct MemorySession {
    store: Arc<Mutex<MemoryState>>,
    selected: bool,
    state: SessionState,
}

impl MemorySession {
    fn ensure_open(&self) -> Result<()> {
        if self.state == SessionState::Authenticated {
            Ok(())
        } else {
            Err(SessionError::Mailbox("session is not open".to_string()))
        }
    }

    fn ensure_selected(&self) -> Result<()> {
        self.ensure_open()?;
        if self.selected {
            Ok(())
        } else {
            Err(SessionError::Mailbox("no mailbox selected".to_string()))
        }
    }
}

#[async_trait]
impl MailboxSession for MemorySession {
    fn state(&self) -> SessionState {
        self.state
    }

    async fn list(&mut self) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(vec![lock(&self.store).mailbox.clone()])
    }

    async fn select(&mut self, mailbox: &str) -> Result<MailboxInfo> {
        self.ensure_open()?;
        let state = lock(&self.store);
        if state.plan.select || state.mailbox != mailbox {
            return Err(SessionError::Mailbox(format!(
                "SELECT {} failed: no such mailbox",
                mailbox
            )));
        }
        self.selected = true;

        Ok(MailboxInfo {
            name: mailbox.to_string(),
            exists: seq_of(state.messages.len()),
            flags: vec!["\\Seen".to_string(), "\\Deleted".to_string()],
        })
    }

    async fn stream(&mut self, window: MailboxWindow, fields: FetchFields) -> Result<FetchStream> {
        self.ensure_selected()?;
        let mut state = lock(&self.store);

        let mut batch: Vec<RawMessage> = state
            .messages
            .iter()
            .enumerate()
            .map(|(index, stored)| (seq_of(index + 1), stored))
            .filter(|(seq, _)| window.contains(*seq))
            .map(|(seq, stored)| RawMessage {
                seq,
                subject: stored
                    .subject
                    .clone()
                    .filter(|_| fields.includes_envelope()),
                body: stored.body.clone().filter(|_| fields.includes_body()),
            })
            .collect();

        let failure = match state.plan.fetch_after {
            Some(limit) if limit < batch.len() => {
                batch.truncate(limit);
                Some(SessionError::Fetch("connection reset by peer".to_string()))
            }
            _ => None,
        };
        state.fetched.extend(batch.iter().map(|m| m.seq));
        if state.plan.empty_before_purge {
            state.messages.clear();
        }

        Ok(FetchStream::spawn(window.len(), move |tx| async move {
            for message in batch {
                if tx.send(message).await.is_err() {
                    break;
                }
            }
            match failure {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }))
    }

    async fn purge_all(&mut self) -> Result<u32> {
        self.ensure_selected()?;
        let mut state = lock(&self.store);
        if state.plan.store {
            return Err(SessionError::Store("STORE failed: read-only mailbox".to_string()));
        }
        let removed = seq_of(state.messages.len());
        state.messages.clear();
        Ok(removed)
    }

    async fn close(&mut self) {
        if self.state != SessionState::Authenticated {
            return;
        }
        self.state = SessionState::Closed;
        lock(&self.store).closes += 1;
    }
}
