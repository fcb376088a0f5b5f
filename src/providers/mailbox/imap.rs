//! IMAP mailbox backend.
//!
//! This module provides a [`MailboxConnector`] implementation over IMAP4rev1
//! (RFC 3501) via `async-imap`, on a direct TLS connection.
//!
//! # Protocol Details
//!
//! - Bodies are fetched with `BODY.PEEK[]` so `\Seen` flags are untouched
//! - Purging is `SEARCH ALL`, `STORE +FLAGS (\Deleted)`, then `EXPUNGE`
//! - Fetch responses are forwarded to the caller while the command runs

use async_imap::types::{Fetch, Flag};
use async_trait::async_trait;
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::ClientConfig;
use tokio_rustls::TlsConnector;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

use super::tls::insecure_client_config;
use super::{
    FetchStream, MailboxConnector, MailboxSession, Result, SessionError, SessionState,
};
use crate::domain::{FetchFields, MailboxInfo, MailboxWindow, RawMessage};

/// IMAP server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImapConfig {
    /// IMAP server hostname.
    pub host: String,
    /// IMAP server port (993 for direct TLS).
    pub port: u16,
}

impl ImapConfig {
    /// Creates a configuration for a direct TLS connection on port 993.
    pub fn tls(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 993,
        }
    }

    /// `host:port` form used for the TCP connect.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Login credentials.
#[derive(Clone)]
pub struct ImapCredentials {
    /// Username (usually the mailbox address).
    pub username: String,
    pub password: String,
}

impl fmt::Debug for ImapCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImapCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// TLS stream behind the tokio-util compat layer.
type TlsTransport = Compat<TlsStream<TcpStream>>;

/// Byte streams an IMAP session can run over.
pub trait ImapTransport:
    futures::AsyncRead + futures::AsyncWrite + Unpin + fmt::Debug + Send + 'static
{
}

impl<T> ImapTransport for T where
    T: futures::AsyncRead + futures::AsyncWrite + Unpin + fmt::Debug + Send + 'static
{
}

/// Opens IMAP sessions over TLS.
///
/// # Example
///
/// ```ignore
/// use kraken::providers::mailbox::{ImapConfig, ImapConnector, ImapCredentials, MailboxConnector};
///
/// let connector = ImapConnector::new(ImapConfig::tls("front"), credentials)?;
/// let mut session = connector.open().await?;
/// let info = session.select("INBOX").await?;
/// ```
pub struct ImapConnector {
    config: ImapConfig,
    credentials: ImapCredentials,
    tls: Arc<ClientConfig>,
}

impl ImapConnector {
    /// Creates a connector. No network traffic happens until [`open`](MailboxConnector::open).
    pub fn new(config: ImapConfig, credentials: ImapCredentials) -> Result<Self> {
        let tls = insecure_client_config()
            .map_err(|e| SessionError::Connect(format!("TLS setup failed: {}", e)))?;
        Ok(Self {
            config,
            credentials,
            tls,
        })
    }

    pub fn config(&self) -> &ImapConfig {
        &self.config
    }

    /// Establishes TLS connection to the IMAP server with futures compat wrapper.
    async fn connect_tls(&self) -> Result<TlsTransport> {
        let tcp_stream = TcpStream::connect(self.config.address())
            .await
            .map_err(|e| SessionError::Connect(format!("TCP connect failed: {}", e)))?;

        let connector = TlsConnector::from(Arc::clone(&self.tls));
        let server_name = ServerName::try_from(self.config.host.clone())
            .map_err(|e| SessionError::Connect(format!("invalid server name: {}", e)))?;

        let tls_stream = connector
            .connect(server_name, tcp_stream)
            .await
            .map_err(|e| SessionError::Connect(format!("TLS handshake failed: {}", e)))?;

        Ok(tls_stream.compat())
    }
}

#[async_trait]
impl MailboxConnector for ImapConnector {
    fn server_address(&self) -> String {
        self.config.address()
    }

    async fn open(&self) -> Result<Box<dyn MailboxSession>> {
        let tls_stream = self.connect_tls().await?;
        tracing::debug!(server = %self.config.address(), "Connected to IMAP server");

        let client = async_imap::Client::new(tls_stream);
        let session = client
            .login(&self.credentials.username, &self.credentials.password)
            .await
            .map_err(|e| SessionError::Auth(format!("IMAP login failed: {}", e.0)))?;

        tracing::info!(user = %self.credentials.username, "Logged in");
        Ok(Box::new(ImapMailboxSession::new(session)))
    }
}

/// An authenticated IMAP session.
pub struct ImapMailboxSession<T: ImapTransport = TlsTransport> {
    session: Option<Arc<Mutex<async_imap::Session<T>>>>,
    state: SessionState,
}

impl<T: ImapTransport> ImapMailboxSession<T> {
    /// Wraps a logged-in session.
    pub fn new(session: async_imap::Session<T>) -> Self {
        Self {
            session: Some(Arc::new(Mutex::new(session))),
            state: SessionState::Authenticated,
        }
    }

    /// Gets the IMAP session, failing once logged out.
    fn get_session(&self) -> Result<Arc<Mutex<async_imap::Session<T>>>> {
        match (&self.session, self.state) {
            (Some(session), SessionState::Authenticated) => Ok(Arc::clone(session)),
            _ => Err(SessionError::Mailbox("session is not open".to_string())),
        }
    }
}

/// Consumes a stream to completion, counting its items.
async fn drain_stream<I, E>(
    stream: impl futures::Stream<Item = std::result::Result<I, E>>,
) -> std::result::Result<usize, E> {
    futures::pin_mut!(stream);
    let mut count = 0;
    while let Some(result) = stream.next().await {
        result?;
        count += 1;
    }
    Ok(count)
}

fn flag_name(flag: &Flag<'_>) -> String {
    match flag {
        Flag::Seen => "\\Seen".to_string(),
        Flag::Answered => "\\Answered".to_string(),
        Flag::Flagged => "\\Flagged".to_string(),
        Flag::Deleted => "\\Deleted".to_string(),
        Flag::Draft => "\\Draft".to_string(),
        Flag::Recent => "\\Recent".to_string(),
        Flag::MayCreate => "\\*".to_string(),
        Flag::Custom(name) => name.to_string(),
    }
}

/// Converts one FETCH response into a [`RawMessage`].
fn to_raw_message(fetch: &Fetch, fields: FetchFields) -> RawMessage {
    let mut message = RawMessage::new(fetch.message);
    if fields.includes_envelope() {
        message.subject = fetch
            .envelope()
            .and_then(|envelope| envelope.subject.as_ref())
            .map(|raw| decode_subject(raw));
    }
    if fields.includes_body() {
        message.body = fetch.body().map(|b| b.to_vec());
    }
    message
}

/// Decodes MIME encoded-words in a raw envelope subject.
fn decode_subject(raw: &[u8]) -> String {
    let mut line = b"Subject: ".to_vec();
    line.extend_from_slice(raw);
    match mailparse::parse_header(&line) {
        Ok((header, _)) => header.get_value(),
        Err(_) => String::from_utf8_lossy(raw).into_owned(),
    }
}

#[async_trait]
impl<T: ImapTransport> MailboxSession for ImapMailboxSession<T> {
    fn state(&self) -> SessionState {
        self.state
    }

    async fn list(&mut self) -> Result<Vec<String>> {
        let session_arc = self.get_session()?;
        let mut session = session_arc.lock().await;

        let names = session
            .list(Some(""), Some("*"))
            .await
            .map_err(|e| SessionError::Mailbox(format!("LIST failed: {}", e)))?;
        let names: Vec<_> = names.collect().await;

        names
            .into_iter()
            .map(|name| {
                name.map(|n| n.name().to_string())
                    .map_err(|e| SessionError::Mailbox(format!("LIST stream: {}", e)))
            })
            .collect()
    }

    async fn select(&mut self, mailbox: &str) -> Result<MailboxInfo> {
        let session_arc = self.get_session()?;
        let mut session = session_arc.lock().await;

        let selected = session
            .select(mailbox)
            .await
            .map_err(|e| SessionError::Mailbox(format!("SELECT {} failed: {}", mailbox, e)))?;

        Ok(MailboxInfo {
            name: mailbox.to_string(),
            exists: selected.exists,
            flags: selected.flags.iter().map(flag_name).collect(),
        })
    }

    async fn stream(&mut self, window: MailboxWindow, fields: FetchFields) -> Result<FetchStream> {
        let session_arc = self.get_session()?;
        let sequence_set = window.to_sequence_set();

        Ok(FetchStream::spawn(window.len(), move |tx| async move {
            let mut session = session_arc.lock().await;
            let fetches = session
                .fetch(&sequence_set, fields.imap_query())
                .await
                .map_err(|e| SessionError::Fetch(format!("FETCH failed: {}", e)))?;
            futures::pin_mut!(fetches);

            while let Some(item) = fetches.next().await {
                let fetch = item.map_err(|e| SessionError::Fetch(format!("FETCH stream: {}", e)))?;
                if tx.send(to_raw_message(&fetch, fields)).await.is_err() {
                    tracing::debug!("Fetch consumer went away");
                    break;
                }
            }
            Ok(())
        }))
    }

    async fn purge_all(&mut self) -> Result<u32> {
        let session_arc = self.get_session()?;
        let mut session = session_arc.lock().await;

        let found = session
            .search("ALL")
            .await
            .map_err(|e| SessionError::Store(format!("SEARCH failed: {}", e)))?;
        if found.is_empty() {
            return Ok(0);
        }

        let mut ids: Vec<u32> = found.into_iter().collect();
        ids.sort_unstable();
        let sequence_set = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let store_stream = session
            .store(&sequence_set, "+FLAGS (\\Deleted)")
            .await
            .map_err(|e| SessionError::Store(format!("STORE failed: {}", e)))?;
        drain_stream(store_stream)
            .await
            .map_err(|e| SessionError::Store(format!("STORE stream: {}", e)))?;

        let expunge_stream = session
            .expunge()
            .await
            .map_err(|e| SessionError::Store(format!("EXPUNGE failed: {}", e)))?;
        let expunged = drain_stream(expunge_stream)
            .await
            .map_err(|e| SessionError::Store(format!("EXPUNGE stream: {}", e)))?;

        Ok(u32::try_from(expunged).unwrap_or(u32::MAX))
    }

    async fn close(&mut self) {
        if self.state != SessionState::Authenticated {
            return;
        }
        self.state = SessionState::Closed;

        if let Some(session_arc) = self.session.take() {
            let mut session = session_arc.lock().await;
            if let Err(e) = session.logout().await {
                tracing::warn!(error = %e, "IMAP logout failed");
            }
        }
    }
}
