//! Poll cycle orchestration.
//!
//! The [`PollService`] runs one complete harvesting pass over the mailbox:
//! connect, select, fetch the newest messages, extract check-in links,
//! dispatch them, purge the mailbox and disconnect.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{ContentDecoder, LinkExtractor};
use crate::domain::{
    CheckInLink, DispatchRecord, FetchFields, MailboxWindow, ScanStrategy, DEFAULT_WINDOW_SIZE,
};
use crate::providers::checkin::CheckInDispatcher;
use crate::providers::mailbox::{MailboxConnector, MailboxSession, SessionError};

/// Stages of a poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Idle,
    Connecting,
    Authenticated,
    Listing,
    Fetching,
    Extracting,
    Dispatching,
    Purging,
    Closed,
}

impl CyclePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Authenticated => "authenticated",
            Self::Listing => "listing",
            Self::Fetching => "fetching",
            Self::Extracting => "extracting",
            Self::Dispatching => "dispatching",
            Self::Purging => "purging",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings for a single cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSettings {
    /// Mailbox to select.
    pub mailbox: String,
    /// Maximum number of newest messages inspected.
    pub window_size: u32,
    /// How messages are turned into text.
    pub strategy: ScanStrategy,
    /// Fields requested on top of those the strategy needs.
    pub extra_fields: Option<FetchFields>,
}

impl CycleSettings {
    /// Fields requested for every message in the window.
    pub fn fetch_fields(&self) -> FetchFields {
        let required = self.strategy.fetch_fields();
        self.extra_fields.map_or(required, |e| required.union(e))
    }
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            mailbox: "INBOX".to_string(),
            window_size: DEFAULT_WINDOW_SIZE,
            strategy: ScanStrategy::default(),
            extra_fields: None,
        }
    }
}

/// Result of one poll cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    /// When the cycle started.
    pub started_at: DateTime<Utc>,
    /// Duration of the cycle.
    pub duration_ms: u64,
    /// Phase in which a fatal error stopped the cycle.
    pub aborted_in: Option<CyclePhase>,
    /// The fatal error, if any.
    pub error: Option<String>,
    /// Messages delivered by the fetch.
    pub messages_scanned: usize,
    /// Messages skipped because they could not be decoded.
    pub decode_failures: usize,
    /// Every dispatched link with its outcome, in sequence-number order.
    pub links: Vec<DispatchRecord>,
    /// Messages removed by the purge, if it ran.
    pub purged: Option<u32>,
}

impl CycleSummary {
    fn started(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            duration_ms: 0,
            aborted_in: None,
            error: None,
            messages_scanned: 0,
            decode_failures: 0,
            links: Vec::new(),
            purged: None,
        }
    }

    /// Returns true if the cycle ran to completion.
    pub fn is_success(&self) -> bool {
        self.aborted_in.is_none()
    }

    /// Phase the cycle ended in.
    pub fn final_phase(&self) -> CyclePhase {
        self.aborted_in.unwrap_or(CyclePhase::Closed)
    }

    pub fn links_found(&self) -> usize {
        self.links.len()
    }

    /// Number of links whose check-in request failed.
    pub fn dispatch_failures(&self) -> usize {
        self.links.iter().filter(|r| !r.outcome.is_success()).count()
    }
}

/// A fatal error together with the phase it happened in.
struct Aborted {
    phase: CyclePhase,
    error: SessionError,
}

impl Aborted {
    fn at(phase: CyclePhase) -> impl FnOnce(SessionError) -> Self {
        move |error| Self { phase, error }
    }
}

/// Runs poll cycles against one mailbox.
///
/// # Example
///
/// ```ignore
/// let service = PollService::new(connector, dispatcher, CycleSettings::default());
/// let summary = service.run_cycle().await;
/// println!("{} links, purged {:?}", summary.links_found(), summary.purged);
/// ```
pub struct PollService {
    connector: Arc<dyn MailboxConnector>,
    dispatcher: Arc<dyn CheckInDispatcher>,
    decoder: ContentDecoder,
    extractor: LinkExtractor,
    settings: CycleSettings,
}

impl PollService {
    /// Creates a service that extracts links for the default booking host.
    pub fn new(
        connector: Arc<dyn MailboxConnector>,
        dispatcher: Arc<dyn CheckInDispatcher>,
        settings: CycleSettings,
    ) -> Self {
        Self {
            connector,
            dispatcher,
            decoder: ContentDecoder::new(settings.strategy),
            extractor: LinkExtractor::default(),
            settings,
        }
    }

    /// Overrides the link extractor.
    pub fn with_extractor(mut self, extractor: LinkExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn settings(&self) -> &CycleSettings {
        &self.settings
    }

    /// Runs one full cycle.
    ///
    /// Never fails: fatal errors abort the cycle and are recorded in the
    /// returned summary. A session that was opened is always closed exactly
    /// once before this returns.
    pub async fn run_cycle(&self) -> CycleSummary {
        let start = Instant::now();
        let mut summary = CycleSummary::started(Utc::now());

        tracing::debug!(
            phase = %CyclePhase::Connecting,
            server = %self.connector.server_address(),
            "Opening mailbox session"
        );
        let result = match self.connector.open().await {
            Ok(mut session) => {
                tracing::info!(
                    phase = %CyclePhase::Authenticated,
                    server = %self.connector.server_address(),
                    "Connected"
                );
                let result = self.run_session(session.as_mut(), &mut summary).await;
                session.close().await;
                tracing::debug!(phase = %CyclePhase::Closed, "Session closed");
                result
            }
            Err(e) => Err(Aborted::at(CyclePhase::Connecting)(e)),
        };

        if let Err(Aborted { phase, error }) = result {
            tracing::error!(phase = %phase, error = %error, "Poll cycle aborted");
            summary.aborted_in = Some(phase);
            summary.error = Some(error.to_string());
        }
        summary.duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            scanned = summary.messages_scanned,
            links = summary.links_found(),
            failed = summary.dispatch_failures(),
            purged = ?summary.purged,
            duration_ms = summary.duration_ms,
            "Poll cycle finished"
        );
        summary
    }

    async fn run_session(
        &self,
        session: &mut dyn MailboxSession,
        summary: &mut CycleSummary,
    ) -> Result<(), Aborted> {
        tracing::debug!(phase = %CyclePhase::Listing, "Listing mailboxes");
        let names = session
            .list()
            .await
            .map_err(Aborted::at(CyclePhase::Listing))?;
        for name in &names {
            tracing::debug!(mailbox = %name, "Found mailbox");
        }

        let info = session
            .select(&self.settings.mailbox)
            .await
            .map_err(Aborted::at(CyclePhase::Listing))?;
        tracing::info!(mailbox = %info.name, exists = info.exists, "Selected mailbox");

        let links = match MailboxWindow::for_total(info.exists, self.settings.window_size) {
            Some(window) => self.collect_links(session, window, summary).await?,
            None => {
                tracing::info!(mailbox = %info.name, "Mailbox is empty");
                Vec::new()
            }
        };
        tracing::info!(count = links.len(), "Check-in links found");

        tracing::debug!(phase = %CyclePhase::Dispatching, "Dispatching check-ins");
        for link in links {
            let outcome = self.dispatcher.dispatch(&link).await;
            summary.links.push(DispatchRecord { link, outcome });
        }

        tracing::debug!(phase = %CyclePhase::Purging, "Purging mailbox");
        let purged = session
            .purge_all()
            .await
            .map_err(Aborted::at(CyclePhase::Purging))?;
        if purged == 0 {
            tracing::info!("No messages to purge");
        } else {
            tracing::info!(count = purged, "Purged messages");
        }
        summary.purged = Some(purged);

        Ok(())
    }

    /// Fetches the window and extracts at most one link per message.
    async fn collect_links(
        &self,
        session: &mut dyn MailboxSession,
        window: MailboxWindow,
        summary: &mut CycleSummary,
    ) -> Result<Vec<CheckInLink>, Aborted> {
        let fields = self.settings.fetch_fields();
        tracing::debug!(
            phase = %CyclePhase::Fetching,
            window = %window,
            strategy = %self.decoder.strategy(),
            fields = %fields,
            "Fetching messages"
        );
        let mut stream = session
            .stream(window, fields)
            .await
            .map_err(Aborted::at(CyclePhase::Fetching))?;

        tracing::debug!(phase = %CyclePhase::Extracting, "Scanning messages");
        let mut links = Vec::new();
        while let Some(message) = stream.next().await {
            summary.messages_scanned += 1;
            match self.decoder.decode(&message) {
                Ok(text) => {
                    if let Some(link) = self.extractor.extract(&text) {
                        tracing::debug!(seq = message.seq, link = %link, "Found check-in link");
                        links.push((message.seq, link));
                    }
                }
                Err(e) => {
                    summary.decode_failures += 1;
                    tracing::warn!(seq = message.seq, error = %e, "Skipping undecodable message");
                }
            }
        }

        stream
            .finish()
            .await
            .map_err(Aborted::at(CyclePhase::Fetching))?;

        // servers may answer FETCH out of order
        links.sort_by_key(|(seq, _)| *seq);
        Ok(links.into_iter().map(|(_, link)| link).collect())
    }
}
