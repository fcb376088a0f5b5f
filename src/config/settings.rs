//! Harvester settings and configuration types.
//!
//! Settings start from built-in defaults and are overridden from the process
//! environment at start-up.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::domain::{FetchFields, ScanStrategy, DEFAULT_WINDOW_SIZE};
use crate::providers::mailbox::{ImapConfig, ImapCredentials};
use crate::services::{CycleSettings, LinkExtractor, DEFAULT_CHECKIN_ORIGIN};

/// Top-level harvester settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Mail server connection.
    pub imap: ImapSettings,
    /// Mailbox login.
    pub credentials: CredentialSettings,
    /// Cycle timing and scanning.
    pub poll: PollSettings,
    /// Check-in link recognition.
    pub checkin: CheckInSettings,
}

/// Mail server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImapSettings {
    pub host: String,
    pub port: u16,
    /// Mailbox that receives the reservation emails.
    pub mailbox: String,
}

impl Default for ImapSettings {
    fn default() -> Self {
        Self {
            host: "front".to_string(),
            port: 993,
            mailbox: "INBOX".to_string(),
        }
    }
}

/// Mailbox login. The password is never serialized or printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialSettings {
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            email: "kraken@mail.g3tech.net".to_string(),
            password: "password".to_string(),
        }
    }
}

impl fmt::Debug for CredentialSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSettings")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Poll cycle configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    /// Pause between cycles in seconds.
    pub interval_seconds: u64,
    /// Number of newest messages inspected per cycle.
    pub window_size: u32,
    pub scan_strategy: ScanStrategy,
    /// Extra fields to fetch beyond what the strategy needs.
    pub fetch_fields: Option<FetchFields>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_seconds: 1200,
            window_size: DEFAULT_WINDOW_SIZE,
            scan_strategy: ScanStrategy::default(),
            fetch_fields: None,
        }
    }
}

/// Check-in link configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckInSettings {
    /// Scheme and host the check-in links point at.
    pub origin: String,
}

impl Default for CheckInSettings {
    fn default() -> Self {
        Self {
            origin: DEFAULT_CHECKIN_ORIGIN.to_string(),
        }
    }
}

impl Settings {
    /// Defaults overridden from the process environment.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_overrides(|key| std::env::var(key).ok());
        settings
    }

    /// Applies overrides from `lookup`, keyed by variable name.
    ///
    /// Empty values are ignored. Values that fail to parse are ignored with a
    /// warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(host) = get("mailserver") {
            self.imap.host = host;
        }
        if let Some(port) = get("mailserver_port") {
            parse_into(&mut self.imap.port, "mailserver_port", &port);
        }
        if let Some(mailbox) = get("mailbox") {
            self.imap.mailbox = mailbox;
        }
        if let Some(email) = get("email") {
            self.credentials.email = email;
        }
        if let Some(password) = get("password") {
            self.credentials.password = password;
        }
        if let Some(interval) = get("poll_interval_secs") {
            parse_nonzero_into(&mut self.poll.interval_seconds, "poll_interval_secs", &interval);
        }
        if let Some(window) = get("window_size") {
            parse_nonzero_into(&mut self.poll.window_size, "window_size", &window);
        }
        if let Some(strategy) = get("scan_strategy") {
            parse_into(&mut self.poll.scan_strategy, "scan_strategy", &strategy);
        }
        if let Some(fields) = get("fetch_fields") {
            let mut parsed = FetchFields::Body;
            if parse_into(&mut parsed, "fetch_fields", &fields) {
                self.poll.fetch_fields = Some(parsed);
            }
        }
        if let Some(origin) = get("checkin_origin") {
            self.checkin.origin = origin;
        }
    }

    pub fn imap_config(&self) -> ImapConfig {
        ImapConfig {
            host: self.imap.host.clone(),
            port: self.imap.port,
        }
    }

    pub fn imap_credentials(&self) -> ImapCredentials {
        ImapCredentials {
            username: self.credentials.email.clone(),
            password: self.credentials.password.clone(),
        }
    }

    pub fn cycle_settings(&self) -> CycleSettings {
        CycleSettings {
            mailbox: self.imap.mailbox.clone(),
            window_size: self.poll.window_size,
            strategy: self.poll.scan_strategy,
            extra_fields: self.poll.fetch_fields,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll.interval_seconds)
    }

    /// Builds the link extractor for the configured origin.
    pub fn link_extractor(&self) -> Result<LinkExtractor, regex::Error> {
        LinkExtractor::for_origin(&self.checkin.origin)
    }
}

/// Parses `raw` into `target`, keeping the old value on failure.
fn parse_into<T>(target: &mut T, key: &str, raw: &str) -> bool
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match raw.trim().parse() {
        Ok(value) => {
            *target = value;
            true
        }
        Err(e) => {
            tracing::warn!(key, value = raw, error = %e, "Ignoring invalid setting");
            false
        }
    }
}

/// Like [`parse_into`], but zero is rejected too.
fn parse_nonzero_into<T>(target: &mut T, key: &str, raw: &str)
where
    T: std::str::FromStr + Default + PartialEq,
    T::Err: fmt::Display,
{
    match raw.trim().parse::<T>() {
        Ok(value) if value == T::default() => tracing::warn!(
            key,
            value = raw,
            error = "must be greater than zero",
            "Ignoring invalid setting"
        ),
        Ok(value) => *target = value,
        Err(e) => tracing::warn!(key, value = raw, error = %e, "Ignoring invalid setting"),
    }
}
