//! Fetched messages and the scan strategy that decides what to fetch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::SeqNum;

/// Data items requested for each message in the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchFields {
    /// Envelope metadata only (subject).
    Envelope,
    /// Full body literal only.
    Body,
    /// Envelope and full body.
    Both,
}

impl FetchFields {
    /// IMAP FETCH data items for these fields.
    ///
    /// Bodies are fetched with `BODY.PEEK[]` so the `\Seen` flag is untouched.
    pub fn imap_query(self) -> &'static str {
        match self {
            Self::Envelope => "ENVELOPE",
            Self::Body => "BODY.PEEK[]",
            Self::Both => "(ENVELOPE BODY.PEEK[])",
        }
    }

    pub fn includes_envelope(self) -> bool {
        matches!(self, Self::Envelope | Self::Both)
    }

    pub fn includes_body(self) -> bool {
        matches!(self, Self::Body | Self::Both)
    }

    /// Smallest set of fields covering both `self` and `other`.
    pub fn union(self, other: FetchFields) -> FetchFields {
        match (
            self.includes_envelope() || other.includes_envelope(),
            self.includes_body() || other.includes_body(),
        ) {
            (true, true) => Self::Both,
            (true, false) => Self::Envelope,
            _ => Self::Body,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Envelope => "envelope",
            Self::Body => "body",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for FetchFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FetchFields {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "envelope" => Ok(Self::Envelope),
            "body" => Ok(Self::Body),
            "both" => Ok(Self::Both),
            other => Err(format!("unknown fetch fields: {}", other)),
        }
    }
}

/// How a message is turned into scannable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStrategy {
    /// Scan the envelope subject as-is.
    Subject,
    /// Decode the transfer-encoded body and scan it.
    #[default]
    Body,
}

impl ScanStrategy {
    /// Fields that must be fetched for this strategy to work.
    pub fn fetch_fields(self) -> FetchFields {
        match self {
            Self::Subject => FetchFields::Envelope,
            Self::Body => FetchFields::Body,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subject => "subject",
            Self::Body => "body",
        }
    }
}

impl fmt::Display for ScanStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "subject" | "envelope" => Ok(Self::Subject),
            "body" => Ok(Self::Body),
            other => Err(format!("unknown scan strategy: {}", other)),
        }
    }
}

/// One message as delivered by the mail server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Sequence number in the selected mailbox.
    pub seq: SeqNum,
    /// Envelope subject, decoded from MIME encoded-words.
    pub subject: Option<String>,
    /// Full RFC 5322 message literal.
    pub body: Option<Vec<u8>>,
}

impl RawMessage {
    /// Creates a message carrying neither subject nor body.
    pub fn new(seq: SeqNum) -> Self {
        Self {
            seq,
            subject: None,
            body: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_fields_queries() {
        assert_eq!(FetchFields::Envelope.imap_query(), "ENVELOPE");
        assert_eq!(FetchFields::Body.imap_query(), "BODY.PEEK[]");
        assert_eq!(FetchFields::Both.imap_query(), "(ENVELOPE BODY.PEEK[])");
        assert!(FetchFields::Both.includes_envelope());
        assert!(FetchFields::Both.includes_body());
        assert!(!FetchFields::Envelope.includes_body());
        assert!(!FetchFields::Body.includes_envelope());
    }

    #[test]
    fn fetch_fields_union() {
        use FetchFields::*;
        assert_eq!(Envelope.union(Body), Both);
        assert_eq!(Body.union(Body), Body);
        assert_eq!(Envelope.union(Envelope), Envelope);
        assert_eq!(Both.union(Envelope), Both);
        assert_eq!("BOTH".parse::<FetchFields>(), Ok(Both));
        assert!("headers".parse::<FetchFields>().is_err());
    }

    #[test]
    fn strategy_requires_matching_fields() {
        assert_eq!(ScanStrategy::Subject.fetch_fields(), FetchFields::Envelope);
        assert_eq!(ScanStrategy::Body.fetch_fields(), FetchFields::Body);
        assert_eq!(ScanStrategy::default(), ScanStrategy::Body);
    }

    #[test]
    fn strategy_parsing() {
        assert_eq!("subject".parse::<ScanStrategy>(), Ok(ScanStrategy::Subject));
        assert_eq!(" BODY ".parse::<ScanStrategy>(), Ok(ScanStrategy::Body));
        assert!("headers".parse::<ScanStrategy>().is_err());
    }

    #[test]
    fn strategy_serialization() {
        let json = serde_json::to_string(&ScanStrategy::Subject).unwrap();
        assert_eq!(json, "\"subject\"");

        let parsed: ScanStrategy = serde_json::from_str("\"body\"").unwrap();
        assert_eq!(parsed, ScanStrategy::Body);
    }

    #[test]
    fn raw_message_builder() {
        let message = RawMessage::new(7)
            .with_subject("Reservation")
            .with_body(b"hello".to_vec());
        assert_eq!(message.seq, 7);
        assert_eq!(message.subject.as_deref(), Some("Reservation"));
        assert_eq!(message.body.as_deref(), Some(&b"hello"[..]));
    }
}
