//! Core value types shared across the harvester.
//!
//! These newtype wrappers keep raw strings from being passed where a
//! validated value is expected.

use serde::Serialize;
use std::fmt;

/// IMAP message sequence number (1-based).
pub type SeqNum = u32;

/// A reservation check-in URL recognised by the link extractor.
///
/// Values are only produced by
/// [`LinkExtractor`](crate::services::LinkExtractor), so every instance
/// matches the check-in grammar. There is no identity beyond the string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CheckInLink(String);

impl CheckInLink {
    pub(crate) fn from_match(url: &str) -> Self {
        Self(url.to_owned())
    }

    /// Returns the URL as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CheckInLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CheckInLink {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Plain-text view of a message, ready for link extraction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScannableText(String);

impl ScannableText {
    /// Returns the text as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns whether the text is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for ScannableText {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ScannableText {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for ScannableText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
