//! Configuration and settings management.
//!
//! This module provides the harvester settings types. Settings come from
//! built-in defaults overridden by environment variables.

mod settings;

pub use settings::{CheckInSettings, CredentialSettings, ImapSettings, PollSettings, Settings};
