//! Business services layer.
//!
//! This module contains the services that turn mailbox contents into
//! check-ins, coordinating between providers and domain types.
//!
//! # Architecture
//!
//! ```text
//!      Scheduler (fixed interval)
//!          |
//!          v
//!     PollService  -- ContentDecoder, LinkExtractor
//!          |
//!          v
//! Providers (mailbox, check-in dispatch)
//! ```
//!
//! # Services Overview
//!
//! - [`PollService`]: Runs one connect, fetch, dispatch and purge cycle
//! - [`Scheduler`]: Repeats cycles on a fixed interval until stopped
//! - [`ContentDecoder`]: Turns fetched messages into scannable text
//! - [`LinkExtractor`]: Finds check-in links in text

mod content_decoder;
mod link_extractor;
mod poll_service;
mod scheduler;

pub use content_decoder::{decode_body, ContentDecoder, DecodeError};
pub use link_extractor::{LinkExtractor, DEFAULT_CHECKIN_ORIGIN};
pub use poll_service::{CyclePhase, CycleSettings, CycleSummary, PollService};
pub use scheduler::{Scheduler, DEFAULT_POLL_INTERVAL};
