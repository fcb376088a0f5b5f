//! External service implementations.
//!
//! - [`mailbox`] - Mail store backends (IMAP over TLS, in-memory)
//! - [`checkin`] - Check-in request dispatch over HTTP

pub mod checkin;
pub mod mailbox;
