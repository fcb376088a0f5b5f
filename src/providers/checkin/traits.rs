//! Check-in dispatcher trait definition.

use async_trait::async_trait;

use crate::domain::{CheckInLink, DispatchOutcome};

/// Errors that can occur while issuing a check-in request.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),
}

/// Issues the request that confirms a reservation.
///
/// Dispatch never fails the caller: every error is folded into
/// [`DispatchOutcome::Failed`] so one bad link cannot stop the others.
#[async_trait]
pub trait CheckInDispatcher: Send + Sync {
    async fn dispatch(&self, link: &CheckInLink) -> DispatchOutcome;
}
