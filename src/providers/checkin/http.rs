//! HTTP check-in dispatcher.

use async_trait::async_trait;

use super::{CheckInDispatcher, DispatchError};
use crate::domain::{CheckInLink, DispatchOutcome};

/// Dispatches check-in links with a plain GET.
///
/// No authentication, no retries, and the client's default timeouts. The
/// response body is ignored.
#[derive(Debug, Clone, Default)]
pub struct HttpDispatcher {
    client: reqwest::Client,
}

impl HttpDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn get(&self, link: &CheckInLink) -> Result<u16, DispatchError> {
        let response = self.client.get(link.as_str()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Status(status.as_u16()));
        }
        Ok(status.as_u16())
    }
}

#[async_trait]
impl CheckInDispatcher for HttpDispatcher {
    async fn dispatch(&self, link: &CheckInLink) -> DispatchOutcome {
        match self.get(link).await {
            Ok(status) => {
                tracing::info!(link = %link, status, "Checked in");
                DispatchOutcome::Succeeded
            }
            Err(e) => {
                tracing::warn!(link = %link, error = %e, "Check-in request failed");
                DispatchOutcome::Failed(e.to_string())
            }
        }
    }
}
