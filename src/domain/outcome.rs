//! Per-link dispatch results.

use serde::{Deserialize, Serialize};

use super::CheckInLink;

/// Result of issuing one check-in request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// The request completed with a success status.
    Succeeded,
    /// The request failed at the transport level or was rejected.
    Failed(String),
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// A dispatched link together with its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchRecord {
    pub link: CheckInLink,
    pub outcome: DispatchOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_success_flag() {
        assert!(DispatchOutcome::Succeeded.is_success());
        assert!(!DispatchOutcome::Failed("timeout".to_string()).is_success());
    }

    #[test]
    fn outcome_serialization() {
        let json = serde_json::to_string(&DispatchOutcome::Failed("status 500".into())).unwrap();
        assert_eq!(json, r#"{"status":"failed","reason":"status 500"}"#);

        let ok: DispatchOutcome = serde_json::from_str(r#"{"status":"succeeded"}"#).unwrap();
        assert_eq!(ok, DispatchOutcome::Succeeded);
    }
}
