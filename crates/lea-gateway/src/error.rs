use std::fmt;

use crate::client::{ClientError, ClientErrorKind};
use crate::parser::ParseError;

const AUTH_MARKERS: &[&str] = &[
    "api key not valid",
    "api_key_invalid",
    "permission denied",
    "authentication required",
    "unauthenticated",
];

/// Gateway operation, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Initialize,
    CandidateLeads,
    LeadDetails,
    EmailDraft,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Initialize => "initialize",
            Self::CandidateLeads => "candidate leads",
            Self::LeadDetails => "lead details",
            Self::EmailDraft => "email draft",
        };
        f.write_str(label)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("AI service is not initialized. Please provide an API key.")]
    NotInitialized,

    #[error("{}", render(.operation, .lead.as_deref(), .message))]
    Auth {
        operation: Operation,
        lead: Option<String>,
        message: String,
    },

    #[error("{}", render(.operation, .lead.as_deref(), .message))]
    Transient {
        operation: Operation,
        lead: Option<String>,
        message: String,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl GatewayError {
    /// Classify a backend failure. Auth is decided by the client's kind,
    /// falling back to well-known message markers.
    pub fn from_client(operation: Operation, lead: Option<&str>, error: ClientError) -> Self {
        let lead = lead.map(ToOwned::to_owned);
        if error.kind == ClientErrorKind::Unauthorized || looks_like_auth_failure(&error.message)
        {
            Self::Auth {
                operation,
                lead,
                message: error.message,
            }
        } else {
            Self::Transient {
                operation,
                lead,
                message: error.message,
            }
        }
    }

    /// True when the credential must be discarded and re-entered.
    pub fn is_credential_failure(&self) -> bool {
        matches!(self, Self::Auth { .. } | Self::NotInitialized)
    }
}

pub fn looks_like_auth_failure(message: &str) -> bool {
    let lower = message.to_lowercase();
    AUTH_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn render(operation: &Operation, lead: Option<&str>, message: &str) -> String {
    if *operation == Operation::Initialize {
        return format!("Failed to initialize AI service: {message}");
    }
    match lead {
        Some(lead) => format!("Failed to fetch {operation} for {lead}: {message}"),
        None => format!("Failed to fetch {operation}: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_kind_is_auth() {
        let err = GatewayError::from_client(
            Operation::CandidateLeads,
            None,
            ClientError::unauthorized("bad key"),
        );
        assert!(err.is_credential_failure());
        assert_eq!(err.to_string(), "Failed to fetch candidate leads: bad key");
    }

    #[test]
    fn test_message_markers_are_auth() {
        let err = GatewayError::from_client(
            Operation::LeadDetails,
            Some("Acme Retail"),
            ClientError::new(ClientErrorKind::Other, "API key not valid. Please pass a valid API key."),
        );
        assert!(err.is_credential_failure());
        assert!(err.to_string().starts_with("Failed to fetch lead details for Acme Retail:"));
    }

    #[test]
    fn test_other_failures_are_transient() {
        let err = GatewayError::from_client(
            Operation::EmailDraft,
            Some("Bolt"),
            ClientError::new(ClientErrorKind::Unavailable, "model overloaded"),
        );
        assert!(!err.is_credential_failure());
        assert!(matches!(err, GatewayError::Transient { .. }));
    }

    #[test]
    fn test_not_initialized_is_credential_failure() {
        assert!(GatewayError::NotInitialized.is_credential_failure());
    }

    #[test]
    fn test_marker_matching_is_case_insensitive() {
        assert!(looks_like_auth_failure("Request had UNAUTHENTICATED status"));
        assert!(looks_like_auth_failure("Permission denied on resource"));
        assert!(!looks_like_auth_failure("Deadline exceeded"));
    }
}
