use std::fmt;

use crate::brief::BriefField;
use crate::types::LeadStatus;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("No saved search matching '{0}'")]
    SearchNotFound(String),

    #[error("Ambiguous search prefix '{0}': matches multiple saved searches")]
    AmbiguousSearchPrefix(String),

    #[error("No lead matching '{lead}' in search {search}")]
    LeadNotFound { search: String, lead: String },

    #[error("Invalid status transition for lead '{lead}': {from} -> {to}")]
    InvalidTransition {
        lead: String,
        from: LeadStatus,
        to: LeadStatus,
    },

    #[error("API key is not set")]
    CredentialMissing,

    #[error("Unsupported document '{0}': only plain text and markdown files can be attached")]
    UnsupportedDocument(String),
}

/// A single rejected brief field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: BriefField,
    pub message: String,
}

/// All field errors found while validating one brief submission.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: BriefField, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Message recorded for `field`, if it was rejected.
    pub fn for_field(&self, field: BriefField) -> Option<&str> {
        self.errors
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .errors
            .iter()
            .map(|error| format!("{}: {}", error.field, error.message))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "Invalid research brief: {rendered}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_search_not_found() {
        let err = AppError::SearchNotFound("01J9".into());
        assert_eq!(err.to_string(), "No saved search matching '01J9'");
    }

    #[test]
    fn test_display_ambiguous_prefix() {
        let err = AppError::AmbiguousSearchPrefix("01".into());
        assert_eq!(
            err.to_string(),
            "Ambiguous search prefix '01': matches multiple saved searches"
        );
    }

    #[test]
    fn test_display_invalid_transition() {
        let err = AppError::InvalidTransition {
            lead: "Acme Retail".into(),
            from: LeadStatus::Completed,
            to: LeadStatus::FetchingDetails,
        };
        assert_eq!(
            err.to_string(),
            "Invalid status transition for lead 'Acme Retail': completed -> fetching_details"
        );
    }

    #[test]
    fn test_display_validation_errors_joins_fields() {
        let mut errors = ValidationErrors::default();
        errors.push(BriefField::TargetArea, "Target area is required.");
        errors.push(
            BriefField::ServiceUrl,
            "Service URL must be a valid http(s) URL.",
        );
        assert_eq!(
            errors.to_string(),
            "Invalid research brief: targetArea: Target area is required.; \
             serviceUrl: Service URL must be a valid http(s) URL."
        );
        assert_eq!(
            errors.for_field(BriefField::TargetArea),
            Some("Target area is required.")
        );
        assert_eq!(errors.for_field(BriefField::TargetAudience), None);
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AppError>();
        assert_send_sync::<ValidationErrors>();
    }
}
