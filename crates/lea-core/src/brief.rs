//! Research brief input and validation.
//!
//! A [`ResearchBrief`] can only be built by validating a raw [`BriefInput`],
//! so every brief that reaches the gateway has already passed the field rules.

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationErrors;

pub const MIN_SERVICE_DESCRIPTION_CHARS: usize = 10;
pub const MIN_TARGET_AREA_CHARS: usize = 3;
pub const MIN_TARGET_AUDIENCE_CHARS: usize = 5;

const SUMMARY_AUDIENCE_CHARS: usize = 30;
const SUMMARY_AREA_CHARS: usize = 25;
const SUMMARY_DESCRIPTION_CHARS: usize = 20;

const DOCUMENT_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BriefField {
    ServiceDescription,
    TargetArea,
    TargetAudience,
    ServiceUrl,
}

impl BriefField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServiceDescription => "serviceDescription",
            Self::TargetArea => "targetArea",
            Self::TargetAudience => "targetAudience",
            Self::ServiceUrl => "serviceUrl",
        }
    }
}

impl fmt::Display for BriefField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unvalidated form input, as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BriefInput {
    pub service_description: String,
    pub target_area: String,
    pub target_audience: String,
    pub service_url: Option<String>,
}

impl BriefInput {
    /// Append the text of an uploaded document to the service description.
    pub fn append_document(&mut self, file_name: &str, content: &str) {
        let content = content.trim();
        if content.is_empty() {
            return;
        }
        if !self.service_description.trim().is_empty() {
            self.service_description.push_str("\n\n");
        }
        self.service_description
            .push_str(&format!("--- Content from {file_name} ---\n{content}"));
    }
}

/// Returns true for files that can be appended verbatim (plain text / markdown).
pub fn is_plain_text_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            DOCUMENT_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

/// Validated, immutable research input for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchBrief {
    service_description: String,
    target_area: String,
    target_audience: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    service_url: Option<String>,
}

impl ResearchBrief {
    /// Check every field and collect all failures before returning.
    pub fn validate(input: BriefInput) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        check_min_chars(
            &mut errors,
            BriefField::ServiceDescription,
            &input.service_description,
            MIN_SERVICE_DESCRIPTION_CHARS,
            "Service description",
        );
        check_min_chars(
            &mut errors,
            BriefField::TargetArea,
            &input.target_area,
            MIN_TARGET_AREA_CHARS,
            "Target area",
        );
        check_min_chars(
            &mut errors,
            BriefField::TargetAudience,
            &input.target_audience,
            MIN_TARGET_AUDIENCE_CHARS,
            "Target audience",
        );

        let service_url = input
            .service_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(ToOwned::to_owned);
        if let Some(url) = &service_url {
            if !url_pattern().is_some_and(|pattern| pattern.is_match(url)) {
                errors.push(
                    BriefField::ServiceUrl,
                    "Service URL must be a valid http(s) URL.",
                );
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            service_description: input.service_description.trim().to_string(),
            target_area: input.target_area.trim().to_string(),
            target_audience: input.target_audience.trim().to_string(),
            service_url,
        })
    }

    pub fn service_description(&self) -> &str {
        &self.service_description
    }

    pub fn target_area(&self) -> &str {
        &self.target_area
    }

    pub fn target_audience(&self) -> &str {
        &self.target_audience
    }

    pub fn service_url(&self) -> Option<&str> {
        self.service_url.as_deref()
    }

    /// Short label used when listing saved searches.
    pub fn summary(&self) -> String {
        format!(
            "{} in {} for {}...",
            truncate_chars(&self.target_audience, SUMMARY_AUDIENCE_CHARS),
            truncate_chars(&self.target_area, SUMMARY_AREA_CHARS),
            truncate_chars(&self.service_description, SUMMARY_DESCRIPTION_CHARS),
        )
    }
}

fn check_min_chars(
    errors: &mut ValidationErrors,
    field: BriefField,
    value: &str,
    min_chars: usize,
    label: &str,
) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(field, format!("{label} is required."));
    } else if trimmed.chars().count() < min_chars {
        errors.push(
            field,
            format!("{label} should be at least {min_chars} characters."),
        );
    }
}

fn url_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)^https?://[^\s/$.?#][^\s]*$").ok())
        .as_ref()
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}
