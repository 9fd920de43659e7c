use std::fmt;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};
use ulid::Ulid;

use crate::brief::ResearchBrief;
use crate::error::AppError;

/// Generate a fresh opaque identifier for leads and sessions.
pub fn new_id() -> String {
    Ulid::new().to_string()
}

/// Output format for CLI responses
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Position of a lead in the enrichment state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    Initial,
    FetchingDetails,
    FetchingEmail,
    Completed,
    ErrorDetails,
    ErrorEmail,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::FetchingDetails => "fetching_details",
            Self::FetchingEmail => "fetching_email",
            Self::Completed => "completed",
            Self::ErrorDetails => "error_details",
            Self::ErrorEmail => "error_email",
        }
    }

    /// No further transitions are possible within a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::ErrorDetails | Self::ErrorEmail)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::ErrorDetails | Self::ErrorEmail)
    }

    /// Forward edges of the state machine. Nothing moves backwards.
    pub fn can_advance_to(&self, next: LeadStatus) -> bool {
        matches!(
            (self, next),
            (Self::Initial, Self::FetchingDetails)
                | (Self::FetchingDetails, Self::FetchingEmail)
                | (Self::FetchingDetails, Self::ErrorDetails)
                | (Self::FetchingEmail, Self::Completed)
                | (Self::FetchingEmail, Self::ErrorEmail)
        )
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A person or channel to address at a lead company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_primary: Option<bool>,
}

impl ContactInfo {
    pub fn primary(&self) -> bool {
        self.is_primary.unwrap_or(false)
    }
}

// Models often emit phone numbers as bare JSON numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        match Option::<serde_json::Value>::deserialize(deserializer)? {
            Some(serde_json::Value::String(text)) => Some(text),
            Some(serde_json::Value::Number(number)) => Some(number.to_string()),
            _ => None,
        },
    )
}

/// Web source backing the facts gathered for a lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub uri: String,
    #[serde(default)]
    pub title: String,
}

impl Citation {
    /// Title when the source has one, otherwise the URI.
    pub fn label(&self) -> &str {
        if self.title.trim().is_empty() {
            &self.uri
        } else {
            &self.title
        }
    }
}

/// One candidate company and everything gathered about it so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub status: LeadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contacts: Option<Vec<ContactInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_body: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub grounding_metadata: Vec<Citation>,
}

impl Lead {
    /// Fresh lead in `initial` status.
    pub fn seed(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            status: LeadStatus::Initial,
            error_message: None,
            details: None,
            contacts: None,
            email_subject: None,
            email_body: None,
            grounding_metadata: Vec::new(),
        }
    }

    fn advance(&mut self, next: LeadStatus) -> Result<(), AppError> {
        if !self.status.can_advance_to(next) {
            return Err(AppError::InvalidTransition {
                lead: self.name.clone(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Enter the detail stage. A lead already in `fetching_details`
    /// (interrupted earlier) re-enters the stage unchanged.
    pub fn begin_details(&mut self) -> Result<(), AppError> {
        if self.status == LeadStatus::FetchingDetails {
            return Ok(());
        }
        self.advance(LeadStatus::FetchingDetails)
    }

    pub fn record_details(
        &mut self,
        details: Vec<String>,
        contacts: Vec<ContactInfo>,
        citations: Vec<Citation>,
    ) -> Result<(), AppError> {
        self.advance(LeadStatus::FetchingEmail)?;
        self.details = Some(details);
        self.contacts = Some(contacts);
        self.grounding_metadata = citations;
        Ok(())
    }

    pub fn fail_details(&mut self, message: impl Into<String>) -> Result<(), AppError> {
        self.advance(LeadStatus::ErrorDetails)?;
        self.error_message = Some(message.into());
        Ok(())
    }

    pub fn record_email(
        &mut self,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<(), AppError> {
        self.advance(LeadStatus::Completed)?;
        self.email_subject = Some(subject.into());
        self.email_body = Some(body.into());
        Ok(())
    }

    pub fn fail_email(&mut self, message: impl Into<String>) -> Result<(), AppError> {
        self.advance(LeadStatus::ErrorEmail)?;
        self.error_message = Some(message.into());
        Ok(())
    }

    pub fn details_or_empty(&self) -> &[String] {
        self.details.as_deref().unwrap_or_default()
    }

    pub fn contacts_or_empty(&self) -> &[ContactInfo] {
        self.contacts.as_deref().unwrap_or_default()
    }

    pub fn primary_contact(&self) -> Option<&ContactInfo> {
        self.contacts_or_empty().iter().find(|contact| contact.primary())
    }

    /// Draft rendered as a single paste-ready block, if one exists.
    pub fn copyable_email(&self) -> Option<String> {
        match (&self.email_subject, &self.email_body) {
            (Some(subject), Some(body)) => Some(format!("Subject: {subject}\n\n{body}")),
            _ => None,
        }
    }
}

/// A saved unit of research work: one brief and the leads it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// Last write time; drives recency ordering and retention.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "userInput")]
    pub brief: ResearchBrief,
    #[serde(default)]
    pub leads: Vec<Lead>,
    #[serde(default)]
    pub summary: String,
}

impl Session {
    pub fn new(id: impl Into<String>, brief: ResearchBrief, leads: Vec<Lead>) -> Self {
        Self {
            id: id.into(),
            timestamp: Utc::now(),
            summary: brief.summary(),
            brief,
            leads,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn is_fully_processed(&self) -> bool {
        self.leads.iter().all(|lead| lead.status.is_terminal())
    }

    pub fn pending_leads(&self) -> usize {
        self.leads
            .iter()
            .filter(|lead| !lead.status.is_terminal())
            .count()
    }

    /// Find a lead by exact id, then by case-insensitive name.
    pub fn find_lead(&self, key: &str) -> Result<&Lead, AppError> {
        self.leads
            .iter()
            .find(|lead| lead.id == key)
            .or_else(|| {
                self.leads
                    .iter()
                    .find(|lead| lead.name.eq_ignore_ascii_case(key))
            })
            .ok_or_else(|| AppError::LeadNotFound {
                search: self.id.clone(),
                lead: key.to_string(),
            })
    }
}

/// Opaque API credential. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn masked(&self) -> String {
        mask_secret(&self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.masked()).finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }

    let char_count = secret.chars().count();
    let prefix: String = secret.chars().take(3).collect();
    let suffix: String = secret.chars().skip(char_count.saturating_sub(4)).collect();

    if char_count <= 8 {
        format!("***{}", secret.chars().skip(char_count.saturating_sub(2)).collect::<String>())
    } else {
        format!("{prefix}...{suffix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brief::BriefInput;
    use chrono::TimeZone;

    fn brief() -> ResearchBrief {
        ResearchBrief::validate(BriefInput {
            service_description: "AI analytics for retailers".to_string(),
            target_area: "Austin".to_string(),
            target_audience: "mid-size retailers".to_string(),
            service_url: None,
        })
        .unwrap()
    }

    #[test]
    fn test_status_edges_only_move_forward() {
        use LeadStatus::*;
        let all = [
            Initial,
            FetchingDetails,
            FetchingEmail,
            Completed,
            ErrorDetails,
            ErrorEmail,
        ];
        let allowed = [
            (Initial, FetchingDetails),
            (FetchingDetails, FetchingEmail),
            (FetchingDetails, ErrorDetails),
            (FetchingEmail, Completed),
            (FetchingEmail, ErrorEmail),
        ];
        for from in all {
            for to in all {
                assert_eq!(
                    from.can_advance_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
        for terminal in [Completed, ErrorDetails, ErrorEmail] {
            assert!(terminal.is_terminal());
        }
    }

    #[test]
    fn test_lead_happy_path() {
        let mut lead = Lead::seed("Acme Retail");
        assert_eq!(lead.status, LeadStatus::Initial);
        lead.begin_details().unwrap();
        lead.record_details(
            vec!["Opened a second store".to_string()],
            vec![ContactInfo {
                name: Some("Dana Ortiz".to_string()),
                is_primary: Some(true),
                ..ContactInfo::default()
            }],
            vec![Citation {
                uri: "https://acme.example/news".to_string(),
                title: String::new(),
            }],
        )
        .unwrap();
        assert_eq!(lead.status, LeadStatus::FetchingEmail);
        assert_eq!(
            lead.primary_contact().and_then(|c| c.name.as_deref()),
            Some("Dana Ortiz")
        );
        lead.record_email("Hello", "Body").unwrap();
        assert_eq!(lead.status, LeadStatus::Completed);
        assert_eq!(lead.copyable_email().as_deref(), Some("Subject: Hello\n\nBody"));
        assert_eq!(lead.grounding_metadata[0].label(), "https://acme.example/news");
    }

    #[test]
    fn test_lead_rejects_regression() {
        let mut lead = Lead::seed("Acme Retail");
        lead.begin_details().unwrap();
        lead.fail_details("boom").unwrap();
        let err = lead.begin_details().unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
        assert_eq!(lead.status, LeadStatus::ErrorDetails);
        assert!(lead.record_email("s", "b").is_err());
    }

    #[test]
    fn test_begin_details_reenters_interrupted_stage() {
        let mut lead = Lead::seed("Acme Retail");
        lead.begin_details().unwrap();
        lead.begin_details().unwrap();
        assert_eq!(lead.status, LeadStatus::FetchingDetails);
    }

    #[test]
    fn test_lead_wire_format_is_camel_case() {
        let mut lead = Lead::seed("Acme Retail");
        lead.begin_details().unwrap();
        lead.fail_details("quota").unwrap();
        let json = serde_json::to_value(&lead).unwrap();
        assert_eq!(json["status"], "error_details");
        assert_eq!(json["errorMessage"], "quota");
        assert!(json.get("emailSubject").is_none());
        assert!(json.get("groundingMetadata").is_none());
    }

    #[test]
    fn test_contact_phone_accepts_numbers_and_null() {
        let contact: ContactInfo =
            serde_json::from_str(r#"{"name": "Jane", "phone": 5125550100, "isPrimary": null}"#)
                .unwrap();
        assert_eq!(contact.phone.as_deref(), Some("5125550100"));
        assert!(!contact.primary());

        let contact: ContactInfo = serde_json::from_str(r#"{"phone": null}"#).unwrap();
        assert_eq!(contact.phone, None);

        let contact: ContactInfo = serde_json::from_str(r#"{"phone": "+1 512 555 0100"}"#).unwrap();
        assert_eq!(contact.phone.as_deref(), Some("+1 512 555 0100"));
    }

    #[test]
    fn test_session_wire_format() {
        let timestamp = Utc.timestamp_millis_opt(1_717_171_717_000).unwrap();
        let session = Session::new("s-1", brief(), vec![Lead::seed("Acme Retail")])
            .with_timestamp(timestamp);
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["timestamp"], 1_717_171_717_000_i64);
        assert_eq!(json["userInput"]["targetArea"], "Austin");
        assert_eq!(json["leads"][0]["status"], "initial");
        assert_eq!(json["summary"], "mid-size retailers in Austin for AI analytics for ret...");

        let back: Session = serde_json::from_value(json).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn test_session_progress_helpers() {
        let mut done = Lead::seed("Done Co");
        done.begin_details().unwrap();
        done.fail_details("x").unwrap();
        let session = Session::new("s-1", brief(), vec![done, Lead::seed("Pending Co")]);
        assert!(!session.is_fully_processed());
        assert_eq!(session.pending_leads(), 1);
        assert_eq!(session.find_lead("pending co").unwrap().name, "Pending Co");
        assert!(matches!(
            session.find_lead("nobody"),
            Err(AppError::LeadNotFound { .. })
        ));
    }

    #[test]
    fn test_credential_is_masked() {
        let credential = Credential::new("AIzaSyD-super-secret-1234");
        assert_eq!(credential.masked(), "AIz...1234");
        assert!(!format!("{credential:?}").contains("super-secret"));
        assert_eq!(Credential::new("short").masked(), "***rt");
        assert!(Credential::new("  ").is_blank());
    }
}
