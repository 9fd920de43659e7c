//! Credential-bound facade over the generative backend.

use std::sync::{Arc, PoisonError, RwLock};

use lea_core::{Citation, ContactInfo, Credential, ResearchBrief};
use serde::Deserialize;
use serde_json::Value;

use crate::client::{ClientFactory, GenerateRequest, GenerativeClient};
use crate::error::{GatewayError, Operation};
use crate::parser::{self, Expected};
use crate::prompts;

const MAX_CONTACTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLead {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadDetails {
    pub details: Vec<String>,
    pub contacts: Vec<ContactInfo>,
    pub citations: Vec<Citation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmailDraft {
    pub subject: String,
    pub body: String,
}

/// Null or missing lists read as empty.
#[derive(Deserialize, Default)]
#[serde(default)]
struct DetailsPayload {
    details: Option<Vec<Value>>,
    contacts: Option<Vec<Value>>,
}

impl DetailsPayload {
    fn into_parts(self, lead_name: &str) -> (Vec<String>, Vec<ContactInfo>) {
        let details = self
            .details
            .unwrap_or_default()
            .into_iter()
            .filter_map(|fact| match fact {
                Value::String(text) => Some(text),
                _ => None,
            })
            .collect();

        // A malformed contact is dropped on its own so the facts survive.
        let contacts = self
            .contacts
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<ContactInfo>(entry) {
                Ok(contact) => Some(contact),
                Err(error) => {
                    tracing::debug!(lead = %lead_name, %error, "skipping malformed contact");
                    None
                }
            })
            .take(MAX_CONTACTS)
            .collect();
        (details, contacts)
    }
}

/// Holds at most one live client. Cloning the inner `Arc` per call means a
/// concurrent `initialize`/`clear` never affects an in-flight request.
pub struct AiGateway {
    factory: Arc<dyn ClientFactory>,
    client: RwLock<Option<Arc<dyn GenerativeClient>>>,
    max_leads: usize,
}

impl AiGateway {
    pub fn new(factory: Arc<dyn ClientFactory>, max_leads: usize) -> Self {
        Self {
            factory,
            client: RwLock::new(None),
            max_leads: max_leads.max(1),
        }
    }

    /// Bind a client to `credential`. No network call is made. On failure
    /// the gateway is left uninitialized.
    pub fn initialize(&self, credential: &Credential) -> Result<(), GatewayError> {
        if credential.is_blank() {
            self.clear();
            return Err(GatewayError::Auth {
                operation: Operation::Initialize,
                lead: None,
                message: "API key cannot be empty.".to_string(),
            });
        }

        match self.factory.build(credential) {
            Ok(client) => {
                tracing::debug!(backend = client.name(), key = %credential.masked(), "AI client initialized");
                *self.client.write().unwrap_or_else(PoisonError::into_inner) = Some(client);
                Ok(())
            }
            Err(error) => {
                self.clear();
                Err(GatewayError::Auth {
                    operation: Operation::Initialize,
                    lead: None,
                    message: error.message,
                })
            }
        }
    }

    pub fn clear(&self) {
        *self.client.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_initialized(&self) -> bool {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn max_leads(&self) -> usize {
        self.max_leads
    }

    fn active_client(&self) -> Result<Arc<dyn GenerativeClient>, GatewayError> {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(GatewayError::NotInitialized)
    }

    pub async fn generate_candidate_leads(
        &self,
        brief: &ResearchBrief,
    ) -> Result<Vec<CandidateLead>, GatewayError> {
        let client = self.active_client()?;
        let request = GenerateRequest::grounded(prompts::candidate_leads(brief, self.max_leads));
        let response = client
            .generate(request)
            .await
            .map_err(|err| GatewayError::from_client(Operation::CandidateLeads, None, err))?;

        let value = parser::extract_json(&response.text, Expected::Any, "initial leads")?;
        let Value::Array(entries) = value else {
            tracing::warn!("candidate response was not an array; treating as no leads");
            return Ok(Vec::new());
        };

        let candidates: Vec<CandidateLead> = entries
            .iter()
            .filter_map(|entry| entry.get("name").and_then(Value::as_str))
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .take(self.max_leads)
            .map(|name| CandidateLead {
                name: name.to_string(),
            })
            .collect();
        tracing::info!(count = candidates.len(), "candidate leads generated");
        Ok(candidates)
    }

    pub async fn generate_lead_details(
        &self,
        lead_name: &str,
        brief: &ResearchBrief,
    ) -> Result<LeadDetails, GatewayError> {
        let client = self.active_client()?;
        let request = GenerateRequest::grounded(prompts::lead_details(lead_name, brief));
        let response = client.generate(request).await.map_err(|err| {
            GatewayError::from_client(Operation::LeadDetails, Some(lead_name), err)
        })?;

        let payload: DetailsPayload = parser::parse_json_response(
            &response.text,
            Expected::Object,
            &format!("details for {lead_name}"),
        )?;

        let (details, contacts) = payload.into_parts(lead_name);
        Ok(LeadDetails {
            details,
            contacts,
            citations: response.citations,
        })
    }

    pub async fn generate_email_draft(
        &self,
        lead_name: &str,
        details: &[String],
        contacts: &[ContactInfo],
        brief: &ResearchBrief,
    ) -> Result<EmailDraft, GatewayError> {
        let client = self.active_client()?;
        let request = GenerateRequest::json(prompts::email_draft(lead_name, details, contacts, brief));
        let response = client.generate(request).await.map_err(|err| {
            GatewayError::from_client(Operation::EmailDraft, Some(lead_name), err)
        })?;

        Ok(parser::parse_json_response(
            &response.text,
            Expected::Object,
            &format!("email draft for {lead_name}"),
        )?)
    }
}
