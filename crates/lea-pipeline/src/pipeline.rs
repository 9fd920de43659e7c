use std::sync::Arc;

use lea_core::{AppError, Lead, LeadStatus, ResearchBrief};
use lea_gateway::{AiGateway, GatewayError};
use tracing::{debug, info, warn};

/// Sink verdict after each lead update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkControl {
    Continue,
    /// The run no longer owns its session; stop without further calls.
    Stop,
}

/// Receives every lead transition as it happens.
pub trait ProgressSink: Send {
    fn on_lead_update(&mut self, index: usize, lead: &Lead) -> SinkControl;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every lead was visited.
    Completed,
    /// A credential failure ended the run; later leads were not touched.
    CredentialRejected { message: String },
    Superseded,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub leads: Vec<Lead>,
    pub outcome: RunOutcome,
}

enum Step {
    Next,
    Abort(RunOutcome),
}

/// Enriches leads one at a time, in order: details, then email draft.
#[derive(Clone)]
pub struct EnrichmentPipeline {
    gateway: Arc<AiGateway>,
}

impl EnrichmentPipeline {
    pub fn new(gateway: Arc<AiGateway>) -> Self {
        Self { gateway }
    }

    /// Terminal leads are skipped, so a partially processed list resumes
    /// where it stopped.
    pub async fn run(
        &self,
        mut leads: Vec<Lead>,
        brief: &ResearchBrief,
        sink: &mut dyn ProgressSink,
    ) -> RunReport {
        let pending = leads.iter().filter(|l| !l.status.is_terminal()).count();
        info!(leads = leads.len(), pending, "enrichment run started");

        for index in 0..leads.len() {
            if leads[index].status.is_terminal() {
                continue;
            }
            if !self.gateway.is_initialized() {
                warn!(lead = %leads[index].name, "gateway lost its credential; aborting run");
                return RunReport {
                    leads,
                    outcome: RunOutcome::CredentialRejected {
                        message: GatewayError::NotInitialized.to_string(),
                    },
                };
            }

            let step = self.process(&mut leads[index], index, brief, sink).await;
            if let Step::Abort(outcome) = step {
                info!(?outcome, "enrichment run ended early");
                return RunReport { leads, outcome };
            }
        }

        info!("enrichment run completed");
        RunReport {
            leads,
            outcome: RunOutcome::Completed,
        }
    }

    async fn process(
        &self,
        lead: &mut Lead,
        index: usize,
        brief: &ResearchBrief,
        sink: &mut dyn ProgressSink,
    ) -> Step {
        if matches!(lead.status, LeadStatus::Initial | LeadStatus::FetchingDetails) {
            if let Err(err) = lead.begin_details() {
                return skip(lead, err);
            }
            if let Step::Abort(outcome) = notify(sink, index, lead) {
                return Step::Abort(outcome);
            }

            debug!(lead = %lead.name, "fetching details");
            let result = self.gateway.generate_lead_details(&lead.name, brief).await;
            let transition = match &result {
                Ok(found) => lead.record_details(
                    found.details.clone(),
                    found.contacts.clone(),
                    found.citations.clone(),
                ),
                Err(err) => lead.fail_details(err.to_string()),
            };
            if let Err(err) = transition {
                return skip(lead, err);
            }
            if let Step::Abort(outcome) = notify(sink, index, lead) {
                return Step::Abort(outcome);
            }
            if let Err(err) = result {
                return on_failure(lead, err);
            }
        }

        if lead.status == LeadStatus::FetchingEmail {
            debug!(lead = %lead.name, "drafting email");
            let result = self
                .gateway
                .generate_email_draft(
                    &lead.name,
                    lead.details_or_empty(),
                    lead.contacts_or_empty(),
                    brief,
                )
                .await;
            let transition = match &result {
                Ok(draft) => lead.record_email(draft.subject.clone(), draft.body.clone()),
                Err(err) => lead.fail_email(err.to_string()),
            };
            if let Err(err) = transition {
                return skip(lead, err);
            }
            if let Step::Abort(outcome) = notify(sink, index, lead) {
                return Step::Abort(outcome);
            }
            if let Err(err) = result {
                return on_failure(lead, err);
            }
        }

        Step::Next
    }
}

fn notify(sink: &mut dyn ProgressSink, index: usize, lead: &Lead) -> Step {
    match sink.on_lead_update(index, lead) {
        SinkControl::Continue => Step::Next,
        SinkControl::Stop => Step::Abort(RunOutcome::Superseded),
    }
}

fn on_failure(lead: &Lead, err: GatewayError) -> Step {
    if err.is_credential_failure() {
        warn!(lead = %lead.name, status = %lead.status, "credential rejected mid-run");
        return Step::Abort(RunOutcome::CredentialRejected {
            message: err.to_string(),
        });
    }
    warn!(lead = %lead.name, status = %lead.status, error = %err, "lead enrichment step failed");
    Step::Next
}

fn skip(lead: &Lead, err: AppError) -> Step {
    warn!(lead = %lead.name, error = %err, "skipping lead");
    Step::Next
}
