//! Search lifecycle and credential handling around the enrichment pipeline.
//!
//! The controller owns the working copy of the active search (brief, leads,
//! session id) and keeps the saved-search store in step with it. Every run is
//! tagged with the session id active when it started; updates from a run
//! whose tag no longer matches are dropped and the run is stopped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lea_core::{
    AppError, BriefInput, Credential, Lead, ResearchBrief, Session, ValidationErrors, new_id,
};
use lea_gateway::{AiGateway, GatewayError};
use lea_session::{CredentialStore, SessionStore};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::pipeline::{EnrichmentPipeline, ProgressSink, RunOutcome, SinkControl};

pub const STORED_KEY_INVALID: &str =
    "Stored API key is invalid or expired. Please enter a new one.";
pub const NO_LEADS_NOTICE: &str =
    "No potential leads were generated. Try broadening your criteria.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    AwaitingCredential,
    Dashboard,
    NewSearchForm,
    LoadingCandidates,
    Enriching,
    ResultsShown,
    FatalError,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingCredential => "awaiting-credential",
            Self::Dashboard => "dashboard",
            Self::NewSearchForm => "new-search-form",
            Self::LoadingCandidates => "loading-candidates",
            Self::Enriching => "enriching",
            Self::ResultsShown => "results-shown",
            Self::FatalError => "fatal-error",
        }
    }
}

/// Read-only snapshot of the controller for rendering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerView {
    pub phase: Phase,
    pub brief: Option<ResearchBrief>,
    pub leads: Vec<Lead>,
    pub session_id: Option<String>,
    pub last_error: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ControllerError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    App(#[from] AppError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Observer for live lead updates of the active run.
pub trait ProgressListener: Send + Sync {
    fn on_lead_update(&self, session_id: &str, index: usize, lead: &Lead);
}

struct Workspace {
    phase: Phase,
    brief: Option<ResearchBrief>,
    leads: Vec<Lead>,
    session_id: Option<String>,
    last_error: Option<String>,
    credential: Option<Credential>,
}

impl Workspace {
    fn new() -> Self {
        Self {
            phase: Phase::AwaitingCredential,
            brief: None,
            leads: Vec::new(),
            session_id: None,
            last_error: None,
            credential: None,
        }
    }

    fn clear_working(&mut self) {
        self.brief = None;
        self.leads.clear();
        self.session_id = None;
        self.last_error = None;
    }

    fn neutral_phase(&self) -> Phase {
        if self.credential.is_some() {
            Phase::Dashboard
        } else {
            Phase::AwaitingCredential
        }
    }

    fn owns(&self, tag: &str) -> bool {
        self.session_id.as_deref() == Some(tag)
    }

    fn view(&self) -> ControllerView {
        ControllerView {
            phase: self.phase,
            brief: self.brief.clone(),
            leads: self.leads.clone(),
            session_id: self.session_id.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

// Lock order: workspace, then store.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct SessionController {
    gateway: Arc<AiGateway>,
    pipeline: EnrichmentPipeline,
    store: Arc<Mutex<SessionStore>>,
    credentials: CredentialStore,
    workspace: Arc<Mutex<Workspace>>,
    listener: Option<Arc<dyn ProgressListener>>,
}

impl SessionController {
    pub fn new(gateway: Arc<AiGateway>, store: SessionStore, credentials: CredentialStore) -> Self {
        Self {
            pipeline: EnrichmentPipeline::new(gateway.clone()),
            gateway,
            store: Arc::new(Mutex::new(store)),
            credentials,
            workspace: Arc::new(Mutex::new(Workspace::new())),
            listener: None,
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn ProgressListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Restore the stored credential, if any.
    pub fn bootstrap(&self) -> ControllerView {
        let stored = self.credentials.load().unwrap_or_else(|error| {
            warn!(error = %format!("{error:#}"), "failed to read stored API key");
            None
        });

        let mut ws = lock(&self.workspace);
        ws.clear_working();
        match stored {
            None => {
                ws.credential = None;
                ws.phase = Phase::AwaitingCredential;
            }
            Some(credential) => match self.gateway.initialize(&credential) {
                Ok(()) => {
                    info!(key = %credential.masked(), "restored stored API key");
                    ws.credential = Some(credential);
                    ws.phase = Phase::Dashboard;
                }
                Err(error) => {
                    warn!(%error, "stored API key rejected");
                    self.forget_stored_credential();
                    ws.credential = None;
                    ws.phase = Phase::AwaitingCredential;
                    ws.last_error = Some(STORED_KEY_INVALID.to_string());
                }
            },
        }
        ws.view()
    }

    /// Initialize the gateway with `key`; persist it only once that succeeds.
    pub fn submit_credential(&self, key: &str) -> Result<ControllerView, ControllerError> {
        let credential = Credential::new(key.trim());
        let mut ws = lock(&self.workspace);
        ws.last_error = None;

        if let Err(error) = self.gateway.initialize(&credential) {
            warn!(%error, "API key rejected");
            self.forget_stored_credential();
            ws.credential = None;
            ws.phase = Phase::AwaitingCredential;
            ws.last_error = Some(error.to_string());
            return Err(error.into());
        }

        if let Err(error) = self.credentials.save(&credential) {
            self.gateway.clear();
            ws.credential = None;
            ws.phase = Phase::AwaitingCredential;
            return Err(error.into());
        }

        info!(key = %credential.masked(), "API key accepted");
        ws.credential = Some(credential);
        ws.phase = Phase::Dashboard;
        Ok(ws.view())
    }

    /// Drop the credential everywhere along with the working state.
    pub fn change_credential(&self) -> Result<ControllerView, ControllerError> {
        let mut ws = lock(&self.workspace);
        self.gateway.clear();
        ws.credential = None;
        ws.clear_working();
        ws.phase = Phase::AwaitingCredential;
        self.credentials.clear()?;
        Ok(ws.view())
    }

    pub fn open_new_search_form(&self) -> ControllerView {
        let mut ws = lock(&self.workspace);
        ws.clear_working();
        ws.phase = if ws.credential.is_some() {
            Phase::NewSearchForm
        } else {
            Phase::AwaitingCredential
        };
        ws.view()
    }

    /// Validate, fetch candidates, persist the seed session, then enrich.
    ///
    /// Validation and a missing credential are returned as errors before any
    /// state changes. Gateway failures are reflected in the returned view.
    pub async fn start_new_search(
        &self,
        input: BriefInput,
    ) -> Result<ControllerView, ControllerError> {
        let brief = ResearchBrief::validate(input)?;
        if !self.gateway.is_initialized() {
            return Err(AppError::CredentialMissing.into());
        }

        let tag = new_id();
        {
            let mut ws = lock(&self.workspace);
            ws.clear_working();
            ws.brief = Some(brief.clone());
            ws.session_id = Some(tag.clone());
            ws.phase = Phase::LoadingCandidates;
        }
        info!(session_id = %tag, "new search started");

        let result = self.gateway.generate_candidate_leads(&brief).await;

        let leads = {
            let mut ws = lock(&self.workspace);
            if !ws.owns(&tag) {
                debug!(session_id = %tag, "candidate response superseded");
                return Ok(ws.view());
            }
            let candidates = match result {
                Ok(candidates) => candidates,
                Err(error) if error.is_credential_failure() => {
                    drop(ws);
                    return Ok(self.reset_credential(&error.to_string()));
                }
                Err(error) => {
                    warn!(%error, "candidate fetch failed");
                    ws.session_id = None;
                    ws.phase = Phase::NewSearchForm;
                    ws.last_error = Some(format!("Failed to fetch initial leads: {error}"));
                    return Ok(ws.view());
                }
            };

            let leads: Vec<Lead> = candidates
                .into_iter()
                .map(|candidate| Lead::seed(candidate.name))
                .collect();
            ws.leads = leads.clone();
            let seed = Session::new(tag.clone(), brief.clone(), leads.clone());
            if let Err(error) = lock(&self.store).upsert(seed) {
                warn!(session_id = %tag, error = %format!("{error:#}"), "failed to save new search");
            }

            if leads.is_empty() {
                info!(session_id = %tag, "no candidate leads generated");
                ws.phase = Phase::Dashboard;
                ws.last_error = Some(NO_LEADS_NOTICE.to_string());
                return Ok(ws.view());
            }
            ws.phase = Phase::Enriching;
            leads
        };

        self.enrich(tag, brief, leads).await;
        Ok(self.snapshot())
    }

    /// Show a saved search without running anything.
    pub fn load_search(&self, id_or_prefix: &str) -> Result<ControllerView, ControllerError> {
        let mut ws = lock(&self.workspace);
        let session = lock(&self.store).resolve(id_or_prefix)?.clone();
        debug!(session_id = %session.id, "saved search loaded");
        ws.brief = Some(session.brief);
        ws.leads = session.leads;
        ws.session_id = Some(session.id);
        ws.last_error = None;
        ws.phase = Phase::ResultsShown;
        Ok(ws.view())
    }

    /// Load a saved search and continue enriching its unfinished leads.
    pub async fn resume_search(
        &self,
        id_or_prefix: &str,
    ) -> Result<ControllerView, ControllerError> {
        if !self.gateway.is_initialized() {
            return Err(AppError::CredentialMissing.into());
        }

        let (tag, brief, leads) = {
            let mut ws = lock(&self.workspace);
            let session = lock(&self.store).resolve(id_or_prefix)?.clone();
            ws.brief = Some(session.brief.clone());
            ws.leads = session.leads.clone();
            ws.session_id = Some(session.id.clone());
            ws.last_error = None;
            if session.is_fully_processed() {
                ws.phase = Phase::ResultsShown;
                return Ok(ws.view());
            }
            ws.phase = Phase::Enriching;
            (session.id, session.brief, session.leads)
        };

        info!(session_id = %tag, "resuming saved search");
        self.enrich(tag, brief, leads).await;
        Ok(self.snapshot())
    }

    /// Remove a saved search; the working state resets if it was active.
    pub fn delete_search(&self, id_or_prefix: &str) -> Result<ControllerView, ControllerError> {
        let mut ws = lock(&self.workspace);
        {
            let mut store = lock(&self.store);
            let id = store.resolve(id_or_prefix)?.id.clone();
            store.remove(&id)?;
            info!(session_id = %id, "saved search deleted");
            if ws.owns(&id) {
                ws.clear_working();
                ws.phase = ws.neutral_phase();
            }
        }
        Ok(ws.view())
    }

    pub fn reset_to_new(&self) -> ControllerView {
        let mut ws = lock(&self.workspace);
        ws.clear_working();
        ws.phase = ws.neutral_phase();
        ws.view()
    }

    pub fn snapshot(&self) -> ControllerView {
        lock(&self.workspace).view()
    }

    pub fn saved_searches(&self) -> Vec<Session> {
        lock(&self.store).list().to_vec()
    }

    pub fn find_search(&self, id_or_prefix: &str) -> Result<Session, ControllerError> {
        Ok(lock(&self.store).resolve(id_or_prefix)?.clone())
    }

    /// Masked form of the active credential.
    pub fn credential_hint(&self) -> Option<String> {
        lock(&self.workspace)
            .credential
            .as_ref()
            .map(Credential::masked)
    }

    async fn enrich(&self, tag: String, brief: ResearchBrief, leads: Vec<Lead>) {
        let mut sink = ReconcilingSink {
            tag: tag.clone(),
            brief: brief.clone(),
            workspace: self.workspace.clone(),
            store: self.store.clone(),
            listener: self.listener.clone(),
        };
        let report = self.pipeline.run(leads, &brief, &mut sink).await;

        match report.outcome {
            RunOutcome::Completed => {
                let mut ws = lock(&self.workspace);
                if ws.owns(&tag) {
                    ws.leads = report.leads;
                    ws.phase = Phase::ResultsShown;
                } else {
                    debug!(session_id = %tag, "completed run superseded");
                }
            }
            // The key is bad regardless of which search noticed it.
            RunOutcome::CredentialRejected { message } => {
                self.reset_credential(&message);
            }
            RunOutcome::Superseded => {
                debug!(session_id = %tag, "run superseded");
            }
        }
    }

    fn reset_credential(&self, message: &str) -> ControllerView {
        warn!("credential rejected; returning to key entry");
        self.gateway.clear();
        self.forget_stored_credential();
        let mut ws = lock(&self.workspace);
        ws.credential = None;
        ws.clear_working();
        ws.phase = Phase::AwaitingCredential;
        ws.last_error = Some(format!(
            "API Key Error: {message}. Please re-enter your API key."
        ));
        ws.view()
    }

    fn forget_stored_credential(&self) {
        if let Err(error) = self.credentials.clear() {
            warn!(error = %format!("{error:#}"), "failed to remove stored API key");
        }
    }
}

/// Writes each lead update into the working copy and the saved search.
struct ReconcilingSink {
    tag: String,
    brief: ResearchBrief,
    workspace: Arc<Mutex<Workspace>>,
    store: Arc<Mutex<SessionStore>>,
    listener: Option<Arc<dyn ProgressListener>>,
}

impl ProgressSink for ReconcilingSink {
    fn on_lead_update(&mut self, index: usize, lead: &Lead) -> SinkControl {
        let mut ws = lock(&self.workspace);
        if !ws.owns(&self.tag) {
            debug!(session_id = %self.tag, lead = %lead.name, "dropping stale lead update");
            return SinkControl::Stop;
        }

        match ws.leads.iter_mut().find(|existing| existing.id == lead.id) {
            Some(slot) => *slot = lead.clone(),
            None => warn!(lead = %lead.name, "lead missing from working copy"),
        }
        let session = Session::new(self.tag.clone(), self.brief.clone(), ws.leads.clone());
        if let Err(error) = lock(&self.store).upsert(session) {
            warn!(session_id = %self.tag, error = %format!("{error:#}"), "failed to save lead update");
        }
        drop(ws);

        if let Some(listener) = &self.listener {
            listener.on_lead_update(&self.tag, index, lead);
        }
        SinkControl::Continue
    }
}
