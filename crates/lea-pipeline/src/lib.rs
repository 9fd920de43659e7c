//! Lead enrichment: the sequential per-lead pipeline and the controller that
//! drives searches, credentials and saved-search reconciliation around it.

mod controller;
mod pipeline;

pub use controller::{
    ControllerError, ControllerView, Phase, ProgressListener, SessionController,
    NO_LEADS_NOTICE, STORED_KEY_INVALID,
};
pub use pipeline::{EnrichmentPipeline, ProgressSink, RunOutcome, RunReport, SinkControl};
