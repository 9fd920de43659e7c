//! Domain types shared by every lead-enricher crate: research briefs, leads and
//! their status machine, saved sessions, and the error taxonomy.

pub mod brief;
pub mod error;
pub mod types;

pub use brief::{BriefField, BriefInput, ResearchBrief, is_plain_text_document};
pub use error::{AppError, FieldError, ValidationErrors};
pub use types::{
    Citation, ContactInfo, Credential, Lead, LeadStatus, OutputFormat, Session, new_id,
};
