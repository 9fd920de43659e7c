use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use lea_core::{AppError, BriefInput, OutputFormat, is_plain_text_document};
use lea_pipeline::{ControllerView, Phase, ProgressListener, SessionController};
use tracing::info;

use crate::context::{self, StderrProgress};
use crate::render;

const NO_KEY_HINT: &str = "No API key stored. Run `lea key set` first.";

/// Assemble the brief input, appending each attached document to the
/// service description.
pub(crate) fn build_brief_input(
    service_description: String,
    target_area: String,
    target_audience: String,
    service_url: Option<String>,
    attachments: &[PathBuf],
) -> Result<BriefInput> {
    let mut input = BriefInput {
        service_description,
        target_area,
        target_audience,
        service_url,
    };
    for path in attachments {
        attach_document(&mut input, path)?;
    }
    Ok(input)
}

fn attach_document(input: &mut BriefInput, path: &Path) -> Result<()> {
    if !is_plain_text_document(path) {
        return Err(AppError::UnsupportedDocument(path.display().to_string()).into());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read attachment: {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    input.append_document(&file_name, &content);
    Ok(())
}

fn open_signed_in(format: OutputFormat) -> Result<SessionController> {
    let listener: Option<Arc<dyn ProgressListener>> = match format {
        OutputFormat::Text => Some(Arc::new(StderrProgress)),
        OutputFormat::Json => None,
    };
    let controller = context::open(listener)?;
    let view = controller.bootstrap();
    if view.phase == Phase::AwaitingCredential {
        bail!("{}", view.last_error.as_deref().unwrap_or(NO_KEY_HINT));
    }
    Ok(controller)
}

pub(crate) async fn handle_search_new(input: BriefInput, format: OutputFormat) -> Result<()> {
    let controller = open_signed_in(format)?;
    let view = controller.start_new_search(input).await?;
    finish_run(&view, format)
}

pub(crate) async fn handle_search_resume(id: &str, format: OutputFormat) -> Result<()> {
    let controller = open_signed_in(format)?;
    let view = controller.resume_search(id).await?;
    finish_run(&view, format)
}

/// Render the outcome of a run. Credential and candidate failures surface as
/// errors; an empty candidate list is a notice.
fn finish_run(view: &ControllerView, format: OutputFormat) -> Result<()> {
    match (view.phase, view.last_error.as_deref()) {
        (Phase::AwaitingCredential, message) | (Phase::NewSearchForm, message) => {
            bail!("{}", message.unwrap_or(NO_KEY_HINT));
        }
        _ => {}
    }

    match format {
        OutputFormat::Json => render::print_json(view)?,
        OutputFormat::Text => {
            if let Some(notice) = &view.last_error {
                eprintln!("{notice}");
            }
            if !view.leads.is_empty() {
                print!("{}", render::view_text(view));
            }
        }
    }
    Ok(())
}

pub(crate) fn handle_search_list(format: OutputFormat) -> Result<()> {
    let controller = context::open(None)?;
    let sessions = controller.saved_searches();

    match format {
        OutputFormat::Json => render::print_json(&sessions)?,
        OutputFormat::Text => {
            if sessions.is_empty() {
                eprintln!("No saved searches.");
                return Ok(());
            }
            println!("{}", render::session_list_header());
            for session in &sessions {
                println!("{}", render::session_line(session));
            }
        }
    }
    Ok(())
}

pub(crate) fn handle_search_show(id: &str, format: OutputFormat) -> Result<()> {
    let controller = context::open(None)?;
    let view = controller.load_search(id)?;
    match format {
        OutputFormat::Json => render::print_json(&view)?,
        OutputFormat::Text => print!("{}", render::view_text(&view)),
    }
    Ok(())
}

pub(crate) fn handle_search_delete(id: &str, format: OutputFormat) -> Result<()> {
    let controller = context::open(None)?;
    let session = controller.find_search(id)?;
    controller.delete_search(&session.id)?;
    info!(session_id = %session.id, "deleted via cli");

    match format {
        OutputFormat::Json => {
            render::print_json(&serde_json::json!({ "deleted": session.id }))?
        }
        OutputFormat::Text => eprintln!("Deleted search {} ({}).", session.id, session.summary),
    }
    Ok(())
}

pub(crate) fn handle_search_email(id: &str, lead_key: &str, format: OutputFormat) -> Result<()> {
    let controller = context::open(None)?;
    let session = controller.find_search(id)?;
    let lead = session.find_lead(lead_key)?;
    let Some(copyable) = lead.copyable_email() else {
        bail!(
            "Lead '{}' has no email draft (status: {})",
            lead.name,
            lead.status
        );
    };

    match format {
        OutputFormat::Json => render::print_json(&serde_json::json!({
            "lead": lead.name,
            "to": lead.primary_contact().and_then(|contact| contact.email.clone()),
            "subject": lead.email_subject,
            "body": lead.email_body,
        }))?,
        OutputFormat::Text => println!("{copyable}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_input(attachments: &[PathBuf]) -> Result<BriefInput> {
        build_brief_input(
            "AI analytics for retailers".to_string(),
            "Austin".to_string(),
            "mid-size retailers".to_string(),
            None,
            attachments,
        )
    }

    #[test]
    fn test_attachments_are_appended_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.md");
        let deck = dir.path().join("deck.TXT");
        std::fs::write(&notes, "# Offer\nDashboards\n").unwrap();
        std::fs::write(&deck, "Pricing tiers").unwrap();

        let input = base_input(&[notes, deck]).unwrap();
        assert_eq!(
            input.service_description,
            "AI analytics for retailers\n\n--- Content from notes.md ---\n# Offer\nDashboards\n\n--- Content from deck.TXT ---\nPricing tiers"
        );
    }

    #[test]
    fn test_unsupported_attachment_is_rejected_before_reading() {
        let err = base_input(&[PathBuf::from("/nonexistent/brochure.pdf")]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::UnsupportedDocument(_))
        ));
    }

    #[test]
    fn test_missing_attachment_reports_path() {
        let err = base_input(&[PathBuf::from("/nonexistent/notes.txt")]).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/notes.txt"));
    }

    fn view(phase: Phase, last_error: Option<&str>) -> ControllerView {
        ControllerView {
            phase,
            brief: None,
            leads: Vec::new(),
            session_id: None,
            last_error: last_error.map(ToOwned::to_owned),
        }
    }

    #[test]
    fn test_finish_run_surfaces_credential_reset() {
        let err = finish_run(
            &view(
                Phase::AwaitingCredential,
                Some("API Key Error: bad. Please re-enter your API key."),
            ),
            OutputFormat::Json,
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("API Key Error"));
    }

    #[test]
    fn test_finish_run_surfaces_candidate_failure() {
        let err = finish_run(
            &view(Phase::NewSearchForm, Some("Failed to fetch initial leads: x")),
            OutputFormat::Text,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Failed to fetch initial leads"));
    }

    #[test]
    fn test_finish_run_treats_empty_result_as_notice() {
        finish_run(
            &view(Phase::Dashboard, Some(lea_pipeline::NO_LEADS_NOTICE)),
            OutputFormat::Text,
        )
        .unwrap();
    }
}
