//! Text rendering of searches and leads.

use std::fmt::Write as _;

use chrono::Local;
use lea_core::{Lead, ResearchBrief, Session};
use lea_pipeline::ControllerView;
use serde::Serialize;

const SHORT_ID_LEN: usize = 11;

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn short_id(id: &str) -> &str {
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

pub(crate) fn session_list_header() -> String {
    format!("{:<11}  {:<16}  {:>5}  SUMMARY", "SEARCH", "SAVED", "LEADS")
}

/// One line of the saved-search list: id, local time, lead count, summary.
pub(crate) fn session_line(session: &Session) -> String {
    let saved = session
        .timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M");
    let pending = session.pending_leads();
    let leads = if pending == 0 {
        session.leads.len().to_string()
    } else {
        format!("{}*", session.leads.len())
    };
    format!(
        "{:<11}  {:<16}  {:>5}  {}",
        short_id(&session.id),
        saved,
        leads,
        session.summary
    )
}

pub(crate) fn brief_block(brief: &ResearchBrief) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Audience: {}", brief.target_audience());
    let _ = writeln!(out, "Area:     {}", brief.target_area());
    if let Some(url) = brief.service_url() {
        let _ = writeln!(out, "Website:  {url}");
    }
    let _ = writeln!(out, "Service:  {}", first_line(brief.service_description()));
    out
}

pub(crate) fn lead_block(index: usize, lead: &Lead) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}. {} [{}]", index + 1, lead.name, lead.status);
    if let Some(message) = &lead.error_message {
        let _ = writeln!(out, "   error: {message}");
    }
    for detail in lead.details_or_empty() {
        let _ = writeln!(out, "   - {detail}");
    }
    for contact in lead.contacts_or_empty() {
        let mut parts = Vec::new();
        if let Some(name) = &contact.name {
            parts.push(name.clone());
        }
        if let Some(role) = &contact.role {
            parts.push(format!("({role})"));
        }
        if let Some(email) = &contact.email {
            parts.push(format!("<{email}>"));
        }
        if let Some(phone) = &contact.phone {
            parts.push(phone.clone());
        }
        if parts.is_empty() {
            continue;
        }
        let marker = if contact.primary() { "*" } else { " " };
        let _ = writeln!(out, "  {marker} contact: {}", parts.join(" "));
    }
    if let Some(subject) = &lead.email_subject {
        let _ = writeln!(out, "   email: {subject}");
    }
    for citation in &lead.grounding_metadata {
        let _ = writeln!(out, "   source: {} {}", citation.label(), citation.uri);
    }
    out
}

/// Full text rendering of a controller snapshot.
pub(crate) fn view_text(view: &ControllerView) -> String {
    let mut out = String::new();
    if let Some(id) = &view.session_id {
        let _ = writeln!(out, "Search {id} ({})", view.phase.as_str());
    } else {
        let _ = writeln!(out, "State: {}", view.phase.as_str());
    }
    if let Some(brief) = &view.brief {
        out.push_str(&brief_block(brief));
    }
    if !view.leads.is_empty() {
        out.push('\n');
        for (index, lead) in view.leads.iter().enumerate() {
            out.push_str(&lead_block(index, lead));
        }
    }
    out
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
