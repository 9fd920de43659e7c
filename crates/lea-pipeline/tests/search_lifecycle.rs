use std::sync::{Arc, Mutex};

use lea_core::{BriefInput, Lead, LeadStatus};
use lea_gateway::{AiGateway, ClientError, ScriptedClient, ScriptedFactory};
use lea_pipeline::{Phase, ProgressListener, SessionController};
use lea_session::{CredentialStore, FileKvStore, SessionStore};

#[derive(Default)]
struct Collected(Mutex<Vec<(String, LeadStatus)>>);

impl ProgressListener for Collected {
    fn on_lead_update(&self, _session_id: &str, _index: usize, lead: &Lead) {
        self.0.lock().unwrap().push((lead.name.clone(), lead.status));
    }
}

fn controller(
    dir: &std::path::Path,
    client: &Arc<ScriptedClient>,
    listener: Arc<Collected>,
) -> SessionController {
    let kv = Arc::new(FileKvStore::new(dir));
    let gateway = Arc::new(AiGateway::new(
        Arc::new(ScriptedFactory::new(client.clone())),
        5,
    ));
    let store = SessionStore::load(kv.clone(), 50).unwrap();
    SessionController::new(gateway, store, CredentialStore::new(kv)).with_listener(listener)
}

fn brief_input() -> BriefInput {
    let mut input = BriefInput {
        service_description: "Bookkeeping and payroll for small teams".to_string(),
        target_area: "Leeds".to_string(),
        target_audience: "independent cafes".to_string(),
        service_url: Some("https://books.example".to_string()),
    };
    input.append_document("pricing.md", "Plans from 49 GBP per month");
    input
}

#[tokio::test]
async fn search_survives_restart_and_resumes_after_key_rejection() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(ScriptedClient::new());
    let listener = Arc::new(Collected::default());

    let first = controller(dir.path(), &client, listener.clone());
    assert_eq!(first.bootstrap().phase, Phase::AwaitingCredential);
    first.submit_credential("AIzaSyIntegration99").unwrap();

    client.push_text(
        "```json\n[{\"name\": \"Bean There\"}, {\"name\": \"Grind House\"}, {\"name\": \"Cup & Co\"}]\n```\nBased on search results.",
    );
    client.push_text(r#"{"details": ["Opened a second site in Headingley"], "contacts": []}"#);
    client.push_text(r#"{"subject": "Payroll for Bean There", "body": "Dear Bean There Team,\n\nHi."}"#);
    client.push_error(ClientError::unauthorized("API key not valid."));

    let view = first.start_new_search(brief_input()).await.unwrap();
    assert_eq!(view.phase, Phase::AwaitingCredential);
    let prompts: Vec<_> = client.requests().into_iter().map(|r| r.prompt).collect();
    assert!(prompts[0].contains("--- Content from pricing.md ---"));
    assert!(prompts[0].contains("https://books.example"));
    drop(first);

    // Fresh process: the key was discarded, the partial search was kept.
    let second = controller(dir.path(), &client, listener.clone());
    assert_eq!(second.bootstrap().phase, Phase::AwaitingCredential);
    let saved = second.saved_searches();
    assert_eq!(saved.len(), 1);
    let statuses: Vec<_> = saved[0].leads.iter().map(|l| l.status).collect();
    assert_eq!(
        statuses,
        vec![LeadStatus::Completed, LeadStatus::ErrorDetails, LeadStatus::Initial]
    );

    second.submit_credential("AIzaSyIntegration99").unwrap();
    client.push_text(r#"{"details": ["Roasts its own beans"], "contacts": [{"name": "Priya", "email": "priya@cup.example", "isPrimary": true}]}"#);
    client.push_text(r#"{"subject": "Payroll for Cup & Co", "body": "Dear Priya,\n\nHi."}"#);
    let requests_before = client.requests().len();

    let resumed = second.resume_search(&saved[0].id).await.unwrap();
    assert_eq!(resumed.phase, Phase::ResultsShown);
    assert_eq!(client.requests().len(), requests_before + 2);
    assert!(client.requests()[requests_before].prompt.contains("Cup & Co"));
    assert_eq!(resumed.leads[..2], saved[0].leads[..2]);
    assert_eq!(resumed.leads[2].status, LeadStatus::Completed);
    assert_eq!(
        resumed.leads[2].primary_contact().and_then(|c| c.email.as_deref()),
        Some("priya@cup.example")
    );

    // The resumed progress was written through to disk.
    let third = controller(dir.path(), &client, Arc::new(Collected::default()));
    third.bootstrap();
    let reloaded = third.find_search(&saved[0].id).unwrap();
    assert_eq!(reloaded.leads, resumed.leads);
    assert_eq!(
        reloaded.leads[2].copyable_email().as_deref(),
        Some("Subject: Payroll for Cup & Co\n\nDear Priya,\n\nHi.")
    );

    let updates = listener.0.lock().unwrap().clone();
    assert_eq!(
        updates,
        vec![
            ("Bean There".to_string(), LeadStatus::FetchingDetails),
            ("Bean There".to_string(), LeadStatus::FetchingEmail),
            ("Bean There".to_string(), LeadStatus::Completed),
            ("Grind House".to_string(), LeadStatus::FetchingDetails),
            ("Grind House".to_string(), LeadStatus::ErrorDetails),
            ("Cup & Co".to_string(), LeadStatus::FetchingDetails),
            ("Cup & Co".to_string(), LeadStatus::FetchingEmail),
            ("Cup & Co".to_string(), LeadStatus::Completed),
        ]
    );
    assert_eq!(
        saved[0].leads[0].copyable_email().as_deref(),
        Some("Subject: Payroll for Bean There\n\nDear Bean There Team,\n\nHi.")
    );
}
