//! Prompt templates for the three gateway operations.

use lea_core::{ContactInfo, ResearchBrief};

fn business_context(brief: &ResearchBrief, emulate_style: bool) -> String {
    let mut context = format!(
        "My business offers services described as: \"{}\".",
        brief.service_description()
    );
    if let Some(url) = brief.service_url() {
        context.push_str(&format!(
            "\nMy business website for additional context, tone, and style is: {url}."
        ));
        if emulate_style {
            context.push_str(" Please try to emulate this style if appropriate.");
        }
    }
    context
}

pub fn candidate_leads(brief: &ResearchBrief, max_leads: usize) -> String {
    format!(
        r#"{context}

Using Google Search, find a list of up to {max_leads} REAL business names that fit the description of "{audience}" located in or primarily serving the "{area}" area.
These businesses should be potential leads for my company. Consider various types of businesses that would match the audience description.
Return the list as a JSON array of objects, where each object has a "name" key. For example: [{{"name": "Real Example Corp"}}, {{"name": "Local Actual Biz"}}].
Do not include any other text, comments, or explanations outside the JSON array. If no plausible leads can be found, return an empty array []."#,
        context = business_context(brief, false),
        audience = brief.target_audience(),
        area = brief.target_area(),
    )
}

pub fn lead_details(lead_name: &str, brief: &ResearchBrief) -> String {
    format!(
        r#"{context}

For the REAL company named "{lead_name}", a potential lead fitting the description "{audience}" that could benefit from my services, use Google Search to find 2-3 distinct, VERIFIABLE pieces of personalized information or recent news that could be used in a personalized cold outreach email.
Also find up to 3 publicly listed contacts at "{lead_name}" who would be relevant for this outreach. For each contact give "name", "role", and where publicly available "email" and "phone". Mark at most one contact, the best person to address, with "isPrimary": true.
Return a JSON object with a "details" key holding an array of strings and a "contacts" key holding an array of contact objects (use [] when none are found).
For example: {{"details": ["Announced expansion into the European market on their blog."], "contacts": [{{"name": "Jane Doe", "role": "Head of Operations", "email": "jane@example.com", "isPrimary": true}}]}}
Do not include any other text, comments, or explanations outside the JSON object."#,
        context = business_context(brief, false),
        audience = brief.target_audience(),
    )
}

pub fn email_draft(
    lead_name: &str,
    details: &[String],
    contacts: &[ContactInfo],
    brief: &ResearchBrief,
) -> String {
    let facts = if details.is_empty() {
        "- (no specific details were found)".to_string()
    } else {
        details
            .iter()
            .map(|detail| format!("- {detail}"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let greeting = salutation(lead_name, contacts);

    format!(
        r#"{context}

I am writing an outreach email to "{lead_name}", a company fitting the description "{audience}".
Here is personalized information gathered about them with web search:
{facts}

Craft a highly personalized cold outreach email to "{lead_name}". The email should:
1. Have a compelling and relevant subject line.
2. Open with a personalized reference to one or more of the facts above.
3. Explain concisely how my services can benefit "{lead_name}", connected to the needs implied by those facts.
4. Keep a professional, respectful, and engaging tone.
5. End with a clear, polite call to action such as a brief introductory call.
6. Begin the body with the salutation "{greeting}" and use no placeholders like "[Your Name]" or "[Company]".

Return the email as a JSON object with exactly two keys, "subject" and "body"."#,
        context = business_context(brief, true),
        audience = brief.target_audience(),
    )
}

/// `"Dear {name},"` for a named primary contact, else a team greeting.
pub fn salutation(lead_name: &str, contacts: &[ContactInfo]) -> String {
    let primary_name = contacts
        .iter()
        .find(|contact| contact.primary())
        .and_then(|contact| contact.name.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty());
    match primary_name {
        Some(name) => format!("Dear {name},"),
        None => format!("Dear {lead_name} Team,"),
    }
}
