//! Gemini `generateContent` REST client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lea_config::GatewayConfig;
use lea_core::{Citation, Credential};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{
    ClientError, ClientErrorKind, ClientFactory, GenerateRequest, GenerateResponse,
    GenerativeClient,
};

const API_KEY_HEADER: &str = "x-goog-api-key";
const JSON_MIME_TYPE: &str = "application/json";

pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(config: &GatewayConfig, credential: &Credential) -> Result<Self, ClientError> {
        let mut key = HeaderValue::from_str(credential.expose().trim())
            .map_err(|_| ClientError::unauthorized("API key contains invalid characters."))?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|err| {
                ClientError::new(
                    ClientErrorKind::Other,
                    format!("Failed to build HTTP client: {err}"),
                )
            })?;

        Ok(Self {
            http,
            endpoint: endpoint(&config.base_url, &config.model),
        })
    }
}

#[async_trait]
impl GenerativeClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, ClientError> {
        let body = build_request_body(&request);
        tracing::debug!(
            web_search = request.web_search,
            json_output = request.json_output,
            prompt_chars = request.prompt.len(),
            "sending generateContent request"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(classify_failure(status, &text));
        }
        parse_generate_response(&text)
    }
}

/// Builds a [`GeminiClient`] per credential from shared gateway settings.
pub struct GeminiClientFactory {
    config: GatewayConfig,
}

impl GeminiClientFactory {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }
}

impl ClientFactory for GeminiClientFactory {
    fn build(&self, credential: &Credential) -> Result<Arc<dyn GenerativeClient>, ClientError> {
        Ok(Arc::new(GeminiClient::new(&self.config, credential)?))
    }
}

fn endpoint(base_url: &str, model: &str) -> String {
    format!(
        "{}/models/{}:generateContent",
        base_url.trim_end_matches('/'),
        model
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestBody<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

fn build_request_body(request: &GenerateRequest) -> Value {
    let tools = if request.web_search {
        vec![serde_json::json!({ "googleSearch": {} })]
    } else {
        Vec::new()
    };
    // Gemini rejects a JSON mime type alongside the search tool.
    let generation_config = (request.json_output && !request.web_search).then_some(
        GenerationConfig {
            response_mime_type: JSON_MIME_TYPE,
        },
    );
    let body = RequestBody {
        contents: vec![Content {
            role: "user",
            parts: vec![TextPart {
                text: &request.prompt,
            }],
        }],
        tools,
        generation_config,
    };
    serde_json::to_value(body).unwrap_or(Value::Null)
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct ResponseEnvelope {
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct GroundingMetadata {
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GroundingChunk {
    web: Option<WebSource>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}

fn parse_generate_response(body: &str) -> Result<GenerateResponse, ClientError> {
    let envelope: ResponseEnvelope = serde_json::from_str(body).map_err(|err| {
        ClientError::new(
            ClientErrorKind::InvalidResponse,
            format!("Malformed generateContent response: {err}"),
        )
    })?;

    let Some(candidate) = envelope.candidates.into_iter().next() else {
        let reason = envelope
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(ClientError::new(
            ClientErrorKind::InvalidResponse,
            format!("Model returned no content ({reason})."),
        ));
    };

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate
            .finish_reason
            .unwrap_or_else(|| "empty response".to_string());
        return Err(ClientError::new(
            ClientErrorKind::InvalidResponse,
            format!("Model returned no text ({reason})."),
        ));
    }

    let citations = candidate
        .grounding_metadata
        .map(|metadata| {
            metadata
                .grounding_chunks
                .into_iter()
                .filter_map(|chunk| chunk.web)
                .filter_map(|web| {
                    let uri = web.uri.filter(|uri| !uri.trim().is_empty())?;
                    Some(Citation {
                        uri,
                        title: web.title.unwrap_or_default(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(GenerateResponse { text, citations })
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ErrorBody {
    message: String,
    status: String,
    details: Vec<ErrorDetail>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ErrorDetail {
    reason: Option<String>,
}

fn classify_failure(status: StatusCode, body: &str) -> ClientError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);
    let (message, api_status, reasons) = match parsed {
        Some(error) => {
            let reasons: Vec<String> = error
                .details
                .into_iter()
                .filter_map(|detail| detail.reason)
                .collect();
            (error.message, error.status, reasons)
        }
        None => (body.trim().to_string(), String::new(), Vec::new()),
    };
    let message = if message.is_empty() {
        format!("HTTP {status}")
    } else {
        message
    };

    let auth_reason = reasons.iter().any(|reason| reason == "API_KEY_INVALID");
    let kind = if status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || auth_reason
        || matches!(api_status.as_str(), "UNAUTHENTICATED" | "PERMISSION_DENIED")
    {
        ClientErrorKind::Unauthorized
    } else if status == StatusCode::TOO_MANY_REQUESTS || api_status == "RESOURCE_EXHAUSTED" {
        ClientErrorKind::RateLimited
    } else if status.is_server_error() {
        ClientErrorKind::Unavailable
    } else {
        ClientErrorKind::Other
    };

    tracing::warn!(%status, %kind, "generateContent request failed");
    ClientError::new(kind, message)
}

fn transport_error(err: reqwest::Error) -> ClientError {
    let kind = if err.is_timeout() || err.is_connect() {
        ClientErrorKind::Transport
    } else if err.is_decode() {
        ClientErrorKind::InvalidResponse
    } else {
        ClientErrorKind::Other
    };
    // Strip the URL so request details never reach user-facing messages.
    ClientError::new(kind, format!("Request to AI service failed: {}", err.without_url()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        assert_eq!(
            endpoint("https://host/v1beta/", "gemini-2.5-flash"),
            "https://host/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_grounded_body_has_search_tool_and_no_mime_type() {
        let body = build_request_body(&GenerateRequest::grounded("find companies"));
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "find companies");
        assert!(body["tools"][0]["googleSearch"].is_object());
        assert!(body.get("generationConfig").is_none());
    }

    #[test]
    fn test_json_body_has_mime_type_and_no_tools() {
        let body = build_request_body(&GenerateRequest::json("draft"));
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_parse_joins_parts_and_collects_citations() {
        let body = r#"{
          "candidates": [{
            "content": {"role": "model", "parts": [{"text": "[{\"name\":"}, {"text": "\"Acme\"}]"}]},
            "finishReason": "STOP",
            "groundingMetadata": {
              "groundingChunks": [
                {"web": {"uri": "https://acme.example", "title": "acme.example"}},
                {"web": {"uri": "https://news.example/acme"}},
                {"web": {"uri": "  "}},
                {"retrievedContext": {}}
              ]
            }
          }]
        }"#;
        let response = parse_generate_response(body).unwrap();
        assert_eq!(response.text, r#"[{"name":"Acme"}]"#);
        assert_eq!(
            response.citations,
            vec![
                Citation {
                    uri: "https://acme.example".into(),
                    title: "acme.example".into()
                },
                Citation {
                    uri: "https://news.example/acme".into(),
                    title: String::new()
                },
            ]
        );
    }

    #[test]
    fn test_parse_blocked_prompt_reports_reason() {
        let err = parse_generate_response(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#)
            .unwrap_err();
        assert_eq!(err.kind, ClientErrorKind::InvalidResponse);
        assert!(err.message.contains("SAFETY"));
    }

    #[test]
    fn test_parse_empty_text_is_invalid() {
        let err = parse_generate_response(
            r#"{"candidates": [{"content": {"parts": []}, "finishReason": "MAX_TOKENS"}]}"#,
        )
        .unwrap_err();
        assert_eq!(err.kind, ClientErrorKind::InvalidResponse);
        assert!(err.message.contains("MAX_TOKENS"));
    }

    #[test]
    fn test_classify_invalid_key() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.",
            "status": "INVALID_ARGUMENT", "details": [{"@type": "type.googleapis.com/google.rpc.ErrorInfo", "reason": "API_KEY_INVALID"}]}}"#;
        let err = classify_failure(StatusCode::BAD_REQUEST, body);
        assert_eq!(err.kind, ClientErrorKind::Unauthorized);
        assert_eq!(
            err.message,
            "API key not valid. Please pass a valid API key."
        );
    }

    #[test]
    fn test_classify_status_codes() {
        assert_eq!(
            classify_failure(StatusCode::FORBIDDEN, "").kind,
            ClientErrorKind::Unauthorized
        );
        assert_eq!(
            classify_failure(
                StatusCode::TOO_MANY_REQUESTS,
                r#"{"error": {"message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#
            )
            .kind,
            ClientErrorKind::RateLimited
        );
        let unavailable = classify_failure(StatusCode::SERVICE_UNAVAILABLE, "overloaded");
        assert_eq!(unavailable.kind, ClientErrorKind::Unavailable);
        assert_eq!(unavailable.message, "overloaded");
        let other = classify_failure(StatusCode::NOT_FOUND, "");
        assert_eq!(other.kind, ClientErrorKind::Other);
        assert_eq!(other.message, "HTTP 404 Not Found");
    }

    #[test]
    fn test_factory_rejects_unprintable_key() {
        let factory = GeminiClientFactory::new(GatewayConfig::default());
        let err = factory
            .build(&Credential::new("bad\nkey"))
            .err()
            .unwrap();
        assert_eq!(err.kind, ClientErrorKind::Unauthorized);

        assert!(factory.build(&Credential::new("AIzaSyExample1234")).is_ok());
    }
}
