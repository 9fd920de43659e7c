//! Generative backend abstraction.
//!
//! The gateway talks to a [`GenerativeClient`]; production uses the Gemini
//! REST client, tests use `ScriptedClient` (feature `testing`).

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use lea_core::{Citation, Credential};

/// One generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub prompt: String,
    /// Enable the provider's web-search grounding tool.
    pub web_search: bool,
    /// Ask for a JSON mime type. Mutually exclusive with `web_search` on Gemini.
    pub json_output: bool,
}

impl GenerateRequest {
    pub fn grounded(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            web_search: true,
            json_output: false,
        }
    }

    pub fn json(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            web_search: false,
            json_output: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateResponse {
    pub text: String,
    /// Web sources reported by grounding, in provider order.
    pub citations: Vec<Citation>,
}

impl GenerateResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            citations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    /// Key rejected, missing, or lacking permission.
    Unauthorized,
    RateLimited,
    /// Provider-side 5xx or overload.
    Unavailable,
    /// 2xx with a body we cannot use (blocked, empty, malformed envelope).
    InvalidResponse,
    /// Connection, TLS, or timeout failure.
    Transport,
    Other,
}

impl fmt::Display for ClientErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate_limited",
            Self::Unavailable => "unavailable",
            Self::InvalidResponse => "invalid_response",
            Self::Transport => "transport",
            Self::Other => "other",
        };
        f.write_str(label)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ClientError {
    pub kind: ClientErrorKind,
    pub message: String,
}

impl ClientError {
    pub fn new(kind: ClientErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Unauthorized, message)
    }
}

#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, ClientError>;
}

/// Builds a client bound to one credential.
pub trait ClientFactory: Send + Sync {
    fn build(&self, credential: &Credential) -> Result<Arc<dyn GenerativeClient>, ClientError>;
}
