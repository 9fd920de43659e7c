//! Boundary to the generative AI service: client abstraction, the Gemini
//! HTTP client, response parsing, and the lead-domain gateway operations.

mod client;
mod error;
mod gateway;
mod gemini;
pub mod parser;
pub mod prompts;
#[cfg(any(test, feature = "testing"))]
mod scripted;

pub use client::{
    ClientError, ClientErrorKind, ClientFactory, GenerateRequest, GenerateResponse,
    GenerativeClient,
};
pub use error::{GatewayError, Operation};
pub use gateway::{AiGateway, CandidateLead, EmailDraft, LeadDetails};
pub use gemini::{GeminiClient, GeminiClientFactory};
pub use parser::{Expected, ParseError};
#[cfg(any(test, feature = "testing"))]
pub use scripted::{ScriptedClient, ScriptedFactory};
