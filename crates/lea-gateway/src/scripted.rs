//! In-process backend that replays queued responses.
//!
//! Backs the tests of every crate above the gateway; never touches the network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use lea_core::Credential;
use tokio::sync::Semaphore;

use crate::client::{
    ClientError, ClientErrorKind, ClientFactory, GenerateRequest, GenerateResponse,
    GenerativeClient,
};

struct Scripted {
    gate: Option<Arc<Semaphore>>,
    result: Result<GenerateResponse, ClientError>,
}

/// Replays queued results in FIFO order and records every request.
///
/// An empty queue answers with an `InvalidResponse` error.
#[derive(Default)]
pub struct ScriptedClient {
    queue: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, gate: Option<Arc<Semaphore>>, result: Result<GenerateResponse, ClientError>) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Scripted { gate, result });
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.push(None, Ok(GenerateResponse::text(text)));
    }

    pub fn push_response(&self, response: GenerateResponse) {
        self.push(None, Ok(response));
    }

    pub fn push_error(&self, error: ClientError) {
        self.push(None, Err(error));
    }

    /// Queue a text response that is only released once `gate` has a permit.
    pub fn push_gated_text(&self, gate: Arc<Semaphore>, text: impl Into<String>) {
        self.push(Some(gate), Ok(GenerateResponse::text(text)));
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn remaining(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl GenerativeClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, ClientError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        let next = self
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let Some(scripted) = next else {
            return Err(ClientError::new(
                ClientErrorKind::InvalidResponse,
                "no scripted response left",
            ));
        };
        if let Some(gate) = scripted.gate {
            let permit = gate.acquire().await.map_err(|_| {
                ClientError::new(ClientErrorKind::Transport, "scripted gate closed")
            })?;
            permit.forget();
        }
        scripted.result
    }
}

/// Hands out one shared [`ScriptedClient`], optionally refusing one key.
pub struct ScriptedFactory {
    client: Arc<ScriptedClient>,
    rejected_key: Option<String>,
}

impl ScriptedFactory {
    pub fn new(client: Arc<ScriptedClient>) -> Self {
        Self {
            client,
            rejected_key: None,
        }
    }

    pub fn rejecting(mut self, key: impl Into<String>) -> Self {
        self.rejected_key = Some(key.into());
        self
    }
}

impl ClientFactory for ScriptedFactory {
    fn build(&self, credential: &Credential) -> Result<Arc<dyn GenerativeClient>, ClientError> {
        if self.rejected_key.as_deref() == Some(credential.expose()) {
            return Err(ClientError::unauthorized("API key not valid."));
        }
        Ok(self.client.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_and_records_requests() {
        let client = ScriptedClient::new();
        client.push_text("first");
        client.push_error(ClientError::unauthorized("nope"));

        let first = client.generate(GenerateRequest::grounded("a")).await.unwrap();
        assert_eq!(first.text, "first");
        let second = client.generate(GenerateRequest::json("b")).await.unwrap_err();
        assert_eq!(second.kind, ClientErrorKind::Unauthorized);
        let exhausted = client.generate(GenerateRequest::json("c")).await.unwrap_err();
        assert_eq!(exhausted.kind, ClientErrorKind::InvalidResponse);

        let prompts: Vec<_> = client.requests().into_iter().map(|r| r.prompt).collect();
        assert_eq!(prompts, vec!["a", "b", "c"]);
        assert_eq!(client.remaining(), 0);
    }

    #[tokio::test]
    async fn test_gated_response_waits_for_permit() {
        let client = Arc::new(ScriptedClient::new());
        let gate = Arc::new(Semaphore::new(0));
        client.push_gated_text(gate.clone(), "late");

        let task = {
            let client = client.clone();
            tokio::spawn(async move { client.generate(GenerateRequest::grounded("x")).await })
        };
        tokio::task::yield_now().await;
        assert!(!task.is_finished());
        gate.add_permits(1);
        assert_eq!(task.await.unwrap().unwrap().text, "late");
    }
}
