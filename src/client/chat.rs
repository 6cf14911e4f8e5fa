//! The stateless transport: one request per turn, full history snapshot,
//! synchronous tool dispatch with a bounded follow-up loop.

use super::{
    AgentError, AgentEvent, SessionConfig,
    wire::{Content, FunctionCall, GenerateRequest, GenerateResponse, Part, ToolCatalog},
};
use crate::history::ConversationHistory;
use crate::tools::{ToolCall, dispatch::FunctionDispatcher};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

/// How many times the agent may answer with tool calls before we stop
/// following up. Guards against a misbehaving agent looping forever.
pub const MAX_TOOL_ROUNDS: usize = 5;

pub const DEFAULT_GENERATE_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The seam between the follow-up loop and the network, so tests can
/// script exchanges without a server.
#[async_trait]
pub trait GenerateBackend: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, AgentError>;
}

/// Production backend: one JSON POST per exchange.
pub struct HttpBackend {
    http: reqwest::Client,
    url: Url,
}

impl HttpBackend {
    pub fn new(config: &SessionConfig, api_key: &str) -> Result<Self, AgentError> {
        if api_key.trim().is_empty() {
            return Err(AgentError::MissingCredential);
        }
        let base = config
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_GENERATE_ENDPOINT.to_string());
        let raw = format!(
            "{}/models/{}:generateContent",
            base.trim_end_matches('/'),
            config.model
        );
        let mut url = Url::parse(&raw).map_err(|e| AgentError::Endpoint(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(AgentError::Endpoint(format!(
                    "unsupported scheme `{other}`"
                )));
            }
        }
        url.query_pairs_mut().append_pair("key", api_key.trim());
        Ok(Self {
            http: reqwest::Client::new(),
            url,
        })
    }
}

#[async_trait]
impl GenerateBackend for HttpBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, AgentError> {
        let response = self
            .http
            .post(self.url.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| AgentError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Status {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| AgentError::Protocol(e.to_string()))
    }
}

/// Client for the stateless channel. `&mut self` sequencing means a new
/// send can never queue behind a stale exchange.
pub struct ChatClient {
    backend: Arc<dyn GenerateBackend>,
    dispatcher: Arc<FunctionDispatcher>,
    history: ConversationHistory,
    system_instruction: String,
    per_message: Duration,
    events: mpsc::Sender<AgentEvent>,
}

impl ChatClient {
    /// Builds a client over HTTP. Credential and endpoint problems are
    /// reported here, before any network attempt.
    pub fn new(
        config: SessionConfig,
        api_key: &str,
        dispatcher: Arc<FunctionDispatcher>,
        events: mpsc::Sender<AgentEvent>,
    ) -> Result<Self, AgentError> {
        let backend = Arc::new(HttpBackend::new(&config, api_key)?);
        Ok(Self::with_backend(config, backend, dispatcher, events))
    }

    pub fn with_backend(
        config: SessionConfig,
        backend: Arc<dyn GenerateBackend>,
        dispatcher: Arc<FunctionDispatcher>,
        events: mpsc::Sender<AgentEvent>,
    ) -> Self {
        Self {
            backend,
            dispatcher,
            history: ConversationHistory::new(config.history_cap),
            system_instruction: config.system_instruction,
            per_message: config.timeouts.per_message,
            events,
        }
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub async fn send_text(&mut self, text: &str) -> Result<String, AgentError> {
        self.send_parts(vec![Part::text(text)]).await
    }

    /// Sends one user turn and drives the exchange to a final text answer.
    pub async fn send_parts(&mut self, parts: Vec<Part>) -> Result<String, AgentError> {
        self.history.append_user_turn(parts);
        let _ = self.events.send(AgentEvent::ResponseStarted).await;

        let outcome = self.run_rounds().await;
        if let Err(e) = &outcome {
            warn!(error = %e, "stateless exchange failed");
            let _ = self.events.send(AgentEvent::Error(e.clone())).await;
        }
        let _ = self.events.send(AgentEvent::ResponseEnded).await;
        outcome
    }

    async fn run_rounds(&mut self) -> Result<String, AgentError> {
        for round in 0..MAX_TOOL_ROUNDS {
            let request = GenerateRequest {
                contents: self.history.snapshot(),
                system_instruction: Content::system(&self.system_instruction),
                tools: vec![ToolCatalog::full()],
            };

            let message_id = Uuid::new_v4().to_string();
            let response =
                match tokio::time::timeout(self.per_message, self.backend.generate(&request)).await
                {
                    Err(_) => return Err(AgentError::MessageTimeout { id: message_id }),
                    Ok(Err(e)) => return Err(e),
                    Ok(Ok(response)) => response,
                };

            let content = response
                .candidates
                .into_iter()
                .next()
                .map(|candidate| candidate.content)
                .ok_or_else(|| AgentError::Protocol("response carried no candidates".into()))?;

            let calls: Vec<FunctionCall> = content
                .parts
                .iter()
                .filter_map(|part| part.function_call.clone())
                .collect();

            if calls.is_empty() {
                let text: String = content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect();
                self.history.append_model_turn(content.parts);
                let _ = self
                    .events
                    .send(AgentEvent::OutputText {
                        text: text.clone(),
                        is_final: true,
                    })
                    .await;
                return Ok(text);
            }

            info!(round, calls = calls.len(), "agent requested tools");
            self.history.append_model_turn(content.parts);

            let mut result_parts = Vec::with_capacity(calls.len());
            for fc in calls {
                let call = ToolCall {
                    id: fc.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                    name: fc.name,
                    args: fc.args,
                };
                let result = self.dispatcher.execute(&call).await;
                result_parts.push(Part::function_response(&result.name, result.response_body()));
                let _ = self
                    .events
                    .send(AgentEvent::ToolCallExecuted { result })
                    .await;
            }
            self.history.append_tool_turn(result_parts);
        }

        Err(AgentError::ToolRounds(MAX_TOOL_ROUNDS))
    }
}
