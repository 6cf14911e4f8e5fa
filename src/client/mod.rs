//! The protocol client: two transports behind one event surface.
//!
//! [`live::LiveClient`] drives the persistent streaming connection for
//! voice sessions; [`chat::ChatClient`] drives the stateless
//! request-per-turn channel for text and vision. Both emit [`AgentEvent`]s
//! on an `mpsc` channel owned by the caller.

pub mod chat;
pub mod lifecycle;
pub mod live;
pub mod wire;

use crate::config::ConfigError;
use crate::tools::ToolResult;
use std::time::Duration;

/// Connection lifecycle of the streaming transport.
/// `Connected` is only entered after the server acknowledges setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Everything that can go wrong, by class. Configuration errors are raised
/// before any network attempt; tool-execution failures are not here at all,
/// they travel as failure [`ToolResult`]s.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no API credential was provided")]
    MissingCredential,
    #[error("invalid endpoint: {0}")]
    Endpoint(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("no content arrived within the acceptance window")]
    AcceptanceTimeout,
    #[error("no response to message {id} within the per-message window")]
    MessageTimeout { id: String },
    #[error("response stalled between chunks")]
    HeartbeatTimeout,
    #[error("malformed response: {0}")]
    Protocol(String),
    #[error("agent kept requesting tools after {0} rounds without a final answer")]
    ToolRounds(usize),
}

/// The unified event surface consumed by presentation code.
#[derive(Debug)]
pub enum AgentEvent {
    Connected,
    Disconnected,
    Error(AgentError),
    /// Transcript of the user's speech. The streaming transport delivers
    /// whole utterances, so `is_final` is true there.
    InputTranscript { text: String, is_final: bool },
    /// Text from the agent. Streaming chunks arrive with `is_final: false`;
    /// [`AgentEvent::ResponseEnded`] is the finality signal on that
    /// transport. The stateless transport delivers one final payload.
    OutputText { text: String, is_final: bool },
    /// Transcript of the agent's audio, chunked like
    /// [`AgentEvent::OutputText`].
    OutputTranscript { text: String, is_final: bool },
    /// Raw little-endian PCM16 audio from the agent.
    Audio(Vec<u8>),
    ToolCallExecuted { result: ToolResult },
    ResponseStarted,
    ResponseEnded,
}

/// The three independent timer windows of a session.
#[derive(Debug, Clone)]
pub struct Timeouts {
    /// Grace period after connecting before the first inbound frame must arrive.
    pub acceptance: Duration,
    /// Maximum wait for a response correlated to one outbound message.
    pub per_message: Duration,
    /// Maximum gap between chunks of one in-progress response.
    pub heartbeat: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            acceptance: Duration::from_secs(10),
            per_message: Duration::from_secs(30),
            heartbeat: Duration::from_secs(10),
        }
    }
}

/// Immutable per-connection settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub model: String,
    pub system_instruction: String,
    pub response_modalities: Vec<wire::ResponseModality>,
    pub history_cap: usize,
    pub timeouts: Timeouts,
    /// Overrides the default endpoint; used by tests and self-hosted proxies.
    pub endpoint: Option<String>,
}

impl SessionConfig {
    /// Settings for a streaming voice session.
    pub fn live(model: &str, system_instruction: &str) -> Self {
        Self {
            model: model.to_string(),
            system_instruction: system_instruction.to_string(),
            response_modalities: vec![wire::ResponseModality::Audio],
            history_cap: crate::history::DEFAULT_HISTORY_CAP,
            timeouts: Timeouts::default(),
            endpoint: None,
        }
    }

    /// Settings for a stateless text/vision session.
    pub fn chat(model: &str, system_instruction: &str) -> Self {
        Self {
            response_modalities: vec![wire::ResponseModality::Text],
            ..Self::live(model, system_instruction)
        }
    }
}
