//! Wire frame types for both transports.
//!
//! Field casing follows the server's mixed convention: client setup,
//! realtime media and turn frames are snake_case, tool responses and all
//! inbound frames are camelCase. Aliases tolerate the camelCase spellings
//! some server builds emit for nominally snake_case fields.

use crate::tools::registry::{self, ToolDeclaration};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---- Shared content model ----

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts,
        }
    }

    pub fn model(parts: Vec<Part>) -> Self {
        Self {
            role: Some("model".to_string()),
            parts,
        }
    }

    pub fn tool(parts: Vec<Part>) -> Self {
        Self {
            role: Some("tool".to_string()),
            parts,
        }
    }

    pub fn system(text: &str) -> Self {
        Self {
            role: None,
            parts: vec![Part::text(text)],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        alias = "inlineData"
    )]
    pub inline_data: Option<Blob>,
    #[serde(
        rename = "functionCall",
        skip_serializing_if = "Option::is_none"
    )]
    pub function_call: Option<FunctionCall>,
    #[serde(
        rename = "functionResponse",
        skip_serializing_if = "Option::is_none"
    )]
    pub function_response: Option<FunctionResponse>,
}

impl Part {
    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn inline_data(mime_type: &str, data: String) -> Self {
        Self {
            inline_data: Some(Blob {
                mime_type: mime_type.to_string(),
                data,
            }),
            ..Self::default()
        }
    }

    pub fn function_response(name: &str, response: Value) -> Self {
        Self {
            function_response: Some(FunctionResponse {
                name: name.to_string(),
                response,
            }),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    #[serde(alias = "mimeType")]
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

/// The tool catalog entry of a request body.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCatalog {
    #[serde(rename = "functionDeclarations")]
    pub function_declarations: Vec<ToolDeclaration>,
}

impl ToolCatalog {
    /// The full registry catalog, as sent on both transports.
    pub fn full() -> Self {
        Self {
            function_declarations: registry::declarations().to_vec(),
        }
    }
}

// ---- Streaming transport, outbound ----

#[derive(Debug, Serialize)]
pub enum ClientFrame {
    #[serde(rename = "setup")]
    Setup(Setup),
    #[serde(rename = "realtime_input")]
    RealtimeInput(RealtimeInput),
    #[serde(rename = "client_content")]
    ClientContent(ClientContent),
    #[serde(rename = "toolResponse")]
    ToolResponse(ToolResponse),
}

#[derive(Debug, Serialize)]
pub struct Setup {
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: Content,
    pub tools: Vec<ToolCatalog>,
    pub output_audio_transcription: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct GenerationConfig {
    pub response_modalities: Vec<ResponseModality>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseModality {
    Text,
    Audio,
}

#[derive(Debug, Serialize)]
pub struct RealtimeInput {
    pub media_chunks: Vec<Blob>,
}

#[derive(Debug, Serialize)]
pub struct ClientContent {
    pub turns: Vec<Content>,
    pub turn_complete: bool,
}

#[derive(Debug, Serialize)]
pub struct ToolResponse {
    #[serde(rename = "functionResponses")]
    pub function_responses: Vec<WireFunctionResult>,
}

#[derive(Debug, Serialize)]
pub struct WireFunctionResult {
    pub id: String,
    pub name: String,
    pub response: Value,
}

// ---- Streaming transport, inbound ----

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerFrame {
    pub setup_complete: Option<Value>,
    pub server_content: Option<ServerContent>,
    pub tool_call: Option<ToolCallFrame>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerContent {
    pub model_turn: Option<Content>,
    #[serde(alias = "inputTranscription")]
    pub input_transcript: Option<Transcription>,
    pub output_transcription: Option<Transcription>,
    pub turn_complete: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct Transcription {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ToolCallFrame {
    #[serde(rename = "functionCalls", default)]
    pub function_calls: Vec<FunctionCall>,
}

// ---- Stateless transport ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub system_instruction: Content,
    pub tools: Vec<ToolCatalog>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Content,
}
