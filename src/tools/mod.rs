//! Tool schema catalog, argument handling, and the function dispatcher.

pub mod args;
pub mod dispatch;
pub mod registry;
pub mod units;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A request from the remote agent to invoke a named local operation.
/// Consumed once by the dispatcher; never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

/// The structured outcome of one tool call, serialized back to the agent
/// and surfaced on the event channel.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub id: String,
    pub name: String,
    pub ok: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub payload: Map<String, Value>,
}

impl ToolResult {
    pub fn success(call: &ToolCall, message: String, payload: Map<String, Value>) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            ok: true,
            message,
            payload,
        }
    }

    pub fn failure(call: &ToolCall, message: String) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            ok: false,
            message,
            payload: Map::new(),
        }
    }

    /// The wire payload acknowledged to the remote agent.
    pub fn response_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("success".to_string(), Value::Bool(self.ok));
        body.insert("message".to_string(), Value::String(self.message.clone()));
        for (key, value) in &self.payload {
            body.insert(key.clone(), value.clone());
        }
        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call_with_args(args: Value) -> ToolCall {
        ToolCall {
            id: "call-1".to_string(),
            name: "add_ingredient".to_string(),
            args: args.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_response_body_includes_payload() {
        let call = call_with_args(json!({}));
        let mut payload = Map::new();
        payload.insert("item".to_string(), json!({"name": "chicken"}));
        let result = ToolResult::success(&call, "Added chicken.".to_string(), payload);

        let body = result.response_body();
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["message"], json!("Added chicken."));
        assert_eq!(body["item"]["name"], json!("chicken"));
    }

    #[test]
    fn test_failure_carries_message_and_empty_payload() {
        let call = call_with_args(json!({}));
        let result = ToolResult::failure(&call, "unknown unit".to_string());

        assert!(!result.ok);
        assert_eq!(result.id, "call-1");
        let body = result.response_body();
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["message"], json!("unknown unit"));
    }

    #[test]
    fn test_tool_call_deserializes_without_args() {
        let call: ToolCall =
            serde_json::from_value(json!({"id": "x", "name": "list_inventory"})).unwrap();
        assert!(call.args.is_empty());
    }
}
