//! The streaming transport: one websocket session per connection, driven
//! by a single owning task.
//!
//! All socket writes happen inside that task; callers talk to it through a
//! [`Command`] channel and listen on the shared [`AgentEvent`] channel.
//! That keeps frame ordering and timer bookkeeping single-threaded without
//! locks around the sink.

use super::{
    AgentError, AgentEvent, ConnectionState, SessionConfig,
    lifecycle::{Expiry, Lifecycle},
    wire::{
        Blob, ClientContent, ClientFrame, Content, GenerationConfig, Part, RealtimeInput,
        ServerFrame, Setup, ToolCatalog, ToolResponse, WireFunctionResult,
    },
};
use crate::audio::{self, PCM_MIME_TYPE};
use crate::tools::{ToolCall, dispatch::FunctionDispatcher};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use serde_json::Map;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

pub const DEFAULT_LIVE_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// What callers can ask the session task to do.
enum Command {
    SendAudio(Vec<f32>),
    SendMedia { mime_type: String, data: Vec<u8> },
    SendTurn { parts: Vec<Part> },
    Disconnect,
}

/// Handle to a live session. Dropping it without calling
/// [`LiveClient::disconnect`] closes the command channel, which the session
/// task treats as a disconnect request.
pub struct LiveClient {
    cmd_tx: mpsc::Sender<Command>,
    handle: JoinHandle<()>,
}

impl LiveClient {
    /// Opens a streaming session. Credential and endpoint problems are
    /// reported here; everything after the spawn arrives as events.
    pub fn connect(
        config: SessionConfig,
        api_key: &str,
        dispatcher: Arc<FunctionDispatcher>,
        events: mpsc::Sender<AgentEvent>,
    ) -> Result<Self, AgentError> {
        if api_key.trim().is_empty() {
            return Err(AgentError::MissingCredential);
        }
        let base = config
            .endpoint
            .clone()
            .unwrap_or_else(|| DEFAULT_LIVE_ENDPOINT.to_string());
        let mut url = Url::parse(&base).map_err(|e| AgentError::Endpoint(e.to_string()))?;
        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(AgentError::Endpoint(format!(
                    "unsupported scheme `{other}`"
                )));
            }
        }
        url.query_pairs_mut().append_pair("key", api_key.trim());

        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let handle = tokio::spawn(run_session(url, config, dispatcher, events, cmd_rx));
        Ok(Self { cmd_tx, handle })
    }

    /// Streams a chunk of f32 microphone samples as one realtime frame.
    pub async fn send_audio(&self, samples: Vec<f32>) -> Result<(), AgentError> {
        self.command(Command::SendAudio(samples)).await
    }

    /// Streams arbitrary media (image frames, pre-encoded audio).
    pub async fn send_media(&self, mime_type: &str, data: Vec<u8>) -> Result<(), AgentError> {
        self.command(Command::SendMedia {
            mime_type: mime_type.to_string(),
            data,
        })
        .await
    }

    pub async fn send_text(&self, text: &str) -> Result<(), AgentError> {
        self.send_parts(vec![Part::text(text)]).await
    }

    /// Sends one complete user turn.
    pub async fn send_parts(&self, parts: Vec<Part>) -> Result<(), AgentError> {
        self.command(Command::SendTurn { parts }).await
    }

    /// Asks the session task to close the socket and waits for it to finish.
    pub async fn disconnect(self) {
        let _ = self.cmd_tx.send(Command::Disconnect).await;
        let _ = self.handle.await;
    }

    async fn command(&self, cmd: Command) -> Result<(), AgentError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| AgentError::Transport("session task is gone".to_string()))
    }
}

/// Session task body. Whatever happens inside, the caller sees at most one
/// terminal `Error` followed by exactly one `Disconnected`.
async fn run_session(
    url: Url,
    config: SessionConfig,
    dispatcher: Arc<FunctionDispatcher>,
    events: mpsc::Sender<AgentEvent>,
    mut cmd_rx: mpsc::Receiver<Command>,
) {
    if let Err(e) = drive(url, config, dispatcher, &events, &mut cmd_rx).await {
        warn!(error = %e, "live session ended with error");
        let _ = events.send(AgentEvent::Error(e)).await;
    }
    let _ = events.send(AgentEvent::Disconnected).await;
}

async fn drive(
    url: Url,
    config: SessionConfig,
    dispatcher: Arc<FunctionDispatcher>,
    events: &mpsc::Sender<AgentEvent>,
    cmd_rx: &mut mpsc::Receiver<Command>,
) -> Result<(), AgentError> {
    let (stream, _) = connect_async(url.as_str())
        .await
        .map_err(|e| AgentError::Transport(e.to_string()))?;
    let (mut ws_tx, mut ws_rx) = stream.split();

    let setup = ClientFrame::Setup(Setup {
        model: config.model.clone(),
        generation_config: GenerationConfig {
            response_modalities: config.response_modalities.clone(),
        },
        system_instruction: Content::system(&config.system_instruction),
        tools: vec![ToolCatalog::full()],
        output_audio_transcription: Map::new(),
    });
    send_frame(&mut ws_tx, &setup).await?;
    debug!(model = %config.model, "setup frame sent");

    let mut lifecycle = Lifecycle::new(config.timeouts.clone());
    lifecycle.arm_acceptance();
    let mut state = ConnectionState::Connecting;
    let mut response_open = false;
    let mut turn_correlated = false;

    loop {
        let deadline = lifecycle.next_deadline();
        tokio::select! {
            maybe_cmd = cmd_rx.recv() => {
                let cmd = match maybe_cmd {
                    Some(Command::Disconnect) | None => {
                        lifecycle.reset();
                        let _ = ws_tx.send(Message::Close(None)).await;
                        return Ok(());
                    }
                    Some(cmd) => cmd,
                };
                if state != ConnectionState::Connected {
                    warn!("dropping outbound frame before setup acknowledgement");
                    continue;
                }
                match cmd {
                    Command::SendAudio(samples) => {
                        let frame = ClientFrame::RealtimeInput(RealtimeInput {
                            media_chunks: vec![Blob {
                                mime_type: PCM_MIME_TYPE.to_string(),
                                data: audio::encode_base64(&audio::encode_pcm16(&samples)),
                            }],
                        });
                        send_frame(&mut ws_tx, &frame).await?;
                    }
                    Command::SendMedia { mime_type, data } => {
                        let frame = ClientFrame::RealtimeInput(RealtimeInput {
                            media_chunks: vec![Blob {
                                mime_type,
                                data: audio::encode_base64(&data),
                            }],
                        });
                        send_frame(&mut ws_tx, &frame).await?;
                    }
                    Command::SendTurn { parts } => {
                        let frame = ClientFrame::ClientContent(ClientContent {
                            turns: vec![Content::user(parts)],
                            turn_complete: true,
                        });
                        send_frame(&mut ws_tx, &frame).await?;
                        // The wire carries no correlation ids, so sends are
                        // resolved oldest-first when content arrives.
                        lifecycle.track_message(&Uuid::new_v4().to_string());
                    }
                    Command::Disconnect => unreachable!("handled above"),
                }
            }

            maybe_frame = ws_rx.next() => {
                match maybe_frame {
                    Some(Ok(Message::Text(text))) => {
                        let frame: ServerFrame = match serde_json::from_str(&text) {
                            Ok(frame) => frame,
                            Err(e) => {
                                // A bad frame costs itself, not the session.
                                warn!(error = %e, "skipping unparseable frame");
                                continue;
                            }
                        };

                        if frame.setup_complete.is_some() {
                            lifecycle.content_received();
                            state = ConnectionState::Connected;
                            info!("live session established");
                            let _ = events.send(AgentEvent::Connected).await;
                        }

                        if let Some(content) = frame.server_content {
                            lifecycle.content_received();
                            // The first content frame of a response answers
                            // the oldest outstanding send; later chunks
                            // belong to the same response.
                            if !turn_correlated {
                                lifecycle.resolve_oldest();
                                turn_correlated = true;
                            }

                            if let Some(transcript) = content.input_transcript {
                                let _ = events.send(AgentEvent::InputTranscript {
                                    text: transcript.text,
                                    is_final: true,
                                }).await;
                            }
                            if let Some(turn) = content.model_turn {
                                if !response_open {
                                    response_open = true;
                                    let _ = events.send(AgentEvent::ResponseStarted).await;
                                }
                                lifecycle.arm_heartbeat();
                                for part in turn.parts {
                                    if let Some(text) = part.text {
                                        let _ = events.send(AgentEvent::OutputText {
                                            text,
                                            is_final: false,
                                        }).await;
                                    }
                                    if let Some(blob) = part.inline_data {
                                        let _ = events.send(AgentEvent::Audio(
                                            audio::decode_base64(&blob.data),
                                        )).await;
                                    }
                                }
                            }
                            if let Some(transcript) = content.output_transcription {
                                let _ = events.send(AgentEvent::OutputTranscript {
                                    text: transcript.text,
                                    is_final: false,
                                }).await;
                            }
                            if content.turn_complete == Some(true) {
                                lifecycle.clear_heartbeat();
                                response_open = false;
                                turn_correlated = false;
                                let _ = events.send(AgentEvent::ResponseEnded).await;
                            }
                        }

                        if let Some(tool_call) = frame.tool_call {
                            lifecycle.content_received();
                            let mut results = Vec::with_capacity(tool_call.function_calls.len());
                            for fc in tool_call.function_calls {
                                let call = ToolCall {
                                    id: fc.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
                                    name: fc.name,
                                    args: fc.args,
                                };
                                let result = dispatcher.execute(&call).await;
                                results.push(WireFunctionResult {
                                    id: call.id,
                                    name: result.name.clone(),
                                    response: result.response_body(),
                                });
                                let _ = events.send(AgentEvent::ToolCallExecuted { result }).await;
                            }
                            let frame = ClientFrame::ToolResponse(ToolResponse {
                                function_responses: results,
                            });
                            send_frame(&mut ws_tx, &frame).await?;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        lifecycle.reset();
                        return Ok(());
                    }
                    Some(Ok(_)) => {} // ping/pong/binary
                    Some(Err(e)) => {
                        lifecycle.reset();
                        return Err(AgentError::Transport(e.to_string()));
                    }
                }
            }

            _ = wait_until(deadline) => {
                for expiry in lifecycle.expire(Instant::now()) {
                    match expiry {
                        // Fatal: the server never acknowledged setup.
                        Expiry::Acceptance => return Err(AgentError::AcceptanceTimeout),
                        Expiry::Message(id) => {
                            let _ = events.send(AgentEvent::Error(
                                AgentError::MessageTimeout { id },
                            )).await;
                        }
                        Expiry::Heartbeat => {
                            let _ = events.send(AgentEvent::Error(
                                AgentError::HeartbeatTimeout,
                            )).await;
                            if response_open {
                                response_open = false;
                                let _ = events.send(AgentEvent::ResponseEnded).await;
                            }
                        }
                    }
                }
            }
        }
    }
}

async fn send_frame(ws_tx: &mut WsSink, frame: &ClientFrame) -> Result<(), AgentError> {
    let json = serde_json::to_string(frame).map_err(|e| AgentError::Protocol(e.to_string()))?;
    ws_tx
        .send(Message::text(json))
        .await
        .map_err(|e| AgentError::Transport(e.to_string()))
}

/// Sleeps until the deadline, or forever when no timer is armed.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Timeouts;
    use crate::store::{KitchenStore, MemoryStore};
    use serde_json::{Value, json};
    use std::future::Future;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    type ServerSocket = WebSocketStream<TcpStream>;

    /// Binds a local websocket server running `script` for one connection.
    async fn ws_server<F, Fut>(script: F) -> String
    where
        F: FnOnce(ServerSocket) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let socket = accept_async(stream).await.unwrap();
            script(socket).await;
        });
        format!("ws://{addr}")
    }

    async fn read_json(socket: &mut ServerSocket) -> Value {
        loop {
            match socket.next().await.unwrap().unwrap() {
                Message::Text(text) => return serde_json::from_str(&text).unwrap(),
                Message::Close(_) => panic!("peer closed while a frame was expected"),
                _ => continue,
            }
        }
    }

    async fn send_json(socket: &mut ServerSocket, value: Value) {
        socket
            .send(Message::text(value.to_string()))
            .await
            .unwrap();
    }

    fn session_config(endpoint: String, timeouts: Timeouts) -> SessionConfig {
        let mut config = SessionConfig::live("models/test", "You are a kitchen assistant.");
        config.endpoint = Some(endpoint);
        config.timeouts = timeouts;
        config
    }

    fn short_timeouts() -> Timeouts {
        Timeouts {
            acceptance: Duration::from_millis(200),
            per_message: Duration::from_millis(500),
            heartbeat: Duration::from_millis(150),
        }
    }

    fn connect_to(
        endpoint: String,
        timeouts: Timeouts,
        store: Arc<MemoryStore>,
    ) -> (LiveClient, mpsc::Receiver<AgentEvent>) {
        let (tx, rx) = mpsc::channel(64);
        let dispatcher = Arc::new(FunctionDispatcher::new(store));
        let client = LiveClient::connect(
            session_config(endpoint, timeouts),
            "test-key",
            dispatcher,
            tx,
        )
        .unwrap();
        (client, rx)
    }

    async fn next_event(rx: &mut mpsc::Receiver<AgentEvent>) -> AgentEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("event within 2s")
            .expect("event channel open")
    }

    async fn collect_until_disconnect(rx: &mut mpsc::Receiver<AgentEvent>) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        loop {
            let event = next_event(rx).await;
            let done = matches!(event, AgentEvent::Disconnected);
            events.push(event);
            if done {
                return events;
            }
        }
    }

    #[tokio::test]
    async fn test_silent_server_times_out_exactly_once() {
        // The server reads setup and never acknowledges it.
        let endpoint = ws_server(|mut socket| async move {
            let setup = read_json(&mut socket).await;
            assert!(setup["setup"]["model"].is_string());
            tokio::time::sleep(Duration::from_secs(5)).await;
        })
        .await;

        let store = Arc::new(MemoryStore::new());
        let (_client, mut rx) = connect_to(endpoint, short_timeouts(), store);

        let events = collect_until_disconnect(&mut rx).await;
        let timeouts = events
            .iter()
            .filter(|e| matches!(e, AgentEvent::Error(AgentError::AcceptanceTimeout)))
            .count();
        assert_eq!(timeouts, 1);
        assert!(matches!(events.last(), Some(AgentEvent::Disconnected)));
        assert!(!events.iter().any(|e| matches!(e, AgentEvent::Connected)));
    }

    #[tokio::test]
    async fn test_streamed_response_reaches_the_event_surface() {
        let endpoint = ws_server(|mut socket| async move {
            let _setup = read_json(&mut socket).await;
            send_json(&mut socket, json!({"setupComplete": {}})).await;
            for chunk in ["You have ", "two pounds ", "of chicken."] {
                send_json(
                    &mut socket,
                    json!({"serverContent": {"modelTurn": {"parts": [{"text": chunk}]}}}),
                )
                .await;
            }
            send_json(&mut socket, json!({"serverContent": {"turnComplete": true}})).await;
            // Hold the socket open until the client closes it.
            while socket.next().await.is_some() {}
        })
        .await;

        let store = Arc::new(MemoryStore::new());
        let (client, mut rx) = connect_to(endpoint, short_timeouts(), store);

        assert!(matches!(next_event(&mut rx).await, AgentEvent::Connected));

        let mut events = Vec::new();
        loop {
            let event = next_event(&mut rx).await;
            let done = matches!(event, AgentEvent::ResponseEnded);
            events.push(event);
            if done {
                break;
            }
        }

        let starts = events
            .iter()
            .filter(|e| matches!(e, AgentEvent::ResponseStarted))
            .count();
        assert_eq!(starts, 1);
        let text: String = events
            .iter()
            .filter_map(|e| match e {
                AgentEvent::OutputText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "You have two pounds of chicken.");
        assert!(!events.iter().any(|e| matches!(e, AgentEvent::Error(_))));

        client.disconnect().await;
    }

    #[tokio::test]
    async fn test_stalled_response_fires_heartbeat_and_force_closes_it() {
        let endpoint = ws_server(|mut socket| async move {
            let _setup = read_json(&mut socket).await;
            send_json(&mut socket, json!({"setupComplete": {}})).await;
            send_json(
                &mut socket,
                json!({"serverContent": {"modelTurn": {"parts": [{"text": "Let me"}]}}}),
            )
            .await;
            // Never finishes the turn.
            while socket.next().await.is_some() {}
        })
        .await;

        let store = Arc::new(MemoryStore::new());
        let (client, mut rx) = connect_to(endpoint, short_timeouts(), store);

        let mut saw_heartbeat_error = false;
        let mut saw_forced_end = false;
        loop {
            match next_event(&mut rx).await {
                AgentEvent::Error(AgentError::HeartbeatTimeout) => saw_heartbeat_error = true,
                AgentEvent::ResponseEnded => {
                    saw_forced_end = true;
                    break;
                }
                _ => {}
            }
        }
        assert!(saw_heartbeat_error);
        assert!(saw_forced_end);

        // The session itself survives a heartbeat expiry.
        client.send_text("still there?").await.unwrap();
        client.disconnect().await;
    }

    #[tokio::test]
    async fn test_multi_chunk_response_resolves_only_the_message_it_answers() {
        // Two tracked turns go out; the server answers the first with a
        // chunked response and ignores the second. Each chunk belongs to
        // the first response, so the second turn's timer must still fire.
        let endpoint = ws_server(|mut socket| async move {
            let _setup = read_json(&mut socket).await;
            send_json(&mut socket, json!({"setupComplete": {}})).await;
            let first = read_json(&mut socket).await;
            assert!(first["client_content"]["turn_complete"].as_bool().unwrap());
            let _second = read_json(&mut socket).await;
            for chunk in ["Chicken ", "is in the fridge."] {
                send_json(
                    &mut socket,
                    json!({"serverContent": {"modelTurn": {"parts": [{"text": chunk}]}}}),
                )
                .await;
            }
            send_json(&mut socket, json!({"serverContent": {"turnComplete": true}})).await;
            while socket.next().await.is_some() {}
        })
        .await;

        let store = Arc::new(MemoryStore::new());
        let timeouts = Timeouts {
            per_message: Duration::from_millis(300),
            ..short_timeouts()
        };
        let (client, mut rx) = connect_to(endpoint, timeouts, store);

        assert!(matches!(next_event(&mut rx).await, AgentEvent::Connected));
        client.send_text("what do I have?").await.unwrap();
        client.send_text("and the freezer?").await.unwrap();

        let mut events = Vec::new();
        loop {
            let event = next_event(&mut rx).await;
            let done = matches!(event, AgentEvent::Error(AgentError::MessageTimeout { .. }));
            events.push(event);
            if done {
                break;
            }
        }

        // The first response completed normally before the timer fired.
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, AgentEvent::ResponseEnded))
                .count(),
            1
        );
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, AgentEvent::Error(AgentError::MessageTimeout { .. })))
                .count(),
            1
        );

        client.disconnect().await;
    }

    #[tokio::test]
    async fn test_tool_call_round_trip_mutates_store_and_answers() {
        let (seen_tx, mut seen_rx) = mpsc::channel::<Value>(1);
        let endpoint = ws_server(move |mut socket| async move {
            let _setup = read_json(&mut socket).await;
            send_json(&mut socket, json!({"setupComplete": {}})).await;
            send_json(
                &mut socket,
                json!({"toolCall": {"functionCalls": [{
                    "id": "fc-1",
                    "name": "add_ingredient",
                    "args": {"name": "milk", "quantity": 1, "unit": "l", "location": "fridge"}
                }]}}),
            )
            .await;
            let response = read_json(&mut socket).await;
            seen_tx.send(response).await.unwrap();
            while socket.next().await.is_some() {}
        })
        .await;

        let store = Arc::new(MemoryStore::new());
        let (client, mut rx) = connect_to(endpoint, short_timeouts(), store.clone());

        assert!(matches!(next_event(&mut rx).await, AgentEvent::Connected));
        match next_event(&mut rx).await {
            AgentEvent::ToolCallExecuted { result } => {
                assert!(result.ok);
                assert_eq!(result.id, "fc-1");
            }
            other => panic!("expected tool execution, got {other:?}"),
        }

        // The server received a correlated, successful tool response frame.
        let response = tokio::time::timeout(Duration::from_secs(2), seen_rx.recv())
            .await
            .unwrap()
            .unwrap();
        let entry = &response["toolResponse"]["functionResponses"][0];
        assert_eq!(entry["id"], json!("fc-1"));
        assert_eq!(entry["name"], json!("add_ingredient"));
        assert_eq!(entry["response"]["success"], json!(true));

        assert!(store.find_item("milk").await.unwrap().is_some());
        client.disconnect().await;
    }

    #[tokio::test]
    async fn test_unparseable_frame_is_skipped_not_fatal() {
        let endpoint = ws_server(|mut socket| async move {
            let _setup = read_json(&mut socket).await;
            socket.send(Message::text("not json at all")).await.unwrap();
            send_json(&mut socket, json!({"setupComplete": {}})).await;
            while socket.next().await.is_some() {}
        })
        .await;

        let store = Arc::new(MemoryStore::new());
        let (client, mut rx) = connect_to(endpoint, short_timeouts(), store);

        // The garbage frame is dropped and the session still comes up.
        assert!(matches!(next_event(&mut rx).await, AgentEvent::Connected));
        client.disconnect().await;
    }

    #[tokio::test]
    async fn test_transcripts_and_audio_are_forwarded() {
        let pcm = audio::encode_base64(&audio::encode_pcm16(&[0.5_f32, -0.5]));
        let endpoint = ws_server(move |mut socket| async move {
            let _setup = read_json(&mut socket).await;
            send_json(&mut socket, json!({"setupComplete": {}})).await;
            send_json(
                &mut socket,
                json!({"serverContent": {
                    "inputTranscript": {"text": "add milk please"},
                    "modelTurn": {"parts": [
                        {"inlineData": {"mimeType": "audio/pcm;rate=16000", "data": pcm}}
                    ]},
                    "outputTranscription": {"text": "Adding milk"},
                    "turnComplete": true
                }}),
            )
            .await;
            while socket.next().await.is_some() {}
        })
        .await;

        let store = Arc::new(MemoryStore::new());
        let (client, mut rx) = connect_to(endpoint, short_timeouts(), store);

        assert!(matches!(next_event(&mut rx).await, AgentEvent::Connected));
        let mut events = Vec::new();
        loop {
            let event = next_event(&mut rx).await;
            let done = matches!(event, AgentEvent::ResponseEnded);
            events.push(event);
            if done {
                break;
            }
        }

        assert!(events.iter().any(|e| matches!(
            e,
            AgentEvent::InputTranscript { text, is_final: true } if text == "add milk please"
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            AgentEvent::OutputTranscript { text, .. } if text == "Adding milk"
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            AgentEvent::Audio(bytes) if bytes.len() == 4
        )));

        client.disconnect().await;
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_spawning() {
        let (tx, _rx) = mpsc::channel(1);
        let dispatcher = Arc::new(FunctionDispatcher::new(Arc::new(MemoryStore::new())));
        let Err(err) = LiveClient::connect(
            SessionConfig::live("models/test", "sys"),
            "",
            dispatcher,
            tx,
        ) else {
            panic!("empty credential must be rejected");
        };
        assert!(matches!(err, AgentError::MissingCredential));
    }

    #[tokio::test]
    async fn test_non_websocket_scheme_is_rejected() {
        let (tx, _rx) = mpsc::channel(1);
        let dispatcher = Arc::new(FunctionDispatcher::new(Arc::new(MemoryStore::new())));
        let mut config = SessionConfig::live("models/test", "sys");
        config.endpoint = Some("https://example.com".to_string());
        let Err(err) = LiveClient::connect(config, "test-key", dispatcher, tx) else {
            panic!("non-websocket scheme must be rejected");
        };
        assert!(matches!(err, AgentError::Endpoint(_)));
    }
}
