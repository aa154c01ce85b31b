use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Command posted by the coordinator to the transport worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerCommand {
    /// Open the connection to the transcription server.
    Connect { endpoint: String },
    /// Forward one audio chunk. The buffer is owned by the worker from here on.
    SendChunk { buffer: Vec<u8> },
    /// Close the connection. Not acknowledged beyond a later `Disconnected`.
    Disconnect,
}

/// Event emitted by the transport worker back to the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    Connected,
    Disconnected { reason: String },
    Result(ResultKind),
    Error { message: String },
    /// A server message with a tag this version does not understand.
    Unknown { tag: String },
}

/// Payload of a `RESULT` event.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultKind {
    /// One transcribed fragment; exactly one is expected per accepted chunk.
    Transcription {
        text: String,
        timestamp: Option<f64>,
        audio_file: Option<String>,
    },
    /// Non-fatal notice from the server (e.g. a dropped chunk).
    Warning { message: String },
    /// Server-assigned session identifier.
    SessionInfo { session_id: String },
}

/// JSON text frame sent by the transcription server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Transcription {
        text: String,
        #[serde(default)]
        timestamp: Option<f64>,
        #[serde(default)]
        audio_file: Option<String>,
    },
    Warning {
        message: String,
    },
    SessionInit {
        session_id: String,
    },
    #[serde(other)]
    Other,
}

impl WorkerEvent {
    /// Classify a server text frame.
    ///
    /// Frames with an unrecognised `type` become [`WorkerEvent::Unknown`];
    /// frames that are not JSON objects or carry no `type` are an error.
    pub fn from_server_text(text: &str) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let event = match serde_json::from_value::<ServerMessage>(value)? {
            ServerMessage::Transcription {
                text,
                timestamp,
                audio_file,
            } => WorkerEvent::Result(ResultKind::Transcription {
                text,
                timestamp,
                audio_file,
            }),
            ServerMessage::Warning { message } => {
                WorkerEvent::Result(ResultKind::Warning { message })
            }
            ServerMessage::SessionInit { session_id } => {
                WorkerEvent::Result(ResultKind::SessionInfo { session_id })
            }
            ServerMessage::Other => WorkerEvent::Unknown { tag },
        };

        Ok(event)
    }
}
