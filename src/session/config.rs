use crate::config::Config;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters for one streaming session
///
/// Audio parameters are passed through to the producer unmodified; the
/// coordinator never validates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// WebSocket endpoint of the transcription server
    pub endpoint: String,

    /// Sample rate of the produced audio (the server expects 16kHz)
    pub sample_rate: u32,

    /// Duration of each chunk handed to the transport
    /// Default: 3 seconds
    pub chunk_duration: Duration,

    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://localhost:8080/ws/transcribe".to_string(),
            sample_rate: 16000,                    // Whisper expects 16kHz
            chunk_duration: Duration::from_secs(3), // 3 seconds
            channels: 1,                           // Mono
        }
    }
}

impl From<&Config> for SessionConfig {
    fn from(config: &Config) -> Self {
        Self {
            endpoint: config.transcription.endpoint.clone(),
            sample_rate: config.audio.sample_rate,
            chunk_duration: Duration::from_millis(config.audio.chunk_duration_ms),
            channels: config.audio.channels,
        }
    }
}
