// Tests for configuration loading
//
// Environment overrides are not exercised here: tests run in parallel and
// share one process environment.

use anyhow::Result;
use live_transcribe::{Config, SessionConfig};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_missing_file_gives_defaults() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("absent");

    let config = Config::load(path.to_str().unwrap())?;

    assert_eq!(config.service.name, "live-transcribe");
    assert_eq!(config.service.http.bind, "127.0.0.1");
    assert_eq!(config.service.http.port, 3030);
    assert_eq!(
        config.transcription.endpoint,
        "ws://localhost:8080/ws/transcribe"
    );
    assert_eq!(config.audio.sample_rate, 16000, "Default should be 16kHz");
    assert_eq!(config.audio.chunk_duration_ms, 3000);
    assert_eq!(config.audio.channels, 1, "Default should be mono");

    Ok(())
}

#[test]
fn test_file_overrides_only_what_it_names() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("live-transcribe.toml");
    fs::write(
        &path,
        r#"
[transcription]
endpoint = "ws://gpu-box:9000/ws/transcribe"

[audio]
chunk_duration_ms = 1500

[service.http]
port = 8088
"#,
    )?;

    let config = Config::load(path.to_str().unwrap())?;

    assert_eq!(config.transcription.endpoint, "ws://gpu-box:9000/ws/transcribe");
    assert_eq!(config.audio.chunk_duration_ms, 1500);
    assert_eq!(config.service.http.port, 8088);

    // Untouched values keep their defaults
    assert_eq!(config.audio.sample_rate, 16000);
    assert_eq!(config.service.http.bind, "127.0.0.1");

    Ok(())
}

#[test]
fn test_malformed_file_is_an_error() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("broken.toml");
    fs::write(&path, "[audio\nsample_rate = ")?;

    assert!(Config::load(path.to_str().unwrap()).is_err());

    Ok(())
}

#[test]
fn test_session_config_from_config() {
    let mut config = Config::default();
    config.transcription.endpoint = "ws://example:1234/ws".to_string();
    config.audio.chunk_duration_ms = 2500;
    config.audio.channels = 2;

    let session = SessionConfig::from(&config);

    assert_eq!(session.endpoint, "ws://example:1234/ws");
    assert_eq!(session.chunk_duration, Duration::from_millis(2500));
    assert_eq!(session.sample_rate, 16000);
    assert_eq!(session.channels, 2);
}

#[test]
fn test_session_config_default_matches_config_default() {
    let from_config = SessionConfig::from(&Config::default());
    let default = SessionConfig::default();

    assert_eq!(from_config.endpoint, default.endpoint);
    assert_eq!(from_config.sample_rate, default.sample_rate);
    assert_eq!(from_config.chunk_duration, default.chunk_duration);
    assert_eq!(from_config.channels, default.channels);
}
