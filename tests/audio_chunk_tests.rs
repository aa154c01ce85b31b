// Integration tests for WAV loading and chunk encoding
//
// These tests verify that audio is split into fixed-duration segments and
// that each segment is a standalone WAV file the server can decode.

use anyhow::Result;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use live_transcribe::{AudioFile, ChunkEncoder, SessionConfig};
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn write_wav(path: &Path, spec: WavSpec, samples: &[i16]) -> Result<()> {
    let mut writer = WavWriter::create(path, spec)?;
    for &s in samples {
        writer.write_sample(s)?;
    }
    writer.finalize()?;
    Ok(())
}

fn pcm16(sample_rate: u32, channels: u16) -> WavSpec {
    WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

#[test]
fn test_open_reads_samples_and_duration() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("speech.wav");

    // 2.5 seconds of 16kHz mono
    let samples: Vec<i16> = (0..40_000).map(|i| (i % 1000) as i16).collect();
    write_wav(&path, pcm16(16000, 1), &samples)?;

    let audio = AudioFile::open(&path)?;

    assert_eq!(audio.sample_rate, 16000);
    assert_eq!(audio.channels, 1);
    assert_eq!(audio.samples, samples);
    assert_eq!(audio.frames(), 40_000);
    assert_eq!(audio.duration(), Duration::from_millis(2500));
    assert!(audio.path.ends_with("speech.wav"));
    assert!(audio.matches(&SessionConfig::default()));

    Ok(())
}

#[test]
fn test_stereo_file_layout() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("stereo.wav");

    // 1 second of 8kHz stereo
    write_wav(&path, pcm16(8000, 2), &vec![0i16; 16_000])?;

    let audio = AudioFile::open(&path)?;

    assert_eq!(audio.frames(), 8000);
    assert_eq!(audio.duration(), Duration::from_secs(1));
    assert!(!audio.matches(&SessionConfig::default()));

    let chunks = audio.encoder(Duration::from_millis(250)).split(&audio.samples)?;
    assert_eq!(chunks.len(), 4);
    assert!(chunks.iter().all(|c| c.sample_count == 4000));

    Ok(())
}

#[test]
fn test_open_rejects_float_wav() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("float.wav");

    let spec = WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(&path, spec)?;
    for _ in 0..160 {
        writer.write_sample(0.0f32)?;
    }
    writer.finalize()?;

    let err = AudioFile::open(&path).err().expect("float WAV should be rejected");
    assert!(err.to_string().contains("Unsupported WAV format"));

    Ok(())
}

#[test]
fn test_open_missing_file_fails() {
    let err = AudioFile::open("/nonexistent/missing.wav")
        .err()
        .expect("missing file should fail");
    assert!(err.to_string().contains("Failed to open WAV file"));
}

#[test]
fn test_samples_per_chunk() {
    let mono = ChunkEncoder::new(16000, 1, Duration::from_secs(3));
    assert_eq!(mono.samples_per_chunk(), 48_000);

    let stereo = ChunkEncoder::new(16000, 2, Duration::from_millis(500));
    assert_eq!(stereo.samples_per_chunk(), 16_000);

    // Never zero, and always whole frames
    let tiny = ChunkEncoder::new(16000, 2, Duration::from_micros(10));
    assert_eq!(tiny.samples_per_chunk(), 2);
}

#[test]
fn test_split_into_fixed_duration_chunks() -> Result<()> {
    let encoder = ChunkEncoder::new(16000, 1, Duration::from_secs(3));

    // 7 seconds: two full chunks and a 1 second tail
    let samples = vec![0i16; 16000 * 7];
    let chunks = encoder.split(&samples)?;

    assert_eq!(chunks.len(), 3, "Should create 3 chunks");

    assert_eq!(chunks[0].chunk_index, 0);
    assert_eq!(chunks[0].start_ms, 0);
    assert_eq!(chunks[0].end_ms, 3000);
    assert_eq!(chunks[0].sample_count, 48_000);

    assert_eq!(chunks[1].start_ms, 3000);
    assert_eq!(chunks[1].end_ms, 6000);

    assert_eq!(chunks[2].chunk_index, 2);
    assert_eq!(chunks[2].start_ms, 6000);
    assert_eq!(chunks[2].end_ms, 7000);
    assert_eq!(chunks[2].sample_count, 16_000);
    assert_eq!(chunks[2].duration(), Duration::from_secs(1));

    Ok(())
}

#[test]
fn test_chunks_are_standalone_wav_files() -> Result<()> {
    let encoder = ChunkEncoder::new(16000, 2, Duration::from_millis(100));

    let samples: Vec<i16> = (0..5000).map(|i| i as i16).collect();
    let chunks = encoder.split(&samples)?;

    let mut decoded = Vec::new();
    for chunk in &chunks {
        let reader = WavReader::new(Cursor::new(chunk.wav.clone()))?;
        assert_eq!(reader.spec(), pcm16(16000, 2));
        let part = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(part.len(), chunk.sample_count);
        decoded.extend(part);
    }

    // Reassembling the chunks gives back the original audio
    assert_eq!(decoded, samples);

    Ok(())
}

#[test]
fn test_split_empty_audio() -> Result<()> {
    let encoder = ChunkEncoder::new(16000, 1, Duration::from_secs(3));

    let chunks = encoder.split(&[])?;

    assert!(chunks.is_empty());
    Ok(())
}
