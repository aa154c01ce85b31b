use super::chunk::ChunkEncoder;
use crate::session::SessionConfig;
use anyhow::{ensure, Context, Result};
use hound::{SampleFormat, WavReader, WavSpec};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Interleaved 16-bit PCM read from a WAV file, ready to be chunked
#[derive(Debug, Clone)]
pub struct AudioFile {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    /// Read a whole WAV file. Only 16-bit integer PCM is accepted; the
    /// server decodes each chunk as such.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

        let WavSpec {
            channels,
            sample_rate,
            bits_per_sample,
            sample_format,
        } = reader.spec();

        ensure!(
            sample_format == SampleFormat::Int && bits_per_sample == 16,
            "Unsupported WAV format in {}: expected 16-bit PCM, got {}-bit {:?}",
            path.display(),
            bits_per_sample,
            sample_format
        );
        ensure!(
            channels > 0 && sample_rate > 0,
            "WAV header of {} declares no audio",
            path.display()
        );

        let samples = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Corrupt sample data in {}", path.display()))?;

        let audio = Self {
            path: path.to_path_buf(),
            sample_rate,
            channels,
            samples,
        };

        debug!(
            "Read {}: {:?} at {}Hz/{}ch",
            audio.path.display(),
            audio.duration(),
            sample_rate,
            channels
        );

        Ok(audio)
    }

    /// Number of sample frames (one sample per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate.max(1)))
    }

    /// Whether the audio already has the layout the session streams.
    pub fn matches(&self, config: &SessionConfig) -> bool {
        self.sample_rate == config.sample_rate && self.channels == config.channels
    }

    /// Encoder cutting this file into chunks of `chunk_duration`.
    pub fn encoder(&self, chunk_duration: Duration) -> ChunkEncoder {
        ChunkEncoder::new(self.sample_rate, self.channels, chunk_duration)
    }
}
