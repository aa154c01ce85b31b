use anyhow::{Context, Result};
use std::io::Cursor;
use std::time::Duration;
use tracing::info;

/// One chunk ready to hand to the transport
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    /// Chunk number (0-indexed)
    pub chunk_index: usize,
    /// Start time in milliseconds from the beginning of the audio
    pub start_ms: u64,
    /// End time in milliseconds from the beginning of the audio
    pub end_ms: u64,
    /// Number of interleaved samples in this chunk
    pub sample_count: usize,
    /// Complete WAV file (header + PCM data)
    pub wav: Vec<u8>,
}

impl EncodedChunk {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.end_ms - self.start_ms)
    }
}

/// Splits interleaved 16-bit PCM into fixed-duration segments, each encoded
/// as a standalone WAV file
#[derive(Debug, Clone)]
pub struct ChunkEncoder {
    sample_rate: u32,
    channels: u16,
    chunk_duration: Duration,
}

impl ChunkEncoder {
    pub fn new(sample_rate: u32, channels: u16, chunk_duration: Duration) -> Self {
        Self {
            sample_rate,
            channels,
            chunk_duration,
        }
    }

    /// Interleaved samples per full chunk (never zero)
    pub fn samples_per_chunk(&self) -> usize {
        let per_second = self.sample_rate as u128 * self.channels as u128;
        let samples = per_second * self.chunk_duration.as_millis() / 1000;
        let frame = self.channels.max(1) as usize;
        // Round down to whole frames so channels stay aligned across chunks.
        ((samples as usize) / frame * frame).max(frame)
    }

    /// Encode `samples` as one in-memory WAV file.
    pub fn encode(&self, samples: &[i16]) -> Result<Vec<u8>> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer =
                hound::WavWriter::new(&mut cursor, spec).context("Failed to create WAV writer")?;
            for &sample in samples {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample to WAV")?;
            }
            writer.finalize().context("Failed to finalize WAV")?;
        }

        Ok(cursor.into_inner())
    }

    /// Split `samples` into chunks. The last chunk may be shorter.
    pub fn split(&self, samples: &[i16]) -> Result<Vec<EncodedChunk>> {
        let per_chunk = self.samples_per_chunk();
        let mut chunks = Vec::with_capacity(samples.len().div_ceil(per_chunk));
        let mut offset = 0usize;

        for (chunk_index, segment) in samples.chunks(per_chunk).enumerate() {
            let chunk = EncodedChunk {
                chunk_index,
                start_ms: self.offset_ms(offset),
                end_ms: self.offset_ms(offset + segment.len()),
                sample_count: segment.len(),
                wav: self.encode(segment)?,
            };
            offset += segment.len();
            chunks.push(chunk);
        }

        info!(
            "Split {} samples into {} chunk(s) of up to {:?}",
            samples.len(),
            chunks.len(),
            self.chunk_duration
        );

        Ok(chunks)
    }

    fn offset_ms(&self, samples: usize) -> u64 {
        let per_second = self.sample_rate as u64 * self.channels as u64;
        if per_second == 0 {
            return 0;
        }
        samples as u64 * 1000 / per_second
    }
}
