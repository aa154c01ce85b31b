pub mod chunk;
pub mod file;

pub use chunk::{ChunkEncoder, EncodedChunk};
pub use file::AudioFile;
