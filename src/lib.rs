pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod transport;

pub use audio::{AudioFile, ChunkEncoder, EncodedChunk};
pub use config::Config;
pub use error::SessionError;
pub use http::{create_router, AppState};
pub use session::{
    ConnectionState, SessionConfig, SessionCoordinator, SessionSnapshot, TranscriptFragment,
};
pub use transport::{
    ChannelTransport, ResultKind, Transport, TransportHandle, WebSocketTransport, WorkerChannels,
    WorkerCommand, WorkerEvent,
};
