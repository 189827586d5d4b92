pub mod batcher;
pub mod chunker;

pub use batcher::{RawEvents, batch};
pub use chunker::{Chunks, DEFAULT_MAX_CHUNK_BYTES, MIN_CHUNK_BYTES, split};
