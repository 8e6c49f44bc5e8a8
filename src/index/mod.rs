pub mod store;

pub use store::{Chunk, ChunkStore};
