//! Knowledge base chunking and retrieval
//!
//! - **chunker**: Split the source document into overlapping chunks
//! - **retriever**: Rank indexed chunks against a query

mod chunker;
mod retriever;

pub use chunker::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, TextSplitter, split_text};
pub use retriever::{ContextRetriever, DEFAULT_TOP_K};
