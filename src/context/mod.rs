//! Context building for grounded answers
//!
//! Combines:
//! - Conversation memory (recent exchanges)
//! - Retrieved knowledge chunks
//! - The persona instruction

mod builder;
mod memory;

pub use builder::{BuiltContext, format_knowledge};
pub use memory::{ConversationMemory, DEFAULT_WINDOW, Turn};
