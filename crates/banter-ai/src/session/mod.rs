//! Session management: named conversations over a pluggable backing
//! store, plus the orchestration that ties user input, the gateway, and
//! persistence into one turn.

mod backend;
mod chat;
mod store;

pub use backend::{FileBackend, HttpBackend, MemoryBackend, SessionRecord, StoreBackend};
pub use store::{ChatSession, SessionStore};
