//! Conversation memory for the Amana assistant.
//!
//! One document per WhatsApp number: an append-only history of turns plus a
//! small set of last-referenced entity pointers. History is never truncated
//! in storage; the read-time window belongs to the context aggregator.
mod memory_store;
mod memory_types;

pub use memory_store::{InMemoryMemoryStore, MemoryStore};
pub use memory_types::{ConversationMemory, EntityRef, MemoryPatch, MemoryTurn, TurnRole};
