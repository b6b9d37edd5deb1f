use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use amana_core::current_unix_timestamp_ms;
use amana_store::StoreError;

use crate::memory_types::{ConversationMemory, MemoryPatch, MemoryTurn};

#[async_trait]
/// The one write path to conversation memory. Both mutating operations are
/// usable independently; a document is created on first write for an unseen
/// number.
pub trait MemoryStore: Send + Sync {
    async fn read(&self, phone_number: &str) -> Result<Option<ConversationMemory>, StoreError>;

    /// Field-level last-write-wins pointer merge.
    async fn merge_update(
        &self,
        phone_number: &str,
        patch: MemoryPatch,
    ) -> Result<ConversationMemory, StoreError>;

    /// Appends one turn. Storage is never truncated here; the 10-entry
    /// window is applied at read time by the context aggregator.
    async fn append_history(&self, phone_number: &str, turn: MemoryTurn)
        -> Result<(), StoreError>;
}

/// In-memory `MemoryStore` used by tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryMemoryStore {
    documents: Mutex<HashMap<String, ConversationMemory>>,
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> Result<MutexGuard<'_, HashMap<String, ConversationMemory>>, StoreError> {
        self.documents
            .lock()
            .map_err(|_| StoreError::Unavailable("memory lock is poisoned".to_string()))
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn read(&self, phone_number: &str) -> Result<Option<ConversationMemory>, StoreError> {
        Ok(self.guard()?.get(phone_number).cloned())
    }

    async fn merge_update(
        &self,
        phone_number: &str,
        patch: MemoryPatch,
    ) -> Result<ConversationMemory, StoreError> {
        let now = current_unix_timestamp_ms();
        let mut documents = self.guard()?;
        let memory = documents
            .entry(phone_number.to_string())
            .or_insert_with(|| ConversationMemory::empty(phone_number, now));
        patch.apply(memory, now);
        Ok(memory.clone())
    }

    async fn append_history(
        &self,
        phone_number: &str,
        turn: MemoryTurn,
    ) -> Result<(), StoreError> {
        let now = current_unix_timestamp_ms();
        let mut documents = self.guard()?;
        let memory = documents
            .entry(phone_number.to_string())
            .or_insert_with(|| ConversationMemory::empty(phone_number, now));
        memory.conversation_history.push(turn);
        memory.updated_unix_ms = now;
        Ok(())
    }
}
