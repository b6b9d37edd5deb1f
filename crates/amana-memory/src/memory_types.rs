use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `TurnRole` values.
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// Typed reference to a business entity mentioned in a turn. Decoded once at
/// the store boundary; no stringly-tagged objects cross it.
pub enum EntityRef {
    Invoice { number: String },
    Client { name: String },
    Driver { driver_id: String },
    Route { route_id: String },
    Expense { invoice_number: String },
}

impl EntityRef {
    pub fn client_name(&self) -> Option<&str> {
        match self {
            Self::Client { name } => Some(name),
            _ => None,
        }
    }

    pub fn driver_id(&self) -> Option<&str> {
        match self {
            Self::Driver { driver_id } => Some(driver_id),
            _ => None,
        }
    }

    pub fn route_id(&self) -> Option<&str> {
        match self {
            Self::Route { route_id } => Some(route_id),
            _ => None,
        }
    }

    pub fn invoice_number(&self) -> Option<&str> {
        match self {
            Self::Invoice { number } => Some(number),
            Self::Expense { invoice_number } => Some(invoice_number),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// One stored conversation turn.
pub struct MemoryTurn {
    pub role: TurnRole,
    pub text: String,
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub entity: Option<EntityRef>,
    pub timestamp_unix_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// The per-number memory document. `conversation_history` only ever grows;
/// the pointer fields are last-write-wins.
pub struct ConversationMemory {
    pub phone_number: String,
    #[serde(default)]
    pub conversation_history: Vec<MemoryTurn>,
    #[serde(default)]
    pub last_invoice_number: Option<String>,
    #[serde(default)]
    pub last_client_name: Option<String>,
    #[serde(default)]
    pub last_driver_id: Option<String>,
    #[serde(default)]
    pub last_route_id: Option<String>,
    pub updated_unix_ms: u64,
}

impl ConversationMemory {
    pub fn empty(phone_number: impl Into<String>, now_unix_ms: u64) -> Self {
        Self {
            phone_number: phone_number.into(),
            conversation_history: Vec::new(),
            last_invoice_number: None,
            last_client_name: None,
            last_driver_id: None,
            last_route_id: None,
            updated_unix_ms: now_unix_ms,
        }
    }

    /// The `limit` most recent turns, most-recent-first.
    pub fn recent_turns(&self, limit: usize) -> Vec<MemoryTurn> {
        self.conversation_history
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
/// Partial pointer update; fields left as `None` are not touched.
pub struct MemoryPatch {
    #[serde(default)]
    pub last_invoice_number: Option<String>,
    #[serde(default)]
    pub last_client_name: Option<String>,
    #[serde(default)]
    pub last_driver_id: Option<String>,
    #[serde(default)]
    pub last_route_id: Option<String>,
}

impl MemoryPatch {
    pub fn is_empty(&self) -> bool {
        self.last_invoice_number.is_none()
            && self.last_client_name.is_none()
            && self.last_driver_id.is_none()
            && self.last_route_id.is_none()
    }

    /// Field-level last-write-wins merge into `memory`.
    pub fn apply(&self, memory: &mut ConversationMemory, now_unix_ms: u64) {
        if let Some(value) = &self.last_invoice_number {
            memory.last_invoice_number = Some(value.clone());
        }
        if let Some(value) = &self.last_client_name {
            memory.last_client_name = Some(value.clone());
        }
        if let Some(value) = &self.last_driver_id {
            memory.last_driver_id = Some(value.clone());
        }
        if let Some(value) = &self.last_route_id {
            memory.last_route_id = Some(value.clone());
        }
        memory.updated_unix_ms = now_unix_ms;
    }

    pub fn for_entity(entity: &EntityRef) -> Self {
        let mut patch = Self::default();
        match entity {
            EntityRef::Invoice { number } => {
                patch.last_invoice_number = Some(number.clone());
            }
            EntityRef::Client { name } => {
                patch.last_client_name = Some(name.clone());
            }
            EntityRef::Driver { driver_id } => {
                patch.last_driver_id = Some(driver_id.clone());
            }
            EntityRef::Route { route_id } => {
                patch.last_route_id = Some(route_id.clone());
            }
            EntityRef::Expense { invoice_number } => {
                patch.last_invoice_number = Some(invoice_number.clone());
            }
        }
        patch
    }
}
