use serde::{Deserialize, Serialize};

use amana_memory::EntityRef;

pub const RECENT_ACTIVITY_CAP: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Profile slice of the context; absent when the number is unknown.
pub struct ProfileSnapshot {
    pub name: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// One past action: an intent tag, when it happened, and what it touched.
pub struct ActivityRecord {
    pub intent: String,
    pub timestamp_unix_ms: u64,
    #[serde(default)]
    pub entity: Option<EntityRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
/// Deduplicated top-5 entity names per kind, most-recent-first.
pub struct CommonEntities {
    pub clients: Vec<String>,
    pub drivers: Vec<String>,
    pub routes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
/// Single-pass aggregates over the organization's records.
pub struct BusinessMetrics {
    pub total_invoices: u64,
    pub unpaid_invoices: u64,
    pub overdue_invoices: u64,
    pub revenue: f64,
    pub wallet_balance: f64,
    pub active_routes: u64,
    pub active_drivers: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
/// Derived usage patterns: top-3 intents and top-3 peak hours, descending
/// frequency with first-seen tie-break.
pub struct UserPatterns {
    pub most_used_features: Vec<String>,
    pub peak_hours: Vec<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
/// Last-referenced entity pointers copied out of conversation memory.
pub struct MemoryPointers {
    #[serde(default)]
    pub last_invoice_number: Option<String>,
    #[serde(default)]
    pub last_client_name: Option<String>,
    #[serde(default)]
    pub last_driver_id: Option<String>,
    #[serde(default)]
    pub last_route_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// The full per-message snapshot. Built fresh per request and never
/// persisted whole; only the memory slice is ever written back.
pub struct UserContext {
    pub phone_number: String,
    pub organization_id: String,
    #[serde(default)]
    pub profile: Option<ProfileSnapshot>,
    pub recent_activity: Vec<ActivityRecord>,
    pub common_entities: CommonEntities,
    pub business_metrics: BusinessMetrics,
    pub user_patterns: UserPatterns,
    pub conversation_memory: MemoryPointers,
}
