//! Per-message `UserContext` assembly for the Amana assistant.
//!
//! The aggregator composes profile, recent activity, common entities,
//! business metrics, and conversation memory into one snapshot. Every
//! sub-fetch degrades independently; assembling a context never fails.
mod context_aggregator;
mod context_entities;
mod context_metrics;
mod context_patterns;
mod context_types;

pub use context_aggregator::{ContextAggregator, ContextSources};
pub use context_entities::{dedupe_entity_names, COMMON_ENTITY_CAP, ENTITY_TOPUP_FLOOR};
pub use context_metrics::compute_business_metrics;
pub use context_patterns::derive_user_patterns;
pub use context_types::{
    ActivityRecord, BusinessMetrics, CommonEntities, MemoryPointers, ProfileSnapshot,
    UserContext, UserPatterns, RECENT_ACTIVITY_CAP,
};
