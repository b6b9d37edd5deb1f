use std::sync::Arc;

use amana_core::current_unix_timestamp_ms;
use amana_memory::{ConversationMemory, MemoryStore};
use amana_store::{
    DriverStore, InvoiceStore, OrganizationStore, ProfileStore, RouteStore, StoreError,
};

use crate::context_entities::{
    dedupe_entity_names, top_up_entity_names, COMMON_ENTITY_CAP, ENTITY_TOPUP_FLOOR,
};
use crate::context_metrics::compute_business_metrics;
use crate::context_patterns::derive_user_patterns;
use crate::context_types::{
    ActivityRecord, BusinessMetrics, CommonEntities, MemoryPointers, ProfileSnapshot, UserContext,
    RECENT_ACTIVITY_CAP,
};

/// Repository handles the aggregator reads through. It owns nothing and
/// mutates nothing.
#[derive(Clone)]
pub struct ContextSources {
    pub invoices: Arc<dyn InvoiceStore>,
    pub organizations: Arc<dyn OrganizationStore>,
    pub routes: Arc<dyn RouteStore>,
    pub drivers: Arc<dyn DriverStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub memory: Arc<dyn MemoryStore>,
}

/// Builds the per-message `UserContext` snapshot.
#[derive(Clone)]
pub struct ContextAggregator {
    sources: ContextSources,
}

impl ContextAggregator {
    pub fn new(sources: ContextSources) -> Self {
        Self { sources }
    }

    /// Assembles a context for one inbound message. Never fails: the five
    /// sub-fetches run concurrently and each degrades to its zero value on
    /// error, so a missing slice costs detail, not availability.
    pub async fn user_context(&self, phone_number: &str, organization_id: &str) -> UserContext {
        let (profile, recent_activity, common_entities, business_metrics, conversation_memory) = tokio::join!(
            self.fetch_profile(phone_number),
            self.fetch_recent_activity(phone_number),
            self.fetch_common_entities(phone_number, organization_id),
            self.fetch_business_metrics(organization_id),
            self.fetch_memory_pointers(phone_number),
        );

        let user_patterns = derive_user_patterns(&recent_activity);

        UserContext {
            phone_number: phone_number.to_string(),
            organization_id: organization_id.to_string(),
            profile,
            recent_activity,
            common_entities,
            business_metrics,
            user_patterns,
            conversation_memory,
        }
    }

    async fn fetch_profile(&self, phone_number: &str) -> Option<ProfileSnapshot> {
        match self.sources.profiles.find_by_phone(phone_number).await {
            Ok(record) => record.map(|record| ProfileSnapshot {
                name: record.name,
                language: record.language,
                timezone: record.timezone,
            }),
            Err(error) => {
                degraded("profile", &error);
                None
            }
        }
    }

    async fn fetch_recent_activity(&self, phone_number: &str) -> Vec<ActivityRecord> {
        match self.read_memory(phone_number).await {
            Some(memory) => recent_activity_from_memory(&memory),
            None => Vec::new(),
        }
    }

    async fn fetch_common_entities(
        &self,
        phone_number: &str,
        organization_id: &str,
    ) -> CommonEntities {
        let activity = self.fetch_recent_activity(phone_number).await;

        let clients = dedupe_entity_names(
            activity
                .iter()
                .filter_map(|record| record.entity.as_ref())
                .filter_map(|entity| entity.client_name())
                .map(str::to_string),
        );
        let drivers = dedupe_entity_names(
            activity
                .iter()
                .filter_map(|record| record.entity.as_ref())
                .filter_map(|entity| entity.driver_id())
                .map(str::to_string),
        );
        let routes = dedupe_entity_names(
            activity
                .iter()
                .filter_map(|record| record.entity.as_ref())
                .filter_map(|entity| entity.route_id())
                .map(str::to_string),
        );

        CommonEntities {
            clients: self
                .top_up_clients(clients, organization_id)
                .await,
            drivers: self
                .top_up_drivers(drivers, organization_id)
                .await,
            routes: self.top_up_routes(routes, organization_id).await,
        }
    }

    async fn top_up_clients(&self, derived: Vec<String>, organization_id: &str) -> Vec<String> {
        if derived.len() >= ENTITY_TOPUP_FLOOR {
            return derived;
        }
        match self
            .sources
            .invoices
            .recent_client_names(organization_id, COMMON_ENTITY_CAP)
            .await
        {
            Ok(backfill) => top_up_entity_names(derived, backfill),
            Err(error) => {
                degraded("common_entities_clients", &error);
                derived
            }
        }
    }

    async fn top_up_drivers(&self, derived: Vec<String>, organization_id: &str) -> Vec<String> {
        if derived.len() >= ENTITY_TOPUP_FLOOR {
            return derived;
        }
        match self
            .sources
            .drivers
            .recent_driver_ids(organization_id, COMMON_ENTITY_CAP)
            .await
        {
            Ok(backfill) => top_up_entity_names(derived, backfill),
            Err(error) => {
                degraded("common_entities_drivers", &error);
                derived
            }
        }
    }

    async fn top_up_routes(&self, derived: Vec<String>, organization_id: &str) -> Vec<String> {
        if derived.len() >= ENTITY_TOPUP_FLOOR {
            return derived;
        }
        match self
            .sources
            .routes
            .recent_route_ids(organization_id, COMMON_ENTITY_CAP)
            .await
        {
            Ok(backfill) => top_up_entity_names(derived, backfill),
            Err(error) => {
                degraded("common_entities_routes", &error);
                derived
            }
        }
    }

    async fn fetch_business_metrics(&self, organization_id: &str) -> BusinessMetrics {
        let invoices = match self
            .sources
            .invoices
            .list_for_organization(organization_id)
            .await
        {
            Ok(invoices) => invoices,
            Err(error) => {
                degraded("business_metrics_invoices", &error);
                return BusinessMetrics::default();
            }
        };

        let wallet_balance = match self.sources.organizations.find(organization_id).await {
            Ok(record) => record.map(|record| record.wallet_balance).unwrap_or(0.0),
            Err(error) => {
                degraded("business_metrics_wallet", &error);
                0.0
            }
        };
        let routes = match self
            .sources
            .routes
            .list_for_organization(organization_id)
            .await
        {
            Ok(routes) => routes,
            Err(error) => {
                degraded("business_metrics_routes", &error);
                Vec::new()
            }
        };
        let drivers = match self
            .sources
            .drivers
            .list_for_organization(organization_id)
            .await
        {
            Ok(drivers) => drivers,
            Err(error) => {
                degraded("business_metrics_drivers", &error);
                Vec::new()
            }
        };

        compute_business_metrics(
            &invoices,
            wallet_balance,
            &routes,
            &drivers,
            current_unix_timestamp_ms(),
        )
    }

    async fn fetch_memory_pointers(&self, phone_number: &str) -> MemoryPointers {
        match self.read_memory(phone_number).await {
            Some(memory) => MemoryPointers {
                last_invoice_number: memory.last_invoice_number,
                last_client_name: memory.last_client_name,
                last_driver_id: memory.last_driver_id,
                last_route_id: memory.last_route_id,
            },
            None => MemoryPointers::default(),
        }
    }

    async fn read_memory(&self, phone_number: &str) -> Option<ConversationMemory> {
        match self.sources.memory.read(phone_number).await {
            Ok(memory) => memory,
            Err(error) => {
                degraded("conversation_memory", &error);
                None
            }
        }
    }
}

/// Recent actions are the stored turns that carry an intent tag, windowed to
/// the 10 most recent, most-recent-first.
fn recent_activity_from_memory(memory: &ConversationMemory) -> Vec<ActivityRecord> {
    memory
        .conversation_history
        .iter()
        .rev()
        .filter(|turn| turn.intent.is_some())
        .take(RECENT_ACTIVITY_CAP)
        .map(|turn| ActivityRecord {
            intent: turn.intent.clone().unwrap_or_default(),
            timestamp_unix_ms: turn.timestamp_unix_ms,
            entity: turn.entity.clone(),
        })
        .collect()
}

fn degraded(slice: &str, error: &StoreError) {
    tracing::warn!(slice, error = %error, "context sub-fetch degraded to zero value");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use amana_memory::{EntityRef, InMemoryMemoryStore, MemoryStore, MemoryTurn, TurnRole};
    use amana_store::{
        InMemoryStores, InvoiceRecord, InvoiceStatus, OrganizationRecord, StoreError,
        UserProfileRecord,
    };

    use super::{ContextAggregator, ContextSources};

    struct FailingInvoices;

    #[async_trait]
    impl amana_store::InvoiceStore for FailingInvoices {
        async fn find_by_number(
            &self,
            _organization_id: &str,
            _invoice_number: &str,
        ) -> Result<Option<InvoiceRecord>, StoreError> {
            Err(StoreError::Unavailable("invoices down".to_string()))
        }

        async fn list_for_organization(
            &self,
            _organization_id: &str,
        ) -> Result<Vec<InvoiceRecord>, StoreError> {
            Err(StoreError::Unavailable("invoices down".to_string()))
        }

        async fn recent_invoice_numbers(
            &self,
            _organization_id: &str,
            _limit: usize,
        ) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Unavailable("invoices down".to_string()))
        }

        async fn recent_client_names(
            &self,
            _organization_id: &str,
            _limit: usize,
        ) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Unavailable("invoices down".to_string()))
        }
    }

    fn seeded_stores() -> Arc<InMemoryStores> {
        let stores = Arc::new(InMemoryStores::new());
        stores.seed_organization(OrganizationRecord {
            organization_id: "org-1".to_string(),
            name: "Kano Haulage".to_string(),
            wallet_balance: 50_000.0,
        });
        stores.seed_profile(UserProfileRecord {
            phone_number: "+234800000001".to_string(),
            organization_id: "org-1".to_string(),
            name: "Ngozi".to_string(),
            language: Some("en".to_string()),
            timezone: Some("Africa/Lagos".to_string()),
        });
        for index in 0..4u64 {
            stores.seed_invoice(InvoiceRecord {
                invoice_id: format!("id-{index}"),
                invoice_number: format!("INV-00{index}"),
                organization_id: "org-1".to_string(),
                client_name: format!("Client {index}"),
                total: 10_000.0,
                status: InvoiceStatus::Sent,
                due_unix_ms: None,
                created_unix_ms: index,
            });
        }
        stores
    }

    fn sources(stores: Arc<InMemoryStores>, memory: Arc<InMemoryMemoryStore>) -> ContextSources {
        ContextSources {
            invoices: stores.clone(),
            organizations: stores.clone(),
            routes: stores.clone(),
            drivers: stores.clone(),
            profiles: stores,
            memory,
        }
    }

    fn user_turn(intent: &str, entity: Option<EntityRef>, at: u64) -> MemoryTurn {
        MemoryTurn {
            role: TurnRole::User,
            text: intent.to_string(),
            intent: Some(intent.to_string()),
            entity,
            timestamp_unix_ms: at,
        }
    }

    #[tokio::test]
    async fn assembles_all_slices_from_seeded_stores() {
        let stores = seeded_stores();
        let memory = Arc::new(InMemoryMemoryStore::new());
        for index in 0..12u64 {
            memory
                .append_history(
                    "+234800000001",
                    user_turn(
                        "check_invoice_status",
                        Some(EntityRef::Client {
                            name: format!("Client {}", index % 2),
                        }),
                        index,
                    ),
                )
                .await
                .expect("append");
        }

        let aggregator = ContextAggregator::new(sources(stores, memory));
        let context = aggregator.user_context("+234800000001", "org-1").await;

        assert_eq!(context.profile.expect("profile").name, "Ngozi");
        assert_eq!(context.recent_activity.len(), 10);
        assert_eq!(context.business_metrics.total_invoices, 4);
        assert_eq!(context.business_metrics.wallet_balance, 50_000.0);
        assert_eq!(
            context.user_patterns.most_used_features,
            vec!["check_invoice_status".to_string()]
        );
        // Two distinct clients in activity, so the list is topped up from
        // the invoice collection and re-capped.
        assert!(context.common_entities.clients.len() <= 5);
        assert!(context.common_entities.clients.len() >= 3);
        assert_eq!(context.common_entities.clients[0], "Client 1");
    }

    #[tokio::test]
    async fn invoice_store_failure_degrades_metrics_but_not_profile() {
        let stores = seeded_stores();
        let memory = Arc::new(InMemoryMemoryStore::new());
        let mut sources = sources(stores, memory);
        sources.invoices = Arc::new(FailingInvoices);

        let aggregator = ContextAggregator::new(sources);
        let context = aggregator.user_context("+234800000001", "org-1").await;

        assert_eq!(context.business_metrics.total_invoices, 0);
        assert_eq!(context.business_metrics.revenue, 0.0);
        assert_eq!(context.profile.expect("profile").name, "Ngozi");
        assert!(context.common_entities.clients.is_empty());
    }

    #[tokio::test]
    async fn unknown_number_yields_empty_memory_slices() {
        let stores = seeded_stores();
        let memory = Arc::new(InMemoryMemoryStore::new());
        let aggregator = ContextAggregator::new(sources(stores, memory));

        let context = aggregator.user_context("+234809999999", "org-1").await;
        assert!(context.profile.is_none());
        assert!(context.recent_activity.is_empty());
        assert!(context.conversation_memory.last_invoice_number.is_none());
        // Entity lists still backfill from the database when activity is
        // sparse.
        assert_eq!(context.common_entities.clients.len(), 4);
    }
}
