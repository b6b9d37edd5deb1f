use async_trait::async_trait;
use thiserror::Error;

use crate::store_records::{
    DriverRecord, ExpenseRecord, InvoiceRecord, OrganizationRecord, RouteRecord, UserProfileRecord,
};

#[derive(Debug, Error)]
/// Enumerates supported `StoreError` values.
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed stored document: {0}")]
    Malformed(String),
}

#[async_trait]
/// Read surface over the invoices collection for one organization.
pub trait InvoiceStore: Send + Sync {
    async fn find_by_number(
        &self,
        organization_id: &str,
        invoice_number: &str,
    ) -> Result<Option<InvoiceRecord>, StoreError>;

    async fn list_for_organization(
        &self,
        organization_id: &str,
    ) -> Result<Vec<InvoiceRecord>, StoreError>;

    /// Most recently created invoice numbers, newest first.
    async fn recent_invoice_numbers(
        &self,
        organization_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, StoreError>;

    /// Client names ordered by most recent invoice activity, newest first.
    async fn recent_client_names(
        &self,
        organization_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, StoreError>;
}

#[async_trait]
/// Append-and-list surface over the expenses collection. Expenses are
/// immutable, so no update or delete operation exists.
pub trait ExpenseStore: Send + Sync {
    async fn insert(&self, record: ExpenseRecord) -> Result<(), StoreError>;

    /// All expenses linked to an invoice's internal id, newest first.
    async fn list_for_invoice(&self, invoice_id: &str)
        -> Result<Vec<ExpenseRecord>, StoreError>;
}

#[async_trait]
pub trait OrganizationStore: Send + Sync {
    async fn find(&self, organization_id: &str) -> Result<Option<OrganizationRecord>, StoreError>;
}

#[async_trait]
pub trait RouteStore: Send + Sync {
    async fn list_for_organization(
        &self,
        organization_id: &str,
    ) -> Result<Vec<RouteRecord>, StoreError>;

    async fn recent_route_ids(
        &self,
        organization_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, StoreError>;
}

#[async_trait]
pub trait DriverStore: Send + Sync {
    async fn list_for_organization(
        &self,
        organization_id: &str,
    ) -> Result<Vec<DriverRecord>, StoreError>;

    async fn recent_driver_ids(
        &self,
        organization_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, StoreError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_by_phone(
        &self,
        phone_number: &str,
    ) -> Result<Option<UserProfileRecord>, StoreError>;
}
