use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::store_records::{
    DriverRecord, ExpenseRecord, InvoiceRecord, OrganizationRecord, RouteRecord, UserProfileRecord,
};
use crate::store_traits::{
    DriverStore, ExpenseStore, InvoiceStore, OrganizationStore, ProfileStore, RouteStore,
    StoreError,
};

/// In-memory implementation of every repository trait. Used by tests and
/// local runs in place of the managed document database.
#[derive(Debug, Default)]
pub struct InMemoryStores {
    invoices: Mutex<Vec<InvoiceRecord>>,
    expenses: Mutex<Vec<ExpenseRecord>>,
    organizations: Mutex<Vec<OrganizationRecord>>,
    routes: Mutex<Vec<RouteRecord>>,
    drivers: Mutex<Vec<DriverRecord>>,
    profiles: Mutex<Vec<UserProfileRecord>>,
}

impl InMemoryStores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_invoice(&self, record: InvoiceRecord) {
        self.invoices.lock().expect("invoices lock").push(record);
    }

    pub fn seed_expense(&self, record: ExpenseRecord) {
        self.expenses.lock().expect("expenses lock").push(record);
    }

    pub fn seed_organization(&self, record: OrganizationRecord) {
        self.organizations
            .lock()
            .expect("organizations lock")
            .push(record);
    }

    pub fn seed_route(&self, record: RouteRecord) {
        self.routes.lock().expect("routes lock").push(record);
    }

    pub fn seed_driver(&self, record: DriverRecord) {
        self.drivers.lock().expect("drivers lock").push(record);
    }

    pub fn seed_profile(&self, record: UserProfileRecord) {
        self.profiles.lock().expect("profiles lock").push(record);
    }

    pub fn expense_count(&self) -> usize {
        self.expenses.lock().expect("expenses lock").len()
    }
}

fn guard<'a, T>(mutex: &'a Mutex<T>, collection: &str) -> Result<MutexGuard<'a, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Unavailable(format!("{collection} lock is poisoned")))
}

#[async_trait]
impl InvoiceStore for InMemoryStores {
    async fn find_by_number(
        &self,
        organization_id: &str,
        invoice_number: &str,
    ) -> Result<Option<InvoiceRecord>, StoreError> {
        let invoices = guard(&self.invoices, "invoices")?;
        Ok(invoices
            .iter()
            .find(|record| {
                record.organization_id == organization_id
                    && record.invoice_number.eq_ignore_ascii_case(invoice_number)
            })
            .cloned())
    }

    async fn list_for_organization(
        &self,
        organization_id: &str,
    ) -> Result<Vec<InvoiceRecord>, StoreError> {
        let invoices = guard(&self.invoices, "invoices")?;
        Ok(invoices
            .iter()
            .filter(|record| record.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn recent_invoice_numbers(
        &self,
        organization_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        let mut records = InvoiceStore::list_for_organization(self, organization_id).await?;
        records.sort_by(|a, b| b.created_unix_ms.cmp(&a.created_unix_ms));
        Ok(records
            .into_iter()
            .map(|record| record.invoice_number)
            .take(limit)
            .collect())
    }

    async fn recent_client_names(
        &self,
        organization_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        let mut records = InvoiceStore::list_for_organization(self, organization_id).await?;
        records.sort_by(|a, b| b.created_unix_ms.cmp(&a.created_unix_ms));
        let mut names: Vec<String> = Vec::new();
        for record in records {
            if !names
                .iter()
                .any(|name| name.eq_ignore_ascii_case(&record.client_name))
            {
                names.push(record.client_name);
            }
            if names.len() == limit {
                break;
            }
        }
        Ok(names)
    }
}

#[async_trait]
impl ExpenseStore for InMemoryStores {
    async fn insert(&self, record: ExpenseRecord) -> Result<(), StoreError> {
        guard(&self.expenses, "expenses")?.push(record);
        Ok(())
    }

    async fn list_for_invoice(
        &self,
        invoice_id: &str,
    ) -> Result<Vec<ExpenseRecord>, StoreError> {
        let expenses = guard(&self.expenses, "expenses")?;
        let mut linked: Vec<ExpenseRecord> = expenses
            .iter()
            .filter(|record| record.invoice_id == invoice_id)
            .cloned()
            .collect();
        linked.sort_by(|a, b| b.created_unix_ms.cmp(&a.created_unix_ms));
        Ok(linked)
    }
}

#[async_trait]
impl OrganizationStore for InMemoryStores {
    async fn find(&self, organization_id: &str) -> Result<Option<OrganizationRecord>, StoreError> {
        let organizations = guard(&self.organizations, "organizations")?;
        Ok(organizations
            .iter()
            .find(|record| record.organization_id == organization_id)
            .cloned())
    }
}

#[async_trait]
impl RouteStore for InMemoryStores {
    async fn list_for_organization(
        &self,
        organization_id: &str,
    ) -> Result<Vec<RouteRecord>, StoreError> {
        let routes = guard(&self.routes, "routes")?;
        Ok(routes
            .iter()
            .filter(|record| record.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn recent_route_ids(
        &self,
        organization_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        let mut records = RouteStore::list_for_organization(self, organization_id).await?;
        records.sort_by(|a, b| b.created_unix_ms.cmp(&a.created_unix_ms));
        Ok(records
            .into_iter()
            .map(|record| record.route_id)
            .take(limit)
            .collect())
    }
}

#[async_trait]
impl DriverStore for InMemoryStores {
    async fn list_for_organization(
        &self,
        organization_id: &str,
    ) -> Result<Vec<DriverRecord>, StoreError> {
        let drivers = guard(&self.drivers, "drivers")?;
        Ok(drivers
            .iter()
            .filter(|record| record.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn recent_driver_ids(
        &self,
        organization_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        let mut records = DriverStore::list_for_organization(self, organization_id).await?;
        records.sort_by(|a, b| b.created_unix_ms.cmp(&a.created_unix_ms));
        Ok(records
            .into_iter()
            .map(|record| record.driver_id)
            .take(limit)
            .collect())
    }
}

#[async_trait]
impl ProfileStore for InMemoryStores {
    async fn find_by_phone(
        &self,
        phone_number: &str,
    ) -> Result<Option<UserProfileRecord>, StoreError> {
        let profiles = guard(&self.profiles, "profiles")?;
        Ok(profiles
            .iter()
            .find(|record| record.phone_number == phone_number)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::InMemoryStores;
    use crate::store_records::{ExpenseRecord, InvoiceRecord, InvoiceStatus};
    use crate::store_traits::{ExpenseStore, InvoiceStore};

    fn invoice(number: &str, client: &str, created_unix_ms: u64) -> InvoiceRecord {
        InvoiceRecord {
            invoice_id: format!("id-{number}"),
            invoice_number: number.to_string(),
            organization_id: "org-1".to_string(),
            client_name: client.to_string(),
            total: 100_000.0,
            status: InvoiceStatus::Sent,
            due_unix_ms: None,
            created_unix_ms,
        }
    }

    fn expense(invoice_id: &str, amount: f64, created_unix_ms: u64) -> ExpenseRecord {
        ExpenseRecord {
            expense_id: format!("exp-{created_unix_ms}"),
            invoice_id: invoice_id.to_string(),
            organization_id: "org-1".to_string(),
            description: "diesel".to_string(),
            amount,
            category: "Fuel".to_string(),
            date_unix_ms: created_unix_ms,
            created_by: "+234800000001".to_string(),
            created_unix_ms,
        }
    }

    #[tokio::test]
    async fn invoice_lookup_is_case_insensitive_on_number() {
        let stores = InMemoryStores::new();
        stores.seed_invoice(invoice("INV-001", "Acme", 10));

        let found = stores
            .find_by_number("org-1", "inv-001")
            .await
            .expect("lookup");
        assert_eq!(found.expect("record").invoice_number, "INV-001");
        assert!(stores
            .find_by_number("org-2", "INV-001")
            .await
            .expect("lookup")
            .is_none());
    }

    #[tokio::test]
    async fn recent_client_names_deduplicate_newest_first() {
        let stores = InMemoryStores::new();
        stores.seed_invoice(invoice("INV-001", "Acme", 10));
        stores.seed_invoice(invoice("INV-002", "Dangote", 20));
        stores.seed_invoice(invoice("INV-003", "acme", 30));

        let names = stores
            .recent_client_names("org-1", 5)
            .await
            .expect("names");
        assert_eq!(names, vec!["acme".to_string(), "Dangote".to_string()]);
    }

    #[tokio::test]
    async fn expenses_list_newest_first_for_linked_invoice_only() {
        let stores = InMemoryStores::new();
        stores.seed_expense(expense("id-INV-001", 80_000.0, 10));
        stores.seed_expense(expense("id-INV-001", 40_000.0, 20));
        stores.seed_expense(expense("id-INV-002", 9_000.0, 30));

        let linked = stores
            .list_for_invoice("id-INV-001")
            .await
            .expect("expenses");
        assert_eq!(linked.len(), 2);
        assert_eq!(linked[0].amount, 40_000.0);
        assert_eq!(linked[1].amount, 80_000.0);
    }
}
