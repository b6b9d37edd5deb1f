//! Persistent document model for the Amana back office.
//!
//! Every component reaches the database through the per-collection repository
//! traits defined here; nothing holds a global database handle. The
//! `InMemoryStores` implementation backs tests and local runs.
mod store_memdb;
mod store_records;
mod store_traits;

pub use store_memdb::InMemoryStores;
pub use store_records::{
    DriverRecord, DriverStatus, ExpenseRecord, InvoiceRecord, InvoiceStatus, OrganizationRecord,
    RouteRecord, RouteStatus, UserProfileRecord, EXPENSE_DEFAULT_CATEGORY,
};
pub use store_traits::{
    DriverStore, ExpenseStore, InvoiceStore, OrganizationStore, ProfileStore, RouteStore,
    StoreError,
};
