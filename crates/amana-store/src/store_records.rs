use serde::{Deserialize, Serialize};

pub const EXPENSE_DEFAULT_CATEGORY: &str = "General";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `InvoiceStatus` values.
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Sent => "Sent",
            Self::Paid => "Paid",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// One invoice document, addressed by its human-facing number within an
/// organization; `invoice_id` is the internal link target for expenses.
pub struct InvoiceRecord {
    pub invoice_id: String,
    pub invoice_number: String,
    pub organization_id: String,
    pub client_name: String,
    pub total: f64,
    pub status: InvoiceStatus,
    #[serde(default)]
    pub due_unix_ms: Option<u64>,
    pub created_unix_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// One expense document. Immutable once written; linked to exactly one
/// invoice by internal id.
pub struct ExpenseRecord {
    pub expense_id: String,
    pub invoice_id: String,
    pub organization_id: String,
    pub description: String,
    pub amount: f64,
    #[serde(default = "default_expense_category")]
    pub category: String,
    pub date_unix_ms: u64,
    pub created_by: String,
    pub created_unix_ms: u64,
}

fn default_expense_category() -> String {
    EXPENSE_DEFAULT_CATEGORY.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Tenant document; carries the wallet balance read by business metrics.
pub struct OrganizationRecord {
    pub organization_id: String,
    pub name: String,
    #[serde(default)]
    pub wallet_balance: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `RouteStatus` values.
pub enum RouteStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl RouteStatus {
    /// Active means the route still demands attention from dispatch.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteRecord {
    pub route_id: String,
    pub organization_id: String,
    pub status: RouteStatus,
    pub created_unix_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `DriverStatus` values.
pub enum DriverStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DriverRecord {
    pub driver_id: String,
    pub organization_id: String,
    pub name: String,
    pub status: DriverStatus,
    pub created_unix_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Assistant user profile, keyed by WhatsApp phone number.
pub struct UserProfileRecord {
    pub phone_number: String,
    pub organization_id: String,
    pub name: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}
