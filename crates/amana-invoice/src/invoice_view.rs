use serde::{Deserialize, Serialize};

use amana_core::whole_days_between_ms;
use amana_store::{InvoiceRecord, InvoiceStatus};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Expense-adjusted view of one invoice. Derived, never stored.
pub struct IntelligentInvoice {
    pub invoice_number: String,
    pub client_name: String,
    pub status: InvoiceStatus,
    pub total: f64,
    pub expenses: f64,
    pub expected_balance: f64,
    pub profit_margin: f64,
    /// Present only when the invoice is not Paid and its due date has
    /// passed; whole days elapsed since the due date.
    pub days_overdue: Option<u64>,
    pub is_profitable: bool,
}

/// Joins an invoice with the sum of its linked expenses as of `now_unix_ms`.
pub fn derive_view(
    invoice: &InvoiceRecord,
    expense_total: f64,
    now_unix_ms: u64,
) -> IntelligentInvoice {
    let expected_balance = invoice.total - expense_total;
    let profit_margin = if invoice.total == 0.0 {
        0.0
    } else {
        expected_balance / invoice.total * 100.0
    };
    let days_overdue = match (invoice.status, invoice.due_unix_ms) {
        (InvoiceStatus::Paid, _) => None,
        (_, Some(due)) if due < now_unix_ms => Some(whole_days_between_ms(due, now_unix_ms)),
        _ => None,
    };

    IntelligentInvoice {
        invoice_number: invoice.invoice_number.clone(),
        client_name: invoice.client_name.clone(),
        status: invoice.status,
        total: invoice.total,
        expenses: expense_total,
        expected_balance,
        profit_margin,
        days_overdue,
        is_profitable: expected_balance > 0.0,
    }
}
