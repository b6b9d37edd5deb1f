//! Invoice intelligence for the Amana assistant.
//!
//! Computes the expense-adjusted profitability view of an invoice, renders
//! the fixed insight table, and authors new expense records. The derived
//! view is recomputed on every query and never cached.
mod invoice_engine;
mod invoice_insights;
mod invoice_view;

pub use invoice_engine::{
    AddExpenseOutcome, BalanceReport, ExpenseListing, InvoiceIntelligence, InvoiceLookup,
    NewExpense, StatusReport, NOT_FOUND_SUGGESTION_LIMIT,
};
pub use invoice_insights::{build_insights, HIGH_MARGIN_PERCENT, LOW_MARGIN_PERCENT};
pub use invoice_view::{derive_view, IntelligentInvoice};
