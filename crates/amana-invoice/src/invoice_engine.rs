use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use amana_core::{current_unix_timestamp_ms, format_naira};
use amana_store::{
    ExpenseRecord, ExpenseStore, InvoiceStore, StoreError, EXPENSE_DEFAULT_CATEGORY,
};

use crate::invoice_insights::build_insights;
use crate::invoice_view::{derive_view, IntelligentInvoice};

pub const NOT_FOUND_SUGGESTION_LIMIT: usize = 3;

static EXPENSE_COUNTER: AtomicU64 = AtomicU64::new(1);

fn new_expense_id() -> String {
    let millis = current_unix_timestamp_ms();
    let count = EXPENSE_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("exp-{millis}-{count}")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
/// Lookup result shared by the read operations. `NotFound` is a recoverable,
/// user-facing outcome, never an error.
pub enum InvoiceLookup<T> {
    Found(T),
    NotFound {
        invoice_number: String,
        message: String,
        suggestions: Vec<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Derived view plus the ordered human-readable insight list.
pub struct StatusReport {
    pub invoice: IntelligentInvoice,
    pub insights: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Input for a new expense; everything else is filled in by the engine.
pub struct NewExpense {
    pub description: String,
    pub amount: f64,
    #[serde(default)]
    pub category: Option<String>,
    pub created_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
/// Enumerates supported `AddExpenseOutcome` values.
pub enum AddExpenseOutcome {
    Added {
        expense: ExpenseRecord,
        report: StatusReport,
    },
    InvoiceNotFound {
        invoice_number: String,
        message: String,
        suggestions: Vec<String>,
    },
    Rejected {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Formatting wrapper over the derived view for balance questions.
pub struct BalanceReport {
    pub invoice_number: String,
    pub client_name: String,
    pub total: f64,
    pub expenses: f64,
    pub expected_balance: f64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// All expenses linked to one invoice, newest first, plus their sum.
pub struct ExpenseListing {
    pub invoice_number: String,
    pub entries: Vec<ExpenseRecord>,
    pub total_expenses: f64,
}

/// The one component that mutates financial records: computes profitability
/// views and authors expense records. Holds repository handles, no state.
#[derive(Clone)]
pub struct InvoiceIntelligence {
    invoices: Arc<dyn InvoiceStore>,
    expenses: Arc<dyn ExpenseStore>,
}

impl InvoiceIntelligence {
    pub fn new(invoices: Arc<dyn InvoiceStore>, expenses: Arc<dyn ExpenseStore>) -> Self {
        Self { invoices, expenses }
    }

    /// Looks up the invoice, sums its linked expenses, and renders the
    /// insight table. The view is recomputed from the current expense set on
    /// every call.
    pub async fn check_status(
        &self,
        organization_id: &str,
        invoice_number: &str,
    ) -> Result<InvoiceLookup<StatusReport>, StoreError> {
        let Some(invoice) = self
            .invoices
            .find_by_number(organization_id, invoice_number)
            .await?
        else {
            return self.not_found(organization_id, invoice_number).await;
        };

        let linked = self.expenses.list_for_invoice(&invoice.invoice_id).await?;
        let expense_total: f64 = linked.iter().map(|record| record.amount).sum();
        let view = derive_view(&invoice, expense_total, current_unix_timestamp_ms());
        let insights = build_insights(&view);

        Ok(InvoiceLookup::Found(StatusReport {
            invoice: view,
            insights,
        }))
    }

    /// Validates, writes the immutable expense record, then re-derives the
    /// status report so the reply can never be stale relative to concurrent
    /// additions.
    pub async fn add_expense(
        &self,
        organization_id: &str,
        invoice_number: &str,
        new_expense: NewExpense,
    ) -> Result<AddExpenseOutcome, StoreError> {
        if new_expense.amount <= 0.0 {
            return Ok(AddExpenseOutcome::Rejected {
                message: "Expense amount must be greater than zero. \
                          Try something like: add ₦5,000 expense for fuel."
                    .to_string(),
            });
        }
        if new_expense.description.trim().is_empty() {
            return Ok(AddExpenseOutcome::Rejected {
                message: "What was the expense for? Add a short description, \
                          e.g. add ₦5,000 expense for fuel."
                    .to_string(),
            });
        }

        let Some(invoice) = self
            .invoices
            .find_by_number(organization_id, invoice_number)
            .await?
        else {
            let suggestions = self.suggestions(organization_id).await;
            return Ok(AddExpenseOutcome::InvoiceNotFound {
                invoice_number: invoice_number.to_string(),
                message: not_found_message(invoice_number, &suggestions),
                suggestions,
            });
        };

        let now = current_unix_timestamp_ms();
        let record = ExpenseRecord {
            expense_id: new_expense_id(),
            invoice_id: invoice.invoice_id.clone(),
            organization_id: organization_id.to_string(),
            description: new_expense.description.trim().to_string(),
            amount: new_expense.amount,
            category: new_expense
                .category
                .filter(|category| !category.trim().is_empty())
                .unwrap_or_else(|| EXPENSE_DEFAULT_CATEGORY.to_string()),
            date_unix_ms: now,
            created_by: new_expense.created_by,
            created_unix_ms: now,
        };
        self.expenses.insert(record.clone()).await?;
        tracing::debug!(
            invoice_number = %invoice.invoice_number,
            amount = record.amount,
            "expense recorded"
        );

        match self.check_status(organization_id, invoice_number).await? {
            InvoiceLookup::Found(report) => Ok(AddExpenseOutcome::Added {
                expense: record,
                report,
            }),
            InvoiceLookup::NotFound {
                invoice_number,
                message,
                suggestions,
            } => Ok(AddExpenseOutcome::InvoiceNotFound {
                invoice_number,
                message,
                suggestions,
            }),
        }
    }

    /// Thin formatting wrapper over `check_status`.
    pub async fn get_balance(
        &self,
        organization_id: &str,
        invoice_number: &str,
    ) -> Result<InvoiceLookup<BalanceReport>, StoreError> {
        match self.check_status(organization_id, invoice_number).await? {
            InvoiceLookup::Found(report) => {
                let view = report.invoice;
                let message = format!(
                    "{} for {}: total {}, expenses {}, expected balance {}.",
                    view.invoice_number,
                    view.client_name,
                    format_naira(view.total),
                    format_naira(view.expenses),
                    format_naira(view.expected_balance)
                );
                Ok(InvoiceLookup::Found(BalanceReport {
                    invoice_number: view.invoice_number,
                    client_name: view.client_name,
                    total: view.total,
                    expenses: view.expenses,
                    expected_balance: view.expected_balance,
                    message,
                }))
            }
            InvoiceLookup::NotFound {
                invoice_number,
                message,
                suggestions,
            } => Ok(InvoiceLookup::NotFound {
                invoice_number,
                message,
                suggestions,
            }),
        }
    }

    /// All linked expenses newest first plus their sum; the sum always
    /// matches the `expenses` field `check_status` computes for the same
    /// invoice.
    pub async fn list_expenses(
        &self,
        organization_id: &str,
        invoice_number: &str,
    ) -> Result<InvoiceLookup<ExpenseListing>, StoreError> {
        let Some(invoice) = self
            .invoices
            .find_by_number(organization_id, invoice_number)
            .await?
        else {
            return self.not_found(organization_id, invoice_number).await;
        };

        let entries = self.expenses.list_for_invoice(&invoice.invoice_id).await?;
        let total_expenses = entries.iter().map(|record| record.amount).sum();

        Ok(InvoiceLookup::Found(ExpenseListing {
            invoice_number: invoice.invoice_number,
            entries,
            total_expenses,
        }))
    }

    async fn not_found<T>(
        &self,
        organization_id: &str,
        invoice_number: &str,
    ) -> Result<InvoiceLookup<T>, StoreError> {
        let suggestions = self.suggestions(organization_id).await;
        Ok(InvoiceLookup::NotFound {
            invoice_number: invoice_number.to_string(),
            message: not_found_message(invoice_number, &suggestions),
            suggestions,
        })
    }

    async fn suggestions(&self, organization_id: &str) -> Vec<String> {
        match self
            .invoices
            .recent_invoice_numbers(organization_id, NOT_FOUND_SUGGESTION_LIMIT)
            .await
        {
            Ok(numbers) => numbers,
            Err(error) => {
                tracing::warn!(error = %error, "could not load invoice suggestions");
                Vec::new()
            }
        }
    }
}

fn not_found_message(invoice_number: &str, suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        format!("I couldn't find invoice {invoice_number}. Abeg check the number and try again.")
    } else {
        format!(
            "I couldn't find invoice {invoice_number}. Recent ones: {}.",
            suggestions.join(", ")
        )
    }
}
