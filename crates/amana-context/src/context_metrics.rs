use amana_store::{DriverRecord, DriverStatus, InvoiceRecord, InvoiceStatus, RouteRecord};

use crate::context_types::BusinessMetrics;

/// Accumulates the metrics slice in one pass over the organization's
/// invoices. Overdue applies only to non-Paid invoices with a due date in
/// the past relative to `now_unix_ms`; revenue totals Paid invoices only.
pub fn compute_business_metrics(
    invoices: &[InvoiceRecord],
    wallet_balance: f64,
    routes: &[RouteRecord],
    drivers: &[DriverRecord],
    now_unix_ms: u64,
) -> BusinessMetrics {
    let mut metrics = BusinessMetrics {
        wallet_balance,
        ..BusinessMetrics::default()
    };

    for invoice in invoices {
        metrics.total_invoices += 1;
        match invoice.status {
            InvoiceStatus::Paid => {
                metrics.revenue += invoice.total;
            }
            InvoiceStatus::Draft | InvoiceStatus::Sent => {
                metrics.unpaid_invoices += 1;
                if matches!(invoice.due_unix_ms, Some(due) if due < now_unix_ms) {
                    metrics.overdue_invoices += 1;
                }
            }
        }
    }

    metrics.active_routes = routes
        .iter()
        .filter(|route| route.status.is_active())
        .count() as u64;
    metrics.active_drivers = drivers
        .iter()
        .filter(|driver| driver.status == DriverStatus::Active)
        .count() as u64;

    metrics
}
