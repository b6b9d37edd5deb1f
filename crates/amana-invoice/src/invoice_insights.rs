use amana_core::format_naira;
use amana_store::InvoiceStatus;

use crate::invoice_view::IntelligentInvoice;

/// Margins strictly below this are flagged as thin.
pub const LOW_MARGIN_PERCENT: f64 = 20.0;
/// Margins strictly above this earn positive reinforcement.
pub const HIGH_MARGIN_PERCENT: f64 = 50.0;

/// Renders the ordered insight list for a derived invoice view: one status
/// row first, then the profitability rows, which apply regardless of status.
pub fn build_insights(view: &IntelligentInvoice) -> Vec<String> {
    let mut insights = vec![status_insight(view)];
    profitability_insights(view, &mut insights);
    insights
}

fn status_insight(view: &IntelligentInvoice) -> String {
    match view.status {
        InvoiceStatus::Draft => format!(
            "This invoice is still a draft. Send it to {} so payment can start counting.",
            view.client_name
        ),
        InvoiceStatus::Sent => match view.days_overdue {
            Some(days) => format!(
                "⚠️ This invoice is {days} day{} overdue. A follow-up with {} could help.",
                if days == 1 { "" } else { "s" },
                view.client_name
            ),
            None => "Invoice sent and awaiting payment.".to_string(),
        },
        InvoiceStatus::Paid => "✅ This invoice has been paid.".to_string(),
    }
}

fn profitability_insights(view: &IntelligentInvoice, insights: &mut Vec<String>) {
    if view.expenses > 0.0 {
        insights.push(format!(
            "You have logged {} in expenses against this invoice; expected profit is {}.",
            format_naira(view.expenses),
            format_naira(view.expected_balance)
        ));
    }

    if view.expected_balance <= 0.0 {
        if view.expenses > 0.0 || view.total > 0.0 {
            insights.push(format!(
                "🚨 Expenses match or exceed the invoice total — you are {} in the red on this job.",
                format_naira(view.expected_balance.abs())
            ));
        }
    } else if view.profit_margin < LOW_MARGIN_PERCENT {
        insights.push(format!(
            "Profit margin is {:.0}% — below {:.0}%. Keep an eye on further expenses.",
            view.profit_margin, LOW_MARGIN_PERCENT
        ));
    } else if view.profit_margin > HIGH_MARGIN_PERCENT {
        insights.push(format!(
            "💰 Great profit margin ({:.0}%). This job is performing well.",
            view.profit_margin
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::build_insights;
    use crate::invoice_view::derive_view;
    use amana_core::MS_PER_DAY;
    use amana_store::{InvoiceRecord, InvoiceStatus};

    fn invoice(total: f64, status: InvoiceStatus, due_unix_ms: Option<u64>) -> InvoiceRecord {
        InvoiceRecord {
            invoice_id: "id-1".to_string(),
            invoice_number: "INV-001".to_string(),
            organization_id: "org-1".to_string(),
            client_name: "Acme".to_string(),
            total,
            status,
            due_unix_ms,
            created_unix_ms: 0,
        }
    }

    #[test]
    fn healthy_margin_earns_reinforcement_and_no_loss_warning() {
        // INV-001: ₦250,000 total, ₦120,000 expenses -> 52% margin.
        let view = derive_view(&invoice(250_000.0, InvoiceStatus::Sent, None), 120_000.0, 0);
        let insights = build_insights(&view);

        assert!(insights
            .iter()
            .any(|line| line.contains("Great profit margin (52%)")));
        assert!(insights.iter().any(|line| line.contains("₦120,000")));
        assert!(!insights.iter().any(|line| line.contains("in the red")));
    }

    #[test]
    fn loss_produces_the_hard_warning_with_the_shortfall() {
        // INV-002: ₦100,000 total, ₦150,000 expenses -> ₦50,000 loss.
        let view = derive_view(&invoice(100_000.0, InvoiceStatus::Sent, None), 150_000.0, 0);
        let insights = build_insights(&view);

        assert!(insights
            .iter()
            .any(|line| line.contains("🚨") && line.contains("₦50,000")));
        assert!(!insights.iter().any(|line| line.contains("Great profit")));
    }

    #[test]
    fn thin_margin_gets_the_soft_warning() {
        let view = derive_view(&invoice(100_000.0, InvoiceStatus::Sent, None), 90_000.0, 0);
        let insights = build_insights(&view);
        assert!(insights.iter().any(|line| line.contains("below 20%")));
    }

    #[test]
    fn mid_margin_reports_totals_without_warnings() {
        let view = derive_view(&invoice(100_000.0, InvoiceStatus::Sent, None), 70_000.0, 0);
        let insights = build_insights(&view);
        assert!(insights.iter().any(|line| line.contains("₦70,000")));
        assert!(!insights.iter().any(|line| line.contains("below 20%")));
        assert!(!insights.iter().any(|line| line.contains("Great profit")));
    }

    #[test]
    fn empty_invoice_reports_status_only() {
        // Zero total and zero expenses: the balance is 0 but there is no
        // money at risk, so the loss warning stays silent.
        let view = derive_view(&invoice(0.0, InvoiceStatus::Draft, None), 0.0, 0);
        let insights = build_insights(&view);
        assert_eq!(insights.len(), 1);
        assert!(insights[0].contains("still a draft"));
    }

    #[test]
    fn status_rows_follow_the_decision_table() {
        let draft = derive_view(&invoice(1_000.0, InvoiceStatus::Draft, None), 0.0, 0);
        assert!(build_insights(&draft)[0].contains("still a draft"));

        let now = 11 * MS_PER_DAY;
        let overdue = derive_view(
            &invoice(1_000.0, InvoiceStatus::Sent, Some(MS_PER_DAY)),
            0.0,
            now,
        );
        assert!(build_insights(&overdue)[0].contains("10 days overdue"));

        let awaiting = derive_view(&invoice(1_000.0, InvoiceStatus::Sent, None), 0.0, 0);
        assert!(build_insights(&awaiting)[0].contains("awaiting payment"));

        let paid = derive_view(&invoice(1_000.0, InvoiceStatus::Paid, None), 0.0, 0);
        assert!(build_insights(&paid)[0].contains("has been paid"));
    }
}
