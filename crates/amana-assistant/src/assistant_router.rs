use std::sync::OnceLock;

use regex::Regex;

use amana_context::MemoryPointers;

const ADD_TOKENS: &[&str] = &["add", "log", "record", "spent", "spend"];
const LIST_TOKENS: &[&str] = &["list", "show", "all expenses", "how many expenses"];
const EXPENSE_TOKENS: &[&str] = &["expense", "expenses", "cost", "spent", "spend"];
const BALANCE_TOKENS: &[&str] = &["balance", "profit", "remaining", "how much left"];
const STATUS_TOKENS: &[&str] = &["status", "invoice", "paid", "overdue"];

#[derive(Debug, Clone, PartialEq)]
/// Fixed catalog of invoice tasks this core handles itself. Anything else
/// is `Unrouted` and goes to the external action handler.
pub enum TaskAction {
    CheckStatus {
        invoice_number: Option<String>,
    },
    AddExpense {
        invoice_number: Option<String>,
        amount: Option<f64>,
        description: String,
    },
    GetBalance {
        invoice_number: Option<String>,
    },
    ListExpenses {
        invoice_number: Option<String>,
    },
    Unrouted,
}

impl TaskAction {
    pub fn intent_label(&self) -> Option<&'static str> {
        match self {
            Self::CheckStatus { .. } => Some("check_invoice_status"),
            Self::AddExpense { .. } => Some("add_expense"),
            Self::GetBalance { .. } => Some("get_balance"),
            Self::ListExpenses { .. } => Some("list_expenses"),
            Self::Unrouted => None,
        }
    }
}

fn invoice_number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\binv[\s/-]?(\d+)\b").expect("invoice number regex"))
}

fn amount_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:₦|ngn\s?|n)?(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d+))?\s*(k\b)?")
            .expect("amount regex")
    })
}

fn for_clause_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i) for ").expect("for clause regex"))
}

/// Pulls an explicit `INV-…` token out of the message, normalized to the
/// stored `INV-<digits>` form.
pub fn extract_invoice_number(message: &str) -> Option<String> {
    invoice_number_regex()
        .captures(message)
        .map(|captures| format!("INV-{}", &captures[1]))
}

/// Parses a naira amount: tolerates `₦`, `N`/`NGN` prefixes, comma
/// grouping, decimals, and the `k` thousands shorthand.
pub fn parse_amount(fragment: &str) -> Option<f64> {
    let captures = amount_regex().captures(fragment)?;
    let whole: String = captures[1].replace(',', "");
    let mut value: f64 = whole.parse().ok()?;
    if let Some(decimals) = captures.get(2) {
        let fraction: f64 = format!("0.{}", decimals.as_str()).parse().ok()?;
        value += fraction;
    }
    if captures.get(3).is_some() {
        value *= 1_000.0;
    }
    Some(value)
}

/// Keyword router over the fixed task catalog. The invoice number falls
/// back to the memory pointer so "that invoice" keeps working across turns.
pub fn route_task(message: &str, memory: &MemoryPointers) -> TaskAction {
    let normalized = message.to_lowercase();
    let invoice_number = extract_invoice_number(message)
        .or_else(|| memory.last_invoice_number.clone());

    if contains_any(&normalized, EXPENSE_TOKENS) {
        if contains_any(&normalized, LIST_TOKENS) {
            return TaskAction::ListExpenses { invoice_number };
        }

        // Strip the invoice token so its digits are not read as the amount.
        let without_invoice = invoice_number_regex().replace_all(message, " ");
        let amount = parse_amount(&without_invoice);
        if amount.is_some() || contains_any(&normalized, ADD_TOKENS) {
            return TaskAction::AddExpense {
                invoice_number,
                amount,
                description: expense_description(&without_invoice),
            };
        }
        return TaskAction::ListExpenses { invoice_number };
    }

    if contains_any(&normalized, BALANCE_TOKENS) {
        return TaskAction::GetBalance { invoice_number };
    }

    if contains_any(&normalized, STATUS_TOKENS) {
        return TaskAction::CheckStatus { invoice_number };
    }

    TaskAction::Unrouted
}

/// Free-text description: the clause after the last " for ", minus any
/// amount token, defaulting to a generic label. The separator is matched
/// on the original string so the slice offsets stay on char boundaries.
fn expense_description(message: &str) -> String {
    let clause = match for_clause_regex().find_iter(message).last() {
        Some(found) => &message[found.end()..],
        None => return "General expense".to_string(),
    };
    let cleaned = amount_regex().replace_all(clause, " ");
    let cleaned = cleaned
        .trim()
        .trim_matches(|c: char| c.is_ascii_punctuation())
        .trim();
    if cleaned.is_empty() {
        "General expense".to_string()
    } else {
        cleaned.to_string()
    }
}

fn contains_any(normalized: &str, tokens: &[&str]) -> bool {
    tokens.iter().any(|token| normalized.contains(token))
}
