/// Formats a naira amount with thousands grouping, e.g. `₦250,000` or
/// `₦1,250.50`. Kobo digits are shown only when the amount is not whole.
pub fn format_naira(amount: f64) -> String {
    let negative = amount < 0.0;
    let rounded = (amount.abs() * 100.0).round() / 100.0;
    let whole = rounded.trunc() as u64;
    let kobo = ((rounded - rounded.trunc()) * 100.0).round() as u64;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    if kobo == 0 {
        format!("{sign}₦{grouped}")
    } else {
        format!("{sign}₦{grouped}.{kobo:02}")
    }
}
