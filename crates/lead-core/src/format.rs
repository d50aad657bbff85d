//! Input masks and display helpers shared by the portals.

const CARD_DIGITS: usize = 16;
const EXPIRY_DIGITS: usize = 4;

/// Digits only, at most 16, grouped by four.
pub fn format_card_number(input: &str) -> String {
    let digits: Vec<char> = input
        .chars()
        .filter(char::is_ascii_digit)
        .take(CARD_DIGITS)
        .collect();
    let mut out = String::with_capacity(digits.len() + 3);
    for (idx, ch) in digits.iter().enumerate() {
        if idx > 0 && idx % 4 == 0 {
            out.push(' ');
        }
        out.push(*ch);
    }
    out
}

/// `MMYY` digits with a slash after the month once the year starts.
pub fn format_expiry(input: &str) -> String {
    let digits: String = input
        .chars()
        .filter(char::is_ascii_digit)
        .take(EXPIRY_DIGITS)
        .collect();
    if digits.len() > 2 {
        format!("{}/{}", &digits[..2], &digits[2..])
    } else {
        digits
    }
}

pub fn clean_charge(input: &str) -> String {
    input
        .chars()
        .filter(|ch| ch.is_ascii_digit() || *ch == '.')
        .collect()
}

pub fn clean_card_number(input: &str) -> String {
    input.chars().filter(|ch| !ch.is_whitespace()).collect()
}

pub fn clean_expiry(input: &str) -> String {
    input.chars().filter(|ch| *ch != '/' && *ch != '\\').collect()
}

/// First word, then everything after it.
pub fn split_holder_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

/// Lenient amount parse: `"$1,234.50"` → 1234.5, garbage → 0.
pub fn parse_amount(input: &str) -> f64 {
    clean_charge(input).parse::<f64>().unwrap_or(0.0)
}

/// `$1,234.50` style with two decimals.
pub fn format_currency(amount: f64) -> String {
    let negative = amount < 0.0;
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if negative {
        format!("-${grouped}.{cents}")
    } else {
        format!("${grouped}.{cents}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_number_is_grouped_and_capped() {
        assert_eq!(format_card_number("4111111111111111"), "4111 1111 1111 1111");
        assert_eq!(format_card_number("4111-1111-11"), "4111 1111 11");
        assert_eq!(format_card_number("41111111111111119999"), "4111 1111 1111 1111");
        assert_eq!(format_card_number("4111"), "4111");
        assert_eq!(format_card_number(""), "");
    }

    #[test]
    fn expiry_gets_slash_after_month() {
        assert_eq!(format_expiry("1"), "1");
        assert_eq!(format_expiry("12"), "12");
        assert_eq!(format_expiry("123"), "12/3");
        assert_eq!(format_expiry("12/27"), "12/27");
        assert_eq!(format_expiry("122799"), "12/27");
    }

    #[test]
    fn pending_card_cleanups() {
        assert_eq!(clean_charge("$1,250.00"), "1250.00");
        assert_eq!(clean_card_number("4111 1111 1111 1111"), "4111111111111111");
        assert_eq!(clean_expiry("12/27"), "1227");
        assert_eq!(
            split_holder_name("  Mary Ann Smith "),
            ("Mary".to_string(), "Ann Smith".to_string())
        );
        assert_eq!(split_holder_name(""), (String::new(), String::new()));
    }

    #[test]
    fn currency_uses_thousands_separators() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(999.5), "$999.50");
        assert_eq!(format_currency(1234567.891), "$1,234,567.89");
        assert_eq!(parse_amount("$1,234.50"), 1234.5);
        assert_eq!(parse_amount("n/a"), 0.0);
    }
}
