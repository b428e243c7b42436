/// Unit words that appear next to prices on the site ("toman" and "rial").
const UNIT_WORDS: [&str; 2] = ["تومان", "ریال"];

/// Convert a localized number ("۱۲۳,۴۵۶ تومان", "٧٥ متر", "1400") into an integer.
///
/// Persian and Arabic-Indic digits are mapped to ASCII, thousands separators,
/// whitespace, bidi marks and the currency words are dropped, and the leading
/// run of digits is parsed. Returns `None` for missing input or when no digits
/// lead the cleaned text (e.g. "توافقی").
pub fn normalize_number(text: Option<&str>) -> Option<i64> {
    let text = text?;

    let mut cleaned = String::with_capacity(text.len());
    for c in text.chars() {
        if let Some(d) = ascii_digit(c) {
            cleaned.push(d);
        } else if !is_ignorable(c) {
            cleaned.push(c);
        }
    }

    for word in UNIT_WORDS {
        cleaned = cleaned.replace(word, "");
    }

    parse_leading_int(&cleaned)
}

/// Shorthand for the common `Option<String>` case.
pub fn normalize_owned(text: &Option<String>) -> Option<i64> {
    normalize_number(text.as_deref())
}

fn ascii_digit(c: char) -> Option<char> {
    let offset = match c {
        '۰'..='۹' => c as u32 - '۰' as u32,
        '٠'..='٩' => c as u32 - '٠' as u32,
        _ => return None,
    };
    char::from_digit(offset, 10)
}

fn is_ignorable(c: char) -> bool {
    matches!(
        c,
        ',' | '،' | '٬' | '\u{200c}' | '\u{200e}' | '\u{200f}' | '\u{061c}'
    ) || c.is_whitespace()
}

fn parse_leading_int(s: &str) -> Option<i64> {
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(digits.len());

    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}
