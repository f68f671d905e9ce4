//! Cell-level cleaning. Parsing is lenient: anything that is not a number
//! becomes `None` and callers substitute zero.

/// Parse a numeric cell such as `1,234`, `4.5%` or `AED 12.30`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '%' | '"' | ' ' | '\u{a0}'))
        .collect();
    let cleaned = cleaned.trim_start_matches(|c: char| c.is_alphabetic());
    if cleaned.is_empty() || cleaned == "--" {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Trim and remove quote characters left behind by spreadsheet export.
pub fn clean_text(raw: &str) -> String {
    raw.replace("\"\"\"", "\"")
        .trim()
        .trim_matches('"')
        .trim()
        .to_string()
}

/// Keywords are compared case-insensitively everywhere, so store them
/// lowercased.
pub fn clean_keyword(raw: &str) -> String {
    clean_text(raw).to_lowercase()
}

/// Report total and subtotal rows carry a `Total:` marker.
pub fn is_totals_marker(raw: &str) -> bool {
    raw.to_lowercase().contains("total:")
}

/// Empty cell or a placeholder such as `--`.
pub fn is_blank(raw: &str) -> bool {
    let t = raw.trim();
    t.is_empty() || t == "--" || t.eq_ignore_ascii_case("nan")
}
