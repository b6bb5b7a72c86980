//! Shared text-analysis helpers for the rule library.
//!
//! Single source of truth for the keyword, money, and day-count scans that
//! several rules rely on. Rules call these instead of owning their own
//! regexes.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Dollar amount with optional thousands separators and cents,
    /// e.g. "$10,000" or "$2,500.00".
    pub static ref DOLLAR_PATTERN: Regex =
        Regex::new(r"\$\s?([0-9][0-9,]*(?:\.[0-9]{2})?)").unwrap();

    /// A day count, e.g. "21 days", "10 calendar days", "5 business days".
    pub static ref DAYS_PATTERN: Regex =
        Regex::new(r"(\d{1,3})\s*(?:calendar\s+|business\s+)?days?\b").unwrap();

    /// A percentage, e.g. "97%" or "3.5 %".
    pub static ref PERCENT_PATTERN: Regex =
        Regex::new(r"(\d{1,3}(?:\.\d+)?)\s*%").unwrap();

    /// Date in "MM/DD/YYYY" form following "dated" or "as of".
    pub static ref DATED_PATTERN: Regex =
        Regex::new(r"(?i)(?:dated|as of)\s+(\d{1,2}/\d{1,2}/\d{4})").unwrap();
}

/// Case-insensitive substring check.
pub fn contains_keyword(text: &str, keyword: &str) -> bool {
    text.to_lowercase().contains(&keyword.to_lowercase())
}

/// Whether any of the keywords appears in the text (case-insensitive).
pub fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|kw| lower.contains(kw))
}

/// Keywords from the list that appear in the text, in list order.
pub fn matching_keywords<'a>(text: &str, keywords: &[&'a str]) -> Vec<&'a str> {
    let lower = text.to_lowercase();
    keywords
        .iter()
        .filter(|kw| lower.contains(**kw))
        .copied()
        .collect()
}

/// All substrings of `text` matched by `pattern`, in order.
pub fn find_matches(text: &str, pattern: &Regex) -> Vec<String> {
    pattern
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// First numeric value embedded in a matched string, commas stripped.
pub fn extract_number(matched: &str) -> Option<f64> {
    let cleaned: String = matched
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    cleaned.replace(',', "").parse().ok()
}

/// Dollar amounts in the text, in order of appearance.
pub fn dollar_amounts(text: &str) -> Vec<f64> {
    DOLLAR_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).and_then(|m| extract_number(m.as_str())))
        .collect()
}

/// Snap a byte index to the nearest char boundary at or before it.
fn floor_boundary(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Dollar amount closest to any occurrence of `keyword` within `window`
/// bytes, looking both directions. Covers both "earnest money of $10,000"
/// and "$2,000 earnest money".
pub fn dollar_amount_near(text: &str, keyword: &str, window: usize) -> Option<f64> {
    let lower = text.to_lowercase();
    let keyword = keyword.to_lowercase();

    let mut best: Option<(usize, f64)> = None;
    let mut search = 0;
    while let Some(pos) = lower[search..].find(&keyword) {
        let at = floor_boundary(text, search + pos);
        let kw_end = floor_boundary(text, at + keyword.len());

        for m in DOLLAR_PATTERN.captures_iter(text) {
            let Some(whole) = m.get(0) else { continue };
            let distance = if whole.start() >= kw_end {
                whole.start() - kw_end
            } else if whole.end() <= at {
                at - whole.end()
            } else {
                0
            };
            if distance > window {
                continue;
            }
            if let Some(amount) = m.get(1).and_then(|g| extract_number(g.as_str())) {
                if best.map_or(true, |(d, _)| distance < d) {
                    best = Some((distance, amount));
                }
            }
        }

        search = at + keyword.len().max(1);
    }
    best.map(|(_, amount)| amount)
}

/// First day count appearing within `window` bytes after any occurrence of
/// `keyword` (case-insensitive).
pub fn days_near(text: &str, keyword: &str, window: usize) -> Option<u32> {
    let lower = text.to_lowercase();
    let keyword = keyword.to_lowercase();

    let mut search = 0;
    while let Some(pos) = lower[search..].find(&keyword) {
        let at = floor_boundary(text, search + pos);
        let end = floor_boundary(text, at + keyword.len() + window);
        let slice = &text[at..end];
        if let Some(caps) = DAYS_PATTERN.captures(slice) {
            if let Ok(days) = caps[1].parse() {
                return Some(days);
            }
        }
        search = at + keyword.len();
    }
    None
}

/// Slice `window` bytes around a byte position, snapped to char
/// boundaries.
pub fn window_around(text: &str, at: usize, window: usize) -> &str {
    let start = floor_boundary(text, at.saturating_sub(window));
    let end = floor_boundary(text, at + window);
    &text[start..end]
}

/// First percentage in the text.
pub fn first_percent(text: &str) -> Option<f64> {
    PERCENT_PATTERN
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

/// Whether the contract reads as an all-cash purchase.
pub fn is_cash_purchase(text: &str) -> bool {
    contains_any(text, &["all cash", "all-cash", "no financing"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_keyword_case_insensitive() {
        assert!(contains_keyword("Financing Contingency applies", "financing"));
        assert!(!contains_keyword("inspection only", "financing"));
    }

    #[test]
    fn test_dollar_amounts() {
        let amounts = dollar_amounts("deposit of $10,000 toward $500,000 price");
        assert_eq!(amounts, vec![10_000.0, 500_000.0]);
    }

    #[test]
    fn test_dollar_amount_near_after_keyword() {
        let text = "Buyer shall deposit earnest money of $10,000 with escrow.";
        assert_eq!(dollar_amount_near(text, "earnest money", 40), Some(10_000.0));
    }

    #[test]
    fn test_dollar_amount_near_before_keyword() {
        let text = "A deposit of $2,000 earnest money is due on acceptance.";
        assert_eq!(dollar_amount_near(text, "earnest money", 40), Some(2_000.0));
    }

    #[test]
    fn test_days_near() {
        let text = "The financing contingency shall remain in effect for 21 days.";
        assert_eq!(days_near(text, "financing contingency", 80), Some(21));
        assert_eq!(days_near(text, "inspection", 80), None);
    }

    #[test]
    fn test_days_near_scans_later_occurrences() {
        let text = "A home inspection is required. The inspection period is 10 days.";
        assert_eq!(days_near(text, "inspection", 40), Some(10));
    }

    #[test]
    fn test_cash_purchase_detection() {
        assert!(is_cash_purchase("This is an all cash offer"));
        assert!(is_cash_purchase("No financing is involved"));
        assert!(!is_cash_purchase("Conventional financing applies"));
    }

    #[test]
    fn test_dated_pattern() {
        let caps = DATED_PATTERN.captures("report dated 03/15/2024").unwrap();
        assert_eq!(&caps[1], "03/15/2024");

        let caps = DATED_PATTERN.captures("as of 1/2/2023, complete").unwrap();
        assert_eq!(&caps[1], "1/2/2023");
    }

    #[test]
    fn test_extract_number_strips_commas() {
        assert_eq!(extract_number("$1,234,567"), Some(1_234_567.0));
        assert_eq!(extract_number("no digits"), None);
    }
}
