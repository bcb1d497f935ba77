//! Display formatting for report cells.

/// Placeholder rendered when a ratio has a zero denominator.
pub const NOT_APPLICABLE: &str = "-";

/// Formats a percentage value with two decimals, e.g. `12.50`.
///
/// Non-finite inputs render as [`NOT_APPLICABLE`].
pub fn format_percent(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.2}")
    } else {
        NOT_APPLICABLE.to_string()
    }
}

/// Formats `100 * numerator / denominator` with two decimals.
///
/// # Examples
///
/// ```
/// use redcap_common::format_ratio_percent;
///
/// assert_eq!(format_ratio_percent(1, 4), "25.00");
/// assert_eq!(format_ratio_percent(3, 0), "-");
/// ```
pub fn format_ratio_percent(numerator: i64, denominator: i64) -> String {
    if denominator == 0 {
        return NOT_APPLICABLE.to_string();
    }
    format_percent(100.0 * numerator as f64 / denominator as f64)
}

/// Formats an elapsed whole-day count, e.g. `3 days`.
pub fn format_days(days: i64) -> String {
    format!("{days} days")
}
