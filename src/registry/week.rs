//! Conversion of the registry's compact year+week tokens.

use chrono::{Days, NaiveDate, Weekday};

/// Converts a `YYYYWW` token (4-digit year, 2-digit ISO week) to the Monday of that week.
///
/// Returns `None` when the token is empty, `"0"`, shorter than six characters,
/// not numeric, or names a year outside 2000..2100 or a week outside 1..=53.
/// The year 2100 itself is rejected.
/// Characters after the sixth are ignored.
///
/// Week 53 of a year that only has 52 ISO weeks rolls over into week 1 of
/// the following year.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use site_monitor::registry::convert_week_to_date;
///
/// assert_eq!(convert_week_to_date("202507"), NaiveDate::from_ymd_opt(2025, 2, 10));
/// assert_eq!(convert_week_to_date("0"), None);
/// ```
pub fn convert_week_to_date(token: &str) -> Option<NaiveDate> {
    let token = token.trim();
    if token.is_empty() || token == "0" || token.len() < 6 {
        return None;
    }

    let year: i32 = token.get(0..4)?.parse().ok()?;
    let week: u64 = token.get(4..6)?.parse().ok()?;
    if !(2000..2100).contains(&year) || !(1..=53).contains(&week) {
        return None;
    }

    let first_monday = NaiveDate::from_isoywd_opt(year, 1, Weekday::Mon)?;
    first_monday.checked_add_days(Days::new((week - 1) * 7))
}
