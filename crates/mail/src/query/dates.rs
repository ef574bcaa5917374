//! Date expression parser
//!
//! Resolves the date strings accepted by `--since` / `--until` into absolute
//! UTC timestamps:
//! - `30m` minutes, `2h` hours, `7d` days, `2w` weeks, `3M` months, `1y` years
//!   (all "now minus N units"; `M` is case-sensitive and means months)
//! - `today`, `yesterday`, `tomorrow`
//! - `last-week`, `this-week`, `last-month`, `this-month`, `last-year`, `this-year`
//! - weekday names or abbreviations (`friday`, `fri`) and `last-<weekday>`
//! - absolute `YYYY-MM-DD` (UTC midnight)
//!
//! Month and year arithmetic is calendar based: the day of month is clamped
//! to the last valid day of the target month, so `1M` on March 31st lands on
//! February 28th (or 29th).

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveTime, TimeDelta, Utc, Weekday};

use crate::error::QueryError;

/// Parse a date expression relative to the current time
pub fn parse_date_expression(text: &str) -> Result<DateTime<Utc>, QueryError> {
    parse_date_expression_at(text, Utc::now())
}

/// Parse a date expression relative to `now`
pub fn parse_date_expression_at(
    text: &str,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, QueryError> {
    let original = text.trim();
    let invalid = || QueryError::InvalidDateFormat {
        input: original.to_string(),
    };

    // Uppercase M must be tried before the case-insensitive forms, where it
    // would collapse into minutes.
    if let Some((count, 'M')) = split_count(original) {
        return months_before(now, count).ok_or_else(invalid);
    }

    let lower = original.to_lowercase();

    if let Some((count, unit)) = split_count(&lower) {
        let count = i64::from(count);
        let resolved = match unit {
            'm' => TimeDelta::try_minutes(count).and_then(|d| now.checked_sub_signed(d)),
            'h' => TimeDelta::try_hours(count).and_then(|d| now.checked_sub_signed(d)),
            'd' => TimeDelta::try_days(count).and_then(|d| now.checked_sub_signed(d)),
            'w' => TimeDelta::try_weeks(count).and_then(|d| now.checked_sub_signed(d)),
            'y' => u32::try_from(count)
                .ok()
                .and_then(|n| n.checked_mul(12))
                .and_then(|months| months_before(now, months)),
            _ => None,
        };
        return resolved.ok_or_else(invalid);
    }

    let named = match lower.as_str() {
        "today" => Some(start_of_day(now)),
        "yesterday" => Some(now - TimeDelta::days(1)),
        "tomorrow" => Some(start_of_day(now + TimeDelta::days(1))),
        "last-week" => Some(now - TimeDelta::weeks(1)),
        "this-week" => {
            let since_monday = now.weekday().num_days_from_monday();
            Some(start_of_day(now - TimeDelta::days(i64::from(since_monday))))
        }
        "last-month" => months_before(now, 1),
        "this-month" => now.date_naive().with_day(1).map(midnight),
        "last-year" => months_before(now, 12),
        "this-year" => NaiveDate::from_ymd_opt(now.year(), 1, 1).map(midnight),
        _ => None,
    };
    if let Some(resolved) = named {
        return Ok(resolved);
    }

    if let Some(weekday) = parse_weekday(&lower) {
        return Ok(most_recent_weekday(now, weekday, true));
    }

    if let Some(weekday) = lower.strip_prefix("last-").and_then(parse_weekday) {
        return Ok(most_recent_weekday(now, weekday, false));
    }

    parse_absolute(original).ok_or_else(invalid)
}

/// Validate that a date range makes sense (`since <= until`)
pub fn validate_date_range(
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
) -> Result<(), QueryError> {
    match (since, until) {
        (Some(since), Some(until)) if since > until => {
            Err(QueryError::InvalidRange { since, until })
        }
        _ => Ok(()),
    }
}

/// Split `"<digits><unit>"` into its count and unit character
fn split_count(input: &str) -> Option<(u32, char)> {
    let unit = input.chars().last()?;
    let digits = &input[..input.len() - unit.len_utf8()];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(|count| (count, unit))
}

fn months_before(now: DateTime<Utc>, months: u32) -> Option<DateTime<Utc>> {
    now.checked_sub_months(Months::new(months))
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn start_of_day(instant: DateTime<Utc>) -> DateTime<Utc> {
    midnight(instant.date_naive())
}

/// Full weekday names and their three-letter abbreviations
fn parse_weekday(input: &str) -> Option<Weekday> {
    let weekday = match input {
        "monday" | "mon" => Weekday::Mon,
        "tuesday" | "tue" => Weekday::Tue,
        "wednesday" | "wed" => Weekday::Wed,
        "thursday" | "thu" => Weekday::Thu,
        "friday" | "fri" => Weekday::Fri,
        "saturday" | "sat" => Weekday::Sat,
        "sunday" | "sun" => Weekday::Sun,
        _ => return None,
    };
    Some(weekday)
}

/// Midnight of the most recent `target` weekday.
///
/// When `now` already falls on `target`, a bare weekday name resolves to
/// today (`include_today`), while the `last-` form goes back a full week.
fn most_recent_weekday(now: DateTime<Utc>, target: Weekday, include_today: bool) -> DateTime<Utc> {
    let today = now.weekday().num_days_from_monday();
    let mut days_back = (today + 7 - target.num_days_from_monday()) % 7;
    if days_back == 0 && !include_today {
        days_back = 7;
    }
    start_of_day(now - TimeDelta::days(i64::from(days_back)))
}

/// Strict `YYYY-MM-DD`; single-digit months or days are rejected
fn parse_absolute(input: &str) -> Option<DateTime<Utc>> {
    let bytes = input.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d").ok().map(midnight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        at(y, m, d, 0, 0)
    }

    // Monday afternoon
    fn monday() -> DateTime<Utc> {
        at(2025, 3, 31, 15, 30)
    }

    #[test]
    fn test_numeric_relative_units() {
        let now = monday();
        let parse = |s: &str| parse_date_expression_at(s, now).unwrap();

        assert_eq!(parse("7d"), now - TimeDelta::days(7));
        assert_eq!(parse("30m"), now - TimeDelta::minutes(30));
        assert_eq!(parse("12h"), now - TimeDelta::hours(12));
        assert_eq!(parse("2w"), now - TimeDelta::weeks(2));
        assert_eq!(parse("0d"), now);
    }

    #[test]
    fn test_uppercase_m_means_months() {
        let now = monday();
        assert_eq!(parse_date_expression_at("1M", now).unwrap(), at(2025, 2, 28, 15, 30));
        assert_eq!(parse_date_expression_at("3M", now).unwrap(), at(2024, 12, 31, 15, 30));
        assert_eq!(
            parse_date_expression_at("1m", now).unwrap(),
            now - TimeDelta::minutes(1)
        );
    }

    #[test]
    fn test_month_clamp_in_leap_year() {
        let now = at(2024, 3, 31, 8, 0);
        assert_eq!(parse_date_expression_at("1M", now).unwrap(), at(2024, 2, 29, 8, 0));
    }

    #[test]
    fn test_years_use_calendar_arithmetic() {
        let leap_day = at(2024, 2, 29, 12, 0);
        assert_eq!(parse_date_expression_at("1y", leap_day).unwrap(), at(2023, 2, 28, 12, 0));
        assert_eq!(
            parse_date_expression_at("last-year", leap_day).unwrap(),
            at(2023, 2, 28, 12, 0)
        );
    }

    #[test]
    fn test_other_units_are_case_insensitive() {
        let now = monday();
        assert_eq!(parse_date_expression_at("7D", now).unwrap(), now - TimeDelta::days(7));
        assert_eq!(parse_date_expression_at("2H", now).unwrap(), now - TimeDelta::hours(2));
        assert_eq!(parse_date_expression_at("TODAY", now).unwrap(), day(2025, 3, 31));
    }

    #[test]
    fn test_named_days() {
        let now = monday();
        assert_eq!(parse_date_expression_at("today", now).unwrap(), day(2025, 3, 31));
        assert_eq!(parse_date_expression_at("tomorrow", now).unwrap(), day(2025, 4, 1));
        assert_eq!(
            parse_date_expression_at("yesterday", now).unwrap(),
            now - TimeDelta::days(1)
        );
    }

    #[test]
    fn test_named_periods() {
        let wednesday = at(2025, 4, 2, 9, 15);
        let parse = |s: &str| parse_date_expression_at(s, wednesday).unwrap();

        assert_eq!(parse("this-week"), day(2025, 3, 31));
        assert_eq!(parse("last-week"), wednesday - TimeDelta::weeks(1));
        assert_eq!(parse("this-month"), day(2025, 4, 1));
        assert_eq!(parse("last-month"), at(2025, 3, 2, 9, 15));
        assert_eq!(parse("this-year"), day(2025, 1, 1));
    }

    #[test]
    fn test_weekday_resolves_to_most_recent_occurrence() {
        let now = monday();
        assert_eq!(parse_date_expression_at("friday", now).unwrap(), day(2025, 3, 28));
        assert_eq!(parse_date_expression_at("fri", now).unwrap(), day(2025, 3, 28));
        assert_eq!(parse_date_expression_at("Sunday", now).unwrap(), day(2025, 3, 30));
        assert_eq!(parse_date_expression_at("last-friday", now).unwrap(), day(2025, 3, 28));
    }

    #[test]
    fn test_weekday_on_the_same_weekday() {
        let friday = at(2025, 3, 28, 10, 0);
        // Bare weekday includes today
        assert_eq!(parse_date_expression_at("friday", friday).unwrap(), day(2025, 3, 28));
        // last-<weekday> never does
        assert_eq!(
            parse_date_expression_at("last-friday", friday).unwrap(),
            day(2025, 3, 21)
        );

        let friday_midnight = day(2025, 3, 28);
        assert_eq!(
            parse_date_expression_at("fri", friday_midnight).unwrap(),
            friday_midnight
        );
        assert_eq!(
            parse_date_expression_at("last-fri", friday_midnight).unwrap(),
            day(2025, 3, 21)
        );
    }

    #[test]
    fn test_absolute_date() {
        let now = monday();
        assert_eq!(parse_date_expression_at("2025-06-01", now).unwrap(), day(2025, 6, 1));
        assert_eq!(parse_date_expression_at(" 2024-02-29 ", now).unwrap(), day(2024, 2, 29));
    }

    #[test]
    fn test_invalid_inputs() {
        let now = monday();
        for input in [
            "not-a-date",
            "",
            "d",
            "-5d",
            "5x",
            "5 d",
            "2025-02-30",
            "2025-6-1",
            "2025/06/01",
            "last-someday",
            "../etc/passwd",
            "99999999999d",
            "9999999999999M",
        ] {
            let err = parse_date_expression_at(input, now).unwrap_err();
            assert!(
                matches!(err, QueryError::InvalidDateFormat { .. }),
                "expected InvalidDateFormat for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_validate_date_range() {
        let now = monday();
        let tomorrow = parse_date_expression_at("tomorrow", now).unwrap();
        let yesterday = parse_date_expression_at("yesterday", now).unwrap();

        let err = validate_date_range(Some(tomorrow), Some(yesterday)).unwrap_err();
        assert!(matches!(err, QueryError::InvalidRange { .. }));

        assert!(validate_date_range(Some(yesterday), Some(tomorrow)).is_ok());
        assert!(validate_date_range(Some(now), Some(now)).is_ok());
        assert!(validate_date_range(None, Some(now)).is_ok());
        assert!(validate_date_range(Some(now), None).is_ok());
    }
}
