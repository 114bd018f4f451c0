//! Deadline parsing and formatting.
//!
//! One input format (`DD.MM.YYYY`) and one stored form (the last second of
//! the chosen day) are shared by task creation, task editing and the
//! calendar widget.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

/// Input and display format for dates.
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// Why a deadline was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("invalid date format, expected DD.MM.YYYY")]
    InvalidFormat,
    #[error("deadline is in the past")]
    InPast,
}

/// Parses `DD.MM.YYYY`.
pub fn parse_date(text: &str) -> Result<NaiveDate, DateError> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).map_err(|_| DateError::InvalidFormat)
}

/// 23:59:59 on the given day.
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::seconds(86_399)
}

/// Validates a picked day against `today` and returns the stored deadline.
pub fn normalize_deadline(date: NaiveDate, today: NaiveDate) -> Result<NaiveDateTime, DateError> {
    if date < today {
        return Err(DateError::InPast);
    }
    Ok(end_of_day(date))
}

/// Parses user input into a stored deadline.
pub fn parse_deadline(text: &str, today: NaiveDate) -> Result<NaiveDateTime, DateError> {
    normalize_deadline(parse_date(text)?, today)
}

/// Formats a date the way users type it.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Formats a stored deadline for display.
pub fn format_deadline(deadline: NaiveDateTime) -> String {
    format_date(deadline.date())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_today_is_accepted_at_end_of_day() {
        let today = day(2025, 3, 10);
        let deadline = parse_deadline("10.03.2025", today).unwrap();
        assert_eq!(deadline, today.and_hms_opt(23, 59, 59).unwrap());
    }

    #[test]
    fn test_yesterday_is_rejected() {
        let today = day(2025, 3, 10);
        assert_eq!(
            parse_deadline("09.03.2025", today),
            Err(DateError::InPast)
        );
    }

    #[test]
    fn test_future_date_accepted() {
        let today = day(2025, 12, 31);
        let deadline = parse_deadline("1.1.2026", today).unwrap();
        assert_eq!(deadline.date(), day(2026, 1, 1));
    }

    #[test]
    fn test_invalid_format() {
        let today = day(2025, 3, 10);
        for text in ["2025-03-10", "31.02.2025", "tomorrow", ""] {
            assert_eq!(parse_deadline(text, today), Err(DateError::InvalidFormat));
        }
    }

    #[test]
    fn test_format_round_trip() {
        let deadline = end_of_day(day(2025, 7, 4));
        assert_eq!(format_deadline(deadline), "04.07.2025");
        assert_eq!(parse_date(&format_deadline(deadline)).unwrap(), day(2025, 7, 4));
    }
}
