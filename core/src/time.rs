use chrono::{Datelike, Duration, Local, NaiveDate, NaiveTime};
use anyhow::{anyhow, Result};

// Inclusive [first day, last day]. None for a month outside 1..=12.
pub fn month_window(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next_month - Duration::days(1)))
}

pub fn current_month() -> (i32, u32) {
    let today = Local::now().date_naive();
    (today.year(), today.month())
}

pub fn parse_time_of_day(input: &str) -> Option<NaiveTime> {
    let input = input.trim();
    NaiveTime::parse_from_str(input, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(input, "%H:%M:%S"))
        .ok()
}

// A trailing time part ("2024-06-01T00:00:00") is ignored.
pub fn parse_report_date(input: &str) -> Result<NaiveDate> {
    let input = input.trim();
    let date_part = input.split(['T', ' ']).next().unwrap_or(input);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|_| anyhow!("Could not parse date: {}", input))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_window() {
        assert_eq!(month_window(2024, 6), Some((ymd(2024, 6, 1), ymd(2024, 6, 30))));
        assert_eq!(month_window(2024, 2), Some((ymd(2024, 2, 1), ymd(2024, 2, 29))));
        assert_eq!(month_window(2023, 2), Some((ymd(2023, 2, 1), ymd(2023, 2, 28))));
        assert_eq!(month_window(2024, 12), Some((ymd(2024, 12, 1), ymd(2024, 12, 31))));
    }

    #[test]
    fn test_month_window_rejects_bad_month() {
        assert_eq!(month_window(2024, 0), None);
        assert_eq!(month_window(2024, 13), None);
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(parse_time_of_day("08:00"), NaiveTime::from_hms_opt(8, 0, 0));
        assert_eq!(parse_time_of_day("17:30:00"), NaiveTime::from_hms_opt(17, 30, 0));
        assert_eq!(parse_time_of_day(" 7:05 "), NaiveTime::from_hms_opt(7, 5, 0));
        assert_eq!(parse_time_of_day("25:00"), None);
        assert_eq!(parse_time_of_day(""), None);
        assert_eq!(parse_time_of_day("noon"), None);
    }

    #[test]
    fn test_parse_report_date() {
        assert_eq!(parse_report_date("2024-06-01").unwrap(), ymd(2024, 6, 1));
        assert_eq!(parse_report_date("2024-06-01T00:00:00Z").unwrap(), ymd(2024, 6, 1));
        assert!(parse_report_date("06/01/2024").is_err());
    }
}
