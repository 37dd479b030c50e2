//! Expiry time parsing
//!
//! Accepts RFC3339 instants ("2026-10-01T12:00:00Z") and relative offsets
//! from now ("1d", "2h30m", "1w"). An instant in the past is accepted; the
//! resulting record simply never redirects.

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone)]
pub struct TimeParser;

impl TimeParser {
    pub fn parse_expire_time(input: &str) -> Result<DateTime<Utc>, String> {
        let input = input.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Ok(dt.with_timezone(&Utc));
        }

        Self::parse_relative_time(input)
    }

    fn parse_relative_time(input: &str) -> Result<DateTime<Utc>, String> {
        let mut total_duration = Duration::zero();
        let mut remaining = input;

        while !remaining.is_empty() {
            let digit_count = remaining.chars().take_while(|c| c.is_ascii_digit()).count();
            if digit_count == 0 {
                return Err(format!("Invalid time format: '{}'", input));
            }

            let num: i64 = remaining[..digit_count]
                .parse()
                .map_err(|_| format!("Invalid number: '{}'", &remaining[..digit_count]))?;
            remaining = &remaining[digit_count..];

            let unit_count = remaining
                .chars()
                .take_while(|c| c.is_ascii_alphabetic())
                .count();
            if unit_count == 0 {
                return Err(format!("Missing time unit after number '{}'", num));
            }

            let unit = &remaining[..unit_count];
            let duration = match unit.to_lowercase().as_str() {
                "s" | "sec" | "second" | "seconds" => Duration::seconds(num),
                "m" | "min" | "minute" | "minutes" => Duration::minutes(num),
                "h" | "hour" | "hours" => Duration::hours(num),
                "d" | "day" | "days" => Duration::days(num),
                "w" | "week" | "weeks" => Duration::weeks(num),
                "y" | "year" | "years" => Duration::days(num * 365),
                _ => return Err(format!("Unsupported time unit: '{}'", unit)),
            };

            total_duration += duration;
            remaining = &remaining[unit_count..];
        }

        if total_duration == Duration::zero() {
            return Err("Time interval cannot be zero".to_string());
        }

        let now = Utc::now();
        now.checked_add_signed(total_duration)
            .ok_or_else(|| "Computed expiry is out of range".to_string())
    }
}
