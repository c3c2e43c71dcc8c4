use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimezoneError {
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
}

/// Parse an IANA timezone name such as `Europe/Paris`
pub fn parse_timezone(tz_str: &str) -> Result<Tz, TimezoneError> {
    tz_str
        .trim()
        .parse()
        .map_err(|_| TimezoneError::InvalidTimezone(tz_str.to_string()))
}

/// Timezone for log timestamps; unset or blank means UTC
pub fn parse_log_timezone(raw: Option<&str>) -> Result<Tz, TimezoneError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => parse_timezone(name),
        None => Ok(Tz::UTC),
    }
}
