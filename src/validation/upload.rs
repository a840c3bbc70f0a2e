use crate::error::{AppError, Result};

/// Longest filename accepted, in bytes.
pub const MAX_FILENAME_BYTES: usize = 255;

/// Trims and checks an uploaded filename.
///
/// # Returns
///
/// The trimmed filename.
pub fn validate_filename(filename: &str) -> Result<String> {
    let trimmed = filename.trim();

    if trimmed.is_empty() {
        return Err(AppError::Validation("Filename must not be empty".to_string()));
    }

    if trimmed.len() > MAX_FILENAME_BYTES {
        return Err(AppError::Validation(format!(
            "Filename must be at most {} bytes",
            MAX_FILENAME_BYTES
        )));
    }

    Ok(trimmed.to_string())
}

/// Checks a requested share lifetime against `1..=max_hours`.
pub fn validate_expiry_hours(hours: i64, max_hours: i64) -> Result<i64> {
    if !(1..=max_hours).contains(&hours) {
        return Err(AppError::Validation(format!(
            "expiryHours must be between 1 and {}",
            max_hours
        )));
    }

    Ok(hours)
}

/// Parses the raw `expiryHours` form field, falling back to `default_hours`
/// when it is absent or blank.
pub fn parse_expiry_hours(raw: Option<&str>, default_hours: i64, max_hours: i64) -> Result<i64> {
    let hours = match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => value
            .parse::<i64>()
            .map_err(|_| AppError::Validation("expiryHours must be an integer".to_string()))?,
        None => default_hours,
    };

    validate_expiry_hours(hours, max_hours)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filenames_are_trimmed_and_bounded() {
        assert_eq!(validate_filename("  report.pdf ").unwrap(), "report.pdf");
        assert!(validate_filename("   ").is_err());
        assert!(validate_filename(&"x".repeat(256)).is_err());
        assert!(validate_filename(&"x".repeat(255)).is_ok());
    }

    #[test]
    fn expiry_hours() {
        assert_eq!(parse_expiry_hours(None, 24, 168).unwrap(), 24);
        assert_eq!(parse_expiry_hours(Some(" "), 24, 168).unwrap(), 24);
        assert_eq!(parse_expiry_hours(Some("48"), 24, 168).unwrap(), 48);
        assert!(parse_expiry_hours(Some("0"), 24, 168).is_err());
        assert!(parse_expiry_hours(Some("169"), 24, 168).is_err());
        assert!(parse_expiry_hours(Some("two"), 24, 168).is_err());
    }
}
