//! Parsers for time-valued flags

use time::{macros::format_description, PrimitiveDateTime};

use crate::error::{CliError, CliResult};

/// Parse a duration such as `8760h`, `365d`, `1h30m` or `3600` into seconds.
///
/// A bare number is taken as seconds.
pub fn parse_duration(text: &str) -> CliResult<i64> {
    let text = text.trim();
    let invalid = || CliError::InvalidInput(format!("invalid duration {text:?}"));

    if text.is_empty() {
        return Err(invalid());
    }
    if let Ok(seconds) = text.parse::<i64>() {
        return Ok(seconds);
    }

    let mut total: i64 = 0;
    let mut digits = String::new();
    for c in text.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }

        let unit = match c {
            'd' => 24 * 60 * 60,
            'h' => 60 * 60,
            'm' => 60,
            's' => 1,
            _ => return Err(invalid()),
        };
        let value: i64 = digits.parse().map_err(|_| invalid())?;
        total = value
            .checked_mul(unit)
            .and_then(|seconds| total.checked_add(seconds))
            .ok_or_else(invalid)?;
        digits.clear();
    }

    if !digits.is_empty() {
        return Err(invalid());
    }
    Ok(total)
}

/// Parse a start date formatted like `Jan 2 15:04:05 2006`, in UTC.
pub fn parse_start_date(text: &str) -> CliResult<i64> {
    let format = format_description!(
        "[month repr:short] [day padding:none] [hour]:[minute]:[second] [year]"
    );
    let datetime = PrimitiveDateTime::parse(text.trim(), &format)
        .map_err(|e| CliError::InvalidInput(format!("invalid start date {text:?}: {e}")))?;

    Ok(datetime.assume_utc().unix_timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("8760h").unwrap(), 365 * 86_400);
        assert_eq!(parse_duration("365d").unwrap(), 365 * 86_400);
        assert_eq!(parse_duration("1h30m").unwrap(), 5_400);
        assert_eq!(parse_duration("90m").unwrap(), 5_400);
        assert_eq!(parse_duration("3600s").unwrap(), 3_600);
        assert_eq!(parse_duration("3600").unwrap(), 3_600);
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        for text in ["", "h", "10x", "10h5", "1.5h"] {
            assert!(parse_duration(text).is_err(), "{text} should be rejected");
        }
    }

    #[test]
    fn test_parse_start_date() {
        assert_eq!(parse_start_date("Jan 2 15:04:05 2006").unwrap(), 1_136_214_245);
        assert_eq!(parse_start_date("Nov 14 22:13:20 2023").unwrap(), 1_700_000_000);
        assert!(parse_start_date("2006-01-02").is_err());
    }
}
