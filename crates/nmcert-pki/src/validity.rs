//! Validity windows floored to a fixed granularity
//!
//! The dehydrated serial number is a function of the validity timestamps, so
//! both ends are rounded down to [`TIMESTAMP_PRECISION`] before they are used
//! anywhere else.

use std::time::Duration;

use der::{
    asn1::{GeneralizedTime, UtcTime},
    DateTime,
};
use x509_cert::time::{Time, Validity};

use crate::error::{PkiError, Result};

/// Granularity of certificate timestamps, in seconds
pub const TIMESTAMP_PRECISION: i64 = 5 * 60;

/// Last second representable as an X.509 time, 9999-12-31T23:59:59Z
pub const MAX_X509_TIME: i64 = 253_402_300_799;

/// Round `unix_seconds` down to a multiple of `granularity`.
pub fn floor_timestamp(unix_seconds: i64, granularity: i64) -> i64 {
    granularity * unix_seconds.div_euclid(granularity)
}

/// Floored (notBefore, notAfter) pair, with notAfter strictly later
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    not_before: i64,
    not_after: i64,
}

impl ValidityWindow {
    /// Window starting at `start` and lasting `duration` seconds, both ends
    /// floored.
    pub fn floored(start: i64, duration: i64) -> Result<Self> {
        let end = start
            .checked_add(duration)
            .ok_or_else(|| PkiError::ConfigError("validity duration overflows".to_string()))?;
        if end > MAX_X509_TIME {
            return Err(PkiError::ConfigError(format!(
                "validity ends at {end}, after the year 9999"
            )));
        }

        Self::new(
            floor_timestamp(start, TIMESTAMP_PRECISION),
            floor_timestamp(end, TIMESTAMP_PRECISION),
        )
    }

    /// Rebuild a window from timestamps divided by [`TIMESTAMP_PRECISION`].
    pub fn from_scaled(not_before_scaled: i64, not_after_scaled: i64) -> Result<Self> {
        let scale = |scaled: i64| {
            scaled.checked_mul(TIMESTAMP_PRECISION).ok_or_else(|| {
                PkiError::CodecError(format!("scaled timestamp {scaled} out of range"))
            })
        };
        Self::new(scale(not_before_scaled)?, scale(not_after_scaled)?)
    }

    fn new(not_before: i64, not_after: i64) -> Result<Self> {
        if not_before < 0 {
            return Err(PkiError::ConfigError(format!(
                "validity start {not_before} precedes the Unix epoch"
            )));
        }
        if not_after <= not_before {
            return Err(PkiError::ConfigError(format!(
                "validity window collapses after flooring to {TIMESTAMP_PRECISION}s: \
                 notBefore={not_before} notAfter={not_after}"
            )));
        }
        Ok(Self {
            not_before,
            not_after,
        })
    }

    pub fn not_before(&self) -> i64 {
        self.not_before
    }

    pub fn not_after(&self) -> i64 {
        self.not_after
    }

    pub fn not_before_scaled(&self) -> i64 {
        self.not_before / TIMESTAMP_PRECISION
    }

    pub fn not_after_scaled(&self) -> i64 {
        self.not_after / TIMESTAMP_PRECISION
    }

    /// X.509 Validity, UTCTime through 2049 and GeneralizedTime after
    pub fn to_x509(&self) -> Result<Validity> {
        Ok(Validity {
            not_before: x509_time(self.not_before)?,
            not_after: x509_time(self.not_after)?,
        })
    }
}

fn x509_time(unix_seconds: i64) -> Result<Time> {
    let seconds = u64::try_from(unix_seconds).map_err(|_| {
        PkiError::ConfigError(format!("timestamp {unix_seconds} precedes the Unix epoch"))
    })?;
    let datetime = DateTime::from_unix_duration(Duration::from_secs(seconds))?;

    if datetime.year() < 2050 {
        Ok(Time::UtcTime(UtcTime::from_date_time(datetime)?))
    } else {
        Ok(Time::GeneralTime(GeneralizedTime::from_date_time(datetime)))
    }
}

/// Unix seconds of an X.509 time
pub fn unix_seconds(time: &Time) -> Result<i64> {
    i64::try_from(time.to_unix_duration().as_secs())
        .map_err(|_| PkiError::CodecError("certificate timestamp out of range".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_is_idempotent_and_never_later() {
        for t in [0, 1, 299, 300, 301, 1_700_000_123, 1_700_000_400] {
            let floored = floor_timestamp(t, TIMESTAMP_PRECISION);
            assert!(floored <= t);
            assert_eq!(floor_timestamp(floored, TIMESTAMP_PRECISION), floored);
            assert_eq!(floored % TIMESTAMP_PRECISION, 0);
        }
    }

    #[test]
    fn test_floor_negative_rounds_down() {
        assert_eq!(floor_timestamp(-1, TIMESTAMP_PRECISION), -300);
    }

    #[test]
    fn test_window_floors_both_ends() {
        let window = ValidityWindow::floored(1_700_000_123, 365 * 24 * 3600).unwrap();
        assert_eq!(window.not_before(), 1_700_000_100);
        assert_eq!(window.not_before() % TIMESTAMP_PRECISION, 0);
        assert_eq!(window.not_after() % TIMESTAMP_PRECISION, 0);
        assert_eq!(window.not_before_scaled() * TIMESTAMP_PRECISION, window.not_before());
    }

    #[test]
    fn test_degenerate_window_rejected() {
        // both ends floor to the same boundary
        assert!(ValidityWindow::floored(1_700_000_100, 60).is_err());
        assert!(ValidityWindow::floored(1_700_000_100, 0).is_err());
        assert!(ValidityWindow::floored(1_700_000_100, -3600).is_err());
        assert!(ValidityWindow::floored(-600, 3600).is_err());
    }

    #[test]
    fn test_window_past_year_9999_rejected() {
        let err = ValidityWindow::floored(1_700_000_123, 9_000 * 365 * 24 * 3600).unwrap_err();
        assert_eq!(err.class(), crate::error::ErrorClass::Configuration);

        // the last encodable window still builds and encodes
        let window = ValidityWindow::floored(MAX_X509_TIME - 3600, 3600).unwrap();
        assert!(matches!(window.to_x509().unwrap().not_after, Time::GeneralTime(_)));
    }

    #[test]
    fn test_from_scaled_matches_floored() {
        let window = ValidityWindow::floored(1_700_000_123, 86_400).unwrap();
        let rebuilt =
            ValidityWindow::from_scaled(window.not_before_scaled(), window.not_after_scaled())
                .unwrap();
        assert_eq!(rebuilt, window);
    }

    #[test]
    fn test_time_encoding_switches_at_2050() {
        // 2049-12-31T23:55:00Z and 2050-01-01T00:00:00Z
        let window = ValidityWindow::floored(2_524_607_700, 300).unwrap();
        let validity = window.to_x509().unwrap();
        assert!(matches!(validity.not_before, Time::UtcTime(_)));
        assert!(matches!(validity.not_after, Time::GeneralTime(_)));
        assert_eq!(unix_seconds(&validity.not_before).unwrap(), 2_524_607_700);
        assert_eq!(unix_seconds(&validity.not_after).unwrap(), 2_524_608_000);
    }
}
