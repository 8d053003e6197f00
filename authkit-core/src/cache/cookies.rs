//! Expiration helpers for the side-channel store.

use chrono::{DateTime, TimeDelta, Utc};

use crate::storage::{StorageError, StorageResult};

/// Canonical date-string format of the side-channel store (RFC 7231 IMF-fixdate).
pub const COOKIE_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Returns the expiration `days` whole days after the current instant.
///
/// Negative values produce a date in the past, which expires an entry.
///
/// # Errors
///
/// Returns [`StorageError::InvalidExpiration`] if the date is not representable.
pub fn cookie_expiration(days: i64) -> StorageResult<String> {
    cookie_expiration_from(Utc::now(), days)
}

/// Returns the expiration `days` whole days after `now`.
///
/// # Errors
///
/// Returns [`StorageError::InvalidExpiration`] if the date is not representable.
pub fn cookie_expiration_from(now: DateTime<Utc>, days: i64) -> StorageResult<String> {
    let expires = TimeDelta::try_days(days)
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| StorageError::InvalidExpiration(format!("{days} days is out of range")))?;
    Ok(expires.format(COOKIE_DATE_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 10, 30, 15)
            .single()
            .expect("valid date")
    }

    #[test_case(1, "Tue, 20 Oct 2026 10:30:15 GMT" ; "one day")]
    #[test_case(2, "Wed, 21 Oct 2026 10:30:15 GMT" ; "two days")]
    #[test_case(-1, "Sun, 18 Oct 2026 10:30:15 GMT" ; "past")]
    fn test_cookie_expiration_from(days: i64, expected: &str) {
        assert_eq!(
            cookie_expiration_from(now(), days).expect("expiration"),
            expected
        );
    }

    #[test_case(100_000_000 ; "past the last representable date")]
    #[test_case(i64::MAX ; "too many days")]
    #[test_case(i64::MIN ; "too many days in the past")]
    fn test_out_of_range_expiration_is_an_error(days: i64) {
        match cookie_expiration_from(now(), days) {
            Err(StorageError::InvalidExpiration(message)) => {
                assert!(message.contains(&days.to_string()));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_cookie_expiration_is_whole_days_from_now() {
        for days in [1, 2] {
            let before = Utc::now();
            let rendered = cookie_expiration(days).expect("expiration");
            let after = Utc::now();

            let parsed = DateTime::parse_from_rfc2822(&rendered)
                .expect("parse")
                .with_timezone(&Utc);
            let lower = (before + TimeDelta::days(days))
                .format(COOKIE_DATE_FORMAT)
                .to_string();
            let upper = (after + TimeDelta::days(days))
                .format(COOKIE_DATE_FORMAT)
                .to_string();
            assert!(rendered == lower || rendered == upper);
            assert!(parsed <= after + TimeDelta::days(days));
        }
    }
}
