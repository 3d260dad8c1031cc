//! Venue timezone resolution.
//!
//! The results provider reports a race's start as a date plus a
//! "Z"-suffixed wall-clock time that is already the intended UTC instant.
//! The venue's IANA zone is derived from the circuit's coordinates; the
//! instant is then rendered both in the venue zone and in true UTC.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use tzf_rs::DefaultFinder;

use crate::errors::AppError;

/// Coordinate-to-zone resolver. The underlying finder loads the full
/// timezone geometry once; construct a single resolver at startup and share
/// it behind an `Arc`.
pub struct TimezoneResolver {
    finder: DefaultFinder,
}

/// One instant rendered for display.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalizedTimes {
    /// RFC 3339 in the venue's zone, e.g. "2024-05-26T15:00:00+02:00".
    pub local: String,
    /// The same instant in UTC, e.g. "2024-05-26T13:00:00+00:00".
    pub utc: String,
}

impl TimezoneResolver {
    pub fn new() -> Self {
        Self {
            finder: DefaultFinder::new(),
        }
    }

    /// IANA zone name for a coordinate pair. Note the finder takes
    /// longitude first.
    pub fn zone_name(&self, latitude: f64, longitude: f64) -> &str {
        self.finder.get_tz_name(longitude, latitude)
    }

    /// Localize a provider (date, time) pair for the venue at
    /// (latitude, longitude).
    pub fn localize(
        &self,
        date: &str,
        time: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<LocalizedTimes, AppError> {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
            AppError::UpstreamUnavailable(format!("results provider sent unparseable date {:?}", date))
        })?;
        let time = NaiveTime::parse_from_str(time.trim_end_matches('Z'), "%H:%M:%S").map_err(|_| {
            AppError::UpstreamUnavailable(format!("results provider sent unparseable time {:?}", time))
        })?;

        // The wall-clock value is the UTC instant itself, not venue-local.
        let instant: DateTime<Utc> = Utc.from_utc_datetime(&date.and_time(time));

        let zone_name = self.zone_name(latitude, longitude);
        let tz: Tz = zone_name.parse().map_err(|_| {
            AppError::Internal(format!(
                "no IANA zone for venue at ({}, {}): {:?}",
                latitude, longitude, zone_name
            ))
        })?;

        Ok(LocalizedTimes {
            local: instant
                .with_timezone(&tz)
                .to_rfc3339_opts(SecondsFormat::Secs, false),
            utc: instant.to_rfc3339_opts(SecondsFormat::Secs, false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_name_monaco() {
        let resolver = TimezoneResolver::new();
        assert_eq!(resolver.zone_name(43.7347, 7.42056), "Europe/Monaco");
    }

    #[test]
    fn test_localize_summer_offset() {
        let resolver = TimezoneResolver::new();
        let times = resolver
            .localize("2024-05-26", "13:00:00Z", 43.7347, 7.42056)
            .unwrap();
        // Monaco observes CEST (+02:00) in late May.
        assert_eq!(times.local, "2024-05-26T15:00:00+02:00");
        assert_eq!(times.utc, "2024-05-26T13:00:00+00:00");
    }

    #[test]
    fn test_localize_fixed_offset_zone() {
        let resolver = TimezoneResolver::new();
        // Yas Marina: Asia/Dubai, +04:00, no daylight saving.
        let times = resolver
            .localize("2024-12-08", "13:00:00Z", 24.4672, 54.6031)
            .unwrap();
        assert_eq!(times.local, "2024-12-08T17:00:00+04:00");
        assert_eq!(times.utc, "2024-12-08T13:00:00+00:00");
    }

    #[test]
    fn test_localize_round_trip() {
        let resolver = TimezoneResolver::new();
        let times = resolver
            .localize("2024-05-26", "13:00:00Z", 43.7347, 7.42056)
            .unwrap();
        let local = DateTime::parse_from_rfc3339(&times.local).unwrap();
        let utc = DateTime::parse_from_rfc3339(&times.utc).unwrap();
        // Converting the localized time back to UTC reproduces the instant.
        assert_eq!(local.with_timezone(&Utc), utc.with_timezone(&Utc));
    }

    #[test]
    fn test_localize_bad_time_is_upstream_error() {
        let resolver = TimezoneResolver::new();
        let err = resolver
            .localize("2024-05-26", "one o'clock", 43.7347, 7.42056)
            .unwrap_err();
        assert!(matches!(err, AppError::UpstreamUnavailable(_)));
    }
}
