// Waypoint status resolution
//
// Re-dates each waypoint's arrival/departure to the year of the reference
// instant and derives its status from that instant. Pure: no clock reads, no I/O.

use crate::wpt_models::{NormalizedWaypoint, RawTimestamp, Waypoint, WaypointStatus};
use chrono::{DateTime, Datelike, Days, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeDelta, TimeZone, Utc};

pub struct WPTResolver;

impl WPTResolver {
    /// Normalize every waypoint against `now`, keeping input order.
    pub fn resolve<Tz: TimeZone>(waypoints: &[Waypoint], now: &DateTime<Tz>) -> Vec<NormalizedWaypoint> {
        let now_ms = now.timestamp_millis();

        waypoints
            .iter()
            .map(|wp| {
                let arrival = Self::normalize_timestamp(&wp.arrival, now);
                let departure = Self::normalize_timestamp(&wp.departure, now);

                NormalizedWaypoint {
                    id: wp.id.clone(),
                    arrival,
                    departure,
                    location: wp.location,
                    city: wp.city.clone(),
                    region: wp.region.clone(),
                    status: Self::derive_status(arrival, departure, now_ms),
                }
            })
            .collect()
    }

    /// Visited wins over Active; an invalid timestamp never compares as past.
    pub fn derive_status(arrival: Option<i64>, departure: Option<i64>, now_ms: i64) -> WaypointStatus {
        if departure.is_some_and(|d| now_ms - d > 0) {
            WaypointStatus::Visited
        } else if arrival.is_some_and(|a| now_ms - a > 0) {
            WaypointStatus::Active
        } else {
            WaypointStatus::Upcoming
        }
    }

    /// Parse a feed timestamp and move it into the year of `now`.
    pub fn normalize_timestamp<Tz: TimeZone>(raw: &RawTimestamp, now: &DateTime<Tz>) -> Option<i64> {
        let tz = now.timezone();
        let instant = Self::parse_timestamp(raw, &tz)?;
        Self::rewrite_year(&instant, now.year()).map(|dt| dt.timestamp_millis())
    }

    /// Interpret a feed timestamp the way a browser `Date` would.
    pub fn parse_timestamp<Tz: TimeZone>(raw: &RawTimestamp, tz: &Tz) -> Option<DateTime<Tz>> {
        let utc = match raw {
            RawTimestamp::Millis(ms) => Utc.timestamp_millis_opt(*ms).single()?,
            RawTimestamp::FractionalMillis(ms) => {
                if !ms.is_finite() {
                    return None;
                }
                Utc.timestamp_millis_opt(ms.trunc() as i64).single()?
            }
            RawTimestamp::Text(text) => return Self::parse_text(text.trim(), tz),
            RawTimestamp::Other(_) => return None,
        };
        Some(utc.with_timezone(tz))
    }

    fn parse_text<Tz: TimeZone>(text: &str, tz: &Tz) -> Option<DateTime<Tz>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.with_timezone(tz));
        }

        // Date-only strings are UTC midnight
        if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            let naive = date.and_hms_opt(0, 0, 0)?;
            return Some(Utc.from_utc_datetime(&naive).with_timezone(tz));
        }

        // Date-time without offset is wall-clock time in the reference zone
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
            .and_then(|naive| Self::from_wall_clock(tz, &naive))
    }

    /// Replace the year, keeping month, day and time of day in the instant's zone.
    ///
    /// Feb 29 in a non-leap year rolls over to Mar 1.
    pub fn rewrite_year<Tz: TimeZone>(instant: &DateTime<Tz>, year: i32) -> Option<DateTime<Tz>> {
        let local = instant.naive_local();
        let date = NaiveDate::from_ymd_opt(year, local.month(), 1)?
            .checked_add_days(Days::new(u64::from(local.day0())))?;

        Self::from_wall_clock(&instant.timezone(), &date.and_time(local.time()))
    }

    // Ambiguous wall-clock times take the earlier instant. Skipped ones are read
    // with the offset in force before the transition, which moves them forward by
    // the length of the gap.
    fn from_wall_clock<Tz: TimeZone>(tz: &Tz, naive: &NaiveDateTime) -> Option<DateTime<Tz>> {
        match tz.from_local_datetime(naive) {
            LocalResult::Single(dt) => Some(dt),
            LocalResult::Ambiguous(early, _) => Some(early),
            LocalResult::None => {
                let before = tz.offset_from_utc_datetime(&(*naive - TimeDelta::days(1))).fix();
                let utc = naive.checked_sub_signed(TimeDelta::seconds(i64::from(before.local_minus_utc())))?;
                Some(tz.from_utc_datetime(&utc))
            }
        }
    }
}
