//! Converts per-symbol session windows into absolute UTC boundaries for a
//! given local trading date, routing all wall-clock math through IANA
//! timezone rules.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono::offset::LocalResult;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::config::{SessionName, SessionsConfig};
use crate::error::{StructureError, StructureResult};

/// A single session's absolute `[start, end)` instants in UTC milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBoundary {
    pub name: SessionName,
    pub start: i64,
    pub end: i64,
}

/// Parses a `YYYY-MM-DD` local trading date, shared by every engine that
/// gates `start_date` on the same format without needing a full
/// `SessionsConfig` to do it.
pub fn parse_local_date(date_local: &str) -> StructureResult<NaiveDate> {
    NaiveDate::parse_from_str(date_local, "%Y-%m-%d")
        .map_err(|_| StructureError::InvalidDateFormat(date_local.to_string()))
}

fn parse_hhmm(hhmm: &str) -> StructureResult<NaiveTime> {
    NaiveTime::parse_from_str(hhmm, "%H:%M")
        .map_err(|_| StructureError::InvalidTimeFormat(hhmm.to_string()))
}

fn parse_tz(tz_iana: &str) -> StructureResult<Tz> {
    tz_iana
        .parse::<Tz>()
        .map_err(|_| StructureError::UnknownTimezone(tz_iana.to_string()))
}

/// Resolves a naive local datetime to a UTC instant under the DST policy
/// decided for this core: the first occurrence during a fall-back overlap,
/// and the earliest valid wall time at or after a spring-forward gap.
fn resolve_local(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earlier, _later) => earlier.with_timezone(&Utc),
        LocalResult::None => {
            // Spring-forward gap: advance minute by minute until wall time
            // becomes valid again. DST gaps are at most a couple of hours
            // worldwide; 6 hours is a generous upper bound.
            let mut probe = naive;
            for _ in 0..360 {
                probe += Duration::minutes(1);
                match tz.from_local_datetime(&probe) {
                    LocalResult::Single(dt) => return dt.with_timezone(&Utc),
                    LocalResult::Ambiguous(earlier, _) => return earlier.with_timezone(&Utc),
                    LocalResult::None => continue,
                }
            }
            // Unreachable for any real IANA zone; fall back to UTC-naive
            // interpretation rather than panicking.
            DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)
        }
    }
}

/// Materializes every configured session window onto `date_local`, sorted
/// by `start`. Windows that cross local midnight resolve their `end` on the
/// following local date.
pub fn materialize(
    date_local: &str,
    cfg: &SessionsConfig,
) -> StructureResult<Vec<SessionBoundary>> {
    cfg.validate()?;
    let date = parse_local_date(date_local)?;

    let mut boundaries = Vec::with_capacity(cfg.windows.len());
    for window in &cfg.windows {
        let tz = parse_tz(&window.tz_iana)?;
        let start_time = parse_hhmm(&window.start)?;
        let end_time = parse_hhmm(&window.end)?;
        let end_date = if window.crosses_midnight() {
            date + Duration::days(1)
        } else {
            date
        };

        let start_naive = NaiveDateTime::new(date, start_time);
        let end_naive = NaiveDateTime::new(end_date, end_time);

        let start_utc = resolve_local(&tz, start_naive);
        let end_utc = resolve_local(&tz, end_naive);

        boundaries.push(SessionBoundary {
            name: window.name,
            start: start_utc.timestamp_millis(),
            end: end_utc.timestamp_millis(),
        });
    }

    boundaries.sort_by_key(|b| b.start);
    Ok(boundaries)
}
