//! Calendar helpers over `chrono`
//!
//! Layouts for [`parse_any`] use `chrono`'s `strftime` syntax. Layouts
//! without an offset are read as UTC.

use crate::errors::DateError;
use chrono::{
    DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone, Utc,
};

pub const RFC3339: &str = "%Y-%m-%dT%H:%M:%S%.f%:z";
pub const DATE_ONLY: &str = "%Y-%m-%d";
pub const DATE_TIME: &str = "%Y-%m-%d %H:%M:%S";
pub const US_DATE: &str = "%m/%d/%Y";

/// 23:59:59 on `t`'s calendar day, in `t`'s own zone.
pub fn eod<Tz: TimeZone>(t: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = t.timezone();
    eod_in(t, &tz)
}

/// 23:59:59 in `tz` on the calendar day `t` falls on in its own zone.
pub fn eod_in<Tz: TimeZone, Tz2: TimeZone>(t: &DateTime<Tz>, tz: &Tz2) -> DateTime<Tz2> {
    let end = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    at_local(tz, t.date_naive().and_time(end))
}

/// Midnight on `t`'s calendar day, in `t`'s own zone.
pub fn bod<Tz: TimeZone>(t: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = t.timezone();
    bod_in(t, &tz)
}

/// Midnight in `tz` on the calendar day `t` falls on in its own zone.
pub fn bod_in<Tz: TimeZone, Tz2: TimeZone>(t: &DateTime<Tz>, tz: &Tz2) -> DateTime<Tz2> {
    at_local(tz, t.date_naive().and_time(NaiveTime::MIN))
}

/// Whole days in `duration`, truncated toward zero.
pub fn days(duration: TimeDelta) -> i64 {
    duration.num_days()
}

/// True when `expected` and `actual` are strictly less than `delta` apart.
pub fn within_duration<Tz: TimeZone, Tz2: TimeZone>(
    expected: &DateTime<Tz>,
    actual: &DateTime<Tz2>,
    delta: TimeDelta,
) -> bool {
    let dt = expected.to_utc() - actual.to_utc();
    dt > -delta && dt < delta
}

/// Parse `s` with the first layout that accepts it.
pub fn parse_any(layouts: &[&str], s: &str) -> Result<DateTime<Utc>, DateError> {
    layouts
        .iter()
        .find_map(|layout| parse(layout, s))
        .ok_or_else(|| DateError::NoLayoutMatched {
            input: s.to_string(),
        })
}

fn parse(layout: &str, s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_str(s, layout) {
        return Some(t.to_utc());
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(s, layout) {
        return Some(t.and_utc());
    }
    NaiveDate::parse_from_str(s, layout)
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

/// `local` read as wall time in `tz`. Ambiguous times take the earlier
/// instant; times skipped by a transition keep the offset in effect before it.
fn at_local<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(t) => t,
        LocalResult::Ambiguous(earlier, _) => earlier,
        LocalResult::None => {
            let offset = tz.offset_from_utc_datetime(&local).fix();
            let utc = local - TimeDelta::seconds(i64::from(offset.local_minus_utc()));
            tz.from_utc_datetime(&utc)
        }
    }
}
