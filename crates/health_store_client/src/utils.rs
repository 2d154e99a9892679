//! Calendar helpers for building "today so far" query windows.

use chrono::{DateTime, Duration, LocalResult, NaiveTime, TimeZone, Utc};

use crate::TimeWindow;

/// First instant of the calendar day containing `now`, in `now`'s time zone.
///
/// When a DST transition skips local midnight, the first valid local instant
/// after it is used; when midnight occurs twice, the earlier one wins.
pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = now.timezone();
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => (1..=96)
            .find_map(|q| {
                tz.from_local_datetime(&(midnight + Duration::minutes(15 * q)))
                    .earliest()
            })
            .unwrap_or_else(|| now.clone()),
    }
}

/// `[start of today, now)` for the day containing `now`.
pub fn today_so_far<Tz: TimeZone>(now: &DateTime<Tz>) -> TimeWindow {
    let start = start_of_day(now).with_timezone(&Utc);
    let end = now.with_timezone(&Utc);
    TimeWindow {
        start: start.min(end),
        end,
    }
}
