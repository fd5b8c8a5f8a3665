//! Week clock: everything derived from "now" in the challenge time zone.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use parking_lot::Mutex;

use crate::errors::ClockError;
use crate::ids::WeekId;

/// Calendar facts about one instant in the challenge zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WeekContext {
    /// ISO week the local date belongs to.
    pub week_id: WeekId,
    /// Local calendar date.
    pub date: NaiveDate,
    /// Local wall-clock time.
    pub local_time: NaiveTime,
    /// Month of year (1..=12).
    pub month: u32,
    /// Monday-started week within the month, starting at 1.
    pub week_of_month: u32,
    /// Monday = 0 .. Sunday = 6.
    pub weekday_index: u32,
    /// Local weekday.
    pub weekday: Weekday,
}

/// Resolve `instant` in `zone`.
pub fn resolve(instant: DateTime<Utc>, zone: Tz) -> WeekContext {
    let local = instant.with_timezone(&zone);
    let date = local.date_naive();
    let first_of_month = date - Duration::days(i64::from(date.day0()));
    let week_of_month = abs_week(date) - abs_week(first_of_month) + 1;

    WeekContext {
        week_id: WeekId::from_iso(date.iso_week()),
        date,
        local_time: local.time(),
        month: date.month(),
        week_of_month: week_of_month as u32,
        weekday_index: date.weekday().num_days_from_monday(),
        weekday: date.weekday(),
    }
}

/// Monday-started weeks elapsed since 0001-01-01, which was a Monday.
///
/// Unlike ISO week numbers this never wraps at a year boundary, so the
/// week-of-month subtraction stays positive in January.
fn abs_week(date: NaiveDate) -> i64 {
    (i64::from(date.num_days_from_ce()) - 1).div_euclid(7)
}

/// Convert event seconds into an instant.
pub fn from_unix_seconds(secs: i64) -> Result<DateTime<Utc>, ClockError> {
    DateTime::from_timestamp(secs, 0).ok_or(ClockError::InvalidTimestamp(secs))
}

/// Parse a `HH:MM` time of day.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime, ClockError> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|_| ClockError::InvalidTimeOfDay(s.to_string()))
}

/// Whether submissions are closed for the day.
pub fn is_past_cutoff(local_time: NaiveTime, cutoff: NaiveTime) -> bool {
    local_time >= cutoff
}

/// Next instant strictly after `now` whose local time in `zone` is `fire_at`.
///
/// A fire time that falls into a DST gap moves forward by an hour; an
/// ambiguous one takes the earlier instant.
pub fn next_fire_after(now: DateTime<Utc>, fire_at: NaiveTime, zone: Tz) -> DateTime<Utc> {
    let local_now = now.with_timezone(&zone);
    let mut date = local_now.date_naive();
    for _ in 0..3 {
        if let Some(candidate) = localize(zone, date.and_time(fire_at)) {
            if candidate > local_now {
                return candidate.with_timezone(&Utc);
            }
        }
        date += Duration::days(1);
    }
    now + Duration::days(1)
}

fn localize(zone: Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    zone.from_local_datetime(&naive)
        .earliest()
        .or_else(|| zone.from_local_datetime(&(naive + Duration::hours(1))).earliest())
}

/// Source of "now". Swapped for [`FixedClock`] in tests.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Clock frozen at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Jump to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    /// Move forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Seoul;
    use proptest::prelude::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn resolves_in_target_zone() {
        // 15:30 UTC on Tuesday is 00:30 Wednesday in Seoul.
        let ctx = resolve(utc("2024-09-10T15:30:00Z"), Seoul);
        assert_eq!(ctx.date, NaiveDate::from_ymd_opt(2024, 9, 11).unwrap());
        assert_eq!(ctx.weekday, Weekday::Wed);
        assert_eq!(ctx.weekday_index, 2);
        assert_eq!(ctx.week_id.to_string(), "2024-W37");
        assert_eq!(ctx.month, 9);
        assert_eq!(ctx.week_of_month, 3);
    }

    #[test]
    fn week_id_flips_at_local_midnight_monday() {
        let sunday = resolve(utc("2024-09-15T14:59:59Z"), Seoul);
        let monday = resolve(utc("2024-09-15T15:00:00Z"), Seoul);
        assert_eq!(sunday.week_id.to_string(), "2024-W37");
        assert_eq!(monday.week_id.to_string(), "2024-W38");
        assert_eq!(monday.weekday_index, 0);
    }

    #[test]
    fn week_of_month_survives_year_boundary() {
        // 2027-01-01 is a Friday in ISO week 53 of 2026.
        let first = resolve(utc("2027-01-01T03:00:00Z"), Seoul);
        assert_eq!(first.week_id.to_string(), "2026-W53");
        assert_eq!(first.week_of_month, 1);

        let second = resolve(utc("2027-01-08T03:00:00Z"), Seoul);
        assert_eq!(second.week_id.to_string(), "2027-W01");
        assert_eq!(second.week_of_month, 2);
    }

    #[test]
    fn week_of_month_first_day_is_one() {
        let ctx = resolve(utc("2024-09-01T03:00:00Z"), Seoul);
        assert_eq!(ctx.weekday, Weekday::Sun);
        assert_eq!(ctx.week_of_month, 1);
        let next = resolve(utc("2024-09-02T03:00:00Z"), Seoul);
        assert_eq!(next.week_of_month, 2);
    }

    #[test]
    fn cutoff_is_inclusive() {
        let cutoff = parse_time_of_day("23:59").unwrap();
        assert!(!is_past_cutoff(NaiveTime::from_hms_opt(23, 58, 59).unwrap(), cutoff));
        assert!(is_past_cutoff(NaiveTime::from_hms_opt(23, 59, 0).unwrap(), cutoff));
    }

    #[test]
    fn parse_time_of_day_rejects_garbage() {
        assert!(parse_time_of_day("25:00").is_err());
        assert!(parse_time_of_day("noon").is_err());
        assert_eq!(
            parse_time_of_day(" 00:01 ").unwrap(),
            NaiveTime::from_hms_opt(0, 1, 0).unwrap()
        );
    }

    #[test]
    fn unix_seconds_out_of_range() {
        assert!(from_unix_seconds(1_712_345_678).is_ok());
        assert_eq!(
            from_unix_seconds(i64::MAX).unwrap_err(),
            ClockError::InvalidTimestamp(i64::MAX)
        );
    }

    #[test]
    fn next_fire_later_today() {
        // 2024-09-10 23:00 KST → fires 2024-09-11 00:01 KST.
        let now = utc("2024-09-10T14:00:00Z");
        let fire = parse_time_of_day("00:01").unwrap();
        assert_eq!(next_fire_after(now, fire, Seoul), utc("2024-09-10T15:01:00Z"));
    }

    #[test]
    fn next_fire_is_strictly_after_now() {
        let now = utc("2024-09-10T15:01:00Z");
        let fire = parse_time_of_day("00:01").unwrap();
        assert_eq!(next_fire_after(now, fire, Seoul), utc("2024-09-11T15:01:00Z"));
    }

    #[test]
    fn next_fire_skips_dst_gap() {
        // 2024-03-10 02:30 does not exist in New York.
        let zone = chrono_tz::America::New_York;
        let now = utc("2024-03-10T05:00:00Z");
        let fire = parse_time_of_day("02:30").unwrap();
        let next = next_fire_after(now, fire, zone);
        assert_eq!(next, utc("2024-03-10T07:30:00Z"));
    }

    #[test]
    fn fixed_clock_advances() {
        let clock = FixedClock::new(utc("2024-09-10T00:00:00Z"));
        clock.advance(Duration::hours(2));
        assert_eq!(clock.now(), utc("2024-09-10T02:00:00Z"));
    }

    proptest! {
        #[test]
        fn whole_local_week_shares_week_id(secs in 946_684_800i64..4_102_444_800) {
            let ctx = resolve(from_unix_seconds(secs).unwrap(), Seoul);
            prop_assert!(ctx.weekday_index < 7);
            prop_assert!((1..=6).contains(&ctx.week_of_month));

            let monday = ctx.date - Duration::days(i64::from(ctx.weekday_index));
            for offset in 0..7 {
                let day = monday + Duration::days(offset);
                prop_assert_eq!(WeekId::from_iso(day.iso_week()), ctx.week_id);
            }
        }

        #[test]
        fn next_fire_within_a_day(secs in 946_684_800i64..4_102_444_800, h in 0u32..24, m in 0u32..60) {
            let now = from_unix_seconds(secs).unwrap();
            let fire = NaiveTime::from_hms_opt(h, m, 0).unwrap();
            let next = next_fire_after(now, fire, Seoul);
            prop_assert!(next > now);
            prop_assert!(next - now <= Duration::days(1));
            prop_assert_eq!(next.with_timezone(&Seoul).time(), fire);
        }
    }
}
