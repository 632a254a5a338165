use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::models::{Recurrence, RecurrenceKind};

/// Upper bound on catch-up steps when a recurring reminder was completed long after it
/// was due.
const MAX_CATCH_UP_STEPS: usize = 10_000;

/// The occurrence after `datetime`, stepping in calendar units of `tz` so the wall-clock
/// time of day is kept. `None` when the step leaves chrono's representable range.
pub fn next_occurrence<Tz: TimeZone>(
    datetime: DateTime<Utc>,
    rule: &Recurrence,
    tz: &Tz,
) -> Option<DateTime<Utc>> {
    let local = datetime.with_timezone(tz).naive_local();
    let interval = i64::from(rule.interval.max(1));
    let next = match rule.kind {
        RecurrenceKind::Daily => local.checked_add_signed(Duration::try_days(interval)?)?,
        RecurrenceKind::Weekly => local.checked_add_signed(Duration::try_weeks(interval)?)?,
        RecurrenceKind::Monthly => add_months(local, interval)?,
    };
    Some(resolve_local(tz, next))
}

/// First occurrence strictly after `now`, starting from `datetime`. `None` when the rule
/// runs out of range or cannot catch up within the step limit.
pub fn next_occurrence_after<Tz: TimeZone>(
    datetime: DateTime<Utc>,
    rule: &Recurrence,
    tz: &Tz,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let mut next = next_occurrence(datetime, rule, tz)?;
    for _ in 0..MAX_CATCH_UP_STEPS {
        if next > now {
            return Some(next);
        }
        next = next_occurrence(next, rule, tz)?;
    }
    (next > now).then_some(next)
}

fn add_months(base: NaiveDateTime, months: i64) -> Option<NaiveDateTime> {
    let total = i64::from(base.month0()) + months;
    let year = i32::try_from(i64::from(base.year()) + total / 12).ok()?;
    let month = (total % 12) as u32 + 1;
    let day = std::cmp::min(base.day(), last_day_of_month(year, month)?);
    NaiveDate::from_ymd_opt(year, month, day).map(|date| date.and_time(base.time()))
}

fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year.checked_add(1)? } else { year };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first_next| first_next.pred_opt())
        .map(|last| last.day())
}

// Wall-clock times skipped by a DST jump are read as UTC.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}
