use crate::family::EventFamily;
use chrono::prelude::*;
use chrono::Duration;

const HOUR_MILLIS: i64 = 1000 * 60 * 60;
const DAY_MILLIS: i64 = 24 * HOUR_MILLIS;

/// Start and end instants (UTC millis) of one scheduled event window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleBounds {
    pub start_ts: i64,
    pub end_ts: i64,
}

impl CycleBounds {
    pub fn duration(&self) -> i64 {
        self.end_ts - self.start_ts
    }

    pub fn contains(&self, ts: i64) -> bool {
        self.start_ts <= ts && ts < self.end_ts
    }
}

/// Recurrence shape of one event family. All computation is fixed to UTC;
/// the in-game calendar does not observe daylight saving.
#[derive(Debug, Clone, PartialEq)]
pub enum FamilySchedule {
    /// Window pinned to a weekday and hour, e.g. raid weekends running
    /// Friday 07:00 UTC for 72 hours.
    Weekly {
        weekday: Weekday,
        start_hour: u32,
        duration_millis: i64,
    },
    /// Window pinned to a day of month and hour, e.g. the monthly points
    /// event starting on the 22nd. The day is clamped to the month's length
    /// so a schedule pinned near month end stays valid in short months.
    MonthlyDay {
        day_of_month: u32,
        start_hour: u32,
        duration_millis: i64,
    },
    /// Fixed-cadence windows anchored at an instant, e.g. the war cadence.
    /// `active_millis <= period_millis`; the gap is the idle time between
    /// cycles. Live cycle state remains authoritative for exact end
    /// instants, rolling bounds only drive candidate scheduling.
    Rolling {
        anchor_ts: i64,
        period_millis: i64,
        active_millis: i64,
    },
}

impl FamilySchedule {
    /// Upper bound on the length of one cycle, used to validate reminder
    /// lead times at creation.
    pub fn max_cycle_duration(&self) -> i64 {
        match self {
            FamilySchedule::Weekly {
                duration_millis, ..
            } => *duration_millis,
            FamilySchedule::MonthlyDay {
                duration_millis, ..
            } => *duration_millis,
            FamilySchedule::Rolling { active_millis, .. } => *active_millis,
        }
    }
}

/// One-time override of a scheduled window, keyed by the nominal start of
/// the window it replaces. Injected through configuration when the in-game
/// calendar deviates from the regular cadence.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarException {
    pub nominal_start_ts: i64,
    pub replacement: CycleBounds,
}

/// The schedule of every event family.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleSet {
    pub war: FamilySchedule,
    pub raid: FamilySchedule,
    pub points_event: FamilySchedule,
}

impl ScheduleSet {
    pub fn for_family(&self, family: EventFamily) -> &FamilySchedule {
        match family {
            EventFamily::War => &self.war,
            EventFamily::Raid => &self.raid,
            EventFamily::PointsEvent => &self.points_event,
        }
    }
}

impl Default for ScheduleSet {
    fn default() -> Self {
        Self {
            // Wars run back to back on a two day cadence with one idle hour.
            war: FamilySchedule::Rolling {
                anchor_ts: 1_704_085_200_000, // 2024-01-01T05:00:00Z
                period_millis: 48 * HOUR_MILLIS,
                active_millis: 47 * HOUR_MILLIS,
            },
            raid: FamilySchedule::Weekly {
                weekday: Weekday::Fri,
                start_hour: 7,
                duration_millis: 72 * HOUR_MILLIS,
            },
            points_event: FamilySchedule::MonthlyDay {
                day_of_month: 22,
                start_hour: 8,
                duration_millis: 6 * DAY_MILLIS,
            },
        }
    }
}

/// The window containing `now`, or the next upcoming window when `now`
/// falls in the idle gap between two windows. Exceptions are matched by
/// nominal start; a replaced window that has already ended rolls forward to
/// the next nominal one.
pub fn current_cycle_bounds(
    now: i64,
    schedule: &FamilySchedule,
    exceptions: &[CalendarException],
) -> CycleBounds {
    let mut nominal = first_nominal_ending_after(now, schedule);
    loop {
        let effective = exceptions
            .iter()
            .find(|e| e.nominal_start_ts == nominal.start_ts)
            .map(|e| e.replacement)
            .unwrap_or(nominal);
        if effective.end_ts > now {
            return effective;
        }
        nominal = next_nominal(&nominal, schedule);
    }
}

/// The instant a reminder with the given lead time fires for a window.
pub fn next_fire_instant(bounds: &CycleBounds, lead_time: i64) -> i64 {
    bounds.end_ts - lead_time
}

/// Fire instant of the first window that has not ended at `after_ts`. The
/// returned instant may lie in the past when `after_ts` is already inside
/// the lead window; such a reminder is due immediately on the next tick.
pub fn upcoming_fire_instant(
    after_ts: i64,
    schedule: &FamilySchedule,
    exceptions: &[CalendarException],
    lead_time: i64,
) -> i64 {
    next_fire_instant(
        &current_cycle_bounds(after_ts, schedule, exceptions),
        lead_time,
    )
}

fn window_from_start(start: DateTime<Utc>, duration_millis: i64) -> CycleBounds {
    let start_ts = start.timestamp_millis();
    CycleBounds {
        start_ts,
        end_ts: start_ts + duration_millis,
    }
}

fn first_nominal_ending_after(ts: i64, schedule: &FamilySchedule) -> CycleBounds {
    match schedule {
        FamilySchedule::Weekly {
            weekday,
            start_hour,
            duration_millis,
        } => {
            let at = Utc.timestamp_millis(ts);
            // Most recent occurrence of the pinned weekday, on or before
            // today. Its window may still be open when the duration spans
            // several days.
            let days_back = (at.weekday().num_days_from_monday() + 7
                - weekday.num_days_from_monday())
                % 7;
            let start_day = at.date() - Duration::days(days_back as i64);
            let bounds =
                window_from_start(start_day.and_hms(*start_hour, 0, 0), *duration_millis);
            if bounds.end_ts > ts {
                bounds
            } else {
                window_from_start(
                    (start_day + Duration::days(7)).and_hms(*start_hour, 0, 0),
                    *duration_millis,
                )
            }
        }
        FamilySchedule::MonthlyDay {
            day_of_month,
            start_hour,
            duration_millis,
        } => {
            let at = Utc.timestamp_millis(ts);
            // The previous month's window can spill into this month when it
            // is pinned near month end.
            let (py, pm) = month_before(at.year(), at.month());
            let prev = monthly_window(py, pm, *day_of_month, *start_hour, *duration_millis);
            if prev.end_ts > ts {
                return prev;
            }
            let this = monthly_window(
                at.year(),
                at.month(),
                *day_of_month,
                *start_hour,
                *duration_millis,
            );
            if this.end_ts > ts {
                return this;
            }
            let (ny, nm) = month_after(at.year(), at.month());
            monthly_window(ny, nm, *day_of_month, *start_hour, *duration_millis)
        }
        FamilySchedule::Rolling {
            anchor_ts,
            period_millis,
            active_millis,
        } => {
            let k = (ts - anchor_ts).div_euclid(*period_millis);
            let mut start_ts = anchor_ts + k * period_millis;
            if start_ts + active_millis <= ts {
                start_ts += period_millis;
            }
            CycleBounds {
                start_ts,
                end_ts: start_ts + active_millis,
            }
        }
    }
}

fn next_nominal(bounds: &CycleBounds, schedule: &FamilySchedule) -> CycleBounds {
    match schedule {
        FamilySchedule::Weekly {
            duration_millis, ..
        } => {
            let start_ts = bounds.start_ts + 7 * DAY_MILLIS;
            CycleBounds {
                start_ts,
                end_ts: start_ts + duration_millis,
            }
        }
        FamilySchedule::MonthlyDay {
            day_of_month,
            start_hour,
            duration_millis,
        } => {
            let start = Utc.timestamp_millis(bounds.start_ts);
            let (ny, nm) = month_after(start.year(), start.month());
            monthly_window(ny, nm, *day_of_month, *start_hour, *duration_millis)
        }
        FamilySchedule::Rolling {
            period_millis,
            active_millis,
            ..
        } => {
            let start_ts = bounds.start_ts + period_millis;
            CycleBounds {
                start_ts,
                end_ts: start_ts + active_millis,
            }
        }
    }
}

fn monthly_window(
    year: i32,
    month: u32,
    day_of_month: u32,
    start_hour: u32,
    duration_millis: i64,
) -> CycleBounds {
    let day = day_of_month.min(month_length(year, month));
    window_from_start(
        Utc.ymd(year, month, day).and_hms(start_hour, 0, 0),
        duration_millis,
    )
}

fn month_before(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

fn month_after(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

pub fn is_leap_year(year: i32) -> bool {
    year % 400 == 0 || (year % 100 != 0 && year % 4 == 0)
}

// month: January -> 1
pub fn month_length(year: i32, month: u32) -> u32 {
    match month {
        1 => 31,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        3 => 31,
        4 => 30,
        5 => 31,
        6 => 30,
        7 => 31,
        8 => 31,
        9 => 30,
        10 => 31,
        11 => 30,
        12 => 31,
        _ => panic!("Invalid month"),
    }
}
