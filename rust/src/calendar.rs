//! Working calendar: converts effort hours into wall-clock intervals.
//!
//! One working day absorbs `hours_per_day` hours of effort and spans one
//! calendar day of wall-clock time, pro rata for partial days. With weekends
//! respected, Saturdays and Sundays absorb nothing and are skipped.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Weekday};
use thiserror::Error;

use crate::config::ScheduleConstraints;

const MS_PER_DAY: f64 = 86_400_000.0;

/// Errors raised by calendar arithmetic.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalendarError {
    #[error("Duration must be positive, got {0} hours")]
    NonPositiveDuration(f64),
    #[error("Working hours per day must be in (0, 24], got {0}")]
    InvalidWorkingHours(f64),
    #[error("Date arithmetic out of range")]
    OutOfRange,
}

/// Weekday-aware calendar with a fixed daily effort budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkingCalendar {
    hours_per_day: f64,
    respect_weekends: bool,
}

impl WorkingCalendar {
    pub fn new(hours_per_day: f64, respect_weekends: bool) -> Result<Self, CalendarError> {
        if !(hours_per_day.is_finite() && hours_per_day > 0.0 && hours_per_day <= 24.0) {
            return Err(CalendarError::InvalidWorkingHours(hours_per_day));
        }
        Ok(Self {
            hours_per_day,
            respect_weekends,
        })
    }

    pub fn from_constraints(constraints: &ScheduleConstraints) -> Result<Self, CalendarError> {
        Self::new(
            constraints.working_hours_per_day,
            constraints.respect_weekends,
        )
    }

    /// Whether the local calendar day containing `at` absorbs effort.
    pub fn is_working_day(&self, at: &DateTime<FixedOffset>) -> bool {
        !self.respect_weekends || !matches!(at.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// `at` itself if it is on a working day, otherwise the start of the next working day.
    pub fn next_working_instant(
        &self,
        at: DateTime<FixedOffset>,
    ) -> Result<DateTime<FixedOffset>, CalendarError> {
        let mut cursor = at;
        while !self.is_working_day(&cursor) {
            cursor = next_midnight(&cursor)?;
        }
        Ok(cursor)
    }

    /// Place `duration_hours` of effort starting no earlier than `start`.
    ///
    /// The returned start is `start` moved forward to a working day if needed.
    /// The returned interval is never shorter than `duration_hours` of wall-clock
    /// time and always has `start < end`.
    pub fn schedule(
        &self,
        start: DateTime<FixedOffset>,
        duration_hours: f64,
    ) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>), CalendarError> {
        if !(duration_hours.is_finite() && duration_hours > 0.0) {
            return Err(CalendarError::NonPositiveDuration(duration_hours));
        }

        let start = self.next_working_instant(start)?;
        let mut remaining_days = duration_hours / self.hours_per_day;
        let mut cursor = start;

        // First partial day, then whole weeks in one step
        let midnight = next_midnight(&cursor)?;
        let first_days = (midnight - cursor).num_milliseconds() as f64 / MS_PER_DAY;
        if remaining_days > first_days + 1e-9 {
            remaining_days -= first_days;
            cursor = midnight;

            let per_week = self.working_days_per_week();
            let weeks = ((remaining_days / per_week).ceil() - 1.0).max(0.0);
            if weeks > 0.0 {
                let skip = Duration::try_weeks(weeks as i64).ok_or(CalendarError::OutOfRange)?;
                cursor = cursor
                    .checked_add_signed(skip)
                    .ok_or(CalendarError::OutOfRange)?;
                remaining_days -= weeks * per_week;
            }
        }

        loop {
            if !self.is_working_day(&cursor) {
                cursor = next_midnight(&cursor)?;
                continue;
            }

            let midnight = next_midnight(&cursor)?;
            let available_ms = (midnight - cursor).num_milliseconds().max(1);
            let available_days = available_ms as f64 / MS_PER_DAY;

            if remaining_days <= available_days + 1e-9 {
                let needed_ms = ((remaining_days * MS_PER_DAY).ceil() as i64).clamp(1, available_ms);
                let end = cursor
                    .checked_add_signed(Duration::milliseconds(needed_ms))
                    .ok_or(CalendarError::OutOfRange)?;
                return Ok((start, end));
            }

            remaining_days -= available_days;
            cursor = midnight;
        }
    }

    fn working_days_per_week(&self) -> f64 {
        if self.respect_weekends {
            5.0
        } else {
            7.0
        }
    }

    /// Effort hours that fit between `from` and `to`; zero if `to <= from`.
    pub fn working_hours_between(
        &self,
        from: DateTime<FixedOffset>,
        to: DateTime<FixedOffset>,
    ) -> f64 {
        let mut hours = 0.0;
        let mut cursor = from;
        let mut skipped_weeks = false;

        while cursor < to {
            let Ok(midnight) = next_midnight(&cursor) else {
                break;
            };
            let segment_end = midnight.min(to);
            if self.is_working_day(&cursor) {
                let fraction = (segment_end - cursor).num_milliseconds() as f64 / MS_PER_DAY;
                hours += fraction * self.hours_per_day;
            }
            cursor = segment_end;

            // Aligned to midnight now; whole weeks hold a fixed amount of work
            if !skipped_weeks && cursor < to {
                skipped_weeks = true;
                let weeks = (to - cursor).num_weeks();
                if let Some(next) =
                    Duration::try_weeks(weeks).and_then(|w| cursor.checked_add_signed(w))
                {
                    hours += weeks as f64 * self.working_days_per_week() * self.hours_per_day;
                    cursor = next;
                }
            }
        }

        hours
    }
}

/// Midnight starting the day before chrono's last representable date, in `offset`.
pub fn latest_instant(offset: FixedOffset) -> Result<DateTime<FixedOffset>, CalendarError> {
    let last_day = NaiveDate::MAX
        .pred_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or(CalendarError::OutOfRange)?;
    offset
        .from_local_datetime(&last_day)
        .single()
        .ok_or(CalendarError::OutOfRange)
}

/// Start of the local calendar day after the one containing `at`.
fn next_midnight(at: &DateTime<FixedOffset>) -> Result<DateTime<FixedOffset>, CalendarError> {
    let next_day = at
        .date_naive()
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or(CalendarError::OutOfRange)?;
    at.offset()
        .from_local_datetime(&next_day)
        .single()
        .ok_or(CalendarError::OutOfRange)
}
