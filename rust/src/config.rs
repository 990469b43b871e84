//! Configuration types for the scheduling system.

use chrono::{DateTime, Duration, FixedOffset};
#[cfg(feature = "python")]
use pyo3::prelude::*;
use serde::{Deserialize, Serialize};

use crate::logging::VERBOSITY_SILENT;

fn default_horizon_days() -> i64 {
    365
}

fn default_working_hours_per_day() -> f64 {
    8.0
}

fn default_respect_weekends() -> bool {
    true
}

/// Calendar and deadline constraints for one scheduling call.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConstraints {
    /// Earliest instant any task may start. Its offset is carried into every computed date.
    pub project_start: DateTime<FixedOffset>,
    /// Every task must end within this many calendar days of `project_start`.
    #[serde(default = "default_horizon_days")]
    pub horizon_days: i64,
    /// Hours of effort one working day absorbs.
    #[serde(default = "default_working_hours_per_day")]
    pub working_hours_per_day: f64,
    /// Skip Saturdays and Sundays.
    #[serde(default = "default_respect_weekends")]
    pub respect_weekends: bool,
}

impl ScheduleConstraints {
    pub fn new(project_start: DateTime<FixedOffset>) -> Self {
        Self {
            project_start,
            horizon_days: default_horizon_days(),
            working_hours_per_day: default_working_hours_per_day(),
            respect_weekends: default_respect_weekends(),
        }
    }

    pub fn with_horizon_days(mut self, horizon_days: i64) -> Self {
        self.horizon_days = horizon_days;
        self
    }

    pub fn with_working_hours_per_day(mut self, hours: f64) -> Self {
        self.working_hours_per_day = hours;
        self
    }

    pub fn with_weekends(mut self, respect_weekends: bool) -> Self {
        self.respect_weekends = respect_weekends;
        self
    }

    /// Latest instant a task may end, or `None` if it is outside chrono's range.
    pub fn horizon_end(&self) -> Option<DateTime<FixedOffset>> {
        self.project_start
            .checked_add_signed(Duration::try_days(self.horizon_days)?)
    }
}

/// Knobs that affect how the scheduler runs, not what it computes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    #[serde(default)]
    pub verbosity: u8,
    /// Write dates back even when the schedule is infeasible.
    #[serde(default)]
    pub persist_infeasible: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            verbosity: VERBOSITY_SILENT,
            persist_infeasible: false,
        }
    }
}

impl SchedulerConfig {
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2025-01-06T09:00:00+02:00").unwrap()
    }

    #[test]
    fn test_constraint_defaults() {
        let constraints = ScheduleConstraints::new(start());
        assert_eq!(constraints.horizon_days, 365);
        assert!((constraints.working_hours_per_day - 8.0).abs() < 1e-9);
        assert!(constraints.respect_weekends);
    }

    #[test]
    fn test_horizon_end_keeps_offset() {
        let constraints = ScheduleConstraints::new(start()).with_horizon_days(10);
        let end = constraints.horizon_end().unwrap();
        assert_eq!(
            end,
            DateTime::parse_from_rfc3339("2025-01-16T09:00:00+02:00").unwrap()
        );
        assert_eq!(end.offset(), start().offset());
    }

    #[test]
    fn test_constraints_deserialize_with_defaults() {
        let constraints: ScheduleConstraints =
            serde_json::from_str(r#"{"project_start": "2025-01-06T09:00:00+02:00"}"#).unwrap();
        assert_eq!(constraints, ScheduleConstraints::new(start()));
    }
}
