//! Milestone resolution against a finished forward schedule.

use chrono::{DateTime, FixedOffset};
use rustc_hash::FxHashMap;

use crate::models::{
    Milestone, MilestoneConstraint, MilestoneSchedule, ScheduleViolation, ScheduledTask,
};
use crate::{log_changes, log_checks};

/// Resolved milestones plus any hard violations they caused.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MilestoneResolution {
    pub milestones: Vec<MilestoneSchedule>,
    pub violations: Vec<ScheduleViolation>,
}

/// Resolves milestone dates; each milestone is handled independently.
pub struct MilestoneResolver<'a> {
    scheduled: FxHashMap<&'a str, &'a ScheduledTask>,
    verbosity: u8,
}

impl<'a> MilestoneResolver<'a> {
    pub fn new(scheduled: &'a [ScheduledTask], verbosity: u8) -> Self {
        Self {
            scheduled: scheduled
                .iter()
                .map(|t| (t.task_id.as_str(), t))
                .collect(),
            verbosity,
        }
    }

    pub fn resolve_all(&self, milestones: &[Milestone]) -> MilestoneResolution {
        let mut resolution = MilestoneResolution::default();
        for milestone in milestones {
            let (schedule, violations) = self.resolve(milestone);
            resolution.milestones.push(schedule);
            resolution.violations.extend(violations);
        }
        resolution
    }

    /// Resolve one milestone.
    ///
    /// Manual milestones keep their target date and are checked against every
    /// dependent's end. Automatic milestones take the latest dependent end, or
    /// their target date when no dependent was scheduled.
    pub fn resolve(&self, milestone: &Milestone) -> (MilestoneSchedule, Vec<ScheduleViolation>) {
        let dependents: Vec<&ScheduledTask> = milestone
            .dependents
            .iter()
            .filter_map(|id| {
                let found = self.scheduled.get(id.as_str()).copied();
                if found.is_none() {
                    tracing::warn!(
                        milestone_id = %milestone.id,
                        task_id = %id,
                        "milestone dependent is not part of the schedule; ignoring"
                    );
                }
                found
            })
            .collect();

        let latest_dependent_end: Option<DateTime<FixedOffset>> =
            dependents.iter().map(|t| t.end).max();
        let dependent_task_ids: Vec<String> =
            dependents.iter().map(|t| t.task_id.clone()).collect();

        let mut violations = Vec::new();
        let (resolved_date, message) = match milestone.constraint {
            MilestoneConstraint::Manual { target_date } => {
                for task in &dependents {
                    if task.end > target_date {
                        log_checks!(
                            self.verbosity,
                            "  Milestone {} missed by task {} ({} > {})",
                            milestone.id,
                            task.task_id,
                            task.end,
                            target_date
                        );
                        violations.push(ScheduleViolation::MilestoneMissed {
                            milestone_id: milestone.id.clone(),
                            milestone_title: milestone.title.clone(),
                            task_id: task.task_id.clone(),
                            end: task.end,
                            target_date,
                        });
                    }
                }
                let message = (!violations.is_empty()).then(|| {
                    let late: Vec<&str> = violations
                        .iter()
                        .filter_map(|v| match v {
                            ScheduleViolation::MilestoneMissed { task_id, .. } => {
                                Some(task_id.as_str())
                            }
                            _ => None,
                        })
                        .collect();
                    format!(
                        "Milestone '{}' ({}) is infeasible: {} end after {}",
                        milestone.title,
                        milestone.id,
                        late.join(", "),
                        target_date.to_rfc3339()
                    )
                });
                (target_date, message)
            }
            MilestoneConstraint::Automatic { target_date } => {
                let message = latest_dependent_end
                    .is_none()
                    .then(|| "No scheduled dependents; using target date".to_string());
                (latest_dependent_end.unwrap_or(target_date), message)
            }
        };

        log_changes!(
            self.verbosity,
            "Milestone {} ({:?}) resolved to {}",
            milestone.id,
            milestone.constraint.mode(),
            resolved_date
        );

        let schedule = MilestoneSchedule {
            milestone_id: milestone.id.clone(),
            title: milestone.title.clone(),
            mode: milestone.constraint.mode(),
            resolved_date,
            dependent_task_ids,
            latest_dependent_end,
            is_feasible: violations.is_empty(),
            message,
        };
        (schedule, violations)
    }
}
