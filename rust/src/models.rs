//! Core data types for the project scheduler.
//!
//! Everything here is a value object built fresh for each scheduling call.
//! Timestamps are `DateTime<FixedOffset>` so every computed date carries the
//! offset of the project start it was derived from.

use chrono::{DateTime, FixedOffset};
#[cfg(feature = "python")]
use pyo3::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Effort assumed for a task whose estimate was never filled in.
pub const DEFAULT_ESTIMATED_HOURS: f64 = 8.0;

fn default_estimated_hours() -> f64 {
    DEFAULT_ESTIMATED_HOURS
}

fn default_capacity() -> u32 {
    1
}

/// How a dependency constrains its successor.
///
/// Only finish-to-start is scheduled today; the enum stays open so further
/// kinds can be added without touching the task model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DependencyKind {
    /// Predecessor must finish before the successor may start.
    #[default]
    FinishToStart,
}

/// A dependency on another task.
#[cfg_attr(feature = "python", pyclass)]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub predecessor_id: String,
    #[serde(default)]
    pub kind: DependencyKind,
}

impl Dependency {
    pub fn finish_to_start(predecessor_id: impl Into<String>) -> Self {
        Self {
            predecessor_id: predecessor_id.into(),
            kind: DependencyKind::FinishToStart,
        }
    }
}

/// A task to be scheduled.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_estimated_hours")]
    pub estimated_hours: f64,
    /// Skills a resource must have to be matched. Order is irrelevant.
    #[serde(default)]
    pub skills_needed: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    /// Explicit assignment; when non-empty, skill matching is skipped.
    #[serde(default)]
    pub required_resources: Vec<String>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            estimated_hours: DEFAULT_ESTIMATED_HOURS,
            skills_needed: Vec::new(),
            dependencies: Vec::new(),
            required_resources: Vec::new(),
        }
    }

    pub fn with_hours(mut self, hours: f64) -> Self {
        self.estimated_hours = hours;
        self
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills_needed = skills.into_iter().map(Into::into).collect();
        self
    }

    /// Add a finish-to-start dependency on `predecessor_id`.
    pub fn depends_on(mut self, predecessor_id: impl Into<String>) -> Self {
        self.dependencies
            .push(Dependency::finish_to_start(predecessor_id));
        self
    }

    pub fn with_required_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_resources = resources.into_iter().map(Into::into).collect();
        self
    }
}

/// A person or team that can be assigned to tasks.
#[cfg_attr(feature = "python", pyclass(get_all, set_all))]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Number of tasks this resource can work on at the same time.
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Lead resources win ties against equally skilled candidates.
    #[serde(default, alias = "lead")]
    pub is_lead: bool,
}

impl Resource {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            capacity: 1,
            skills: Vec::new(),
            is_lead: false,
        }
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn as_lead(mut self) -> Self {
        self.is_lead = true;
        self
    }
}

/// How a milestone's date is determined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MilestoneConstraint {
    /// Fixed date; every dependent task must end on or before it.
    Manual { target_date: DateTime<FixedOffset> },
    /// Latest end among dependents; `target_date` is used when there are none.
    Automatic { target_date: DateTime<FixedOffset> },
}

impl MilestoneConstraint {
    pub fn target_date(&self) -> DateTime<FixedOffset> {
        match self {
            MilestoneConstraint::Manual { target_date }
            | MilestoneConstraint::Automatic { target_date } => *target_date,
        }
    }

    pub fn mode(&self) -> MilestoneMode {
        match self {
            MilestoneConstraint::Manual { .. } => MilestoneMode::Manual,
            MilestoneConstraint::Automatic { .. } => MilestoneMode::Automatic,
        }
    }
}

/// Label of a milestone's resolution mode, as reported back to callers.
#[cfg_attr(feature = "python", pyclass(eq, eq_int))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneMode {
    Manual,
    Automatic,
}

/// A project milestone and the tasks it waits on.
///
/// On the wire a milestone is a flat record with an `is_manual_constraint`
/// flag; in memory the flag becomes a [`MilestoneConstraint`].
#[cfg_attr(feature = "python", pyclass)]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "MilestoneRecord", into = "MilestoneRecord")]
pub struct Milestone {
    pub id: String,
    pub title: String,
    pub constraint: MilestoneConstraint,
    /// Ids of the tasks this milestone depends on.
    pub dependents: Vec<String>,
}

impl Milestone {
    pub fn manual(
        id: impl Into<String>,
        title: impl Into<String>,
        target_date: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            constraint: MilestoneConstraint::Manual { target_date },
            dependents: Vec::new(),
        }
    }

    pub fn automatic(
        id: impl Into<String>,
        title: impl Into<String>,
        target_date: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            constraint: MilestoneConstraint::Automatic { target_date },
            dependents: Vec::new(),
        }
    }

    /// Build a milestone from the flag-based representation used by the record store.
    pub fn from_flag(
        id: impl Into<String>,
        title: impl Into<String>,
        target_date: DateTime<FixedOffset>,
        is_manual_constraint: bool,
    ) -> Self {
        if is_manual_constraint {
            Self::manual(id, title, target_date)
        } else {
            Self::automatic(id, title, target_date)
        }
    }

    pub fn with_dependents<I, S>(mut self, dependents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependents = dependents.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct MilestoneRecord {
    id: String,
    #[serde(default)]
    title: String,
    target_date: DateTime<FixedOffset>,
    #[serde(default)]
    is_manual_constraint: bool,
    #[serde(default)]
    dependents: Vec<String>,
}

impl From<MilestoneRecord> for Milestone {
    fn from(record: MilestoneRecord) -> Self {
        Milestone::from_flag(
            record.id,
            record.title,
            record.target_date,
            record.is_manual_constraint,
        )
        .with_dependents(record.dependents)
    }
}

impl From<Milestone> for MilestoneRecord {
    fn from(milestone: Milestone) -> Self {
        Self {
            id: milestone.id,
            title: milestone.title,
            target_date: milestone.constraint.target_date(),
            is_manual_constraint: milestone.constraint.mode() == MilestoneMode::Manual,
            dependents: milestone.dependents,
        }
    }
}

/// A task with its computed dates and assignment.
#[cfg_attr(feature = "python", pyclass(get_all))]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub task_id: String,
    pub title: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    /// Always the task's estimated effort, independent of calendar stretching.
    pub duration_hours: f64,
    /// May be empty when no resource matched; see the result's conflicts.
    pub assigned_resources: Vec<String>,
    pub is_critical: bool,
    /// Working hours this task can slip without moving the project end.
    pub float_hours: f64,
}

/// Resolved date of one milestone.
#[cfg_attr(feature = "python", pyclass(get_all))]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MilestoneSchedule {
    pub milestone_id: String,
    pub title: String,
    pub mode: MilestoneMode,
    pub resolved_date: DateTime<FixedOffset>,
    /// Dependents that were found in the schedule.
    pub dependent_task_ids: Vec<String>,
    pub latest_dependent_end: Option<DateTime<FixedOffset>>,
    pub is_feasible: bool,
    pub message: Option<String>,
}

/// Overall outcome of a scheduling run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    /// No hard violations and no conflicts.
    Success,
    /// No hard violations, but at least one soft conflict.
    Feasible,
    /// At least one hard constraint was violated.
    Infeasible,
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScheduleStatus::Success => "success",
            ScheduleStatus::Feasible => "feasible",
            ScheduleStatus::Infeasible => "infeasible",
        };
        f.write_str(s)
    }
}

/// Non-fatal issue found while scheduling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleConflict {
    NoEligibleResource {
        task_id: String,
        required_skills: Vec<String>,
    },
    ResourceOverallocated {
        resource_id: String,
        /// The newly assigned task followed by the tasks it overlaps.
        task_ids: Vec<String>,
        concurrent: u32,
        capacity: u32,
    },
    UnknownResource {
        task_id: String,
        resource_id: String,
    },
}

impl fmt::Display for ScheduleConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleConflict::NoEligibleResource {
                task_id,
                required_skills,
            } => write!(
                f,
                "No resource has the skills [{}] needed by task {}",
                required_skills.join(", "),
                task_id
            ),
            ScheduleConflict::ResourceOverallocated {
                resource_id,
                task_ids,
                concurrent,
                capacity,
            } => write!(
                f,
                "Resource {} has {} concurrent tasks (capacity {}): {}",
                resource_id,
                concurrent,
                capacity,
                task_ids.join(", ")
            ),
            ScheduleConflict::UnknownResource {
                task_id,
                resource_id,
            } => write!(
                f,
                "Task {} requires resource {} which is not in any pool",
                task_id, resource_id
            ),
        }
    }
}

/// Hard constraint violation; any of these makes the schedule infeasible.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScheduleViolation {
    HorizonExceeded {
        task_id: String,
        end: DateTime<FixedOffset>,
        horizon_end: DateTime<FixedOffset>,
    },
    MilestoneMissed {
        milestone_id: String,
        milestone_title: String,
        task_id: String,
        end: DateTime<FixedOffset>,
        target_date: DateTime<FixedOffset>,
    },
}

impl fmt::Display for ScheduleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleViolation::HorizonExceeded {
                task_id,
                end,
                horizon_end,
            } => write!(
                f,
                "Task {} ends at {} after the scheduling horizon {}",
                task_id,
                end.to_rfc3339(),
                horizon_end.to_rfc3339()
            ),
            ScheduleViolation::MilestoneMissed {
                milestone_id,
                milestone_title,
                task_id,
                end,
                target_date,
            } => write!(
                f,
                "Milestone '{}' ({}) due {} cannot be met: task {} ends at {}",
                milestone_title,
                milestone_id,
                target_date.to_rfc3339(),
                task_id,
                end.to_rfc3339()
            ),
        }
    }
}

/// Result of one scheduling call.
#[cfg_attr(feature = "python", pyclass)]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleResult {
    pub status: ScheduleStatus,
    /// Scheduled tasks in the order they were scheduled.
    pub tasks: Vec<ScheduledTask>,
    pub milestones: Vec<MilestoneSchedule>,
    pub conflicts: Vec<ScheduleConflict>,
    pub violations: Vec<ScheduleViolation>,
    /// Ids of critical tasks, in schedule order.
    pub critical_path: Vec<String>,
    pub project_start: DateTime<FixedOffset>,
    pub project_end: DateTime<FixedOffset>,
    pub project_duration_days: f64,
    pub message: String,
}

impl ScheduleResult {
    pub fn task(&self, task_id: &str) -> Option<&ScheduledTask> {
        self.tasks.iter().find(|t| t.task_id == task_id)
    }

    pub fn milestone(&self, milestone_id: &str) -> Option<&MilestoneSchedule> {
        self.milestones
            .iter()
            .find(|m| m.milestone_id == milestone_id)
    }

    pub fn is_infeasible(&self) -> bool {
        self.status == ScheduleStatus::Infeasible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_defaults_to_eight_hours() {
        let task: Task = serde_json::from_str(r#"{"id": "a", "title": "Design"}"#).unwrap();
        assert_eq!(task.estimated_hours, 8.0);
        assert!(task.skills_needed.is_empty());
        assert!(task.required_resources.is_empty());
        assert_eq!(Task::new("b", "Build").estimated_hours, 8.0);
    }

    #[test]
    fn test_dependency_kind_defaults_to_finish_to_start() {
        let dep: Dependency = serde_json::from_str(r#"{"predecessor_id": "a"}"#).unwrap();
        assert_eq!(dep.kind, DependencyKind::FinishToStart);
    }

    #[test]
    fn test_resource_accepts_lead_alias() {
        let resource: Resource =
            serde_json::from_str(r#"{"id": "dev1", "skills": ["Python"], "lead": true}"#).unwrap();
        assert!(resource.is_lead);
        assert_eq!(resource.capacity, 1);
    }

    #[test]
    fn test_milestone_flag_maps_to_constraint() {
        let json = r#"{
            "id": "m1",
            "title": "Release",
            "target_date": "2025-01-10T00:00:00+01:00",
            "is_manual_constraint": true,
            "dependents": ["a"]
        }"#;
        let milestone: Milestone = serde_json::from_str(json).unwrap();
        assert!(matches!(
            milestone.constraint,
            MilestoneConstraint::Manual { .. }
        ));
        assert_eq!(milestone.dependents, vec!["a".to_string()]);

        let value = serde_json::to_value(&milestone).unwrap();
        assert_eq!(value["is_manual_constraint"], true);
    }

    #[test]
    fn test_conflict_display() {
        let conflict = ScheduleConflict::NoEligibleResource {
            task_id: "a".to_string(),
            required_skills: vec!["Rust".to_string(), "SQL".to_string()],
        };
        assert_eq!(
            conflict.to_string(),
            "No resource has the skills [Rust, SQL] needed by task a"
        );
    }
}
