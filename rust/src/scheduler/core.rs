//! Core forward scheduler implementation.

use chrono::{DateTime, FixedOffset};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::calendar::{latest_instant, CalendarError, WorkingCalendar};
use crate::config::{ScheduleConstraints, SchedulerConfig};
use crate::critical_path::mark_critical;
use crate::graph::{DependencyGraph, GraphError};
use crate::matcher::{Assignment, ResourceMatcher, ResourcePool};
use crate::milestones::MilestoneResolver;
use crate::models::{
    DependencyKind, Milestone, ScheduleConflict, ScheduleResult, ScheduleStatus,
    ScheduleViolation, ScheduledTask, Task,
};
use crate::store::StoreError;
use crate::{log_changes, log_checks, log_debug};

use super::resource_load::ResourceLoad;
use super::state::{SchedulerState, TaskState};

/// Errors that abort a scheduling call before a result is produced.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error("Task {task_id} has invalid estimated hours: {hours}")]
    InvalidEstimate { task_id: String, hours: f64 },
    #[error("Scheduling horizon must be at least one day, got {0}")]
    InvalidHorizon(i64),
    #[error("Invalid schedule payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("Record store error: {0}")]
    Store(#[from] StoreError),
    #[error("Scheduling invariant violated: {0}")]
    Internal(String),
}

/// Output of the forward pass, indexed like the dependency graph.
#[derive(Clone, Debug, Default)]
pub struct ForwardPass {
    pub tasks: Vec<ScheduledTask>,
    pub conflicts: Vec<ScheduleConflict>,
    pub violations: Vec<ScheduleViolation>,
}

/// Single deterministic forward pass over a validated dependency graph.
pub struct ForwardScheduler<'a> {
    tasks: &'a [Task],
    graph: &'a DependencyGraph,
    calendar: &'a WorkingCalendar,
    matcher: &'a ResourceMatcher<'a>,
    constraints: &'a ScheduleConstraints,
    verbosity: u8,
}

impl<'a> ForwardScheduler<'a> {
    /// Create a scheduler; `graph` must have been built from `tasks`.
    pub fn new(
        tasks: &'a [Task],
        graph: &'a DependencyGraph,
        calendar: &'a WorkingCalendar,
        matcher: &'a ResourceMatcher<'a>,
        constraints: &'a ScheduleConstraints,
        verbosity: u8,
    ) -> Self {
        Self {
            tasks,
            graph,
            calendar,
            matcher,
            constraints,
            verbosity,
        }
    }

    /// Schedule every task in topological order.
    ///
    /// Horizon overruns are recorded as violations and scheduling carries on.
    pub fn run(&self) -> Result<ForwardPass, SchedulerError> {
        let horizon_end = self
            .constraints
            .horizon_end()
            .ok_or(SchedulerError::InvalidHorizon(self.constraints.horizon_days))?;

        let mut state = SchedulerState::new(self.graph);
        let mut slots: Vec<Option<ScheduledTask>> = vec![None; self.tasks.len()];
        let mut loads: FxHashMap<String, ResourceLoad> = FxHashMap::default();
        let mut conflicts: Vec<ScheduleConflict> = Vec::new();
        let mut violations: Vec<ScheduleViolation> = Vec::new();
        let verbosity = self.verbosity;

        for &idx in self.graph.topological_order() {
            let task = &self.tasks[idx];
            if state.state(idx) != TaskState::Ready {
                return Err(SchedulerError::Internal(format!(
                    "task {} reached in topological order while not ready",
                    task.id
                )));
            }

            let earliest = self.earliest_start(idx, &slots)?;
            let (start, end) = match self.calendar.schedule(earliest, task.estimated_hours) {
                Ok(span) => span,
                // Past chrono's range: pin to the last representable day, the
                // horizon check below turns it into a violation
                Err(CalendarError::OutOfRange) => {
                    let start = self
                        .calendar
                        .next_working_instant(earliest)
                        .unwrap_or(earliest);
                    let end = latest_instant(*start.offset())?.max(start);
                    (start, end)
                }
                Err(e) => return Err(e.into()),
            };

            let assignment = self.matcher.assign(task);
            match &assignment {
                Assignment::Explicit(ids) => {
                    for id in ids {
                        if self.matcher.find(id).is_none() {
                            conflicts.push(ScheduleConflict::UnknownResource {
                                task_id: task.id.clone(),
                                resource_id: id.clone(),
                            });
                        }
                    }
                }
                Assignment::Matched(candidate) => {
                    log_checks!(
                        verbosity,
                        "  Task {} matched {} ({:?} pool, lead={}, overlap={})",
                        task.id,
                        candidate.resource.id,
                        candidate.pool,
                        candidate.resource.is_lead,
                        candidate.skill_overlap
                    );
                }
                Assignment::Unmatched => {
                    log_checks!(
                        verbosity,
                        "  Task {} has no eligible resource for {:?}",
                        task.id,
                        task.skills_needed
                    );
                    conflicts.push(ScheduleConflict::NoEligibleResource {
                        task_id: task.id.clone(),
                        required_skills: task.skills_needed.clone(),
                    });
                }
            }

            let assigned = assignment.resource_ids();
            let mut booked: FxHashSet<&str> = FxHashSet::default();
            for resource_id in &assigned {
                if !booked.insert(resource_id.as_str()) {
                    continue;
                }
                let Some(resource) = self.matcher.find(resource_id) else {
                    continue;
                };
                let load = loads
                    .entry(resource_id.clone())
                    .or_insert_with(|| ResourceLoad::new(resource_id.clone(), resource.capacity));
                if let Some(over) = load.book(&task.id, start, end) {
                    let mut task_ids = vec![task.id.clone()];
                    task_ids.extend(over.overlapping);
                    conflicts.push(ScheduleConflict::ResourceOverallocated {
                        resource_id: resource_id.clone(),
                        task_ids,
                        concurrent: over.concurrent,
                        capacity: load.capacity,
                    });
                }
            }

            if end > horizon_end {
                log_changes!(
                    verbosity,
                    "  Task {} ends {} past horizon {}",
                    task.id,
                    end,
                    horizon_end
                );
                violations.push(ScheduleViolation::HorizonExceeded {
                    task_id: task.id.clone(),
                    end,
                    horizon_end,
                });
            }

            log_changes!(
                verbosity,
                "Scheduled task {} on [{}] from {} to {}",
                task.id,
                assigned.join(", "),
                start,
                end
            );

            slots[idx] = Some(ScheduledTask {
                task_id: task.id.clone(),
                title: task.title.clone(),
                start,
                end,
                duration_hours: task.estimated_hours,
                assigned_resources: assigned,
                is_critical: false,
                float_hours: 0.0,
            });

            let newly_ready = state.mark_scheduled(idx, self.graph).ok_or_else(|| {
                SchedulerError::Internal(format!("task {} could not be marked scheduled", task.id))
            })?;
            for succ in newly_ready {
                log_debug!(verbosity, "  Task {} is ready", self.graph.id(succ));
            }
        }

        if !state.is_complete() {
            return Err(SchedulerError::Internal(
                "forward pass finished with unscheduled tasks".to_string(),
            ));
        }

        let tasks = slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| SchedulerError::Internal("missing scheduled task".to_string()))?;

        Ok(ForwardPass {
            tasks,
            conflicts,
            violations,
        })
    }

    /// `max(project_start, end of every predecessor)`.
    fn earliest_start(
        &self,
        idx: usize,
        slots: &[Option<ScheduledTask>],
    ) -> Result<DateTime<FixedOffset>, SchedulerError> {
        let mut earliest = self.constraints.project_start;
        for &(pred, kind) in self.graph.predecessors(idx) {
            let scheduled = slots[pred].as_ref().ok_or_else(|| {
                SchedulerError::Internal(format!(
                    "predecessor {} of {} is not scheduled",
                    self.graph.id(pred),
                    self.graph.id(idx)
                ))
            })?;
            let available = match kind {
                DependencyKind::FinishToStart => scheduled.end,
            };
            earliest = earliest.max(available);
        }
        Ok(earliest)
    }
}

fn validate_inputs(tasks: &[Task], constraints: &ScheduleConstraints) -> Result<(), SchedulerError> {
    if constraints.horizon_days < 1 {
        return Err(SchedulerError::InvalidHorizon(constraints.horizon_days));
    }
    for task in tasks {
        if !(task.estimated_hours.is_finite() && task.estimated_hours > 0.0) {
            return Err(SchedulerError::InvalidEstimate {
                task_id: task.id.clone(),
                hours: task.estimated_hours,
            });
        }
    }
    Ok(())
}

fn summarize(
    status: ScheduleStatus,
    task_count: usize,
    conflicts: &[ScheduleConflict],
    violations: &[ScheduleViolation],
) -> String {
    match status {
        ScheduleStatus::Infeasible => {
            let reasons: Vec<String> = violations.iter().map(ToString::to_string).collect();
            format!("Schedule is infeasible: {}", reasons.join("; "))
        }
        ScheduleStatus::Feasible => format!(
            "Scheduled {} tasks with {} conflict(s)",
            task_count,
            conflicts.len()
        ),
        ScheduleStatus::Success if task_count == 0 => "No tasks to schedule".to_string(),
        ScheduleStatus::Success => format!("Scheduled {} tasks successfully", task_count),
    }
}

/// Compute a complete schedule for one project.
///
/// # Arguments
/// * `project_id` - Project being scheduled (used for logging)
/// * `tasks` - Tasks in scope; input order breaks ordering ties
/// * `resources` - Department and general resource pools
/// * `constraints` - Project start, horizon, and working calendar
/// * `milestones` - Milestones with their dependents already resolved
/// * `workpackage_id` - When set, department resources are preferred
/// * `config` - Verbosity and other run options
///
/// # Returns
/// * `Ok(ScheduleResult)`, whose status is `infeasible` on horizon overruns or missed manual milestones
/// * `Err(SchedulerError)` for unknown predecessors, cycles, or invalid estimates
pub fn schedule_project(
    project_id: &str,
    tasks: &[Task],
    resources: &ResourcePool,
    constraints: &ScheduleConstraints,
    milestones: &[Milestone],
    workpackage_id: Option<&str>,
    config: &SchedulerConfig,
) -> Result<ScheduleResult, SchedulerError> {
    let _span = tracing::info_span!("schedule_project", project_id, workpackage_id).entered();
    let verbosity = config.verbosity;

    validate_inputs(tasks, constraints)?;
    let calendar = WorkingCalendar::from_constraints(constraints)?;
    let graph = DependencyGraph::build(tasks)?;
    log_debug!(
        verbosity,
        "Topological order: {}",
        graph.topological_ids().join(", ")
    );

    let matcher = ResourceMatcher::new(resources, workpackage_id.is_some());
    let ForwardPass {
        tasks: mut by_index,
        conflicts,
        mut violations,
    } = ForwardScheduler::new(tasks, &graph, &calendar, &matcher, constraints, verbosity).run()?;

    let critical_path = mark_critical(&graph, &mut by_index, &calendar, verbosity);

    // Report tasks in the order they were scheduled
    let mut by_index: Vec<Option<ScheduledTask>> = by_index.into_iter().map(Some).collect();
    let scheduled: Vec<ScheduledTask> = graph
        .topological_order()
        .iter()
        .filter_map(|&idx| by_index[idx].take())
        .collect();

    let resolution = MilestoneResolver::new(&scheduled, verbosity).resolve_all(milestones);
    violations.extend(resolution.violations);

    let status = if !violations.is_empty() {
        ScheduleStatus::Infeasible
    } else if !conflicts.is_empty() {
        ScheduleStatus::Feasible
    } else {
        ScheduleStatus::Success
    };

    let project_start = constraints.project_start;
    let project_end = scheduled
        .iter()
        .map(|t| t.end)
        .max()
        .unwrap_or(project_start);
    let project_duration_days =
        (project_end - project_start).num_milliseconds() as f64 / 86_400_000.0;
    let message = summarize(status, scheduled.len(), &conflicts, &violations);

    log_changes!(verbosity, "{} ({})", message, status);

    Ok(ScheduleResult {
        status,
        tasks: scheduled,
        milestones: resolution.milestones,
        conflicts,
        violations,
        critical_path,
        project_start,
        project_end,
        project_duration_days,
        message,
    })
}
