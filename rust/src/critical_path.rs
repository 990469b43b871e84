//! Critical path analysis via a backward pass over the forward schedule.
//!
//! Latest finish times are propagated from the project end back through the
//! dependency graph. A task's float is the working time between its scheduled
//! end and its latest finish; tasks without float are critical.

use chrono::{DateTime, FixedOffset};

use crate::calendar::WorkingCalendar;
use crate::graph::DependencyGraph;
use crate::log_debug;
use crate::models::ScheduledTask;

/// Float below this many hours counts as zero.
const FLOAT_EPSILON_HOURS: f64 = 1e-6;

/// Per-task timing from the backward pass, indexed like the graph.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskTiming {
    pub latest_start: DateTime<FixedOffset>,
    pub latest_finish: DateTime<FixedOffset>,
    pub float_hours: f64,
}

impl TaskTiming {
    pub fn is_critical(&self) -> bool {
        self.float_hours < FLOAT_EPSILON_HOURS
    }
}

/// Compute latest start/finish and float for every task.
///
/// `scheduled[i]` must be the schedule of graph node `i`.
pub fn compute_timings(
    graph: &DependencyGraph,
    scheduled: &[ScheduledTask],
    calendar: &WorkingCalendar,
) -> Vec<TaskTiming> {
    let Some(project_end) = scheduled.iter().map(|t| t.end).max() else {
        return Vec::new();
    };

    let mut latest_start: Vec<DateTime<FixedOffset>> = scheduled.iter().map(|t| t.start).collect();
    let mut latest_finish: Vec<DateTime<FixedOffset>> = vec![project_end; scheduled.len()];

    for &idx in graph.topological_order().iter().rev() {
        let lf = graph
            .successors(idx)
            .iter()
            .map(|&succ| latest_start[succ])
            .min()
            .unwrap_or(project_end);
        let span = scheduled[idx].end - scheduled[idx].start;
        latest_finish[idx] = lf;
        latest_start[idx] = lf - span;
    }

    scheduled
        .iter()
        .enumerate()
        .map(|(idx, task)| TaskTiming {
            latest_start: latest_start[idx],
            latest_finish: latest_finish[idx],
            float_hours: calendar.working_hours_between(task.end, latest_finish[idx]),
        })
        .collect()
}

/// Annotate `scheduled` with float and criticality.
///
/// Returns the critical task ids in topological order.
pub fn mark_critical(
    graph: &DependencyGraph,
    scheduled: &mut [ScheduledTask],
    calendar: &WorkingCalendar,
    verbosity: u8,
) -> Vec<String> {
    let timings = compute_timings(graph, scheduled, calendar);

    for (task, timing) in scheduled.iter_mut().zip(&timings) {
        task.float_hours = timing.float_hours;
        task.is_critical = timing.is_critical();
        log_debug!(
            verbosity,
            "  Task {} latest finish {} float {:.2}h{}",
            task.task_id,
            timing.latest_finish,
            timing.float_hours,
            if task.is_critical { " (critical)" } else { "" }
        );
    }

    graph
        .topological_order()
        .iter()
        .filter(|&&idx| scheduled[idx].is_critical)
        .map(|&idx| scheduled[idx].task_id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Task;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn placed(id: &str, start: &str, end: &str) -> ScheduledTask {
        ScheduledTask {
            task_id: id.to_string(),
            title: id.to_string(),
            start: at(start),
            end: at(end),
            duration_hours: 8.0,
            assigned_resources: vec![],
            is_critical: false,
            float_hours: 0.0,
        }
    }

    #[test]
    fn test_chain_is_critical_and_branch_has_float() {
        let tasks = vec![
            Task::new("a", "A"),
            Task::new("b", "B").depends_on("a"),
            Task::new("c", "C").depends_on("a"),
        ];
        let graph = DependencyGraph::build(&tasks).unwrap();
        let calendar = WorkingCalendar::new(8.0, false).unwrap();
        let mut scheduled = vec![
            placed("a", "2025-01-06T00:00:00Z", "2025-01-07T00:00:00Z"),
            placed("b", "2025-01-07T00:00:00Z", "2025-01-10T00:00:00Z"),
            placed("c", "2025-01-07T00:00:00Z", "2025-01-08T00:00:00Z"),
        ];

        let critical = mark_critical(&graph, &mut scheduled, &calendar, 0);
        assert_eq!(critical, vec!["a".to_string(), "b".to_string()]);
        assert!(!scheduled[2].is_critical);
        assert!((scheduled[2].float_hours - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_weekend_gap_is_not_float() {
        let tasks = vec![Task::new("a", "A"), Task::new("b", "B").depends_on("a")];
        let graph = DependencyGraph::build(&tasks).unwrap();
        let calendar = WorkingCalendar::new(8.0, true).unwrap();
        // a ends Saturday 00:00, b starts Monday 00:00
        let scheduled = vec![
            placed("a", "2025-01-10T00:00:00Z", "2025-01-11T00:00:00Z"),
            placed("b", "2025-01-13T00:00:00Z", "2025-01-14T00:00:00Z"),
        ];

        let timings = compute_timings(&graph, &scheduled, &calendar);
        assert_eq!(timings[0].latest_finish, at("2025-01-13T00:00:00Z"));
        assert!(timings[0].is_critical());
        assert!(timings[1].is_critical());
    }

    #[test]
    fn test_empty_schedule() {
        let graph = DependencyGraph::build(&[]).unwrap();
        let calendar = WorkingCalendar::new(8.0, true).unwrap();
        assert!(compute_timings(&graph, &[], &calendar).is_empty());
    }
}
