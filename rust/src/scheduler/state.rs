//! Per-task scheduling state: `Pending -> Ready -> Scheduled`.

use crate::graph::DependencyGraph;

/// Where a task is in the forward pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    /// Waiting on at least one unscheduled predecessor.
    Pending,
    /// Every predecessor is scheduled.
    Ready,
    Scheduled,
}

/// Tracks task states and outstanding predecessor counts during a forward pass.
#[derive(Clone, Debug)]
pub struct SchedulerState {
    states: Vec<TaskState>,
    waiting_on: Vec<usize>,
    scheduled_count: usize,
}

impl SchedulerState {
    pub fn new(graph: &DependencyGraph) -> Self {
        let waiting_on: Vec<usize> = (0..graph.len())
            .map(|idx| graph.predecessors(idx).len())
            .collect();
        let states = waiting_on
            .iter()
            .map(|&n| {
                if n == 0 {
                    TaskState::Ready
                } else {
                    TaskState::Pending
                }
            })
            .collect();
        Self {
            states,
            waiting_on,
            scheduled_count: 0,
        }
    }

    pub fn state(&self, idx: usize) -> TaskState {
        self.states[idx]
    }

    /// Move a ready task to `Scheduled`; returns the successors that became ready.
    ///
    /// Returns `None` (and changes nothing) if the task was not ready.
    pub fn mark_scheduled(&mut self, idx: usize, graph: &DependencyGraph) -> Option<Vec<usize>> {
        if self.states[idx] != TaskState::Ready {
            return None;
        }
        self.states[idx] = TaskState::Scheduled;
        self.scheduled_count += 1;

        let mut newly_ready = Vec::new();
        for &succ in graph.successors(idx) {
            self.waiting_on[succ] -= 1;
            if self.waiting_on[succ] == 0 && self.states[succ] == TaskState::Pending {
                self.states[succ] = TaskState::Ready;
                newly_ready.push(succ);
            }
        }
        Some(newly_ready)
    }

    pub fn is_complete(&self) -> bool {
        self.scheduled_count == self.states.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Task;

    #[test]
    fn test_transitions_follow_dependencies() {
        let tasks = vec![
            Task::new("a", "A"),
            Task::new("b", "B").depends_on("a"),
            Task::new("c", "C").depends_on("a").depends_on("b"),
        ];
        let graph = DependencyGraph::build(&tasks).unwrap();
        let mut state = SchedulerState::new(&graph);

        assert_eq!(state.state(0), TaskState::Ready);
        assert_eq!(state.state(1), TaskState::Pending);

        // c is not ready yet
        assert_eq!(state.mark_scheduled(2, &graph), None);

        assert_eq!(state.mark_scheduled(0, &graph), Some(vec![1]));
        assert_eq!(state.state(2), TaskState::Pending);
        assert_eq!(state.mark_scheduled(1, &graph), Some(vec![2]));
        assert_eq!(state.mark_scheduled(2, &graph), Some(vec![]));

        assert!(state.is_complete());
        assert_eq!(state.state(0), TaskState::Scheduled);
    }
}
