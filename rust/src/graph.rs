//! Dependency graph construction, validation, and ordering.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use thiserror::Error;

use crate::interner::TaskIndex;
use crate::models::{DependencyKind, Task};

/// Errors found while validating the dependency graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Duplicate task id: {0}")]
    DuplicateTask(String),
    #[error("Task {task_id} depends on unknown task {predecessor_id}")]
    UnknownPredecessor {
        task_id: String,
        predecessor_id: String,
    },
    #[error("Circular dependency detected: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Validated dependency graph over a task slice.
///
/// Node `i` is `tasks[i]` of the slice the graph was built from.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    index: TaskIndex,
    predecessors: Vec<Vec<(usize, DependencyKind)>>,
    successors: Vec<Vec<usize>>,
    order: Vec<usize>,
}

impl DependencyGraph {
    /// Index tasks, resolve every edge, reject cycles, and compute a topological order.
    ///
    /// Ties in the order are broken by input position so the result is deterministic.
    pub fn build(tasks: &[Task]) -> Result<Self, GraphError> {
        let mut index = TaskIndex::with_capacity(tasks.len());
        for task in tasks {
            if index.insert(&task.id).is_none() {
                return Err(GraphError::DuplicateTask(task.id.clone()));
            }
        }

        let n = tasks.len();
        let mut predecessors: Vec<Vec<(usize, DependencyKind)>> = vec![Vec::new(); n];
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (idx, task) in tasks.iter().enumerate() {
            for dep in &task.dependencies {
                let pred = index.get(&dep.predecessor_id).ok_or_else(|| {
                    GraphError::UnknownPredecessor {
                        task_id: task.id.clone(),
                        predecessor_id: dep.predecessor_id.clone(),
                    }
                })?;
                predecessors[idx].push((pred, dep.kind));
                successors[pred].push(idx);
            }
        }

        let mut graph = Self {
            index,
            predecessors,
            successors,
            order: Vec::new(),
        };

        if let Some(cycle) = graph.find_cycle() {
            return Err(GraphError::CircularDependency(cycle));
        }
        graph.order = graph.kahn_order();

        Ok(graph)
    }

    /// Three-color depth-first search; returns the ids along the first cycle found.
    ///
    /// Iterative so that long dependency chains cannot overflow the stack.
    fn find_cycle(&self) -> Option<Vec<String>> {
        let n = self.len();
        let mut color = vec![Color::White; n];

        for root in 0..n {
            if color[root] != Color::White {
                continue;
            }

            // (node, next successor position)
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            color[root] = Color::Gray;

            while let Some(top) = stack.last_mut() {
                let node = top.0;
                if let Some(&succ) = self.successors[node].get(top.1) {
                    top.1 += 1;
                    match color[succ] {
                        Color::White => {
                            color[succ] = Color::Gray;
                            stack.push((succ, 0));
                        }
                        Color::Gray => {
                            let pos = stack.iter().position(|&(n, _)| n == succ).unwrap_or(0);
                            let mut cycle: Vec<String> = stack[pos..]
                                .iter()
                                .map(|&(n, _)| self.index.id(n).to_string())
                                .collect();
                            cycle.push(self.index.id(succ).to_string());
                            return Some(cycle);
                        }
                        Color::Black => {}
                    }
                } else {
                    color[node] = Color::Black;
                    stack.pop();
                }
            }
        }

        None
    }

    /// Kahn's algorithm with a min-heap on input position.
    fn kahn_order(&self) -> Vec<usize> {
        let n = self.len();
        let mut in_degree: Vec<usize> = self.predecessors.iter().map(Vec::len).collect();
        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &degree)| degree == 0)
            .map(|(idx, _)| Reverse(idx))
            .collect();

        let mut order = Vec::with_capacity(n);
        while let Some(Reverse(idx)) = ready.pop() {
            order.push(idx);
            for &succ in &self.successors[idx] {
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    ready.push(Reverse(succ));
                }
            }
        }
        order
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index_of(&self, task_id: &str) -> Option<usize> {
        self.index.get(task_id)
    }

    pub fn id(&self, idx: usize) -> &str {
        self.index.id(idx)
    }

    pub fn predecessors(&self, idx: usize) -> &[(usize, DependencyKind)] {
        &self.predecessors[idx]
    }

    pub fn successors(&self, idx: usize) -> &[usize] {
        &self.successors[idx]
    }

    /// Node indices such that every predecessor precedes its successors.
    pub fn topological_order(&self) -> &[usize] {
        &self.order
    }

    pub fn topological_ids(&self) -> Vec<&str> {
        self.order.iter().map(|&idx| self.index.id(idx)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, deps: &[&str]) -> Task {
        deps.iter()
            .fold(Task::new(id, id), |t, dep| t.depends_on(*dep))
    }

    #[test]
    fn test_empty_graph() {
        let graph = DependencyGraph::build(&[]).unwrap();
        assert!(graph.is_empty());
        assert!(graph.topological_order().is_empty());
    }

    #[test]
    fn test_order_respects_dependencies() {
        let tasks = vec![
            task("deploy", &["test"]),
            task("build", &[]),
            task("test", &["build"]),
        ];
        let graph = DependencyGraph::build(&tasks).unwrap();
        assert_eq!(graph.topological_ids(), vec!["build", "test", "deploy"]);
    }

    #[test]
    fn test_ties_broken_by_input_order() {
        let tasks = vec![
            task("c", &[]),
            task("a", &[]),
            task("d", &["c", "a"]),
            task("b", &[]),
        ];
        let graph = DependencyGraph::build(&tasks).unwrap();
        assert_eq!(graph.topological_ids(), vec!["c", "a", "d", "b"]);
    }

    #[test]
    fn test_diamond_adjacency() {
        let tasks = vec![
            task("a", &[]),
            task("b", &["a"]),
            task("c", &["a"]),
            task("d", &["b", "c"]),
        ];
        let graph = DependencyGraph::build(&tasks).unwrap();
        assert_eq!(graph.successors(0), &[1, 2]);
        assert_eq!(graph.predecessors(3).len(), 2);
        assert_eq!(graph.index_of("d"), Some(3));
    }

    #[test]
    fn test_unknown_predecessor() {
        let tasks = vec![task("a", &["ghost"])];
        assert_eq!(
            DependencyGraph::build(&tasks).unwrap_err(),
            GraphError::UnknownPredecessor {
                task_id: "a".to_string(),
                predecessor_id: "ghost".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_task() {
        let tasks = vec![task("a", &[]), task("a", &[])];
        assert_eq!(
            DependencyGraph::build(&tasks).unwrap_err(),
            GraphError::DuplicateTask("a".to_string())
        );
    }

    #[test]
    fn test_cycle_reports_path() {
        let tasks = vec![task("a", &["c"]), task("b", &["a"]), task("c", &["b"])];
        let err = DependencyGraph::build(&tasks).unwrap_err();
        assert_eq!(
            err,
            GraphError::CircularDependency(vec![
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
                "a".to_string()
            ])
        );
        assert_eq!(err.to_string(), "Circular dependency detected: a -> b -> c -> a");
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let tasks = vec![task("a", &["a"])];
        assert!(matches!(
            DependencyGraph::build(&tasks),
            Err(GraphError::CircularDependency(_))
        ));
    }
}
