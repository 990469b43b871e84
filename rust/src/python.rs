//! Python bindings: typed records plus a JSON convenience entry point.

use chrono::{DateTime, FixedOffset};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::config::{ScheduleConstraints, SchedulerConfig};
use crate::input::schedule_project_json;
use crate::logging::init_tracing;
use crate::matcher::ResourcePool;
use crate::models::{
    Dependency, DependencyKind, Milestone, MilestoneMode, MilestoneSchedule, Resource,
    ScheduleResult, ScheduledTask, Task, DEFAULT_ESTIMATED_HOURS,
};
use crate::scheduler::schedule_project;

#[pymethods]
impl Dependency {
    #[new]
    fn py_new(predecessor_id: String) -> Self {
        Self::finish_to_start(predecessor_id)
    }

    #[getter]
    fn predecessor_id(&self) -> String {
        self.predecessor_id.clone()
    }

    #[getter]
    fn kind(&self) -> &'static str {
        match self.kind {
            DependencyKind::FinishToStart => "finish_to_start",
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Dependency(predecessor_id={:?}, kind={:?})",
            self.predecessor_id,
            self.kind()
        )
    }
}

#[pymethods]
impl Task {
    #[new]
    #[pyo3(signature = (
        id,
        title=String::new(),
        estimated_hours=DEFAULT_ESTIMATED_HOURS,
        skills_needed=Vec::new(),
        dependencies=Vec::new(),
        required_resources=Vec::new()
    ))]
    fn py_new(
        id: String,
        title: String,
        estimated_hours: f64,
        skills_needed: Vec<String>,
        dependencies: Vec<Dependency>,
        required_resources: Vec<String>,
    ) -> Self {
        Self {
            id,
            title,
            estimated_hours,
            skills_needed,
            dependencies,
            required_resources,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Task(id={:?}, estimated_hours={}, skills={:?}, deps={})",
            self.id,
            self.estimated_hours,
            self.skills_needed,
            self.dependencies.len()
        )
    }
}

#[pymethods]
impl Resource {
    #[new]
    #[pyo3(signature = (id, name=String::new(), skills=Vec::new(), capacity=1, is_lead=false))]
    fn py_new(id: String, name: String, skills: Vec<String>, capacity: u32, is_lead: bool) -> Self {
        Self {
            id,
            name,
            capacity,
            skills,
            is_lead,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Resource(id={:?}, skills={:?}, capacity={}, is_lead={})",
            self.id, self.skills, self.capacity, self.is_lead
        )
    }
}

#[pymethods]
impl ScheduleConstraints {
    #[new]
    #[pyo3(signature = (
        project_start,
        horizon_days=365,
        working_hours_per_day=8.0,
        respect_weekends=true
    ))]
    fn py_new(
        project_start: DateTime<FixedOffset>,
        horizon_days: i64,
        working_hours_per_day: f64,
        respect_weekends: bool,
    ) -> Self {
        Self::new(project_start)
            .with_horizon_days(horizon_days)
            .with_working_hours_per_day(working_hours_per_day)
            .with_weekends(respect_weekends)
    }

    fn __repr__(&self) -> String {
        format!(
            "ScheduleConstraints(project_start={}, horizon_days={}, working_hours_per_day={}, respect_weekends={})",
            self.project_start.to_rfc3339(),
            self.horizon_days,
            self.working_hours_per_day,
            self.respect_weekends
        )
    }
}

#[pymethods]
impl Milestone {
    #[new]
    #[pyo3(signature = (id, title, target_date, is_manual_constraint=false, dependents=Vec::new()))]
    fn py_new(
        id: String,
        title: String,
        target_date: DateTime<FixedOffset>,
        is_manual_constraint: bool,
        dependents: Vec<String>,
    ) -> Self {
        Self::from_flag(id, title, target_date, is_manual_constraint).with_dependents(dependents)
    }

    #[getter]
    fn id(&self) -> String {
        self.id.clone()
    }

    #[getter]
    fn title(&self) -> String {
        self.title.clone()
    }

    #[getter]
    fn target_date(&self) -> DateTime<FixedOffset> {
        self.constraint.target_date()
    }

    #[getter]
    fn is_manual_constraint(&self) -> bool {
        self.constraint.mode() == MilestoneMode::Manual
    }

    #[getter]
    fn dependents(&self) -> Vec<String> {
        self.dependents.clone()
    }

    fn __repr__(&self) -> String {
        format!(
            "Milestone(id={:?}, mode={:?}, target_date={}, dependents={})",
            self.id,
            self.constraint.mode(),
            self.constraint.target_date().to_rfc3339(),
            self.dependents.len()
        )
    }
}

#[pymethods]
impl ScheduledTask {
    fn __repr__(&self) -> String {
        format!(
            "ScheduledTask(task_id={:?}, start={}, end={}, resources={:?}, critical={})",
            self.task_id,
            self.start.to_rfc3339(),
            self.end.to_rfc3339(),
            self.assigned_resources,
            self.is_critical
        )
    }
}

#[pymethods]
impl MilestoneSchedule {
    fn __repr__(&self) -> String {
        format!(
            "MilestoneSchedule(milestone_id={:?}, resolved_date={}, is_feasible={})",
            self.milestone_id,
            self.resolved_date.to_rfc3339(),
            self.is_feasible
        )
    }
}

#[pymethods]
impl ScheduleResult {
    /// "success", "feasible", or "infeasible".
    #[getter]
    fn status(&self) -> String {
        self.status.to_string()
    }

    #[getter(is_infeasible)]
    fn py_is_infeasible(&self) -> bool {
        self.is_infeasible()
    }

    #[getter]
    fn tasks(&self) -> Vec<ScheduledTask> {
        self.tasks.clone()
    }

    #[getter]
    fn milestones(&self) -> Vec<MilestoneSchedule> {
        self.milestones.clone()
    }

    #[getter]
    fn conflicts(&self) -> Vec<String> {
        self.conflicts.iter().map(ToString::to_string).collect()
    }

    #[getter]
    fn violations(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }

    #[getter]
    fn critical_path(&self) -> Vec<String> {
        self.critical_path.clone()
    }

    #[getter]
    fn project_start(&self) -> DateTime<FixedOffset> {
        self.project_start
    }

    #[getter]
    fn project_end(&self) -> DateTime<FixedOffset> {
        self.project_end
    }

    #[getter]
    fn project_duration_days(&self) -> f64 {
        self.project_duration_days
    }

    #[getter]
    fn message(&self) -> String {
        self.message.clone()
    }

    #[pyo3(name = "task")]
    fn py_task(&self, task_id: &str) -> Option<ScheduledTask> {
        self.task(task_id).cloned()
    }

    /// Full result, conflicts and violations included, as JSON.
    fn to_json(&self) -> PyResult<String> {
        serde_json::to_string(self).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    fn __repr__(&self) -> String {
        format!(
            "ScheduleResult(status={}, tasks={}, conflicts={}, violations={})",
            self.status,
            self.tasks.len(),
            self.conflicts.len(),
            self.violations.len()
        )
    }
}

/// Schedule a project.
///
/// # Returns
/// * ScheduleResult; infeasible schedules are returned, not raised
///
/// # Raises
/// * ValueError on unknown predecessors, cycles, or invalid estimates
#[pyfunction]
#[pyo3(
    name = "schedule_project",
    signature = (
        project_id,
        tasks,
        constraints,
        general_resources=Vec::new(),
        department_resources=Vec::new(),
        milestones=Vec::new(),
        workpackage_id=None,
        verbosity=0
    )
)]
#[allow(clippy::too_many_arguments)]
pub fn py_schedule_project(
    py: Python<'_>,
    project_id: &str,
    tasks: Vec<Task>,
    constraints: ScheduleConstraints,
    general_resources: Vec<Resource>,
    department_resources: Vec<Resource>,
    milestones: Vec<Milestone>,
    workpackage_id: Option<&str>,
    verbosity: u8,
) -> PyResult<ScheduleResult> {
    let resources = ResourcePool::new(department_resources, general_resources);
    let config = SchedulerConfig::default().with_verbosity(verbosity);
    py.allow_threads(|| {
        schedule_project(
            project_id,
            &tasks,
            &resources,
            &constraints,
            &milestones,
            workpackage_id,
            &config,
        )
    })
    .map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Schedule a project described by a JSON `ScheduleInput`.
///
/// # Returns
/// * JSON-encoded `ScheduleResult`
///
/// # Raises
/// * ValueError on malformed input or any validation error
#[pyfunction]
#[pyo3(name = "schedule_project_json")]
pub fn py_schedule_project_json(py: Python<'_>, payload: &str) -> PyResult<String> {
    py.allow_threads(|| schedule_project_json(payload))
        .map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Route scheduler logs through a `RUST_LOG`-filtered stderr subscriber.
#[pyfunction]
#[pyo3(name = "init_logging")]
pub fn py_init_logging() {
    init_tracing();
}
