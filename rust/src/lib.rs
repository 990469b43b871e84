//! Project scheduler: dependency-ordered forward scheduling of tasks onto a
//! working calendar, with skill-based resource matching, critical path
//! annotation, and milestone resolution.
//!
//! [`schedule_project`] is the synchronous entry point. [`ProjectScheduler`]
//! wraps it with the fetch and write-back steps against a [`ScheduleStore`].

// Allow clippy warning triggered by PyO3 macro expansion
#![cfg_attr(feature = "python", allow(clippy::useless_conversion))]

pub mod calendar;
mod config;
pub mod critical_path;
pub mod graph;
mod input;
mod interner;
pub mod logging;
pub mod matcher;
pub mod milestones;
mod models;
#[cfg(feature = "python")]
mod python;
pub mod scheduler;
pub mod store;

pub use calendar::{CalendarError, WorkingCalendar};
pub use config::{ScheduleConstraints, SchedulerConfig};
pub use graph::{DependencyGraph, GraphError};
pub use input::{schedule_project_json, ScheduleInput};
pub use logging::init_tracing;
pub use matcher::{PoolKind, ResourceMatcher, ResourcePool};
pub use milestones::{MilestoneResolution, MilestoneResolver};
pub use models::{
    Dependency, DependencyKind, Milestone, MilestoneConstraint, MilestoneMode, MilestoneSchedule,
    Resource, ScheduleConflict, ScheduleResult, ScheduleStatus, ScheduleViolation, ScheduledTask,
    Task, DEFAULT_ESTIMATED_HOURS,
};
pub use scheduler::{schedule_project, SchedulerError};
pub use store::{
    persist_schedule, InMemoryStore, MilestoneSpec, PersistReport, ProjectScheduler,
    ScheduleOutcome, ScheduleRequest, ScheduleStore, StoreError,
};

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn project_scheduler(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Input records
    m.add_class::<Dependency>()?;
    m.add_class::<Task>()?;
    m.add_class::<Resource>()?;
    m.add_class::<Milestone>()?;
    m.add_class::<ScheduleConstraints>()?;

    // Results
    m.add_class::<ScheduledTask>()?;
    m.add_class::<MilestoneSchedule>()?;
    m.add_class::<MilestoneMode>()?;
    m.add_class::<ScheduleResult>()?;

    m.add_function(wrap_pyfunction!(python::py_schedule_project, m)?)?;
    m.add_function(wrap_pyfunction!(python::py_schedule_project_json, m)?)?;
    m.add_function(wrap_pyfunction!(python::py_init_logging, m)?)?;
    Ok(())
}
