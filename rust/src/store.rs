//! Record store boundary and the async scheduling service.
//!
//! The scheduling algorithm itself is synchronous. Suspension points exist
//! only here: fetching the snapshot and writing computed dates back.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ScheduleConstraints, SchedulerConfig};
use crate::log_changes;
use crate::matcher::ResourcePool;
use crate::models::{Milestone, Resource, ScheduleResult, ScheduledTask, Task};
use crate::scheduler::{schedule_project, SchedulerError};

/// Errors raised by a record store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// The external record store that owns tasks, resources, and milestones.
///
/// Writes must be idempotent: writing the same dates twice is harmless.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Tasks in scope, narrowed to a work package when one is given.
    async fn fetch_tasks(
        &self,
        project_id: &str,
        workpackage_id: Option<&str>,
    ) -> Result<Vec<Task>, StoreError>;

    /// Resources of the department linked to the work package; empty if none.
    async fn fetch_department_resources(
        &self,
        workpackage_id: &str,
    ) -> Result<Vec<Resource>, StoreError>;

    async fn fetch_general_resources(&self, project_id: &str) -> Result<Vec<Resource>, StoreError>;

    async fn fetch_milestone_dependents(&self, milestone_id: &str)
        -> Result<Vec<String>, StoreError>;

    /// Write one task's computed dates back onto its record.
    async fn persist_task_dates(&self, task: &ScheduledTask) -> Result<(), StoreError>;
}

/// Outcome of a best-effort write-back.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistReport {
    pub persisted: usize,
    /// Ids of tasks whose dates could not be written.
    pub failed: Vec<String>,
}

/// Write every task's dates back to the store.
///
/// Failures are logged and counted, never returned.
pub async fn persist_schedule<S>(store: &S, tasks: &[ScheduledTask]) -> PersistReport
where
    S: ScheduleStore + ?Sized,
{
    let mut report = PersistReport::default();
    for task in tasks {
        match store.persist_task_dates(task).await {
            Ok(()) => report.persisted += 1,
            Err(e) => {
                tracing::warn!(task_id = %task.task_id, error = %e, "failed to persist task dates");
                report.failed.push(task.task_id.clone());
            }
        }
    }
    report
}

/// A milestone as requested by the caller; dependents come from the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneSpec {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub target_date: DateTime<FixedOffset>,
    #[serde(default)]
    pub is_manual_constraint: bool,
}

/// One scheduling request against the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub project_id: String,
    #[serde(default)]
    pub workpackage_id: Option<String>,
    pub constraints: ScheduleConstraints,
    #[serde(default)]
    pub milestones: Vec<MilestoneSpec>,
}

impl ScheduleRequest {
    pub fn new(project_id: impl Into<String>, constraints: ScheduleConstraints) -> Self {
        Self {
            project_id: project_id.into(),
            workpackage_id: None,
            constraints,
            milestones: Vec::new(),
        }
    }

    pub fn for_workpackage(mut self, workpackage_id: impl Into<String>) -> Self {
        self.workpackage_id = Some(workpackage_id.into());
        self
    }

    pub fn with_milestone(mut self, milestone: MilestoneSpec) -> Self {
        self.milestones.push(milestone);
        self
    }
}

/// The computed schedule plus what happened when writing it back.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleOutcome {
    pub result: ScheduleResult,
    /// `None` when nothing was written (infeasible schedule).
    pub persist: Option<PersistReport>,
}

/// Fetches a snapshot from the store, schedules it, and materializes the result.
pub struct ProjectScheduler<S> {
    store: S,
    config: SchedulerConfig,
}

impl<S: ScheduleStore> ProjectScheduler<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: SchedulerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Schedule one project.
    ///
    /// Store read errors and validation errors abort the call. Write-back
    /// failures only show up in the returned [`PersistReport`].
    pub async fn schedule(&self, request: &ScheduleRequest) -> Result<ScheduleOutcome, SchedulerError> {
        let project_id = request.project_id.as_str();
        let workpackage_id = request.workpackage_id.as_deref();

        let tasks = self.store.fetch_tasks(project_id, workpackage_id).await?;
        let department = match workpackage_id {
            Some(wp) => self.store.fetch_department_resources(wp).await?,
            None => Vec::new(),
        };
        let general = self.store.fetch_general_resources(project_id).await?;
        let resources = ResourcePool::new(department, general);

        let mut milestones = Vec::with_capacity(request.milestones.len());
        for spec in &request.milestones {
            let dependents = self.store.fetch_milestone_dependents(&spec.id).await?;
            milestones.push(
                Milestone::from_flag(
                    spec.id.clone(),
                    spec.title.clone(),
                    spec.target_date,
                    spec.is_manual_constraint,
                )
                .with_dependents(dependents),
            );
        }

        let result = schedule_project(
            project_id,
            &tasks,
            &resources,
            &request.constraints,
            &milestones,
            workpackage_id,
            &self.config,
        )?;

        let persist = if !result.is_infeasible() || self.config.persist_infeasible {
            let report = persist_schedule(&self.store, &result.tasks).await;
            log_changes!(
                self.config.verbosity,
                "Persisted {} task(s), {} failed",
                report.persisted,
                report.failed.len()
            );
            Some(report)
        } else {
            None
        };

        Ok(ScheduleOutcome { result, persist })
    }
}

#[derive(Clone, Debug)]
struct StoredTask {
    workpackage_id: Option<String>,
    task: Task,
}

#[derive(Default)]
struct StoreData {
    tasks: FxHashMap<String, Vec<StoredTask>>,
    general_resources: FxHashMap<String, Vec<Resource>>,
    department_resources: FxHashMap<String, Vec<Resource>>,
    milestone_dependents: FxHashMap<String, Vec<String>>,
    task_dates: FxHashMap<String, (DateTime<FixedOffset>, DateTime<FixedOffset>)>,
    failing_writes: FxHashSet<String>,
}

/// In-memory store for development/testing.
#[derive(Default)]
pub struct InMemoryStore {
    data: RwLock<StoreData>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_task(&self, project_id: &str, workpackage_id: Option<&str>, task: Task) {
        self.data
            .write()
            .tasks
            .entry(project_id.to_string())
            .or_default()
            .push(StoredTask {
                workpackage_id: workpackage_id.map(str::to_string),
                task,
            });
    }

    pub fn insert_general_resource(&self, project_id: &str, resource: Resource) {
        self.data
            .write()
            .general_resources
            .entry(project_id.to_string())
            .or_default()
            .push(resource);
    }

    pub fn insert_department_resource(&self, workpackage_id: &str, resource: Resource) {
        self.data
            .write()
            .department_resources
            .entry(workpackage_id.to_string())
            .or_default()
            .push(resource);
    }

    pub fn set_milestone_dependents<I, T>(&self, milestone_id: &str, task_ids: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.data.write().milestone_dependents.insert(
            milestone_id.to_string(),
            task_ids.into_iter().map(Into::into).collect(),
        );
    }

    /// Make every later write of `task_id`'s dates fail.
    pub fn fail_writes_for(&self, task_id: &str) {
        self.data.write().failing_writes.insert(task_id.to_string());
    }

    /// Dates last written for `task_id`.
    pub fn task_dates(&self, task_id: &str) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
        self.data.read().task_dates.get(task_id).copied()
    }
}

#[async_trait]
impl ScheduleStore for InMemoryStore {
    async fn fetch_tasks(
        &self,
        project_id: &str,
        workpackage_id: Option<&str>,
    ) -> Result<Vec<Task>, StoreError> {
        let data = self.data.read();
        let stored = data
            .tasks
            .get(project_id)
            .ok_or_else(|| StoreError::NotFound(format!("project {}", project_id)))?;
        Ok(stored
            .iter()
            .filter(|s| workpackage_id.is_none() || s.workpackage_id.as_deref() == workpackage_id)
            .map(|s| s.task.clone())
            .collect())
    }

    async fn fetch_department_resources(
        &self,
        workpackage_id: &str,
    ) -> Result<Vec<Resource>, StoreError> {
        Ok(self
            .data
            .read()
            .department_resources
            .get(workpackage_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_general_resources(&self, project_id: &str) -> Result<Vec<Resource>, StoreError> {
        Ok(self
            .data
            .read()
            .general_resources
            .get(project_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_milestone_dependents(
        &self,
        milestone_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        Ok(self
            .data
            .read()
            .milestone_dependents
            .get(milestone_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn persist_task_dates(&self, task: &ScheduledTask) -> Result<(), StoreError> {
        let mut data = self.data.write();
        if data.failing_writes.contains(&task.task_id) {
            return Err(StoreError::Backend(format!(
                "write rejected for task {}",
                task.task_id
            )));
        }
        data.task_dates
            .insert(task.task_id.clone(), (task.start, task.end));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScheduleStatus;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn constraints() -> ScheduleConstraints {
        ScheduleConstraints::new(at("2025-01-06T00:00:00+00:00"))
    }

    fn seeded_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.insert_task(
            "p1",
            Some("wp1"),
            Task::new("a", "Design").with_hours(16.0).with_skills(["Python"]),
        );
        store.insert_task(
            "p1",
            Some("wp1"),
            Task::new("b", "Build")
                .with_hours(40.0)
                .with_skills(["Python"])
                .depends_on("a"),
        );
        store.insert_task("p1", Some("wp2"), Task::new("c", "Docs"));
        store.insert_general_resource(
            "p1",
            Resource::new("dev1", "Dev One").with_skills(["Python"]).as_lead(),
        );
        store
    }

    #[tokio::test]
    async fn test_schedule_persists_dates() {
        let scheduler = ProjectScheduler::new(seeded_store());
        let outcome = scheduler
            .schedule(&ScheduleRequest::new("p1", constraints()))
            .await
            .unwrap();

        // c runs alongside a on dev1
        assert_eq!(outcome.result.status, ScheduleStatus::Feasible);
        assert_eq!(
            outcome.persist,
            Some(PersistReport {
                persisted: 3,
                failed: vec![],
            })
        );
        let b = outcome.result.task("b").unwrap();
        assert_eq!(scheduler.store().task_dates("b"), Some((b.start, b.end)));
    }

    #[tokio::test]
    async fn test_workpackage_scope_and_department_preference() {
        let store = seeded_store();
        store.insert_department_resource(
            "wp1",
            Resource::new("dept1", "Dept One").with_skills(["Python"]),
        );
        let scheduler = ProjectScheduler::new(store);
        let outcome = scheduler
            .schedule(&ScheduleRequest::new("p1", constraints()).for_workpackage("wp1"))
            .await
            .unwrap();

        assert_eq!(outcome.result.tasks.len(), 2);
        assert!(outcome.result.task("c").is_none());
        assert_eq!(
            outcome.result.task("a").unwrap().assigned_resources,
            vec!["dept1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_persist_failure_is_swallowed() {
        let store = seeded_store();
        store.fail_writes_for("a");
        let scheduler = ProjectScheduler::new(store);
        let outcome = scheduler
            .schedule(&ScheduleRequest::new("p1", constraints()))
            .await
            .unwrap();

        let report = outcome.persist.unwrap();
        assert_eq!(report.persisted, 2);
        assert_eq!(report.failed, vec!["a".to_string()]);
        assert!(outcome.result.task("a").is_some());
        assert_eq!(scheduler.store().task_dates("a"), None);
    }

    #[tokio::test]
    async fn test_infeasible_schedule_not_persisted() {
        let store = seeded_store();
        store.set_milestone_dependents("m1", ["b"]);
        let milestone = MilestoneSpec {
            id: "m1".to_string(),
            title: "Release".to_string(),
            target_date: at("2025-01-07T00:00:00+00:00"),
            is_manual_constraint: true,
        };
        let request = ScheduleRequest::new("p1", constraints()).with_milestone(milestone);

        let scheduler = ProjectScheduler::new(store);
        let outcome = scheduler.schedule(&request).await.unwrap();
        assert_eq!(outcome.result.status, ScheduleStatus::Infeasible);
        assert_eq!(outcome.persist, None);
        assert_eq!(scheduler.store().task_dates("a"), None);

        let scheduler = ProjectScheduler::new(seeded_store()).with_config(SchedulerConfig {
            persist_infeasible: true,
            ..SchedulerConfig::default()
        });
        scheduler.store().set_milestone_dependents("m1", ["b"]);
        let outcome = scheduler.schedule(&request).await.unwrap();
        assert_eq!(outcome.persist.map(|r| r.persisted), Some(3));
    }

    #[tokio::test]
    async fn test_automatic_milestone_dependents_from_store() {
        let store = seeded_store();
        store.set_milestone_dependents("m1", ["a", "b"]);
        let request = ScheduleRequest::new("p1", constraints()).with_milestone(MilestoneSpec {
            id: "m1".to_string(),
            title: "Done".to_string(),
            target_date: at("2025-03-01T00:00:00+00:00"),
            is_manual_constraint: false,
        });

        let outcome = ProjectScheduler::new(store).schedule(&request).await.unwrap();
        let milestone = outcome.result.milestone("m1").unwrap();
        assert_eq!(milestone.resolved_date, outcome.result.task("b").unwrap().end);
    }

    #[tokio::test]
    async fn test_unknown_project_is_store_error() {
        let err = ProjectScheduler::new(InMemoryStore::new())
            .schedule(&ScheduleRequest::new("missing", constraints()))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::Store(StoreError::NotFound(_))));
    }
}
