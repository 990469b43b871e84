//! JSON entry point for callers that hand over a complete snapshot in one payload.

use serde::{Deserialize, Serialize};

use crate::config::{ScheduleConstraints, SchedulerConfig};
use crate::matcher::ResourcePool;
use crate::models::{Milestone, ScheduleResult, Task};
use crate::scheduler::{schedule_project, SchedulerError};

/// Everything one scheduling call needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleInput {
    pub project_id: String,
    #[serde(default)]
    pub workpackage_id: Option<String>,
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub resources: ResourcePool,
    pub constraints: ScheduleConstraints,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub config: SchedulerConfig,
}

impl ScheduleInput {
    pub fn run(&self) -> Result<ScheduleResult, SchedulerError> {
        schedule_project(
            &self.project_id,
            &self.tasks,
            &self.resources,
            &self.constraints,
            &self.milestones,
            self.workpackage_id.as_deref(),
            &self.config,
        )
    }
}

/// Parse a [`ScheduleInput`], schedule it, and serialize the [`ScheduleResult`].
pub fn schedule_project_json(payload: &str) -> Result<String, SchedulerError> {
    let input: ScheduleInput = serde_json::from_str(payload)?;
    let result = input.run()?;
    Ok(serde_json::to_string(&result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphError;
    use serde_json::{json, Value};

    #[test]
    fn test_json_round_trip_through_scheduler() {
        let payload = json!({
            "project_id": "p1",
            "tasks": [
                {"id": "a", "title": "Design", "estimated_hours": 16, "skills_needed": ["Python"]},
                {"id": "b", "title": "Build", "skills_needed": ["python"],
                 "dependencies": [{"predecessor_id": "a"}]}
            ],
            "resources": {
                "general": [{"id": "dev1", "name": "Dev One", "skills": ["Python"], "lead": true}]
            },
            "constraints": {"project_start": "2025-01-06T09:00:00+02:00"},
            "milestones": [
                {"id": "m1", "title": "Done", "target_date": "2025-02-01T00:00:00+02:00",
                 "dependents": ["a", "b"]}
            ]
        });

        let out: Value = serde_json::from_str(&schedule_project_json(&payload.to_string()).unwrap()).unwrap();
        assert_eq!(out["status"], "success");
        assert_eq!(out["tasks"][0]["task_id"], "a");
        assert_eq!(out["tasks"][0]["start"], "2025-01-06T09:00:00+02:00");
        assert_eq!(out["tasks"][1]["duration_hours"], 8.0);
        assert_eq!(out["tasks"][1]["assigned_resources"][0], "dev1");
        assert_eq!(out["milestones"][0]["mode"], "automatic");
        assert_eq!(out["milestones"][0]["resolved_date"], out["tasks"][1]["end"]);
    }

    #[test]
    fn test_malformed_payload() {
        let err = schedule_project_json("{not json").unwrap_err();
        assert!(matches!(err, SchedulerError::Payload(_)));
    }

    #[test]
    fn test_validation_error_surfaces() {
        let input = ScheduleInput {
            project_id: "p1".to_string(),
            workpackage_id: None,
            tasks: vec![Task::new("a", "A").depends_on("a")],
            resources: ResourcePool::default(),
            constraints: ScheduleConstraints::new(
                chrono::DateTime::parse_from_rfc3339("2025-01-06T00:00:00Z").unwrap(),
            ),
            milestones: vec![],
            config: SchedulerConfig::default(),
        };
        let err = input.run().unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Graph(GraphError::CircularDependency(_))
        ));
    }
}
