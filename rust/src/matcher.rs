//! Skill-based resource matching.
//!
//! Ranking, applied lexicographically:
//! 1. department pool before general pool (only with a work-package context)
//! 2. lead before non-lead
//! 3. larger skill overlap before smaller
//!
//! Only resources holding every required skill are eligible, so the overlap
//! always equals the number of required skills and rule 3 never reorders
//! candidates of one task. Remaining ties keep pool order, department pool first.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::models::{Resource, Task};

/// Where a candidate resource came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    Department,
    General,
}

/// Resources available to one scheduling call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePool {
    /// Resources of the department linked to the work package.
    #[serde(default)]
    pub department: Vec<Resource>,
    #[serde(default)]
    pub general: Vec<Resource>,
}

impl ResourcePool {
    pub fn new(department: Vec<Resource>, general: Vec<Resource>) -> Self {
        Self {
            department,
            general,
        }
    }

    pub fn general_only(general: Vec<Resource>) -> Self {
        Self {
            department: Vec::new(),
            general,
        }
    }
}

/// An eligible resource for a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate<'a> {
    pub resource: &'a Resource,
    pub pool: PoolKind,
    pub skill_overlap: usize,
}

/// How a task's resources were decided.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Assignment<'a> {
    /// `required_resources` taken as given.
    Explicit(Vec<String>),
    /// Best-ranked skill match.
    Matched(Candidate<'a>),
    /// Nobody has the required skills.
    Unmatched,
}

impl Assignment<'_> {
    pub fn resource_ids(&self) -> Vec<String> {
        match self {
            Assignment::Explicit(ids) => ids.clone(),
            Assignment::Matched(candidate) => vec![candidate.resource.id.clone()],
            Assignment::Unmatched => Vec::new(),
        }
    }
}

/// Ranks resources from the department and general pools against skill requirements.
pub struct ResourceMatcher<'a> {
    entries: Vec<(PoolKind, &'a Resource, FxHashSet<String>)>,
    department_first: bool,
}

impl<'a> ResourceMatcher<'a> {
    /// Build a matcher; `department_first` is set when a work-package context was given.
    ///
    /// A resource listed in both pools is kept once, as a department resource.
    pub fn new(pool: &'a ResourcePool, department_first: bool) -> Self {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        let entries = pool
            .department
            .iter()
            .map(|r| (PoolKind::Department, r))
            .chain(pool.general.iter().map(|r| (PoolKind::General, r)))
            .filter(|(_, r)| seen.insert(r.id.as_str()))
            .map(|(kind, r)| (kind, r, normalize(&r.skills)))
            .collect();

        Self {
            entries,
            department_first,
        }
    }

    pub fn find(&self, resource_id: &str) -> Option<&'a Resource> {
        self.entries
            .iter()
            .find(|(_, r, _)| r.id == resource_id)
            .map(|(_, r, _)| *r)
    }

    /// Eligible resources for `required_skills`, most preferred first.
    ///
    /// Skill names compare case-insensitively. An empty requirement makes
    /// every resource eligible.
    pub fn candidates(&self, required_skills: &[String]) -> Vec<Candidate<'a>> {
        let required = normalize(required_skills);

        let mut candidates: Vec<Candidate<'a>> = self
            .entries
            .iter()
            .filter(|(_, _, skills)| required.is_subset(skills))
            .map(|(pool, resource, skills)| Candidate {
                resource: *resource,
                pool: *pool,
                skill_overlap: skills.intersection(&required).count(),
            })
            .collect();

        // Stable sort keeps pool order for full ties
        candidates.sort_by_key(|c| {
            let pool_rank = match (self.department_first, c.pool) {
                (true, PoolKind::Department) => 0,
                (true, PoolKind::General) => 1,
                (false, _) => 0,
            };
            (
                pool_rank,
                !c.resource.is_lead,
                std::cmp::Reverse(c.skill_overlap),
            )
        });

        candidates
    }

    /// Decide the resources for `task`.
    pub fn assign(&self, task: &Task) -> Assignment<'a> {
        if !task.required_resources.is_empty() {
            return Assignment::Explicit(task.required_resources.clone());
        }
        match self.candidates(&task.skills_needed).into_iter().next() {
            Some(best) => Assignment::Matched(best),
            None => Assignment::Unmatched,
        }
    }
}

fn normalize(skills: &[String]) -> FxHashSet<String> {
    skills
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skills(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_lead_preferred_over_non_lead() {
        let pool = ResourcePool::general_only(vec![
            Resource::new("dev2", "Dev Two").with_skills(["Python"]),
            Resource::new("dev1", "Dev One")
                .with_skills(["Python"])
                .as_lead(),
        ]);
        let matcher = ResourceMatcher::new(&pool, false);
        let task = Task::new("a", "A").with_skills(["Python"]);

        match matcher.assign(&task) {
            Assignment::Matched(c) => assert_eq!(c.resource.id, "dev1"),
            other => panic!("unexpected assignment {:?}", other),
        }
    }

    #[test]
    fn test_department_preferred_with_context() {
        let pool = ResourcePool::new(
            vec![Resource::new("dept", "Department").with_skills(["SQL"])],
            vec![Resource::new("gen", "General")
                .with_skills(["SQL"])
                .as_lead()],
        );

        let with_context = ResourceMatcher::new(&pool, true);
        let ids: Vec<&str> = with_context
            .candidates(&skills(&["SQL"]))
            .iter()
            .map(|c| c.resource.id.as_str())
            .collect();
        assert_eq!(ids, vec!["dept", "gen"]);

        // Without a work package the lead flag decides
        let without_context = ResourceMatcher::new(&pool, false);
        let best = without_context.candidates(&skills(&["SQL"]))[0];
        assert_eq!(best.resource.id, "gen");
    }

    #[test]
    fn test_requires_skill_superset() {
        let pool = ResourcePool::general_only(vec![
            Resource::new("a", "A").with_skills(["Rust"]),
            Resource::new("b", "B").with_skills(["rust", "SQL", "Docker"]),
        ]);
        let matcher = ResourceMatcher::new(&pool, false);
        let candidates = matcher.candidates(&skills(&["Rust", "sql"]));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].resource.id, "b");
        assert_eq!(candidates[0].skill_overlap, 2);
    }

    #[test]
    fn test_empty_requirement_matches_anyone() {
        let pool = ResourcePool::general_only(vec![
            Resource::new("a", "A"),
            Resource::new("b", "B").with_skills(["Design"]),
        ]);
        let matcher = ResourceMatcher::new(&pool, false);
        assert_eq!(matcher.candidates(&[]).len(), 2);
    }

    #[test]
    fn test_explicit_resources_bypass_matching() {
        let pool = ResourcePool::general_only(vec![Resource::new("a", "A").with_skills(["Go"])]);
        let matcher = ResourceMatcher::new(&pool, false);
        let task = Task::new("t", "T")
            .with_skills(["Haskell"])
            .with_required_resources(["external"]);
        assert_eq!(
            matcher.assign(&task),
            Assignment::Explicit(vec!["external".to_string()])
        );
    }

    #[test]
    fn test_no_match_is_unmatched() {
        let pool = ResourcePool::general_only(vec![Resource::new("a", "A").with_skills(["Go"])]);
        let matcher = ResourceMatcher::new(&pool, false);
        let task = Task::new("t", "T").with_skills(["Haskell"]);
        assert_eq!(matcher.assign(&task), Assignment::Unmatched);
        assert!(matcher.assign(&task).resource_ids().is_empty());
    }

    #[test]
    fn test_resource_in_both_pools_counted_once() {
        let shared = Resource::new("shared", "Shared");
        let pool = ResourcePool::new(vec![shared.clone()], vec![shared]);
        let matcher = ResourceMatcher::new(&pool, true);
        let candidates = matcher.candidates(&[]);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].pool, PoolKind::Department);
        assert!(matcher.find("shared").is_some());
    }
}
