use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use super::dependency::Dependency;
use super::task::{ProjectId, Task, TaskId};

/// One delivery of the refresh feed: the authoritative state of a project.
#[derive(Debug, Clone)]
pub struct ProjectSnapshot {
    pub project_id: ProjectId,
    pub tasks: Vec<Task>,
    pub dependencies: Vec<Dependency>,
    /// Tasks with zero slack, as computed by the scheduler
    pub critical_task_ids: HashSet<TaskId>,
    /// Total slack in days, for tasks the scheduler analysed
    pub slack: HashMap<TaskId, i64>,
    pub fetched_at: DateTime<Utc>,
}

impl ProjectSnapshot {
    pub fn new(project_id: ProjectId, tasks: Vec<Task>, dependencies: Vec<Dependency>) -> Self {
        ProjectSnapshot {
            project_id,
            tasks,
            dependencies,
            critical_task_ids: HashSet::new(),
            slack: HashMap::new(),
            fetched_at: Utc::now(),
        }
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn task_ids(&self) -> HashSet<TaskId> {
        self.tasks.iter().map(|t| t.id).collect()
    }

    /// Dependencies where `id` is on either end
    pub fn incident_dependencies(&self, id: TaskId) -> Vec<Dependency> {
        self.dependencies
            .iter()
            .filter(|d| d.touches(id))
            .copied()
            .collect()
    }
}
