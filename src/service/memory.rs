use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use chrono::{Local, NaiveDate, Utc};
use indexmap::{IndexMap, IndexSet};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::model::{Dependency, NewTask, ProjectId, ProjectSnapshot, Task, TaskId, TaskPatch};

use super::{ServiceError, TaskService};

#[derive(Debug, Default)]
struct State {
    projects: IndexMap<ProjectId, String>,
    tasks: IndexMap<TaskId, Task>,
    dependencies: IndexSet<Dependency>,
    critical: HashMap<ProjectId, HashSet<TaskId>>,
    /// Queued failures, consumed one per mutation
    failures: VecDeque<String>,
    mutations: usize,
}

/// In-process scheduling backend. Validates edits the way the remote service
/// does, so the client can run offline and tests can drive it.
#[derive(Debug, Default)]
pub struct MemoryService {
    state: Mutex<State>,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_project(&self, name: impl Into<String>) -> ProjectId {
        let id = ProjectId::new();
        self.state.lock().await.projects.insert(id, name.into());
        id
    }

    /// Make the next mutation fail with `ServiceError::Injected`.
    pub async fn fail_next(&self, reason: impl Into<String>) {
        self.state.lock().await.failures.push_back(reason.into());
    }

    /// Replace the critical set reported for a project.
    pub async fn set_critical(&self, project: ProjectId, ids: impl IntoIterator<Item = TaskId>) {
        self.state
            .lock()
            .await
            .critical
            .insert(project, ids.into_iter().collect());
    }

    pub async fn task(&self, id: TaskId) -> Option<Task> {
        self.state.lock().await.tasks.get(&id).cloned()
    }

    pub async fn task_count(&self) -> usize {
        self.state.lock().await.tasks.len()
    }

    pub async fn has_dependency(&self, predecessor: TaskId, successor: TaskId) -> bool {
        self.state
            .lock()
            .await
            .dependencies
            .contains(&Dependency::new(predecessor, successor))
    }

    /// Number of mutations that reached the backend (failed ones included)
    pub async fn mutation_count(&self) -> usize {
        self.state.lock().await.mutations
    }

    /// A small three-task project for offline use.
    pub async fn seeded(start: NaiveDate) -> (Self, ProjectId) {
        let service = MemoryService::new();
        let project = service.add_project("Demo").await;
        let mut ids = Vec::new();
        for (title, days) in [("Design", 3), ("Build", 5), ("Ship", 0)] {
            let mut req = NewTask::new(project, title);
            req.duration_days = days;
            req.start_date = Some(start);
            if let Ok(task) = service.create_task(req).await {
                ids.push(task.id);
            }
        }
        for pair in ids.windows(2) {
            let _ = service.create_dependency(pair[0], pair[1]).await;
        }
        service.set_critical(project, ids).await;
        (service, project)
    }
}

impl State {
    fn begin_mutation(&mut self) -> Result<(), ServiceError> {
        self.mutations += 1;
        match self.failures.pop_front() {
            Some(reason) => Err(ServiceError::Injected(reason)),
            None => Ok(()),
        }
    }

    fn task_mut(&mut self, id: TaskId) -> Result<&mut Task, ServiceError> {
        self.tasks
            .get_mut(&id)
            .ok_or_else(|| ServiceError::task_not_found(id))
    }

    /// Would `predecessor -> successor` close a loop? True if `predecessor`
    /// is already reachable from `successor`.
    fn creates_cycle(&self, predecessor: TaskId, successor: TaskId) -> bool {
        let mut stack = vec![successor];
        let mut seen = HashSet::new();
        while let Some(node) = stack.pop() {
            if node == predecessor {
                return true;
            }
            if !seen.insert(node) {
                continue;
            }
            stack.extend(
                self.dependencies
                    .iter()
                    .filter(|d| d.predecessor_id == node)
                    .map(|d| d.successor_id),
            );
        }
        false
    }
}

fn stamp(task: &mut Task) {
    task.end_date = Some(task.expected_end_date());
    task.calc_version_id = Some(Uuid::new_v4());
}

#[async_trait]
impl TaskService for MemoryService {
    async fn create_task(&self, req: NewTask) -> Result<Task, ServiceError> {
        let mut state = self.state.lock().await;
        state.begin_mutation()?;
        if !state.projects.contains_key(&req.project_id) {
            return Err(ServiceError::NotFound {
                resource: "project",
                id: req.project_id.to_string(),
            });
        }
        let id = req.id.unwrap_or_default();
        if state.tasks.contains_key(&id) {
            return Err(ServiceError::rejected(
                "conflict",
                format!("a task with ID {} already exists", id),
            ));
        }
        let mut task = Task {
            id,
            title: req.title,
            description: req.description,
            duration_days: req.duration_days,
            start_date: req.start_date.unwrap_or_else(|| Local::now().date_naive()),
            end_date: None,
            project_id: req.project_id,
            position: req.position,
            calc_version_id: None,
        };
        stamp(&mut task);
        state.tasks.insert(id, task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> Result<Task, ServiceError> {
        let mut state = self.state.lock().await;
        state.begin_mutation()?;
        let task = state.task_mut(id)?;
        patch.apply_to(task);
        // Moving a node is not a schedule change
        if !patch.is_position_only() {
            stamp(task);
        }
        Ok(task.clone())
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), ServiceError> {
        let mut state = self.state.lock().await;
        state.begin_mutation()?;
        if state.tasks.shift_remove(&id).is_none() {
            return Err(ServiceError::task_not_found(id));
        }
        state.dependencies.retain(|d| !d.touches(id));
        for critical in state.critical.values_mut() {
            critical.remove(&id);
        }
        Ok(())
    }

    async fn create_dependency(
        &self,
        predecessor: TaskId,
        successor: TaskId,
    ) -> Result<Dependency, ServiceError> {
        let mut state = self.state.lock().await;
        state.begin_mutation()?;
        let pred_project = state
            .tasks
            .get(&predecessor)
            .map(|t| t.project_id)
            .ok_or_else(|| ServiceError::task_not_found(predecessor))?;
        let succ_project = state
            .tasks
            .get(&successor)
            .map(|t| t.project_id)
            .ok_or_else(|| ServiceError::task_not_found(successor))?;
        if pred_project != succ_project {
            return Err(ServiceError::rejected(
                "cross_project_dependency",
                "Cannot create dependency between tasks in different projects",
            ));
        }
        let dependency = Dependency::new(predecessor, successor);
        if state.dependencies.contains(&dependency) {
            return Err(ServiceError::rejected(
                "duplicate_dependency",
                "This dependency already exists",
            ));
        }
        if predecessor == successor {
            return Err(ServiceError::rejected(
                "self_dependency",
                "A task cannot depend on itself",
            ));
        }
        if state.creates_cycle(predecessor, successor) {
            return Err(ServiceError::rejected(
                "cycle_detected",
                "Adding this dependency would create a cycle in the task graph",
            ));
        }
        state.dependencies.insert(dependency);
        stamp(state.task_mut(successor)?);
        Ok(dependency)
    }

    async fn delete_dependency(
        &self,
        predecessor: TaskId,
        successor: TaskId,
    ) -> Result<(), ServiceError> {
        let mut state = self.state.lock().await;
        state.begin_mutation()?;
        let dependency = Dependency::new(predecessor, successor);
        if !state.dependencies.shift_remove(&dependency) {
            return Err(ServiceError::NotFound {
                resource: "dependency",
                id: dependency.to_string(),
            });
        }
        if let Ok(task) = state.task_mut(successor) {
            stamp(task);
        }
        Ok(())
    }

    async fn snapshot(&self, project: ProjectId) -> Result<ProjectSnapshot, ServiceError> {
        let state = self.state.lock().await;
        if !state.projects.contains_key(&project) {
            return Err(ServiceError::NotFound {
                resource: "project",
                id: project.to_string(),
            });
        }
        let tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| t.project_id == project)
            .cloned()
            .collect();
        let ids: HashSet<TaskId> = tasks.iter().map(|t| t.id).collect();
        let dependencies = state
            .dependencies
            .iter()
            .filter(|d| ids.contains(&d.predecessor_id))
            .copied()
            .collect();
        let critical_task_ids: HashSet<TaskId> = state
            .critical
            .get(&project)
            .map(|set| set.intersection(&ids).copied().collect())
            .unwrap_or_default();
        // Critical tasks have no float by definition; others are not analysed here
        let slack = critical_task_ids.iter().map(|id| (*id, 0)).collect();
        Ok(ProjectSnapshot {
            project_id: project,
            tasks,
            dependencies,
            critical_task_ids,
            slack,
            fetched_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Position;
    use pretty_assertions::assert_eq;

    async fn service_with_two_tasks() -> (MemoryService, ProjectId, TaskId, TaskId) {
        let service = MemoryService::new();
        let project = service.add_project("Test").await;
        let a = service.create_task(NewTask::new(project, "A")).await.unwrap();
        let b = service.create_task(NewTask::new(project, "B")).await.unwrap();
        (service, project, a.id, b.id)
    }

    #[tokio::test]
    async fn create_honors_caller_assigned_id() {
        let service = MemoryService::new();
        let project = service.add_project("Test").await;
        let id = TaskId::new();
        let mut req = NewTask::new(project, "Pinned");
        req.id = Some(id);
        let task = service.create_task(req.clone()).await.unwrap();
        assert_eq!(task.id, id);

        let err = service.create_task(req).await.unwrap_err();
        assert_eq!(err.code(), Some("conflict"));
    }

    #[tokio::test]
    async fn create_in_unknown_project_is_not_found() {
        let service = MemoryService::new();
        let err = service
            .create_task(NewTask::new(ProjectId::new(), "Orphan"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { resource: "project", .. }));
    }

    #[tokio::test]
    async fn dependency_validation() {
        let (service, _, a, b) = service_with_two_tasks().await;
        service.create_dependency(a, b).await.unwrap();

        let dup = service.create_dependency(a, b).await.unwrap_err();
        assert_eq!(dup.code(), Some("duplicate_dependency"));

        let own = service.create_dependency(a, a).await.unwrap_err();
        assert_eq!(own.code(), Some("self_dependency"));

        let cycle = service.create_dependency(b, a).await.unwrap_err();
        assert_eq!(cycle.code(), Some("cycle_detected"));
    }

    #[tokio::test]
    async fn cross_project_dependency_is_rejected() {
        let (service, _, a, _) = service_with_two_tasks().await;
        let other = service.add_project("Other").await;
        let c = service.create_task(NewTask::new(other, "C")).await.unwrap();
        let err = service.create_dependency(a, c.id).await.unwrap_err();
        assert_eq!(err.code(), Some("cross_project_dependency"));
    }

    #[tokio::test]
    async fn delete_task_removes_incident_dependencies() {
        let (service, project, a, b) = service_with_two_tasks().await;
        service.create_dependency(a, b).await.unwrap();
        service.delete_task(a).await.unwrap();

        let snap = service.snapshot(project).await.unwrap();
        assert_eq!(snap.tasks.len(), 1);
        assert!(snap.dependencies.is_empty());
    }

    #[tokio::test]
    async fn edits_bump_calc_version_but_drags_do_not() {
        let (service, _, a, _) = service_with_two_tasks().await;
        let before = service.task(a).await.unwrap().calc_version_id;

        let moved = service
            .update_task(a, TaskPatch::position(Position::new(5.0, 5.0)))
            .await
            .unwrap();
        assert_eq!(moved.calc_version_id, before);

        let renamed = service.update_task(a, TaskPatch::title("A2")).await.unwrap();
        assert_ne!(renamed.calc_version_id, before);
    }

    #[tokio::test]
    async fn injected_failure_is_consumed_once() {
        let (service, _, a, _) = service_with_two_tasks().await;
        service.fail_next("offline").await;
        let err = service.update_task(a, TaskPatch::title("x")).await.unwrap_err();
        assert_eq!(err, ServiceError::Injected("offline".into()));
        assert!(service.update_task(a, TaskPatch::title("x")).await.is_ok());
    }

    #[tokio::test]
    async fn snapshot_reports_critical_tasks_of_project() {
        let (service, project, a, b) = service_with_two_tasks().await;
        service.set_critical(project, [a]).await;
        let snap = service.snapshot(project).await.unwrap();
        assert!(snap.critical_task_ids.contains(&a));
        assert!(!snap.critical_task_ids.contains(&b));
        assert_eq!(snap.slack.get(&a), Some(&0));
        assert_eq!(snap.slack.get(&b), None);
    }

    #[tokio::test]
    async fn seeded_project_is_a_chain() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let (service, project) = MemoryService::seeded(start).await;
        let snap = service.snapshot(project).await.unwrap();
        assert_eq!(snap.tasks.len(), 3);
        assert_eq!(snap.dependencies.len(), 2);
        assert_eq!(snap.critical_task_ids.len(), 3);
    }
}
