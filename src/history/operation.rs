use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::{Dependency, NewTask, Task, TaskId, TaskPatch};

/// Kind tag for an operation (for display and filtering)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    CreateTask,
    UpdateTask,
    DeleteTask,
    CreateDependency,
    DeleteDependency,
}

/// The undo/redo payloads of an operation, one variant per kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    /// Undo deletes the task; redo recreates it from the snapshot.
    CreateTask { task: Task },
    /// `before`/`after` carry only the changed fields.
    UpdateTask {
        task_id: TaskId,
        before: TaskPatch,
        after: TaskPatch,
    },
    /// Undo restores the task under the same id, then its edges.
    DeleteTask {
        task: Task,
        /// Edges incident to the task at delete time
        dependencies: Vec<Dependency>,
    },
    CreateDependency { dependency: Dependency },
    DeleteDependency { dependency: Dependency },
}

/// A service call needed to apply one side of an operation
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreateTask(NewTask),
    /// Recreate a task, then the listed edges
    RestoreTask {
        task: NewTask,
        dependencies: Vec<Dependency>,
    },
    UpdateTask { task_id: TaskId, patch: TaskPatch },
    DeleteTask(TaskId),
    CreateDependency(Dependency),
    DeleteDependency(Dependency),
}

/// A single undoable edit, recorded once the service confirmed it
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub id: Uuid,
    pub edit: Edit,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

impl Operation {
    pub fn new(edit: Edit, description: impl Into<String>) -> Self {
        Operation {
            id: Uuid::new_v4(),
            edit,
            description: description.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn create_task(task: Task) -> Self {
        let description = format!("Create \"{}\"", task.title);
        Self::new(Edit::CreateTask { task }, description)
    }

    /// `before` is the task as it was before the update. Returns `None` for
    /// drags and for patches that change nothing: those are never undoable.
    pub fn update_task(before: &Task, patch: &TaskPatch) -> Option<Self> {
        let after = patch.clone().without_noop_fields(before);
        if after.is_empty() || after.is_position_only() {
            return None;
        }
        let fields: Vec<&str> = after
            .changed_fields()
            .into_iter()
            .map(|f| f.label())
            .collect();
        let description = format!("Edit {} of \"{}\"", fields.join(", "), before.title);
        Some(Self::new(
            Edit::UpdateTask {
                task_id: before.id,
                before: after.inverse_for(before),
                after,
            },
            description,
        ))
    }

    pub fn delete_task(task: Task, dependencies: Vec<Dependency>) -> Self {
        let description = format!("Delete \"{}\"", task.title);
        Self::new(Edit::DeleteTask { task, dependencies }, description)
    }

    pub fn create_dependency(dependency: Dependency, label: &str) -> Self {
        Self::new(Edit::CreateDependency { dependency }, format!("Link {}", label))
    }

    pub fn delete_dependency(dependency: Dependency, label: &str) -> Self {
        Self::new(Edit::DeleteDependency { dependency }, format!("Unlink {}", label))
    }

    pub fn kind(&self) -> OpKind {
        match self.edit {
            Edit::CreateTask { .. } => OpKind::CreateTask,
            Edit::UpdateTask { .. } => OpKind::UpdateTask,
            Edit::DeleteTask { .. } => OpKind::DeleteTask,
            Edit::CreateDependency { .. } => OpKind::CreateDependency,
            Edit::DeleteDependency { .. } => OpKind::DeleteDependency,
        }
    }

    /// Drag-only updates never belong in the history.
    pub fn is_position_only(&self) -> bool {
        matches!(&self.edit, Edit::UpdateTask { after, .. } if after.is_position_only())
    }

    /// The call that reverses this operation
    pub fn inverse(&self) -> Mutation {
        match &self.edit {
            Edit::CreateTask { task } => Mutation::DeleteTask(task.id),
            Edit::UpdateTask {
                task_id, before, ..
            } => Mutation::UpdateTask {
                task_id: *task_id,
                patch: before.clone(),
            },
            Edit::DeleteTask { task, dependencies } => Mutation::RestoreTask {
                task: NewTask::from_snapshot(task),
                dependencies: dependencies.clone(),
            },
            Edit::CreateDependency { dependency } => Mutation::DeleteDependency(*dependency),
            Edit::DeleteDependency { dependency } => Mutation::CreateDependency(*dependency),
        }
    }

    /// The call that re-applies this operation
    pub fn forward(&self) -> Mutation {
        match &self.edit {
            Edit::CreateTask { task } => Mutation::CreateTask(NewTask::from_snapshot(task)),
            Edit::UpdateTask { task_id, after, .. } => Mutation::UpdateTask {
                task_id: *task_id,
                patch: after.clone(),
            },
            Edit::DeleteTask { task, .. } => Mutation::DeleteTask(task.id),
            Edit::CreateDependency { dependency } => Mutation::CreateDependency(*dependency),
            Edit::DeleteDependency { dependency } => Mutation::DeleteDependency(*dependency),
        }
    }

    /// Does this operation refer to `id` anywhere in its payloads?
    pub fn references(&self, id: TaskId) -> bool {
        match &self.edit {
            Edit::CreateTask { task } => task.id == id,
            Edit::UpdateTask { task_id, .. } => *task_id == id,
            Edit::DeleteTask { task, dependencies } => {
                task.id == id || dependencies.iter().any(|d| d.touches(id))
            }
            Edit::CreateDependency { dependency } | Edit::DeleteDependency { dependency } => {
                dependency.touches(id)
            }
        }
    }

    /// Rewrite every reference to `old` as `new` (after a recreate that was
    /// assigned a different id).
    pub fn rekey(&mut self, old: TaskId, new: TaskId) {
        let swap = |id: &mut TaskId| {
            if *id == old {
                *id = new;
            }
        };
        match &mut self.edit {
            Edit::CreateTask { task } => swap(&mut task.id),
            Edit::UpdateTask { task_id, .. } => swap(task_id),
            Edit::DeleteTask { task, dependencies } => {
                swap(&mut task.id);
                for dep in dependencies {
                    swap(&mut dep.predecessor_id);
                    swap(&mut dep.successor_id);
                }
            }
            Edit::CreateDependency { dependency } | Edit::DeleteDependency { dependency } => {
                swap(&mut dependency.predecessor_id);
                swap(&mut dependency.successor_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Position, ProjectId};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn task(title: &str) -> Task {
        Task::new(
            ProjectId::new(),
            title,
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
        )
    }

    #[test]
    fn title_update_is_recorded_with_before_and_after() {
        let t = task("Draft");
        let op = Operation::update_task(&t, &TaskPatch::title("Final")).unwrap();
        assert_eq!(op.kind(), OpKind::UpdateTask);
        assert_eq!(op.description, "Edit title of \"Draft\"");
        assert_eq!(
            op.inverse(),
            Mutation::UpdateTask {
                task_id: t.id,
                patch: TaskPatch::title("Draft"),
            }
        );
        assert_eq!(
            op.forward(),
            Mutation::UpdateTask {
                task_id: t.id,
                patch: TaskPatch::title("Final"),
            }
        );
    }

    #[test]
    fn drag_is_not_an_operation() {
        let t = task("Draft");
        let drag = TaskPatch::position(Position::new(40.0, 80.0));
        assert!(Operation::update_task(&t, &drag).is_none());
    }

    #[test]
    fn noop_update_is_not_an_operation() {
        let t = task("Draft");
        assert!(Operation::update_task(&t, &TaskPatch::title("Draft")).is_none());
    }

    #[test]
    fn create_task_inverse_deletes_and_forward_keeps_id() {
        let t = task("A");
        let op = Operation::create_task(t.clone());
        assert_eq!(op.inverse(), Mutation::DeleteTask(t.id));
        match op.forward() {
            Mutation::CreateTask(req) => assert_eq!(req.id, Some(t.id)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn delete_task_inverse_restores_edges() {
        let a = task("A");
        let b = task("B");
        let dep = Dependency::new(a.id, b.id);
        let op = Operation::delete_task(a.clone(), vec![dep]);
        match op.inverse() {
            Mutation::RestoreTask { task, dependencies } => {
                assert_eq!(task.id, Some(a.id));
                assert_eq!(dependencies, vec![dep]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(op.forward(), Mutation::DeleteTask(a.id));
    }

    #[test]
    fn dependency_inverses_mirror() {
        let dep = Dependency::new(TaskId::new(), TaskId::new());
        let create = Operation::create_dependency(dep, "A → B");
        assert_eq!(create.inverse(), Mutation::DeleteDependency(dep));
        assert_eq!(create.forward(), Mutation::CreateDependency(dep));
        let delete = Operation::delete_dependency(dep, "A → B");
        assert_eq!(delete.inverse(), Mutation::CreateDependency(dep));
        assert_eq!(delete.description, "Unlink A → B");
    }

    #[test]
    fn rekey_rewrites_all_references() {
        let a = task("A");
        let b = task("B");
        let new_id = TaskId::new();
        let mut op = Operation::delete_task(b.clone(), vec![Dependency::new(a.id, b.id)]);
        op.rekey(b.id, new_id);
        assert!(op.references(new_id));
        assert!(!op.references(b.id));
        assert!(op.references(a.id));
    }
}
