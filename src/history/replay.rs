use crate::model::{Dependency, TaskId};
use crate::service::{ServiceError, TaskService};

use super::operation::Mutation;

/// What the service reported back after a mutation was applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Applied {
    /// `(requested, assigned)` when a recreated task came back under a new id
    pub rekeyed: Option<(TaskId, TaskId)>,
    /// Edges that could not be restored alongside their task
    pub skipped_dependencies: Vec<Dependency>,
}

/// Send one mutation to the service. Nothing here records history: callers
/// replaying an operation go through this path only.
pub async fn dispatch<S>(service: &S, mutation: Mutation) -> Result<Applied, ServiceError>
where
    S: TaskService + ?Sized,
{
    match mutation {
        Mutation::CreateTask(req) => {
            let requested = req.id;
            let task = service.create_task(req).await?;
            Ok(Applied {
                rekeyed: rekey_pair(requested, task.id),
                ..Default::default()
            })
        }
        Mutation::RestoreTask { task, dependencies } => {
            let requested = task.id;
            let created = service.create_task(task).await?;
            let rekeyed = rekey_pair(requested, created.id);
            let mut skipped = Vec::new();
            for dep in dependencies {
                let dep = match rekeyed {
                    Some((old, new)) => remap(dep, old, new),
                    None => dep,
                };
                // The other end may have been deleted since; the task itself is back.
                if let Err(e) = service
                    .create_dependency(dep.predecessor_id, dep.successor_id)
                    .await
                {
                    tracing::warn!(dependency = %dep, error = %e, "could not restore dependency");
                    skipped.push(dep);
                }
            }
            Ok(Applied {
                rekeyed,
                skipped_dependencies: skipped,
            })
        }
        Mutation::UpdateTask { task_id, patch } => {
            service.update_task(task_id, patch).await?;
            Ok(Applied::default())
        }
        Mutation::DeleteTask(id) => {
            service.delete_task(id).await?;
            Ok(Applied::default())
        }
        Mutation::CreateDependency(dep) => {
            service
                .create_dependency(dep.predecessor_id, dep.successor_id)
                .await?;
            Ok(Applied::default())
        }
        Mutation::DeleteDependency(dep) => {
            service
                .delete_dependency(dep.predecessor_id, dep.successor_id)
                .await?;
            Ok(Applied::default())
        }
    }
}

fn rekey_pair(requested: Option<TaskId>, assigned: TaskId) -> Option<(TaskId, TaskId)> {
    requested.filter(|id| *id != assigned).map(|id| (id, assigned))
}

fn remap(dep: Dependency, old: TaskId, new: TaskId) -> Dependency {
    let swap = |id: TaskId| if id == old { new } else { id };
    Dependency::new(swap(dep.predecessor_id), swap(dep.successor_id))
}
