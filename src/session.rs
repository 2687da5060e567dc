//! One open project view: service handle, history, reconciled graph and the
//! interaction state around it.
//!
//! User edits go through three steps so the TUI can keep drawing while a call
//! is in flight: [`Session::prepare`] captures what undo will need,
//! [`PendingEdit::run`] talks to the service, and [`Session::settle`] records
//! the confirmed result. [`Session::apply`] does all three in one await.

use std::sync::Arc;

use crate::graph::{GraphReconciler, LayoutSpacing, LinkMode, Reconciled, ViewState, VisualGraph};
use crate::history::{Applied, Direction, History, HistoryError, Operation, Replay, ReplayReport};
use crate::model::{
    CascadeConfig, Dependency, NewTask, Position, ProjectId, ProjectSnapshot, Task, TaskId,
    TaskPatch,
};
use crate::service::{ServiceError, TaskService};

/// Error type for session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    History(#[from] HistoryError),
    #[error("could not {action}: {source}")]
    Edit {
        action: String,
        #[source]
        source: ServiceError,
    },
    #[error("refresh failed: {0}")]
    Refresh(#[source] ServiceError),
    #[error("task {0} is not in the current view")]
    UnknownTask(TaskId),
    #[error("no dependency {0} in the current view")]
    UnknownDependency(Dependency),
}

/// A user-initiated change
#[derive(Debug, Clone, PartialEq)]
pub enum UserEdit {
    CreateTask(NewTask),
    UpdateTask { id: TaskId, patch: TaskPatch },
    DeleteTask(TaskId),
    CreateDependency(Dependency),
    DeleteDependency(Dependency),
    /// End of a drag; sent to the service but never undoable
    MoveTask { id: TaskId, position: Position },
}

/// What the history entry will need once the service confirms the edit
#[derive(Debug, Clone)]
enum Context {
    None,
    Before(Task),
    Deleted {
        task: Task,
        dependencies: Vec<Dependency>,
    },
    Label(String),
}

/// An edit ready to be sent
#[derive(Debug, Clone)]
pub struct PendingEdit {
    project: ProjectId,
    edit: UserEdit,
    context: Context,
}

/// The service's answer to a [`PendingEdit`]
#[derive(Debug)]
pub struct EditOutcome {
    pending: PendingEdit,
    result: Result<Confirmed, ServiceError>,
}

#[derive(Debug)]
enum Confirmed {
    Task(Task),
    Dependency(Dependency),
    Done,
}

impl PendingEdit {
    pub fn edit(&self) -> &UserEdit {
        &self.edit
    }

    /// Short verb phrase for notices ("delete \"Build\"")
    pub fn action(&self) -> String {
        match (&self.edit, &self.context) {
            (UserEdit::CreateTask(req), _) => format!("create \"{}\"", req.title),
            (UserEdit::UpdateTask { .. }, Context::Before(task)) => {
                format!("update \"{}\"", task.title)
            }
            (UserEdit::DeleteTask(_), Context::Deleted { task, .. }) => {
                format!("delete \"{}\"", task.title)
            }
            (UserEdit::CreateDependency(_), Context::Label(label)) => format!("link {}", label),
            (UserEdit::DeleteDependency(_), Context::Label(label)) => {
                format!("unlink {}", label)
            }
            (UserEdit::MoveTask { .. }, _) => "move task".to_string(),
            _ => "apply edit".to_string(),
        }
    }

    /// Send the edit. Holds no session borrow, so it can run in a spawned task.
    pub async fn run(self, service: &dyn TaskService) -> EditOutcome {
        let result = match &self.edit {
            UserEdit::CreateTask(req) => service.create_task(req.clone()).await.map(Confirmed::Task),
            UserEdit::UpdateTask { id, patch } => service
                .update_task(*id, patch.clone())
                .await
                .map(Confirmed::Task),
            UserEdit::MoveTask { id, position } => service
                .update_task(*id, TaskPatch::position(*position))
                .await
                .map(Confirmed::Task),
            UserEdit::DeleteTask(id) => service.delete_task(*id).await.map(|_| Confirmed::Done),
            UserEdit::CreateDependency(dep) => service
                .create_dependency(dep.predecessor_id, dep.successor_id)
                .await
                .map(Confirmed::Dependency),
            UserEdit::DeleteDependency(dep) => service
                .delete_dependency(dep.predecessor_id, dep.successor_id)
                .await
                .map(|_| Confirmed::Done),
        };
        EditOutcome {
            pending: self,
            result,
        }
    }
}

/// State for one viewed project
pub struct Session {
    service: Arc<dyn TaskService>,
    project: ProjectId,
    history: History,
    reconciler: GraphReconciler,
    link: LinkMode,
    view: ViewState,
    snapshot: Option<ProjectSnapshot>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("project", &self.project)
            .field("history", &self.history)
            .field("link", &self.link)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(service: Arc<dyn TaskService>, project: ProjectId, config: &CascadeConfig) -> Self {
        Session {
            service,
            project,
            history: History::new(config.history.cap),
            reconciler: GraphReconciler::new(LayoutSpacing::from(&config.view)),
            link: LinkMode::default(),
            view: ViewState::default(),
            snapshot: None,
        }
    }

    pub fn service(&self) -> Arc<dyn TaskService> {
        Arc::clone(&self.service)
    }

    pub fn project(&self) -> ProjectId {
        self.project
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn graph(&self) -> &VisualGraph {
        self.reconciler.graph()
    }

    pub fn link_mode(&self) -> LinkMode {
        self.link
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn snapshot(&self) -> Option<&ProjectSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.snapshot.as_ref().and_then(|s| s.task(id))
    }

    // -----------------------------------------------------------------------
    // Refresh
    // -----------------------------------------------------------------------

    /// Pull the project from the service and reconcile the view.
    pub async fn refresh(&mut self) -> Result<Reconciled, SessionError> {
        let service = self.service();
        let snapshot = service
            .snapshot(self.project)
            .await
            .map_err(SessionError::Refresh)?;
        Ok(self.apply_snapshot(snapshot))
    }

    /// Reconcile a snapshot fetched elsewhere. Snapshots for another project
    /// (a fetch that raced a project switch) are ignored.
    pub fn apply_snapshot(&mut self, snapshot: ProjectSnapshot) -> Reconciled {
        if snapshot.project_id != self.project {
            tracing::debug!(project = %snapshot.project_id, "stale snapshot ignored");
            return Reconciled {
                kind: crate::graph::ReconcileKind::Patched,
                fit_view: false,
            };
        }
        self.view.critical = snapshot.critical_task_ids.clone();
        if let Some(selected) = self.view.selected
            && snapshot.task(selected).is_none()
        {
            self.view.selected = None;
        }
        if let Some(source) = self.link.source()
            && snapshot.task(source).is_none()
        {
            self.cancel_link();
        }
        let reconciled = self.reconciler.reconcile(&snapshot, &self.view);
        self.snapshot = Some(snapshot);
        reconciled
    }

    /// Re-annotate the current snapshot after a view-state change.
    fn rerender(&mut self) {
        if let Some(snapshot) = &self.snapshot {
            self.reconciler.reconcile(snapshot, &self.view);
        }
    }

    async fn refresh_after_change(&mut self) {
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "refresh after change failed");
        }
    }

    // -----------------------------------------------------------------------
    // View state
    // -----------------------------------------------------------------------

    pub fn select(&mut self, id: Option<TaskId>) {
        self.view.selected = id;
        self.rerender();
    }

    pub fn set_search(&mut self, term: &str) {
        self.view.search = term.to_string();
        self.rerender();
    }

    pub fn start_link(&mut self, source: TaskId) {
        self.link.start(source);
        self.view.link_source = self.link.source();
        self.rerender();
    }

    /// Pick a link target; returns the dependency to create, if any.
    pub fn pick_link(&mut self, target: TaskId) -> Option<Dependency> {
        let dependency = self.link.pick(target);
        self.view.link_source = self.link.source();
        self.rerender();
        dependency
    }

    pub fn cancel_link(&mut self) {
        self.link.cancel();
        self.view.link_source = None;
        self.rerender();
    }

    /// Move a node on screen without telling the service yet.
    pub fn drag_to(&mut self, id: TaskId, position: Position) -> bool {
        self.reconciler.drag_to(id, position)
    }

    /// Finish a drag: the position-only edit to send.
    pub fn commit_drag(&self, id: TaskId) -> Option<UserEdit> {
        let patch = self.reconciler.commit_position(id)?;
        patch
            .position
            .map(|position| UserEdit::MoveTask { id, position })
    }

    // -----------------------------------------------------------------------
    // User edits
    // -----------------------------------------------------------------------

    /// Capture the context the history entry needs before the call goes out.
    pub fn prepare(&self, edit: UserEdit) -> Result<PendingEdit, SessionError> {
        let context = match &edit {
            UserEdit::CreateTask(_) | UserEdit::MoveTask { .. } => Context::None,
            UserEdit::UpdateTask { id, .. } => Context::Before(self.known_task(*id)?.clone()),
            UserEdit::DeleteTask(id) => {
                let task = self.known_task(*id)?.clone();
                let dependencies = self
                    .snapshot
                    .as_ref()
                    .map(|s| s.incident_dependencies(*id))
                    .unwrap_or_default();
                Context::Deleted { task, dependencies }
            }
            UserEdit::CreateDependency(dep) => Context::Label(self.dependency_label(dep)),
            UserEdit::DeleteDependency(dep) => {
                let known = self
                    .snapshot
                    .as_ref()
                    .is_some_and(|s| s.dependencies.contains(dep));
                if !known {
                    return Err(SessionError::UnknownDependency(*dep));
                }
                Context::Label(self.dependency_label(dep))
            }
        };
        Ok(PendingEdit {
            project: self.project,
            edit,
            context,
        })
    }

    /// Record a confirmed edit. Failed edits are reported and never recorded.
    /// Returns the description of the recorded operation, if any.
    pub fn settle(&mut self, outcome: EditOutcome) -> Result<Option<String>, SessionError> {
        let EditOutcome { pending, result } = outcome;
        let confirmed = match result {
            Ok(confirmed) => confirmed,
            Err(source) => {
                let action = pending.action();
                tracing::warn!(%action, error = %source, "edit failed");
                return Err(SessionError::Edit { action, source });
            }
        };
        if pending.project != self.project {
            tracing::debug!("edit confirmed after project switch; not recorded");
            return Ok(None);
        }

        let op = match (pending.edit, pending.context, confirmed) {
            (UserEdit::CreateTask(_), _, Confirmed::Task(task)) => {
                Some(Operation::create_task(task))
            }
            (UserEdit::UpdateTask { patch, .. }, Context::Before(before), _) => {
                Operation::update_task(&before, &patch)
            }
            (UserEdit::DeleteTask(_), Context::Deleted { task, dependencies }, _) => {
                Some(Operation::delete_task(task, dependencies))
            }
            (UserEdit::CreateDependency(_), Context::Label(label), Confirmed::Dependency(dep)) => {
                Some(Operation::create_dependency(dep, &label))
            }
            (UserEdit::DeleteDependency(dep), Context::Label(label), _) => {
                Some(Operation::delete_dependency(dep, &label))
            }
            _ => None,
        };

        Ok(op.and_then(|op| {
            let description = op.description.clone();
            self.history.record(op).then_some(description)
        }))
    }

    /// Prepare, send and record an edit, then refresh.
    pub async fn apply(&mut self, edit: UserEdit) -> Result<Option<String>, SessionError> {
        let pending = self.prepare(edit)?;
        let service = self.service();
        let outcome = pending.run(service.as_ref()).await;
        let recorded = self.settle(outcome)?;
        self.refresh_after_change().await;
        Ok(recorded)
    }

    // -----------------------------------------------------------------------
    // Undo / redo
    // -----------------------------------------------------------------------

    pub fn begin_replay(&mut self, direction: Direction) -> Result<Replay, SessionError> {
        Ok(self.history.begin(direction)?)
    }

    pub fn finish_replay(
        &mut self,
        replay: Replay,
        result: Result<Applied, ServiceError>,
    ) -> Result<ReplayReport, SessionError> {
        Ok(self.history.finish(replay, result)?)
    }

    pub async fn undo(&mut self) -> Result<ReplayReport, SessionError> {
        self.replay(Direction::Undo).await
    }

    pub async fn redo(&mut self) -> Result<ReplayReport, SessionError> {
        self.replay(Direction::Redo).await
    }

    async fn replay(&mut self, direction: Direction) -> Result<ReplayReport, SessionError> {
        let service = self.service();
        let report = match direction {
            Direction::Undo => self.history.undo(service.as_ref()).await?,
            Direction::Redo => self.history.redo(service.as_ref()).await?,
        };
        self.refresh_after_change().await;
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Point the session at another project. History, the reconciled graph
    /// and all view state are dropped so nothing leaks across projects.
    pub fn switch_project(&mut self, project: ProjectId) {
        tracing::info!(from = %self.project, to = %project, "switching project");
        self.project = project;
        self.history.clear();
        self.reconciler.reset();
        self.link.cancel();
        self.view = ViewState::default();
        self.snapshot = None;
    }

    fn known_task(&self, id: TaskId) -> Result<&Task, SessionError> {
        self.task(id).ok_or(SessionError::UnknownTask(id))
    }

    fn dependency_label(&self, dep: &Dependency) -> String {
        let name = |id: TaskId| {
            self.task(id)
                .map(|t| t.title.clone())
                .unwrap_or_else(|| id.to_string()[..8].to_string())
        };
        format!("{} → {}", name(dep.predecessor_id), name(dep.successor_id))
    }
}
