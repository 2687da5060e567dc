use std::collections::VecDeque;
use std::fmt;

use crate::model::TaskId;
use crate::service::{ServiceError, TaskService};

use super::operation::{Mutation, OpKind, Operation};
use super::replay::{Applied, dispatch};

pub const DEFAULT_HISTORY_CAP: usize = 50;

/// Which stack a replay pops from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Undo,
    Redo,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Undo => f.write_str("undo"),
            Direction::Redo => f.write_str("redo"),
        }
    }
}

/// Error type for undo/redo
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,
    #[error("an undo or redo is already in progress")]
    Busy,
    /// The history was cleared (project switch) while the replay was in flight
    #[error("history was reset while \"{0}\" was being replayed")]
    Stale(String),
    #[error("could not {direction} \"{description}\": {source}")]
    Replay {
        direction: Direction,
        description: String,
        #[source]
        source: ServiceError,
    },
}

impl HistoryError {
    /// Empty-stack conditions are informational, not failures.
    pub fn is_empty_stack(&self) -> bool {
        matches!(self, HistoryError::NothingToUndo | HistoryError::NothingToRedo)
    }
}

/// An operation popped for replay. Must be handed back to [`History::finish`].
#[derive(Debug)]
#[must_use = "a replay must be finished or the operation is lost"]
pub struct Replay {
    op: Operation,
    direction: Direction,
    /// `History::records` when the replay began
    records_at_begin: u64,
    generation: u64,
}

impl Replay {
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn operation(&self) -> &Operation {
        &self.op
    }

    /// The service call this replay needs
    pub fn mutation(&self) -> Mutation {
        match self.direction {
            Direction::Undo => self.op.inverse(),
            Direction::Redo => self.op.forward(),
        }
    }
}

/// Outcome of a successful undo or redo
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayReport {
    pub direction: Direction,
    pub kind: OpKind,
    pub description: String,
    pub applied: Applied,
}

/// Linear undo/redo history over confirmed edits.
///
/// Undo and redo are split into [`begin`](History::begin) (pop, synchronous)
/// and [`finish`](History::finish) (push to the destination stack once the
/// service answered). Only one replay may be in flight at a time.
#[derive(Debug)]
pub struct History {
    undo: VecDeque<Operation>,
    redo: Vec<Operation>,
    cap: usize,
    replaying: bool,
    /// Count of `record` calls, used to detect edits made during a replay
    records: u64,
    /// Bumped by `clear`; replays from an older generation are dropped
    generation: u64,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}

impl History {
    pub fn new(cap: usize) -> Self {
        History {
            undo: VecDeque::new(),
            redo: Vec::new(),
            cap,
            replaying: false,
            records: 0,
            generation: 0,
        }
    }

    /// Record a confirmed user edit. Clears the redo stack. Drag-only updates
    /// are rejected; returns whether the operation was kept.
    pub fn record(&mut self, op: Operation) -> bool {
        if op.is_position_only() {
            tracing::debug!(op = %op.description, "position-only update not recorded");
            return false;
        }
        tracing::info!(op = %op.description, kind = ?op.kind(), "recorded");
        self.push_undo(op);
        self.redo.clear();
        self.records += 1;
        true
    }

    /// Pop the operation to replay. Fails without touching either stack when
    /// the stack is empty or another replay is still in flight.
    pub fn begin(&mut self, direction: Direction) -> Result<Replay, HistoryError> {
        if self.replaying {
            return Err(HistoryError::Busy);
        }
        let op = match direction {
            Direction::Undo => self.undo.pop_back().ok_or(HistoryError::NothingToUndo)?,
            Direction::Redo => self.redo.pop().ok_or(HistoryError::NothingToRedo)?,
        };
        self.replaying = true;
        Ok(Replay {
            op,
            direction,
            records_at_begin: self.records,
            generation: self.generation,
        })
    }

    /// Settle a replay with the service's answer. On failure the operation goes
    /// back where it came from, so the user can retry.
    pub fn finish(
        &mut self,
        replay: Replay,
        result: Result<Applied, ServiceError>,
    ) -> Result<ReplayReport, HistoryError> {
        let Replay {
            mut op,
            direction,
            records_at_begin,
            generation,
        } = replay;

        if generation != self.generation {
            tracing::debug!(op = %op.description, "replay finished after reset; dropped");
            return Err(HistoryError::Stale(op.description));
        }
        self.replaying = false;
        let recorded_since = (self.records - records_at_begin) as usize;

        match result {
            Ok(applied) => {
                if let Some((old, new)) = applied.rekeyed {
                    op.rekey(old, new);
                    self.rekey(old, new);
                }
                let report = ReplayReport {
                    direction,
                    kind: op.kind(),
                    description: op.description.clone(),
                    applied,
                };
                match direction {
                    // A newer edit landed meanwhile and already cleared redo
                    Direction::Undo if recorded_since > 0 => {
                        tracing::debug!(op = %op.description, "undone under a newer edit; not redoable");
                    }
                    Direction::Undo => self.redo.push(op),
                    Direction::Redo => self.push_undo(op),
                }
                tracing::info!(op = %report.description, %direction, "replayed");
                Ok(report)
            }
            Err(source) => {
                tracing::warn!(op = %op.description, %direction, error = %source, "replay failed");
                let description = op.description.clone();
                match direction {
                    Direction::Undo => {
                        // Back under any edits recorded while it was in flight
                        let idx = self.undo.len().saturating_sub(recorded_since);
                        self.undo.insert(idx, op);
                        self.trim();
                    }
                    Direction::Redo if recorded_since == 0 => self.redo.push(op),
                    Direction::Redo => {}
                }
                Err(HistoryError::Replay {
                    direction,
                    description,
                    source,
                })
            }
        }
    }

    /// Undo the newest operation against `service`.
    pub async fn undo<S>(&mut self, service: &S) -> Result<ReplayReport, HistoryError>
    where
        S: TaskService + ?Sized,
    {
        self.replay(Direction::Undo, service).await
    }

    /// Re-apply the most recently undone operation against `service`.
    pub async fn redo<S>(&mut self, service: &S) -> Result<ReplayReport, HistoryError>
    where
        S: TaskService + ?Sized,
    {
        self.replay(Direction::Redo, service).await
    }

    async fn replay<S>(
        &mut self,
        direction: Direction,
        service: &S,
    ) -> Result<ReplayReport, HistoryError>
    where
        S: TaskService + ?Sized,
    {
        let replay = self.begin(direction)?;
        let result = dispatch(service, replay.mutation()).await;
        self.finish(replay, result)
    }

    /// Drop both stacks (project or identity switch). An in-flight replay
    /// will be discarded when it finishes.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.replaying = false;
        self.generation += 1;
    }

    /// Rewrite references to a task that was recreated under a new id.
    pub fn rekey(&mut self, old: TaskId, new: TaskId) {
        for op in self.undo.iter_mut().chain(self.redo.iter_mut()) {
            op.rekey(old, new);
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn is_replaying(&self) -> bool {
        self.replaying
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Peek at the operation the next undo would reverse
    pub fn peek_undo(&self) -> Option<&Operation> {
        self.undo.back()
    }

    /// Peek at the operation the next redo would re-apply
    pub fn peek_redo(&self) -> Option<&Operation> {
        self.redo.last()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.peek_undo().map(|op| op.description.as_str())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.peek_redo().map(|op| op.description.as_str())
    }

    /// Undo stack, newest first
    pub fn undo_iter(&self) -> impl Iterator<Item = &Operation> {
        self.undo.iter().rev()
    }

    fn push_undo(&mut self, op: Operation) {
        self.undo.push_back(op);
        self.trim();
    }

    fn trim(&mut self) {
        while self.undo.len() > self.cap {
            if let Some(evicted) = self.undo.pop_front() {
                tracing::debug!(op = %evicted.description, "evicted from history");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dependency, NewTask, Position, ProjectId, Task, TaskPatch};
    use crate::service::MemoryService;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn task(title: &str) -> Task {
        Task::new(
            ProjectId::new(),
            title,
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
        )
    }

    fn titled_op(title: &str) -> Operation {
        Operation::create_task(task(title))
    }

    // -----------------------------------------------------------------------
    // Recording
    // -----------------------------------------------------------------------

    #[test]
    fn record_clears_redo() {
        let mut history = History::new(10);
        history.record(titled_op("A"));
        let replay = history.begin(Direction::Undo).unwrap();
        history.finish(replay, Ok(Applied::default())).unwrap();
        assert!(history.can_redo());

        history.record(titled_op("B"));
        assert!(!history.can_redo());
        assert_eq!(history.undo_description(), Some("Create \"B\""));
    }

    #[test]
    fn cap_evicts_oldest_first() {
        let mut history = History::new(3);
        for title in ["A", "B", "C", "D", "E"] {
            history.record(titled_op(title));
        }
        assert_eq!(history.undo_len(), 3);
        let titles: Vec<&str> = history
            .undo_iter()
            .map(|op| op.description.as_str())
            .collect();
        assert_eq!(titles, vec!["Create \"E\"", "Create \"D\"", "Create \"C\""]);
    }

    #[test]
    fn position_only_update_is_rejected_at_record_time() {
        let mut history = History::new(10);
        let t = task("A");
        let drag = Operation::new(
            crate::history::Edit::UpdateTask {
                task_id: t.id,
                before: TaskPatch::position(Position::new(0.0, 0.0)),
                after: TaskPatch::position(Position::new(10.0, 0.0)),
            },
            "Move",
        );
        assert!(!history.record(drag));
        assert!(!history.can_undo());

        let rename = Operation::update_task(&t, &TaskPatch::title("B")).unwrap();
        assert!(history.record(rename));
        assert!(history.can_undo());
    }

    // -----------------------------------------------------------------------
    // begin / finish
    // -----------------------------------------------------------------------

    #[test]
    fn empty_undo_reports_nothing_to_undo() {
        let mut history = History::new(10);
        let err = history.begin(Direction::Undo).unwrap_err();
        assert!(matches!(err, HistoryError::NothingToUndo));
        assert!(err.is_empty_stack());
        assert_eq!(err.to_string(), "nothing to undo");
        assert!(!history.is_replaying());
        assert_eq!((history.undo_len(), history.redo_len()), (0, 0));
    }

    #[test]
    fn second_begin_while_in_flight_is_busy() {
        let mut history = History::new(10);
        history.record(titled_op("A"));
        history.record(titled_op("B"));
        let replay = history.begin(Direction::Undo).unwrap();
        assert!(matches!(
            history.begin(Direction::Undo),
            Err(HistoryError::Busy)
        ));
        assert_eq!(history.undo_len(), 1);
        history.finish(replay, Ok(Applied::default())).unwrap();
        assert!(history.begin(Direction::Undo).is_ok());
    }

    #[test]
    fn failed_undo_restores_operation() {
        let mut history = History::new(10);
        history.record(titled_op("A"));
        let replay = history.begin(Direction::Undo).unwrap();
        let err = history
            .finish(replay, Err(ServiceError::Injected("offline".into())))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "could not undo \"Create \"A\"\": injected failure: offline"
        );
        assert_eq!(history.undo_len(), 1);
        assert_eq!(history.redo_len(), 0);
        assert!(!history.is_replaying());
    }

    #[test]
    fn failed_redo_restores_operation() {
        let mut history = History::new(10);
        history.record(titled_op("A"));
        let replay = history.begin(Direction::Undo).unwrap();
        history.finish(replay, Ok(Applied::default())).unwrap();

        let replay = history.begin(Direction::Redo).unwrap();
        assert!(history
            .finish(replay, Err(ServiceError::Transport("timeout".into())))
            .is_err());
        assert_eq!(history.redo_len(), 1);
        assert_eq!(history.undo_len(), 0);
    }

    #[test]
    fn failed_undo_goes_back_under_edits_made_meanwhile() {
        let mut history = History::new(10);
        history.record(titled_op("A"));
        let replay = history.begin(Direction::Undo).unwrap();
        history.record(titled_op("B"));
        let _ = history.finish(replay, Err(ServiceError::Injected("x".into())));
        let order: Vec<&str> = history
            .undo_iter()
            .map(|op| op.description.as_str())
            .collect();
        assert_eq!(order, vec!["Create \"B\"", "Create \"A\""]);
    }

    #[test]
    fn undo_completing_after_a_new_edit_is_not_redoable() {
        let mut history = History::new(10);
        history.record(titled_op("A"));
        let replay = history.begin(Direction::Undo).unwrap();
        history.record(titled_op("B"));
        history.finish(replay, Ok(Applied::default())).unwrap();
        assert!(!history.can_redo());
        assert_eq!(history.undo_len(), 1);
    }

    #[test]
    fn clear_during_flight_drops_the_replay() {
        let mut history = History::new(10);
        history.record(titled_op("A"));
        let replay = history.begin(Direction::Undo).unwrap();
        history.clear();
        assert!(!history.is_replaying());
        let err = history.finish(replay, Ok(Applied::default())).unwrap_err();
        assert!(matches!(err, HistoryError::Stale(_)));
        assert_eq!((history.undo_len(), history.redo_len()), (0, 0));
    }

    #[test]
    fn rekey_applies_to_both_stacks() {
        let mut history = History::new(10);
        let a = task("A");
        let b = task("B");
        let dep = Dependency::new(a.id, b.id);
        history.record(Operation::create_dependency(dep, "A → B"));
        history.record(Operation::create_task(b.clone()));
        let replay = history.begin(Direction::Undo).unwrap();
        history.finish(replay, Ok(Applied::default())).unwrap();

        let fresh = TaskId::new();
        history.rekey(b.id, fresh);
        assert!(history.peek_undo().unwrap().references(fresh));
        assert!(history.peek_redo().unwrap().references(fresh));
    }

    // -----------------------------------------------------------------------
    // Against a service
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn undo_redo_title_edit_round_trip() {
        let service = MemoryService::new();
        let project = service.add_project("Test").await;
        let draft = service
            .create_task(NewTask::new(project, "Draft"))
            .await
            .unwrap();
        let mut history = History::default();

        let patch = TaskPatch::title("Final");
        service.update_task(draft.id, patch.clone()).await.unwrap();
        history.record(Operation::update_task(&draft, &patch).unwrap());

        let report = history.undo(&service).await.unwrap();
        assert_eq!(report.description, "Edit title of \"Draft\"");
        assert_eq!(service.task(draft.id).await.unwrap().title, "Draft");

        history.redo(&service).await.unwrap();
        assert_eq!(service.task(draft.id).await.unwrap().title, "Final");
        assert!(history.can_undo());
        assert!(!history.can_redo());
    }

    #[tokio::test]
    async fn service_failure_keeps_history_intact() {
        let service = MemoryService::new();
        let project = service.add_project("Test").await;
        let a = service.create_task(NewTask::new(project, "A")).await.unwrap();
        let mut history = History::default();
        history.record(Operation::create_task(a.clone()));

        service.fail_next("503").await;
        assert!(history.undo(&service).await.is_err());
        assert!(service.task(a.id).await.is_some());
        assert_eq!(history.undo_len(), 1);

        history.undo(&service).await.unwrap();
        assert!(service.task(a.id).await.is_none());
        assert_eq!(history.redo_len(), 1);
    }
}
