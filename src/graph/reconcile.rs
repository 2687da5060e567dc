use std::collections::{HashMap, HashSet};

use crate::model::{Position, ProjectSnapshot, Task, TaskId, TaskPatch};

use super::annotate::{Annotator, ViewState};
use super::layout::LayoutSpacing;
use super::projection::{NodeData, VisualGraph, project_edges, project_with};

/// How a reconcile pass treated the node set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileKind {
    /// Membership changed: every node regenerated
    Rebuilt,
    /// Same membership: data payloads replaced, positions kept
    Patched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    pub kind: ReconcileKind,
    /// The renderer should re-fit the camera once this frame settles
    pub fit_view: bool,
}

/// Keeps the visual graph in step with refreshed data without throwing away
/// positions the user arranged.
///
/// The dirty signal is task-id membership: any id added or removed triggers a
/// full rebuild, anything else is patched in place.
#[derive(Debug, Default)]
pub struct GraphReconciler {
    seen: HashSet<TaskId>,
    graph: VisualGraph,
    spacing: LayoutSpacing,
    /// Nodes moved locally whose position the service has not stored yet
    dragged: HashSet<TaskId>,
}

impl GraphReconciler {
    pub fn new(spacing: LayoutSpacing) -> Self {
        GraphReconciler {
            spacing,
            ..Default::default()
        }
    }

    pub fn graph(&self) -> &VisualGraph {
        &self.graph
    }

    pub fn seen_ids(&self) -> &HashSet<TaskId> {
        &self.seen
    }

    /// Bring the visual graph up to date with `snapshot`.
    pub fn reconcile(&mut self, snapshot: &ProjectSnapshot, view: &ViewState) -> Reconciled {
        let current = snapshot.task_ids();
        let kind = if current != self.seen {
            self.rebuild(snapshot, view);
            ReconcileKind::Rebuilt
        } else {
            self.patch(&snapshot.tasks, view);
            ReconcileKind::Patched
        };

        let annotator = Annotator::new(view);
        self.graph.edges = project_edges(&snapshot.dependencies, &annotator);
        tracing::debug!(
            ?kind,
            nodes = self.graph.nodes.len(),
            edges = self.graph.edges.len(),
            "reconciled"
        );
        self.seen = current;
        Reconciled {
            kind,
            fit_view: kind == ReconcileKind::Rebuilt,
        }
    }

    /// Stored position, else an uncommitted local drag, else auto-layout.
    /// Unplaced nodes never keep an old layout slot: the layout is recomputed
    /// for the new membership.
    fn rebuild(&mut self, snapshot: &ProjectSnapshot, view: &ViewState) {
        self.dragged.retain(|id| {
            snapshot
                .task(*id)
                .is_some_and(|task| task.position.is_none())
        });
        let dragged: HashMap<TaskId, Position> = self
            .graph
            .nodes
            .iter()
            .filter(|n| self.dragged.contains(&n.id))
            .map(|n| (n.id, n.position))
            .collect();
        self.graph = project_with(
            &snapshot.tasks,
            &snapshot.dependencies,
            view,
            self.spacing,
            |id| dragged.get(&id).copied(),
        );
    }

    fn patch(&mut self, tasks: &[Task], view: &ViewState) {
        let annotator = Annotator::new(view);
        let by_id: HashMap<TaskId, &Task> = tasks.iter().map(|t| (t.id, t)).collect();
        for node in &mut self.graph.nodes {
            // A task that vanished mid-pass is picked up by the next rebuild
            let Some(task) = by_id.get(&node.id) else {
                continue;
            };
            node.data = NodeData::new(task, annotator.flags(task));
        }
    }

    /// Move a node locally (drag in progress). Returns false for unknown ids.
    pub fn drag_to(&mut self, id: TaskId, position: Position) -> bool {
        match self.graph.node_mut(id) {
            Some(node) => {
                node.position = position;
                self.dragged.insert(id);
                true
            }
            None => false,
        }
    }

    /// Drag finished: the position-only update to send to the service.
    pub fn commit_position(&self, id: TaskId) -> Option<TaskPatch> {
        self.graph
            .node(id)
            .map(|node| TaskPatch::position(node.position))
    }

    /// Forget everything (project or identity switch).
    pub fn reset(&mut self) {
        self.seen.clear();
        self.dragged.clear();
        self.graph = VisualGraph::default();
    }
}
