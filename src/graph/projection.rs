use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{Dependency, Position, Task, TaskId};

use super::annotate::{Annotator, NodeFlags, ViewState};
use super::layout::{LayoutSpacing, auto_layout};

/// The data payload of a node; replaced wholesale on every refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeData {
    pub title: String,
    pub description: Option<String>,
    pub duration_days: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_milestone: bool,
    #[serde(flatten)]
    pub flags: NodeFlags,
}

impl NodeData {
    pub fn new(task: &Task, flags: NodeFlags) -> Self {
        NodeData {
            title: task.title.clone(),
            description: task.description.clone(),
            duration_days: task.duration_days,
            start_date: task.start_date,
            end_date: task.display_end_date(),
            is_milestone: task.is_milestone(),
            flags,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualNode {
    pub id: TaskId,
    /// Locally owned once placed; only a rebuild may move it
    pub position: Position,
    pub data: NodeData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualEdge {
    pub dependency: Dependency,
    pub is_critical: bool,
}

impl VisualEdge {
    pub fn key(&self) -> String {
        self.dependency.key()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VisualGraph {
    pub nodes: Vec<VisualNode>,
    pub edges: Vec<VisualEdge>,
}

impl VisualGraph {
    pub fn node(&self, id: TaskId) -> Option<&VisualNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: TaskId) -> Option<&mut VisualNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }
}

/// Map tasks and dependencies to a visual graph. Tasks without a stored
/// position are auto-placed.
pub fn project(
    tasks: &[Task],
    dependencies: &[Dependency],
    view: &ViewState,
    spacing: LayoutSpacing,
) -> VisualGraph {
    project_with(tasks, dependencies, view, spacing, |_| None)
}

/// Like [`project`], but `fallback` supplies a position for unplaced tasks
/// before auto-layout is consulted.
pub fn project_with(
    tasks: &[Task],
    dependencies: &[Dependency],
    view: &ViewState,
    spacing: LayoutSpacing,
    fallback: impl Fn(TaskId) -> Option<Position>,
) -> VisualGraph {
    let annotator = Annotator::new(view);
    let layout = auto_layout(tasks, dependencies, spacing);
    let nodes = tasks
        .iter()
        .map(|task| VisualNode {
            id: task.id,
            position: task
                .position
                .or_else(|| fallback(task.id))
                .or_else(|| layout.get(&task.id).copied())
                .unwrap_or(Position::new(0.0, 0.0)),
            data: NodeData::new(task, annotator.flags(task)),
        })
        .collect();
    VisualGraph {
        nodes,
        edges: project_edges(dependencies, &annotator),
    }
}

/// One edge per dependency; critical when both ends are.
pub fn project_edges(dependencies: &[Dependency], annotator: &Annotator<'_>) -> Vec<VisualEdge> {
    dependencies
        .iter()
        .map(|dep| VisualEdge {
            dependency: *dep,
            is_critical: annotator.is_critical(dep.predecessor_id)
                && annotator.is_critical(dep.successor_id),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProjectId;
    use pretty_assertions::assert_eq;

    fn tasks() -> Vec<Task> {
        let project = ProjectId::new();
        let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let mut a = Task::new(project, "Design", start);
        a.position = Some(Position::new(7.0, 9.0));
        let b = Task::new(project, "Build", start);
        vec![a, b]
    }

    #[test]
    fn one_node_per_task_one_edge_per_dependency() {
        let ts = tasks();
        let deps = vec![Dependency::new(ts[0].id, ts[1].id)];
        let graph = project(&ts, &deps, &ViewState::default(), LayoutSpacing::default());
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].key(), deps[0].to_string());
    }

    #[test]
    fn stored_position_wins_over_layout() {
        let ts = tasks();
        let graph = project(&ts, &[], &ViewState::default(), LayoutSpacing::default());
        assert_eq!(graph.node(ts[0].id).unwrap().position, Position::new(7.0, 9.0));
    }

    #[test]
    fn fallback_used_only_for_unplaced_tasks() {
        let ts = tasks();
        let graph = project_with(
            &ts,
            &[],
            &ViewState::default(),
            LayoutSpacing::default(),
            |_| Some(Position::new(-1.0, -1.0)),
        );
        assert_eq!(graph.node(ts[0].id).unwrap().position, Position::new(7.0, 9.0));
        assert_eq!(graph.node(ts[1].id).unwrap().position, Position::new(-1.0, -1.0));
    }

    #[test]
    fn edge_critical_needs_both_ends() {
        let ts = tasks();
        let deps = vec![Dependency::new(ts[0].id, ts[1].id)];
        let mut view = ViewState {
            critical: [ts[0].id].into_iter().collect(),
            ..Default::default()
        };
        let graph = project(&ts, &deps, &view, LayoutSpacing::default());
        assert!(!graph.edges[0].is_critical);
        assert!(graph.node(ts[0].id).unwrap().data.flags.is_critical);

        view.critical.insert(ts[1].id);
        let graph = project(&ts, &deps, &view, LayoutSpacing::default());
        assert!(graph.edges[0].is_critical);
    }

    #[test]
    fn node_data_carries_display_end_date() {
        let mut ts = tasks();
        ts[0].duration_days = 3;
        let graph = project(&ts, &[], &ViewState::default(), LayoutSpacing::default());
        assert_eq!(
            graph.node(ts[0].id).unwrap().data.end_date,
            NaiveDate::from_ymd_opt(2026, 3, 4).unwrap()
        );
    }
}
