use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::model::{Dependency, Position, Task, TaskId, ViewConfig};

/// Spacing for auto-placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutSpacing {
    pub column: f64,
    pub row: f64,
}

impl Default for LayoutSpacing {
    fn default() -> Self {
        LayoutSpacing::from(&ViewConfig::default())
    }
}

impl From<&ViewConfig> for LayoutSpacing {
    fn from(config: &ViewConfig) -> Self {
        LayoutSpacing {
            column: config.column_spacing,
            row: config.row_spacing,
        }
    }
}

/// Longest-predecessor-chain layer for each task. Edges to unknown tasks are
/// ignored; tasks caught in a cycle stay in layer 0.
pub fn layers(tasks: &[Task], dependencies: &[Dependency]) -> HashMap<TaskId, usize> {
    let mut layer: HashMap<TaskId, usize> = tasks.iter().map(|t| (t.id, 0)).collect();
    let mut indegree: HashMap<TaskId, usize> = layer.keys().map(|id| (*id, 0)).collect();
    let mut successors: HashMap<TaskId, Vec<TaskId>> = HashMap::new();

    for dep in dependencies {
        if !layer.contains_key(&dep.predecessor_id) || !layer.contains_key(&dep.successor_id) {
            continue;
        }
        successors
            .entry(dep.predecessor_id)
            .or_default()
            .push(dep.successor_id);
        *indegree.entry(dep.successor_id).or_default() += 1;
    }

    // Seed in task order so the walk does not depend on hash order
    let mut queue: VecDeque<TaskId> = tasks
        .iter()
        .map(|t| t.id)
        .filter(|id| indegree.get(id) == Some(&0))
        .collect();
    let mut placed = 0;
    while let Some(id) = queue.pop_front() {
        placed += 1;
        let base = layer[&id];
        for succ in successors.get(&id).into_iter().flatten() {
            if let Some(l) = layer.get_mut(succ) {
                *l = (*l).max(base + 1);
            }
            if let Some(d) = indegree.get_mut(succ) {
                *d -= 1;
                if *d == 0 {
                    queue.push_back(*succ);
                }
            }
        }
    }

    if placed < tasks.len() {
        tracing::warn!(
            unplaced = tasks.len() - placed,
            "dependency cycle in layout input"
        );
        for (id, d) in &indegree {
            if *d > 0 {
                layer.insert(*id, 0);
            }
        }
    }
    layer
}

/// Deterministic auto-layout position for every task. Same input, same output.
pub fn auto_layout(
    tasks: &[Task],
    dependencies: &[Dependency],
    spacing: LayoutSpacing,
) -> HashMap<TaskId, Position> {
    let layer = layers(tasks, dependencies);
    let mut columns: BTreeMap<usize, Vec<&Task>> = BTreeMap::new();
    for task in tasks {
        columns.entry(layer[&task.id]).or_default().push(task);
    }

    let mut positions = HashMap::with_capacity(tasks.len());
    for (col, mut members) in columns {
        members.sort_by(|a, b| {
            (a.start_date, &a.title, a.id).cmp(&(b.start_date, &b.title, b.id))
        });
        for (row, task) in members.into_iter().enumerate() {
            positions.insert(
                task.id,
                Position::new(col as f64 * spacing.column, row as f64 * spacing.row),
            );
        }
    }
    positions
}
