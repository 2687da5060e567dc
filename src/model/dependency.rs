use std::fmt;

use serde::{Deserialize, Serialize};

use super::task::TaskId;

/// A finish-to-start edge: `successor` cannot start before `predecessor` ends.
/// The ordered pair is the edge's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Dependency {
    pub predecessor_id: TaskId,
    pub successor_id: TaskId,
}

impl Dependency {
    pub fn new(predecessor_id: TaskId, successor_id: TaskId) -> Self {
        Dependency {
            predecessor_id,
            successor_id,
        }
    }

    pub fn touches(&self, task_id: TaskId) -> bool {
        self.predecessor_id == task_id || self.successor_id == task_id
    }

    /// Stable key for visual edges (`pred->succ`)
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.predecessor_id, self.successor_id)
    }
}
