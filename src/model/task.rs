use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque task identity assigned by the scheduling service (or by the caller on create)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        TaskId(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(TaskId)
    }
}

/// Identity of the project that owns a set of tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub Uuid);

impl ProjectId {
    pub fn new() -> Self {
        ProjectId(Uuid::new_v4())
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ProjectId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(ProjectId)
    }
}

/// Canvas coordinates of a node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Position { x, y }
    }
}

/// A task as owned by the scheduling service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TaskWire", into = "TaskWire")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    /// Whole days; 0 = milestone
    pub duration_days: u32,
    pub start_date: NaiveDate,
    /// Computed by the scheduler. Never derived client-side for anything but display.
    pub end_date: Option<NaiveDate>,
    pub project_id: ProjectId,
    /// None = auto-place
    pub position: Option<Position>,
    /// Changes on every server-side edit; display/debugging only
    pub calc_version_id: Option<Uuid>,
}

impl Task {
    pub fn new(project_id: ProjectId, title: impl Into<String>, start_date: NaiveDate) -> Self {
        Task {
            id: TaskId::new(),
            title: title.into(),
            description: None,
            duration_days: 1,
            start_date,
            end_date: None,
            project_id,
            position: None,
            calc_version_id: None,
        }
    }

    pub fn is_milestone(&self) -> bool {
        self.duration_days == 0
    }

    /// The end date the scheduler reports, or the scheduler's formula when the
    /// task arrived without one (inclusive end: start + duration - 1).
    pub fn display_end_date(&self) -> NaiveDate {
        self.end_date.unwrap_or_else(|| self.expected_end_date())
    }

    pub fn expected_end_date(&self) -> NaiveDate {
        if self.duration_days == 0 {
            self.start_date
        } else {
            self.start_date + Duration::days(i64::from(self.duration_days) - 1)
        }
    }
}

/// JSON shape used by the service: flat `position_x` / `position_y` columns.
#[derive(Serialize, Deserialize)]
struct TaskWire {
    id: TaskId,
    title: String,
    #[serde(default)]
    description: Option<String>,
    duration_days: u32,
    start_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    end_date: Option<NaiveDate>,
    project_id: ProjectId,
    #[serde(default)]
    position_x: Option<f64>,
    #[serde(default)]
    position_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    calc_version_id: Option<Uuid>,
}

impl From<TaskWire> for Task {
    fn from(w: TaskWire) -> Self {
        let position = match (w.position_x, w.position_y) {
            (Some(x), Some(y)) => Some(Position { x, y }),
            _ => None,
        };
        Task {
            id: w.id,
            title: w.title,
            description: w.description,
            duration_days: w.duration_days,
            start_date: w.start_date,
            end_date: w.end_date,
            project_id: w.project_id,
            position,
            calc_version_id: w.calc_version_id,
        }
    }
}

impl From<Task> for TaskWire {
    fn from(t: Task) -> Self {
        TaskWire {
            id: t.id,
            title: t.title,
            description: t.description,
            duration_days: t.duration_days,
            start_date: t.start_date,
            end_date: t.end_date,
            project_id: t.project_id,
            position_x: t.position.map(|p| p.x),
            position_y: t.position.map(|p| p.y),
            calc_version_id: t.calc_version_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Creation and partial updates
// ---------------------------------------------------------------------------

/// Fields for creating a task. `id` lets the caller pick the identity, which is
/// how a deleted task is restored under its original id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub id: Option<TaskId>,
    pub title: String,
    pub description: Option<String>,
    pub duration_days: u32,
    /// None = service default (today)
    pub start_date: Option<NaiveDate>,
    pub project_id: ProjectId,
    pub position: Option<Position>,
}

impl NewTask {
    pub fn new(project_id: ProjectId, title: impl Into<String>) -> Self {
        NewTask {
            id: None,
            title: title.into(),
            description: None,
            duration_days: 1,
            start_date: None,
            project_id,
            position: None,
        }
    }

    /// Rebuild the creation request for an existing task, keeping its identity.
    pub fn from_snapshot(task: &Task) -> Self {
        NewTask {
            id: Some(task.id),
            title: task.title.clone(),
            description: task.description.clone(),
            duration_days: task.duration_days,
            start_date: Some(task.start_date),
            project_id: task.project_id,
            position: task.position,
        }
    }
}

/// Names of the editable task fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskField {
    Title,
    Description,
    Duration,
    StartDate,
    Position,
}

impl TaskField {
    pub fn label(self) -> &'static str {
        match self {
            TaskField::Title => "title",
            TaskField::Description => "description",
            TaskField::Duration => "duration",
            TaskField::StartDate => "start date",
            TaskField::Position => "position",
        }
    }
}

/// A partial update: only the fields that are `Some` are touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    /// `Some(None)` clears the description
    pub description: Option<Option<String>>,
    pub duration_days: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub position: Option<Position>,
}

impl TaskPatch {
    pub fn title(title: impl Into<String>) -> Self {
        TaskPatch {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn position(position: Position) -> Self {
        TaskPatch {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }

    pub fn changed_fields(&self) -> Vec<TaskField> {
        let mut fields = Vec::new();
        if self.title.is_some() {
            fields.push(TaskField::Title);
        }
        if self.description.is_some() {
            fields.push(TaskField::Description);
        }
        if self.duration_days.is_some() {
            fields.push(TaskField::Duration);
        }
        if self.start_date.is_some() {
            fields.push(TaskField::StartDate);
        }
        if self.position.is_some() {
            fields.push(TaskField::Position);
        }
        fields
    }

    /// True when the patch only moves the node (a drag).
    pub fn is_position_only(&self) -> bool {
        self.changed_fields() == [TaskField::Position]
    }

    /// Drop the fields whose value already matches `task`.
    pub fn without_noop_fields(mut self, task: &Task) -> Self {
        if self.title.as_ref() == Some(&task.title) {
            self.title = None;
        }
        if self.description.as_ref() == Some(&task.description) {
            self.description = None;
        }
        if self.duration_days == Some(task.duration_days) {
            self.duration_days = None;
        }
        if self.start_date == Some(task.start_date) {
            self.start_date = None;
        }
        if self.position.is_some() && self.position == task.position {
            self.position = None;
        }
        self
    }

    /// The patch that restores `task` for exactly the fields this patch touches.
    pub fn inverse_for(&self, task: &Task) -> TaskPatch {
        TaskPatch {
            title: self.title.as_ref().map(|_| task.title.clone()),
            description: self.description.as_ref().map(|_| task.description.clone()),
            duration_days: self.duration_days.map(|_| task.duration_days),
            start_date: self.start_date.map(|_| task.start_date),
            // An unplaced task has no position to restore
            position: self.position.and(task.position),
        }
    }

    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(duration) = self.duration_days {
            task.duration_days = duration;
        }
        if let Some(start) = self.start_date {
            task.start_date = start;
        }
        if let Some(position) = self.position {
            task.position = Some(position);
        }
    }
}
