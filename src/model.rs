use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// How many activity entries the session keeps around.
const ACTIVITY_CAP: usize = 50;

/// A single sales task on the board.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub revenue: f64,
    /// Time taken, in minutes.
    pub time_taken: f64,
    pub priority: Priority,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Local>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Local>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// The weight used for sorting: High outranks Medium outranks Low.
    pub fn weight(&self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "High"),
            Priority::Medium => write!(f, "Medium"),
            Priority::Low => write!(f, "Low"),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_keyword(s).as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(format!("Unrecognized priority '{}'.", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Todo,
    #[serde(rename = "In Progress")]
    InProgress,
    Done,
}

impl Default for Status {
    fn default() -> Self {
        Status::Todo
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Todo => write!(f, "Todo"),
            Status::InProgress => write!(f, "In Progress"),
            Status::Done => write!(f, "Done"),
        }
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_keyword(s).as_str() {
            "todo" => Ok(Status::Todo),
            "inprogress" => Ok(Status::InProgress),
            "done" => Ok(Status::Done),
            _ => Err(format!("Unrecognized status '{}'.", s)),
        }
    }
}

/// Lowercase a keyword and drop whitespace, dashes and underscores, so
/// "In Progress", "in-progress" and "INPROGRESS" all read the same.
fn normalize_keyword(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .collect()
}

/// Payload for creating a task. The board assigns the system fields;
/// an id is only carried over when a caller re-creates a known record.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub id: Option<String>,
    pub title: String,
    pub revenue: f64,
    pub time_taken: f64,
    pub priority: Priority,
    pub status: Status,
    pub notes: Option<String>,
}

/// A partial edit to an existing task. Absent fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub revenue: Option<f64>,
    pub time_taken: Option<f64>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub notes: Option<String>,
}

impl TaskPatch {
    /// Names of the fields this patch touches, for the activity log.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.title.is_some() {
            names.push("title");
        }
        if self.revenue.is_some() {
            names.push("revenue");
        }
        if self.time_taken.is_some() {
            names.push("timeTaken");
        }
        if self.priority.is_some() {
            names.push("priority");
        }
        if self.status.is_some() {
            names.push("status");
        }
        if self.notes.is_some() {
            names.push("notes");
        }
        names
    }
}

/// A task with its derived fields attached.
#[derive(Debug, Clone)]
pub struct DerivedTask {
    pub task: Task,
    /// Revenue per minute, rounded to two decimals. None when the task
    /// has no positive time_taken to divide by.
    pub roi: Option<f64>,
    pub priority_weight: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceGrade {
    Excellent,
    Good,
    NeedsImprovement,
}

impl fmt::Display for PerformanceGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerformanceGrade::Excellent => write!(f, "Excellent"),
            PerformanceGrade::Good => write!(f, "Good"),
            PerformanceGrade::NeedsImprovement => write!(f, "Needs Improvement"),
        }
    }
}

/// Aggregate metrics over a set of tasks.
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_revenue: f64,
    pub total_time_taken: f64,
    pub time_efficiency_pct: i64,
    pub revenue_per_hour: i64,
    pub average_roi: f64,
    pub performance_grade: PerformanceGrade,
}

impl Default for Metrics {
    fn default() -> Self {
        Metrics {
            total_revenue: 0.0,
            total_time_taken: 0.0,
            time_efficiency_pct: 0,
            revenue_per_hour: 0,
            average_roi: 0.0,
            performance_grade: PerformanceGrade::NeedsImprovement,
        }
    }
}

/// Task counts per workflow status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Funnel {
    pub todo: usize,
    pub in_progress: usize,
    pub done: usize,
}

/// Completed-task count for one Monday-start week.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeekBucket {
    /// Label of the form "YYYY-Www".
    pub week: String,
    pub count: usize,
}

/// The in-memory task list plus the single-slot undo buffer. All
/// mutations go through here so the completed_at rule holds in one place.
#[derive(Debug, Default)]
pub struct Board {
    tasks: Vec<Task>,
    last_deleted: Option<Task>,
}

impl Board {
    pub fn new(tasks: Vec<Task>) -> Self {
        Board {
            tasks,
            last_deleted: None,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn last_deleted(&self) -> Option<&Task> {
        self.last_deleted.as_ref()
    }

    /// Add a task. Assigns an id and created_at when the draft carries
    /// none; a task born Done is completed on the spot.
    pub fn add(&mut self, draft: TaskDraft) -> Task {
        let created_at = Local::now();
        let completed_at = if draft.status == Status::Done {
            Some(created_at)
        } else {
            None
        };
        let task = Task {
            id: draft
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            title: draft.title,
            revenue: draft.revenue,
            time_taken: draft.time_taken,
            priority: draft.priority,
            status: draft.status,
            notes: draft.notes,
            created_at,
            completed_at,
        };
        self.tasks.push(task.clone());
        task
    }

    /// Merge a patch into the task with the given id. completed_at is
    /// stamped only on the first transition into Done and is never
    /// overwritten or cleared afterwards.
    pub fn update(&mut self, id: &str, patch: TaskPatch) -> Option<Task> {
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;
        let was_done = task.status == Status::Done;
        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(revenue) = patch.revenue {
            task.revenue = revenue;
        }
        if let Some(time_taken) = patch.time_taken {
            task.time_taken = time_taken;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(notes) = patch.notes {
            task.notes = Some(notes);
        }
        if !was_done && task.status == Status::Done && task.completed_at.is_none() {
            task.completed_at = Some(Local::now());
        }
        Some(task.clone())
    }

    /// Remove a task by id. The removed record takes over the undo
    /// buffer; a miss leaves the list alone but still clears the buffer.
    pub fn delete(&mut self, id: &str) -> Option<Task> {
        let removed = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .map(|index| self.tasks.remove(index));
        self.last_deleted = removed.clone();
        removed
    }

    /// Reinsert the last deleted task, if any, and clear the buffer.
    pub fn undo(&mut self) -> Option<Task> {
        let task = self.last_deleted.take()?;
        self.tasks.push(task.clone());
        Some(task)
    }

    /// Drop the undo buffer without reinserting. Returns whether there
    /// was anything to drop.
    pub fn dismiss(&mut self) -> bool {
        self.last_deleted.take().is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Add,
    Update,
    Delete,
    Undo,
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityKind::Add => write!(f, "add"),
            ActivityKind::Update => write!(f, "update"),
            ActivityKind::Delete => write!(f, "delete"),
            ActivityKind::Undo => write!(f, "undo"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActivityItem {
    pub id: String,
    pub at: DateTime<Local>,
    pub kind: ActivityKind,
    pub summary: String,
}

/// What happened during the session, newest first, capped at 50.
#[derive(Debug, Default)]
pub struct ActivityLog {
    items: Vec<ActivityItem>,
}

impl ActivityLog {
    pub fn record(&mut self, kind: ActivityKind, summary: String) {
        self.items.insert(
            0,
            ActivityItem {
                id: Uuid::new_v4().to_string(),
                at: Local::now(),
                kind,
                summary,
            },
        );
        self.items.truncate(ACTIVITY_CAP);
    }

    pub fn items(&self) -> &[ActivityItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
