use crate::model::{Priority, Status, Task};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local};
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use uuid::Uuid;

/// How many tasks to fabricate when the file holds an empty list.
const SEED_COUNT: usize = 50;

/// A task-like object as it appears on disk. Everything is optional or
/// loosely typed; `normalize` turns it into a real Task.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTask {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    revenue: Value,
    #[serde(default)]
    time_taken: Value,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    completed_at: Option<String>,
}

/// Coerce a loose JSON value to a number: numbers pass through, numeric
/// strings parse, anything else is None.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Local>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Local))
}

/// Turn a raw record into a Task. Every field degrades to a usable
/// value instead of failing: blank titles become "Untitled Task",
/// unparseable revenue becomes 0, non-positive time becomes 1 minute,
/// unknown priorities and statuses fall back to Medium and Todo.
/// Timestamps are honored when present and parseable, so a saved board
/// loads back intact; otherwise creation times are staggered one day
/// apart behind `now`.
fn normalize(raw: RawTask, index: usize, now: DateTime<Local>) -> Task {
    let title = raw.title.as_deref().map(str::trim).unwrap_or("");
    let title = if title.is_empty() {
        "Untitled Task".to_string()
    } else {
        title.to_string()
    };

    let revenue = as_number(&raw.revenue)
        .filter(|r| r.is_finite())
        .unwrap_or(0.0);
    let time_taken = match as_number(&raw.time_taken) {
        Some(t) if t > 0.0 => t,
        _ => 1.0,
    };

    let priority: Priority = raw
        .priority
        .as_deref()
        .and_then(|p| p.parse().ok())
        .unwrap_or_default();
    let status: Status = raw
        .status
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or_default();

    let created_at = raw
        .created_at
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or_else(|| now - Duration::days(index as i64 + 1));
    let completed_at = if status == Status::Done {
        raw.completed_at
            .as_deref()
            .and_then(parse_timestamp)
            .or(Some(now))
    } else {
        None
    };

    Task {
        id: raw
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        title,
        revenue,
        time_taken,
        priority,
        status,
        notes: raw.notes,
        created_at,
        completed_at,
    }
}

/// Load the board's tasks from a JSON file. An empty array falls back
/// to a synthetic sales data set so the dashboard has something to show.
pub fn load_tasks(path: &Path) -> Result<Vec<Task>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tasks file {}.", path.display()))?;
    let raw: Vec<RawTask> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse tasks file {}.", path.display()))?;

    let now = Local::now();
    let tasks: Vec<Task> = raw
        .into_iter()
        .enumerate()
        .map(|(index, record)| normalize(record, index, now))
        .collect();

    if tasks.is_empty() {
        log::warn!(
            "Tasks file {} holds an empty list, generating sample data",
            path.display()
        );
        return Ok(seed_tasks(SEED_COUNT));
    }
    log::info!("Loaded {} tasks from {}", tasks.len(), path.display());
    Ok(tasks)
}

/// Write the board back in the same schema `load_tasks` reads.
pub fn save_tasks(path: &Path, tasks: &[Task]) -> Result<()> {
    let json = serde_json::to_string_pretty(tasks).context("Failed to serialize tasks.")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write tasks file {}.", path.display()))?;
    log::info!("Saved {} tasks to {}", tasks.len(), path.display());
    Ok(())
}

/// Generate synthetic sales tasks: randomized titles, revenue, effort,
/// priorities and statuses, with creation times staggered over the past
/// weeks. Done rows get a completion some hours after creation.
pub fn seed_tasks(count: usize) -> Vec<Task> {
    const ACTIONS: &[&str] = &[
        "Follow up with",
        "Demo for",
        "Draft proposal for",
        "Renewal call with",
        "Onboard",
        "Pricing review for",
        "Cold outreach to",
        "Contract redlines for",
    ];
    const ACCOUNTS: &[&str] = &[
        "Acme Corp",
        "Globex",
        "Initech",
        "Umbrella Health",
        "Northwind Traders",
        "Wayne Enterprises",
        "Vandelay Imports",
        "Stern Logistics",
        "Bluth Homes",
        "Pied Piper",
    ];

    let mut rng = rand::thread_rng();
    let now = Local::now();
    (0..count)
        .map(|_| {
            let status = match rng.gen_range(0..3) {
                0 => Status::Todo,
                1 => Status::InProgress,
                _ => Status::Done,
            };
            let priority = match rng.gen_range(0..3) {
                0 => Priority::High,
                1 => Priority::Medium,
                _ => Priority::Low,
            };
            let created_at = now
                - Duration::days(rng.gen_range(1..60))
                - Duration::minutes(rng.gen_range(0..1440));
            let completed_at = if status == Status::Done {
                Some((created_at + Duration::hours(rng.gen_range(1..72))).min(now))
            } else {
                None
            };
            Task {
                id: Uuid::new_v4().to_string(),
                title: format!(
                    "{} {}",
                    ACTIONS[rng.gen_range(0..ACTIONS.len())],
                    ACCOUNTS[rng.gen_range(0..ACCOUNTS.len())]
                ),
                revenue: f64::from(rng.gen_range(2u32..200) * 25),
                time_taken: f64::from(rng.gen_range(5u32..240)),
                priority,
                status,
                notes: None,
                created_at,
                completed_at,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn load_from_str(json: &str) -> Result<Vec<Task>> {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("tasks.json");
        fs::write(&path, json).expect("write fixture");
        load_tasks(&path)
    }

    #[test]
    fn loader_coerces_messy_fields() {
        let tasks = load_from_str(
            r#"[
                {"title": "  ", "revenue": "1200.50", "timeTaken": -3},
                {"title": "Call Acme", "revenue": {"oops": true}, "timeTaken": "90",
                 "priority": "HIGH", "status": "in progress", "notes": "warm lead"}
            ]"#,
        )
        .expect("loads");

        assert_eq!(tasks.len(), 2);

        assert_eq!(tasks[0].title, "Untitled Task");
        assert_eq!(tasks[0].revenue, 1200.5);
        assert_eq!(tasks[0].time_taken, 1.0); // non-positive clamps to one minute
        assert_eq!(tasks[0].priority, Priority::Medium);
        assert_eq!(tasks[0].status, Status::Todo);
        assert!(!tasks[0].id.is_empty());

        assert_eq!(tasks[1].title, "Call Acme");
        assert_eq!(tasks[1].revenue, 0.0);
        assert_eq!(tasks[1].time_taken, 90.0);
        assert_eq!(tasks[1].priority, Priority::High);
        assert_eq!(tasks[1].status, Status::InProgress);
        assert_eq!(tasks[1].notes.as_deref(), Some("warm lead"));
    }

    #[test]
    fn loader_stamps_done_rows_and_staggers_creation() {
        let tasks = load_from_str(
            r#"[
                {"title": "Open", "revenue": 10, "timeTaken": 5},
                {"title": "Closed", "revenue": 10, "timeTaken": 5, "status": "Done"}
            ]"#,
        )
        .expect("loads");

        assert!(tasks[0].completed_at.is_none());
        assert!(tasks[1].completed_at.is_some());
        // Row order decides the synthetic creation stagger.
        assert!(tasks[0].created_at > tasks[1].created_at);
    }

    #[test]
    fn loader_falls_back_to_seed_data_on_empty_list() {
        let tasks = load_from_str("[]").expect("loads");
        assert_eq!(tasks.len(), SEED_COUNT);
        assert!(tasks.iter().all(|t| t.time_taken > 0.0));
        assert!(tasks
            .iter()
            .all(|t| (t.status == Status::Done) == t.completed_at.is_some()));
    }

    #[test]
    fn loader_rejects_unreadable_and_unparseable_files() {
        assert!(load_tasks(Path::new("/definitely/not/here.json")).is_err());
        assert!(load_from_str("{\"not\": \"an array\"}").is_err());
        assert!(load_from_str("not json at all").is_err());
    }

    #[test]
    fn save_then_load_round_trips_the_board() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("tasks.json");

        let mut original = seed_tasks(5);
        original[0].notes = Some("follow up on pricing".to_string());
        save_tasks(&path, &original).expect("saves");

        let reloaded = load_tasks(&path).expect("loads");
        assert_eq!(reloaded.len(), original.len());
        for (before, after) in original.iter().zip(&reloaded) {
            assert_eq!(before.id, after.id);
            assert_eq!(before.title, after.title);
            assert_eq!(before.revenue, after.revenue);
            assert_eq!(before.status, after.status);
            assert_eq!(before.notes, after.notes);
            assert_eq!(before.created_at, after.created_at);
            assert_eq!(before.completed_at, after.completed_at);
        }
    }

    #[test]
    fn seed_tasks_look_like_sales_work() {
        let tasks = seed_tasks(20);
        assert_eq!(tasks.len(), 20);
        assert!(tasks.iter().all(|t| t.revenue >= 0.0));
        assert!(tasks.iter().all(|t| !t.title.is_empty()));
    }
}
