use crate::logic;
use crate::model::{
    ActivityKind, ActivityLog, Board, DerivedTask, Funnel, Metrics, Task, TaskDraft, TaskPatch,
    WeekBucket,
};
use anyhow::{Context, Result};
use humantime::format_duration;
use prettytable::Table;
use std::path::Path;
use std::time::Duration as STDDuration;

/// Width of the notes column in the task table.
const NOTES_WIDTH: usize = 28;
/// Width of the text chart bars.
const BAR_WIDTH: usize = 40;

/// Print the task table for a derived, sorted, filtered view.
pub fn list(view: &[DerivedTask]) {
    if view.is_empty() {
        println!("No tasks match.");
        return;
    }
    let mut table = Table::new();
    table.add_row(row![
        "id", "task", "revenue", "time", "priority", "status", "ROI", "created", "completed",
        "notes"
    ]);
    for derived in view {
        let task = &derived.task;
        table.add_row(row![
            task.id,
            task.title,
            format!("{:.2}", task.revenue),
            fmt_minutes(task.time_taken),
            task.priority,
            task.status,
            fmt_roi(derived.roi),
            task.created_at.format("%Y-%m-%d"),
            task.completed_at
                .map(|at| at.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            task.notes
                .as_deref()
                .map(|notes| textwrap::fill(notes, NOTES_WIDTH))
                .unwrap_or_default()
        ]);
    }
    table.printstd();
}

/// Print the metrics bar for a view.
pub fn metrics(view: &[DerivedTask]) {
    let metrics = logic::compute_metrics(&base_tasks(view));
    render_metrics(&metrics);
}

fn render_metrics(metrics: &Metrics) {
    let mut table = Table::new();
    table.add_row(row![
        "total revenue",
        "total time",
        "efficiency",
        "revenue/hour",
        "avg ROI",
        "grade"
    ]);
    table.add_row(row![
        format!("{:.2}", metrics.total_revenue),
        fmt_minutes(metrics.total_time_taken),
        format!("{}%", metrics.time_efficiency_pct),
        metrics.revenue_per_hour,
        format!("{:.2}", metrics.average_roi),
        metrics.performance_grade
    ]);
    table.printstd();
}

/// Print the status funnel as a text bar chart.
pub fn funnel_chart(view: &[DerivedTask]) {
    let funnel: Funnel = logic::funnel(&base_tasks(view));
    let max = funnel.todo.max(funnel.in_progress).max(funnel.done);
    println!("{:<12} {:<width$} {}", "Todo", bar(funnel.todo, max), funnel.todo, width = BAR_WIDTH);
    println!(
        "{:<12} {:<width$} {}",
        "In Progress",
        bar(funnel.in_progress, max),
        funnel.in_progress,
        width = BAR_WIDTH
    );
    println!("{:<12} {:<width$} {}", "Done", bar(funnel.done, max), funnel.done, width = BAR_WIDTH);
}

/// Print weekly completed-task throughput as a text bar chart.
pub fn weekly_chart(view: &[DerivedTask]) {
    let buckets: Vec<WeekBucket> = logic::weekly_throughput(&base_tasks(view));
    if buckets.is_empty() {
        println!("Nothing completed yet.");
        return;
    }
    let max = buckets.iter().map(|b| b.count).max().unwrap_or(0);
    for bucket in &buckets {
        println!(
            "{:<10} {:<width$} {}",
            bucket.week,
            bar(bucket.count, max),
            bucket.count,
            width = BAR_WIDTH
        );
    }
}

/// Print the session activity log, newest first.
pub fn activity(log: &ActivityLog) {
    if log.is_empty() {
        println!("Nothing happened yet.");
        return;
    }
    for item in log.items() {
        println!("{}  {:<7} {}", item.at.format("%H:%M:%S"), item.kind, item.summary);
    }
}

/// Add a task to the board and record it.
pub fn add_task(board: &mut Board, activity: &mut ActivityLog, draft: TaskDraft) {
    let title = draft.title.clone();
    let task = board.add(draft);
    println!("Added {} ({}).", task.title, task.id);
    activity.record(ActivityKind::Add, format!("Added: {}", title));
}

/// Patch a task on the board and record which fields changed.
pub fn edit_task(board: &mut Board, activity: &mut ActivityLog, id: &str, patch: TaskPatch) {
    let fields = patch.field_names();
    if fields.is_empty() {
        println!("Nothing to update.");
        return;
    }
    match board.update(id, patch) {
        Some(task) => {
            println!("Updated {}.", task.id);
            activity.record(ActivityKind::Update, format!("Updated: {}", fields.join(", ")));
        }
        None => println!("No task with id {}.", id),
    }
}

/// Delete a task, keeping it around for one undo.
pub fn remove_task(board: &mut Board, activity: &mut ActivityLog, id: &str) {
    match board.delete(id) {
        Some(task) => {
            println!("Deleted {}. \"undo\" restores it.", task.title);
            activity.record(ActivityKind::Delete, format!("Deleted task {}", id));
        }
        None => println!("No task with id {}.", id),
    }
}

/// Restore the last deleted task.
pub fn undo_delete(board: &mut Board, activity: &mut ActivityLog) {
    match board.undo() {
        Some(task) => {
            println!("Restored {}.", task.title);
            activity.record(ActivityKind::Undo, "Undo delete".to_string());
        }
        None => println!("Nothing to undo."),
    }
}

/// Drop the undo buffer for good.
pub fn dismiss_deleted(board: &mut Board) {
    if board.dismiss() {
        println!("Dropped the last deleted task.");
    } else {
        println!("Nothing to dismiss.");
    }
}

/// Render a view as comma-separated text, header row first.
pub fn to_csv(view: &[DerivedTask]) -> String {
    let mut out = String::from(
        "id,title,revenue,timeTaken,priority,status,roi,createdAt,completedAt,notes\n",
    );
    for derived in view {
        let task = &derived.task;
        let fields = [
            csv_field(&task.id),
            csv_field(&task.title),
            format!("{}", task.revenue),
            format!("{}", task.time_taken),
            task.priority.to_string(),
            csv_field(&task.status.to_string()),
            derived.roi.map(|r| format!("{:.2}", r)).unwrap_or_default(),
            task.created_at.to_rfc3339(),
            task.completed_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_default(),
            csv_field(task.notes.as_deref().unwrap_or("")),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

/// Write the CSV rendering of a view to a file.
pub fn export_csv(path: &Path, view: &[DerivedTask]) -> Result<()> {
    std::fs::write(path, to_csv(view))
        .with_context(|| format!("Failed to write CSV file {}.", path.display()))?;
    Ok(())
}

/// Quote a CSV field when it holds a comma, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Format minutes the way durations read, e.g. "2h 30m".
fn fmt_minutes(minutes: f64) -> String {
    if minutes <= 0.0 {
        return "0s".to_string();
    }
    format_duration(STDDuration::from_secs((minutes * 60.0).round() as u64)).to_string()
}

fn fmt_roi(roi: Option<f64>) -> String {
    match roi {
        Some(roi) => format!("{:.2}", roi),
        None => "N/A".to_string(),
    }
}

/// A proportional bar of '#' marks, at least one for a non-zero count.
fn bar(count: usize, max: usize) -> String {
    if max == 0 || count == 0 {
        return String::new();
    }
    "#".repeat((count * BAR_WIDTH / max).max(1))
}

fn base_tasks(view: &[DerivedTask]) -> Vec<Task> {
    view.iter().map(|d| d.task.clone()).collect()
}
