use crate::model::{
    DerivedTask, Funnel, Metrics, PerformanceGrade, Status, Task, WeekBucket,
};
use chrono::{DateTime, Datelike, Duration, Local};
use std::collections::BTreeMap;

/// Round to two decimals.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Raw ROI quotient. None unless time_taken is positive and the result
/// is finite.
fn raw_roi(task: &Task) -> Option<f64> {
    if task.time_taken > 0.0 {
        let roi = task.revenue / task.time_taken;
        if roi.is_finite() {
            return Some(roi);
        }
    }
    None
}

/// Attach the derived fields to a task.
pub fn with_derived(task: &Task) -> DerivedTask {
    DerivedTask {
        roi: raw_roi(task).map(round2),
        priority_weight: task.priority.weight(),
        task: task.clone(),
    }
}

/// Sort by descending ROI (missing ROI sorts last), then descending
/// priority weight, then ascending creation time, then ascending id.
/// The id step makes the order total, so no ties are left unresolved.
pub fn sort_tasks(tasks: &[DerivedTask]) -> Vec<DerivedTask> {
    let mut sorted = tasks.to_vec();
    sorted.sort_by(|a, b| {
        let a_roi = a.roi.unwrap_or(f64::NEG_INFINITY);
        let b_roi = b.roi.unwrap_or(f64::NEG_INFINITY);
        b_roi
            .total_cmp(&a_roi)
            .then(b.priority_weight.cmp(&a.priority_weight))
            .then(a.task.created_at.cmp(&b.task.created_at))
            .then(a.task.id.cmp(&b.task.id))
    });
    sorted
}

/// Derive and sort in one go, the shape every view consumes.
pub fn derived_sorted(tasks: &[Task]) -> Vec<DerivedTask> {
    let derived: Vec<DerivedTask> = tasks.iter().map(with_derived).collect();
    sort_tasks(&derived)
}

pub fn total_revenue(tasks: &[Task]) -> f64 {
    tasks.iter().map(|t| t.revenue).sum()
}

pub fn total_time_taken(tasks: &[Task]) -> f64 {
    tasks.iter().map(|t| t.time_taken).sum()
}

/// Tasks per unit of time, as a rounded percentage. Zero when there is
/// no time on the books.
pub fn time_efficiency_pct(tasks: &[Task]) -> i64 {
    let total_time = total_time_taken(tasks);
    if total_time == 0.0 {
        return 0;
    }
    (tasks.len() as f64 / total_time * 100.0).round() as i64
}

/// Revenue per hour of time taken, rounded. Zero when there is no time
/// on the books.
pub fn revenue_per_hour(tasks: &[Task]) -> i64 {
    let hours = total_time_taken(tasks) / 60.0;
    if hours == 0.0 {
        return 0;
    }
    (total_revenue(tasks) / hours).round() as i64
}

/// Mean of the finite per-task ROI quotients, rounded to two decimals.
/// Zero when no task has a finite ROI.
pub fn average_roi(tasks: &[Task]) -> f64 {
    let valid: Vec<f64> = tasks.iter().filter_map(raw_roi).collect();
    if valid.is_empty() {
        return 0.0;
    }
    round2(valid.iter().sum::<f64>() / valid.len() as f64)
}

pub fn performance_grade(average_roi: f64) -> PerformanceGrade {
    if average_roi >= 100.0 {
        PerformanceGrade::Excellent
    } else if average_roi >= 60.0 {
        PerformanceGrade::Good
    } else {
        PerformanceGrade::NeedsImprovement
    }
}

/// Bundle the aggregate metrics for a set of tasks.
pub fn compute_metrics(tasks: &[Task]) -> Metrics {
    let average = average_roi(tasks);
    Metrics {
        total_revenue: total_revenue(tasks),
        total_time_taken: total_time_taken(tasks),
        time_efficiency_pct: time_efficiency_pct(tasks),
        revenue_per_hour: revenue_per_hour(tasks),
        average_roi: average,
        performance_grade: performance_grade(average),
    }
}

/// Count tasks per workflow status.
pub fn funnel(tasks: &[Task]) -> Funnel {
    let mut counts = Funnel::default();
    for task in tasks {
        match task.status {
            Status::Todo => counts.todo += 1,
            Status::InProgress => counts.in_progress += 1,
            Status::Done => counts.done += 1,
        }
    }
    counts
}

/// Monday-start week label, "YYYY-Www". The week number comes from the
/// Monday's ordinal day, which is not strict ISO-8601 around year
/// boundaries.
fn week_label(at: DateTime<Local>) -> String {
    let monday = at.date_naive() - Duration::days(i64::from(at.weekday().num_days_from_monday()));
    format!("{}-W{:02}", monday.year(), monday.ordinal0() / 7 + 1)
}

/// Weekly counts of completed tasks, ascending by week label. Only Done
/// tasks with a completion timestamp participate.
pub fn weekly_throughput(tasks: &[Task]) -> Vec<WeekBucket> {
    let mut buckets: BTreeMap<String, usize> = BTreeMap::new();
    for task in tasks {
        if task.status != Status::Done {
            continue;
        }
        if let Some(completed_at) = task.completed_at {
            *buckets.entry(week_label(completed_at)).or_insert(0) += 1;
        }
    }
    buckets
        .into_iter()
        .map(|(week, count)| WeekBucket { week, count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Priority;
    use chrono::TimeZone;

    fn task(id: &str, revenue: f64, time_taken: f64) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task {}", id),
            revenue,
            time_taken,
            priority: Priority::Medium,
            status: Status::Todo,
            notes: None,
            created_at: Local.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
            completed_at: None,
        }
    }

    fn at(year: i32, month: u32, day: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn roi_is_absent_iff_time_taken_is_not_positive() {
        assert_eq!(with_derived(&task("a", 100.0, 50.0)).roi, Some(2.0));
        assert_eq!(with_derived(&task("b", 100.0, 0.0)).roi, None);
        assert_eq!(with_derived(&task("c", 100.0, -5.0)).roi, None);
    }

    #[test]
    fn roi_rounds_to_two_decimals() {
        assert_eq!(with_derived(&task("a", 100.0, 3.0)).roi, Some(33.33));
        assert_eq!(with_derived(&task("b", 200.0, 3.0)).roi, Some(66.67));
    }

    #[test]
    fn sort_orders_by_roi_then_priority_then_created_then_id() {
        let mut low_roi = task("z", 60.0, 60.0); // roi 1.00
        low_roi.priority = Priority::High;
        let high_roi = task("y", 100.0, 50.0); // roi 2.00

        let mut tied_high = task("b", 100.0, 50.0); // roi 2.00
        tied_high.priority = Priority::High;

        let mut older = task("d", 100.0, 50.0);
        older.priority = Priority::High;
        older.created_at = at(2025, 2, 20);

        let no_roi = task("a", 100.0, 0.0);

        let derived: Vec<DerivedTask> = [&high_roi, &low_roi, &tied_high, &older, &no_roi]
            .iter()
            .map(|t| with_derived(t))
            .collect();
        let sorted = sort_tasks(&derived);
        let ids: Vec<&str> = sorted.iter().map(|d| d.task.id.as_str()).collect();

        // Among the 2.00 club: High priority first, then the older one,
        // then id order. The ROI-less task goes last.
        assert_eq!(ids, vec!["d", "b", "y", "z", "a"]);
    }

    #[test]
    fn sort_is_idempotent() {
        let derived: Vec<DerivedTask> = [
            task("a", 10.0, 5.0),
            task("b", 10.0, 5.0),
            task("c", 0.0, 0.0),
            task("d", 90.0, 3.0),
        ]
        .iter()
        .map(with_derived)
        .collect();
        let once = sort_tasks(&derived);
        let twice = sort_tasks(&once);
        let once_ids: Vec<&str> = once.iter().map(|d| d.task.id.as_str()).collect();
        let twice_ids: Vec<&str> = twice.iter().map(|d| d.task.id.as_str()).collect();
        assert_eq!(once_ids, twice_ids);
    }

    #[test]
    fn average_roi_of_nothing_is_zero() {
        assert_eq!(average_roi(&[]), 0.0);
        // All time_taken at zero means no finite ROI anywhere.
        assert_eq!(average_roi(&[task("a", 50.0, 0.0), task("b", 80.0, 0.0)]), 0.0);
    }

    #[test]
    fn metrics_example_from_the_dashboard() {
        let tasks = vec![task("a", 100.0, 50.0), task("b", 60.0, 60.0)];
        let derived = derived_sorted(&tasks);
        let rois: Vec<Option<f64>> = derived.iter().map(|d| d.roi).collect();
        assert_eq!(rois, vec![Some(2.0), Some(1.0)]);

        let metrics = compute_metrics(&tasks);
        assert_eq!(metrics.average_roi, 1.5);
        assert_eq!(metrics.total_revenue, 160.0);
        assert_eq!(metrics.total_time_taken, 110.0);
        assert_eq!(metrics.time_efficiency_pct, 2); // round(2 / 110 * 100)
        assert_eq!(metrics.revenue_per_hour, 87); // round(160 / (110 / 60))
        assert_eq!(metrics.performance_grade, PerformanceGrade::NeedsImprovement);
    }

    #[test]
    fn metrics_over_empty_input_match_the_defaults() {
        assert_eq!(compute_metrics(&[]), Metrics::default());
    }

    #[test]
    fn grade_thresholds() {
        assert_eq!(performance_grade(100.0), PerformanceGrade::Excellent);
        assert_eq!(performance_grade(99.99), PerformanceGrade::Good);
        assert_eq!(performance_grade(60.0), PerformanceGrade::Good);
        assert_eq!(performance_grade(59.99), PerformanceGrade::NeedsImprovement);
        assert_eq!(performance_grade(0.0), PerformanceGrade::NeedsImprovement);
    }

    #[test]
    fn funnel_counts_by_status() {
        let mut doing = task("b", 10.0, 10.0);
        doing.status = Status::InProgress;
        let mut done = task("c", 10.0, 10.0);
        done.status = Status::Done;
        let counts = funnel(&[task("a", 10.0, 10.0), doing, done.clone(), done]);
        assert_eq!(
            counts,
            Funnel {
                todo: 1,
                in_progress: 1,
                done: 2,
            }
        );
    }

    #[test]
    fn weekly_throughput_groups_by_monday_start_week() {
        let mut monday = task("a", 10.0, 10.0);
        monday.status = Status::Done;
        monday.completed_at = Some(at(2025, 3, 3)); // Monday

        let mut sunday = task("b", 10.0, 10.0);
        sunday.status = Status::Done;
        sunday.completed_at = Some(at(2025, 3, 9)); // Sunday, same week

        let mut next_week = task("c", 10.0, 10.0);
        next_week.status = Status::Done;
        next_week.completed_at = Some(at(2025, 3, 10)); // the following Monday

        let mut not_done = task("d", 10.0, 10.0);
        not_done.completed_at = Some(at(2025, 3, 3));

        let mut no_stamp = task("e", 10.0, 10.0);
        no_stamp.status = Status::Done;

        let buckets = weekly_throughput(&[monday, sunday, next_week, not_done, no_stamp]);
        assert_eq!(
            buckets,
            vec![
                WeekBucket {
                    week: "2025-W09".to_string(),
                    count: 2,
                },
                WeekBucket {
                    week: "2025-W10".to_string(),
                    count: 1,
                },
            ]
        );
    }

    #[test]
    fn weekly_labels_sort_ascending() {
        let mut early = task("a", 10.0, 10.0);
        early.status = Status::Done;
        early.completed_at = Some(at(2025, 1, 6));
        let mut late = task("b", 10.0, 10.0);
        late.status = Status::Done;
        late.completed_at = Some(at(2025, 10, 6));
        // Insertion order reversed on purpose.
        let buckets = weekly_throughput(&[late, early]);
        let labels: Vec<&str> = buckets.iter().map(|b| b.week.as_str()).collect();
        assert_eq!(labels, vec!["2025-W01", "2025-W40"]);
    }
}
