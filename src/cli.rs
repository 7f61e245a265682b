use crate::model::{DerivedTask, Priority, Status};
use humantime::parse_duration;
use std::path::PathBuf;
use std::time::Duration;
use structopt::clap;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "taskboard", about = "A sales task dashboard for the terminal.")]
pub struct CommandLineArgs {
    /// Use a different tasks file.
    #[structopt(parse(from_os_str), short, long)]
    pub tasks_file: Option<PathBuf>,
}

/// Filters applied to the derived view before rendering or export.
#[derive(Debug, Clone, Default, StructOpt)]
pub struct Filters {
    /// Keep only tasks with this status.
    #[structopt(short, long, parse(try_from_str))]
    pub status: Option<Status>,

    /// Keep only tasks with this priority.
    #[structopt(short, long, parse(try_from_str))]
    pub priority: Option<Priority>,

    /// Keep only tasks whose title contains this text (case insensitive).
    #[structopt(short, long)]
    pub query: Option<String>,
}

impl Filters {
    /// Apply to an already derived and sorted view.
    pub fn apply(&self, view: &[DerivedTask]) -> Vec<DerivedTask> {
        view.iter()
            .filter(|derived| self.keep(derived))
            .cloned()
            .collect()
    }

    fn keep(&self, derived: &DerivedTask) -> bool {
        if let Some(query) = &self.query {
            if !derived
                .task
                .title
                .to_lowercase()
                .contains(&query.to_lowercase())
            {
                return false;
            }
        }
        if let Some(status) = self.status {
            if derived.task.status != status {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if derived.task.priority != priority {
                return false;
            }
        }
        true
    }
}

/// Commands available inside the dashboard session.
#[derive(Debug, StructOpt)]
#[structopt(name = "taskboard", about = "Session commands.")]
pub enum Command {
    /// Show the task table.
    List {
        #[structopt(flatten)]
        filters: Filters,
    },
    /// Show the metrics bar.
    Metrics {
        #[structopt(flatten)]
        filters: Filters,
    },
    /// Show the status funnel.
    Funnel {
        #[structopt(flatten)]
        filters: Filters,
    },
    /// Show weekly completed-task throughput.
    Weekly {
        #[structopt(flatten)]
        filters: Filters,
    },
    /// Show the session activity log.
    Activity,
    /// Add a task to the board.
    Add {
        /// The task title.
        title: String,

        /// Expected revenue.
        #[structopt(short, long, default_value = "0")]
        revenue: f64,

        /// Time taken, e.g. "45m" or "2h 30m".
        #[structopt(short, long, parse(try_from_str = parse_duration), default_value = "1m")]
        time: Duration,

        /// Task priority (high, medium, low).
        #[structopt(short, long, parse(try_from_str), default_value = "medium")]
        priority: Priority,

        /// Task status (todo, in-progress, done).
        #[structopt(short, long, parse(try_from_str), default_value = "todo")]
        status: Status,

        /// Free-form notes.
        #[structopt(short, long)]
        notes: Option<String>,
    },
    /// Edit fields of a task by id.
    Edit {
        /// Id of the task to edit.
        id: String,

        /// New title.
        #[structopt(long)]
        title: Option<String>,

        /// New revenue.
        #[structopt(short, long)]
        revenue: Option<f64>,

        /// New time taken, e.g. "45m".
        #[structopt(short, long, parse(try_from_str = parse_duration))]
        time: Option<Duration>,

        /// New priority.
        #[structopt(short, long, parse(try_from_str))]
        priority: Option<Priority>,

        /// New status.
        #[structopt(short, long, parse(try_from_str))]
        status: Option<Status>,

        /// New notes.
        #[structopt(short, long)]
        notes: Option<String>,
    },
    /// Remove a task by id; it sticks around for one undo.
    Rm {
        /// Id of the task to remove.
        id: String,
    },
    /// Restore the last deleted task.
    Undo,
    /// Drop the last deleted task for good.
    Dismiss,
    /// Export the filtered view as CSV.
    Export {
        /// Output file.
        #[structopt(parse(from_os_str), default_value = "tasks.csv")]
        path: PathBuf,

        #[structopt(flatten)]
        filters: Filters,
    },
    /// Write the board back to the tasks file.
    Save,
    /// Leave the dashboard.
    Quit,
}

/// Parse one session input line into a command. Errors carry the usage
/// or help text clap would print for a real command line.
pub fn parse_session_command(line: &str) -> Result<Command, clap::Error> {
    let words = tokenize(line);
    Command::from_iter_safe(std::iter::once("taskboard".to_string()).chain(words))
}

/// Split a session line into arguments, honoring double quotes so
/// titles and notes can hold spaces.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        args.push(current);
    }
    args
}
