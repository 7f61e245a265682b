#[macro_use]
extern crate prettytable;

use anyhow::anyhow;
use directories::ProjectDirs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use structopt::StructOpt;

mod cli;
mod interface;
mod loader;
mod logic;
mod model;

use cli::{Command, CommandLineArgs, Filters};
use model::{ActivityLog, Board, DerivedTask, TaskDraft, TaskPatch};

/// Default tasks file, under the platform data directory.
fn find_default_tasks_file() -> Option<PathBuf> {
    if let Some(base_dirs) = ProjectDirs::from("com", "gozque", "taskboard") {
        let root_dir = base_dirs.data_dir();
        if !root_dir.exists() {
            std::fs::create_dir_all(root_dir).ok()?;
        }
        let mut path = PathBuf::from(root_dir);
        path.push("tasks.json");
        Some(path)
    } else {
        None
    }
}

/// The derived, sorted, filtered view every command renders from.
fn view(board: &Board, filters: &Filters) -> Vec<DerivedTask> {
    filters.apply(&logic::derived_sorted(board.tasks()))
}

fn minutes(duration: std::time::Duration) -> f64 {
    duration.as_secs_f64() / 60.0
}

/// Run one session command. Returns false when the session should end.
fn run_command(
    command: Command,
    board: &mut Board,
    activity: &mut ActivityLog,
    tasks_file: &Path,
) -> anyhow::Result<bool> {
    match command {
        Command::List { filters } => interface::list(&view(board, &filters)),
        Command::Metrics { filters } => interface::metrics(&view(board, &filters)),
        Command::Funnel { filters } => interface::funnel_chart(&view(board, &filters)),
        Command::Weekly { filters } => interface::weekly_chart(&view(board, &filters)),
        Command::Activity => interface::activity(activity),
        Command::Add {
            title,
            revenue,
            time,
            priority,
            status,
            notes,
        } => {
            let draft = TaskDraft {
                id: None,
                title,
                revenue,
                time_taken: minutes(time),
                priority,
                status,
                notes,
            };
            interface::add_task(board, activity, draft);
        }
        Command::Edit {
            id,
            title,
            revenue,
            time,
            priority,
            status,
            notes,
        } => {
            let patch = TaskPatch {
                title,
                revenue,
                time_taken: time.map(minutes),
                priority,
                status,
                notes,
            };
            interface::edit_task(board, activity, &id, patch);
        }
        Command::Rm { id } => interface::remove_task(board, activity, &id),
        Command::Undo => interface::undo_delete(board, activity),
        Command::Dismiss => interface::dismiss_deleted(board),
        Command::Export { path, filters } => {
            let view = view(board, &filters);
            interface::export_csv(&path, &view)?;
            println!("Exported {} tasks to {}.", view.len(), path.display());
        }
        Command::Save => {
            loader::save_tasks(tasks_file, board.tasks())?;
            println!("Saved {} tasks.", board.tasks().len());
        }
        Command::Quit => return Ok(false),
    }
    Ok(true)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Get the command-line arguments.
    let CommandLineArgs { tasks_file } = CommandLineArgs::from_args();

    // Unpack the tasks file.
    let tasks_file = tasks_file
        .or_else(find_default_tasks_file)
        .ok_or(anyhow!("Failed to find a tasks file."))?;

    let tasks = loader::load_tasks(&tasks_file)?;
    let mut board = Board::new(tasks);
    let mut activity = ActivityLog::default();

    // Opening view: the metrics bar and the full task table.
    interface::metrics(&view(&board, &Filters::default()));
    interface::list(&view(&board, &Filters::default()));
    println!("Type a command, or \"help\" to list them.");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // end of input
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command = match cli::parse_session_command(line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e.message);
                continue;
            }
        };

        match run_command(command, &mut board, &mut activity, &tasks_file) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => println!("{:#}", e),
        }
    }
    Ok(())
}
