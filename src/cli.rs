use std::cell::RefCell;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::clock::SystemClock;
use crate::commands::{
    add_task_impl, delete_task_impl, edit_task_impl, list_tasks_impl, toggle_task_impl,
    update_settings_impl, CommandCtx, CommandResult,
};
use crate::events::StatePayload;
use crate::logging::init_logging;
use crate::models::{Settings, Task, TaskId, TaskStats};
use crate::state::AppState;
use crate::storage::{FileStore, Storage};
use crate::view::{Filter, SortOrder};

const APP_DIR_NAME: &str = "todo-list";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the stored list, settings and logs
    #[arg(long, global = true, env = "TODO_LIST_DATA_DIR", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
    /// Print command results as JSON
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Append a task
    Add {
        #[arg(value_name = "TEXT", required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Flip a task between active and completed
    Toggle {
        #[arg(value_name = "ID", allow_negative_numbers = true)]
        id: TaskId,
    },
    /// Replace the text of a task
    Edit {
        #[arg(value_name = "ID", allow_negative_numbers = true)]
        id: TaskId,
        #[arg(value_name = "TEXT", required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Remove a task
    Delete {
        #[arg(value_name = "ID", allow_negative_numbers = true)]
        id: TaskId,
    },
    /// Show the filtered and sorted list
    List {
        /// all, active or completed
        #[arg(long)]
        filter: Option<Filter>,
        /// newest, oldest, name-asc, name-desc, active-first or completed-first
        #[arg(long)]
        sort: Option<SortOrder>,
    },
    /// Show task counts
    Stats,
    /// Show or change the default filter and sort
    Config {
        #[arg(long)]
        filter: Option<Filter>,
        #[arg(long)]
        sort: Option<SortOrder>,
    },
}

/// Collects the view pushed by commands so it can be printed afterwards.
#[derive(Default)]
struct CliCommandCtx {
    last: RefCell<Option<StatePayload>>,
}

impl CommandCtx for CliCommandCtx {
    fn emit_state_updated(&self, payload: StatePayload) {
        *self.last.borrow_mut() = Some(payload);
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let data_dir = resolve_data_dir(
        cli.data_dir.clone(),
        std::env::var_os("XDG_DATA_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    );
    if let Err(error) = init_logging(&data_dir) {
        eprintln!("warning: logging disabled: {error}");
    }
    match execute(cli, data_dir) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            log::error!("command failed: {error:#}");
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

/// Runs one command. `Ok(false)` means the command reported a failure.
fn execute(cli: Cli, data_dir: PathBuf) -> anyhow::Result<bool> {
    let store = FileStore::new(data_dir.clone());
    store
        .ensure_dirs()
        .with_context(|| format!("cannot create data directory {}", data_dir.display()))?;
    let mut state = AppState::load(Storage::new(store), Box::new(SystemClock))
        .with_context(|| format!("cannot load tasks from {}", data_dir.display()))?;
    let ctx = CliCommandCtx::default();
    let json = cli.json;

    let ok = match cli.command {
        Commands::Add { text } => {
            let res = add_task_impl(&ctx, &mut state, &text.join(" "));
            report(json, &res, |task| render_change("added", task, "nothing to add"))?
        }
        Commands::Toggle { id } => {
            let res = toggle_task_impl(&ctx, &mut state, id);
            report(json, &res, |task| {
                render_change("toggled", task, &format!("no task with id {id}"))
            })?
        }
        Commands::Edit { id, text } => {
            let res = edit_task_impl(&ctx, &mut state, id, &text.join(" "));
            report(json, &res, |task| {
                render_change("edited", task, &format!("nothing changed for id {id}"))
            })?
        }
        Commands::Delete { id } => {
            let res = delete_task_impl(&ctx, &mut state, id);
            report(json, &res, |deleted| {
                if *deleted {
                    format!("deleted {id}")
                } else {
                    format!("no task with id {id}")
                }
            })?
        }
        Commands::List { filter, sort } => {
            let res = list_tasks_impl(&state, filter, sort);
            report(json, &res, render_payload)?
        }
        Commands::Stats => {
            let res = list_tasks_impl(&state, None, None);
            report(json, &res, |payload| render_stats(&payload.stats))?
        }
        Commands::Config { filter, sort } => {
            if filter.is_none() && sort.is_none() {
                let current = state.settings().clone();
                let res = CommandResult {
                    ok: true,
                    data: Some(current),
                    error: None,
                };
                report(json, &res, render_settings)?
            } else {
                let current = state.settings();
                let next = Settings {
                    filter: filter.unwrap_or(current.filter),
                    sort: sort.unwrap_or(current.sort),
                };
                let res = update_settings_impl(&ctx, &mut state, next);
                report(json, &res, render_settings)?
            }
        }
    };
    if !json {
        if let Some(payload) = ctx.last.borrow_mut().take() {
            println!("{}", render_stats(&payload.stats));
        }
    }
    Ok(ok)
}

fn report<T: Serialize>(
    json: bool,
    res: &CommandResult<T>,
    render: impl FnOnce(&T) -> String,
) -> anyhow::Result<bool> {
    if json {
        println!("{}", serde_json::to_string_pretty(res)?);
        return Ok(res.ok);
    }
    if let Some(data) = &res.data {
        println!("{}", render(data));
    }
    if let Some(error) = &res.error {
        eprintln!("error: {error}");
    }
    Ok(res.ok)
}

/// `--data-dir` / `TODO_LIST_DATA_DIR`, then the XDG data home, then `~/.local/share`.
pub fn resolve_data_dir(
    explicit: Option<PathBuf>,
    xdg_data_home: Option<PathBuf>,
    home: Option<PathBuf>,
) -> PathBuf {
    if let Some(dir) = explicit {
        return dir;
    }
    if let Some(dir) = xdg_data_home.filter(|dir| dir.is_absolute()) {
        return dir.join(APP_DIR_NAME);
    }
    if let Some(home) = home {
        return home.join(".local").join("share").join(APP_DIR_NAME);
    }
    PathBuf::from(format!(".{APP_DIR_NAME}"))
}

/// Escapes control characters so stored text cannot drive the terminal.
fn display_text(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_control() {
                c.escape_default().to_string()
            } else {
                c.to_string()
            }
        })
        .collect()
}

fn render_task(task: &Task) -> String {
    let mark = if task.completed { 'x' } else { ' ' };
    format!("[{mark}] {} {}", task.id, display_text(&task.text))
}

fn render_change(verb: &str, task: &Option<Task>, no_op: &str) -> String {
    match task {
        Some(task) => format!("{verb} {}", render_task(task)),
        None => no_op.to_string(),
    }
}

fn render_stats(stats: &TaskStats) -> String {
    format!(
        "total: {}  active: {}  completed: {}",
        stats.total, stats.active, stats.completed
    )
}

fn render_settings(settings: &Settings) -> String {
    format!("filter: {}  sort: {}", settings.filter, settings.sort)
}

fn render_payload(payload: &StatePayload) -> String {
    let mut lines: Vec<String> = payload.tasks.iter().map(render_task).collect();
    if lines.is_empty() {
        lines.push(format!("no {} tasks", payload.settings.filter));
    }
    lines.push(render_stats(&payload.stats));
    lines.join("\n")
}
