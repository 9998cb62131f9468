use crate::events::StatePayload;
use crate::models::{Settings, Task, TaskId};
use crate::state::AppState;
use crate::storage::{KeyValueStore, StorageError};
use crate::view::{Filter, SortOrder};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CommandResult<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

/// Host side of a command: receives the recomputed view after every change.
pub trait CommandCtx {
    fn emit_state_updated(&self, payload: StatePayload);
}

fn ok<T>(data: T) -> CommandResult<T> {
    CommandResult {
        ok: true,
        data: Some(data),
        error: None,
    }
}

fn err<T>(message: &str) -> CommandResult<T> {
    CommandResult {
        ok: false,
        data: None,
        error: Some(message.to_string()),
    }
}

/// The change happened in memory but was not written to storage.
fn unsaved<T>(data: T, error: &StorageError) -> CommandResult<T> {
    CommandResult {
        ok: false,
        data: Some(data),
        error: Some(format!("storage error: {error}")),
    }
}

fn publish<S: KeyValueStore>(ctx: &impl CommandCtx, state: &AppState<S>) {
    ctx.emit_state_updated(state.payload());
}

/// Saves the task list, then pushes the new view whether or not the save
/// succeeded: the in-memory list stays authoritative.
fn persist<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &AppState<S>,
) -> Result<(), StorageError> {
    let saved = state.save_tasks();
    if let Err(error) = &saved {
        log::warn!("persist: failed to save tasks: {error}");
    }
    publish(ctx, state);
    saved
}

fn finish<S: KeyValueStore, T>(
    ctx: &impl CommandCtx,
    state: &AppState<S>,
    data: T,
) -> CommandResult<T> {
    match persist(ctx, state) {
        Ok(()) => ok(data),
        Err(error) => unsaved(data, &error),
    }
}

pub fn load_state_impl<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &AppState<S>,
) -> CommandResult<StatePayload> {
    let payload = state.payload();
    ctx.emit_state_updated(payload.clone());
    ok(payload)
}

pub fn add_task_impl<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &mut AppState<S>,
    text: &str,
) -> CommandResult<Option<Task>> {
    let Some(task) = state.repo_mut().add(text).cloned() else {
        return ok(None);
    };
    finish(ctx, state, Some(task))
}

pub fn toggle_task_impl<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &mut AppState<S>,
    task_id: TaskId,
) -> CommandResult<Option<Task>> {
    let Some(task) = state.repo_mut().toggle(task_id).cloned() else {
        return ok(None);
    };
    finish(ctx, state, Some(task))
}

pub fn edit_task_impl<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &mut AppState<S>,
    task_id: TaskId,
    text: &str,
) -> CommandResult<Option<Task>> {
    let Some(task) = state.repo_mut().edit(task_id, text).cloned() else {
        return ok(None);
    };
    finish(ctx, state, Some(task))
}

pub fn delete_task_impl<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &mut AppState<S>,
    task_id: TaskId,
) -> CommandResult<bool> {
    if state.repo_mut().delete(task_id).is_none() {
        return ok(false);
    }
    finish(ctx, state, true)
}

/// Projects the list without touching storage. `None` falls back to the
/// persisted selection.
pub fn list_tasks_impl<S: KeyValueStore>(
    state: &AppState<S>,
    filter: Option<Filter>,
    sort: Option<SortOrder>,
) -> CommandResult<StatePayload> {
    let current = state.settings();
    let settings = Settings {
        filter: filter.unwrap_or(current.filter),
        sort: sort.unwrap_or(current.sort),
    };
    ok(StatePayload::build(state.tasks(), settings))
}

pub fn update_settings_impl<S: KeyValueStore>(
    ctx: &impl CommandCtx,
    state: &mut AppState<S>,
    settings: Settings,
) -> CommandResult<Settings> {
    let previous = state.settings().clone();
    state.update_settings(settings.clone());
    if let Err(error) = state.storage().save_settings(&settings) {
        // Keep the running session consistent with what is on disk.
        state.update_settings(previous);
        log::warn!("settings: failed to save: {error}");
        return err(&format!("storage error: {error}"));
    }
    log::info!(
        "settings: filter={} sort={}",
        settings.filter,
        settings.sort
    );
    publish(ctx, state);
    ok(settings)
}
