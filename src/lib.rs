//! Single-user task list: an owned, ordered list of tasks, pure filter/sort
//! projections over it, and persistence into a string key-value store.

mod clock;
mod commands;
mod events;
mod logging;
mod models;
mod repository;
mod state;
mod stats;
mod storage;
mod view;
#[cfg(feature = "app")]
mod cli;

pub use crate::clock::{format_timestamp, Clock, IdAllocator, SystemClock};
pub use crate::commands::{
    add_task_impl, delete_task_impl, edit_task_impl, list_tasks_impl, load_state_impl,
    toggle_task_impl, update_settings_impl, CommandCtx, CommandResult,
};
pub use crate::events::StatePayload;
pub use crate::logging::{log_directory, log_spec};
pub use crate::models::{Settings, SettingsFile, Task, TaskId, TaskStats};
pub use crate::repository::TaskRepository;
pub use crate::state::AppState;
pub use crate::stats::stats;
pub use crate::storage::{
    FileStore, KeyValueStore, MemoryStore, Storage, StorageError, SCHEMA_VERSION, SETTINGS_KEY,
    TASKS_KEY,
};
pub use crate::view::{compare_text, project, Filter, ParseViewError, SortOrder};

#[cfg(feature = "app")]
pub use crate::cli::run;
