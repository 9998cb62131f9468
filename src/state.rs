use crate::clock::Clock;
use crate::events::StatePayload;
use crate::models::{Settings, Task};
use crate::repository::TaskRepository;
use crate::storage::{KeyValueStore, Storage, StorageError};

/// Session state: the repository (sole owner of the task list), the storage
/// it persists into, and the host's current view selection.
pub struct AppState<S> {
    repo: TaskRepository,
    storage: Storage<S>,
    settings: Settings,
}

impl<S> std::fmt::Debug for AppState<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("repo", &self.repo)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<S: KeyValueStore> AppState<S> {
    pub fn with_clock(
        storage: Storage<S>,
        tasks: Vec<Task>,
        settings: Settings,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            repo: TaskRepository::with_clock(tasks, clock),
            storage,
            settings,
        }
    }

    /// Reads tasks and settings from `storage`. Corrupt data fails the load.
    pub fn load(storage: Storage<S>, clock: Box<dyn Clock>) -> Result<Self, StorageError> {
        let tasks = storage.load_tasks()?;
        let settings = storage.load_settings()?;
        Ok(Self::with_clock(storage, tasks, settings, clock))
    }

    pub fn tasks(&self) -> &[Task] {
        self.repo.tasks()
    }

    pub fn repo(&self) -> &TaskRepository {
        &self.repo
    }

    pub fn repo_mut(&mut self) -> &mut TaskRepository {
        &mut self.repo
    }

    pub fn storage(&self) -> &Storage<S> {
        &self.storage
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn update_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn save_tasks(&self) -> Result<(), StorageError> {
        self.storage.save_tasks(self.repo.tasks())
    }

    pub fn payload(&self) -> StatePayload {
        StatePayload::build(self.repo.tasks(), self.settings.clone())
    }
}
