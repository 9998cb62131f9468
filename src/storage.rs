use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{Settings, SettingsFile, Task};

pub const TASKS_KEY: &str = "todos";
pub const SETTINGS_KEY: &str = "settings";
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Serialize(serde_json::Error),
    /// The value stored under `key` is not valid JSON of the expected shape.
    Corrupt {
        key: String,
        source: serde_json::Error,
    },
    /// The value parsed but breaks a task-list invariant.
    InvalidData { key: String, message: String },
    InvalidKey(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::Serialize(err) => write!(f, "json error: {err}"),
            StorageError::Corrupt { key, source } => {
                write!(f, "corrupt storage under `{key}`: {source}")
            }
            StorageError::InvalidData { key, message } => {
                write!(f, "invalid data under `{key}`: {message}")
            }
            StorageError::InvalidKey(key) => write!(f, "invalid storage key `{key}`"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(err) => Some(err),
            StorageError::Serialize(err) => Some(err),
            StorageError::Corrupt { source, .. } => Some(source),
            StorageError::InvalidData { .. } | StorageError::InvalidKey(_) => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        StorageError::Io(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        StorageError::Serialize(value)
    }
}

impl StorageError {
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            StorageError::Corrupt { .. } | StorageError::InvalidData { .. }
        )
    }
}

/// Opaque string key-value store the task list is persisted into.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

/// One JSON file per key under `root`, replaced atomically on every write.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }

    fn write_atomic(&self, path: PathBuf, bytes: &[u8]) -> Result<(), StorageError> {
        let temp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(temp_path, path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        self.write_atomic(path, value.as_bytes())
    }
}

/// In-process store. Writes can be made to fail to simulate a full disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
    fail_writes: RefCell<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        store
    }

    pub fn set_write_error(&self, message: Option<&str>) {
        *self.fail_writes.borrow_mut() = message.map(|s| s.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(message) = self.fail_writes.borrow().clone() {
            return Err(StorageError::Io(std::io::Error::other(message)));
        }
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Serializes the task list and settings into a [`KeyValueStore`].
pub struct Storage<S> {
    store: S,
}

impl<S: KeyValueStore> Storage<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reads the task list. A missing key is an empty list; anything that does
    /// not decode to a valid list is an error rather than a partial result.
    pub fn load_tasks(&self) -> Result<Vec<Task>, StorageError> {
        let tasks: Vec<Task> = match self.load_json(TASKS_KEY)? {
            Some(tasks) => tasks,
            None => return Ok(Vec::new()),
        };
        validate_tasks(&tasks)?;
        log::debug!("storage: loaded {} tasks", tasks.len());
        Ok(tasks)
    }

    pub fn save_tasks(&self, tasks: &[Task]) -> Result<(), StorageError> {
        self.write_json(TASKS_KEY, &tasks)?;
        log::debug!("storage: saved {} tasks", tasks.len());
        Ok(())
    }

    pub fn load_settings(&self) -> Result<Settings, StorageError> {
        let file: Option<SettingsFile> = self.load_json(SETTINGS_KEY)?;
        Ok(file.map(|file| file.settings).unwrap_or_default())
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        let file = SettingsFile {
            schema_version: SCHEMA_VERSION,
            settings: settings.clone(),
        };
        self.write_json(SETTINGS_KEY, &file)
    }

    fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                key: key.to_string(),
                source,
            })
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &str, data: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(data)?;
        self.store.set(key, &json)
    }
}

fn validate_tasks(tasks: &[Task]) -> Result<(), StorageError> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen.insert(task.id) {
            return Err(StorageError::InvalidData {
                key: TASKS_KEY.to_string(),
                message: format!("duplicate task id {}", task.id),
            });
        }
        if task.text.trim().is_empty() {
            return Err(StorageError::InvalidData {
                key: TASKS_KEY.to_string(),
                message: format!("task {} has blank text", task.id),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{Filter, SortOrder};

    fn make_task(id: i64, text: &str, completed: bool) -> Task {
        Task {
            id,
            text: text.to_string(),
            completed,
            created_at: format!("2024-01-0{}T00:00:00.000Z", (id % 9) + 1),
        }
    }

    #[test]
    fn load_missing_key_is_empty_list() {
        let storage = Storage::new(MemoryStore::new());
        assert!(storage.load_tasks().unwrap().is_empty());
        assert_eq!(storage.load_settings().unwrap(), Settings::default());
    }

    #[test]
    fn save_then_load_preserves_order_and_fields() {
        let storage = Storage::new(MemoryStore::new());
        let tasks = vec![
            make_task(3, "third", true),
            make_task(1, "first", false),
            make_task(2, "  padded  ", false),
        ];
        storage.save_tasks(&tasks).unwrap();
        assert_eq!(storage.load_tasks().unwrap(), tasks);
    }

    #[test]
    fn save_writes_a_json_array_under_todos() {
        let storage = Storage::new(MemoryStore::new());
        storage.save_tasks(&[make_task(1, "A", false)]).unwrap();
        let raw = storage.store().raw(TASKS_KEY).expect("value stored");
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{
              "id": 1,
              "text": "A",
              "completed": false,
              "createdAt": "2024-01-02T00:00:00.000Z"
            }])
        );
    }

    #[test]
    fn save_overwrites_previous_value() {
        let storage = Storage::new(MemoryStore::new());
        storage
            .save_tasks(&[make_task(1, "a", false), make_task(2, "b", false)])
            .unwrap();
        storage.save_tasks(&[make_task(2, "b", true)]).unwrap();
        assert_eq!(storage.load_tasks().unwrap(), vec![make_task(2, "b", true)]);
    }

    #[test]
    fn reads_lists_written_by_earlier_versions() {
        let raw = r#"[
          {"id":1700000000000,"text":"Buy milk","completed":false,"createdAt":"2023-11-14T22:13:20.000Z"},
          {"id":1700000000500,"text":"Walk dog","createdAt":"2023-11-14T22:13:20.500Z"}
        ]"#;
        let storage = Storage::new(MemoryStore::with_entry(TASKS_KEY, raw));
        let tasks = storage.load_tasks().unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, 1_700_000_000_000);
        assert!(!tasks[1].completed);
    }

    #[test]
    fn malformed_json_is_a_corrupt_error() {
        for raw in ["not json", "{\"id\":1}", "[{\"id\":\"x\",\"text\":\"a\"}]", ""] {
            let storage = Storage::new(MemoryStore::with_entry(TASKS_KEY, raw));
            let err = storage.load_tasks().unwrap_err();
            assert!(
                matches!(&err, StorageError::Corrupt { key, .. } if key == TASKS_KEY),
                "unexpected error for {raw:?}: {err}"
            );
            assert!(err.is_corrupt());
            assert!(std::error::Error::source(&err).is_some());
        }
    }

    #[test]
    fn duplicate_ids_or_blank_text_are_invalid_data() {
        let duplicate =
            serde_json::to_string(&vec![make_task(1, "a", false), make_task(1, "b", false)])
                .unwrap();
        let storage = Storage::new(MemoryStore::with_entry(TASKS_KEY, &duplicate));
        let err = storage.load_tasks().unwrap_err();
        assert!(matches!(err, StorageError::InvalidData { .. }));
        assert!(err.to_string().contains("duplicate task id 1"));

        let blank = serde_json::to_string(&vec![make_task(1, "  ", false)]).unwrap();
        let storage = Storage::new(MemoryStore::with_entry(TASKS_KEY, &blank));
        assert!(matches!(
            storage.load_tasks().unwrap_err(),
            StorageError::InvalidData { .. }
        ));
    }

    #[test]
    fn write_failure_is_reported() {
        let store = MemoryStore::new();
        store.set_write_error(Some("quota exceeded"));
        let storage = Storage::new(&store);
        let err = storage.save_tasks(&[make_task(1, "a", false)]).unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
        assert!(err.to_string().contains("quota exceeded"));
        assert!(store.raw(TASKS_KEY).is_none());

        store.set_write_error(None);
        storage.save_tasks(&[make_task(1, "a", false)]).unwrap();
        assert!(store.raw(TASKS_KEY).is_some());
    }

    #[test]
    fn settings_round_trip_with_schema_version() {
        let storage = Storage::new(MemoryStore::new());
        let settings = Settings {
            filter: Filter::Active,
            sort: SortOrder::NameAsc,
        };
        storage.save_settings(&settings).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&storage.store().raw(SETTINGS_KEY).unwrap()).unwrap();
        assert_eq!(raw["schema_version"], serde_json::json!(SCHEMA_VERSION));
        assert_eq!(storage.load_settings().unwrap(), settings);
    }

    #[test]
    fn corrupt_settings_are_reported() {
        let storage = Storage::new(MemoryStore::with_entry(SETTINGS_KEY, "{"));
        assert!(storage.load_settings().unwrap_err().is_corrupt());
    }

    #[test]
    fn file_store_round_trip_and_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));
        store.ensure_dirs().unwrap();
        assert_eq!(store.get(TASKS_KEY).unwrap(), None);

        let storage = Storage::new(store);
        let tasks = vec![make_task(1, "a", false), make_task(2, "b", true)];
        storage.save_tasks(&tasks).unwrap();
        assert!(dir.path().join("nested").join("todos.json").exists());
        assert!(!dir.path().join("nested").join("todos.tmp").exists());
        assert_eq!(storage.load_tasks().unwrap(), tasks);
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf());
        for key in ["", "../todos", "a/b", "a.b"] {
            assert!(matches!(store.get(key), Err(StorageError::InvalidKey(_))));
            assert!(matches!(store.set(key, "x"), Err(StorageError::InvalidKey(_))));
        }
    }

    #[test]
    fn file_store_write_into_missing_dir_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("never-created"));
        assert!(matches!(store.set(TASKS_KEY, "[]"), Err(StorageError::Io(_))));
    }
}
