//! Canonical ordered task list and its mutations.
//!
//! Invalid input (blank text, unknown id) is a no-op, never an error. Each
//! mutation reports what it changed so callers only persist real changes.

use crate::clock::{format_timestamp, Clock, IdAllocator, SystemClock};
use crate::models::{Task, TaskId};

pub struct TaskRepository {
    tasks: Vec<Task>,
    ids: IdAllocator,
    clock: Box<dyn Clock>,
}

impl TaskRepository {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self::with_clock(tasks, Box::new(SystemClock))
    }

    pub fn with_clock(tasks: Vec<Task>, clock: Box<dyn Clock>) -> Self {
        let ids = IdAllocator::seeded(tasks.iter().map(|task| task.id));
        Self { tasks, ids, clock }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn add(&mut self, text: &str) -> Option<&Task> {
        let text = text.trim();
        if text.is_empty() {
            log::debug!("repository: add ignored blank text");
            return None;
        }
        let now = self.clock.now();
        let Some(id) = self.ids.next(now.timestamp_millis()) else {
            log::error!("repository: add ignored, task ids are exhausted");
            return None;
        };
        self.tasks.push(Task {
            id,
            text: text.to_string(),
            completed: false,
            created_at: format_timestamp(now),
        });
        log::info!("repository: added id={id}");
        self.tasks.last()
    }

    pub fn toggle(&mut self, id: TaskId) -> Option<&Task> {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            log::debug!("repository: toggle ignored unknown id={id}");
            return None;
        };
        task.completed = !task.completed;
        log::info!("repository: toggled id={id} completed={}", task.completed);
        Some(&*task)
    }

    pub fn edit(&mut self, id: TaskId, new_text: &str) -> Option<&Task> {
        let new_text = new_text.trim();
        if new_text.is_empty() {
            log::debug!("repository: edit ignored blank text for id={id}");
            return None;
        }
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            log::debug!("repository: edit ignored unknown id={id}");
            return None;
        };
        task.text = new_text.to_string();
        log::info!("repository: edited id={id}");
        Some(&*task)
    }

    pub fn delete(&mut self, id: TaskId) -> Option<Task> {
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            log::debug!("repository: delete ignored unknown id={id}");
            return None;
        };
        log::info!("repository: deleted id={id}");
        Some(self.tasks.remove(index))
    }
}

impl std::fmt::Debug for TaskRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRepository")
            .field("tasks", &self.tasks)
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}
