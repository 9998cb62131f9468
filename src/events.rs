use crate::models::{Settings, Task, TaskStats};
use crate::stats::stats;
use crate::view::project;

/// What a host needs to redraw after a state change.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StatePayload {
    /// The filtered and sorted view.
    pub tasks: Vec<Task>,
    /// Counts over the whole list, independent of the filter.
    pub stats: TaskStats,
    pub settings: Settings,
}

impl StatePayload {
    pub fn build(tasks: &[Task], settings: Settings) -> Self {
        Self {
            tasks: project(tasks, settings.filter, settings.sort),
            stats: stats(tasks),
            settings,
        }
    }
}
