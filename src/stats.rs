use crate::models::{Task, TaskStats};

pub fn stats(tasks: &[Task]) -> TaskStats {
    let completed = tasks.iter().filter(|task| task.completed).count();
    TaskStats {
        total: tasks.len(),
        active: tasks.len() - completed,
        completed,
    }
}
