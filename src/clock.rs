use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::TaskId;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Formats an instant the way stored tasks carry it: `2024-01-01T09:30:00.000Z`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Hands out strictly increasing task ids derived from the clock.
///
/// An id is the current epoch-millisecond reading unless that would not exceed
/// the previous id, in which case it is the previous id plus one. Two tasks
/// created inside the same millisecond therefore never collide. Once the
/// previous id is `TaskId::MAX` the allocator is exhausted and yields `None`.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    last: Option<TaskId>,
}

impl IdAllocator {
    /// Seeds the allocator so that new ids stay above every id in `existing`.
    pub fn seeded<I: IntoIterator<Item = TaskId>>(existing: I) -> Self {
        Self {
            last: existing.into_iter().max(),
        }
    }

    pub fn next(&mut self, now_millis: i64) -> Option<TaskId> {
        let id = match self.last {
            Some(last) if now_millis <= last => last.checked_add(1)?,
            _ => now_millis,
        };
        self.last = Some(id);
        Some(id)
    }
}
