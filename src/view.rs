//! Filtered and sorted projections of the task list.
//!
//! Every function here works on a borrowed slice and returns a fresh `Vec`;
//! the caller's list is never reordered or mutated.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use icu_collator::{Collator, CollatorOptions};
use serde::{Deserialize, Serialize};

use crate::models::Task;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub const VALUES: [Filter; 3] = [Filter::All, Filter::Active, Filter::Completed];

    pub fn as_str(self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Active => "active",
            Filter::Completed => "completed",
        }
    }

    pub fn matches(self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !task.completed,
            Filter::Completed => task.completed,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    NameAsc,
    NameDesc,
    ActiveFirst,
    CompletedFirst,
}

impl SortOrder {
    pub const VALUES: [SortOrder; 6] = [
        SortOrder::Newest,
        SortOrder::Oldest,
        SortOrder::NameAsc,
        SortOrder::NameDesc,
        SortOrder::ActiveFirst,
        SortOrder::CompletedFirst,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Newest => "newest",
            SortOrder::Oldest => "oldest",
            SortOrder::NameAsc => "name-asc",
            SortOrder::NameDesc => "name-desc",
            SortOrder::ActiveFirst => "active-first",
            SortOrder::CompletedFirst => "completed-first",
        }
    }

    fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            SortOrder::Newest => created_instant(b).cmp(&created_instant(a)),
            SortOrder::Oldest => created_instant(a).cmp(&created_instant(b)),
            SortOrder::NameAsc => compare_text(&a.text, &b.text),
            SortOrder::NameDesc => compare_text(&b.text, &a.text),
            // `false < true`, so incomplete tasks lead.
            SortOrder::ActiveFirst => a.completed.cmp(&b.completed),
            SortOrder::CompletedFirst => b.completed.cmp(&a.completed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseViewError {
    kind: &'static str,
    value: String,
}

impl fmt::Display for ParseViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} `{}`", self.kind, self.value)
    }
}

impl std::error::Error for ParseViewError {}

impl FromStr for Filter {
    type Err = ParseViewError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim().to_ascii_lowercase();
        Filter::VALUES
            .into_iter()
            .find(|filter| filter.as_str() == needle)
            .ok_or_else(|| ParseViewError {
                kind: "filter",
                value: value.to_string(),
            })
    }
}

impl FromStr for SortOrder {
    type Err = ParseViewError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim().to_ascii_lowercase();
        SortOrder::VALUES
            .into_iter()
            .find(|sort| sort.as_str() == needle)
            .ok_or_else(|| ParseViewError {
                kind: "sort order",
                value: value.to_string(),
            })
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filters, then sorts a copy of `tasks`.
pub fn project(tasks: &[Task], filter: Filter, sort: SortOrder) -> Vec<Task> {
    let mut out: Vec<Task> = tasks
        .iter()
        .filter(|task| filter.matches(task))
        .cloned()
        .collect();
    // `sort_by` is stable: ties keep insertion order.
    out.sort_by(|a, b| sort.compare(a, b));
    out
}

/// Milliseconds since the epoch, or `None` when `created_at` cannot be parsed.
/// `None` orders before any instant.
fn created_instant(task: &Task) -> Option<i64> {
    parse_instant(&task.created_at)
}

pub(crate) fn parse_instant(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.timestamp_millis());
    }
    // Date-only strings are read as UTC midnight.
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().timestamp_millis())
}

thread_local! {
    static COLLATOR: Option<Collator> = root_collator();
}

fn root_collator() -> Option<Collator> {
    match Collator::try_new(&Default::default(), CollatorOptions::new()) {
        Ok(collator) => Some(collator),
        Err(error) => {
            log::warn!("view: root collator unavailable, folding case instead: {error}");
            None
        }
    }
}

/// Locale-aware text order using the CLDR root collation: accents and case
/// only break ties between otherwise equal text, lowercase sorts before
/// uppercase, and raw code points decide whatever the collator leaves equal.
pub fn compare_text(a: &str, b: &str) -> Ordering {
    COLLATOR
        .with(|collator| match collator {
            Some(collator) => collator.compare(a, b),
            None => fold_case(a, b),
        })
        .then_with(|| a.cmp(b))
}

fn fold_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| {
            a.chars()
                .map(char::is_uppercase)
                .cmp(b.chars().map(char::is_uppercase))
        })
}
