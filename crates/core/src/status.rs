use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{DisplayStatus, ResolvedTask, Task};

/// Whether the task source records the instant completion was toggled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompletionTracking {
    #[default]
    Recorded,
    Unavailable,
}

impl CompletionTracking {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionTracking::Recorded => "recorded",
            CompletionTracking::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for CompletionTracking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CompletionTracking {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recorded" => Ok(CompletionTracking::Recorded),
            "unavailable" | "none" => Ok(CompletionTracking::Unavailable),
            other => Err(anyhow!(
                "Unknown completion tracking '{}': expected recorded|unavailable",
                other
            )),
        }
    }
}

/// Derive the display status of a task.
///
/// `now == deadline` still counts as on time. A completed task with a
/// deadline is `Late` only when `completed_at` is known and falls after the
/// deadline; without it the task is reported as `Completed`.
pub fn resolve_status(
    deadline: Option<DateTime<Utc>>,
    is_completed: bool,
    completed_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> DisplayStatus {
    match (is_completed, deadline) {
        (false, None) => DisplayStatus::Active,
        (false, Some(deadline)) if now <= deadline => DisplayStatus::Active,
        (false, Some(_)) => DisplayStatus::Overdue,
        (true, None) => DisplayStatus::Completed,
        (true, Some(deadline)) => match completed_at {
            Some(done) if done > deadline => DisplayStatus::Late,
            _ => DisplayStatus::Completed,
        },
    }
}

/// Records that are completed with a deadline but carry no `completed_at`.
/// Any of them means the source cannot tell COMPLETED from LATE.
pub fn missing_completion_times(tasks: &[Task]) -> usize {
    tasks
        .iter()
        .filter(|t| t.is_completed && t.deadline.is_some() && t.completed_at.is_none())
        .count()
}

/// Tracking mode to run with for `tasks`: `configured`, downgraded to
/// `Unavailable` when some completed records lack their completion time.
pub fn effective_tracking(configured: CompletionTracking, tasks: &[Task]) -> CompletionTracking {
    if missing_completion_times(tasks) > 0 {
        CompletionTracking::Unavailable
    } else {
        configured
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatusResolver {
    tracking: CompletionTracking,
}

impl StatusResolver {
    pub fn new(tracking: CompletionTracking) -> Self {
        if tracking == CompletionTracking::Unavailable {
            tracing::warn!(
                "task source does not record completion time; LATE status cannot be detected"
            );
        }
        Self { tracking }
    }

    pub fn tracking(&self) -> CompletionTracking {
        self.tracking
    }

    pub fn resolve(&self, task: &Task, now: DateTime<Utc>) -> DisplayStatus {
        let completed_at = match self.tracking {
            CompletionTracking::Recorded => task.completed_at,
            CompletionTracking::Unavailable => None,
        };
        resolve_status(task.deadline, task.is_completed, completed_at, now)
    }

    /// Resolve every task against the same instant so a single render pass
    /// stays consistent.
    pub fn resolve_all(&self, tasks: &[Task], now: DateTime<Utc>) -> Vec<ResolvedTask> {
        tasks
            .iter()
            .map(|task| ResolvedTask {
                display_status: self.resolve(task, now),
                task: task.clone(),
            })
            .collect()
    }
}

/// Toggle completion, stamping or clearing `completed_at`. Returns `false`
/// when the task was already in the requested state.
pub fn toggle_completion(task: &mut Task, completed: bool, now: DateTime<Utc>) -> bool {
    if task.is_completed == completed {
        return false;
    }
    task.is_completed = completed;
    task.completed_at = completed.then_some(now);
    task.updated_at = Some(now);
    true
}
