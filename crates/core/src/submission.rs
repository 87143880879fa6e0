use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::{CreateTaskRequest, Priority, Task, UpdateTaskRequest};
use crate::parser::{parse_title_in, MacroError};

pub const MIN_TITLE_CHARS: usize = 4;

/// Editable form state for a task. `title` is whatever the user typed,
/// directives included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub deadline: Option<DateTime<Utc>>,
    original_deadline: Option<DateTime<Utc>>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            priority: Some(task.priority),
            deadline: task.deadline,
            original_deadline: task.deadline,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("{}", join_macro_errors(.0))]
    Macros(Vec<MacroError>),
    #[error("title must be at least 4 characters")]
    TitleTooShort,
    #[error("deadline cannot be in the past")]
    DeadlineInPast,
}

fn join_macro_errors(errors: &[MacroError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validated field values ready to be sent to the task API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub deadline: Option<DateTime<Utc>>,
}

impl From<Submission> for CreateTaskRequest {
    fn from(submission: Submission) -> Self {
        CreateTaskRequest {
            title: submission.title,
            description: submission.description,
            deadline: submission.deadline,
            priority: submission.priority,
        }
    }
}

impl From<Submission> for UpdateTaskRequest {
    fn from(submission: Submission) -> Self {
        UpdateTaskRequest {
            title: submission.title,
            description: submission.description,
            deadline: submission.deadline,
            priority: submission.priority,
        }
    }
}

/// Re-parse the draft title at submission time and merge the result with
/// the manually chosen fields. Macro values always win over form values.
/// The draft is never modified, so a rejected submission leaves the title
/// exactly as the user typed it.
pub fn prepare_submission<Tz: TimeZone>(
    draft: &TaskDraft,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Result<Submission, SubmissionError> {
    let parsed = parse_title_in(&draft.title, now, tz);
    if !parsed.errors.is_empty() {
        return Err(SubmissionError::Macros(parsed.errors));
    }

    let title = parsed.title.trim().to_string();
    if title.chars().count() < MIN_TITLE_CHARS {
        return Err(SubmissionError::TitleTooShort);
    }

    let deadline = match parsed.deadline {
        Some(from_macro) => Some(from_macro),
        None => {
            if let Some(manual) = draft.deadline {
                if draft.original_deadline != Some(manual) && manual <= now {
                    return Err(SubmissionError::DeadlineInPast);
                }
            }
            draft.deadline
        }
    };

    let priority = parsed.priority.or(draft.priority).unwrap_or_default();

    let description = draft
        .description
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(Submission {
        title,
        description,
        priority,
        deadline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{DirectiveKind, MacroErrorReason};
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn macro_values_override_manual_choices() {
        let mut draft = TaskDraft::new("Ship release !1 !before 24.04.2026");
        draft.priority = Some(Priority::Low);
        draft.deadline = Some(now() + Duration::days(60));

        let submission = prepare_submission(&draft, now(), &Utc).unwrap();
        assert_eq!(submission.title, "Ship release");
        assert_eq!(submission.priority, Priority::Critical);
        assert_eq!(
            submission.deadline,
            Some(Utc.with_ymd_and_hms(2026, 4, 24, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn stale_directive_wins_over_later_manual_change() {
        let mut draft = TaskDraft::new("Write report !2");
        let first = prepare_submission(&draft, now(), &Utc).unwrap();
        assert_eq!(first.priority, Priority::High);

        draft.priority = Some(Priority::Low);
        let second = prepare_submission(&draft, now(), &Utc).unwrap();
        assert_eq!(second.priority, Priority::High);
    }

    #[test]
    fn manual_values_apply_without_directives() {
        let mut draft = TaskDraft::new("Write report");
        draft.priority = Some(Priority::Low);
        let deadline = now() + Duration::days(2);
        draft.deadline = Some(deadline);

        let submission = prepare_submission(&draft, now(), &Utc).unwrap();
        assert_eq!(submission.priority, Priority::Low);
        assert_eq!(submission.deadline, Some(deadline));
    }

    #[test]
    fn defaults_priority_to_medium() {
        let submission = prepare_submission(&TaskDraft::new("Water plants"), now(), &Utc).unwrap();
        assert_eq!(submission.priority, Priority::Medium);
        assert!(submission.deadline.is_none());
    }

    #[test]
    fn macro_errors_block_and_keep_draft_title() {
        let draft = TaskDraft::new("Задача !before 01.01.2000 !9");
        let err = prepare_submission(&draft, now(), &Utc).unwrap_err();

        match &err {
            SubmissionError::Macros(errors) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].kind, DirectiveKind::Deadline);
                assert_eq!(errors[1].reason, MacroErrorReason::UnrecognizedPriority);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.to_string().contains("invalid or past macro deadline"));
        assert_eq!(draft.title, "Задача !before 01.01.2000 !9");
    }

    #[test]
    fn short_titles_are_rejected_after_stripping() {
        let err = prepare_submission(&TaskDraft::new("abc !1"), now(), &Utc).unwrap_err();
        assert_eq!(err, SubmissionError::TitleTooShort);
    }

    #[test]
    fn new_manual_deadline_in_past_is_rejected() {
        let mut draft = TaskDraft::new("Plan vacation");
        draft.deadline = Some(now() - Duration::hours(1));
        assert_eq!(
            prepare_submission(&draft, now(), &Utc).unwrap_err(),
            SubmissionError::DeadlineInPast
        );
    }

    #[test]
    fn unchanged_past_deadline_is_kept_when_editing() {
        let past = now() - Duration::days(3);
        let task = Task {
            id: "t-9".into(),
            title: "Renew passport".into(),
            description: Some("  bring photos ".into()),
            deadline: Some(past),
            is_completed: false,
            completed_at: None,
            priority: Priority::High,
            created_at: now() - Duration::days(10),
            updated_at: None,
            status: None,
        };
        let mut draft = TaskDraft::from_task(&task);
        draft.title = "Renew passport today".into();

        let submission = prepare_submission(&draft, now(), &Utc).unwrap();
        assert_eq!(submission.deadline, Some(past));
        assert_eq!(submission.priority, Priority::High);
        assert_eq!(submission.description.as_deref(), Some("bring photos"));

        let request: UpdateTaskRequest = submission.into();
        assert_eq!(request.title, "Renew passport today");
    }
}
