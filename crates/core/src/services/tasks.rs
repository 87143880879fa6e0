use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use thiserror::Error;

use crate::api::{Clock, MemoryTaskApi, TaskApi};
use crate::config::AppConfig;
use crate::model::{ResolvedTask, Task, TaskPage, TaskQuery};
use crate::parser::{parse_title, ParseResult};
use crate::status::{effective_tracking, missing_completion_times, StatusResolver};
use crate::submission::{prepare_submission, SubmissionError, TaskDraft};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Rejected(#[from] SubmissionError),
    #[error("task {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Api(#[from] anyhow::Error),
}

/// Entry point shared by the CLI and the MCP server: owns the task source,
/// the status resolver and the clock every operation samples `now` from.
#[derive(Clone)]
pub struct TasksService {
    api: Arc<dyn TaskApi>,
    resolver: StatusResolver,
    page_size: u32,
    clock: Clock,
}

impl TasksService {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let tasks = match config.seed_path() {
            Some(path) => {
                let tasks = MemoryTaskApi::load_seed(path)?;
                tracing::info!(count = tasks.len(), path = %path.display(), "loaded seed tasks");
                tasks
            }
            None => Vec::new(),
        };
        let tracking = effective_tracking(config.completion_tracking(), &tasks);
        if tracking != config.completion_tracking() {
            tracing::info!(
                missing = missing_completion_times(&tasks),
                "seed has completed tasks without completed_at"
            );
        }
        let resolver = StatusResolver::new(tracking);
        let api = MemoryTaskApi::seeded(tasks).with_resolver(resolver);
        Ok(Self::with_api(Arc::new(api), resolver, config.page_size()))
    }

    pub fn with_api(api: Arc<dyn TaskApi>, resolver: StatusResolver, page_size: u32) -> Self {
        Self {
            api,
            resolver,
            page_size: page_size.max(1),
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub fn resolver(&self) -> &StatusResolver {
        &self.resolver
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn parse(&self, raw: &str) -> ParseResult {
        parse_title(raw, self.now())
    }

    /// Draft pre-filled from an existing task, for editing.
    pub fn draft_for(&self, id: &str) -> Result<Option<TaskDraft>> {
        Ok(self.api.get(id)?.map(|task| TaskDraft::from_task(&task)))
    }

    /// Run the submission workflow and create (`id == None`) or update the task.
    pub fn submit(&self, id: Option<&str>, draft: &TaskDraft) -> Result<ResolvedTask, SubmitError> {
        let now = self.now();
        let submission = prepare_submission(draft, now, &Local)?;
        let task = match id {
            None => self.api.create(submission.into())?,
            Some(id) => self
                .api
                .update(id, submission.into())?
                .ok_or_else(|| SubmitError::NotFound(id.to_string()))?,
        };
        Ok(self.resolve(task, now))
    }

    pub fn get(&self, id: &str) -> Result<Option<ResolvedTask>> {
        let now = self.now();
        Ok(self.api.get(id)?.map(|task| self.resolve(task, now)))
    }

    pub fn set_completion(&self, id: &str, completed: bool) -> Result<Option<ResolvedTask>> {
        let updated = self.api.set_completion(id, completed)?;
        let now = self.now();
        Ok(updated.map(|task| self.resolve(task, now)))
    }

    pub fn delete(&self, id: &str) -> Result<bool> {
        self.api.delete(id)
    }

    pub fn fetch_page(&self, query: &TaskQuery) -> Result<TaskPage> {
        self.api.list(query)
    }

    /// Resolve a batch of tasks against a single sampled instant.
    pub fn resolve_all(&self, tasks: &[Task]) -> Vec<ResolvedTask> {
        self.resolver.resolve_all(tasks, self.now())
    }

    fn resolve(&self, task: Task, now: DateTime<Utc>) -> ResolvedTask {
        ResolvedTask {
            display_status: self.resolver.resolve(&task, now),
            task,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DisplayStatus, FilterSelection, Priority};
    use crate::status::CompletionTracking;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 10, 12, 0, 0).unwrap()
    }

    fn service() -> TasksService {
        let api = MemoryTaskApi::new().with_clock(fixed_now);
        TasksService::with_api(Arc::new(api), StatusResolver::default(), 10).with_clock(fixed_now)
    }

    #[test]
    fn submit_creates_task_from_directives() {
        let service = service();
        let created = service
            .submit(None, &TaskDraft::new("Pay rent !2 !before 01.06.2030"))
            .unwrap();
        assert_eq!(created.task.title, "Pay rent");
        assert_eq!(created.task.priority, Priority::High);
        assert!(created.task.deadline.is_some());
        assert_eq!(created.display_status, DisplayStatus::Active);

        let fetched = service.get(&created.task.id).unwrap().expect("stored");
        assert_eq!(fetched.task, created.task);
    }

    #[test]
    fn submit_rejects_invalid_directive() {
        let err = service()
            .submit(None, &TaskDraft::new("Pay rent !7"))
            .unwrap_err();
        assert!(matches!(err, SubmitError::Rejected(SubmissionError::Macros(_))));
    }

    #[test]
    fn update_keeps_existing_fields_and_reports_missing_task() {
        let service = service();
        let created = service
            .submit(None, &TaskDraft::new("Clean garage !4"))
            .unwrap();

        let mut draft = service.draft_for(&created.task.id).unwrap().expect("draft");
        draft.title = "Clean garage and attic".into();
        let updated = service.submit(Some(&created.task.id), &draft).unwrap();
        assert_eq!(updated.task.priority, Priority::Low);
        assert_eq!(updated.task.title, "Clean garage and attic");

        let err = service.submit(Some("missing"), &draft).unwrap_err();
        assert!(matches!(err, SubmitError::NotFound(ref id) if id == "missing"));
    }

    #[test]
    fn completion_after_deadline_resolves_late() {
        let api = MemoryTaskApi::seeded(vec![Task {
            id: "t-1".into(),
            title: "File taxes".into(),
            description: None,
            deadline: Some(fixed_now() - Duration::days(1)),
            is_completed: false,
            completed_at: None,
            priority: Priority::Critical,
            created_at: fixed_now() - Duration::days(30),
            updated_at: None,
            status: Some("pending".into()),
        }])
        .with_clock(fixed_now);
        let service =
            TasksService::with_api(Arc::new(api), StatusResolver::default(), 10).with_clock(fixed_now);

        let done = service.set_completion("t-1", true).unwrap().expect("exists");
        assert_eq!(done.display_status, DisplayStatus::Late);
        let reopened = service.set_completion("t-1", false).unwrap().expect("exists");
        assert_eq!(reopened.display_status, DisplayStatus::Overdue);
        assert!(service.set_completion("nope", true).unwrap().is_none());
    }

    #[test]
    fn fetch_page_and_delete() {
        let service = service();
        let created = service
            .submit(None, &TaskDraft::new("Renew library card"))
            .unwrap();
        let page = service
            .fetch_page(&TaskQuery {
                selection: FilterSelection::default(),
                page: 1,
                page_size: service.page_size(),
            })
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(service.resolve_all(&page.items)[0].display_status, DisplayStatus::Active);

        assert!(service.delete(&created.task.id).unwrap());
        assert!(service.get(&created.task.id).unwrap().is_none());
    }

    fn service_over_seed(seed: &str) -> (TempDir, TasksService) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("tasks.json"), seed).unwrap();
        let config = AppConfig::from_lookup(dir.path().to_path_buf(), |_| None).unwrap();
        let service = TasksService::new(&config).unwrap().with_clock(fixed_now);
        (dir, service)
    }

    fn by_status(status: DisplayStatus) -> TaskQuery {
        TaskQuery {
            selection: FilterSelection {
                status: Some(status),
                ..FilterSelection::default()
            },
            page: 1,
            page_size: 10,
        }
    }

    #[test]
    fn seed_without_completion_times_degrades_tracking() {
        let (_dir, service) = service_over_seed(
            r#"[
                {"id": "1", "title": "Send invoice", "deadline": "2026-04-05T00:00:00Z", "is_completed": true, "created_at": "2026-04-01T00:00:00Z"},
                {"id": "2", "title": "Call bank", "deadline": "2026-04-05T00:00:00Z", "is_completed": true, "completed_at": "2026-04-07T00:00:00Z", "created_at": "2026-04-01T00:00:00Z"}
            ]"#,
        );
        assert_eq!(service.resolver().tracking(), CompletionTracking::Unavailable);

        let completed = service.fetch_page(&by_status(DisplayStatus::Completed)).unwrap();
        assert_eq!(completed.items.len(), 2);
        let statuses: Vec<_> = service
            .resolve_all(&completed.items)
            .iter()
            .map(|r| r.display_status)
            .collect();
        assert_eq!(statuses, vec![DisplayStatus::Completed, DisplayStatus::Completed]);
        assert!(service
            .fetch_page(&by_status(DisplayStatus::Late))
            .unwrap()
            .items
            .is_empty());
    }

    #[test]
    fn seed_with_completion_times_keeps_recorded_tracking() {
        let (_dir, service) = service_over_seed(
            r#"[
                {"id": "2", "title": "Call bank", "deadline": "2026-04-05T00:00:00Z", "is_completed": true, "completed_at": "2026-04-07T00:00:00Z", "created_at": "2026-04-01T00:00:00Z"}
            ]"#,
        );
        assert_eq!(service.resolver().tracking(), CompletionTracking::Recorded);

        let late = service.fetch_page(&by_status(DisplayStatus::Late)).unwrap();
        assert_eq!(late.items.len(), 1);
        assert_eq!(service.resolve_all(&late.items)[0].display_status, DisplayStatus::Late);
    }
}
