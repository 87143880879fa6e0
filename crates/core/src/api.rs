use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use ulid::Ulid;

use crate::model::{
    CreateTaskRequest, FilterSelection, PaginationMeta, SortField, SortOrder, Task, TaskPage,
    TaskQuery, UpdateTaskRequest,
};
use crate::status::{toggle_completion, StatusResolver};

/// Typed boundary to the remote task store.
pub trait TaskApi: Send + Sync {
    fn list(&self, query: &TaskQuery) -> Result<TaskPage>;
    fn get(&self, id: &str) -> Result<Option<Task>>;
    fn create(&self, request: CreateTaskRequest) -> Result<Task>;
    fn update(&self, id: &str, request: UpdateTaskRequest) -> Result<Option<Task>>;
    fn set_completion(&self, id: &str, completed: bool) -> Result<Option<Task>>;
    fn delete(&self, id: &str) -> Result<bool>;
}

pub type Clock = fn() -> DateTime<Utc>;

/// In-process implementation of [`TaskApi`] that behaves like the remote
/// store: server-side filtering, sorting and pagination over an in-memory
/// list. Status filters use the same [`StatusResolver`] the service
/// renders with.
pub struct MemoryTaskApi {
    tasks: RwLock<Vec<Task>>,
    resolver: StatusResolver,
    clock: Clock,
}

impl MemoryTaskApi {
    pub fn new() -> Self {
        Self::seeded(Vec::new())
    }

    pub fn seeded(tasks: Vec<Task>) -> Self {
        Self {
            tasks: RwLock::new(tasks),
            resolver: StatusResolver::default(),
            clock: Utc::now,
        }
    }

    pub fn with_resolver(mut self, resolver: StatusResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Read a JSON array of tasks, as exported by the remote API.
    pub fn load_seed(path: &Path) -> Result<Vec<Task>> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed tasks from {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse seed tasks in {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }
}

impl Default for MemoryTaskApi {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskApi for MemoryTaskApi {
    fn list(&self, query: &TaskQuery) -> Result<TaskPage> {
        ensure!(query.page >= 1, "page must be at least 1, got {}", query.page);
        ensure!(
            query.page_size >= 1,
            "page_size must be at least 1, got {}",
            query.page_size
        );
        let now = (self.clock)();
        let mut matching: Vec<Task> = self
            .tasks
            .read()
            .iter()
            .filter(|task| matches_selection(task, &query.selection, &self.resolver, now))
            .cloned()
            .collect();
        matching.sort_by(|a, b| compare_tasks(a, b, &query.selection));

        let page_size = query.page_size;
        let page = query.page;
        let total = matching.len() as u64;
        let total_pages = total.div_ceil(u64::from(page_size)).max(1) as u32;
        let skip = (page as usize - 1).saturating_mul(page_size as usize);
        let items = matching
            .into_iter()
            .skip(skip)
            .take(page_size as usize)
            .collect();

        Ok(TaskPage {
            items,
            meta: PaginationMeta {
                page,
                page_size,
                total,
                total_pages,
            },
        })
    }

    fn get(&self, id: &str) -> Result<Option<Task>> {
        Ok(self.tasks.read().iter().find(|t| t.id == id).cloned())
    }

    fn create(&self, request: CreateTaskRequest) -> Result<Task> {
        let task = Task {
            id: Ulid::new().to_string(),
            title: request.title,
            description: request.description,
            deadline: request.deadline,
            is_completed: false,
            completed_at: None,
            priority: request.priority,
            created_at: (self.clock)(),
            updated_at: None,
            status: None,
        };
        self.tasks.write().push(task.clone());
        Ok(task)
    }

    fn update(&self, id: &str, request: UpdateTaskRequest) -> Result<Option<Task>> {
        let now = (self.clock)();
        let mut tasks = self.tasks.write();
        let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        task.title = request.title;
        task.description = request.description;
        task.deadline = request.deadline;
        task.priority = request.priority;
        task.updated_at = Some(now);
        Ok(Some(task.clone()))
    }

    fn set_completion(&self, id: &str, completed: bool) -> Result<Option<Task>> {
        let now = (self.clock)();
        let mut tasks = self.tasks.write();
        let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        toggle_completion(task, completed, now);
        Ok(Some(task.clone()))
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let mut tasks = self.tasks.write();
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        Ok(tasks.len() != before)
    }
}

fn matches_selection(
    task: &Task,
    selection: &FilterSelection,
    resolver: &StatusResolver,
    now: DateTime<Utc>,
) -> bool {
    if let Some(priority) = selection.priority {
        if task.priority != priority {
            return false;
        }
    }
    if let Some(status) = selection.status {
        if resolver.resolve(task, now) != status {
            return false;
        }
    }
    true
}

fn compare_tasks(a: &Task, b: &Task, selection: &FilterSelection) -> Ordering {
    let field = selection.sort_field.unwrap_or(SortField::CreatedAt);
    let order = selection.sort_order.unwrap_or(SortOrder::Desc);

    let primary = match field {
        SortField::CreatedAt => directed(a.created_at.cmp(&b.created_at), order),
        SortField::Priority => directed(a.priority.cmp(&b.priority), order),
        // Tasks without a deadline go last in either direction.
        SortField::Deadline => match (a.deadline, b.deadline) {
            (Some(x), Some(y)) => directed(x.cmp(&y), order),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    };

    primary
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}
