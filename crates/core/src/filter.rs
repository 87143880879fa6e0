use serde::Serialize;

use crate::model::{
    DisplayStatus, FilterSelection, Priority, SortField, SortOrder, Task, TaskPage, TaskQuery,
};

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// A single user-driven change to the filter selection. `None` clears the
/// corresponding facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterChange {
    Status(Option<DisplayStatus>),
    Priority(Option<Priority>),
    SortField(Option<SortField>),
    SortOrder(Option<SortOrder>),
}

impl FilterChange {
    pub fn apply_to(self, selection: &mut FilterSelection) {
        match self {
            FilterChange::Status(status) => selection.status = status,
            FilterChange::Priority(priority) => selection.priority = priority,
            FilterChange::SortField(field) => selection.sort_field = field,
            FilterChange::SortOrder(order) => selection.sort_order = order,
        }
    }
}

/// Identifies one page request. Results are only applied when the ticket's
/// generation still matches the state that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchTicket {
    pub generation: u64,
    pub query: TaskQuery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageOutcome {
    Replaced,
    Appended,
    Discarded,
}

/// Filter selection plus the tasks accumulated for it so far.
#[derive(Debug, Clone)]
pub struct TaskFilterState {
    selection: FilterSelection,
    page_size: u32,
    generation: u64,
    tasks: Vec<Task>,
    loaded_pages: u32,
    total_pages: Option<u32>,
    in_flight: Option<u32>,
}

impl TaskFilterState {
    pub fn new(page_size: u32) -> Self {
        Self {
            selection: FilterSelection::default(),
            page_size: page_size.max(1),
            generation: 0,
            tasks: Vec::new(),
            loaded_pages: 0,
            total_pages: None,
            in_flight: None,
        }
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn loaded_pages(&self) -> u32 {
        self.loaded_pages
    }

    pub fn has_more(&self) -> bool {
        match self.total_pages {
            Some(total) => self.loaded_pages < total,
            None => true,
        }
    }

    /// Ticket for the first page of the current selection without changing
    /// it. Used for the initial load and explicit refreshes.
    pub fn refresh(&mut self) -> FetchTicket {
        self.invalidate();
        self.issue(1)
    }

    pub fn apply(&mut self, change: FilterChange) -> FetchTicket {
        change.apply_to(&mut self.selection);
        self.refresh()
    }

    pub fn replace(&mut self, selection: FilterSelection) -> FetchTicket {
        self.selection = selection;
        self.refresh()
    }

    pub fn reset(&mut self) -> FetchTicket {
        self.selection = FilterSelection::default();
        self.refresh()
    }

    /// Ticket for the page after the last one received, unless everything is
    /// loaded or a request is already outstanding.
    pub fn next_page(&mut self) -> Option<FetchTicket> {
        if self.in_flight.is_some() || self.loaded_pages == 0 || !self.has_more() {
            return None;
        }
        Some(self.issue(self.loaded_pages + 1))
    }

    pub fn receive(&mut self, ticket: &FetchTicket, page: TaskPage) -> PageOutcome {
        if !self.is_current(ticket) {
            tracing::debug!(
                generation = ticket.generation,
                current = self.generation,
                page = ticket.query.page,
                "discarding stale task page"
            );
            return PageOutcome::Discarded;
        }

        self.in_flight = None;
        self.total_pages = Some(page.meta.total_pages);
        self.loaded_pages = ticket.query.page;
        if ticket.query.page <= 1 {
            self.tasks = page.items;
            PageOutcome::Replaced
        } else {
            self.tasks.extend(page.items);
            PageOutcome::Appended
        }
    }

    /// Release the outstanding request after a failed fetch so it can be
    /// retried. Failures for superseded tickets are ignored.
    pub fn fail(&mut self, ticket: &FetchTicket) {
        if self.is_current(ticket) {
            self.in_flight = None;
        }
    }

    pub fn summary(&self) -> Option<String> {
        if self.selection.is_empty() {
            return None;
        }

        let mut parts = Vec::new();
        if let Some(status) = self.selection.status {
            parts.push(format!("status:{}", status.as_str().to_ascii_lowercase()));
        }
        if let Some(priority) = self.selection.priority {
            parts.push(format!(
                "priority:{}",
                priority.as_str().to_ascii_lowercase()
            ));
        }
        if self.selection.sort_field.is_some() || self.selection.sort_order.is_some() {
            let field = self.selection.sort_field.unwrap_or(SortField::CreatedAt);
            let order = self.selection.sort_order.unwrap_or(SortOrder::Desc);
            parts.push(format!("sort:{} {}", field.as_str(), order.as_str()));
        }
        Some(parts.join(" | "))
    }

    fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.generation == self.generation && self.in_flight == Some(ticket.query.page)
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.tasks.clear();
        self.loaded_pages = 0;
        self.total_pages = None;
        self.in_flight = None;
    }

    fn issue(&mut self, page: u32) -> FetchTicket {
        self.in_flight = Some(page);
        FetchTicket {
            generation: self.generation,
            query: TaskQuery {
                selection: self.selection.clone(),
                page,
                page_size: self.page_size,
            },
        }
    }
}

impl Default for TaskFilterState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}
